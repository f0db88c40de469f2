use async_trait::async_trait;
use parking_lot::Mutex;
use promptline_core::{PromptRequest, PromptTransport, TransportError};
use promptline_protocol::{PromptId, PromptReply};
use std::collections::HashMap;

type Outcome = Result<PromptReply, TransportError>;

/// Prompt transport answering from a script and recording every request.
///
/// Unscripted prompts get an empty reply. Requests without an actor fail
/// like the HTTP transport.
#[derive(Default)]
pub struct ScriptedTransport {
    by_prompt: Mutex<HashMap<PromptId, Outcome>>,
    requests: Mutex<Vec<PromptRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `prompt_id` with `reply`.
    pub fn with_reply(self, prompt_id: PromptId, reply: PromptReply) -> Self {
        self.by_prompt.lock().insert(prompt_id, Ok(reply));
        self
    }

    /// Always fail `prompt_id` with `error`.
    pub fn with_failure(self, prompt_id: PromptId, error: TransportError) -> Self {
        self.by_prompt.lock().insert(prompt_id, Err(error));
        self
    }

    pub fn requests(&self) -> Vec<PromptRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> Option<PromptRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl PromptTransport for ScriptedTransport {
    async fn fetch_prompt(&self, request: PromptRequest) -> Result<PromptReply, TransportError> {
        if request.actor_id.is_none() {
            return Err(TransportError::MissingActor);
        }
        let prompt_id = request.prompt_id;
        self.requests.lock().push(request);
        self.by_prompt
            .lock()
            .get(&prompt_id)
            .cloned()
            .unwrap_or_else(|| Ok(PromptReply::default()))
    }
}
