use async_trait::async_trait;
use parking_lot::Mutex;
use promptline_core::{FreeTextTransport, TransportError};
use promptline_protocol::FreeTextReply;

/// Free-text transport returning a fixed outcome and recording inputs.
#[derive(Debug)]
pub struct StubFreeText {
    outcome: Result<FreeTextReply, TransportError>,
    sent: Mutex<Vec<String>>,
}

impl StubFreeText {
    pub fn answering(response: impl Into<String>, query_id: Option<i64>) -> Self {
        Self {
            outcome: Ok(FreeTextReply {
                response: Some(serde_json::Value::String(response.into())),
                message: None,
                query_id: query_id.map(serde_json::Value::from),
            }),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: TransportError) -> Self {
        Self {
            outcome: Err(error),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl FreeTextTransport for StubFreeText {
    async fn send_free_text(&self, text: &str) -> Result<FreeTextReply, TransportError> {
        self.sent.lock().push(text.to_string());
        self.outcome.clone()
    }
}
