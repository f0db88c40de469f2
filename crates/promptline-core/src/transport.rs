//! Backend exchanges: the prompt endpoint and the free-text endpoint.

use crate::error::TransportError;
use crate::types::ConversationId;
use async_trait::async_trait;
use log::{debug, warn};
use promptline_config::BackendConfig;
use promptline_protocol::{
    FreeTextReply, PromptData, PromptEnvelope, PromptId, PromptMethod, PromptReply,
};
use serde_json::Value;

/// How non-success HTTP statuses are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusPolicy {
    /// Parse the envelope whatever the status; only a non-envelope error
    /// body is reported as a status failure.
    #[default]
    Lenient,
    /// Every non-success status is a status failure.
    Strict,
}

/// One request against the prompt endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRequest {
    pub prompt_id: PromptId,
    pub actor_id: Option<String>,
    pub conversation_id: ConversationId,
    /// Selected entity id sent as `additional`.
    pub context: Option<i64>,
    pub method: PromptMethod,
    /// JSON body for mutating methods; `{}` when absent.
    pub body: Option<Value>,
    pub status_policy: StatusPolicy,
}

impl PromptRequest {
    /// Build a query request with no actor, context or body.
    pub fn new(prompt_id: PromptId, conversation_id: ConversationId) -> Self {
        Self {
            prompt_id,
            actor_id: None,
            conversation_id,
            context: None,
            method: PromptMethod::Query,
            body: None,
            status_policy: StatusPolicy::Lenient,
        }
    }

    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    pub fn with_context(mut self, context: Option<i64>) -> Self {
        self.context = context;
        self
    }

    pub fn with_method(mut self, method: PromptMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_status_policy(mut self, status_policy: StatusPolicy) -> Self {
        self.status_policy = status_policy;
        self
    }
}

/// Prompt endpoint interface.
#[async_trait]
pub trait PromptTransport: Send + Sync {
    /// Perform one exchange. Never touches session state.
    async fn fetch_prompt(&self, request: PromptRequest) -> Result<PromptReply, TransportError>;
}

/// Free-text endpoint interface.
#[async_trait]
pub trait FreeTextTransport: Send + Sync {
    /// Send a free-text question.
    async fn send_free_text(&self, text: &str) -> Result<FreeTextReply, TransportError>;
}

/// Reduce an envelope into a reply or an application failure.
pub fn decode_envelope(envelope: PromptEnvelope) -> Result<PromptReply, TransportError> {
    if !envelope.success {
        return Err(TransportError::Application(envelope.failure_message()));
    }
    let data = match envelope.data {
        Some(Value::Null) | None => PromptData::default(),
        Some(value) => serde_json::from_value::<PromptData>(value)
            .map_err(|err| TransportError::Decode(err.to_string()))?,
    };
    Ok(PromptReply::from(data))
}

/// reqwest-backed prompt transport.
#[derive(Debug, Clone)]
pub struct HttpPromptTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPromptTransport {
    /// Create a transport for a full endpoint URL.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Create a transport for the configured prompt endpoint.
    pub fn from_config(backend: &BackendConfig) -> Self {
        Self::new(backend.prompt_url())
    }
}

#[async_trait]
impl PromptTransport for HttpPromptTransport {
    async fn fetch_prompt(&self, request: PromptRequest) -> Result<PromptReply, TransportError> {
        let Some(actor_id) = request
            .actor_id
            .as_deref()
            .filter(|actor| !actor.trim().is_empty())
        else {
            return Err(TransportError::MissingActor);
        };
        debug!(
            "fetching prompt (prompt_id={}, method={}, conversation_id={}, additional={:?})",
            request.prompt_id,
            request.method.as_str(),
            request.conversation_id,
            request.context
        );

        let mut query = vec![
            ("prompt_id", request.prompt_id.to_string()),
            ("userId", actor_id.to_string()),
            ("conversationId", request.conversation_id.to_string()),
        ];
        if let Some(context) = request.context {
            query.push(("additional", context.to_string()));
        }

        let builder = match request.method {
            PromptMethod::Query => self.client.get(&self.endpoint),
            PromptMethod::Update => self.client.put(&self.endpoint),
            PromptMethod::Create => self.client.post(&self.endpoint),
        }
        .query(&query);
        let builder = if request.method.is_mutating() {
            let body = request
                .body
                .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
            builder.json(&body)
        } else {
            builder
        };

        let response = builder
            .send()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;
        let status = response.status();
        if !status.is_success() && request.status_policy == StatusPolicy::Strict {
            warn!(
                "prompt request failed (prompt_id={}, status={})",
                request.prompt_id,
                status.as_u16()
            );
            return Err(TransportError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;
        let envelope = match serde_json::from_slice::<PromptEnvelope>(&bytes) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                warn!(
                    "prompt request failed without envelope (prompt_id={}, status={})",
                    request.prompt_id,
                    status.as_u16()
                );
                return Err(TransportError::Status(status.as_u16()));
            }
            Err(err) => return Err(TransportError::Decode(err.to_string())),
        };
        decode_envelope(envelope)
    }
}

/// reqwest-backed free-text transport.
#[derive(Debug, Clone)]
pub struct HttpFreeTextTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpFreeTextTransport {
    /// Create a transport for a full endpoint URL.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Create a transport for the configured free-text endpoint.
    pub fn from_config(backend: &BackendConfig) -> Self {
        Self::new(backend.free_text_url())
    }
}

#[async_trait]
impl FreeTextTransport for HttpFreeTextTransport {
    async fn send_free_text(&self, text: &str) -> Result<FreeTextReply, TransportError> {
        debug!("sending free text (len={})", text.len());
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("userInput", text)])
            .send()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        response
            .json::<FreeTextReply>()
            .await
            .map_err(|err| TransportError::Decode(err.to_string()))
    }
}
