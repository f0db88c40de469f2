//! Error types for the conversation engine.

use thiserror::Error;

/// Failures of a single backend exchange.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request had no actor id; nothing was sent.
    #[error("actor id is required")]
    MissingActor,
    /// The server answered with a failure envelope.
    #[error("{0}")]
    Application(String),
    /// The server answered with a non-success HTTP status.
    #[error("Server error: {0}")]
    Status(u16),
    /// The request could not be sent or the body could not be read.
    #[error("network error: {0}")]
    Network(String),
    /// The body was not a valid envelope.
    #[error("decode error: {0}")]
    Decode(String),
}

impl TransportError {
    /// Whether the failure came from a well-formed failure envelope.
    pub fn is_application(&self) -> bool {
        matches!(self, TransportError::Application(_))
    }

    /// Text shown in the transcript for this failure.
    pub fn display_text(&self) -> String {
        match self {
            TransportError::Application(message) => message.clone(),
            TransportError::Status(_) => self.to_string(),
            TransportError::MissingActor
            | TransportError::Network(_)
            | TransportError::Decode(_) => format!("Unable to reach the assistant: {self}"),
        }
    }
}

/// Errors raised by form value updates.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormError {
    /// The field is not declared by the form.
    #[error("unknown form field: {0}")]
    UnknownField(String),
}

/// Errors returned by session operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// No actor id is available; the action was not attempted.
    #[error("actor id is not available")]
    MissingActor,
    /// The conversation surface is closed.
    #[error("conversation is not open")]
    NotOpen,
    /// There is no pending form to submit.
    #[error("no form is pending")]
    NoPendingForm,
    /// Form update failed.
    #[error(transparent)]
    Form(#[from] FormError),
    /// Backend exchange failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
