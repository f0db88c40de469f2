//! Prompt-driven conversation engine.
//!
//! A [`ConversationSession`] walks a server-owned prompt graph: it fetches
//! prompts through a [`PromptTransport`], classifies follow-ups with the
//! option resolver, collects structured input through a [`DynamicForm`] and
//! threads the selected entity id through later requests.

pub mod error;
pub mod form;
pub mod resolver;
pub mod selection;
pub mod session;
pub mod transcript;
pub mod transport;
pub mod types;

pub use error::{FormError, SessionError, TransportError};
pub use form::{
    DynamicForm, EnumFetcher, FormField, FormOptions, FormPayload, FormTarget, HttpEnumFetcher,
};
pub use resolver::{FollowupAction, bracket_fields, classify};
pub use selection::SelectionContext;
pub use session::{ConversationSession, SessionBuilder};
pub use transcript::Transcript;
pub use transport::{
    FreeTextTransport, HttpFreeTextTransport, HttpPromptTransport, PromptRequest, PromptTransport,
    StatusPolicy, decode_envelope,
};
pub use types::{ConversationId, ExtraAction, SelectableEntity, Sender, SessionState, Turn};
