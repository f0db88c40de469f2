//! Test helpers shared across Promptline crates.

pub mod enums;
pub mod free_text;
pub mod replies;
pub mod transport;

pub use enums::StubEnumFetcher;
pub use free_text::StubFreeText;
pub use replies::{entities_reply, text_reply};
pub use transport::ScriptedTransport;
