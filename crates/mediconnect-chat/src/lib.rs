//! Conversational doctor search for MediConnect.
//!
//! Turns free-text user messages into structured directory queries through
//! a text-generation model, renders matches as HTML cards, and keeps a
//! bounded per-session conversation history.

pub mod error;
pub mod history;
pub mod interpreter;
pub mod orchestrator;
pub mod render;
pub mod session;

pub use error::ChatError;
pub use history::ConversationHistory;
pub use interpreter::{Interpretation, QueryInterpreter};
pub use orchestrator::{ChatReply, ChatService, ReplyKind};
pub use render::{escape_html, ResultRenderer};
pub use session::{InMemorySessionStore, SessionStore};
