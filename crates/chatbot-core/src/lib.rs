pub mod config;
pub mod draft;
pub mod query;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use config::Config;
pub use draft::{Draft, FileRef};
pub use query::{decode_answer, QueryClient, QueryError, QueryService};
pub use session::{ChatSession, PendingQuery, SubmitPhase, ERROR_REPLY};
pub use state::{ChatMessage, ChatRole, Conversation, MessageId};
