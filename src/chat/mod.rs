//! Chat session state, the recovery boundary around the pipeline, and the
//! terminal loop that drives them.

mod interface;
pub mod repl;
mod session;

pub use interface::{ChatError, ChatInterface, FeedbackReceipt, QUERY_SPAN_NAME};
pub use session::{ChatSession, ChatTurn, Role, SessionError, TurnFeedback};
