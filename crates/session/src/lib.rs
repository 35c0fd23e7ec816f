//! Session memory: the append-only journal, its in-memory prompt window,
//! crash-safe resume, and `create_session` rotation with a deferred
//! background callback queue.

pub mod background;
pub mod index;
pub mod inmemory;
pub mod manager;

pub use background::BackgroundQueue;
pub use index::SessionIndex;
pub use inmemory::{latest_turns, ConversationTurn, InMemorySession, Role};
pub use manager::{
    CloseCallback, CreateSessionOutcome, CreateSessionRequest, CreateSessionSource, PromptMemoryContext,
    SessionMemoryManager, SessionPaths,
};
