//! Core engine module
//!
//! Event-sourced state management for the tag group store: a lock-guarded
//! in-memory state, a hash-chained event journal and the log backends that
//! make committed events durable.

pub mod events;
pub mod persistence;
pub mod state;

pub use events::{verify_chain, Event, EventEnvelope, EventJournal};
pub use persistence::{EventLog, FileEventLog, MemoryEventLog};
pub use state::StateEngine;

/// Engine result type
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine error type
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("Persistence error: {0}")]
    PersistenceError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Concurrency error: {0}")]
    ConcurrencyError(String),
    #[error("Corrupted event log at line {line}: {reason}")]
    Corrupted { line: usize, reason: String },
    #[error("Broken hash chain at event {0}")]
    BrokenChain(String),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}
