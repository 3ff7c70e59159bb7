//! Application layer of the Tome client: the state engines and the session
//! orchestrator.
//!
//! Each engine is an independently testable state container. It owns exactly
//! one collection — the chat list, the message log, the selection set — and
//! publishes an immutable snapshot through a watch channel after every
//! mutation. Presentation reads snapshots and re-invokes operations; it
//! never mutates the collections directly. The orchestrator composes the
//! engines and routes failures per the propagation policy.

pub mod chat_registry;
pub mod event;
pub mod feedback_tracker;
pub mod message_sync;
pub mod orchestrator;
pub mod selection_tree;

pub use chat_registry::{ChatRegistry, RegistrySnapshot};
pub use event::ClientEvent;
pub use feedback_tracker::{FeedbackSnapshot, FeedbackTracker, RateOutcome};
pub use message_sync::{MessageLogSnapshot, MessageSyncEngine, SendReceipt};
pub use orchestrator::SessionOrchestrator;
pub use selection_tree::{SelectionSnapshot, SelectionTreeEngine};

#[cfg(test)]
pub(crate) mod test_support;
