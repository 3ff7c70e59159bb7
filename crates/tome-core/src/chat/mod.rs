//! Chat session domain module.

mod model;

pub use model::{ChatSession, sort_by_activity};
