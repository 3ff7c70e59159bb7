//! Message domain module.
//!
//! - `model`: the message entity, its two identity regimes, and the types
//!   that ride along with it (`ChatMode`, `SourceRef`, `QueryMetadata`)

mod model;

pub use model::{
    Author, ChatMode, DeliveryState, Message, MessageBody, MessageId, QueryMetadata, SourceRef,
};
