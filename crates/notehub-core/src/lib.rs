//! # notehub-core
//!
//! Core types, traits, and the fan-out registry for notehub.
//!
//! This crate holds the `Note` aggregate and its value types, the error
//! taxonomy, the repository traits storage backends implement, the change
//! events pushed to viewers, and the per-note [`ConnectionRegistry`].

pub mod defaults;
pub mod error;
pub mod events;
pub mod ids;
pub mod models;
pub mod registry;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use events::WebSocketEvent;
pub use ids::new_id;
pub use models::*;
pub use registry::{ConnectionRegistry, Message, SubscriberId, Subscription};
pub use traits::*;
