//! `bloomstock-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::Entity;
pub use error::{StoreError, StoreResult};
pub use id::{ProductId, TicketId};
pub use value_object::ValueObject;
