//! Catalog domain module.
//!
//! This crate contains the polymorphic product model (trees, flowers,
//! decorations), implemented purely as deterministic domain logic (no IO, no
//! storage).

pub mod product;

pub use product::{Attribute, Material, NewProduct, Product, ProductKey, ProductKind};
