//! Value object trait: equality by value, not identity.
//!
//! Value objects are defined entirely by their attribute values; two value
//! objects with the same values are equal. The composite `(name, attribute)`
//! lookup key is the prime example here — it must stay immutable so that map
//! keys cannot be corrupted by later catalog mutation.

/// Marker trait for immutable, value-compared domain objects.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
