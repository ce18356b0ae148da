//! Error model shared by the domain and persistence layers.

use thiserror::Error;

/// Result type used across the catalog, sales, and store layers.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failure taxonomy for catalog/ledger operations.
///
/// `InvalidInput` is raised before a request reaches a repository; the other
/// variants surface from lookups and document decoding. Repositories never
/// catch and suppress — failures propagate to the orchestrator, which owns
/// user-facing messaging. Nothing here is retried automatically.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A lookup by id or key matched nothing.
    #[error("not found")]
    NotFound,

    /// A stored `type` tag or attribute shape the decoder cannot map.
    ///
    /// Always fatal to that single decode; never defaulted to a variant.
    #[error("unknown variant: {0}")]
    UnknownVariant(String),

    /// A document is missing a field or carries one with the wrong shape.
    #[error("decode failed: {0}")]
    Decode(String),

    /// The underlying document store could not be reached.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A value failed validation before reaching the repository layer.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl StoreError {
    pub fn unknown_variant(msg: impl Into<String>) -> Self {
        Self::UnknownVariant(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::StorageUnavailable(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
