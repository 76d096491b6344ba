//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use trace_core::catalog::CatalogError;

/// Errors emitted by the session registry.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Errors emitted by `StreakService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StreakError {
    #[error("unknown user")]
    UserNotFound,
    #[error("user already exists")]
    AlreadyExists,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors surfaced by identity providers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IdentityError {
    #[error("invalid credentials")]
    Unauthenticated,
    #[error("account not confirmed")]
    Unconfirmed,
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}
