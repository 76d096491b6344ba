use async_trait::async_trait;

use crate::error::IdentityError;
use trace_core::model::UserId;

/// Maps login credentials to a stable user id.
///
/// The protocol behind this (password hashing, confirmation flows, token
/// exchange) belongs to the provider; this crate only consumes the verdict.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify credentials and return the user's stable id.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` for bad credentials, `Unconfirmed` for accounts that
    /// have not finished registration, `Unavailable` for transient provider
    /// failures.
    async fn verify(&self, email: &str, password: &str) -> Result<UserId, IdentityError>;
}
