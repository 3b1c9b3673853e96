//! Credential acquisition and subscription identity.
//!
//! Tokens come from external providers only: a pre-issued token in the
//! environment, the hosting platform's managed identity endpoint, or a
//! signed-in Azure CLI. [`ChainedCredential`] tries them in that order.
//!
//! ```ignore
//! use ptu_capacity::auth::{ChainedCredential, CredentialKind, TokenCredential, MANAGEMENT_SCOPE};
//!
//! let credential = ChainedCredential::for_kind(CredentialKind::Default)?;
//! let token = credential.token(MANAGEMENT_SCOPE).await?;
//! let subscription = ptu_capacity::auth::subscription_from_token(&token)?;
//! ```

mod chain;
mod claims;
mod cli;
mod env;
mod managed_identity;
mod token;

pub use chain::{ChainedCredential, CredentialKind, CredentialSource, MANAGED_IDENTITY_TIMEOUT_SECS};
pub use claims::{decode_claims, subscription_from_resource_id, subscription_from_token};
pub use cli::AzureCliCredential;
pub use env::{StaticTokenCredential, ACCESS_TOKEN_ENV};
pub use managed_identity::{IdentityEndpoint, ManagedIdentityCredential, IMDS_ENDPOINT};
pub use token::{
    scope_to_resource, AccessToken, CredentialError, TokenCredential, MANAGEMENT_SCOPE,
    STORAGE_SCOPE,
};

#[cfg(test)]
pub(crate) use claims::tests::fake_jwt;
