//! Access tokens and the credential trait.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Token scope for the Azure Resource Manager endpoint.
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

/// Token scope for Azure Blob Storage.
pub const STORAGE_SCOPE: &str = "https://storage.azure.com/.default";

/// Tokens expiring within this window are treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 300;

/// A bearer token issued for one scope.
#[derive(Clone, PartialEq)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: Option<DateTime<Utc>>,
    /// Subscription reported by the issuer alongside the token, if any.
    pub subscription: Option<String>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_on: Option<DateTime<Utc>>) -> Self {
        Self {
            token: token.into(),
            expires_on,
            subscription: None,
        }
    }

    pub fn with_subscription(mut self, subscription: impl Into<String>) -> Self {
        self.subscription = Some(subscription.into());
        self
    }

    /// Whether the token is expired or about to expire at `now`.
    ///
    /// Tokens without a known expiry never expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_on {
            Some(expires_on) => expires_on - Duration::seconds(EXPIRY_MARGIN_SECS) <= now,
            None => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .field("subscription", &self.subscription)
            .finish()
    }
}

/// Errors raised while acquiring or inspecting credentials.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CredentialError {
    #[error("environment variable {0} is not set")]
    MissingEnv(String),

    #[error("Azure CLI token request failed: {0}")]
    Cli(String),

    #[error("managed identity token request failed: {0}")]
    ManagedIdentity(String),

    #[error("no credential source succeeded: {}", .0.join("; "))]
    Unavailable(Vec<String>),

    #[error("invalid access token: {0}")]
    InvalidToken(String),

    #[error("subscription id not found in token claims")]
    SubscriptionNotFound,
}

/// A source of bearer tokens.
///
/// Implementations obtain tokens from an external provider; no
/// authentication protocol is implemented here.
pub trait TokenCredential: Send + Sync {
    /// Returns a token valid for `scope` (e.g. [`MANAGEMENT_SCOPE`]).
    fn token(&self, scope: &str) -> impl Future<Output = Result<AccessToken, CredentialError>> + Send;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

impl<T: TokenCredential> TokenCredential for Arc<T> {
    fn token(&self, scope: &str) -> impl Future<Output = Result<AccessToken, CredentialError>> + Send {
        (**self).token(scope)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Converts a `.default` scope to the resource URI expected by v1 endpoints.
pub fn scope_to_resource(scope: &str) -> &str {
    scope.strip_suffix("/.default").unwrap_or(scope)
}

/// Parses an expiry given as epoch seconds, either a JSON number or string.
pub(crate) fn parse_epoch(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    let secs = match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    DateTime::from_timestamp(secs, 0)
}
