//! Ordered credential chain with token caching.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, info};

use super::cli::AzureCliCredential;
use super::env::StaticTokenCredential;
use super::managed_identity::ManagedIdentityCredential;
use super::token::{AccessToken, CredentialError, TokenCredential};
use crate::http::{AsyncHttpClient, ReqwestClient};

/// Timeout for managed identity requests in seconds.
///
/// Off-Azure hosts never answer the metadata endpoint, so the request must
/// fail quickly for the chain to fall through to the CLI.
pub const MANAGED_IDENTITY_TIMEOUT_SECS: u64 = 5;

/// Which credential source(s) to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialKind {
    /// Environment token, then managed identity, then Azure CLI.
    #[default]
    Default,
    Environment,
    ManagedIdentity,
    AzureCli,
}

impl CredentialKind {
    /// Parses a config value (`default`, `env`, `managed_identity`, `cli`).
    pub fn from_config_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "default" | "" => Some(Self::Default),
            "env" | "environment" => Some(Self::Environment),
            "managed_identity" | "managed-identity" | "msi" => Some(Self::ManagedIdentity),
            "cli" | "azure_cli" | "azure-cli" => Some(Self::AzureCli),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Environment => "env",
            Self::ManagedIdentity => "managed_identity",
            Self::AzureCli => "cli",
        }
    }
}

/// One concrete credential source.
pub enum CredentialSource<C: AsyncHttpClient = ReqwestClient> {
    Environment(StaticTokenCredential),
    ManagedIdentity(ManagedIdentityCredential<C>),
    AzureCli(AzureCliCredential),
}

impl<C: AsyncHttpClient> TokenCredential for CredentialSource<C> {
    async fn token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        match self {
            Self::Environment(credential) => credential.token(scope).await,
            Self::ManagedIdentity(credential) => credential.token(scope).await,
            Self::AzureCli(credential) => credential.token(scope).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Environment(credential) => credential.name(),
            Self::ManagedIdentity(credential) => credential.name(),
            Self::AzureCli(credential) => credential.name(),
        }
    }
}

/// Tries each source in order; the first success wins.
///
/// The winning source is remembered so later calls skip sources that
/// already failed, and tokens are cached per scope until shortly before
/// they expire.
pub struct ChainedCredential<C: AsyncHttpClient = ReqwestClient> {
    sources: Vec<CredentialSource<C>>,
    selected: Mutex<Option<usize>>,
    cache: Mutex<HashMap<String, AccessToken>>,
}

impl<C: AsyncHttpClient> ChainedCredential<C> {
    pub fn new(sources: Vec<CredentialSource<C>>) -> Self {
        Self {
            sources,
            selected: Mutex::new(None),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, scope: &str) -> Option<AccessToken> {
        let cache = self.cache.lock().ok()?;
        cache
            .get(scope)
            .filter(|token| !token.is_expired())
            .cloned()
    }

    fn remember(&self, index: usize, scope: &str, token: &AccessToken) {
        if let Ok(mut selected) = self.selected.lock() {
            *selected = Some(index);
        }
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(scope.to_string(), token.clone());
        }
    }

    fn selected(&self) -> Option<usize> {
        self.selected.lock().ok().and_then(|selected| *selected)
    }
}

impl ChainedCredential<ReqwestClient> {
    /// Builds the chain for a configured [`CredentialKind`].
    pub fn for_kind(kind: CredentialKind) -> Result<Self, CredentialError> {
        let managed_identity = || -> Result<CredentialSource, CredentialError> {
            let http = ReqwestClient::with_timeout(MANAGED_IDENTITY_TIMEOUT_SECS)
                .map_err(|e| CredentialError::ManagedIdentity(e.to_string()))?;
            Ok(CredentialSource::ManagedIdentity(
                ManagedIdentityCredential::from_env(http),
            ))
        };

        let sources = match kind {
            CredentialKind::Environment => {
                vec![CredentialSource::Environment(StaticTokenCredential::from_env()?)]
            }
            CredentialKind::ManagedIdentity => vec![managed_identity()?],
            CredentialKind::AzureCli => vec![CredentialSource::AzureCli(AzureCliCredential::new())],
            CredentialKind::Default => {
                let mut sources = Vec::new();
                if let Ok(env) = StaticTokenCredential::from_env() {
                    sources.push(CredentialSource::Environment(env));
                }
                sources.push(managed_identity()?);
                sources.push(CredentialSource::AzureCli(AzureCliCredential::new()));
                sources
            }
        };

        Ok(Self::new(sources))
    }
}

impl<C: AsyncHttpClient> TokenCredential for ChainedCredential<C> {
    async fn token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        if let Some(token) = self.cached(scope) {
            return Ok(token);
        }

        if let Some(index) = self.selected() {
            if let Some(source) = self.sources.get(index) {
                let token = source.token(scope).await?;
                self.remember(index, scope, &token);
                return Ok(token);
            }
        }

        let mut failures = Vec::with_capacity(self.sources.len());
        for (index, source) in self.sources.iter().enumerate() {
            match source.token(scope).await {
                Ok(token) => {
                    info!(source = source.name(), "Acquired access token");
                    self.remember(index, scope, &token);
                    return Ok(token);
                }
                Err(e) => {
                    debug!(source = source.name(), error = %e, "Credential source failed");
                    failures.push(format!("{}: {}", source.name(), e));
                }
            }
        }

        Err(CredentialError::Unavailable(failures))
    }

    fn name(&self) -> &str {
        "chained"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::managed_identity::{IdentityEndpoint, IMDS_ENDPOINT};
    use crate::auth::MANAGEMENT_SCOPE;
    use crate::http::{HttpResponse, MockAsyncHttpClient};

    fn failing_identity() -> CredentialSource<MockAsyncHttpClient> {
        let http = MockAsyncHttpClient::new()
            .route(IMDS_ENDPOINT, Ok(HttpResponse::new(400, "no identity")));
        CredentialSource::ManagedIdentity(ManagedIdentityCredential::new(
            http,
            IdentityEndpoint::Imds,
        ))
    }

    fn working_identity() -> CredentialSource<MockAsyncHttpClient> {
        let http = MockAsyncHttpClient::new().json(
            IMDS_ENDPOINT,
            serde_json::json!({"access_token": "mi", "expires_on": 4102444800i64}),
        );
        CredentialSource::ManagedIdentity(ManagedIdentityCredential::new(
            http,
            IdentityEndpoint::Imds,
        ))
    }

    #[test]
    fn test_credential_kind_parsing() {
        assert_eq!(CredentialKind::from_config_str("cli"), Some(CredentialKind::AzureCli));
        assert_eq!(
            CredentialKind::from_config_str("Managed_Identity"),
            Some(CredentialKind::ManagedIdentity)
        );
        assert_eq!(CredentialKind::from_config_str(""), Some(CredentialKind::Default));
        assert_eq!(CredentialKind::from_config_str("kerberos"), None);
        assert_eq!(
            CredentialKind::from_config_str(CredentialKind::Environment.as_str()),
            Some(CredentialKind::Environment)
        );
    }

    #[tokio::test]
    async fn test_first_successful_source_wins() {
        let chain = ChainedCredential::new(vec![
            failing_identity(),
            CredentialSource::Environment(StaticTokenCredential::new("env-token")),
            working_identity(),
        ]);

        let token = chain.token(MANAGEMENT_SCOPE).await.unwrap();
        assert_eq!(token.token, "env-token");
        assert_eq!(chain.selected(), Some(1));
    }

    #[tokio::test]
    async fn test_all_failures_are_reported() {
        let chain = ChainedCredential::new(vec![failing_identity(), failing_identity()]);

        let err = chain.token(MANAGEMENT_SCOPE).await.unwrap_err();
        match err {
            CredentialError::Unavailable(reasons) => {
                assert_eq!(reasons.len(), 2);
                assert!(reasons[0].starts_with("managed-identity"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tokens_are_cached_per_scope() {
        let chain = ChainedCredential::new(vec![working_identity()]);

        chain.token(MANAGEMENT_SCOPE).await.unwrap();
        chain.token(MANAGEMENT_SCOPE).await.unwrap();

        let CredentialSource::ManagedIdentity(source) = &chain.sources[0] else {
            panic!("expected managed identity source");
        };
        assert_eq!(source.http_requests(), 1);
    }

    #[tokio::test]
    async fn test_empty_chain_reports_unavailable() {
        let chain: ChainedCredential<MockAsyncHttpClient> = ChainedCredential::new(Vec::new());
        let err = chain.token(MANAGEMENT_SCOPE).await.unwrap_err();
        assert_eq!(err, CredentialError::Unavailable(Vec::new()));
    }
}
