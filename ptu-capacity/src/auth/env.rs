//! Pre-issued token supplied through the environment.

use super::claims::expiry_from_jwt;
use super::token::{AccessToken, CredentialError, TokenCredential};

/// Environment variable holding a pre-issued bearer token.
pub const ACCESS_TOKEN_ENV: &str = "AZURE_ACCESS_TOKEN";

/// Credential returning one fixed token for every scope.
///
/// Useful in CI or when a token is minted by an outer orchestrator. The
/// caller is responsible for the token's audience matching the scopes in use.
#[derive(Clone)]
pub struct StaticTokenCredential {
    token: AccessToken,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let expires_on = expiry_from_jwt(&token);
        Self {
            token: AccessToken::new(token, expires_on),
        }
    }

    /// Reads the token from [`ACCESS_TOKEN_ENV`].
    pub fn from_env() -> Result<Self, CredentialError> {
        match std::env::var(ACCESS_TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => Ok(Self::new(token.trim())),
            _ => Err(CredentialError::MissingEnv(ACCESS_TOKEN_ENV.to_string())),
        }
    }
}

impl TokenCredential for StaticTokenCredential {
    async fn token(&self, _scope: &str) -> Result<AccessToken, CredentialError> {
        Ok(self.token.clone())
    }

    fn name(&self) -> &str {
        "environment"
    }
}
