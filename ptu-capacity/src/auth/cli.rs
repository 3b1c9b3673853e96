//! Tokens from a signed-in Azure CLI session.

use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use super::token::{parse_epoch, scope_to_resource, AccessToken, CredentialError, TokenCredential};

#[cfg(windows)]
const AZ_PROGRAM: &str = "az.cmd";
#[cfg(not(windows))]
const AZ_PROGRAM: &str = "az";

/// Shape of `az account get-access-token --output json`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliTokenOutput {
    access_token: String,
    /// Epoch seconds; present in CLI 2.54 and later.
    #[serde(default, rename = "expires_on")]
    expires_on: Option<serde_json::Value>,
    #[serde(default)]
    subscription: Option<String>,
}

/// Credential delegating to `az account get-access-token`.
#[derive(Debug, Clone, Default)]
pub struct AzureCliCredential {
    program: Option<String>,
}

impl AzureCliCredential {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a specific `az` executable instead of the one on `PATH`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: Some(program.into()),
        }
    }

    fn program(&self) -> &str {
        self.program.as_deref().unwrap_or(AZ_PROGRAM)
    }
}

/// Parses the CLI's JSON output, keeping the active subscription on the token.
fn parse_cli_output(stdout: &[u8]) -> Result<AccessToken, CredentialError> {
    let output: CliTokenOutput = serde_json::from_slice(stdout)
        .map_err(|e| CredentialError::Cli(format!("unexpected output: {}", e)))?;
    let expires_on = output.expires_on.as_ref().and_then(parse_epoch);
    let token = AccessToken::new(output.access_token, expires_on);
    Ok(match output.subscription.filter(|s| !s.trim().is_empty()) {
        Some(subscription) => token.with_subscription(subscription.trim()),
        None => token,
    })
}

impl TokenCredential for AzureCliCredential {
    async fn token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let resource = scope_to_resource(scope);
        debug!(program = self.program(), resource, "Requesting token from Azure CLI");

        let output = Command::new(self.program())
            .args([
                "account",
                "get-access-token",
                "--resource",
                resource,
                "--output",
                "json",
            ])
            .output()
            .await
            .map_err(|e| CredentialError::Cli(format!("failed to run {}: {}", self.program(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CredentialError::Cli(stderr.trim().to_string()));
        }

        let token = parse_cli_output(&output.stdout)?;
        if let Some(subscription) = &token.subscription {
            debug!(%subscription, "Azure CLI active subscription");
        }
        Ok(token)
    }

    fn name(&self) -> &str {
        "azure-cli"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cli_output() {
        let stdout = br#"{
            "accessToken": "eyJ0eXAi",
            "expiresOn": "2024-05-01 10:00:00.000000",
            "expires_on": 1714557600,
            "subscription": "sub-123",
            "tenant": "tenant-1",
            "tokenType": "Bearer"
        }"#;

        let token = parse_cli_output(stdout).unwrap();
        assert_eq!(token.token, "eyJ0eXAi");
        assert_eq!(token.expires_on, chrono::DateTime::from_timestamp(1714557600, 0));
        assert_eq!(token.subscription.as_deref(), Some("sub-123"));
    }

    #[test]
    fn test_parse_cli_output_without_epoch() {
        let stdout = br#"{"accessToken": "t", "expiresOn": "2024-05-01 10:00:00.000000"}"#;
        let token = parse_cli_output(stdout).unwrap();
        assert_eq!(token.expires_on, None);
        assert_eq!(token.subscription, None);
    }

    #[test]
    fn test_parse_cli_output_rejects_garbage() {
        assert!(matches!(
            parse_cli_output(b"ERROR: Please run 'az login'"),
            Err(CredentialError::Cli(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_program_is_cli_error() {
        let credential = AzureCliCredential::with_program("definitely-not-an-az-binary");
        let result = credential.token(crate::auth::MANAGEMENT_SCOPE).await;
        assert!(matches!(result, Err(CredentialError::Cli(_))));
    }
}
