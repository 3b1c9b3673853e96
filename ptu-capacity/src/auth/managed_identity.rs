//! Tokens from the hosting platform's managed identity endpoint.
//!
//! Two endpoints are supported:
//! - App Service / Functions: `IDENTITY_ENDPOINT` + `IDENTITY_HEADER`
//! - Virtual machines: the instance metadata service (IMDS)

use serde::Deserialize;
use tracing::debug;

use super::token::{parse_epoch, scope_to_resource, AccessToken, CredentialError, TokenCredential};
use crate::http::{AsyncHttpClient, HttpRequest};

/// Instance metadata token endpoint.
pub const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

const IMDS_API_VERSION: &str = "2018-02-01";
const APP_SERVICE_API_VERSION: &str = "2019-08-01";

/// Where the platform serves managed identity tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEndpoint {
    AppService { endpoint: String, header: String },
    Imds,
}

impl IdentityEndpoint {
    /// Detects the endpoint from `IDENTITY_ENDPOINT` / `IDENTITY_HEADER`.
    pub fn from_env() -> Self {
        match (
            std::env::var("IDENTITY_ENDPOINT"),
            std::env::var("IDENTITY_HEADER"),
        ) {
            (Ok(endpoint), Ok(header)) => Self::AppService { endpoint, header },
            _ => Self::Imds,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::AppService { .. } => "app-service",
            Self::Imds => "imds",
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_on: Option<serde_json::Value>,
}

/// Credential backed by the managed identity of the hosting resource.
pub struct ManagedIdentityCredential<C: AsyncHttpClient> {
    http: C,
    endpoint: IdentityEndpoint,
    client_id: Option<String>,
}

impl<C: AsyncHttpClient> ManagedIdentityCredential<C> {
    pub fn new(http: C, endpoint: IdentityEndpoint) -> Self {
        Self {
            http,
            endpoint,
            client_id: None,
        }
    }

    /// Creates a credential for the endpoint advertised by the environment.
    pub fn from_env(http: C) -> Self {
        let client_id = std::env::var("AZURE_CLIENT_ID").ok();
        Self {
            http,
            endpoint: IdentityEndpoint::from_env(),
            client_id,
        }
    }

    /// Selects a user-assigned identity by client id.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    fn build_request(&self, resource: &str) -> Result<HttpRequest, CredentialError> {
        let (base, api_version) = match &self.endpoint {
            IdentityEndpoint::AppService { endpoint, .. } => {
                (endpoint.as_str(), APP_SERVICE_API_VERSION)
            }
            IdentityEndpoint::Imds => (IMDS_ENDPOINT, IMDS_API_VERSION),
        };

        let mut params = vec![("api-version", api_version), ("resource", resource)];
        if let Some(client_id) = &self.client_id {
            params.push(("client_id", client_id.as_str()));
        }
        let url = reqwest::Url::parse_with_params(base, &params)
            .map_err(|e| CredentialError::ManagedIdentity(format!("bad endpoint {}: {}", base, e)))?;

        let request = HttpRequest::get(url.as_str());
        Ok(match &self.endpoint {
            IdentityEndpoint::AppService { header, .. } => {
                request.header("X-IDENTITY-HEADER", header.as_str())
            }
            IdentityEndpoint::Imds => request.header("Metadata", "true"),
        })
    }
}

impl<C: AsyncHttpClient> TokenCredential for ManagedIdentityCredential<C> {
    async fn token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let resource = scope_to_resource(scope);
        let request = self.build_request(resource)?;
        debug!(endpoint = self.endpoint.kind(), resource, "Requesting managed identity token");

        let response = self
            .http
            .send(request)
            .await
            .map_err(|e| CredentialError::ManagedIdentity(e.to_string()))?;

        if !response.is_success() {
            return Err(CredentialError::ManagedIdentity(format!(
                "HTTP {}: {}",
                response.status,
                response.text_lossy()
            )));
        }

        let body: TokenResponse = response
            .json()
            .map_err(|e| CredentialError::ManagedIdentity(format!("unexpected response: {}", e)))?;
        let expires_on = body.expires_on.as_ref().and_then(parse_epoch);

        Ok(AccessToken::new(body.access_token, expires_on))
    }

    fn name(&self) -> &str {
        "managed-identity"
    }
}

#[cfg(test)]
impl ManagedIdentityCredential<crate::http::MockAsyncHttpClient> {
    pub(crate) fn http_requests(&self) -> usize {
        self.http.request_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MANAGEMENT_SCOPE;
    use crate::http::{HttpResponse, MockAsyncHttpClient};
    use serde_json::json;

    #[tokio::test]
    async fn test_imds_token() {
        let http = MockAsyncHttpClient::new().json(
            IMDS_ENDPOINT,
            json!({"access_token": "mi-token", "expires_on": "1700000000", "token_type": "Bearer"}),
        );
        let credential = ManagedIdentityCredential::new(http, IdentityEndpoint::Imds);

        let token = credential.token(MANAGEMENT_SCOPE).await.unwrap();
        assert_eq!(token.token, "mi-token");
        assert_eq!(token.expires_on, chrono::DateTime::from_timestamp(1_700_000_000, 0));

        let requests = credential.http.requests.lock().unwrap();
        let request = &requests[0];
        assert!(request.url.contains("resource=https%3A%2F%2Fmanagement.azure.com"));
        assert!(request.url.contains("api-version=2018-02-01"));
        assert!(request
            .headers
            .contains(&("Metadata".to_string(), "true".to_string())));
    }

    #[tokio::test]
    async fn test_app_service_token_uses_identity_header() {
        let endpoint = "http://localhost:4141/msi/token";
        let http = MockAsyncHttpClient::new().json(
            endpoint,
            json!({"access_token": "app-token", "expires_on": 1700000000}),
        );
        let credential = ManagedIdentityCredential::new(
            http,
            IdentityEndpoint::AppService {
                endpoint: endpoint.to_string(),
                header: "secret-header".to_string(),
            },
        )
        .with_client_id("client-1");

        let token = credential.token(MANAGEMENT_SCOPE).await.unwrap();
        assert_eq!(token.token, "app-token");

        let requests = credential.http.requests.lock().unwrap();
        assert!(requests[0].url.contains("client_id=client-1"));
        assert!(requests[0].url.contains("api-version=2019-08-01"));
        assert!(requests[0]
            .headers
            .contains(&("X-IDENTITY-HEADER".to_string(), "secret-header".to_string())));
    }

    #[tokio::test]
    async fn test_error_status_is_managed_identity_error() {
        let http = MockAsyncHttpClient::new().route(
            IMDS_ENDPOINT,
            Ok(HttpResponse::new(400, "identity not found")),
        );
        let credential = ManagedIdentityCredential::new(http, IdentityEndpoint::Imds);

        let err = credential.token(MANAGEMENT_SCOPE).await.unwrap_err();
        assert!(matches!(err, CredentialError::ManagedIdentity(ref msg) if msg.contains("400")));
    }
}
