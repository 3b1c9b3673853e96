//! Management API client with `nextLink` pagination.

use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};

use super::api::{ApiError, CapacityApi, OPENAI_KIND};
use super::types::{ErrorEnvelope, ModelCapacityEntry, ModelDescriptor, Page, ResourceSku};
use crate::auth::{TokenCredential, MANAGEMENT_SCOPE};
use crate::http::{AsyncHttpClient, HttpRequest, HttpResponse};
use crate::model::Region;

/// Default Azure Resource Manager endpoint.
pub const DEFAULT_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";

const SKUS_API_VERSION: &str = "2023-05-01";
const MODELS_API_VERSION: &str = "2023-05-01";
const CAPACITIES_API_VERSION: &str = "2024-04-01-preview";

/// Upper bound on pages followed for one listing.
const MAX_PAGES: usize = 1000;

/// Cognitive Services management client scoped to one subscription.
pub struct ManagementClient<C: AsyncHttpClient, T: TokenCredential> {
    http: C,
    credential: T,
    subscription_id: String,
    endpoint: String,
}

impl<C: AsyncHttpClient, T: TokenCredential> ManagementClient<C, T> {
    pub fn new(http: C, credential: T, subscription_id: impl Into<String>) -> Self {
        Self {
            http,
            credential,
            subscription_id: subscription_id.into(),
            endpoint: DEFAULT_MANAGEMENT_ENDPOINT.to_string(),
        }
    }

    /// Overrides the management endpoint (sovereign clouds, tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn http(&self) -> &C {
        &self.http
    }

    fn provider_url(&self, path: &str, params: &[(&str, &str)]) -> Result<String, ApiError> {
        let base = format!(
            "{}/subscriptions/{}/providers/Microsoft.CognitiveServices/{}",
            self.endpoint, self.subscription_id, path
        );
        reqwest::Url::parse_with_params(&base, params)
            .map(String::from)
            .map_err(|e| ApiError::Url(format!("{}: {}", base, e)))
    }

    async fn get_page<V: DeserializeOwned>(&self, url: &str) -> Result<Page<V>, ApiError> {
        let token = self.credential.token(MANAGEMENT_SCOPE).await?;
        let request = HttpRequest::get(url).bearer(&token.token);

        trace!(url, "GET");
        let response = self.http.send(request).await?;
        if !response.is_success() {
            return Err(status_error(url, &response));
        }

        response.json().map_err(|e| ApiError::Parse {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    /// Fetches `url` and every page reachable through `nextLink`.
    async fn get_all<V: DeserializeOwned + Send>(&self, url: String) -> Result<Vec<V>, ApiError> {
        let mut items = Vec::new();
        let mut next = Some(url);
        let mut pages = 0;

        while let Some(url) = next.take() {
            let page: Page<V> = self.get_page(&url).await?;
            items.extend(page.value);
            pages += 1;

            next = page
                .next_link
                .filter(|link| !link.is_empty() && *link != url);
            // A partial capacity listing would read as zero capacity.
            if pages >= MAX_PAGES && next.is_some() {
                warn!(url = %url, pages, "Listing exceeded page limit");
                return Err(ApiError::PageLimit { url, pages });
            }
        }

        Ok(items)
    }
}

fn status_error(url: &str, response: &HttpResponse) -> ApiError {
    let message = response
        .json::<ErrorEnvelope>()
        .map(|envelope| {
            if envelope.error.code.is_empty() {
                envelope.error.message
            } else {
                format!("{}: {}", envelope.error.code, envelope.error.message)
            }
        })
        .unwrap_or_else(|_| response.text_lossy());

    ApiError::Status {
        url: url.to_string(),
        status: response.status,
        message,
    }
}

impl<C: AsyncHttpClient, T: TokenCredential> CapacityApi for ManagementClient<C, T> {
    async fn list_resource_skus(&self) -> Result<Vec<ResourceSku>, ApiError> {
        let url = self.provider_url("skus", &[("api-version", SKUS_API_VERSION)])?;
        let skus = self.get_all(url).await?;
        debug!(count = skus.len(), "Listed resource SKUs");
        Ok(skus)
    }

    async fn list_models(&self, region: &Region) -> Result<Vec<ModelDescriptor>, ApiError> {
        let path = format!("locations/{}/models", region);
        let url = self.provider_url(&path, &[("api-version", MODELS_API_VERSION)])?;
        let models = self.get_all(url).await?;
        debug!(region = %region, count = models.len(), "Listed models");
        Ok(models)
    }

    async fn model_capacities(
        &self,
        name: &str,
        version: &str,
    ) -> Result<Vec<ModelCapacityEntry>, ApiError> {
        let url = self.provider_url(
            "modelCapacities",
            &[
                ("api-version", CAPACITIES_API_VERSION),
                ("modelFormat", OPENAI_KIND),
                ("modelName", name),
                ("modelVersion", version),
            ],
        )?;
        self.get_all(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenCredential;
    use crate::http::{HttpError, MockAsyncHttpClient};
    use serde_json::json;

    const SUB: &str = "00000000-0000-0000-0000-000000000001";

    fn base() -> String {
        format!(
            "{}/subscriptions/{}/providers/Microsoft.CognitiveServices",
            DEFAULT_MANAGEMENT_ENDPOINT, SUB
        )
    }

    fn client(http: MockAsyncHttpClient) -> ManagementClient<MockAsyncHttpClient, StaticTokenCredential> {
        ManagementClient::new(http, StaticTokenCredential::new("mgmt-token"), SUB)
    }

    #[tokio::test]
    async fn test_follows_next_link() {
        let page2 = "https://management.azure.com/page2";
        let http = MockAsyncHttpClient::new()
            .json(
                page2,
                json!({"value": [{"kind": "OpenAI", "locations": ["westus"]}]}),
            )
            .json(
                &format!("{}/skus", base()),
                json!({
                    "value": [{"kind": "OpenAI", "locations": ["eastus"]}],
                    "nextLink": page2
                }),
            );
        let client = client(http);

        let skus = client.list_resource_skus().await.unwrap();
        assert_eq!(skus.len(), 2);
        assert_eq!(skus[1].locations, vec!["westus".to_string()]);

        let requests = client.http.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].url.contains("api-version=2023-05-01"));
        assert!(requests
            .iter()
            .all(|r| r.headers.contains(&("Authorization".to_string(), "Bearer mgmt-token".to_string()))));
    }

    #[tokio::test]
    async fn test_self_referencing_next_link_stops() {
        let url = format!("{}/skus?api-version=2023-05-01", base());
        let http = MockAsyncHttpClient::new().json(
            &url,
            json!({"value": [{"locations": ["eastus"]}], "nextLink": url}),
        );
        let client = client(http);

        let skus = client.list_resource_skus().await.unwrap();
        assert_eq!(skus.len(), 1);
        assert_eq!(client.http.request_count(), 1);
    }

    #[tokio::test]
    async fn test_endless_pagination_is_an_error() {
        let page_a = "https://management.azure.com/page-a";
        let page_b = "https://management.azure.com/page-b";
        let http = MockAsyncHttpClient::new()
            .json(page_a, json!({"value": [], "nextLink": page_b}))
            .json(page_b, json!({"value": [], "nextLink": page_a}))
            .json(
                &format!("{}/skus", base()),
                json!({"value": [{"locations": ["eastus"]}], "nextLink": page_a}),
            );
        let client = client(http);

        let err = client.list_resource_skus().await.unwrap_err();

        assert!(matches!(err, ApiError::PageLimit { pages: MAX_PAGES, .. }));
        assert_eq!(client.http.request_count(), MAX_PAGES);
    }

    #[tokio::test]
    async fn test_capacity_query_encodes_parameters() {
        let http = MockAsyncHttpClient::new().json(
            &format!("{}/modelCapacities", base()),
            json!({"value": [
                {"name": "ProvisionedManaged", "location": "eastus", "properties": {"availableCapacity": 100}}
            ]}),
        );
        let client = client(http);

        let entries = client.model_capacities("gpt 4", "1.0").await.unwrap();
        assert_eq!(entries[0].available(), 100);

        let requests = client.http.requests.lock().unwrap();
        let url = &requests[0].url;
        assert!(url.contains("api-version=2024-04-01-preview"));
        assert!(url.contains("modelFormat=OpenAI"));
        assert!(url.contains("modelName=gpt+4") || url.contains("modelName=gpt%204"));
        assert!(url.contains("modelVersion=1.0"));
    }

    #[tokio::test]
    async fn test_list_models_uses_region_path() {
        let http = MockAsyncHttpClient::new().json(
            &format!("{}/locations/swedencentral/models", base()),
            json!({"value": [{"kind": "OpenAI", "model": {"name": "gpt-4o", "version": "1"}}]}),
        );
        let client = client(http);

        let models = client.list_models(&Region::new("SwedenCentral")).await.unwrap();
        assert_eq!(models.len(), 1);
    }

    #[tokio::test]
    async fn test_error_status_carries_arm_message() {
        let http = MockAsyncHttpClient::new().route(
            &format!("{}/skus", base()),
            Ok(HttpResponse::new(
                403,
                json!({"error": {"code": "AuthorizationFailed", "message": "no access"}}).to_string(),
            )),
        );
        let client = client(http);

        let err = client.list_resource_skus().await.unwrap_err();
        match err {
            ApiError::Status { status, message, .. } => {
                assert_eq!(status, 403);
                assert_eq!(message, "AuthorizationFailed: no access");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let http = MockAsyncHttpClient::new().route(
            &base(),
            Err(HttpError::Timeout {
                url: "u".to_string(),
            }),
        );
        let client = client(http);

        let err = client.list_models(&Region::new("eastus")).await.unwrap_err();
        assert!(matches!(err, ApiError::Http(HttpError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let http = MockAsyncHttpClient::new().route(
            &base(),
            Ok(HttpResponse::new(200, "<html>")),
        );
        let client = client(http);

        let err = client.list_resource_skus().await.unwrap_err();
        assert!(matches!(err, ApiError::Parse { .. }));
    }

    #[test]
    fn test_with_endpoint_trims_slash() {
        let client = client(MockAsyncHttpClient::new()).with_endpoint("https://management.usgovcloudapi.net/");
        assert_eq!(client.endpoint(), "https://management.usgovcloudapi.net");
        assert_eq!(client.subscription_id(), SUB);
    }
}
