//! Azure Blob Storage backend over the Blob REST API.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::{CapacityStore, SinkError, StoredBlob};
use crate::auth::{TokenCredential, STORAGE_SCOPE};
use crate::http::{AsyncHttpClient, HttpRequest, HttpResponse};

/// Blob service version; bearer authentication needs 2017-11-09 or later.
pub const BLOB_API_VERSION: &str = "2021-08-06";

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Block blobs in one container of a storage account.
pub struct AzureBlobStore<C: AsyncHttpClient, T: TokenCredential> {
    http: C,
    credential: T,
    endpoint: String,
    container: String,
}

/// Parses an RFC 2822 header date such as `Wed, 01 May 2024 10:00:00 GMT`.
fn parse_header_date(value: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value?.trim())
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

fn status_error(url: &str, response: &HttpResponse) -> SinkError {
    let message = response
        .header("x-ms-error-code")
        .map(str::to_string)
        .unwrap_or_else(|| response.text_lossy());
    SinkError::Status {
        url: url.to_string(),
        status: response.status,
        message,
    }
}

impl<C: AsyncHttpClient, T: TokenCredential> AzureBlobStore<C, T> {
    /// Creates a store for `container` in `account`.
    pub fn new(
        http: C,
        credential: T,
        account: &str,
        container: impl Into<String>,
    ) -> Result<Self, SinkError> {
        let account = account.trim();
        if account.is_empty() {
            return Err(SinkError::Config("storage account is not set".to_string()));
        }
        let container = container.into();
        if container.trim().is_empty() {
            return Err(SinkError::Config("storage container is not set".to_string()));
        }

        Ok(Self {
            http,
            credential,
            endpoint: format!("https://{}.blob.core.windows.net", account),
            container: container.trim().to_string(),
        })
    }

    /// Overrides the account endpoint (e.g. a local emulator).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn blob_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.container, key)
    }

    async fn bearer(&self) -> Result<String, SinkError> {
        Ok(self.credential.token(STORAGE_SCOPE).await?.token)
    }
}

impl<C: AsyncHttpClient, T: TokenCredential> CapacityStore for AzureBlobStore<C, T> {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), SinkError> {
        let url = self.blob_url(key);
        let size = bytes.len();
        let request = HttpRequest::put(url.as_str(), bytes)
            .bearer(&self.bearer().await?)
            .header("x-ms-version", BLOB_API_VERSION)
            .header("x-ms-blob-type", "BlockBlob")
            .header("Content-Type", CSV_CONTENT_TYPE);

        let response = self.http.send(request).await?;
        if !response.is_success() {
            return Err(status_error(&url, &response));
        }

        info!(url = %url, bytes = size, "Uploaded blob");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredBlob>, SinkError> {
        let url = self.blob_url(key);
        let request = HttpRequest::get(url.as_str())
            .bearer(&self.bearer().await?)
            .header("x-ms-version", BLOB_API_VERSION);

        let response = self.http.send(request).await?;
        if response.status == 404 {
            debug!(url = %url, "Blob not found");
            return Ok(None);
        }
        if !response.is_success() {
            return Err(status_error(&url, &response));
        }

        Ok(Some(StoredBlob {
            created: parse_header_date(response.header("x-ms-creation-time")),
            last_modified: parse_header_date(response.header("Last-Modified")),
            bytes: response.body,
        }))
    }

    fn describe(&self, key: &str) -> String {
        self.blob_url(key)
    }
}
