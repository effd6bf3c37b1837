//! HTTP client for the restaurant listing API.

use reqwest::Client;
use tracing::debug;

use crate::models::Restaurant;

use super::ApiError;

/// HTTP request timeout in seconds.
/// 30s allows for slow responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// API client for the restaurant listing service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client for the given base URL.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Fetch the full restaurant listing.
    ///
    /// A single unauthenticated GET; no pagination. A transport failure or
    /// a body that is not a JSON array of records is an error.
    pub async fn fetch_restaurants(&self) -> Result<Vec<Restaurant>, ApiError> {
        let url = format!("{}/restaurants", self.base_url);
        let response = self.client.get(&url).send().await?;
        let response = Self::check_response(response).await?;

        let text = response.text().await?;
        debug!(url = %url, bytes = text.len(), "restaurants response received");

        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("malformed restaurant listing: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_stripped_from_base_url() {
        let client = ApiClient::new("http://localhost:1337/").unwrap();
        assert_eq!(client.base_url, "http://localhost:1337");
    }
}
