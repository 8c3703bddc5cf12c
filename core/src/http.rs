use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::errors::{ServiceError, ServiceResult};

/// Builds the HTTP client shared by every call a service client makes.
///
/// A bearer token, when configured, is attached as a default header.
pub fn build_http_client(timeout: Duration, bearer_token: Option<&str>) -> ServiceResult<Client> {
    let mut headers = HeaderMap::new();
    if let Some(token) = bearer_token {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
            ServiceError::ConfigError(format!("Invalid bearer token: {}", e))
        })?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .default_headers(headers)
        .build()
        .map_err(|e| ServiceError::ConfigError(format!("Failed to create HTTP client: {}", e)))
}

/// Sends a prepared request and decodes a JSON success body.
///
/// Non-2xx responses become `ServiceError::HttpError`; there is no retry.
pub async fn send_json<R: DeserializeOwned>(request: RequestBuilder, operation: &str) -> ServiceResult<R> {
    let response = request.send().await.map_err(|e| {
        ServiceError::RequestError(format!("Failed to send {} request: {}", operation, e))
    })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| {
        ServiceError::ResponseError(format!("Failed to read {} response: {}", operation, e))
    })?;

    if !status.is_success() {
        return Err(ServiceError::from_error_body(status.as_u16(), &body));
    }

    debug!(operation, bytes = body.len(), "Received service response");

    serde_json::from_str::<R>(&body).map_err(|e| {
        ServiceError::ParsingError(format!("Failed to parse {} response: {}", operation, e))
    })
}

/// Joins path segments onto a base endpoint, percent-encoding each segment.
///
/// Model identifiers may be ARNs containing `/`, which must stay inside one segment.
pub fn endpoint_url(base: &str, segments: &[&str]) -> ServiceResult<reqwest::Url> {
    let mut url = reqwest::Url::parse(base)
        .map_err(|e| ServiceError::ConfigError(format!("Invalid endpoint '{}': {}", base, e)))?;

    url.path_segments_mut()
        .map_err(|_| ServiceError::ConfigError(format!("Endpoint '{}' cannot carry a path", base)))?
        .pop_if_empty()
        .extend(segments);

    Ok(url)
}
