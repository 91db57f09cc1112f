//! Shared HTTP plumbing for the backend adapters
//!
//! Every adapter posts JSON and reads back a body. This client owns the
//! connection pool and the family's throttle, checks the status, and maps
//! failures onto [`LlmError`].

use crate::config::BackendFamily;
use crate::error::{LlmError, LlmResult};
use crate::internals::rate_limit::Throttle;
use crate::logging::{log_debug, log_error};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Instant;

/// A 2xx response body
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: StatusCode,
    pub body: String,
}

#[derive(Debug)]
pub struct BackendHttpClient {
    client: reqwest::Client,
    family: BackendFamily,
    throttle: Throttle,
}

impl BackendHttpClient {
    pub fn new(family: BackendFamily, requests_per_minute: Option<u32>) -> Self {
        Self::with_client(reqwest::Client::new(), family, requests_per_minute)
    }

    pub fn with_client(
        client: reqwest::Client,
        family: BackendFamily,
        requests_per_minute: Option<u32>,
    ) -> Self {
        let throttle = Throttle::per_minute(requests_per_minute);
        log_debug!(
            family = %family,
            throttled = throttle.is_enabled(),
            "Backend HTTP client initialized"
        );
        Self {
            client,
            family,
            throttle,
        }
    }

    /// JSON content-type plus an optional bearer credential.
    pub fn json_headers(bearer: Option<&str>) -> LlmResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = bearer {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                    LlmError::configuration_error(format!("Invalid credential format: {e}"))
                })?,
            );
        }
        Ok(headers)
    }

    /// POST `body` as JSON and return the body of a 2xx response.
    ///
    /// Non-2xx statuses become errors via [`error_from_status`].
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        headers: HeaderMap,
        body: &B,
    ) -> LlmResult<HttpReply> {
        self.throttle.acquire().await;

        let started = Instant::now();
        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                log_error!(
                    family = %self.family,
                    url = %url,
                    error = %e,
                    "HTTP request failed"
                );
                LlmError::request_failed(
                    format!("{} request failed: {e}", self.family),
                    Some(Box::new(e)),
                )
            })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok());
        let body = response.text().await.map_err(|e| {
            LlmError::request_failed(
                format!("{} response body unreadable: {e}", self.family),
                Some(Box::new(e)),
            )
        })?;

        log_debug!(
            family = %self.family,
            status = status.as_u16(),
            body_len = body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Backend responded"
        );

        if !status.is_success() {
            return Err(error_from_status(self.family, status, retry_after, &body));
        }

        Ok(HttpReply { status, body })
    }
}

/// Map a non-success HTTP status onto the error taxonomy
pub fn error_from_status(
    family: BackendFamily,
    status: StatusCode,
    retry_after: Option<u64>,
    body: &str,
) -> LlmError {
    log_error!(
        family = %family,
        status = %status,
        error_text = %crate::logging::preview(body, 500),
        "Backend error response"
    );

    match status.as_u16() {
        401 | 403 => LlmError::authentication_failed(format!("{family} rejected credential: {status}")),
        429 => LlmError::rate_limit_exceeded(retry_after.unwrap_or(60)),
        _ => LlmError::request_failed(format!("{family} API error {status}: {body}"), None),
    }
}
