//! Retrying fetch client
//!
//! Issues GET requests through an [`HttpTransport`], retrying transient
//! failures with exponential backoff. Failures are surfaced unchanged; the
//! decision to degrade belongs to the caller.

use crate::{
    backoff::{is_retryable_status, RetryPolicy},
    error::FetchError,
    transport::{HttpResponse, HttpTransport},
};
use std::sync::Arc;
use tokio::time::sleep;

/// Header sent on every attempt
const ACCEPT_JSON: (&str, &str) = ("Accept", "application/json");

/// Fetch client applying a retry policy on top of a transport
pub struct FetchClient {
    transport: Arc<dyn HttpTransport>,
    headers: Vec<(String, String)>,
}

impl FetchClient {
    /// Creates a client that sends `Accept: application/json` by default
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            headers: vec![(ACCEPT_JSON.0.to_string(), ACCEPT_JSON.1.to_string())],
        }
    }

    /// Adds a header to every request, replacing any earlier value for the same name
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Name of the underlying transport, for logs
    pub fn transport_name(&self) -> &'static str {
        self.transport.transport_name()
    }

    /// Requests `url`, retrying per `policy`
    ///
    /// # Returns
    /// The first successful or non-retryable response. When every attempt
    /// fails transiently, the last failing response, or the last network
    /// error if no response ever arrived.
    pub async fn request(&self, url: &str, policy: &RetryPolicy) -> Result<HttpResponse, FetchError> {
        let mut attempt = 0u32;

        loop {
            let outcome = self.transport.get(url, &self.headers).await;

            let retryable = match &outcome {
                Ok(response) => is_retryable_status(response.status),
                Err(e) => e.is_retryable(),
            };

            if !retryable || !policy.has_next(attempt) {
                if retryable {
                    tracing::warn!(
                        url,
                        attempts = attempt + 1,
                        "Retries exhausted"
                    );
                }
                return outcome;
            }

            let delay = policy.delay(attempt);
            match &outcome {
                Ok(response) => tracing::warn!(
                    url,
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts(),
                    status = response.status,
                    delay_ms = delay.as_millis() as u64,
                    "Transient HTTP status, retrying"
                ),
                Err(e) => tracing::warn!(
                    url,
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts(),
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "Request failed, retrying"
                ),
            }

            sleep(delay).await;
            attempt += 1;
        }
    }

    /// Requests `url` and requires a 2xx response
    ///
    /// Non-success responses left after retrying become [`FetchError::Status`].
    pub async fn get_ok(&self, url: &str, policy: &RetryPolicy) -> Result<String, FetchError> {
        let response = self.request(url, policy).await?;
        if response.is_success() {
            Ok(response.body)
        } else {
            Err(FetchError::Status {
                status: response.status,
                body: response.body,
            })
        }
    }
}
