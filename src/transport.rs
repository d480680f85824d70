//! HTTP transport abstraction underneath the fetch client

use crate::{constants::USER_AGENT, error::FetchError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// A raw upstream response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// Creates a response from a status code and body
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// True for any 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for issuing a single GET attempt
///
/// Implementations perform exactly one network round trip and report what
/// happened; retrying is the fetch client's job.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends one GET request with the given headers
    ///
    /// # Returns
    /// The response whatever its status, or an error if none arrived
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<HttpResponse, FetchError>;

    /// Returns the name of this transport
    fn transport_name(&self) -> &'static str;
}

/// Transport backed by a shared reqwest client
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport whose every attempt times out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<HttpResponse, FetchError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(classify)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;

        Ok(HttpResponse { status, body })
    }

    fn transport_name(&self) -> &'static str {
        "reqwest"
    }
}

/// Maps a reqwest failure onto the retry taxonomy
///
/// Builder errors mean the request never left the process, so retrying
/// cannot help.
fn classify(e: reqwest::Error) -> FetchError {
    if e.is_builder() {
        FetchError::invalid_request(e.to_string())
    } else if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(e)
    }
}
