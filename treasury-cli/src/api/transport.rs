//! HTTP transport seam
//!
//! The client and authenticator talk to the network only through
//! [`HttpTransport`], so tests can script responses and failures.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;

/// Characters of a response body kept for error reports
pub const BODY_EXCERPT_LEN: usize = 100;

/// Status and body of a completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    #[cfg(test)]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Leading part of the body for error messages
    pub fn excerpt(&self) -> String {
        self.body.chars().take(BODY_EXCERPT_LEN).collect()
    }
}

/// The request never produced a response (DNS, connect, timeout, ...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "network error: {}", self.message)
    }
}

impl std::error::Error for TransportError {}

/// Header name/value pairs sent with a request
pub type Headers = Vec<(String, String)>;

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str, headers: &Headers) -> Result<HttpResponse, TransportError>;

    async fn post_json(
        &self,
        url: &str,
        headers: &Headers,
        body: &serde_json::Value,
    ) -> Result<HttpResponse, TransportError>;
}

/// Production transport on top of reqwest
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http })
    }

    async fn finish(response: reqwest::Response) -> Result<HttpResponse, TransportError> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;
        debug!("Response {} ({} bytes)", status, body.len());
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, headers: &Headers) -> Result<HttpResponse, TransportError> {
        debug!("GET {}", url);
        let mut request = self.http.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;
        Self::finish(response).await
    }

    async fn post_json(
        &self,
        url: &str,
        headers: &Headers,
        body: &serde_json::Value,
    ) -> Result<HttpResponse, TransportError> {
        debug!("POST {}", url);
        let mut request = self.http.post(url).json(body);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;
        Self::finish(response).await
    }
}
