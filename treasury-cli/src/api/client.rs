//! Treasury OData client

use std::fmt;
use std::sync::Arc;

use log::{debug, info};
use reqwest::Url;
use serde_json::{Map, Value};

use super::auth::{AuthError, Session, build_auth_header};
use super::query::SERVICE_ROOT;
use super::resilience::{RetryConfig, RetryError, RetryPolicy, RetryableError};
use super::transport::{Headers, HttpResponse, HttpTransport, TransportError};

/// A record as returned by the service, keys in the order they were sent
pub type RawRecord = Map<String, Value>;

/// Failures while downloading records
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// No usable session
    Auth(AuthError),
    /// Endpoint could not be resolved against the base URL
    InvalidEndpoint(String),
    /// Every attempt hit a network failure
    RetriesExhausted { attempts: u32, last: TransportError },
    /// The service answered with a non-success status
    Status { status: u16, body_excerpt: String },
    /// The body was not the expected JSON
    Decode(String),
    /// The payload had no records
    EmptyResult,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Auth(e) => write!(f, "{}", e),
            FetchError::InvalidEndpoint(e) => write!(f, "invalid endpoint: {}", e),
            FetchError::RetriesExhausted { attempts, last } => write!(
                f,
                "failed to fetch data after {} attempts ({})",
                attempts, last
            ),
            FetchError::Status {
                status,
                body_excerpt,
            } => write!(f, "server answered {}: {}", status, body_excerpt),
            FetchError::Decode(e) => write!(f, "unexpected response body: {}", e),
            FetchError::EmptyResult => write!(f, "no data received from the server"),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<AuthError> for FetchError {
    fn from(e: AuthError) -> Self {
        FetchError::Auth(e)
    }
}

impl RetryableError for TransportError {
    fn is_retryable(&self) -> bool {
        true
    }
}

/// Headers for every call to the data service
fn service_headers(authorization: String) -> Headers {
    vec![
        (
            "Content-Type".to_string(),
            "application/json; charset=utf-8".to_string(),
        ),
        (
            "Accept".to_string(),
            "application/json; charset=utf-8".to_string(),
        ),
        ("Authorization".to_string(), authorization),
    ]
}

/// Client for the OData surface behind the local proxy
#[derive(Clone)]
pub struct ODataClient {
    transport: Arc<dyn HttpTransport>,
    base_url: Url,
    retry: RetryPolicy,
}

impl ODataClient {
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: Url, retry: RetryConfig) -> Self {
        Self {
            transport,
            base_url,
            retry: RetryPolicy::new(retry),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn resolve(&self, endpoint: &str) -> Result<Url, FetchError> {
        self.base_url
            .join(endpoint)
            .map_err(|e| FetchError::InvalidEndpoint(format!("{}: {}", endpoint, e)))
    }

    /// Single GET against the service root with the given authorization
    pub async fn check_credentials(&self, authorization: &str) -> Result<HttpResponse, TransportError> {
        let url = self
            .resolve(SERVICE_ROOT)
            .map_err(|e| TransportError::new(e.to_string()))?;
        self.transport
            .get(url.as_str(), &service_headers(authorization.to_string()))
            .await
    }

    /// Download the record collection behind `endpoint`
    pub async fn fetch_records(&self, endpoint: &str, session: &Session) -> Result<Vec<RawRecord>, FetchError> {
        let headers = service_headers(build_auth_header(Some(session))?);
        let url = self.resolve(endpoint)?;
        info!("Downloading from: {}", endpoint);

        // Only network failures are retried. A response with an error status
        // comes back as Ok and ends the loop on the first attempt.
        let response = self
            .retry
            .execute("fetch records", |_| {
                let transport = Arc::clone(&self.transport);
                let url = url.clone();
                let headers = headers.clone();
                async move { transport.get(url.as_str(), &headers).await }
            })
            .await
            .map_err(|e| match e {
                RetryError::Exhausted { attempts, last } => {
                    FetchError::RetriesExhausted { attempts, last }
                }
                RetryError::Aborted { attempt, error } => FetchError::RetriesExhausted {
                    attempts: attempt,
                    last: error,
                },
            })?;

        debug!("Response status: {}", response.status);
        if !response.is_success() {
            return Err(FetchError::Status {
                status: response.status,
                body_excerpt: response.excerpt(),
            });
        }

        parse_records(&response.body)
    }
}

/// Extract the `value` collection of an OData payload
pub fn parse_records(body: &str) -> Result<Vec<RawRecord>, FetchError> {
    let payload: Value = serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;

    let records = match payload.get("value") {
        Some(Value::Array(items)) => items,
        _ => return Err(FetchError::EmptyResult),
    };
    if records.is_empty() {
        return Err(FetchError::EmptyResult);
    }

    records
        .iter()
        .map(|item| match item {
            Value::Object(map) => Ok(map.clone()),
            other => Err(FetchError::Decode(format!("expected a record, got {}", other))),
        })
        .collect()
}
