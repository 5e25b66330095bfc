//! Treasury OData service API
//!
//! Authentication, query building and the retrying record fetch used by the
//! download pipeline, all on top of a swappable HTTP transport.

pub mod auth;
pub mod client;
pub mod query;
pub mod resilience;
pub mod transport;

pub use auth::{AuthError, Authenticator, Session};
pub use client::{FetchError, ODataClient, RawRecord};
pub use query::{DatasetKind, DownloadRequest, RecordLimit, ValidationError, build_endpoint};
pub use resilience::RetryConfig;
pub use transport::{HttpTransport, ReqwestTransport};
