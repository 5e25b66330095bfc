//! OData Query Builder Module
//!
//! Turns a download request (dataset, page size, projection) into the query
//! path sent to the treasury service.

pub mod builder;
pub mod request;

pub use builder::{SERVICE_ROOT, build_endpoint};
pub use request::{DatasetKind, DownloadRequest, RecordLimit, ValidationError, parse_field_list};
