pub mod download;
pub mod import;
pub mod login;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;

use crate::api::{Authenticator, HttpTransport, ODataClient, ReqwestTransport, RetryConfig};
use crate::config::Config;
use crate::workbook::Workbook;

/// Production transport with the configured timeout
pub fn transport(config: &Config) -> Result<Arc<dyn HttpTransport>> {
    let transport = ReqwestTransport::new(Duration::from_secs(config.service.timeout_secs))?;
    Ok(Arc::new(transport))
}

/// Service client for the configured base URL
pub fn odata_client(config: &Config, transport: Arc<dyn HttpTransport>) -> Result<ODataClient> {
    let base_url = Url::parse(&config.service.base_url)
        .with_context(|| format!("Invalid service URL: {}", config.service.base_url))?;
    Ok(ODataClient::new(
        transport,
        base_url,
        RetryConfig::from_settings(&config.retry),
    ))
}

/// Resolve credentials and log in
pub async fn authenticate(config: &Config, username: Option<String>) -> Result<Authenticator> {
    let credentials = super::credentials::resolve(username, config)?;
    let client = odata_client(config, transport(config)?)?;

    let mut authenticator = Authenticator::new(client);
    authenticator
        .authenticate(&credentials.username, &credentials.password)
        .await?;
    Ok(authenticator)
}

/// Open a workbook and reapply the formatting that `.xlsx` loading drops
pub fn open_workbook(path: &Path) -> Result<Workbook> {
    let mut workbook = Workbook::open(path)?;
    crate::export::restore_formats(&mut workbook)?;
    crate::import::restore_result_formats(&mut workbook)?;
    Ok(workbook)
}
