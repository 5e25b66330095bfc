use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::*;

use crate::cli::notify;
use crate::config::Config;
use crate::import::Importer;
use crate::workbook::{DocumentHost, SheetError, Transaction};

pub async fn handle_import_command(
    config: &Config,
    workbook: Option<PathBuf>,
    sheet: Option<String>,
    username: Option<String>,
) -> Result<()> {
    let path = workbook.unwrap_or_else(|| config.download.workbook.clone());
    if !path.exists() {
        anyhow::bail!("Workbook does not exist: {}", path.display());
    }

    let authenticator = super::authenticate(config, username).await?;
    let user = authenticator
        .session()
        .map(|s| s.username().to_string())
        .context("Login finished without a session")?;
    log::info!("Importing as {}", user);

    let mut workbook = super::open_workbook(&path)?;

    if let Some(name) = sheet {
        activate(&mut workbook, &name)?;
    }

    let importer = Importer::new(
        super::transport(config)?,
        config.service.import_url.clone(),
        crate::api::RetryConfig::from_settings(&config.retry),
    );
    let receipt = importer.import_active_row(&mut workbook).await?;

    workbook
        .save(&path)
        .with_context(|| format!("Failed to save workbook: {}", path.display()))?;

    notify::success("Data imported successfully");
    println!(
        "Remote id {} recorded in sheet {}",
        receipt.remote_id.to_string().cyan(),
        receipt.result_sheet.cyan()
    );
    Ok(())
}

/// Make `name` the active sheet
fn activate<H: DocumentHost + ?Sized>(host: &mut H, name: &str) -> Result<(), SheetError> {
    let mut lookup = Transaction::new();
    let exists = lookup.sheet_exists(name);
    if !lookup.sync(host)?.flag(exists)? {
        return Err(SheetError::NotFound {
            sheet: name.to_string(),
        });
    }

    let mut select = Transaction::new();
    select.activate(name);
    select.sync(host)?;
    Ok(())
}
