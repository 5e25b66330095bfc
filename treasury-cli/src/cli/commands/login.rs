use anyhow::{Context, Result};
use colored::*;

use crate::cli::notify;
use crate::config::Config;

pub async fn handle_login_command(config: &Config, username: Option<String>) -> Result<()> {
    let authenticator = super::authenticate(config, username).await?;
    let session = authenticator
        .session()
        .context("Login finished without a session")?;

    notify::success(&format!("Welcome, {}", session.username()));
    println!(
        "Connected to {}",
        authenticator.client().base_url().as_str().cyan()
    );
    Ok(())
}
