//! Username and password resolution for commands that log in

use anyhow::{Context, Result};
use dialoguer::Input;
use is_terminal::IsTerminal;

use crate::config::{Config, env_password};

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Resolve credentials from flags, config and environment, prompting for the rest
pub fn resolve(username: Option<String>, config: &Config) -> Result<Credentials> {
    let username = username
        .or_else(|| config.service.username.clone())
        .filter(|u| !u.trim().is_empty());
    let password = env_password();

    let interactive = std::io::stdin().is_terminal();
    if !interactive && (username.is_none() || password.is_none()) {
        anyhow::bail!(
            "Username and password are required. Set TREASURY_USERNAME and TREASURY_PASSWORD when not running in a terminal."
        );
    }

    let username = match username {
        Some(u) => u,
        None => Input::<String>::new()
            .with_prompt("Username")
            .interact_text()
            .context("Failed to read username")?,
    };

    let password = match password {
        Some(p) => p,
        None => rpassword::prompt_password(format!("Password for {}: ", username))
            .context("Failed to read password")?,
    };

    Ok(Credentials {
        username: username.trim().to_string(),
        password,
    })
}
