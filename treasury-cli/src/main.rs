mod api;
mod cli;
mod config;
mod export;
mod import;
mod workbook;

use anyhow::Result;
use clap::Parser;

use cli::commands::{download, import as import_cmd, login};
use cli::{Cli, Commands, notify};
use config::Config;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli).await {
        log::debug!("Command failed: {:?}", e);
        notify::error(&notify::describe(&e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Login { username } => login::handle_login_command(&config, username).await,
        Commands::Download(args) => download::handle_download_command(&config, args).await,
        Commands::Import {
            workbook,
            sheet,
            username,
        } => import_cmd::handle_import_command(&config, workbook, sheet, username).await,
    }
}

/// `RUST_LOG` wins; otherwise warn, raised by each `-v`
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}
