pub mod commands;
pub mod credentials;
pub mod notify;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "treasury-cli",
    version,
    about = "Download treasury data into a workbook and import rows back to the service."
)]
pub struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "TREASURY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check credentials against the service.
    Login {
        /// Username (default: config or TREASURY_USERNAME)
        #[arg(long)]
        username: Option<String>,
    },
    /// Download a dataset into its sheet.
    Download(DownloadArgs),
    /// Send the active sheet's A1:B2 block to the import endpoint.
    Import {
        /// Workbook to read from and write the result sheet to
        #[arg(long)]
        workbook: Option<PathBuf>,
        /// Sheet to import from (default: the first sheet)
        #[arg(long)]
        sheet: Option<String>,
        /// Username (default: config or TREASURY_USERNAME)
        #[arg(long)]
        username: Option<String>,
    },
}

#[derive(clap::Args)]
pub struct DownloadArgs {
    /// accounts, flow-codes or cash-flows
    pub dataset: String,

    /// Number of records, or `all`
    #[arg(long)]
    pub limit: Option<String>,

    /// Comma-separated cash-flow fields
    #[arg(long)]
    pub fields: Option<String>,

    /// Workbook to write into
    #[arg(long)]
    pub workbook: Option<PathBuf>,

    /// Username (default: config or TREASURY_USERNAME)
    #[arg(long)]
    pub username: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_args() {
        let cli = Cli::parse_from([
            "treasury-cli",
            "-vv",
            "download",
            "cash-flows",
            "--limit",
            "all",
            "--fields",
            "Id,Amount",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Download(args) => {
                assert_eq!(args.dataset, "cash-flows");
                assert_eq!(args.limit.as_deref(), Some("all"));
                assert_eq!(args.fields.as_deref(), Some("Id,Amount"));
                assert!(args.workbook.is_none());
            }
            _ => panic!("expected download"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["treasury-cli", "import", "--sheet", "Data", "--no-color"]);
        assert!(cli.no_color);
        match cli.command {
            Commands::Import { sheet, workbook, username } => {
                assert_eq!(sheet.as_deref(), Some("Data"));
                assert!(workbook.is_none());
                assert!(username.is_none());
            }
            _ => panic!("expected import"),
        }
    }

    #[test]
    fn test_import_username() {
        let cli = Cli::parse_from(["treasury-cli", "import", "--username", "ana"]);
        match cli.command {
            Commands::Import { username, .. } => assert_eq!(username.as_deref(), Some("ana")),
            _ => panic!("expected import"),
        }
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
