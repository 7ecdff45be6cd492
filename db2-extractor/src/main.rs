//! DB2 extractor command line entry point.
//!
//! Reads `config.json` from the data directory, connects to the configured
//! database and runs the requested action. `run` writes CSV files and
//! manifests below `<data>/out/tables`. `testConnection` and `getTables`
//! print their JSON response on stdout.
//!
//! # Exit Codes
//! - `0`: the action succeeded
//! - `1`: user error (configuration, connection, query)
//! - `2`: application error (I/O, manifest persistence)
//!
//! # Security Guarantees
//! - Read-only database operations only
//! - Passwords are never logged or echoed

use clap::Parser;
use db2_extractor_core::{
    Application, Config, ExtractorError, Result, connect, logging::init_logging,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error, info};

#[derive(Parser)]
#[command(name = "db2-extractor")]
#[command(about = "Export DB2 tables and queries to CSV with manifests")]
#[command(version)]
#[command(long_about = "
DB2 Extractor - export query results from IBM DB2 into CSV files

The configuration is read from <DATA>/config.json. Its action selects what
happens:

  run             export every enabled table to <DATA>/out/tables
  testConnection  print {\"status\":\"success\"} when the database answers
  getTables       print the user tables and their columns as JSON

EXAMPLES:
  db2-extractor --data /data
  KBC_DATADIR=/data db2-extractor -v
")]
struct Cli {
    /// Data directory holding config.json
    #[arg(
        short,
        long,
        env = "KBC_DATADIR",
        default_value = "/data",
        help = "Data directory containing config.json and receiving out/tables"
    )]
    data: PathBuf,

    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    verbose: u8,

    /// Suppress output
    #[arg(short, long, help = "Suppress all log output except errors")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = Config::load(&cli.data);
    // Actions answering on stdout only log errors
    let quiet = cli.quiet
        || config
            .as_ref()
            .is_ok_and(|config| config.action.prints_response());

    if let Err(e) = init_logging(cli.verbose, quiet) {
        eprintln!("{}", e);
        return ExitCode::from(2);
    }

    let result = match config {
        Ok(config) => run(config, &cli.data).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(data = %e.data(), "{}", e);
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(2))
        }
    }
}

/// Runs the configured action and prints its response when it has one.
async fn run(config: Config, data_dir: &Path) -> Result<()> {
    config.validate()?;
    let action = config.action;
    debug!("Connecting to {}", config.parameters.db);

    let connection = connect(&config.parameters.db).await?;
    let response = Application::new(config, connection, data_dir).run().await?;

    if action.prints_response() {
        let json = serde_json::to_string(&response).map_err(|e| ExtractorError::Serialization {
            context: format!("Failed to serialize {} response", action),
            source: e,
        })?;
        println!("{}", json);
    } else {
        info!("Extraction finished");
    }

    Ok(())
}
