//! `tablesync` - move one PostgreSQL table to and from CSV

mod logging;
mod render;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tablesync_core::{CredentialLoader, CredentialSet};
use tablesync_driver_postgres::PostgresDriver;
use tablesync_services::{CsvOptions, DatabaseTableSync, SyncOptions, ValueInference};

use crate::logging::{LogFormat, LoggingConfig};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// Credentials file (YAML, or TOML when the extension is .toml)
    #[clap(short, long, global = true, default_value = "credentials.yaml")]
    config: PathBuf,

    /// Table to extract, optionally schema-qualified
    #[clap(short, long, global = true, default_value = "loan_payments")]
    table: String,

    /// Query timeout in seconds
    #[clap(long, global = true, default_value_t = 30)]
    query_timeout: u64,

    /// Connection timeout in seconds
    #[clap(long, global = true, default_value_t = 10)]
    connect_timeout: u64,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[clap(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log output format
    #[clap(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct CsvArgs {
    /// Field delimiter, a single ASCII character
    #[clap(short, long, default_value_t = ',')]
    delimiter: char,
}

impl CsvArgs {
    fn to_options(&self) -> Result<CsvOptions> {
        if !self.delimiter.is_ascii() {
            bail!("delimiter must be a single ASCII character, got {:?}", self.delimiter);
        }
        Ok(CsvOptions::default().with_delimiter(self.delimiter as u8))
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the credentials file without connecting
    CheckConfig,

    /// Extract the table and print a preview
    Extract {
        /// Rows to show
        #[clap(long, default_value_t = 20)]
        limit: usize,
    },

    /// Extract the table and write it to a CSV file
    Export {
        /// Output file, `<table>.csv` by default
        #[clap(name = "FILE")]
        output: Option<PathBuf>,

        /// Omit the header row
        #[clap(long)]
        no_header: bool,

        #[clap(flatten)]
        csv: CsvArgs,
    },

    /// Read a CSV file and print a preview
    Import {
        /// CSV file with a header row
        #[clap(name = "FILE")]
        input: PathBuf,

        /// Parse empty fields, booleans and numbers instead of keeping text
        #[clap(long)]
        infer_types: bool,

        /// Rows to show
        #[clap(long, default_value_t = 20)]
        limit: usize,

        #[clap(flatten)]
        csv: CsvArgs,
    },
}

impl Cli {
    fn sync_options(&self) -> SyncOptions {
        SyncOptions::new(&self.table)
            .with_query_timeout(Duration::from_secs(self.query_timeout))
            .with_connect_timeout(Duration::from_secs(self.connect_timeout))
    }

    fn load_credentials(&self) -> Result<CredentialSet> {
        CredentialLoader::load(&self.config)
            .with_context(|| format!("failed to load credentials from {}", self.config.display()))
    }

    async fn connect(&self, options: SyncOptions) -> Result<DatabaseTableSync> {
        let credentials = self.load_credentials()?;
        DatabaseTableSync::create(credentials, options)
            .await
            .context("failed to connect to the database")
    }
}

async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::CheckConfig => {
            let credentials = cli.load_credentials()?;
            println!(
                "{}",
                PostgresDriver::new().redacted_connection_string(&credentials)
            );
            println!("sslmode: {}", credentials.tls().mode.as_sslmode());
            if let Some(ca_cert) = &credentials.tls().ca_cert {
                println!("sslrootcert: {}", ca_cert.display());
            }
        }
        Commands::Extract { limit } => {
            let mut sync = cli.connect(cli.sync_options()).await?;
            let result = sync.extract().await;
            let table = sync
                .finish(result)
                .await
                .with_context(|| format!("failed to extract {}", cli.table))?;

            println!("{}", render::preview(&table, *limit));
            println!("{}", render::shape_line(&table, *limit));
        }
        Commands::Export {
            output,
            no_header,
            csv,
        } => {
            let path = output
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("{}.csv", cli.table)));
            let options = cli
                .sync_options()
                .with_csv(csv.to_options()?.with_headers(!no_header));

            let mut sync = cli.connect(options).await?;
            let result = sync.export_to_csv(&path).await;
            let summary = sync
                .finish(result)
                .await
                .with_context(|| format!("failed to export {} to {}", cli.table, path.display()))?;

            println!(
                "wrote {} rows × {} columns to {}",
                summary.rows,
                summary.columns,
                summary.path.display()
            );
        }
        Commands::Import {
            input,
            infer_types,
            limit,
            csv,
        } => {
            let inference = if *infer_types {
                ValueInference::Infer
            } else {
                ValueInference::Text
            };
            let options = csv.to_options()?.with_inference(inference);
            // Reading a file needs no connection.
            let table = tablesync_services::read_csv(input, &options)
                .with_context(|| format!("failed to import {}", input.display()))?;

            println!("{}", render::preview(&table, *limit));
            println!("{}", render::shape_line(&table, *limit));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(&LoggingConfig::from_verbosity(cli.verbose, cli.log_format)) {
        eprintln!("warning: logging disabled: {e}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
