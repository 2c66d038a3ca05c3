use std::error::Error;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use bitcrawler::cli::{self, CliArgs};
use bitcrawler::{EsploraClient, Session};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = CliArgs::parse();
    init_logging(args.log_file.as_deref())?;

    let config = args.to_config();
    let client = EsploraClient::new(&config)?;
    info!(network = %config.network, api = client.base_url(), "starting session");

    let session = Session::with_config(client, &config);
    cli::run_interactive_mode(session, args.load).await
}

// Defaults to warnings only so log lines do not interleave with the prompt.
fn init_logging(log_file: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
    Ok(())
}
