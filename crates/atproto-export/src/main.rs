//! atproto-export - export an AT Protocol account to local disk

use std::process::ExitCode;

use atproto_export::{load_config, Cli, Exporter, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging() {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging() -> Result<()> {
    let env_filter = EnvFilter::from_default_env()
        .add_directive("atproto_export=info".parse()?)
        .add_directive("atproto_identity=info".parse()?)
        .add_directive("atproto_repo=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config()?;
    let exporter = Exporter::new(config)?;

    let summary = exporter.run(&cli.handle_or_did, &cli.out).await?;
    info!(
        did = %summary.did,
        dir = %summary.account_dir.display(),
        records = summary.records,
        blobs = summary.blobs.downloaded,
        "Export complete"
    );

    Ok(())
}
