use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod backend;
mod cli;
mod output;

mod commands {
    pub mod analyze;
    pub mod rollback;
    pub mod update;
    pub mod verify;
}

use cli::{Cli, Mode};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout carries only the report
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("enrollsync=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(mode = ?cli.mode, "Run aborted: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli.config()?;
    let backend = backend::create_backend(&cli.backend_config).await?;

    match cli.mode {
        Mode::Update => {
            commands::update::run(backend.as_ref(), &config).await?;
            backend::persist(backend.as_ref(), &cli.backend_config).await?;
        }
        Mode::Analyze => commands::analyze::run(backend.as_ref(), &config).await?,
        Mode::Verify => commands::verify::run(backend.as_ref(), &config).await?,
        Mode::Rollback => {
            commands::rollback::run(backend.as_ref(), &config).await?;
            backend::persist(backend.as_ref(), &cli.backend_config).await?;
        }
    }
    Ok(())
}
