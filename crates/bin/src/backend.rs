//! Backend creation and utility functions.

use std::path::PathBuf;

use enrollsync::backend::{
    Backend as BackendImpl,
    database::{InMemory, Postgres, Sqlite},
};

use crate::cli::{Backend, BackendArgs};

const SQLITE_FILE: &str = "enrollsync.db";
const JSON_FILE: &str = "enrollsync.json";

/// Redact credentials from a PostgreSQL connection URL for safe logging
pub fn redact_postgres_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            if !parsed.username().is_empty() {
                let _ = parsed.set_username("***");
            }
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("***"));
            }
            parsed.to_string()
        }
        Err(_) => "postgres://***@<unparsable-url>".to_string(),
    }
}

fn json_path(args: &BackendArgs) -> PathBuf {
    args.data_dir().join(JSON_FILE)
}

/// Create the appropriate backend based on configuration
pub async fn create_backend(
    args: &BackendArgs,
) -> Result<Box<dyn BackendImpl>, Box<dyn std::error::Error>> {
    let data_dir = args.data_dir();

    match args.backend {
        Backend::Sqlite => {
            tokio::fs::create_dir_all(&data_dir).await?;
            let db_path = data_dir.join(SQLITE_FILE);
            tracing::info!("Using SQLite backend at {}", db_path.display());
            Ok(Box::new(Sqlite::open_sqlite(&db_path).await?))
        }
        Backend::Postgres => {
            let url = args
                .postgres_url
                .as_ref()
                .ok_or("PostgreSQL backend requires --postgres-url or ENROLLSYNC_POSTGRES_URL")?;

            let display_url = redact_postgres_url(url);
            tracing::info!("Connecting to PostgreSQL backend at {}", display_url);

            match Postgres::connect_postgres(url).await {
                Ok(backend) => {
                    tracing::info!("Connected to PostgreSQL successfully");
                    Ok(Box::new(backend))
                }
                Err(e) => {
                    Err(format!("Failed to connect to PostgreSQL at {display_url}: {e}").into())
                }
            }
        }
        Backend::Inmemory => {
            let json_path = json_path(args);
            tracing::info!(
                "Using in-memory backend with persistence at {}",
                json_path.display()
            );
            // A missing file loads as an empty store; a corrupt one is fatal
            // so the save after the run cannot overwrite it.
            Ok(Box::new(InMemory::load_from_file(&json_path).await?))
        }
    }
}

/// Write an in-memory backend back to its file. Other backends commit as
/// they go.
pub async fn persist(
    backend: &dyn BackendImpl,
    args: &BackendArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(in_memory) = backend.as_any().downcast_ref::<InMemory>() else {
        return Ok(());
    };

    let data_dir = args.data_dir();
    tokio::fs::create_dir_all(&data_dir).await?;
    let json_path = json_path(args);
    in_memory.save_to_file(&json_path).await?;
    tracing::info!("Saved data to {}", json_path.display());
    Ok(())
}
