//! SQL schema definitions and migrations.
//!
//! This module contains the database schema used by SQL backends.
//! The schema is designed to be portable between SQLite and Postgres.
//!
//! # Migration System
//!
//! Migrations are code rather than SQL files so each one can issue
//! dialect-specific statements.
//!
//! ## Adding a New Migration
//!
//! 1. Increment `SCHEMA_VERSION`
//! 2. Add a new `migrate_vN_to_vM` async function
//! 3. Add the migration to the match statement in `run_migration`

use crate::Result;
use crate::backend::errors::BackendError;

use super::SqlxBackend;

/// Current schema version.
///
/// Increment this when making schema changes that require migration.
pub const SCHEMA_VERSION: i64 = 1;

/// SQL statements to create the schema tables.
///
/// Ids are assigned by the source system, so none of the tables autoincrement.
pub const CREATE_TABLES: &[&str] = &[
    // Schema version tracking
    "CREATE TABLE IF NOT EXISTS schema_version (
        version BIGINT PRIMARY KEY
    )",
    "CREATE TABLE IF NOT EXISTS accounts (
        id BIGINT PRIMARY KEY NOT NULL,
        name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS courses (
        id BIGINT PRIMARY KEY NOT NULL,
        root_account_id BIGINT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS users (
        id BIGINT PRIMARY KEY NOT NULL,
        name TEXT NOT NULL,
        email TEXT
    )",
    // sis_pseudonym_id is the link the reconciler maintains
    "CREATE TABLE IF NOT EXISTS enrollments (
        id BIGINT PRIMARY KEY NOT NULL,
        user_id BIGINT NOT NULL,
        course_id BIGINT NOT NULL,
        enrollment_type TEXT NOT NULL,
        workflow_state TEXT NOT NULL,
        sis_pseudonym_id BIGINT
    )",
    // created_at is milliseconds since the Unix epoch
    "CREATE TABLE IF NOT EXISTS pseudonyms (
        id BIGINT PRIMARY KEY NOT NULL,
        user_id BIGINT NOT NULL,
        account_id BIGINT NOT NULL,
        unique_id TEXT NOT NULL,
        sis_user_id TEXT,
        workflow_state TEXT NOT NULL,
        crypted_password TEXT,
        password_salt TEXT,
        created_at BIGINT NOT NULL DEFAULT 0
    )",
];

/// SQL statements to create indexes.
pub const CREATE_INDEXES: &[&str] = &[
    // Scope resolution and keyset pagination
    "CREATE INDEX IF NOT EXISTS idx_enrollments_scope ON enrollments(workflow_state, enrollment_type, id)",
    "CREATE INDEX IF NOT EXISTS idx_enrollments_user ON enrollments(user_id)",
    // Pseudonym lookup by owner
    "CREATE INDEX IF NOT EXISTS idx_pseudonyms_user_account ON pseudonyms(user_id, account_id)",
    // SIS ids are unique per account; NULLs never conflict
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_pseudonyms_account_sis ON pseudonyms(account_id, sis_user_id)",
    "CREATE INDEX IF NOT EXISTS idx_pseudonyms_sis ON pseudonyms(sis_user_id)",
];

/// Initialize the database schema.
///
/// Creates tables and indexes if they don't exist, and handles migrations
/// if the schema version has changed.
pub async fn initialize(backend: &SqlxBackend) -> Result<()> {
    let pool = backend.pool();

    for statement in CREATE_TABLES {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| BackendError::SqlxError {
                reason: format!("Schema creation failed: {e} - SQL: {statement}"),
                source: Some(e),
            })?;
    }

    let row: Option<(i64,)> = sqlx::query_as("SELECT version FROM schema_version")
        .fetch_optional(pool)
        .await
        .map_err(|e| BackendError::SqlxError {
            reason: format!("Failed to check schema version: {e}"),
            source: Some(e),
        })?;

    if row.is_none() {
        sqlx::query("INSERT INTO schema_version (version) VALUES ($1)")
            .bind(SCHEMA_VERSION)
            .execute(pool)
            .await
            .map_err(|e| BackendError::SqlxError {
                reason: format!("Failed to initialize schema version: {e}"),
                source: Some(e),
            })?;
    } else if let Some((current_version,)) = row
        && current_version < SCHEMA_VERSION
    {
        migrate(backend, current_version, SCHEMA_VERSION).await?;
    }

    for statement in CREATE_INDEXES {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| BackendError::SqlxError {
                reason: format!("Index creation failed: {e} - SQL: {statement}"),
                source: Some(e),
            })?;
    }

    Ok(())
}

/// Run migrations sequentially from one schema version to another.
async fn migrate(backend: &SqlxBackend, from: i64, to: i64) -> Result<()> {
    tracing::info!(from, to, "Starting SQL schema migration");

    let mut current = from;
    while current < to {
        let next = current + 1;
        tracing::info!(from = current, to = next, "Running migration");

        run_migration(backend, current, next).await?;

        sqlx::query("UPDATE schema_version SET version = $1")
            .bind(next)
            .execute(backend.pool())
            .await
            .map_err(|e| BackendError::SqlxError {
                reason: format!("Failed to update schema version to {next}: {e}"),
                source: Some(e),
            })?;

        tracing::info!(version = next, "Migration completed");
        current = next;
    }

    tracing::info!(from, to, "All migrations completed successfully");
    Ok(())
}

/// Execute a single migration step.
///
/// There are no migrations yet; reaching this means `SCHEMA_VERSION` was
/// bumped without adding one.
async fn run_migration(backend: &SqlxBackend, from: i64, to: i64) -> Result<()> {
    let _ = backend;

    Err(BackendError::SqlxError {
        reason: format!(
            "Unknown migration path: v{from} to v{to}. \
             This likely means SCHEMA_VERSION was incremented without adding a migration."
        ),
        source: None,
    }
    .into())
}
