//! Record lookups and writes for SQL backends.
//!
//! Writes that validate run inside a transaction so the checks and the write
//! see the same rows. The unique index on `(account_id, sis_user_id)` backs
//! the SIS id check if another writer slips in between.

use sqlx::{AnyPool, Transaction};

use super::query::{ENROLLMENT_COLUMNS, EnrollmentRow, enrollment_from_row};
use super::{SqlxBackend, SqlxResultExt, is_unique_violation};
use crate::Result;
use crate::backend::errors::BackendError;
use crate::backend::validation;
use crate::model::{
    Account, AccountId, Course, CourseId, Dataset, EnrollmentId, NewPseudonym, Pseudonym,
    PseudonymId, PseudonymState, User, UserId,
};

/// Row layout of `PSEUDONYM_COLUMNS`.
pub(super) type PseudonymRow = (
    i64,
    i64,
    i64,
    String,
    Option<String>,
    String,
    Option<String>,
    Option<String>,
    i64,
);

pub(super) const PSEUDONYM_COLUMNS: &str = "p.id, p.user_id, p.account_id, p.unique_id, \
     p.sis_user_id, p.workflow_state, p.crypted_password, p.password_salt, p.created_at";

pub(super) fn pseudonym_from_row(row: PseudonymRow) -> Result<Pseudonym> {
    let (
        id,
        user_id,
        account_id,
        unique_id,
        sis_user_id,
        workflow_state,
        crypted_password,
        password_salt,
        created_at,
    ) = row;
    let workflow_state: PseudonymState =
        workflow_state
            .parse()
            .map_err(|e| BackendError::InvalidRow {
                reason: format!("pseudonym {id}: {e}"),
            })?;
    Ok(Pseudonym {
        id: id.into(),
        user_id: user_id.into(),
        account_id: account_id.into(),
        unique_id,
        sis_user_id,
        workflow_state,
        crypted_password,
        password_salt,
        created_at,
    })
}

fn not_found(record: &'static str, id: i64) -> crate::Error {
    BackendError::RecordNotFound { record, id }.into()
}

pub(crate) async fn get_user(backend: &SqlxBackend, id: UserId) -> Result<User> {
    let row: Option<(i64, String, Option<String>)> =
        sqlx::query_as("SELECT id, name, email FROM users WHERE id = $1")
            .bind(id.get())
            .fetch_optional(backend.pool())
            .await
            .sql_context("Failed to get user")?;

    let (id, name, email) = row.ok_or_else(|| not_found("user", id.get()))?;
    Ok(User {
        id: id.into(),
        name,
        email,
    })
}

pub(crate) async fn get_pseudonym(backend: &SqlxBackend, id: PseudonymId) -> Result<Pseudonym> {
    let sql = format!("SELECT {PSEUDONYM_COLUMNS} FROM pseudonyms p WHERE p.id = $1");
    let row: Option<PseudonymRow> = sqlx::query_as(&sql)
        .bind(id.get())
        .fetch_optional(backend.pool())
        .await
        .sql_context("Failed to get pseudonym")?;

    pseudonym_from_row(row.ok_or_else(|| not_found("pseudonym", id.get()))?)
}

pub(crate) async fn root_account_for_course(
    backend: &SqlxBackend,
    id: CourseId,
) -> Result<AccountId> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT root_account_id FROM courses WHERE id = $1")
        .bind(id.get())
        .fetch_optional(backend.pool())
        .await
        .sql_context("Failed to get course")?;

    row.map(|(account,)| account.into())
        .ok_or_else(|| not_found("course", id.get()))
}

pub(crate) async fn active_pseudonyms(
    backend: &SqlxBackend,
    user: UserId,
    account: AccountId,
) -> Result<Vec<Pseudonym>> {
    let sql = format!(
        "SELECT {PSEUDONYM_COLUMNS} FROM pseudonyms p \
         WHERE p.user_id = $1 AND p.account_id = $2 AND p.workflow_state = $3 ORDER BY p.id"
    );
    let rows: Vec<PseudonymRow> = sqlx::query_as(&sql)
        .bind(user.get())
        .bind(account.get())
        .bind(PseudonymState::Active.as_str())
        .fetch_all(backend.pool())
        .await
        .sql_context("Failed to get active pseudonyms")?;

    rows.into_iter().map(pseudonym_from_row).collect()
}

/// Works on a pool or inside a transaction.
pub(crate) async fn sis_user_id_taken<'e, E>(
    executor: E,
    account: AccountId,
    sis_user_id: &str,
    excluding: Option<PseudonymId>,
) -> Result<bool>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM pseudonyms WHERE account_id = $1 AND sis_user_id = $2 AND id <> $3",
    )
    .bind(account.get())
    .bind(sis_user_id.to_string())
    .bind(excluding.map(|id| id.get()).unwrap_or(i64::MIN))
    .fetch_one(executor)
    .await
    .sql_context("Failed to check SIS user id")?;
    Ok(count > 0)
}

/// Compared in Rust: SQLite's `LOWER` only folds ASCII.
async fn unique_id_taken(
    tx: &mut Transaction<'static, sqlx::Any>,
    account: AccountId,
    unique_id: &str,
) -> Result<bool> {
    let logins: Vec<(String,)> = sqlx::query_as(
        "SELECT unique_id FROM pseudonyms WHERE account_id = $1 AND workflow_state = $2",
    )
    .bind(account.get())
    .bind(PseudonymState::Active.as_str())
    .fetch_all(&mut **tx)
    .await
    .sql_context("Failed to check unique id")?;
    Ok(logins
        .iter()
        .any(|(existing,)| validation::same_unique_id(existing, unique_id)))
}

/// Map a unique-index violation to the validation failure it represents.
fn write_error(err: sqlx::Error, record: &'static str, context: &str) -> crate::Error {
    if is_unique_violation(&err) {
        BackendError::invalid(record, format!("{context}: unique constraint violated")).into()
    } else {
        BackendError::SqlxError {
            reason: format!("{context}: {err}"),
            source: Some(err),
        }
        .into()
    }
}

pub(crate) async fn create_pseudonym(
    backend: &SqlxBackend,
    new: NewPseudonym,
) -> Result<Pseudonym> {
    let mut tx = backend
        .pool()
        .begin()
        .await
        .sql_context("Failed to begin transaction")?;

    let unique_id_taken = unique_id_taken(&mut tx, new.account_id, &new.unique_id).await?;
    let sis_user_id_taken = match new.sis_user_id.as_deref() {
        Some(sis) => sis_user_id_taken(&mut *tx, new.account_id, sis, None).await?,
        None => false,
    };
    validation::check_new_pseudonym(&new, unique_id_taken, sis_user_id_taken)?;

    let (id,): (i64,) = sqlx::query_as("SELECT COALESCE(MAX(id), 0) + 1 FROM pseudonyms")
        .fetch_one(&mut *tx)
        .await
        .sql_context("Failed to allocate pseudonym id")?;

    let pseudonym = Pseudonym {
        id: id.into(),
        user_id: new.user_id,
        account_id: new.account_id,
        unique_id: new.unique_id.trim().to_string(),
        sis_user_id: new.sis_user_id,
        workflow_state: PseudonymState::Active,
        crypted_password: Some(new.crypted_password),
        password_salt: Some(new.password_salt),
        created_at: new.created_at,
    };
    insert_pseudonym(&mut tx, &pseudonym)
        .await
        .map_err(|e| write_error(e, "pseudonym", "Failed to insert pseudonym"))?;

    tx.commit()
        .await
        .sql_context("Failed to commit transaction")?;
    Ok(pseudonym)
}

async fn insert_pseudonym(
    tx: &mut Transaction<'static, sqlx::Any>,
    pseudonym: &Pseudonym,
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO pseudonyms (id, user_id, account_id, unique_id, sis_user_id, \
         workflow_state, crypted_password, password_salt, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(pseudonym.id.get())
    .bind(pseudonym.user_id.get())
    .bind(pseudonym.account_id.get())
    .bind(pseudonym.unique_id.clone())
    .bind(pseudonym.sis_user_id.clone())
    .bind(pseudonym.workflow_state.as_str())
    .bind(pseudonym.crypted_password.clone())
    .bind(pseudonym.password_salt.clone())
    .bind(pseudonym.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub(crate) async fn assign_sis_user_id(
    backend: &SqlxBackend,
    id: PseudonymId,
    sis_user_id: &str,
) -> Result<()> {
    let mut tx = backend
        .pool()
        .begin()
        .await
        .sql_context("Failed to begin transaction")?;

    let row: Option<(i64,)> = sqlx::query_as("SELECT account_id FROM pseudonyms WHERE id = $1")
        .bind(id.get())
        .fetch_optional(&mut *tx)
        .await
        .sql_context("Failed to get pseudonym")?;
    let (account,) = row.ok_or_else(|| not_found("pseudonym", id.get()))?;

    let taken = sis_user_id_taken(&mut *tx, account.into(), sis_user_id, Some(id)).await?;
    validation::check_sis_user_id(sis_user_id, taken)?;

    sqlx::query("UPDATE pseudonyms SET sis_user_id = $1 WHERE id = $2")
        .bind(sis_user_id.to_string())
        .bind(id.get())
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error(e, "pseudonym", "Failed to set SIS user id"))?;

    tx.commit()
        .await
        .sql_context("Failed to commit transaction")?;
    Ok(())
}

pub(crate) async fn clear_sis_user_id(backend: &SqlxBackend, id: PseudonymId) -> Result<()> {
    let result = sqlx::query("UPDATE pseudonyms SET sis_user_id = NULL WHERE id = $1")
        .bind(id.get())
        .execute(backend.pool())
        .await
        .sql_context("Failed to clear SIS user id")?;

    if result.rows_affected() == 0 {
        return Err(not_found("pseudonym", id.get()));
    }
    Ok(())
}

pub(crate) async fn link_enrollment(
    backend: &SqlxBackend,
    id: EnrollmentId,
    pseudonym: PseudonymId,
) -> Result<()> {
    let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM pseudonyms WHERE id = $1")
        .bind(pseudonym.get())
        .fetch_optional(backend.pool())
        .await
        .sql_context("Failed to get pseudonym")?;
    if exists.is_none() {
        return Err(not_found("pseudonym", pseudonym.get()));
    }

    let result = sqlx::query("UPDATE enrollments SET sis_pseudonym_id = $1 WHERE id = $2")
        .bind(pseudonym.get())
        .bind(id.get())
        .execute(backend.pool())
        .await
        .sql_context("Failed to link enrollment")?;

    if result.rows_affected() == 0 {
        return Err(not_found("enrollment", id.get()));
    }
    Ok(())
}

/// Inserts a dataset in one transaction. A duplicate id aborts the whole import.
pub(crate) async fn import(backend: &SqlxBackend, dataset: Dataset) -> Result<()> {
    let mut tx = backend
        .pool()
        .begin()
        .await
        .sql_context("Failed to begin transaction")?;

    let duplicate = |record: &'static str, id: i64| {
        move |e: sqlx::Error| -> crate::Error {
            if is_unique_violation(&e) {
                BackendError::DuplicateRecord { record, id }.into()
            } else {
                BackendError::SqlxError {
                    reason: format!("Failed to import {record} {id}: {e}"),
                    source: Some(e),
                }
                .into()
            }
        }
    };

    for account in &dataset.accounts {
        sqlx::query("INSERT INTO accounts (id, name) VALUES ($1, $2)")
            .bind(account.id.get())
            .bind(account.name.clone())
            .execute(&mut *tx)
            .await
            .map_err(duplicate("account", account.id.get()))?;
    }

    for course in &dataset.courses {
        sqlx::query("INSERT INTO courses (id, root_account_id) VALUES ($1, $2)")
            .bind(course.id.get())
            .bind(course.root_account_id.get())
            .execute(&mut *tx)
            .await
            .map_err(duplicate("course", course.id.get()))?;
    }

    for user in &dataset.users {
        sqlx::query("INSERT INTO users (id, name, email) VALUES ($1, $2, $3)")
            .bind(user.id.get())
            .bind(user.name.clone())
            .bind(user.email.clone())
            .execute(&mut *tx)
            .await
            .map_err(duplicate("user", user.id.get()))?;
    }

    for enrollment in &dataset.enrollments {
        sqlx::query(
            "INSERT INTO enrollments (id, user_id, course_id, enrollment_type, workflow_state, \
             sis_pseudonym_id) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(enrollment.id.get())
        .bind(enrollment.user_id.get())
        .bind(enrollment.course_id.get())
        .bind(enrollment.enrollment_type.as_str())
        .bind(enrollment.workflow_state.as_str())
        .bind(enrollment.sis_pseudonym_id.map(|id| id.get()))
        .execute(&mut *tx)
        .await
        .map_err(duplicate("enrollment", enrollment.id.get()))?;
    }

    for pseudonym in &dataset.pseudonyms {
        insert_pseudonym(&mut tx, pseudonym)
            .await
            .map_err(duplicate("pseudonym", pseudonym.id.get()))?;
    }

    tx.commit()
        .await
        .sql_context("Failed to commit transaction")?;
    Ok(())
}

pub(crate) async fn export(backend: &SqlxBackend) -> Result<Dataset> {
    let pool: &AnyPool = backend.pool();

    let accounts: Vec<(i64, String)> = sqlx::query_as("SELECT id, name FROM accounts ORDER BY id")
        .fetch_all(pool)
        .await
        .sql_context("Failed to export accounts")?;

    let courses: Vec<(i64, i64)> =
        sqlx::query_as("SELECT id, root_account_id FROM courses ORDER BY id")
            .fetch_all(pool)
            .await
            .sql_context("Failed to export courses")?;

    let users: Vec<(i64, String, Option<String>)> =
        sqlx::query_as("SELECT id, name, email FROM users ORDER BY id")
            .fetch_all(pool)
            .await
            .sql_context("Failed to export users")?;

    let enrollment_sql = format!("SELECT {ENROLLMENT_COLUMNS} FROM enrollments e ORDER BY e.id");
    let enrollments: Vec<EnrollmentRow> = sqlx::query_as(&enrollment_sql)
        .fetch_all(pool)
        .await
        .sql_context("Failed to export enrollments")?;

    let pseudonym_sql = format!("SELECT {PSEUDONYM_COLUMNS} FROM pseudonyms p ORDER BY p.id");
    let pseudonyms: Vec<PseudonymRow> = sqlx::query_as(&pseudonym_sql)
        .fetch_all(pool)
        .await
        .sql_context("Failed to export pseudonyms")?;

    Ok(Dataset {
        accounts: accounts
            .into_iter()
            .map(|(id, name)| Account {
                id: id.into(),
                name,
            })
            .collect(),
        courses: courses
            .into_iter()
            .map(|(id, root_account_id)| Course {
                id: id.into(),
                root_account_id: root_account_id.into(),
            })
            .collect(),
        users: users
            .into_iter()
            .map(|(id, name, email)| User {
                id: id.into(),
                name,
                email,
            })
            .collect(),
        enrollments: enrollments
            .into_iter()
            .map(enrollment_from_row)
            .collect::<Result<_>>()?,
        pseudonyms: pseudonyms
            .into_iter()
            .map(pseudonym_from_row)
            .collect::<Result<_>>()?,
    })
}
