//! Scope and prefix queries for SQL backends.
//!
//! Scopes and filters are compiled into a `WHERE` clause with numbered
//! placeholders. Values are always bound, never spliced into the SQL.

use sqlx::Database;
use sqlx::query::QueryAs;

use super::storage::{PseudonymRow, pseudonym_from_row};
use super::{SqlxBackend, SqlxResultExt};
use crate::Result;
use crate::backend::errors::BackendError;
use crate::backend::{EnrollmentFilter, EnrollmentScope};
use crate::model::{Enrollment, EnrollmentId, PseudonymId};

type AnyArgs<'q> = <sqlx::Any as Database>::Arguments<'q>;

/// A value bound to a numbered placeholder.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum SqlValue {
    Int(i64),
    Text(String),
}

/// Bind values in placeholder order.
pub(super) fn bind_values<'q, O>(
    mut query: QueryAs<'q, sqlx::Any, O, AnyArgs<'q>>,
    values: &[SqlValue],
) -> QueryAs<'q, sqlx::Any, O, AnyArgs<'q>> {
    for value in values {
        query = match value {
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.clone()),
        };
    }
    query
}

/// Row layout of `ENROLLMENT_COLUMNS`.
pub(super) type EnrollmentRow = (i64, i64, i64, String, String, Option<i64>);

pub(super) const ENROLLMENT_COLUMNS: &str =
    "e.id, e.user_id, e.course_id, e.enrollment_type, e.workflow_state, e.sis_pseudonym_id";

pub(super) fn enrollment_from_row(row: EnrollmentRow) -> Result<Enrollment> {
    let (id, user_id, course_id, enrollment_type, workflow_state, sis_pseudonym_id) = row;
    let invalid = |e: crate::model::ModelError| BackendError::InvalidRow {
        reason: format!("enrollment {id}: {e}"),
    };
    Ok(Enrollment {
        id: id.into(),
        user_id: user_id.into(),
        course_id: course_id.into(),
        enrollment_type: enrollment_type.parse().map_err(invalid)?,
        workflow_state: workflow_state.parse().map_err(invalid)?,
        sis_pseudonym_id: sis_pseudonym_id.map(Into::into),
    })
}

/// A `FROM ... WHERE ...` clause selecting in-scope enrollments as `e`.
#[derive(Debug, Default)]
pub(super) struct ScopeQuery {
    conditions: Vec<String>,
    values: Vec<SqlValue>,
}

impl ScopeQuery {
    pub(super) fn new(scope: &EnrollmentScope, filters: &[EnrollmentFilter]) -> Self {
        let mut query = Self::default();

        let state = query.push(SqlValue::Text(scope.state.as_str().to_string()));
        query.conditions.push(format!("e.workflow_state = {state}"));

        if scope.types.is_empty() {
            query.conditions.push("1 = 0".to_string());
        } else {
            let placeholders: Vec<String> = scope
                .types
                .iter()
                .map(|ty| query.push(SqlValue::Text(ty.as_str().to_string())))
                .collect();
            query.conditions.push(format!(
                "e.enrollment_type IN ({})",
                placeholders.join(", ")
            ));
        }

        for filter in filters {
            let condition = query.filter_condition(*filter);
            query.conditions.push(condition);
        }
        query
    }

    /// Adds a value and returns its placeholder.
    pub(super) fn push(&mut self, value: SqlValue) -> String {
        self.values.push(value);
        format!("${}", self.values.len())
    }

    pub(super) fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub(super) fn from_where(&self) -> String {
        format!(
            "FROM enrollments e LEFT JOIN courses c ON c.id = e.course_id WHERE {}",
            self.conditions.join(" AND ")
        )
    }

    /// Appends an extra condition, e.g. the keyset cursor.
    pub(super) fn and(&mut self, condition: String) {
        self.conditions.push(condition);
    }

    fn filter_condition(&mut self, filter: EnrollmentFilter) -> String {
        match filter {
            EnrollmentFilter::HasActivePseudonym => format!("EXISTS ({})", self.pseudonym_exists()),
            EnrollmentFilter::MissingActivePseudonym => {
                format!("NOT EXISTS ({})", self.pseudonym_exists())
            }
            EnrollmentFilter::HasSisUserId => {
                format!("EXISTS ({})", self.first_pseudonym_with_sis_user_id())
            }
            EnrollmentFilter::MissingSisUserId => {
                format!("NOT EXISTS ({})", self.first_pseudonym_with_sis_user_id())
            }
            EnrollmentFilter::Linked => "e.sis_pseudonym_id IS NOT NULL".to_string(),
            EnrollmentFilter::Unlinked => "e.sis_pseudonym_id IS NULL".to_string(),
        }
    }

    /// Active pseudonyms of the enrolled user in the course's root account.
    fn pseudonym_exists(&mut self) -> String {
        let active = self.push(SqlValue::Text("active".to_string()));
        format!(
            "SELECT 1 FROM pseudonyms p WHERE p.user_id = e.user_id \
             AND p.account_id = c.root_account_id AND p.workflow_state = {active}"
        )
    }

    /// The lowest-id active pseudonym, when it carries a SIS user id.
    fn first_pseudonym_with_sis_user_id(&mut self) -> String {
        let active = self.push(SqlValue::Text("active".to_string()));
        format!(
            "SELECT 1 FROM pseudonyms p WHERE p.sis_user_id IS NOT NULL AND p.id = \
             (SELECT MIN(p2.id) FROM pseudonyms p2 WHERE p2.user_id = e.user_id \
             AND p2.account_id = c.root_account_id AND p2.workflow_state = {active})"
        )
    }
}

pub(crate) async fn count_enrollments(
    backend: &SqlxBackend,
    scope: &EnrollmentScope,
    filters: &[EnrollmentFilter],
) -> Result<u64> {
    let query = ScopeQuery::new(scope, filters);
    let sql = format!("SELECT COUNT(*) {}", query.from_where());
    let (count,): (i64,) = bind_values(sqlx::query_as(&sql), query.values())
        .fetch_one(backend.pool())
        .await
        .sql_context("Failed to count enrollments")?;
    Ok(count.max(0) as u64)
}

pub(crate) async fn count_distinct_users(
    backend: &SqlxBackend,
    scope: &EnrollmentScope,
    filters: &[EnrollmentFilter],
) -> Result<u64> {
    let query = ScopeQuery::new(scope, filters);
    let sql = format!("SELECT COUNT(DISTINCT e.user_id) {}", query.from_where());
    let (count,): (i64,) = bind_values(sqlx::query_as(&sql), query.values())
        .fetch_one(backend.pool())
        .await
        .sql_context("Failed to count distinct users")?;
    Ok(count.max(0) as u64)
}

pub(crate) async fn enrollments_after(
    backend: &SqlxBackend,
    scope: &EnrollmentScope,
    filters: &[EnrollmentFilter],
    after: Option<EnrollmentId>,
    limit: usize,
) -> Result<Vec<Enrollment>> {
    let mut query = ScopeQuery::new(scope, filters);
    if let Some(after) = after {
        let cursor = query.push(SqlValue::Int(after.get()));
        query.and(format!("e.id > {cursor}"));
    }
    let limit = query.push(SqlValue::Int(limit as i64));
    let sql = format!(
        "SELECT {ENROLLMENT_COLUMNS} {} ORDER BY e.id LIMIT {limit}",
        query.from_where()
    );

    let rows: Vec<EnrollmentRow> = bind_values(sqlx::query_as(&sql), query.values())
        .fetch_all(backend.pool())
        .await
        .sql_context("Failed to fetch enrollments")?;
    rows.into_iter().map(enrollment_from_row).collect()
}

/// Literal prefix comparison. `LIKE` would treat `%` and `_` in the prefix as wildcards.
const PREFIX_CONDITION: &str = "p.workflow_state = $1 AND p.sis_user_id IS NOT NULL \
     AND substr(p.sis_user_id, 1, CAST($2 AS INTEGER)) = $3";

fn prefix_values(prefix: &str) -> Vec<SqlValue> {
    vec![
        SqlValue::Text("active".to_string()),
        SqlValue::Int(prefix.chars().count() as i64),
        SqlValue::Text(prefix.to_string()),
    ]
}

pub(crate) async fn count_pseudonyms_with_sis_prefix(
    backend: &SqlxBackend,
    prefix: &str,
) -> Result<u64> {
    let sql = format!("SELECT COUNT(*) FROM pseudonyms p WHERE {PREFIX_CONDITION}");
    let (count,): (i64,) = bind_values(sqlx::query_as(&sql), &prefix_values(prefix))
        .fetch_one(backend.pool())
        .await
        .sql_context("Failed to count pseudonyms by SIS prefix")?;
    Ok(count.max(0) as u64)
}

pub(crate) async fn pseudonyms_with_sis_prefix_after(
    backend: &SqlxBackend,
    prefix: &str,
    after: Option<PseudonymId>,
    limit: usize,
) -> Result<Vec<crate::model::Pseudonym>> {
    let mut values = prefix_values(prefix);
    values.push(SqlValue::Int(after.map(|id| id.get()).unwrap_or(i64::MIN)));
    values.push(SqlValue::Int(limit as i64));
    let sql = format!(
        "SELECT {} FROM pseudonyms p WHERE {PREFIX_CONDITION} AND p.id > $4 ORDER BY p.id LIMIT $5",
        super::storage::PSEUDONYM_COLUMNS
    );

    let rows: Vec<PseudonymRow> = bind_values(sqlx::query_as(&sql), &values)
        .fetch_all(backend.pool())
        .await
        .sql_context("Failed to fetch pseudonyms by SIS prefix")?;
    rows.into_iter().map(pseudonym_from_row).collect()
}
