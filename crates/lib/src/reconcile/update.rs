//! The update pass: reconcile every enrollment in scope.

use tracing::info;

use super::{Reconciler, Reconciliation, RunStats};
use crate::Result;
use crate::backend::Backend;
use crate::config::Config;
use crate::scope::ScopeResolver;

/// Totals of an update pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    /// Enrollments in scope when the pass started.
    pub total: u64,
    pub stats: RunStats,
}

/// Run an update pass with the system clock.
///
/// `observer` sees every result as it is produced, in enrollment id order.
pub async fn run_update(
    backend: &dyn Backend,
    config: &Config,
    observer: impl FnMut(&Reconciliation),
) -> Result<UpdateReport> {
    let reconciler = Reconciler::new(backend, config.pattern.clone());
    run_update_with(&reconciler, config, observer).await
}

/// Run an update pass with a prepared reconciler.
///
/// Only scope resolution can fail the pass. Per-enrollment problems end up
/// in the returned counters.
pub async fn run_update_with(
    reconciler: &Reconciler<'_>,
    config: &Config,
    mut observer: impl FnMut(&Reconciliation),
) -> Result<UpdateReport> {
    config.validate()?;

    let resolver = ScopeResolver::new(reconciler.backend(), config.scope(), config.batch_size);
    let total = resolver.count().await?;
    info!(
        total,
        pattern = %reconciler.pattern(),
        batch_size = config.batch_size,
        "Starting update pass"
    );

    let mut stats = RunStats::new();
    let mut batches = resolver.batches();
    let mut batch_number = 0u64;
    while let Some(batch) = batches.next_batch().await? {
        batch_number += 1;
        tracing::debug!(batch = batch_number, size = batch.len(), "Processing batch");
        for enrollment in &batch {
            let result = reconciler.reconcile(enrollment).await;
            stats.record(&result);
            observer(&result);
        }
    }

    info!(
        processed = stats.processed,
        created = stats.created,
        updated = stats.updated,
        linked = stats.linked,
        unchanged = stats.unchanged,
        skipped = stats.skipped,
        failed = stats.failed,
        "Update pass finished"
    );
    Ok(UpdateReport { total, stats })
}
