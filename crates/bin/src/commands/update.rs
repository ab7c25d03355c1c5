//! Update command - reconcile every enrollment in scope.

use enrollsync::{Backend, Config, reconcile::run_update};

use crate::output::{Progress, print_update_summary};

/// Run the update command
pub async fn run(backend: &dyn Backend, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Pattern:          {}", config.pattern);
    println!("Enrollment types: {}", type_list(config));
    println!();

    let mut progress = Progress::stdout();
    let report = run_update(backend, config, |result| progress.record(result)).await?;
    progress.finish();

    print_update_summary(report.total, &report.stats);
    Ok(())
}

pub(crate) fn type_list(config: &Config) -> String {
    config
        .enrollment_types
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
