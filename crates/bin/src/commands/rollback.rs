//! Rollback command - clear SIS user ids carrying the pattern's prefix.

use enrollsync::{
    Backend, Config,
    rollback::{execute_rollback, plan_rollback},
};

use crate::output::{print_diagnostics, print_table};

/// What to tell the operator when the pattern leaves nothing to match on.
pub(crate) fn refusal_message(config: &Config) -> Option<String> {
    if !config.pattern.prefix().is_empty() {
        return None;
    }
    Some(format!(
        "Rollback refused: pattern '{}' has no literal prefix, so it would match every SIS user id.\n\
         Set ENROLLSYNC_ID_PATTERN (or --id-pattern) to the pattern used for the update, e.g. 'Canvas-%05d'.",
        config.pattern
    ))
}

/// Run the rollback command
pub async fn run(backend: &dyn Backend, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(message) = refusal_message(config) {
        println!("{message}");
    }
    let plan = plan_rollback(backend, &config.pattern).await?;

    println!(
        "Active logins with a SIS user id starting with '{}': {}",
        plan.prefix, plan.matched
    );
    if plan.is_empty() {
        println!("Nothing to roll back.");
        return Ok(());
    }

    println!();
    let rows: Vec<Vec<String>> = plan
        .sample
        .iter()
        .map(|p| {
            vec![
                p.id.to_string(),
                p.user_id.to_string(),
                p.unique_id.clone(),
                p.sis_user_id.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["PSEUDONYM", "USER", "LOGIN", "SIS USER ID"], &rows);

    let delay = config.rollback_delay;
    if !delay.is_zero() {
        println!();
        println!(
            "Clearing {} SIS user id(s) in {} second(s). Press Ctrl+C to cancel.",
            plan.matched,
            delay.as_secs()
        );
        tokio::time::sleep(delay).await;
    }

    let report = execute_rollback(backend, &plan, config.batch_size).await?;

    println!();
    println!("Rollback summary:");
    println!("  {:<10}{:>8}", "Cleared", report.cleared);
    println!("  {:<10}{:>8}", "Failed", report.failed);
    print_diagnostics("Problems", report.failures(), report.failed);
    Ok(())
}
