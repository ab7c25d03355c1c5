//! Analyze command - show what an update would do.

use enrollsync::{
    Backend, Config,
    report::{SampleRow, analyze},
};

use super::update::type_list;
use crate::output::{print_samples, print_scope_report};

/// Run the analyze command
pub async fn run(backend: &dyn Backend, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let analysis = analyze(backend, config).await?;
    let report = &analysis.report;

    println!("Analysis for pattern {}", config.pattern);
    println!("Enrollment types: {}", type_list(config));
    println!();
    print_scope_report(report);

    println!();
    println!("An update would:");
    println!(
        "  create a login for {} user(s)",
        report.users_missing_pseudonym
    );
    println!(
        "  assign a SIS user id to {} existing login(s)",
        report.users_missing_sis_user_id
    );
    println!(
        "  link up to {} enrollment(s)",
        report.unlinked_enrollments()
    );

    let pattern = &config.pattern;
    let generated: &dyn Fn(&SampleRow) -> String = &|row| pattern.format(row.user_id);
    print_samples(
        "Users without a login",
        &analysis.missing_pseudonym,
        Some(("WOULD GET", generated)),
    );
    print_samples(
        "Logins without a SIS user id",
        &analysis.missing_sis_user_id,
        Some(("WOULD GET", generated)),
    );
    Ok(())
}
