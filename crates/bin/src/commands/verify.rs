//! Verify command - check what an update left behind.

use enrollsync::{
    Backend, Config,
    report::{VerifyVerdict, verify},
};

use crate::output::{print_samples, print_scope_report};

/// Run the verify command
pub async fn run(backend: &dyn Backend, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let verification = verify(backend, config).await?;

    println!("Verification for pattern {}", config.pattern);
    println!();
    print_scope_report(&verification.report);

    print_samples("Reconciled enrollments", &verification.reconciled, None);
    print_samples("Unlinked enrollments", &verification.unlinked, None);

    println!();
    match verification.verdict() {
        VerifyVerdict::Complete => println!("All enrollments in scope are reconciled."),
        VerifyVerdict::Incomplete {
            unlinked_enrollments,
            users_without_sis_user_id,
        } => println!(
            "Incomplete: {unlinked_enrollments} unlinked enrollment(s), \
             {users_without_sis_user_id} user(s) without a SIS user id."
        ),
    }
    Ok(())
}
