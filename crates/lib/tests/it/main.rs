/*! Integration tests for enrollsync.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * - backend: Tests for the Backend trait and its implementations
 * - reconcile: Tests for update passes over seeded data
 * - report: Tests for the analyze and verify figures
 * - rollback: Tests for clearing generated SIS user ids
 *
 * Set TEST_BACKEND=sqlite (or postgres with TEST_POSTGRES_URL) to run the
 * suite against a SQL backend instead of the in-memory one.
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("enrollsync=info")),
        )
        .with_test_writer()
        .try_init();
}

mod backend;
mod helpers;
mod report;
mod rollback;
