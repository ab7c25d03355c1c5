//! Pseudonym constraints shared by all backends.
//!
//! Backends gather the facts (is this login taken, is this SIS id taken) in
//! whatever way suits their storage and hand them here, so both report the
//! same messages for the same violations.

use crate::Result;
use crate::backend::errors::Violations;
use crate::model::NewPseudonym;

/// Maximum length of a login handle.
pub const MAX_UNIQUE_ID_LENGTH: usize = 100;

/// Maximum length of a SIS user id.
pub const MAX_SIS_USER_ID_LENGTH: usize = 255;

const RECORD: &str = "pseudonym";

/// Checks a pseudonym about to be created.
pub(crate) fn check_new_pseudonym(
    pseudonym: &NewPseudonym,
    unique_id_taken: bool,
    sis_user_id_taken: bool,
) -> Result<()> {
    let mut violations = Violations::new(RECORD);

    let unique_id = pseudonym.unique_id.trim();
    violations.check(!unique_id.is_empty(), || {
        "unique_id can't be blank".to_string()
    });
    violations.check(unique_id.chars().count() <= MAX_UNIQUE_ID_LENGTH, || {
        format!("unique_id is too long (maximum is {MAX_UNIQUE_ID_LENGTH} characters)")
    });
    violations.check(unique_id.is_empty() || !unique_id_taken, || {
        format!("unique_id \"{unique_id}\" has already been taken")
    });

    if let Some(sis_user_id) = &pseudonym.sis_user_id {
        sis_rules(&mut violations, sis_user_id, sis_user_id_taken);
    }

    violations.check(!pseudonym.crypted_password.is_empty(), || {
        "password can't be blank".to_string()
    });

    violations.into_result()
}

/// Checks a SIS user id about to be assigned to an existing pseudonym.
pub(crate) fn check_sis_user_id(sis_user_id: &str, taken: bool) -> Result<()> {
    let mut violations = Violations::new(RECORD);
    sis_rules(&mut violations, sis_user_id, taken);
    violations.into_result()
}

fn sis_rules(violations: &mut Violations, sis_user_id: &str, taken: bool) {
    violations.check(!sis_user_id.trim().is_empty(), || {
        "sis_user_id can't be blank".to_string()
    });
    violations.check(
        sis_user_id.chars().count() <= MAX_SIS_USER_ID_LENGTH,
        || format!("sis_user_id is too long (maximum is {MAX_SIS_USER_ID_LENGTH} characters)"),
    );
    violations.check(!taken, || {
        format!("SIS ID \"{sis_user_id}\" is already in use")
    });
}

/// Case-insensitive login comparison.
pub(crate) fn same_unique_id(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}
