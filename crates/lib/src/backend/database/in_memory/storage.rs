//! Write operations for the in-memory backend.

use super::{Tables, query};
use crate::Result;
use crate::backend::errors::BackendError;
use crate::backend::validation::{self, same_unique_id};
use crate::model::{Dataset, EnrollmentId, NewPseudonym, Pseudonym, PseudonymId, PseudonymState};

pub(crate) fn create_pseudonym(tables: &mut Tables, new: NewPseudonym) -> Result<Pseudonym> {
    let unique_id_taken = tables.pseudonyms.values().any(|p| {
        p.account_id == new.account_id && p.is_active() && same_unique_id(&p.unique_id, &new.unique_id)
    });
    let sis_user_id_taken = new.sis_user_id.as_deref().is_some_and(|sis| {
        query::sis_user_id_taken(tables, new.account_id, sis, None)
    });
    validation::check_new_pseudonym(&new, unique_id_taken, sis_user_id_taken)?;

    let id = tables
        .pseudonyms
        .last_key_value()
        .map(|(id, _)| PseudonymId::new(id.get() + 1))
        .unwrap_or(PseudonymId::new(1));

    let pseudonym = Pseudonym {
        id,
        user_id: new.user_id,
        account_id: new.account_id,
        unique_id: new.unique_id.trim().to_string(),
        sis_user_id: new.sis_user_id,
        workflow_state: PseudonymState::Active,
        crypted_password: Some(new.crypted_password),
        password_salt: Some(new.password_salt),
        created_at: new.created_at,
    };
    tables.pseudonyms.insert(id, pseudonym.clone());
    Ok(pseudonym)
}

pub(crate) fn assign_sis_user_id(
    tables: &mut Tables,
    id: PseudonymId,
    sis_user_id: &str,
) -> Result<()> {
    let account = pseudonym(tables, id)?.account_id;
    let taken = query::sis_user_id_taken(tables, account, sis_user_id, Some(id));
    validation::check_sis_user_id(sis_user_id, taken)?;

    pseudonym_mut(tables, id)?.sis_user_id = Some(sis_user_id.to_string());
    Ok(())
}

pub(crate) fn clear_sis_user_id(tables: &mut Tables, id: PseudonymId) -> Result<()> {
    pseudonym_mut(tables, id)?.sis_user_id = None;
    Ok(())
}

pub(crate) fn link_enrollment(
    tables: &mut Tables,
    id: EnrollmentId,
    pseudonym_id: PseudonymId,
) -> Result<()> {
    pseudonym(tables, pseudonym_id)?;
    let enrollment =
        tables
            .enrollments
            .get_mut(&id)
            .ok_or_else(|| BackendError::RecordNotFound {
                record: "enrollment",
                id: id.get(),
            })?;
    enrollment.sis_pseudonym_id = Some(pseudonym_id);
    Ok(())
}

/// Inserts every record of a dataset, refusing ids that already exist.
///
/// Nothing is inserted if any id collides.
pub(crate) fn import(tables: &mut Tables, dataset: Dataset) -> Result<()> {
    fn check<K: Ord, V>(
        existing: &std::collections::BTreeMap<K, V>,
        incoming: impl IntoIterator<Item = K>,
        record: &'static str,
        raw: impl Fn(&K) -> i64,
    ) -> Result<()> {
        let mut seen = std::collections::BTreeSet::new();
        for key in incoming {
            if existing.contains_key(&key) || !seen.insert(raw(&key)) {
                return Err(BackendError::DuplicateRecord {
                    record,
                    id: raw(&key),
                }
                .into());
            }
        }
        Ok(())
    }

    check(&tables.accounts, dataset.accounts.iter().map(|r| r.id), "account", |k| k.get())?;
    check(&tables.courses, dataset.courses.iter().map(|r| r.id), "course", |k| k.get())?;
    check(&tables.users, dataset.users.iter().map(|r| r.id), "user", |k| k.get())?;
    check(
        &tables.enrollments,
        dataset.enrollments.iter().map(|r| r.id),
        "enrollment",
        |k| k.get(),
    )?;
    check(
        &tables.pseudonyms,
        dataset.pseudonyms.iter().map(|r| r.id),
        "pseudonym",
        |k| k.get(),
    )?;

    tables
        .accounts
        .extend(dataset.accounts.into_iter().map(|r| (r.id, r)));
    tables
        .courses
        .extend(dataset.courses.into_iter().map(|r| (r.id, r)));
    tables
        .users
        .extend(dataset.users.into_iter().map(|r| (r.id, r)));
    tables
        .enrollments
        .extend(dataset.enrollments.into_iter().map(|r| (r.id, r)));
    tables
        .pseudonyms
        .extend(dataset.pseudonyms.into_iter().map(|r| (r.id, r)));
    Ok(())
}

pub(crate) fn export(tables: &Tables) -> Dataset {
    Dataset {
        accounts: tables.accounts.values().cloned().collect(),
        courses: tables.courses.values().cloned().collect(),
        users: tables.users.values().cloned().collect(),
        enrollments: tables.enrollments.values().cloned().collect(),
        pseudonyms: tables.pseudonyms.values().cloned().collect(),
    }
}

fn pseudonym(tables: &Tables, id: PseudonymId) -> Result<&Pseudonym> {
    tables.pseudonyms.get(&id).ok_or_else(|| {
        BackendError::RecordNotFound {
            record: "pseudonym",
            id: id.get(),
        }
        .into()
    })
}

fn pseudonym_mut(tables: &mut Tables, id: PseudonymId) -> Result<&mut Pseudonym> {
    tables.pseudonyms.get_mut(&id).ok_or_else(|| {
        BackendError::RecordNotFound {
            record: "pseudonym",
            id: id.get(),
        }
        .into()
    })
}
