//! Records read and written by the reconciler.
//!
//! These mirror the rows of the learning-management store: accounts own
//! courses, users enroll in courses, and users log in to an account through
//! pseudonyms. Only the fields the reconciler reads are modelled.

mod errors;
mod ids;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use errors::ModelError;
pub use ids::{AccountId, CourseId, EnrollmentId, PseudonymId, UserId};

/// Role category of an enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EnrollmentType {
    StudentEnrollment,
    TeacherEnrollment,
    TaEnrollment,
    DesignerEnrollment,
    ObserverEnrollment,
    StudentViewEnrollment,
}

impl EnrollmentType {
    /// All known enrollment types.
    pub const ALL: [EnrollmentType; 6] = [
        EnrollmentType::StudentEnrollment,
        EnrollmentType::TeacherEnrollment,
        EnrollmentType::TaEnrollment,
        EnrollmentType::DesignerEnrollment,
        EnrollmentType::ObserverEnrollment,
        EnrollmentType::StudentViewEnrollment,
    ];

    /// The stored type name, e.g. `StudentEnrollment`.
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentType::StudentEnrollment => "StudentEnrollment",
            EnrollmentType::TeacherEnrollment => "TeacherEnrollment",
            EnrollmentType::TaEnrollment => "TaEnrollment",
            EnrollmentType::DesignerEnrollment => "DesignerEnrollment",
            EnrollmentType::ObserverEnrollment => "ObserverEnrollment",
            EnrollmentType::StudentViewEnrollment => "StudentViewEnrollment",
        }
    }

    /// The short role name, e.g. `student`.
    pub fn role(&self) -> &'static str {
        match self {
            EnrollmentType::StudentEnrollment => "student",
            EnrollmentType::TeacherEnrollment => "teacher",
            EnrollmentType::TaEnrollment => "ta",
            EnrollmentType::DesignerEnrollment => "designer",
            EnrollmentType::ObserverEnrollment => "observer",
            EnrollmentType::StudentViewEnrollment => "student_view",
        }
    }

    /// Parses a comma separated list of type names, ignoring blanks.
    ///
    /// Duplicates are collapsed, first occurrence wins the ordering.
    pub fn parse_list(list: &str) -> Result<Vec<EnrollmentType>, ModelError> {
        let mut types = Vec::new();
        for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let ty: EnrollmentType = name.parse()?;
            if !types.contains(&ty) {
                types.push(ty);
            }
        }
        if types.is_empty() {
            return Err(ModelError::EmptyEnrollmentTypes);
        }
        Ok(types)
    }
}

impl FromStr for EnrollmentType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str().eq_ignore_ascii_case(s) || ty.role().eq_ignore_ascii_case(s))
            .ok_or_else(|| ModelError::UnknownEnrollmentType {
                name: s.to_string(),
            })
    }
}

impl std::fmt::Display for EnrollmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow state of an enrollment. Only `Active` enrollments are in scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentState {
    #[default]
    Active,
    Invited,
    Inactive,
    Completed,
    Deleted,
}

impl EnrollmentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentState::Active => "active",
            EnrollmentState::Invited => "invited",
            EnrollmentState::Inactive => "inactive",
            EnrollmentState::Completed => "completed",
            EnrollmentState::Deleted => "deleted",
        }
    }
}

impl FromStr for EnrollmentState {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(EnrollmentState::Active),
            "invited" => Ok(EnrollmentState::Invited),
            "inactive" => Ok(EnrollmentState::Inactive),
            "completed" => Ok(EnrollmentState::Completed),
            "deleted" => Ok(EnrollmentState::Deleted),
            other => Err(ModelError::UnknownState {
                kind: "enrollment",
                state: other.to_string(),
            }),
        }
    }
}

/// Workflow state of a pseudonym. Only `Active` pseudonyms can log in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PseudonymState {
    #[default]
    Active,
    Suspended,
    Deleted,
}

impl PseudonymState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PseudonymState::Active => "active",
            PseudonymState::Suspended => "suspended",
            PseudonymState::Deleted => "deleted",
        }
    }
}

impl FromStr for PseudonymState {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(PseudonymState::Active),
            "suspended" => Ok(PseudonymState::Suspended),
            "deleted" => Ok(PseudonymState::Deleted),
            other => Err(ModelError::UnknownState {
                kind: "pseudonym",
                state: other.to_string(),
            }),
        }
    }
}

/// A root account. Pseudonyms are scoped to one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
}

/// A course and the root account it belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub root_account_id: AccountId,
}

/// A person who may hold pseudonyms in any number of accounts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// A user's membership in a course.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    #[serde(rename = "type")]
    pub enrollment_type: EnrollmentType,
    #[serde(default)]
    pub workflow_state: EnrollmentState,
    /// The pseudonym this enrollment authenticates through, once linked.
    #[serde(default)]
    pub sis_pseudonym_id: Option<PseudonymId>,
}

impl Enrollment {
    pub fn is_active(&self) -> bool {
        self.workflow_state == EnrollmentState::Active
    }
}

/// A login credential of a user within one root account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pseudonym {
    pub id: PseudonymId,
    pub user_id: UserId,
    pub account_id: AccountId,
    /// Login handle, unique per account (case-insensitive) among active pseudonyms.
    pub unique_id: String,
    /// External identifier, unique per account when present.
    #[serde(default)]
    pub sis_user_id: Option<String>,
    #[serde(default)]
    pub workflow_state: PseudonymState,
    #[serde(default)]
    pub crypted_password: Option<String>,
    #[serde(default)]
    pub password_salt: Option<String>,
    /// Creation time, milliseconds since the Unix epoch.
    #[serde(default)]
    pub created_at: i64,
}

impl Pseudonym {
    pub fn is_active(&self) -> bool {
        self.workflow_state == PseudonymState::Active
    }
}

/// Field values for a pseudonym about to be created. The backend assigns the id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPseudonym {
    pub user_id: UserId,
    pub account_id: AccountId,
    pub unique_id: String,
    pub sis_user_id: Option<String>,
    pub crypted_password: String,
    pub password_salt: String,
    pub created_at: i64,
}

/// A snapshot of every record kind, used to seed a backend and as the
/// on-disk format of the in-memory backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
    #[serde(default)]
    pub pseudonyms: Vec<Pseudonym>,
}
