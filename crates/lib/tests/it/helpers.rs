use enrollsync::{
    Backend,
    backend::database::InMemory,
    model::{
        Account, AccountId, Course, CourseId, Dataset, Enrollment, EnrollmentId, EnrollmentState,
        EnrollmentType, Pseudonym, PseudonymId, PseudonymState, User, UserId,
    },
};

// ==========================
// BACKEND FACTORIES
// ==========================

/// Creates an empty test backend based on the TEST_BACKEND env var.
///
/// Supported values:
/// - "inmemory" or unset: InMemory backend (default)
/// - "sqlite": SQLite in-memory backend (requires `sqlite` feature)
/// - "postgres": PostgreSQL backend in a private schema (requires `postgres`
///   feature and TEST_POSTGRES_URL)
pub async fn test_backend() -> Box<dyn Backend> {
    match std::env::var("TEST_BACKEND").as_deref() {
        Ok("sqlite") => {
            #[cfg(feature = "sqlite")]
            {
                use enrollsync::backend::database::Sqlite;
                Box::new(
                    Sqlite::sqlite_in_memory()
                        .await
                        .expect("Failed to create SQLite backend"),
                )
            }
            #[cfg(not(feature = "sqlite"))]
            {
                panic!("TEST_BACKEND=sqlite requires the 'sqlite' feature to be enabled")
            }
        }
        Ok("postgres") => {
            #[cfg(feature = "postgres")]
            {
                use enrollsync::backend::database::Postgres;
                let url = std::env::var("TEST_POSTGRES_URL")
                    .unwrap_or_else(|_| "postgres://localhost/enrollsync_test".to_string());
                Box::new(
                    Postgres::connect_postgres_isolated(&url)
                        .await
                        .expect("Failed to connect to PostgreSQL"),
                )
            }
            #[cfg(not(feature = "postgres"))]
            {
                panic!("TEST_BACKEND=postgres requires the 'postgres' feature to be enabled")
            }
        }
        Ok("inmemory") | Ok("") | Err(_) => Box::new(InMemory::new()),
        Ok(other) => {
            panic!("Unknown TEST_BACKEND value: {other}. Supported: inmemory, sqlite, postgres")
        }
    }
}

/// Creates a test backend holding the given records.
pub async fn seeded_backend(dataset: Dataset) -> Box<dyn Backend> {
    let backend = test_backend().await;
    backend
        .import(dataset)
        .await
        .expect("Failed to import test dataset");
    backend
}

// ==========================
// DATASET BUILDER
// ==========================

/// Root account used by most tests.
pub const ACCOUNT: i64 = 1;
/// A second root account.
pub const OTHER_ACCOUNT: i64 = 2;
/// Course in [`ACCOUNT`].
pub const COURSE: i64 = 10;
/// Course in [`OTHER_ACCOUNT`].
pub const OTHER_COURSE: i64 = 20;

/// Builds a [`Dataset`] with two root accounts and one course in each.
pub struct Fixture {
    dataset: Dataset,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    pub fn new() -> Self {
        let dataset = Dataset {
            accounts: vec![
                Account {
                    id: AccountId::new(ACCOUNT),
                    name: "State University".to_string(),
                },
                Account {
                    id: AccountId::new(OTHER_ACCOUNT),
                    name: "Community College".to_string(),
                },
            ],
            courses: vec![
                Course {
                    id: CourseId::new(COURSE),
                    root_account_id: AccountId::new(ACCOUNT),
                },
                Course {
                    id: CourseId::new(OTHER_COURSE),
                    root_account_id: AccountId::new(OTHER_ACCOUNT),
                },
            ],
            ..Default::default()
        };
        Self { dataset }
    }

    /// Adds a user with an email derived from the name.
    pub fn user(mut self, id: i64, name: &str) -> Self {
        let email = format!("{}@example.edu", name.to_lowercase());
        self.dataset.users.push(User {
            id: UserId::new(id),
            name: name.to_string(),
            email: Some(email),
        });
        self
    }

    /// Adds a user without an email address.
    pub fn user_without_email(mut self, id: i64, name: &str) -> Self {
        self.dataset.users.push(User {
            id: UserId::new(id),
            name: name.to_string(),
            email: None,
        });
        self
    }

    /// Adds an active student enrollment.
    pub fn student(self, id: i64, user: i64, course: i64) -> Self {
        self.enrollment(
            id,
            user,
            course,
            EnrollmentType::StudentEnrollment,
            EnrollmentState::Active,
        )
    }

    pub fn enrollment(
        mut self,
        id: i64,
        user: i64,
        course: i64,
        enrollment_type: EnrollmentType,
        state: EnrollmentState,
    ) -> Self {
        self.dataset.enrollments.push(Enrollment {
            id: EnrollmentId::new(id),
            user_id: UserId::new(user),
            course_id: CourseId::new(course),
            enrollment_type,
            workflow_state: state,
            sis_pseudonym_id: None,
        });
        self
    }

    /// Adds an active pseudonym.
    pub fn pseudonym(self, id: i64, user: i64, account: i64, sis_user_id: Option<&str>) -> Self {
        self.pseudonym_in_state(id, user, account, sis_user_id, PseudonymState::Active)
    }

    pub fn pseudonym_in_state(
        mut self,
        id: i64,
        user: i64,
        account: i64,
        sis_user_id: Option<&str>,
        state: PseudonymState,
    ) -> Self {
        self.dataset.pseudonyms.push(Pseudonym {
            id: PseudonymId::new(id),
            user_id: UserId::new(user),
            account_id: AccountId::new(account),
            unique_id: format!("login-{id}"),
            sis_user_id: sis_user_id.map(str::to_string),
            workflow_state: state,
            crypted_password: Some("existing-hash".to_string()),
            password_salt: Some("existing-salt".to_string()),
            created_at: 1_600_000_000_000,
        });
        self
    }

    pub fn dataset(self) -> Dataset {
        self.dataset
    }

    pub async fn backend(self) -> Box<dyn Backend> {
        seeded_backend(self.dataset).await
    }
}

// ==========================
// LOOKUPS
// ==========================

pub async fn enrollment(backend: &dyn Backend, id: i64) -> Enrollment {
    backend
        .export()
        .await
        .expect("Failed to export")
        .enrollments
        .into_iter()
        .find(|e| e.id == EnrollmentId::new(id))
        .expect("Enrollment should exist")
}

pub async fn pseudonyms_of(backend: &dyn Backend, user: i64, account: i64) -> Vec<Pseudonym> {
    backend
        .active_pseudonyms(UserId::new(user), AccountId::new(account))
        .await
        .expect("Failed to read pseudonyms")
}

pub async fn sis_user_id(backend: &dyn Backend, pseudonym: i64) -> Option<String> {
    backend
        .get_pseudonym(PseudonymId::new(pseudonym))
        .await
        .expect("Pseudonym should exist")
        .sis_user_id
}
