//! Typed record identifiers.
//!
//! Every record kind gets its own newtype over the storage row id so that a
//! user id can never be passed where a pseudonym id is expected.

use serde::{Deserialize, Serialize};

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw row id.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Returns the raw row id.
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Identifier of a root account (the authentication scope of pseudonyms).
    AccountId
);
record_id!(
    /// Identifier of a course.
    CourseId
);
record_id!(
    /// Identifier of a user.
    UserId
);
record_id!(
    /// Identifier of an enrollment.
    EnrollmentId
);
record_id!(
    /// Identifier of a pseudonym (login credential).
    PseudonymId
);
