//! Errors raised while parsing model values.

use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Unknown enrollment type: {name}")]
    UnknownEnrollmentType { name: String },

    #[error("No enrollment types configured")]
    EmptyEnrollmentTypes,

    #[error("Unknown {kind} workflow state: {state}")]
    UnknownState { kind: &'static str, state: String },
}

impl From<ModelError> for crate::Error {
    fn from(err: ModelError) -> Self {
        crate::Error::Model(err)
    }
}
