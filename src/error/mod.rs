pub mod evaluation_error;

use std::io;

use thiserror::Error as ThisError;

use crate::error::evaluation_error::EvaluationError;

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serde_json error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("serde_yaml error: {0}")]
    SerdeYamlError(#[from] serde_yaml::Error),

    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("evaluation error: {0}")]
    EvaluationError(#[from] EvaluationError),
}

impl Error {
    /// Message of the innermost domain error, used when the failure has to be
    /// recorded on an outcome rather than propagated.
    pub fn message(&self) -> String {
        match self {
            Error::EvaluationError(inner) => inner.to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
