use crate::evaluation::model::EvaluationStatus;

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("Failed to parse OAS: {0}")]
    SpecParse(String),

    #[error("Evaluation not found: {0}")]
    EvaluationNotFound(String),

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: EvaluationStatus,
        to: EvaluationStatus,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("orchestration error: {0}")]
    Orchestration(String),
}
