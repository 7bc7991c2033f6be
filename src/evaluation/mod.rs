pub mod model;
pub mod orchestrator;
pub mod service;
pub mod store;

pub use model::{Evaluation, EvaluationOverview, EvaluationStatus, RequestOutcome};
pub use orchestrator::EvaluationOrchestrator;
pub use service::{EvaluationCreated, EvaluationPage, EvaluationService, Pagination};
pub use store::{EvaluationStore, InMemoryEvaluationStore};
