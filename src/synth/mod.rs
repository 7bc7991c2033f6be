pub mod fake;
pub mod generator;
pub mod heuristics;
pub mod plan;
pub mod synthesizer;

pub use generator::SchemaGenerator;
pub use heuristics::{HeuristicContext, HeuristicRule};
pub use plan::RequestPlan;
pub use synthesizer::DataSynthesizer;
