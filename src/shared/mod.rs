pub mod config;
pub mod logging;

pub use config::EvaluatorConfig;
pub use logging::init_logging;
