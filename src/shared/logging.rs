use std::str::FromStr;

use tracing::Level;

use crate::shared::config::EvaluatorConfig;

/// Install a fmt subscriber at the configured level. Unknown levels fall back
/// to INFO; a subscriber that is already installed is left in place.
pub fn init_logging(config: &EvaluatorConfig) {
    let level = Level::from_str(&config.log_level).unwrap_or(Level::INFO);
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}
