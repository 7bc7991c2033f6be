use std::{sync::Arc, time::Duration};

use oas_evaluator::{
    evaluation::{EvaluationService, InMemoryEvaluationStore},
    shared::{EvaluatorConfig, init_logging},
    spec::SpecSource,
};
use tracing::info;

/// Usage: evaluate_spec <spec url or path> [config.json]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let location = args
        .next()
        .unwrap_or_else(|| "https://petstore.swagger.io/v2/swagger.json".to_string());
    let config = match args.next() {
        Some(path) => EvaluatorConfig::from_file(path)?,
        None => EvaluatorConfig::default(),
    };

    init_logging(&config);

    let store = Arc::new(InMemoryEvaluationStore::new());
    let service = EvaluationService::new(store, config)?;

    let created = service.create(SpecSource::Location(location)).await?;
    info!("{}: {} ({} endpoints)", created.message, created.id, created.total_endpoints);

    let evaluation = service
        .wait_for_terminal(&created.id, Duration::from_millis(500), Duration::from_secs(600))
        .await?;
    info!(
        "Evaluation {} {}: {}/{} successful",
        evaluation.id, evaluation.status, evaluation.successful_requests, evaluation.total_endpoints
    );

    if let Some(summary) = &evaluation.summary {
        println!("{}", serde_json::to_string_pretty(summary)?);
    }
    Ok(())
}
