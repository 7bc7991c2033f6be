use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use rand::{Rng, rngs::StdRng};
use tracing::{debug, error, info, warn};

use crate::{
    error::{Error, Result, evaluation_error::EvaluationError},
    evaluation::{
        model::{EvaluationStatus, RequestOutcome},
        store::EvaluationStore,
    },
    executor::RequestExecutor,
    report::aggregator::summarize,
    spec::{endpoint::Endpoint, specification::Specification},
    synth::synthesizer::DataSynthesizer,
};

/// Drives one evaluation from `pending` to a terminal state. Endpoints are
/// processed one at a time; every outcome is persisted before the next call.
pub struct EvaluationOrchestrator<R = StdRng> {
    store: Arc<dyn EvaluationStore>,
    executor: Arc<RequestExecutor>,
    synthesizer: DataSynthesizer<R>,
}

impl<R: Rng + Send> EvaluationOrchestrator<R> {
    pub fn new(
        store: Arc<dyn EvaluationStore>,
        executor: Arc<RequestExecutor>,
        synthesizer: DataSynthesizer<R>,
    ) -> Self {
        Self {
            store,
            executor,
            synthesizer,
        }
    }

    /// Top-level error boundary. Any failure or panic of the loop itself
    /// converges the stored record to `failed`; outcomes already persisted
    /// are kept.
    pub async fn run(
        mut self,
        evaluation_id: String,
        spec: Arc<Specification>,
        endpoints: Vec<Endpoint>,
    ) -> EvaluationStatus {
        let result = AssertUnwindSafe(self.process(&evaluation_id, &spec, &endpoints))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(())) => {
                info!("Evaluation {} completed", evaluation_id);
                return EvaluationStatus::Completed;
            }
            Ok(Err(e)) => error!("Evaluation {} failed: {}", evaluation_id, e),
            Err(panic) => error!(
                "Evaluation {} panicked: {}",
                evaluation_id,
                panic_message(panic.as_ref())
            ),
        }

        if let Err(mark_error) = self.mark_failed(&evaluation_id).await {
            error!(
                "Evaluation {} could not be marked failed: {}",
                evaluation_id, mark_error
            );
        }
        EvaluationStatus::Failed
    }

    async fn process(
        &mut self,
        evaluation_id: &str,
        spec: &Specification,
        endpoints: &[Endpoint],
    ) -> Result<()> {
        let mut evaluation = self.store.get(evaluation_id).await?.ok_or_else(|| {
            Error::EvaluationError(EvaluationError::EvaluationNotFound(evaluation_id.to_string()))
        })?;

        evaluation.start()?;
        self.store.update(&evaluation).await?;
        info!(
            "Evaluation {} running against {} endpoint(s)",
            evaluation_id,
            endpoints.len()
        );

        for endpoint in endpoints {
            let outcome = match self.test_endpoint(spec, endpoint).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Error testing endpoint {}: {}", endpoint.key(), e);
                    RequestOutcome::synthetic_failure(endpoint, e.message())
                }
            };
            debug!(
                "{} -> {} ({})",
                endpoint.key(),
                outcome.response_status,
                if outcome.success { "ok" } else { "failed" }
            );

            evaluation.record(outcome)?;
            self.store.update(&evaluation).await?;
        }

        let summary = summarize(&evaluation.request_logs);
        evaluation.complete(summary)?;
        self.store.update(&evaluation).await?;
        Ok(())
    }

    async fn test_endpoint(&mut self, spec: &Specification, endpoint: &Endpoint) -> Result<RequestOutcome> {
        let plan = self.synthesizer.synthesize(spec, endpoint);
        self.executor.execute(&plan).await
    }

    /// Re-read the persisted record and force it to `failed`.
    async fn mark_failed(&self, evaluation_id: &str) -> Result<()> {
        let Some(mut evaluation) = self.store.get(evaluation_id).await? else {
            return Err(Error::EvaluationError(EvaluationError::EvaluationNotFound(
                evaluation_id.to_string(),
            )));
        };
        if evaluation.status.is_terminal() {
            return Ok(());
        }
        if evaluation.status == EvaluationStatus::Pending {
            evaluation.start()?;
        }
        evaluation.fail()?;
        self.store.update(&evaluation).await
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
