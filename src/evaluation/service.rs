use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    error::{Error, Result, evaluation_error::EvaluationError},
    evaluation::{
        model::{Evaluation, EvaluationOverview, EvaluationStatus},
        orchestrator::EvaluationOrchestrator,
        store::EvaluationStore,
    },
    executor::RequestExecutor,
    shared::config::EvaluatorConfig,
    spec::loader::{SpecLoader, SpecSource},
    synth::synthesizer::DataSynthesizer,
};

pub const STARTED_MESSAGE: &str = "Evaluation started";
const DEFAULT_PAGE: usize = 1;
const DEFAULT_LIMIT: usize = 10;

/// Acknowledgment handed back as soon as a run has been scheduled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationCreated {
    pub id: String,
    pub status: EvaluationStatus,
    pub total_endpoints: usize,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current: usize,
    pub pages: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationPage {
    pub evaluations: Vec<EvaluationOverview>,
    pub pagination: Pagination,
}

/// Entry point for callers: create, read, list and delete evaluations.
pub struct EvaluationService {
    store: Arc<dyn EvaluationStore>,
    executor: Arc<RequestExecutor>,
    loader: SpecLoader,
    config: EvaluatorConfig,
}

impl EvaluationService {
    pub fn new(store: Arc<dyn EvaluationStore>, config: EvaluatorConfig) -> Result<Self> {
        let executor = Arc::new(RequestExecutor::new(&config)?);
        Ok(Self::with_executor(store, executor, config))
    }

    /// Use a prepared executor, typically one backed by a custom transport
    pub fn with_executor(
        store: Arc<dyn EvaluationStore>,
        executor: Arc<RequestExecutor>,
        config: EvaluatorConfig,
    ) -> Self {
        Self {
            store,
            executor,
            loader: SpecLoader::new(),
            config,
        }
    }

    /// Load the specification, persist a pending record and start the run in
    /// the background. Only loading and persistence errors reach the caller;
    /// the outcome of the run is observed by polling.
    pub async fn create(&self, source: SpecSource) -> Result<EvaluationCreated> {
        let spec = Arc::new(self.loader.load(source).await?);
        let endpoints = spec.endpoints();

        let evaluation = Evaluation::new(spec.source.clone(), spec.document.clone(), endpoints.len());
        let created = EvaluationCreated {
            id: evaluation.id.clone(),
            status: evaluation.status,
            total_endpoints: evaluation.total_endpoints,
            message: STARTED_MESSAGE.to_string(),
        };
        self.store.create(evaluation).await?;
        info!(
            "Evaluation {} created for {} ({} endpoint(s))",
            created.id, spec.source, created.total_endpoints
        );

        let orchestrator = EvaluationOrchestrator::new(
            self.store.clone(),
            self.executor.clone(),
            DataSynthesizer::from_entropy(&self.config),
        );
        let evaluation_id = created.id.clone();
        tokio::spawn(async move {
            let status = orchestrator.run(evaluation_id.clone(), spec, endpoints).await;
            debug!("Background run of {} ended as {}", evaluation_id, status);
        });

        Ok(created)
    }

    pub async fn get(&self, id: &str) -> Result<Evaluation> {
        self.store.get(id).await?.ok_or_else(|| not_found(id))
    }

    /// Newest first. `page` and `limit` of 0 fall back to 1 and 10.
    pub async fn list(&self, page: usize, limit: usize) -> Result<EvaluationPage> {
        let page = if page == 0 { DEFAULT_PAGE } else { page };
        let limit = if limit == 0 { DEFAULT_LIMIT } else { limit };

        let skip = (page - 1).saturating_mul(limit);
        let evaluations = self.store.list(skip, limit).await?;
        let total = self.store.count().await?;

        Ok(EvaluationPage {
            evaluations,
            pagination: Pagination {
                current: page,
                pages: total.div_ceil(limit),
                total,
            },
        })
    }

    /// Delete a record. A running evaluation is not cancelled; its next
    /// snapshot write fails and the run ends.
    pub async fn delete(&self, id: &str) -> Result<Evaluation> {
        let removed = self.store.delete(id).await?.ok_or_else(|| not_found(id))?;
        info!("Evaluation {} deleted", id);
        Ok(removed)
    }

    /// Poll the stored record until it reaches `completed` or `failed`.
    pub async fn wait_for_terminal(
        &self,
        id: &str,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<Evaluation> {
        let poll = async {
            loop {
                let evaluation = self.get(id).await?;
                if evaluation.status.is_terminal() {
                    return Ok(evaluation);
                }
                tokio::time::sleep(poll_interval).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Evaluation {} not finished after {:?}", id, timeout);
                Err(Error::EvaluationError(EvaluationError::Orchestration(format!(
                    "evaluation {id} did not finish within {timeout:?}"
                ))))
            }
        }
    }
}

fn not_found(id: &str) -> Error {
    Error::EvaluationError(EvaluationError::EvaluationNotFound(id.to_string()))
}
