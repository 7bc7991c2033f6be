use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    error::{Error, Result, evaluation_error::EvaluationError},
    evaluation::model::{Evaluation, EvaluationOverview},
};

/// Durable per-evaluation document store.
#[async_trait]
pub trait EvaluationStore: Send + Sync {
    async fn create(&self, evaluation: Evaluation) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<Evaluation>>;

    /// Newest first, projected without logs or the raw document
    async fn list(&self, skip: usize, limit: usize) -> Result<Vec<EvaluationOverview>>;

    async fn count(&self) -> Result<usize>;

    /// Overwrite the stored record
    async fn update(&self, evaluation: &Evaluation) -> Result<()>;

    /// Removed record, `None` if the id was unknown
    async fn delete(&self, id: &str) -> Result<Option<Evaluation>>;
}

#[derive(Default)]
struct Records {
    by_id: HashMap<String, Evaluation>,
    /// Insertion order, oldest first
    order: Vec<String>,
}

/// In-process store.
#[derive(Clone, Default)]
pub struct InMemoryEvaluationStore {
    records: Arc<RwLock<Records>>,
}

impl InMemoryEvaluationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EvaluationStore for InMemoryEvaluationStore {
    async fn create(&self, evaluation: Evaluation) -> Result<()> {
        let mut records = self.records.write().await;
        if records.by_id.contains_key(&evaluation.id) {
            return Err(Error::EvaluationError(EvaluationError::Storage(format!(
                "evaluation {} already exists",
                evaluation.id
            ))));
        }
        records.order.push(evaluation.id.clone());
        records.by_id.insert(evaluation.id.clone(), evaluation);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Evaluation>> {
        Ok(self.records.read().await.by_id.get(id).cloned())
    }

    async fn list(&self, skip: usize, limit: usize) -> Result<Vec<EvaluationOverview>> {
        let records = self.records.read().await;
        Ok(records
            .order
            .iter()
            .rev()
            .filter_map(|id| records.by_id.get(id))
            .skip(skip)
            .take(limit)
            .map(Evaluation::overview)
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().await.by_id.len())
    }

    async fn update(&self, evaluation: &Evaluation) -> Result<()> {
        let mut records = self.records.write().await;
        let stored = records
            .by_id
            .get_mut(&evaluation.id)
            .ok_or_else(|| Error::EvaluationError(EvaluationError::EvaluationNotFound(evaluation.id.clone())))?;
        *stored = evaluation.clone();
        debug!(
            "Stored evaluation {} ({}, {} log(s))",
            evaluation.id,
            evaluation.status,
            evaluation.request_logs.len()
        );
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<Option<Evaluation>> {
        let mut records = self.records.write().await;
        let removed = records.by_id.remove(id);
        if removed.is_some() {
            records.order.retain(|existing| existing != id);
        }
        Ok(removed)
    }
}
