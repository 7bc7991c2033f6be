use std::{
    collections::BTreeMap,
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    error::{Error, Result, evaluation_error::EvaluationError},
    evaluation::model::RequestOutcome,
    executor::{
        payload::sanitize_body,
        transport::{HttpTransport, ReqwestTransport, TransportError, TransportResponse},
    },
    shared::config::EvaluatorConfig,
    synth::plan::RequestPlan,
};

/// Executes one request plan with a bounded timeout, linear-backoff retries
/// and outcome classification.
pub struct RequestExecutor {
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
    max_body_chars: usize,
}

impl RequestExecutor {
    pub fn new(config: &EvaluatorConfig) -> Result<Self> {
        Ok(Self::with_transport(config, Arc::new(ReqwestTransport::new()?)))
    }

    pub fn with_transport(config: &EvaluatorConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            timeout: config.request_timeout(),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
            max_body_chars: config.max_body_chars,
        }
    }

    /// Network failures are absorbed into a failed outcome. `Err` is only
    /// returned for plans that cannot be sent at all.
    pub async fn execute(&self, plan: &RequestPlan) -> Result<RequestOutcome> {
        reqwest::Url::parse(&plan.url).map_err(|e| {
            Error::EvaluationError(EvaluationError::InvalidRequest(format!(
                "invalid URL \"{}\": {}",
                plan.url, e
            )))
        })?;

        let started = Instant::now();
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.transport.send(plan, self.timeout).await {
                Ok(response) => return Ok(self.completed(plan, response, started, attempt)),
                Err(error) if attempt > self.max_retries => {
                    warn!(
                        "{} {} failed after {} attempt(s): {}",
                        plan.method, plan.url, attempt, error
                    );
                    return Ok(self.exhausted(plan, error, started, attempt));
                }
                Err(error) => {
                    let wait = self.retry_delay * attempt;
                    warn!(
                        "{} {} attempt {} failed ({}), retrying in {:?}",
                        plan.method, plan.url, attempt, error, wait
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    fn completed(
        &self,
        plan: &RequestPlan,
        response: TransportResponse,
        started: Instant,
        attempts: u32,
    ) -> RequestOutcome {
        let success = (200..400).contains(&response.status);
        let error = (!success).then(|| format!("HTTP {}: {}", response.status, response.status_text));
        debug!(
            "{} {} -> {} in {} attempt(s)",
            plan.method, plan.url, response.status, attempts
        );

        RequestOutcome {
            endpoint: plan.endpoint.clone(),
            method: plan.method,
            url: plan.url.clone(),
            request_headers: plan.headers.clone(),
            request_body: plan.body.clone(),
            response_status: response.status,
            response_headers: response.headers,
            response_body: sanitize_body(response.body, self.max_body_chars),
            response_time: elapsed_ms(started),
            attempts,
            success,
            error,
            timestamp: Utc::now(),
        }
    }

    fn exhausted(
        &self,
        plan: &RequestPlan,
        error: TransportError,
        started: Instant,
        attempts: u32,
    ) -> RequestOutcome {
        RequestOutcome {
            endpoint: plan.endpoint.clone(),
            method: plan.method,
            url: plan.url.clone(),
            request_headers: plan.headers.clone(),
            request_body: plan.body.clone(),
            response_status: 0,
            response_headers: BTreeMap::new(),
            response_body: Value::Null,
            response_time: elapsed_ms(started),
            attempts,
            success: false,
            error: Some(error.to_string()),
            timestamp: Utc::now(),
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
