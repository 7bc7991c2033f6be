use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{Error, Result, evaluation_error::EvaluationError},
    report::aggregator::SummaryReport,
    spec::endpoint::{Endpoint, HttpMethod},
};

/// Evaluation lifecycle. Only `pending -> running -> completed | failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl EvaluationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, EvaluationStatus::Completed | EvaluationStatus::Failed)
    }

    pub fn can_transition_to(&self, next: EvaluationStatus) -> bool {
        matches!(
            (self, next),
            (EvaluationStatus::Pending, EvaluationStatus::Running)
                | (EvaluationStatus::Running, EvaluationStatus::Completed)
                | (EvaluationStatus::Running, EvaluationStatus::Failed)
        )
    }
}

impl fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationStatus::Pending => write!(f, "pending"),
            EvaluationStatus::Running => write!(f, "running"),
            EvaluationStatus::Completed => write!(f, "completed"),
            EvaluationStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Recorded result of one request against one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOutcome {
    /// Path template
    pub endpoint: String,
    pub method: HttpMethod,
    /// Final URL that was called
    pub url: String,
    pub request_headers: BTreeMap<String, String>,
    pub request_body: Option<Value>,
    /// 0 when no response was obtained
    pub response_status: u16,
    pub response_headers: BTreeMap<String, String>,
    pub response_body: Value,
    /// Milliseconds, including retries and backoff
    pub response_time: u64,
    pub attempts: u32,
    pub success: bool,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl RequestOutcome {
    /// `METHOD path`
    pub fn endpoint_key(&self) -> String {
        format!("{} {}", self.method, self.endpoint)
    }

    /// Failed outcome for an endpoint whose request could not be built or sent.
    pub fn synthetic_failure(endpoint: &Endpoint, message: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.path.clone(),
            method: endpoint.method,
            url: endpoint.full_url.clone(),
            request_headers: BTreeMap::new(),
            request_body: None,
            response_status: 0,
            response_headers: BTreeMap::new(),
            response_body: Value::Null,
            response_time: 0,
            attempts: 0,
            success: false,
            error: Some(message.into()),
            timestamp: Utc::now(),
        }
    }
}

/// One full run across all endpoints of a specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub id: String,
    pub spec_url: String,
    pub spec_content: Value,
    pub total_endpoints: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub success_rate: f64,
    pub request_logs: Vec<RequestOutcome>,
    pub summary: Option<SummaryReport>,
    pub status: EvaluationStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Evaluation {
    pub fn new(spec_url: impl Into<String>, spec_content: Value, total_endpoints: usize) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            spec_url: spec_url.into(),
            spec_content,
            total_endpoints,
            successful_requests: 0,
            failed_requests: 0,
            success_rate: 0.0,
            request_logs: Vec::new(),
            summary: None,
            status: EvaluationStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn processed(&self) -> usize {
        self.successful_requests + self.failed_requests
    }

    fn transition(&mut self, next: EvaluationStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::EvaluationError(EvaluationError::InvalidTransition {
                from: self.status,
                to: next,
            }));
        }
        self.status = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    pub fn start(&mut self) -> Result<()> {
        self.transition(EvaluationStatus::Running)
    }

    /// Append an outcome and bump the matching counter.
    pub fn record(&mut self, outcome: RequestOutcome) -> Result<()> {
        if self.status != EvaluationStatus::Running {
            return Err(Error::EvaluationError(EvaluationError::Orchestration(format!(
                "cannot record outcomes while {}",
                self.status
            ))));
        }
        if self.processed() >= self.total_endpoints {
            return Err(Error::EvaluationError(EvaluationError::Orchestration(format!(
                "more outcomes than the {} endpoints under test",
                self.total_endpoints
            ))));
        }
        if outcome.success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }
        self.request_logs.push(outcome);
        Ok(())
    }

    pub fn complete(&mut self, summary: SummaryReport) -> Result<()> {
        self.transition(EvaluationStatus::Completed)?;
        self.success_rate = summary.success_rate;
        self.summary = Some(summary);
        Ok(())
    }

    pub fn fail(&mut self) -> Result<()> {
        self.transition(EvaluationStatus::Failed)
    }

    /// Listing projection without logs or the raw document.
    pub fn overview(&self) -> EvaluationOverview {
        EvaluationOverview {
            id: self.id.clone(),
            spec_url: self.spec_url.clone(),
            total_endpoints: self.total_endpoints,
            successful_requests: self.successful_requests,
            failed_requests: self.failed_requests,
            success_rate: self.success_rate,
            summary: self.summary.clone(),
            status: self.status,
            created_at: self.created_at,
            completed_at: self.completed_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationOverview {
    pub id: String,
    pub spec_url: String,
    pub total_endpoints: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub success_rate: f64,
    pub summary: Option<SummaryReport>,
    pub status: EvaluationStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn outcome(success: bool) -> RequestOutcome {
        let endpoint = Endpoint {
            path: "/pet".to_string(),
            method: HttpMethod::Get,
            operation_id: None,
            parameters: vec![],
            request_body: None,
            full_url: "http://localhost/pet".to_string(),
        };
        let mut outcome = RequestOutcome::synthetic_failure(&endpoint, "boom");
        outcome.success = success;
        outcome
    }

    #[test]
    fn transitions_are_monotonic() {
        let mut evaluation = Evaluation::new("spec.json", json!({}), 1);
        assert!(evaluation.fail().is_err());
        evaluation.start().unwrap();
        assert!(evaluation.start().is_err());
        evaluation.fail().unwrap();
        assert!(evaluation.completed_at.is_some());
        assert!(evaluation.start().is_err());
        assert!(evaluation.complete(SummaryReport::default()).is_err());
        assert_eq!(evaluation.status, EvaluationStatus::Failed);
    }

    #[test]
    fn record_refuses_more_than_total() {
        let mut evaluation = Evaluation::new("spec.json", json!({}), 1);
        assert!(evaluation.record(outcome(true)).is_err());
        evaluation.start().unwrap();
        evaluation.record(outcome(true)).unwrap();
        assert!(evaluation.record(outcome(false)).is_err());
        assert_eq!(evaluation.successful_requests, 1);
        assert_eq!(evaluation.request_logs.len(), 1);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(EvaluationStatus::Running).unwrap(), json!("running"));
    }

    #[test]
    fn status_defaults_to_pending() {
        assert_eq!(EvaluationStatus::default(), EvaluationStatus::Pending);
    }
}
