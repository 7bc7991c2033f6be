use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::evaluation::model::RequestOutcome;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub success_rate: f64,
    pub average_response_time: f64,
}

/// Statistics over an ordered sequence of outcomes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    /// Percentage, 0 when there are no requests
    pub success_rate: f64,
    pub average_response_time: f64,
    /// Keyed by `METHOD path`
    pub endpoint_summary: BTreeMap<String, EndpointSummary>,
    pub status_code_distribution: BTreeMap<String, usize>,
    pub error_types: BTreeMap<String, usize>,
}

fn rate(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

fn average(sum: u64, count: usize) -> f64 {
    if count == 0 { 0.0 } else { sum as f64 / count as f64 }
}

pub fn summarize(outcomes: &[RequestOutcome]) -> SummaryReport {
    let mut report = SummaryReport {
        total_requests: outcomes.len(),
        ..SummaryReport::default()
    };
    let mut total_time = 0u64;
    let mut endpoint_time: BTreeMap<String, u64> = BTreeMap::new();

    for outcome in outcomes {
        let key = outcome.endpoint_key();
        let entry = report.endpoint_summary.entry(key.clone()).or_default();
        entry.total += 1;
        if outcome.success {
            report.successful_requests += 1;
            entry.successful += 1;
        } else {
            report.failed_requests += 1;
            entry.failed += 1;
        }

        total_time += outcome.response_time;
        *endpoint_time.entry(key).or_default() += outcome.response_time;

        *report
            .status_code_distribution
            .entry(outcome.response_status.to_string())
            .or_default() += 1;
        if let Some(error) = &outcome.error {
            *report.error_types.entry(error.clone()).or_default() += 1;
        }
    }

    report.success_rate = rate(report.successful_requests, report.total_requests);
    report.average_response_time = average(total_time, report.total_requests);
    for (key, stats) in report.endpoint_summary.iter_mut() {
        stats.success_rate = rate(stats.successful, stats.total);
        stats.average_response_time =
            average(endpoint_time.get(key).copied().unwrap_or_default(), stats.total);
    }

    report
}
