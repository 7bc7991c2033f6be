pub mod aggregator;

pub use aggregator::{EndpointSummary, SummaryReport, summarize};
