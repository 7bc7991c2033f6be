use std::{collections::BTreeMap, error::Error as StdError, io, time::Duration};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    error::Result,
    spec::endpoint::HttpMethod,
    synth::plan::{CONTENT_TYPE, FORM_URLENCODED, MULTIPART, RequestPlan},
};

/// Response as handed back by a transport; any status is passed through.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    /// Parsed JSON when possible, otherwise the raw text; empty is null
    pub body: Value,
}

/// Failure that prevented a response from being obtained.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Request timeout")]
    Timeout,

    #[error("DNS resolution failed")]
    DnsResolution,

    #[error("Connection refused")]
    ConnectionRefused,

    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(
        &self,
        plan: &RequestPlan,
        timeout: Duration,
    ) -> core::result::Result<TransportResponse, TransportError>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn build(&self, plan: &RequestPlan, timeout: Duration) -> reqwest::RequestBuilder {
        let method = match plan.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };
        let content_type = plan.content_type().unwrap_or_default();

        let mut request = self.client.request(method, &plan.url).timeout(timeout);
        if !plan.query.is_empty() {
            request = request.query(&plan.query_pairs());
        }
        for (name, value) in &plan.headers {
            // multipart needs the boundary reqwest generates
            if content_type == MULTIPART && name.eq_ignore_ascii_case(CONTENT_TYPE) {
                continue;
            }
            request = request.header(name, value);
        }

        match (&plan.body, plan.method) {
            (Some(body), HttpMethod::Post) if !body.is_null() => match content_type {
                FORM_URLENCODED => request.form(&plan.form_fields()),
                MULTIPART => {
                    let form = plan
                        .form_fields()
                        .into_iter()
                        .fold(reqwest::multipart::Form::new(), |form, (name, value)| {
                            form.text(name, value)
                        });
                    request.multipart(form)
                }
                _ => request.json(body),
            },
            _ => request,
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        plan: &RequestPlan,
        timeout: Duration,
    ) -> core::result::Result<TransportResponse, TransportError> {
        let response = self.build(plan, timeout).send().await.map_err(classify)?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let text = response.text().await.map_err(classify)?;

        Ok(TransportResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: parse_body(&text),
        })
    }
}

pub fn parse_body(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Map a reqwest failure onto the fixed labels.
pub fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        return TransportError::Timeout;
    }
    if error.is_connect() {
        let mut source = error.source();
        while let Some(cause) = source {
            if let Some(io_error) = cause.downcast_ref::<io::Error>() {
                match io_error.kind() {
                    io::ErrorKind::ConnectionRefused => return TransportError::ConnectionRefused,
                    io::ErrorKind::TimedOut => return TransportError::Timeout,
                    _ => {}
                }
            }
            let text = cause.to_string().to_lowercase();
            if text.contains("dns error") || text.contains("failed to lookup address") {
                return TransportError::DnsResolution;
            }
            source = cause.source();
        }
    }
    TransportError::Other(error_chain(&error))
}

fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
