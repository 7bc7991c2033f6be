use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::spec::endpoint::HttpMethod;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const JSON: &str = "application/json";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const MULTIPART: &str = "multipart/form-data";

/// A concrete request for one endpoint. Built fresh for every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPlan {
    /// Path template the plan was derived from
    pub endpoint: String,
    pub method: HttpMethod,
    /// Full URL with path parameters substituted
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub query: Map<String, Value>,
    pub body: Option<Value>,
}

impl RequestPlan {
    pub fn new(endpoint: &str, method: HttpMethod, url: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            method,
            url: url.to_string(),
            headers: BTreeMap::new(),
            query: Map::new(),
            body: None,
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).map(String::as_str)
    }

    pub fn set_content_type(&mut self, media_type: &str) {
        self.headers.insert(CONTENT_TYPE.to_string(), media_type.to_string());
    }

    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.query
            .iter()
            .map(|(name, value)| (name.clone(), param_string(value)))
            .collect()
    }

    /// Top-level body fields as strings, for form encodings.
    pub fn form_fields(&self) -> Vec<(String, String)> {
        match &self.body {
            Some(Value::Object(fields)) => fields
                .iter()
                .map(|(name, value)| (name.clone(), param_string(value)))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Strings are used raw, everything else in its JSON form.
pub fn param_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
