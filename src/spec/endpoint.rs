use std::fmt;

use serde::{Deserialize, Serialize};

use crate::spec::schema::Schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    /// Methods exercised by an evaluation, in per-path enumeration order.
    pub const SUPPORTED: [HttpMethod; 2] = [HttpMethod::Get, HttpMethod::Post];

    /// Key of the operation inside a path item.
    pub fn operation_key(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
    FormData,
    Body,
}

impl ParameterLocation {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "path" => Some(ParameterLocation::Path),
            "query" => Some(ParameterLocation::Query),
            "header" => Some(ParameterLocation::Header),
            "cookie" => Some(ParameterLocation::Cookie),
            "formData" => Some(ParameterLocation::FormData),
            "body" => Some(ParameterLocation::Body),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub schema: Option<Schema>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaContent {
    pub media_type: String,
    pub schema: Option<Schema>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestBody {
    pub content: Vec<MediaContent>,
}

impl RequestBody {
    pub fn media(&self, media_type: &str) -> Option<&MediaContent> {
        self.content.iter().find(|media| media.media_type == media_type)
    }
}

/// One (path, method) pair of a specification.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub path: String,
    pub method: HttpMethod,
    pub operation_id: Option<String>,
    pub parameters: Vec<Parameter>,
    pub request_body: Option<RequestBody>,
    pub full_url: String,
}

impl Endpoint {
    /// `METHOD path`, the key used in per-endpoint statistics.
    pub fn key(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    pub fn parameters_in(&self, location: ParameterLocation) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(move |p| p.location == location)
    }
}
