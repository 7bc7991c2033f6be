use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use futures::future::try_join_all;
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    error::{Result, evaluation_error::EvaluationError},
    spec::specification::{INLINE_SOURCE, Specification},
};

const OPERATION_KEYS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];
const PARAMETER_LOCATIONS: [&str; 6] = ["path", "query", "header", "cookie", "formData", "body"];

/// Where a specification comes from.
#[derive(Debug, Clone)]
pub enum SpecSource {
    /// http(s) URL or filesystem path
    Location(String),
    /// Already-parsed document
    Document(Value),
}

impl SpecSource {
    fn label(&self) -> String {
        match self {
            SpecSource::Location(location) => location.clone(),
            SpecSource::Document(_) => INLINE_SOURCE.to_string(),
        }
    }
}

/// Base a relative reference is resolved against.
#[derive(Debug, Clone)]
enum Origin {
    Remote(reqwest::Url),
    File(PathBuf),
    Inline,
}

impl Origin {
    fn of(source: &SpecSource) -> Result<Self> {
        match source {
            SpecSource::Document(_) => Ok(Origin::Inline),
            SpecSource::Location(location) if is_remote(location) => reqwest::Url::parse(location)
                .map(Origin::Remote)
                .map_err(|e| spec_error(format!("invalid specification URL {location}: {e}"))),
            SpecSource::Location(location) => Ok(Origin::File(PathBuf::from(location))),
        }
    }

    fn join(&self, reference: &str) -> Result<String> {
        if is_remote(reference) {
            return Ok(reference.to_string());
        }
        match self {
            Origin::Remote(base) => base
                .join(reference)
                .map(|url| url.to_string())
                .map_err(|e| spec_error(format!("cannot resolve $ref {reference}: {e}"))),
            Origin::File(path) => {
                let dir = path.parent().unwrap_or_else(|| Path::new("."));
                Ok(dir.join(reference).to_string_lossy().into_owned())
            }
            Origin::Inline => Err(spec_error(format!(
                "cannot resolve relative $ref {reference} of an inline document"
            ))),
        }
    }
}

/// Validates and dereferences API descriptions. One-shot: no retries.
#[derive(Debug, Clone, Default)]
pub struct SpecLoader {
    client: reqwest::Client,
}

impl SpecLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Every failure surfaces as [`EvaluationError::SpecParse`] carrying the
    /// underlying message.
    pub async fn load(&self, source: SpecSource) -> Result<Specification> {
        let origin = Origin::of(&source)?;
        let label = source.label();

        let mut document = match source {
            SpecSource::Document(document) => document,
            SpecSource::Location(location) => self.read_document(&location).await?,
        };

        self.inline_external_refs(&mut document, &origin).await?;
        validate(&document).map_err(spec_error)?;

        let base_url = base_url(&document, &origin);
        let spec = Specification::new(label, document, base_url);
        info!(
            "Loaded specification from {} (base URL \"{}\")",
            spec.source, spec.base_url
        );
        Ok(spec)
    }

    async fn read_document(&self, location: &str) -> Result<Value> {
        let text = if is_remote(location) {
            let response = self
                .client
                .get(location)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| spec_error(format!("failed to fetch {location}: {e}")))?;
            response
                .text()
                .await
                .map_err(|e| spec_error(format!("failed to read {location}: {e}")))?
        } else {
            tokio::fs::read_to_string(location)
                .await
                .map_err(|e| spec_error(format!("failed to read {location}: {e}")))?
        };
        parse_document(&text)
    }

    /// Replace every non-local `$ref` with the node it points at. Each
    /// distinct document is fetched once; refs inside fetched documents are
    /// not followed.
    async fn inline_external_refs(&self, document: &mut Value, origin: &Origin) -> Result<()> {
        let mut references = Vec::new();
        collect_refs(document, &mut |reference| {
            if !reference.starts_with('#') {
                references.push(reference.to_string());
            }
        });
        if references.is_empty() {
            return Ok(());
        }

        let mut locations: Vec<String> = Vec::new();
        for reference in &references {
            let (doc_part, _) = split_reference(reference);
            let location = origin.join(doc_part)?;
            if !locations.contains(&location) {
                locations.push(location);
            }
        }
        debug!("Resolving {} external document(s)", locations.len());

        let documents = try_join_all(locations.iter().map(|loc| self.read_document(loc))).await?;
        let fetched: HashMap<String, Value> = locations.into_iter().zip(documents).collect();

        replace_refs(document, &|reference| {
            let (doc_part, fragment) = split_reference(reference);
            let location = origin.join(doc_part)?;
            let target = fetched
                .get(&location)
                .and_then(|doc| doc.pointer(fragment))
                .ok_or_else(|| spec_error(format!("Error resolving $ref pointer \"{reference}\"")))?;
            Ok(target.clone())
        })
    }
}

fn spec_error(message: impl Into<String>) -> crate::error::Error {
    EvaluationError::SpecParse(message.into()).into()
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// JSON first, YAML as fallback.
fn parse_document(text: &str) -> Result<Value> {
    if let Ok(document) = serde_json::from_str(text) {
        return Ok(document);
    }
    serde_yaml::from_str(text).map_err(|e| spec_error(e.to_string()))
}

fn split_reference(reference: &str) -> (&str, &str) {
    match reference.split_once('#') {
        Some((doc, fragment)) => (doc, fragment),
        None => (reference, ""),
    }
}

fn collect_refs(node: &Value, visit: &mut impl FnMut(&str)) {
    match node {
        Value::Object(map) => {
            if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
                visit(reference);
            }
            for child in map.values() {
                collect_refs(child, visit);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_refs(item, visit)),
        _ => {}
    }
}

fn replace_refs(node: &mut Value, resolve: &impl Fn(&str) -> Result<Value>) -> Result<()> {
    match node {
        Value::Object(map) => {
            let external = map
                .get("$ref")
                .and_then(Value::as_str)
                .filter(|reference| !reference.starts_with('#'))
                .map(str::to_string);
            if let Some(reference) = external {
                *node = resolve(&reference)?;
                return Ok(());
            }
            for child in map.values_mut() {
                replace_refs(child, resolve)?;
            }
        }
        Value::Array(items) => {
            for item in items {
                replace_refs(item, resolve)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Structural checks; the message mirrors what a validator would report.
pub fn validate(document: &Value) -> std::result::Result<(), String> {
    let Some(root) = document.as_object() else {
        return Err("Swagger/OpenAPI document must be an object".to_string());
    };

    let openapi = root.get("openapi").and_then(version_of);
    let swagger = root.get("swagger").and_then(version_of);
    match (openapi.as_deref(), swagger.as_deref()) {
        (Some(version), _) if version.starts_with("3.") => {}
        (None, Some("2.0")) => {}
        (Some(version), _) | (None, Some(version)) => {
            return Err(format!("Unsupported OpenAPI version: {version}"));
        }
        (None, None) => return Err("is not a valid Swagger/OpenAPI document".to_string()),
    }

    if !root.get("info").is_some_and(Value::is_object) {
        return Err("missing required property: info".to_string());
    }
    let Some(paths) = root.get("paths").and_then(Value::as_object) else {
        return Err("missing required property: paths".to_string());
    };

    for (path, item) in paths {
        let Some(item) = item.as_object() else {
            return Err(format!("path item {path} must be an object"));
        };
        if let Some(parameters) = item.get("parameters") {
            validate_parameters(path, "parameters", parameters)?;
        }
        for key in OPERATION_KEYS {
            let Some(operation) = item.get(key) else {
                continue;
            };
            if !operation.is_object() {
                return Err(format!("operation {key} {path} must be an object"));
            }
            if let Some(parameters) = operation.get("parameters") {
                validate_parameters(path, key, parameters)?;
            }
        }
    }

    let mut unresolved = None;
    collect_refs(document, &mut |reference| {
        if unresolved.is_some() || !reference.starts_with('#') {
            return;
        }
        if document.pointer(&reference[1..]).is_none() {
            unresolved = Some(reference.to_string());
        }
    });
    if let Some(reference) = unresolved {
        return Err(format!("Error resolving $ref pointer \"{reference}\""));
    }

    Ok(())
}

/// Unquoted YAML versions such as `swagger: 2.0` arrive as numbers.
fn version_of(value: &Value) -> Option<String> {
    match value {
        Value::String(version) => Some(version.clone()),
        Value::Number(version) => Some(version.to_string()),
        _ => None,
    }
}

fn validate_parameters(path: &str, owner: &str, parameters: &Value) -> std::result::Result<(), String> {
    let Some(parameters) = parameters.as_array() else {
        return Err(format!("{owner} {path}: parameters must be an array"));
    };
    for parameter in parameters {
        if parameter.get("$ref").is_some() {
            continue;
        }
        let Some(name) = parameter.get("name").and_then(Value::as_str) else {
            return Err(format!("{owner} {path}: parameter is missing required property: name"));
        };
        let location = parameter.get("in").and_then(Value::as_str).unwrap_or_default();
        if !PARAMETER_LOCATIONS.contains(&location) {
            return Err(format!(
                "{owner} {path}: parameter {name} has invalid location \"{location}\""
            ));
        }
    }
    Ok(())
}

/// First server entry, else `scheme://host/basePath`, else empty. A relative
/// server URL is joined onto the URL the document was fetched from.
fn base_url(document: &Value, origin: &Origin) -> String {
    let server = document
        .get("servers")
        .and_then(Value::as_array)
        .and_then(|servers| servers.first())
        .and_then(|server| server.get("url"))
        .and_then(Value::as_str);
    if let Some(url) = server {
        if let Origin::Remote(base) = origin
            && !is_remote(url)
            && let Ok(joined) = base.join(url)
        {
            return joined.as_str().trim_end_matches('/').to_string();
        }
        return url.to_string();
    }

    if let Some(host) = document.get("host").and_then(Value::as_str) {
        let scheme = document
            .get("schemes")
            .and_then(Value::as_array)
            .and_then(|schemes| schemes.first())
            .and_then(Value::as_str)
            .unwrap_or("https");
        let base_path = document.get("basePath").and_then(Value::as_str).unwrap_or("");
        return format!("{scheme}://{host}{base_path}");
    }

    String::new()
}
