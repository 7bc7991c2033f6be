use serde_json::{Map, Value};

use crate::spec::{
    endpoint::{Endpoint, HttpMethod, MediaContent, Parameter, ParameterLocation, RequestBody},
    schema::Schema,
};

/// Source label stored for documents supplied inline.
pub const INLINE_SOURCE: &str = "Provided as JSON";

/// A validated, dereferenced API description.
#[derive(Debug, Clone)]
pub struct Specification {
    /// Where the document came from, or [`INLINE_SOURCE`]
    pub source: String,
    pub document: Value,
    pub base_url: String,
    /// Merged `definitions` and `components.schemas`
    pub definitions: Map<String, Value>,
}

impl Specification {
    pub fn new(source: String, document: Value, base_url: String) -> Self {
        let mut definitions = Map::new();
        if let Some(defs) = document.get("definitions").and_then(Value::as_object) {
            definitions.extend(defs.clone());
        }
        if let Some(schemas) = document
            .pointer("/components/schemas")
            .and_then(Value::as_object)
        {
            definitions.extend(schemas.clone());
        }

        Self {
            source,
            document,
            base_url,
            definitions,
        }
    }

    /// One endpoint per supported method of every path, in document order.
    /// Methods other than GET and POST are skipped.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        let Some(paths) = self.document.get("paths").and_then(Value::as_object) else {
            return Vec::new();
        };

        let mut endpoints = Vec::new();
        for (path, item) in paths {
            let shared = item
                .get("parameters")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();

            for method in HttpMethod::SUPPORTED {
                let Some(operation) = item.get(method.operation_key()) else {
                    continue;
                };
                endpoints.push(Endpoint {
                    path: path.clone(),
                    method,
                    operation_id: operation
                        .get("operationId")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    parameters: self.parameters(shared, operation),
                    request_body: self.request_body(operation),
                    full_url: format!("{}{}", self.base_url, path),
                });
            }
        }
        endpoints
    }

    /// Follow an internal `#/...` pointer; non-reference nodes are returned as is.
    pub fn dereference<'a>(&'a self, node: &'a Value) -> Option<&'a Value> {
        match node.get("$ref").and_then(Value::as_str) {
            Some(reference) => self.document.pointer(reference.strip_prefix('#')?),
            None => Some(node),
        }
    }

    fn parameters(&self, shared: &[Value], operation: &Value) -> Vec<Parameter> {
        let own = operation
            .get("parameters")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut parameters: Vec<Parameter> = own
            .iter()
            .filter_map(|raw| self.parameter(raw))
            .collect();

        // path-level entries apply unless the operation overrides (name, in)
        for inherited in shared.iter().filter_map(|raw| self.parameter(raw)) {
            let overridden = parameters
                .iter()
                .any(|p| p.name == inherited.name && p.location == inherited.location);
            if !overridden {
                parameters.push(inherited);
            }
        }
        parameters
    }

    fn parameter(&self, raw: &Value) -> Option<Parameter> {
        let node = self.dereference(raw)?;
        let name = node.get("name")?.as_str()?.to_string();
        let location = ParameterLocation::parse(node.get("in")?.as_str()?)?;

        // legacy non-body parameters carry their type inline
        let schema = match (node.get("schema"), location) {
            (Some(schema), _) => Some(Schema::from_value(schema)),
            (None, ParameterLocation::Body) => None,
            (None, _) => Some(Schema::from_value(node)),
        };

        Some(Parameter {
            name,
            location,
            required: node.get("required").and_then(Value::as_bool).unwrap_or(false),
            schema,
        })
    }

    fn request_body(&self, operation: &Value) -> Option<RequestBody> {
        let body = self.dereference(operation.get("requestBody")?)?;
        let content = body
            .get("content")
            .and_then(Value::as_object)?
            .iter()
            .map(|(media_type, media)| MediaContent {
                media_type: media_type.clone(),
                schema: media.get("schema").map(Schema::from_value),
            })
            .collect();
        Some(RequestBody { content })
    }
}
