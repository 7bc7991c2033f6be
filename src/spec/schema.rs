use serde_json::{Map, Value};

use crate::spec::specification::Specification;

const DEFINITIONS_PREFIX: &str = "#/definitions/";
const COMPONENTS_PREFIX: &str = "#/components/schemas/";

/// Typed view over a JSON schema node. Only the parts that drive value
/// synthesis are kept.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    String(StringSchema),
    Integer(NumericSchema),
    Number(NumericSchema),
    Boolean,
    Array { items: Option<Box<Schema>> },
    Object(ObjectSchema),
    Reference(String),
    /// No usable `type`; only an example may be available
    Any { example: Option<Value> },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringSchema {
    pub format: Option<String>,
    pub enumeration: Vec<Value>,
    pub example: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericSchema {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub enumeration: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    /// Declared properties in document order
    pub properties: Vec<(String, Schema)>,
    pub required: Vec<String>,
}

impl ObjectSchema {
    pub fn is_required(&self, property: &str) -> bool {
        self.required.iter().any(|name| name == property)
    }
}

impl Schema {
    pub fn from_value(value: &Value) -> Schema {
        let Some(node) = value.as_object() else {
            return Schema::Any { example: None };
        };

        if let Some(reference) = node.get("$ref").and_then(Value::as_str) {
            return Schema::Reference(reference.to_string());
        }

        let enumeration = node
            .get("enum")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let example = node.get("example").cloned();

        match declared_type(node) {
            Some("string") => Schema::String(StringSchema {
                format: node.get("format").and_then(Value::as_str).map(str::to_string),
                enumeration,
                example,
            }),
            Some(kind @ ("integer" | "number")) => {
                let numeric = NumericSchema {
                    minimum: node.get("minimum").and_then(Value::as_f64),
                    maximum: node.get("maximum").and_then(Value::as_f64),
                    enumeration,
                };
                if kind == "integer" {
                    Schema::Integer(numeric)
                } else {
                    Schema::Number(numeric)
                }
            }
            Some("boolean") => Schema::Boolean,
            Some("array") => Schema::Array {
                items: node.get("items").map(|items| Box::new(Schema::from_value(items))),
            },
            Some("object") => Schema::Object(object_schema(node)),
            None if node.contains_key("properties") => Schema::Object(object_schema(node)),
            _ => Schema::Any { example },
        }
    }
}

/// `type` may be a plain string or, in 3.1 documents, a list such as
/// `["string", "null"]`.
fn declared_type(node: &Map<String, Value>) -> Option<&str> {
    match node.get("type")? {
        Value::String(kind) => Some(kind.as_str()),
        Value::Array(kinds) => kinds
            .iter()
            .filter_map(Value::as_str)
            .find(|kind| *kind != "null"),
        _ => None,
    }
}

fn object_schema(node: &Map<String, Value>) -> ObjectSchema {
    let properties = node
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| {
            props
                .iter()
                .map(|(name, schema)| (name.clone(), Schema::from_value(schema)))
                .collect()
        })
        .unwrap_or_default();
    let required = node
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();
    ObjectSchema { properties, required }
}

/// Strip the well-known definition prefixes; anything else is looked up
/// verbatim and will normally miss.
pub fn reference_name(reference: &str) -> &str {
    reference
        .strip_prefix(DEFINITIONS_PREFIX)
        .or_else(|| reference.strip_prefix(COMPONENTS_PREFIX))
        .unwrap_or(reference)
}

/// Resolves schema references by name. Caller-supplied definitions take
/// precedence over the specification's own `definitions` /
/// `components.schemas` bucket.
#[derive(Debug, Clone, Copy)]
pub struct SchemaResolver<'a> {
    supplied: Option<&'a Map<String, Value>>,
    definitions: &'a Map<String, Value>,
}

impl<'a> SchemaResolver<'a> {
    pub fn new(spec: &'a Specification) -> Self {
        Self {
            supplied: None,
            definitions: &spec.definitions,
        }
    }

    pub fn from_definitions(definitions: &'a Map<String, Value>) -> Self {
        Self {
            supplied: None,
            definitions,
        }
    }

    pub fn with_definitions(mut self, supplied: &'a Map<String, Value>) -> Self {
        self.supplied = Some(supplied);
        self
    }

    /// Unresolved references yield `None`; callers degrade to `null`.
    pub fn resolve(&self, reference: &str) -> Option<Schema> {
        let name = reference_name(reference);
        self.supplied
            .and_then(|defs| defs.get(name))
            .or_else(|| self.definitions.get(name))
            .map(Schema::from_value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_nullable_type_list() {
        let schema = Schema::from_value(&json!({"type": ["null", "integer"], "minimum": 3}));
        assert_eq!(
            schema,
            Schema::Integer(NumericSchema {
                minimum: Some(3.0),
                maximum: None,
                enumeration: vec![],
            })
        );
    }

    #[test]
    fn untyped_properties_are_objects() {
        let schema = Schema::from_value(&json!({
            "required": ["name"],
            "properties": {"name": {"type": "string"}, "age": {"type": "integer"}}
        }));
        let Schema::Object(object) = schema else {
            panic!("expected object schema");
        };
        assert_eq!(object.properties[0].0, "name");
        assert_eq!(object.properties[1].0, "age");
        assert!(object.is_required("name"));
        assert!(!object.is_required("age"));
    }

    #[test]
    fn supplied_definitions_win() {
        let spec_defs = json!({"Pet": {"type": "string"}});
        let supplied = json!({"Pet": {"type": "boolean"}});
        let resolver = SchemaResolver::from_definitions(spec_defs.as_object().unwrap())
            .with_definitions(supplied.as_object().unwrap());
        assert_eq!(resolver.resolve("#/definitions/Pet"), Some(Schema::Boolean));
        assert_eq!(resolver.resolve("#/components/schemas/Missing"), None);
    }
}
