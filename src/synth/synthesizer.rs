use rand::{Rng, SeedableRng, rngs::StdRng};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    shared::config::EvaluatorConfig,
    spec::{
        endpoint::{Endpoint, HttpMethod, ParameterLocation},
        schema::{Schema, SchemaResolver},
        specification::Specification,
    },
    synth::{
        generator::SchemaGenerator,
        heuristics::{self, BODY_FIELD_RULES, HeuristicContext, PARAMETER_RULES},
        plan::{FORM_URLENCODED, JSON, MULTIPART, RequestPlan, param_string},
    },
};

/// Body media types in order of preference.
const BODY_MEDIA_TYPES: [&str; 3] = [JSON, FORM_URLENCODED, MULTIPART];

/// Turns endpoints into concrete request plans. All randomness is drawn from
/// the injected `rng`.
#[derive(Debug, Clone)]
pub struct DataSynthesizer<R = StdRng> {
    rng: R,
    user_agent: String,
    accept: String,
    optional_probability: f64,
    max_depth: usize,
}

impl DataSynthesizer<StdRng> {
    pub fn from_entropy(config: &EvaluatorConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn seeded(config: &EvaluatorConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> DataSynthesizer<R> {
    pub fn with_rng(config: &EvaluatorConfig, rng: R) -> Self {
        Self {
            rng,
            user_agent: config.user_agent.clone(),
            accept: config.accept.clone(),
            optional_probability: config.optional_field_probability,
            max_depth: config.max_schema_depth,
        }
    }

    fn generator<'a>(&self, resolver: SchemaResolver<'a>) -> SchemaGenerator<'a> {
        SchemaGenerator::new(resolver, self.optional_probability, self.max_depth)
    }

    pub fn synthesize(&mut self, spec: &Specification, endpoint: &Endpoint) -> RequestPlan {
        let mut plan = RequestPlan::new(&endpoint.path, endpoint.method, &endpoint.full_url);
        plan.headers.insert("User-Agent".to_string(), self.user_agent.clone());
        plan.headers.insert("Accept".to_string(), self.accept.clone());

        for param in endpoint.parameters_in(ParameterLocation::Path) {
            let value = self.parameter_value(spec, &param.name, param.schema.as_ref(), &endpoint.path);
            plan.url = plan
                .url
                .replace(&format!("{{{}}}", param.name), &param_string(&value));
        }
        for param in endpoint.parameters_in(ParameterLocation::Query) {
            let value = self.parameter_value(spec, &param.name, param.schema.as_ref(), &endpoint.path);
            plan.query.insert(param.name.clone(), value);
        }
        for param in endpoint.parameters_in(ParameterLocation::Header) {
            let value = self.parameter_value(spec, &param.name, param.schema.as_ref(), &endpoint.path);
            plan.headers.insert(param.name.clone(), param_string(&value));
        }

        if endpoint.method == HttpMethod::Post {
            self.attach_form_data(spec, endpoint, &mut plan);
            self.attach_request_body(spec, endpoint, &mut plan);
            if plan.body.is_none() {
                self.attach_body_parameter(spec, endpoint, &mut plan);
            }
        }

        debug!("Synthesized {} {} -> {}", endpoint.method, endpoint.path, plan.url);
        plan
    }

    /// Heuristic value for a named parameter, falling back to schema-typed
    /// generation.
    pub fn parameter_value(
        &mut self,
        spec: &Specification,
        name: &str,
        schema: Option<&Schema>,
        path: &str,
    ) -> Value {
        let context = HeuristicContext::new(name, path);
        if let Some(value) = heuristics::apply(PARAMETER_RULES, &context, &mut self.rng) {
            return value;
        }
        match schema {
            Some(schema) => self.generator(SchemaResolver::new(spec)).generate(schema, &mut self.rng),
            None => Value::Null,
        }
    }

    /// Request body for `schema` using the specification's definitions.
    pub fn request_body(&mut self, spec: &Specification, schema: &Schema, path: &str) -> Value {
        let generator = self.generator(SchemaResolver::new(spec));
        self.body_value(&generator, schema, path)
    }

    /// Request body resolving references against `definitions` first.
    pub fn request_body_with(
        &mut self,
        spec: &Specification,
        definitions: &Map<String, Value>,
        schema: &Schema,
        path: &str,
    ) -> Value {
        let generator = self.generator(SchemaResolver::new(spec).with_definitions(definitions));
        self.body_value(&generator, schema, path)
    }

    fn body_value(&mut self, generator: &SchemaGenerator<'_>, schema: &Schema, path: &str) -> Value {
        let Some((schema, depth)) = generator.concrete(schema, 0) else {
            return Value::Null;
        };
        let Schema::Object(object) = &schema else {
            return generator.generate_at(&schema, &mut self.rng, depth);
        };
        if object.properties.is_empty() {
            return generator.generate_at(&schema, &mut self.rng, depth);
        }

        let mut fields = Map::new();
        for (name, property) in &object.properties {
            if !object.is_required(name) && !generator.include_optional(&mut self.rng) {
                continue;
            }
            let context = HeuristicContext::new(name, path);
            let value = heuristics::apply(BODY_FIELD_RULES, &context, &mut self.rng)
                .unwrap_or_else(|| generator.generate_at(property, &mut self.rng, depth + 1));
            fields.insert(name.clone(), value);
        }
        Value::Object(fields)
    }

    /// Legacy formData parameters become a urlencoded body.
    fn attach_form_data(&mut self, spec: &Specification, endpoint: &Endpoint, plan: &mut RequestPlan) {
        let mut fields = Map::new();
        for param in endpoint.parameters_in(ParameterLocation::FormData) {
            let value = self.parameter_value(spec, &param.name, param.schema.as_ref(), &endpoint.path);
            fields.insert(param.name.clone(), value);
        }
        if !fields.is_empty() {
            plan.body = Some(Value::Object(fields));
            plan.set_content_type(FORM_URLENCODED);
        }
    }

    fn attach_request_body(&mut self, spec: &Specification, endpoint: &Endpoint, plan: &mut RequestPlan) {
        let Some(request_body) = &endpoint.request_body else {
            return;
        };
        let Some(media) = BODY_MEDIA_TYPES
            .iter()
            .find_map(|media_type| request_body.media(media_type))
        else {
            return;
        };

        plan.set_content_type(&media.media_type);
        plan.body = match &media.schema {
            Some(schema) => Some(self.request_body(spec, schema, &endpoint.path)),
            None => None,
        };
    }

    fn attach_body_parameter(&mut self, spec: &Specification, endpoint: &Endpoint, plan: &mut RequestPlan) {
        let Some(schema) = endpoint
            .parameters_in(ParameterLocation::Body)
            .find_map(|param| param.schema.as_ref())
        else {
            return;
        };
        plan.set_content_type(JSON);
        plan.body = Some(self.request_body(spec, schema, &endpoint.path));
    }
}
