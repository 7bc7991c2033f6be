use rand::{Rng, RngCore};
use serde_json::{Map, Value};

use crate::{
    spec::schema::{NumericSchema, ObjectSchema, Schema, SchemaResolver, StringSchema},
    synth::fake,
};

const DEFAULT_MINIMUM: f64 = 1.0;
const DEFAULT_MAXIMUM: f64 = 100.0;

/// Schema-typed value generation, used when no heuristic applies and for
/// nested body construction.
#[derive(Debug, Clone, Copy)]
pub struct SchemaGenerator<'a> {
    resolver: SchemaResolver<'a>,
    optional_probability: f64,
    max_depth: usize,
}

impl<'a> SchemaGenerator<'a> {
    pub fn new(resolver: SchemaResolver<'a>, optional_probability: f64, max_depth: usize) -> Self {
        Self {
            resolver,
            optional_probability: optional_probability.clamp(0.0, 1.0),
            max_depth,
        }
    }

    pub fn include_optional(&self, rng: &mut dyn RngCore) -> bool {
        rng.gen_bool(self.optional_probability)
    }

    /// Follow references until a concrete schema is reached. `None` when a
    /// reference is unresolved or the chain exceeds the depth bound.
    pub fn concrete(&self, schema: &Schema, depth: usize) -> Option<(Schema, usize)> {
        let mut current = schema.clone();
        let mut depth = depth;
        while let Schema::Reference(reference) = &current {
            if depth >= self.max_depth {
                return None;
            }
            current = self.resolver.resolve(reference)?;
            depth += 1;
        }
        Some((current, depth))
    }

    pub fn generate(&self, schema: &Schema, rng: &mut dyn RngCore) -> Value {
        self.generate_at(schema, rng, 0)
    }

    pub fn generate_at(&self, schema: &Schema, rng: &mut dyn RngCore, depth: usize) -> Value {
        if depth > self.max_depth {
            return Value::Null;
        }
        let Some((schema, depth)) = self.concrete(schema, depth) else {
            return Value::Null;
        };

        match &schema {
            Schema::String(string) => string_value(string, rng),
            Schema::Integer(numeric) => integer_value(numeric, rng),
            Schema::Number(numeric) => number_value(numeric, rng),
            Schema::Boolean => Value::Bool(rng.gen_bool(0.5)),
            Schema::Array { items: Some(items) } => {
                let len = rng.gen_range(1..=3usize);
                (0..len)
                    .map(|_| self.generate_at(items, rng, depth + 1))
                    .collect::<Vec<_>>()
                    .into()
            }
            Schema::Array { items: None } => Value::Array(Vec::new()),
            Schema::Object(object) => Value::Object(self.object_value(object, rng, depth)),
            Schema::Any { example } => example.clone().unwrap_or_else(|| fake::word(rng)),
            Schema::Reference(_) => Value::Null,
        }
    }

    fn object_value(&self, object: &ObjectSchema, rng: &mut dyn RngCore, depth: usize) -> Map<String, Value> {
        let mut fields = Map::new();
        for (name, property) in &object.properties {
            if object.is_required(name) || self.include_optional(rng) {
                fields.insert(name.clone(), self.generate_at(property, rng, depth + 1));
            }
        }
        fields
    }
}

fn string_value(schema: &StringSchema, rng: &mut dyn RngCore) -> Value {
    if !schema.enumeration.is_empty() {
        return fake::pick_value(rng, &schema.enumeration);
    }
    match schema.format.as_deref() {
        Some("email") => fake::email(rng),
        Some("date") => fake::date(rng),
        Some("date-time") => fake::date_time(rng),
        Some("uuid") => fake::uuid(rng),
        Some("uri") => fake::url(rng),
        Some(_) => fake::word(rng),
        None => schema.example.clone().unwrap_or_else(|| fake::word(rng)),
    }
}

fn bounds(schema: &NumericSchema) -> (f64, f64) {
    let minimum = schema.minimum.unwrap_or(DEFAULT_MINIMUM);
    let maximum = schema.maximum.unwrap_or(DEFAULT_MAXIMUM);
    if maximum < minimum {
        (minimum, minimum)
    } else {
        (minimum, maximum)
    }
}

fn integer_value(schema: &NumericSchema, rng: &mut dyn RngCore) -> Value {
    if !schema.enumeration.is_empty() {
        return fake::pick_value(rng, &schema.enumeration);
    }
    let (minimum, maximum) = bounds(schema);
    let low = minimum.ceil() as i64;
    let high = (maximum.floor() as i64).max(low);
    Value::from(rng.gen_range(low..=high))
}

fn number_value(schema: &NumericSchema, rng: &mut dyn RngCore) -> Value {
    if !schema.enumeration.is_empty() {
        return fake::pick_value(rng, &schema.enumeration);
    }
    let (minimum, maximum) = bounds(schema);
    let span = maximum - minimum;
    let raw = if span.is_finite() && span < f64::MAX / 2.0 {
        rng.gen_range(minimum..=maximum)
    } else {
        // bounds near the f64 limits: interpolate at half scale
        let t: f64 = rng.gen_range(0.0..=1.0);
        (minimum / 2.0 + t * (maximum / 2.0 - minimum / 2.0)) * 2.0
    };
    let rounded = (raw * 100.0).round() / 100.0;
    let value = if rounded.is_finite() { rounded } else { raw };
    Value::from(value.clamp(minimum, maximum))
}
