//! Name and path driven value rules. Each table is scanned in order and the
//! first matching rule wins; add a rule by appending a row.

use rand::{Rng, RngCore};
use serde_json::{Value, json};

use crate::synth::fake;

pub type Predicate = fn(&HeuristicContext) -> bool;
pub type Generator = fn(&mut dyn RngCore) -> Value;

/// Lower-cased name of the parameter (or body field) and the endpoint path.
#[derive(Debug, Clone)]
pub struct HeuristicContext {
    name: String,
    path: String,
}

impl HeuristicContext {
    pub fn new(name: &str, path: &str) -> Self {
        Self {
            name: name.to_lowercase(),
            path: path.to_lowercase(),
        }
    }

    pub fn name_has(&self, needle: &str) -> bool {
        self.name.contains(needle)
    }

    pub fn path_has(&self, needle: &str) -> bool {
        self.path.contains(needle)
    }

    pub fn mentions(&self, needle: &str) -> bool {
        self.path_has(needle) || self.name_has(needle)
    }

    pub fn is_identifier(&self) -> bool {
        self.name_has("id") || self.name_has("key")
    }
}

pub struct HeuristicRule {
    pub label: &'static str,
    pub applies: Predicate,
    pub generate: Generator,
}

/// First matching rule's value, if any.
pub fn apply(
    rules: &[HeuristicRule],
    context: &HeuristicContext,
    rng: &mut dyn RngCore,
) -> Option<Value> {
    rules
        .iter()
        .find(|rule| (rule.applies)(context))
        .map(|rule| (rule.generate)(rng))
}

pub const PET_IDS: &[i64] = &[1, 2, 3, 4, 5, 10];
pub const ORDER_IDS: &[i64] = &[1, 2, 3, 4, 5];
pub const USER_IDS: &[&str] = &["user1", "user2", "testuser", "john"];
pub const USERNAMES: &[&str] = &["user1", "testuser", "john", "demo"];
pub const PET_STATUSES: &[&str] = &["available", "pending", "sold"];
pub const ORDER_STATUSES: &[&str] = &["placed", "approved", "delivered"];
pub const TAGS: &[&str] = &["tag1", "tag2", "friendly", "cute"];
pub const PET_NAMES: &[&str] = &["Buddy", "Max", "Bella", "Charlie", "Lucy"];
pub const PET_CATEGORIES: &[&str] = &["Dogs", "Cats", "Birds", "Fish"];

/// Rules for path, query, header and form parameters.
pub static PARAMETER_RULES: &[HeuristicRule] = &[
    HeuristicRule { label: "pet id", applies: pet_identifier, generate: pet_id },
    HeuristicRule { label: "user id", applies: user_identifier, generate: user_id },
    HeuristicRule { label: "order id", applies: order_identifier, generate: order_id },
    HeuristicRule { label: "id", applies: HeuristicContext::is_identifier, generate: small_id },
    HeuristicRule { label: "pet status", applies: pet_status_param, generate: pet_status },
    HeuristicRule { label: "order status", applies: order_status_param, generate: order_status },
    HeuristicRule { label: "tag", applies: tag_param, generate: tag },
    HeuristicRule { label: "username", applies: username_param, generate: username },
    HeuristicRule { label: "password", applies: password_param, generate: password },
];

/// Rules for request-body properties.
pub static BODY_FIELD_RULES: &[HeuristicRule] = &[
    HeuristicRule { label: "pet name", applies: pet_name_field, generate: pet_name },
    HeuristicRule { label: "pet status", applies: pet_status_field, generate: pet_status },
    HeuristicRule { label: "pet category", applies: pet_category_field, generate: pet_category },
    HeuristicRule { label: "user username", applies: user_username_field, generate: fake_username },
    HeuristicRule { label: "user email", applies: user_email_field, generate: fake::email },
    HeuristicRule { label: "user phone", applies: user_phone_field, generate: fake::phone },
    HeuristicRule { label: "order quantity", applies: order_quantity_field, generate: quantity },
    HeuristicRule { label: "id field", applies: id_field, generate: field_id },
];

fn pet_identifier(ctx: &HeuristicContext) -> bool {
    ctx.is_identifier() && ctx.mentions("pet")
}

fn user_identifier(ctx: &HeuristicContext) -> bool {
    ctx.is_identifier() && ctx.mentions("user")
}

fn order_identifier(ctx: &HeuristicContext) -> bool {
    ctx.is_identifier() && ctx.mentions("order")
}

fn pet_status_param(ctx: &HeuristicContext) -> bool {
    ctx.name_has("status") && ctx.path_has("pet")
}

fn order_status_param(ctx: &HeuristicContext) -> bool {
    ctx.name_has("status") && ctx.path_has("order")
}

fn tag_param(ctx: &HeuristicContext) -> bool {
    ctx.name_has("tag")
}

fn username_param(ctx: &HeuristicContext) -> bool {
    ctx.name_has("username") || ctx.name_has("user")
}

fn password_param(ctx: &HeuristicContext) -> bool {
    ctx.name_has("password")
}

fn pet_name_field(ctx: &HeuristicContext) -> bool {
    ctx.path_has("pet") && ctx.name_has("name")
}

fn pet_status_field(ctx: &HeuristicContext) -> bool {
    ctx.path_has("pet") && ctx.name_has("status")
}

fn pet_category_field(ctx: &HeuristicContext) -> bool {
    ctx.path_has("pet") && ctx.name_has("category")
}

fn user_username_field(ctx: &HeuristicContext) -> bool {
    ctx.path_has("user") && ctx.name_has("username")
}

fn user_email_field(ctx: &HeuristicContext) -> bool {
    ctx.path_has("user") && ctx.name_has("email")
}

fn user_phone_field(ctx: &HeuristicContext) -> bool {
    ctx.path_has("user") && ctx.name_has("phone")
}

fn order_quantity_field(ctx: &HeuristicContext) -> bool {
    ctx.path_has("order") && ctx.name_has("quantity")
}

fn id_field(ctx: &HeuristicContext) -> bool {
    ctx.name_has("id")
}

fn pet_id(rng: &mut dyn RngCore) -> Value {
    fake::pick_int(rng, PET_IDS)
}

fn user_id(rng: &mut dyn RngCore) -> Value {
    fake::pick_str(rng, USER_IDS)
}

fn order_id(rng: &mut dyn RngCore) -> Value {
    fake::pick_int(rng, ORDER_IDS)
}

fn small_id(rng: &mut dyn RngCore) -> Value {
    Value::from(rng.gen_range(1..=10i64))
}

fn field_id(rng: &mut dyn RngCore) -> Value {
    Value::from(rng.gen_range(1..=100i64))
}

fn quantity(rng: &mut dyn RngCore) -> Value {
    Value::from(rng.gen_range(1..=5i64))
}

fn pet_status(rng: &mut dyn RngCore) -> Value {
    fake::pick_str(rng, PET_STATUSES)
}

fn order_status(rng: &mut dyn RngCore) -> Value {
    fake::pick_str(rng, ORDER_STATUSES)
}

fn tag(rng: &mut dyn RngCore) -> Value {
    fake::pick_str(rng, TAGS)
}

fn username(rng: &mut dyn RngCore) -> Value {
    fake::pick_str(rng, USERNAMES)
}

fn password(_rng: &mut dyn RngCore) -> Value {
    Value::from("password123")
}

fn pet_name(rng: &mut dyn RngCore) -> Value {
    fake::pick_str(rng, PET_NAMES)
}

fn pet_category(rng: &mut dyn RngCore) -> Value {
    let id = rng.gen_range(1..=5i64);
    json!({ "id": id, "name": fake::pick_str(rng, PET_CATEGORIES) })
}

fn fake_username(rng: &mut dyn RngCore) -> Value {
    Value::from(fake::username(rng).to_lowercase())
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn matched(rules: &[HeuristicRule], name: &str, path: &str) -> Option<&'static str> {
        let ctx = HeuristicContext::new(name, path);
        rules.iter().find(|rule| (rule.applies)(&ctx)).map(|rule| rule.label)
    }

    #[test]
    fn parameter_rules_follow_table_order() {
        assert_eq!(matched(PARAMETER_RULES, "petId", "/pet/{petId}"), Some("pet id"));
        assert_eq!(matched(PARAMETER_RULES, "orderId", "/store/order/{orderId}"), Some("order id"));
        assert_eq!(matched(PARAMETER_RULES, "api_key", "/pet/{petId}"), Some("pet id"));
        assert_eq!(matched(PARAMETER_RULES, "widgetId", "/widgets"), Some("id"));
        assert_eq!(matched(PARAMETER_RULES, "status", "/pet/findByStatus"), Some("pet status"));
        assert_eq!(matched(PARAMETER_RULES, "status", "/widgets"), None);
        assert_eq!(matched(PARAMETER_RULES, "tags", "/pet/findByTags"), Some("tag"));
        assert_eq!(matched(PARAMETER_RULES, "username", "/user/login"), Some("username"));
        assert_eq!(matched(PARAMETER_RULES, "password", "/user/login"), Some("password"));
        assert_eq!(matched(PARAMETER_RULES, "limit", "/widgets"), None);
    }

    #[test]
    fn body_rules_need_path_context() {
        assert_eq!(matched(BODY_FIELD_RULES, "name", "/pet"), Some("pet name"));
        assert_eq!(matched(BODY_FIELD_RULES, "name", "/store"), None);
        assert_eq!(matched(BODY_FIELD_RULES, "category", "/pet"), Some("pet category"));
        assert_eq!(matched(BODY_FIELD_RULES, "quantity", "/store/order"), Some("order quantity"));
        assert_eq!(matched(BODY_FIELD_RULES, "id", "/store/order"), Some("id field"));
    }

    #[test]
    fn pet_category_is_object() {
        let mut rng = StdRng::seed_from_u64(3);
        let value = pet_category(&mut rng);
        assert!((1..=5).contains(&value["id"].as_i64().unwrap()));
        assert!(PET_CATEGORIES.contains(&value["name"].as_str().unwrap()));
    }
}
