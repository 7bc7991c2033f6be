//! Small placeholder-value generators. All draw from the caller's random
//! source so seeded runs stay reproducible.

use chrono::{Duration, SecondsFormat, Utc};
use rand::{Rng, RngCore, seq::SliceRandom};
use serde_json::Value;

const WORDS: &[&str] = &[
    "alias", "beatae", "consequatur", "dolor", "eius", "fugiat", "ipsum", "labore", "magnam",
    "nobis", "omnis", "porro", "quia", "rerum", "sed", "tempora", "ut", "velit", "voluptas",
];
const FIRST_NAMES: &[&str] = &[
    "alice", "bob", "carol", "dave", "erin", "frank", "grace", "heidi", "ivan", "judy",
];
const DOMAINS: &[&str] = &["example.com", "example.org", "example.net", "test.dev"];

pub fn pick_str(rng: &mut dyn RngCore, pool: &[&str]) -> Value {
    pool.choose(rng)
        .map(|item| Value::from(*item))
        .unwrap_or(Value::Null)
}

pub fn pick_int(rng: &mut dyn RngCore, pool: &[i64]) -> Value {
    pool.choose(rng).map(|item| Value::from(*item)).unwrap_or(Value::Null)
}

pub fn pick_value(rng: &mut dyn RngCore, pool: &[Value]) -> Value {
    pool.choose(rng).cloned().unwrap_or(Value::Null)
}

pub fn word(rng: &mut dyn RngCore) -> Value {
    pick_str(rng, WORDS)
}

pub fn username(rng: &mut dyn RngCore) -> String {
    let name = FIRST_NAMES.choose(rng).copied().unwrap_or("user");
    format!("{}{}", name, rng.gen_range(1..=999u32))
}

pub fn email(rng: &mut dyn RngCore) -> Value {
    let domain = DOMAINS.choose(rng).copied().unwrap_or("example.com");
    Value::from(format!("{}@{}", username(rng), domain))
}

pub fn url(rng: &mut dyn RngCore) -> Value {
    let domain = DOMAINS.choose(rng).copied().unwrap_or("example.com");
    Value::from(format!("https://{domain}/"))
}

pub fn phone(rng: &mut dyn RngCore) -> Value {
    Value::from(format!(
        "{:03}-{:03}-{:04}",
        rng.gen_range(200..=999u32),
        rng.gen_range(200..=999u32),
        rng.gen_range(0..=9999u32)
    ))
}

pub fn uuid(rng: &mut dyn RngCore) -> Value {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    Value::from(uuid::Builder::from_random_bytes(bytes).into_uuid().to_string())
}

fn past_instant(rng: &mut dyn RngCore) -> chrono::DateTime<Utc> {
    Utc::now() - Duration::seconds(rng.gen_range(1..=365 * 24 * 3600))
}

pub fn date(rng: &mut dyn RngCore) -> Value {
    Value::from(past_instant(rng).format("%Y-%m-%d").to_string())
}

pub fn date_time(rng: &mut dyn RngCore) -> Value {
    Value::from(past_instant(rng).to_rfc3339_opts(SecondsFormat::Millis, true))
}
