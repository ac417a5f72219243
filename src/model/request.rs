//! Inbound order payloads: the untyped request as received, and the normalized
//! input the rest of the pipeline accepts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An order request exactly as the transport decoded it.
///
/// Numeric fields are kept as raw JSON values so the validator can accept
/// numbers and numeric strings alike and report a precise error code. The
/// optional `email` and `location` stay raw too: a value of the wrong shape is
/// present, and must fail its own check rather than read as missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOrderRequest {
    pub product: Option<String>,
    pub amount: Option<Value>,
    #[serde(alias = "buyerName")]
    pub name: Option<String>,
    #[serde(alias = "buyerEmail")]
    pub email: Option<Value>,
    pub shipping_address: Option<String>,
    pub location: Option<Value>,
    pub timestamp: Option<String>,
    pub idempotency_key: Option<String>,
}

impl RawOrderRequest {
    /// Reads a request body, tolerating wrongly typed fields.
    ///
    /// A required text field of the wrong JSON type reads as absent, so it
    /// fails validation with its own code instead of rejecting the whole body.
    /// `amount`, `email` and `location` are carried as sent.
    pub fn from_json_lenient(body: &Value) -> Self {
        if let Ok(raw) = serde_json::from_value::<RawOrderRequest>(body.clone()) {
            return raw;
        }
        RawOrderRequest {
            product: text(body, &["product"]),
            amount: body.get("amount").cloned(),
            name: text(body, &["name", "buyerName"]),
            email: field(body, &["email", "buyerEmail"]).cloned(),
            shipping_address: text(body, &["shippingAddress"]),
            location: body.get("location").cloned(),
            timestamp: text(body, &["timestamp"]),
            idempotency_key: text(body, &["idempotencyKey"]),
        }
    }
}

fn field<'a>(body: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| body.get(*k))
}

/// First of `keys` present in `body`, if it holds a string.
fn text(body: &Value, keys: &[&str]) -> Option<String> {
    field(body, keys).and_then(Value::as_str).map(String::from)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawLocation {
    pub lat: Option<Value>,
    pub lng: Option<Value>,
    pub accuracy: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    /// Reported accuracy radius in meters.
    pub accuracy: Option<f64>,
}

/// Order input that passed validation.
///
/// Only [`crate::validation::validate`] builds this type outside the crate
/// (`#[non_exhaustive]` forbids struct literals elsewhere).
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct ValidatedOrderInput {
    pub product: String,
    /// Rounded to cents.
    pub amount: f64,
    pub buyer_name: String,
    pub buyer_email: Option<String>,
    pub shipping_address: String,
    pub location: Option<Location>,
    pub client_timestamp: Option<DateTime<Utc>>,
    pub idempotency_key: Option<String>,
}

impl ValidatedOrderInput {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        product: String,
        amount: f64,
        buyer_name: String,
        buyer_email: Option<String>,
        shipping_address: String,
        location: Option<Location>,
        client_timestamp: Option<DateTime<Utc>>,
        idempotency_key: Option<String>,
    ) -> Self {
        Self {
            product,
            amount,
            buyer_name,
            buyer_email,
            shipping_address,
            location,
            client_timestamp,
            idempotency_key,
        }
    }
}
