//! Shape, range and type checks for incoming order requests.
//!
//! [`validate`] is pure: no I/O, no clock. Checks run in a fixed order and stop
//! at the first failure, so a request with several problems always reports the
//! same code.

use crate::model::{Location, RawLocation, RawOrderRequest, ValidatedOrderInput};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// Minimum shipping address length after trimming.
pub const MIN_ADDRESS_LEN: usize = 10;

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\S+@[^\s@]+$").expect("Valid regex pattern"));

/// A request field failed validation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("Product is required")]
    MissingProduct,

    #[error("Amount must be a positive number")]
    InvalidAmount,

    #[error("Buyer name is required")]
    MissingName,

    #[error("Shipping address must be at least 10 characters")]
    InvalidAddress,

    #[error("Email address is malformed")]
    InvalidEmail,

    #[error("Invalid GPS coordinates: {0}")]
    InvalidGps(String),
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingProduct => "MISSING_PRODUCT",
            ValidationError::InvalidAmount => "INVALID_AMOUNT",
            ValidationError::MissingName => "MISSING_NAME",
            ValidationError::InvalidAddress => "INVALID_ADDRESS",
            ValidationError::InvalidEmail => "INVALID_EMAIL",
            ValidationError::InvalidGps(_) => "INVALID_GPS",
        }
    }
}

/// Validates and normalizes a raw order request.
pub fn validate(raw: &RawOrderRequest) -> Result<ValidatedOrderInput, ValidationError> {
    let product = non_empty(raw.product.as_deref()).ok_or(ValidationError::MissingProduct)?;
    let amount = validate_amount(raw.amount.as_ref())?;
    let buyer_name = non_empty(raw.name.as_deref()).ok_or(ValidationError::MissingName)?;

    let shipping_address = raw.shipping_address.as_deref().map(str::trim).unwrap_or("");
    if shipping_address.chars().count() < MIN_ADDRESS_LEN {
        return Err(ValidationError::InvalidAddress);
    }

    let buyer_email = validate_email(raw.email.as_ref())?;
    let location = validate_location(raw.location.as_ref())?;

    Ok(ValidatedOrderInput::new(
        product,
        amount,
        buyer_name,
        buyer_email,
        shipping_address.to_string(),
        location,
        parse_timestamp(raw.timestamp.as_deref()),
        non_empty(raw.idempotency_key.as_deref()),
    ))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Accepts a JSON number or a numeric string.
fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn validate_amount(raw: Option<&Value>) -> Result<f64, ValidationError> {
    let amount = raw.and_then(as_number).ok_or(ValidationError::InvalidAmount)?;
    // Scaling to cents overflows near f64::MAX
    let cents = (amount * 100.0).round() / 100.0;
    if !cents.is_finite() || cents <= 0.0 {
        return Err(ValidationError::InvalidAmount);
    }
    Ok(cents)
}

/// Null, absent and blank all mean "no email"; any other non-string is malformed.
fn validate_email(raw: Option<&Value>) -> Result<Option<String>, ValidationError> {
    let email = match raw {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) => non_empty(Some(s.as_str())),
        Some(_) => return Err(ValidationError::InvalidEmail),
    };
    match email {
        Some(email) if EMAIL_REGEX.is_match(&email) => Ok(Some(email)),
        Some(_) => Err(ValidationError::InvalidEmail),
        None => Ok(None),
    }
}

fn validate_location(raw: Option<&Value>) -> Result<Option<Location>, ValidationError> {
    let raw: RawLocation = match raw {
        None | Some(Value::Null) => return Ok(None),
        Some(value @ Value::Object(_)) => serde_json::from_value(value.clone())
            .map_err(|e| ValidationError::InvalidGps(e.to_string()))?,
        Some(_) => {
            return Err(ValidationError::InvalidGps(
                "location must be an object with lat and lng".into(),
            ))
        }
    };
    coordinates(&raw).map(Some)
}

fn coordinates(raw: &RawLocation) -> Result<Location, ValidationError> {
    let coordinate = |value: Option<&Value>, name: &str, bound: f64| -> Result<f64, ValidationError> {
        let value = value
            .and_then(as_number)
            .ok_or_else(|| ValidationError::InvalidGps(format!("{name} must be a number")))?;
        if !(-bound..=bound).contains(&value) {
            return Err(ValidationError::InvalidGps(format!(
                "{name} {value} outside [-{bound}, {bound}]"
            )));
        }
        Ok(value)
    };

    let lat = coordinate(raw.lat.as_ref(), "lat", 90.0)?;
    let lng = coordinate(raw.lng.as_ref(), "lng", 180.0)?;

    let accuracy = match raw.accuracy.as_ref() {
        None | Some(Value::Null) => None,
        Some(value) => match as_number(value) {
            Some(a) if a >= 0.0 => Some(a),
            _ => {
                return Err(ValidationError::InvalidGps(
                    "accuracy must be a non-negative number".into(),
                ))
            }
        },
    };

    Ok(Location { lat, lng, accuracy })
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            tracing::debug!(timestamp = raw, error = %e, "Dropping unparseable client timestamp");
            None
        }
    }
}
