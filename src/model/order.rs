//! Represents a customer order and its fulfillment state.
//!
//! # Record Store
//! [`Order`] implements [`StoredRecord`](crate::framework::StoredRecord) (see
//! [`crate::order_actor::entity`]) so it can be kept by a
//! [`ResourceActor`](crate::framework::ResourceActor).

use crate::model::request::{Location, ValidatedOrderInput};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Type-safe identifier for Orders, formatted `ORD-<year>-<sequence>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Builds the identifier for `sequence` within `year`, zero-padded to six digits.
    pub fn new(year: i32, sequence: u64) -> Self {
        Self(format!("ORD-{year}-{sequence:06}"))
    }

    /// Parses an identifier received from a caller.
    ///
    /// Returns `None` unless the text is `ORD-`, a four-digit year, `-`, and at
    /// least six digits.
    pub fn parse(raw: &str) -> Option<Self> {
        let (year, sequence) = split_id(raw.trim())?;
        Some(Self::new(year, sequence))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn year(&self) -> Option<i32> {
        split_id(&self.0).map(|(year, _)| year)
    }

    pub fn sequence(&self) -> Option<u64> {
        split_id(&self.0).map(|(_, sequence)| sequence)
    }
}

fn split_id(raw: &str) -> Option<(i32, u64)> {
    let rest = raw.strip_prefix("ORD-")?;
    let (year, sequence) = rest.split_once('-')?;
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if year.len() != 4 || !digits(year) || sequence.len() < 6 || !digits(sequence) {
        return None;
    }
    Some((year.parse().ok()?, sequence.parse().ok()?))
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of an order.
///
/// ```text
/// pending ──► shipped ──► delivered
///    │           │
///    └──► cancelled ◄──┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// The transition table. Anything not listed here is illegal.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Shipped) | (Shipped, Delivered) | (Pending, Cancelled) | (Shipped, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Which pricing band produced the shipping cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingTier {
    Local,
    Regional,
    LongHaul,
    /// No coordinates were supplied; the configured default cost applies.
    Flat,
}

/// The identity used to recognise a repeated submission from the same buyer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuyerIdentity {
    Email { email: String },
    IdempotencyKey { key: String },
    NameAddress { name: String, address: String },
}

impl BuyerIdentity {
    /// Email if present, else the caller's idempotency key, else name and address.
    ///
    /// Values are case-folded and whitespace-collapsed so trivially different
    /// spellings of one buyer compare equal.
    pub fn resolve(input: &ValidatedOrderInput) -> Self {
        if let Some(email) = &input.buyer_email {
            return BuyerIdentity::Email {
                email: email.to_lowercase(),
            };
        }
        if let Some(key) = &input.idempotency_key {
            return BuyerIdentity::IdempotencyKey { key: key.clone() };
        }
        BuyerIdentity::NameAddress {
            name: fold(&input.buyer_name),
            address: fold(&input.shipping_address),
        }
    }
}

fn fold(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Result of pricing an order's shipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingQuote {
    pub cost: f64,
    pub tier: ShippingTier,
    /// Great-circle distance in the configured unit; absent without coordinates.
    pub distance: Option<f64>,
    pub estimated_delivery: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: OrderId,
    pub product: String,
    pub amount: f64,
    pub buyer_name: String,
    pub buyer_email: Option<String>,
    pub shipping_address: String,
    pub location: Option<Location>,
    pub status: OrderStatus,
    pub shipping_cost: f64,
    pub shipping_tier: ShippingTier,
    pub distance: Option<f64>,
    pub estimated_delivery: String,
    pub buyer_identity: BuyerIdentity,
    /// Subject of the customer credential that placed the order.
    pub placed_by: Option<String>,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    /// The client's own timestamp. Informational; `created_at` is authoritative.
    pub client_timestamp: Option<DateTime<Utc>>,
}

impl Order {
    /// Creates a new pending Order.
    pub fn new(
        order_id: OrderId,
        input: &ValidatedOrderInput,
        quote: &ShippingQuote,
        buyer_identity: BuyerIdentity,
        placed_by: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            product: input.product.clone(),
            amount: input.amount,
            buyer_name: input.buyer_name.clone(),
            buyer_email: input.buyer_email.clone(),
            shipping_address: input.shipping_address.clone(),
            location: input.location.clone(),
            status: OrderStatus::Pending,
            shipping_cost: quote.cost,
            shipping_tier: quote.tier,
            distance: quote.distance,
            estimated_delivery: quote.estimated_delivery.clone(),
            buyer_identity,
            placed_by,
            tracking_number: None,
            created_at: now,
            updated_at: now,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
            client_timestamp: input.client_timestamp,
        }
    }

    /// True when `subject` is the customer who placed the order or the buyer email.
    pub fn is_bought_by(&self, subject: &str) -> bool {
        self.placed_by.as_deref() == Some(subject)
            || self
                .buyer_email
                .as_deref()
                .is_some_and(|email| email.eq_ignore_ascii_case(subject))
    }
}

/// A status transition applied through a conditional write.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderMutation {
    Ship {
        tracking_number: String,
        at: DateTime<Utc>,
    },
    Deliver {
        at: DateTime<Utc>,
    },
    Cancel {
        at: DateTime<Utc>,
    },
}

impl OrderMutation {
    /// The status the order ends in once this mutation is applied.
    pub fn target(&self) -> OrderStatus {
        match self {
            OrderMutation::Ship { .. } => OrderStatus::Shipped,
            OrderMutation::Deliver { .. } => OrderStatus::Delivered,
            OrderMutation::Cancel { .. } => OrderStatus::Cancelled,
        }
    }
}

/// Match criteria for store scans. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub product: Option<String>,
    pub buyer: Option<BuyerIdentity>,
    /// Year segment of the order id.
    pub year: Option<i32>,
}

/// Fields an order listing can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    Amount,
    ShippingCost,
    OrderId,
    Status,
    Product,
    BuyerName,
    /// Numeric id sequence. Used to reconcile the id generator; not offered to
    /// listings.
    Sequence,
}

impl SortField {
    pub fn parse(name: &str) -> Option<Self> {
        let field = match name {
            "createdAt" | "created_at" => SortField::CreatedAt,
            "updatedAt" | "updated_at" => SortField::UpdatedAt,
            "amount" => SortField::Amount,
            "shippingCost" | "shipping_cost" => SortField::ShippingCost,
            "orderId" | "order_id" => SortField::OrderId,
            "status" => SortField::Status,
            "product" => SortField::Product,
            "buyerName" | "buyer_name" | "name" => SortField::BuyerName,
            _ => return None,
        };
        Some(field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSort {
    pub field: SortField,
    pub descending: bool,
}

impl Default for OrderSort {
    /// Newest first.
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            descending: true,
        }
    }
}
