//! Recognises a buyer resubmitting an order they placed moments ago.
//!
//! Persisted orders are found with a recency query. Submissions that are
//! still being placed are tracked in memory: the first of several identical
//! concurrent submissions claims a [`SubmissionSlot`], the others wait for it
//! and report the order it placed. If the holder fails, a waiter takes over.

use crate::clients::{ActorClient, OrderClient};
use crate::config::DuplicateConfig;
use crate::model::{BuyerIdentity, Order, OrderFilter, OrderId, ValidatedOrderInput};
use crate::order_actor::OrderError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, instrument};

/// What an identical submission looks like: same buyer, product and cents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SubmissionKey {
    identity: BuyerIdentity,
    product: String,
    cents: i64,
}

impl SubmissionKey {
    fn new(input: &ValidatedOrderInput, identity: &BuyerIdentity) -> Self {
        Self {
            identity: identity.clone(),
            product: input.product.clone(),
            cents: (input.amount * 100.0).round() as i64,
        }
    }
}

type InFlight = Arc<Mutex<HashMap<SubmissionKey, watch::Receiver<Option<OrderId>>>>>;

fn lock(in_flight: &InFlight) -> MutexGuard<'_, HashMap<SubmissionKey, watch::Receiver<Option<OrderId>>>> {
    // A panic while holding the lock cannot leave the map inconsistent
    in_flight.lock().unwrap_or_else(|e| e.into_inner())
}

/// Result of [`DuplicateDetector::admit`].
pub enum Admission {
    /// An equivalent order exists, or a concurrent identical submission just
    /// placed it.
    Duplicate(OrderId),
    /// No equivalent order. The holder places it and reports the id through
    /// [`SubmissionSlot::complete`].
    Proceed(SubmissionSlot),
}

/// The right to place one submission. Dropping it without completing lets the
/// next waiting submission try instead.
pub struct SubmissionSlot {
    claim: Option<Claim>,
}

impl SubmissionSlot {
    fn unclaimed() -> Self {
        Self { claim: None }
    }

    /// Publishes the placed order to every waiting identical submission.
    pub fn complete(mut self, order_id: &OrderId) {
        if let Some(claim) = self.claim.take() {
            claim.sender.send_replace(Some(order_id.clone()));
        }
    }
}

struct Claim {
    key: SubmissionKey,
    sender: watch::Sender<Option<OrderId>>,
    in_flight: InFlight,
}

impl Drop for Claim {
    fn drop(&mut self) {
        lock(&self.in_flight).remove(&self.key);
    }
}

/// Waits for the holder of a claim. `None` when it gave up without placing.
async fn settle(mut holder: watch::Receiver<Option<OrderId>>) -> Option<OrderId> {
    loop {
        if let Some(order_id) = holder.borrow_and_update().clone() {
            return Some(order_id);
        }
        if holder.changed().await.is_err() {
            return holder.borrow().clone();
        }
    }
}

#[derive(Clone)]
pub struct DuplicateDetector {
    client: OrderClient,
    config: DuplicateConfig,
    in_flight: InFlight,
}

impl DuplicateDetector {
    pub fn new(client: OrderClient, config: DuplicateConfig) -> Self {
        Self {
            client,
            config,
            in_flight: InFlight::default(),
        }
    }

    /// Decides whether `input` may be placed.
    ///
    /// Waits while an identical submission is being placed, then reports its
    /// order. Otherwise claims the submission and checks the store for a
    /// recent equivalent. A zero window turns detection off.
    #[instrument(skip(self, input, identity), fields(product = %input.product))]
    pub async fn admit(
        &self,
        input: &ValidatedOrderInput,
        identity: &BuyerIdentity,
        now: DateTime<Utc>,
    ) -> Result<Admission, OrderError> {
        if self.config.window_secs == 0 {
            return Ok(Admission::Proceed(SubmissionSlot::unclaimed()));
        }

        let key = SubmissionKey::new(input, identity);
        let claim = loop {
            let holder = {
                let mut in_flight = lock(&self.in_flight);
                let existing = in_flight.get(&key).cloned();
                match existing {
                    Some(holder) => holder,
                    None => {
                        let (sender, receiver) = watch::channel(None);
                        in_flight.insert(key.clone(), receiver);
                        break Claim {
                            key,
                            sender,
                            in_flight: self.in_flight.clone(),
                        };
                    }
                }
            };

            debug!("Identical submission in flight, waiting for it");
            if let Some(order_id) = settle(holder).await {
                return Ok(Admission::Duplicate(order_id));
            }
        };

        if let Some(existing) = self.find(input, identity, now).await? {
            return Ok(Admission::Duplicate(existing.order_id));
        }
        Ok(Admission::Proceed(SubmissionSlot { claim: Some(claim) }))
    }

    /// The most recent order from the same buyer for the same product and
    /// amount, created within the window ending at `now`.
    #[instrument(skip(self, input), fields(product = %input.product))]
    pub async fn find(
        &self,
        input: &ValidatedOrderInput,
        identity: &BuyerIdentity,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, OrderError> {
        let window = chrono::Duration::from_std(self.config.window())
            .unwrap_or_else(|_| chrono::Duration::zero());
        let filter = OrderFilter {
            product: Some(input.product.clone()),
            buyer: Some(identity.clone()),
            ..Default::default()
        };

        let recent = self.client.query_recent(filter, now - window).await?;
        Ok(recent
            .into_iter()
            .find(|order| self.same_amount(order.amount, input.amount)))
    }

    fn same_amount(&self, a: f64, b: f64) -> bool {
        // Whole cents on both sides
        let diff = ((a - b) * 100.0).round().abs();
        diff <= (self.config.amount_tolerance * 100.0).round()
    }
}
