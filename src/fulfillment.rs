//! # Order Lifecycle
//!
//! [`OrderManager`] owns the write path: placing an order and moving it
//! through `pending → shipped → delivered`, or to `cancelled`.
//!
//! ## Creating an order
//!
//! 1. The product must be in the catalog.
//! 2. A matching order from the same buyer inside the duplicate window, or an
//!    identical submission placed concurrently, is returned as
//!    `DUPLICATE_ORDER` instead of placing a second one.
//! 3. The shipment is priced from the order's coordinates.
//! 4. Candidate IDs are confirmed one at a time with an insert-if-absent. A
//!    taken candidate means the generator is behind the store; it is moved
//!    past the highest stored sequence before the next try. The reservation
//!    budget bounds the loop.
//!
//! ## Transitions
//!
//! Each transition reads the order, checks the transition table, and writes
//! conditionally on the status it read. If another request moved the order in
//! between, the write is refused and the caller gets `INVALID_TRANSITION`.

use crate::access;
use crate::catalog::ProductCatalog;
use crate::clients::{ActorClient, OrderClient};
use crate::duplicate::{Admission, DuplicateDetector};
use crate::model::{
    Actor, BuyerIdentity, Caller, Order, OrderId, OrderMutation, ValidatedOrderInput,
};
use crate::order_actor::OrderError;
use crate::order_id::OrderIdGenerator;
use crate::pricing::GeoPricer;
use chrono::{Datelike, Utc};
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct OrderManager {
    client: OrderClient,
    catalog: Arc<dyn ProductCatalog>,
    duplicates: DuplicateDetector,
    pricer: GeoPricer,
    ids: OrderIdGenerator,
    reservation_attempts: u32,
}

impl OrderManager {
    pub fn new(
        client: OrderClient,
        catalog: Arc<dyn ProductCatalog>,
        duplicates: DuplicateDetector,
        pricer: GeoPricer,
        ids: OrderIdGenerator,
        reservation_attempts: u32,
    ) -> Self {
        Self {
            client,
            catalog,
            duplicates,
            pricer,
            ids,
            reservation_attempts,
        }
    }

    /// Places a new pending order.
    #[instrument(skip(self, input, caller), fields(product = %input.product))]
    pub async fn create(
        &self,
        input: ValidatedOrderInput,
        caller: &Caller,
    ) -> Result<Order, OrderError> {
        if !self.catalog.contains(&input.product) {
            info!("Rejected order for unknown product");
            return Err(OrderError::UnknownProduct(input.product));
        }

        let identity = BuyerIdentity::resolve(&input);
        let now = Utc::now();
        let slot = match self.duplicates.admit(&input, &identity, now).await? {
            Admission::Duplicate(existing) => {
                info!(order_id = %existing, "Duplicate order submission");
                return Err(OrderError::Duplicate { existing });
            }
            Admission::Proceed(slot) => slot,
        };

        let quote = self.pricer.price(input.location.as_ref());
        let placed_by = match &caller.actor {
            Actor::Customer { subject } => Some(subject.clone()),
            Actor::Admin { .. } | Actor::Anonymous => None,
        };

        let year = now.year();
        for _ in 0..self.reservation_attempts {
            let order_id = self.ids.next(year);
            let order = Order::new(
                order_id.clone(),
                &input,
                &quote,
                identity.clone(),
                placed_by.clone(),
                now,
            );
            if self.client.insert_if_absent(order.clone()).await? {
                info!(%order_id, cost = quote.cost, tier = ?quote.tier, "Order created");
                slot.complete(&order_id);
                return Ok(order);
            }

            let stored = self.client.highest_sequence(self.ids.scope_year(year)).await?;
            self.ids.advance_past(year, stored);
            info!(
                %order_id,
                stored,
                resume_after = self.ids.current(year),
                "Order id taken, generator moved past the store"
            );
        }

        warn!(attempts = self.reservation_attempts, "No free order id");
        Err(OrderError::Persistence(format!(
            "no free order id after {} attempts",
            self.reservation_attempts
        )))
    }

    #[instrument(skip(self, caller))]
    pub async fn mark_shipped(
        &self,
        order_id: &OrderId,
        tracking_number: &str,
        caller: &Caller,
    ) -> Result<Order, OrderError> {
        access::require_admin(caller)?;
        let tracking_number = tracking_number.trim();
        if tracking_number.is_empty() {
            return Err(OrderError::InvalidTracking);
        }
        let current = self.load(order_id).await?;
        self.advance(
            current,
            OrderMutation::Ship {
                tracking_number: tracking_number.to_string(),
                at: Utc::now(),
            },
        )
        .await
    }

    #[instrument(skip(self, caller))]
    pub async fn mark_delivered(
        &self,
        order_id: &OrderId,
        caller: &Caller,
    ) -> Result<Order, OrderError> {
        access::require_admin(caller)?;
        let current = self.load(order_id).await?;
        self.advance(current, OrderMutation::Deliver { at: Utc::now() })
            .await
    }

    /// Cancels a pending or shipped order. Admins and the order's buyer only.
    #[instrument(skip(self, caller))]
    pub async fn cancel(&self, order_id: &OrderId, caller: &Caller) -> Result<Order, OrderError> {
        access::require_identified(caller)?;
        let current = self.load(order_id).await?;
        access::require_buyer_or_admin(caller, &current)?;
        self.advance(current, OrderMutation::Cancel { at: Utc::now() })
            .await
    }

    #[instrument(skip(self, caller))]
    pub async fn get(&self, order_id: &OrderId, caller: &Caller) -> Result<Order, OrderError> {
        access::require_identified(caller)?;
        let order = self.load(order_id).await?;
        access::require_buyer_or_admin(caller, &order)?;
        Ok(order)
    }

    async fn load(&self, order_id: &OrderId) -> Result<Order, OrderError> {
        self.client
            .get(order_id.clone())
            .await?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))
    }

    async fn advance(&self, current: Order, mutation: OrderMutation) -> Result<Order, OrderError> {
        let from = current.status;
        let to = mutation.target();
        if from.is_terminal() {
            info!(order_id = %current.order_id, %from, %to, "Order is closed");
            return Err(OrderError::InvalidTransition { from, to });
        }
        if !from.can_transition_to(to) {
            info!(order_id = %current.order_id, %from, %to, "Transition not allowed");
            return Err(OrderError::InvalidTransition { from, to });
        }

        match self
            .client
            .transition(current.order_id.clone(), from, mutation)
            .await
        {
            Ok(order) => {
                info!(order_id = %order.order_id, %from, %to, "Order transitioned");
                Ok(order)
            }
            Err(e @ OrderError::InvalidTransition { .. }) => {
                info!(order_id = %current.order_id, error = %e, "Lost transition race");
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ConfiguredCatalog;
    use crate::config::PipelineConfig;
    use crate::framework::mock::MockClient;
    use crate::framework::{FrameworkError, Page};
    use crate::model::order::tests::sample_order;
    use crate::model::{OrderStatus, ShippingTier};
    use crate::validation::validate;
    use serde_json::json;

    fn manager(mock: &MockClient<Order>) -> OrderManager {
        let config = PipelineConfig::default();
        let client = OrderClient::new(mock.client());
        OrderManager::new(
            client.clone(),
            Arc::new(ConfiguredCatalog::from(&config.catalog)),
            DuplicateDetector::new(client, config.duplicates),
            GeoPricer::new(config.warehouse, config.pricing),
            OrderIdGenerator::new(config.ids.reset),
            3,
        )
    }

    fn input(product: &str) -> ValidatedOrderInput {
        validate(
            &serde_json::from_value(json!({
                "product": product,
                "amount": 25,
                "name": "Jane Roe",
                "shippingAddress": "77 Harbor Road, Boston"
            }))
            .unwrap(),
        )
        .unwrap()
    }

    fn page(orders: Vec<Order>) -> Page<Order> {
        let total = orders.len();
        Page {
            items: orders,
            total,
        }
    }

    #[tokio::test]
    async fn test_create_moves_past_stored_ids() {
        let year = Utc::now().year();
        let mut mock = MockClient::<Order>::new();
        mock.expect_query_recent().return_ok(vec![]);
        mock.expect_insert()
            .return_err(FrameworkError::AlreadyExists("ORD-x-000001".into()));
        mock.expect_list()
            .return_ok(page(vec![sample_order(OrderId::new(year, 40))]));
        mock.expect_insert().return_ok(());

        let order = manager(&mock)
            .create(input("shoes"), &Caller::customer("cust-9"))
            .await
            .unwrap();

        assert_eq!(order.order_id, OrderId::new(year, 41));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.shipping_tier, ShippingTier::Flat);
        assert_eq!(order.shipping_cost, 7.99);
        assert_eq!(order.placed_by.as_deref(), Some("cust-9"));
        mock.verify();
    }

    #[tokio::test]
    async fn test_create_gives_up_after_attempts() {
        let mut mock = MockClient::<Order>::new();
        mock.expect_query_recent().return_ok(vec![]);
        for _ in 0..3 {
            mock.expect_insert()
                .return_err(FrameworkError::AlreadyExists("taken".into()));
            mock.expect_list().return_ok(page(vec![]));
        }

        let result = manager(&mock).create(input("shoes"), &Caller::anonymous()).await;
        assert_eq!(result.unwrap_err().code(), "PERSISTENCE_ERROR");
        mock.verify();
    }

    #[tokio::test]
    async fn test_create_store_failure_is_not_retried() {
        let mut mock = MockClient::<Order>::new();
        mock.expect_query_recent().return_ok(vec![]);
        mock.expect_insert()
            .return_err(FrameworkError::Unavailable("disk full".into()));

        let result = manager(&mock).create(input("shoes"), &Caller::anonymous()).await;
        assert!(matches!(result, Err(OrderError::Persistence(_))));
        mock.verify();
    }

    #[tokio::test]
    async fn test_unknown_product_never_reaches_store() {
        let mock = MockClient::<Order>::new();
        let result = manager(&mock).create(input("rock"), &Caller::anonymous()).await;
        assert_eq!(result, Err(OrderError::UnknownProduct("rock".into())));
        mock.verify();
    }

    #[tokio::test]
    async fn test_ship_requires_admin_before_lookup() {
        let mock = MockClient::<Order>::new();
        let manager = manager(&mock);
        let id = OrderId::new(2026, 1);

        let anonymous = manager.mark_shipped(&id, "1Z", &Caller::anonymous()).await;
        assert_eq!(anonymous, Err(OrderError::Unauthorized));

        let customer = manager
            .mark_shipped(&id, "1Z", &Caller::customer("john@example.com"))
            .await;
        assert_eq!(customer, Err(OrderError::Forbidden));
        mock.verify();
    }

    #[tokio::test]
    async fn test_ship_requires_tracking_number() {
        let mock = MockClient::<Order>::new();
        let result = manager(&mock)
            .mark_shipped(&OrderId::new(2026, 1), "   ", &Caller::admin("ops"))
            .await;
        assert_eq!(result, Err(OrderError::InvalidTracking));
    }

    #[tokio::test]
    async fn test_lost_race_reports_invalid_transition() {
        let id = OrderId::new(2026, 5);
        let mut mock = MockClient::<Order>::new();
        mock.expect_get(id.clone())
            .return_ok(Some(sample_order(id.clone())));
        mock.expect_conditional_update(id.clone())
            .return_err(FrameworkError::StateMismatch {
                id: id.to_string(),
                actual: "Cancelled".into(),
            });

        let result = manager(&mock)
            .mark_shipped(&id, "1Z999", &Caller::admin("ops"))
            .await;
        assert_eq!(
            result,
            Err(OrderError::InvalidTransition {
                from: OrderStatus::Cancelled,
                to: OrderStatus::Shipped,
            })
        );
        mock.verify();
    }

    #[tokio::test]
    async fn test_deliver_from_pending_is_rejected_without_write() {
        let id = OrderId::new(2026, 6);
        let mut mock = MockClient::<Order>::new();
        mock.expect_get(id.clone())
            .return_ok(Some(sample_order(id.clone())));

        let result = manager(&mock).mark_delivered(&id, &Caller::admin("ops")).await;
        assert_eq!(
            result,
            Err(OrderError::InvalidTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Delivered,
            })
        );
        mock.verify();
    }

    #[tokio::test]
    async fn test_closed_order_is_rejected_without_write() {
        let id = OrderId::new(2026, 9);
        let mut delivered = sample_order(id.clone());
        delivered.status = OrderStatus::Delivered;
        let mut mock = MockClient::<Order>::new();
        mock.expect_get(id.clone()).return_ok(Some(delivered));

        let result = manager(&mock).cancel(&id, &Caller::admin("ops")).await;
        assert_eq!(
            result,
            Err(OrderError::InvalidTransition {
                from: OrderStatus::Delivered,
                to: OrderStatus::Cancelled,
            })
        );
        mock.verify();
    }

    #[tokio::test]
    async fn test_missing_order_is_not_found() {
        let id = OrderId::new(2026, 8);
        let mut mock = MockClient::<Order>::new();
        mock.expect_get(id.clone()).return_ok(None);

        let result = manager(&mock).cancel(&id, &Caller::admin("ops")).await;
        assert_eq!(result, Err(OrderError::NotFound(id.to_string())));
        mock.verify();
    }

    #[tokio::test]
    async fn test_foreign_customer_cannot_read_order() {
        let id = OrderId::new(2026, 2);
        let mut mock = MockClient::<Order>::new();
        mock.expect_get(id.clone())
            .return_ok(Some(sample_order(id.clone())));

        let result = manager(&mock)
            .get(&id, &Caller::customer("jane@example.com"))
            .await;
        assert_eq!(result, Err(OrderError::Forbidden));
        mock.verify();
    }
}
