use crate::clients::actor_client::ActorClient;
use crate::framework::{FrameworkError, ResourceClient};
use crate::model::{Order, OrderFilter, OrderId, OrderMutation, OrderSort, OrderStatus, SortField};
use crate::order_actor::OrderError;
use async_trait::async_trait;
use tracing::{debug, instrument, warn};

/// Client for the order store.
#[derive(Clone)]
pub struct OrderClient {
    inner: ResourceClient<Order>,
}

impl OrderClient {
    pub fn new(inner: ResourceClient<Order>) -> Self {
        Self { inner }
    }

    /// Persists `order` unless its id is already taken.
    ///
    /// Returns `Ok(false)` for a taken id so the caller can try the next
    /// candidate; every other failure is a [`OrderError::Persistence`].
    #[instrument(skip(self, order), fields(order_id = %order.order_id))]
    pub async fn insert_if_absent(&self, order: Order) -> Result<bool, OrderError> {
        debug!(?order, "insert_if_absent called");
        match self.inner.insert_if_absent(order).await {
            Ok(()) => Ok(true),
            Err(FrameworkError::AlreadyExists(_)) => Ok(false),
            Err(e) => Err(Self::map_error(e)),
        }
    }

    /// Applies `mutation` only if the order is still in `expected`.
    ///
    /// A status that moved underneath the caller is reported as
    /// [`OrderError::InvalidTransition`] from the status actually stored.
    #[instrument(skip(self, mutation))]
    pub async fn transition(
        &self,
        id: OrderId,
        expected: OrderStatus,
        mutation: OrderMutation,
    ) -> Result<Order, OrderError> {
        let to = mutation.target();
        match self.inner.conditional_update(id.clone(), expected, mutation).await {
            Ok(order) => Ok(order),
            Err(FrameworkError::StateMismatch { actual, .. }) => Err(OrderError::InvalidTransition {
                from: actual.parse().unwrap_or(expected),
                to,
            }),
            Err(FrameworkError::NotFound(_)) => Err(OrderError::NotFound(id.to_string())),
            Err(e) => Err(Self::map_error(e)),
        }
    }

    /// Highest id sequence stored within `year`, or across all years when
    /// `year` is `None`. Zero for an empty scope.
    #[instrument(skip(self))]
    pub async fn highest_sequence(&self, year: Option<i32>) -> Result<u64, OrderError> {
        let filter = OrderFilter {
            year,
            ..Default::default()
        };
        let sort = OrderSort {
            field: SortField::Sequence,
            descending: true,
        };
        let page = self.list(filter, sort, 1, 0).await?;
        Ok(page
            .items
            .first()
            .and_then(|order| order.order_id.sequence())
            .unwrap_or(0))
    }
}

#[async_trait]
impl ActorClient<Order> for OrderClient {
    type Error = OrderError;

    fn inner(&self) -> &ResourceClient<Order> {
        &self.inner
    }

    fn map_error(e: FrameworkError) -> Self::Error {
        warn!(error = %e, "Order store call failed");
        OrderError::Persistence(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::mock::MockClient;
    use crate::framework::Page;
    use crate::model::order::tests::sample_order;
    use chrono::Utc;

    #[tokio::test]
    async fn test_taken_id_is_not_an_error() {
        let mut mock = MockClient::<Order>::new();
        mock.expect_insert()
            .return_err(FrameworkError::AlreadyExists("ORD-2026-000001".into()));
        mock.expect_insert().return_ok(());

        let client = OrderClient::new(mock.client());
        assert!(!client.insert_if_absent(sample_order(OrderId::new(2026, 1))).await.unwrap());
        assert!(client.insert_if_absent(sample_order(OrderId::new(2026, 2))).await.unwrap());
        mock.verify();
    }

    #[tokio::test]
    async fn test_state_mismatch_becomes_invalid_transition() {
        let id = OrderId::new(2026, 7);
        let mut mock = MockClient::<Order>::new();
        mock.expect_conditional_update(id.clone())
            .return_err(FrameworkError::StateMismatch {
                id: id.to_string(),
                actual: "Shipped".into(),
            });

        let client = OrderClient::new(mock.client());
        let result = client
            .transition(
                id,
                OrderStatus::Pending,
                OrderMutation::Ship {
                    tracking_number: "1Z".into(),
                    at: Utc::now(),
                },
            )
            .await;

        assert_eq!(
            result,
            Err(OrderError::InvalidTransition {
                from: OrderStatus::Shipped,
                to: OrderStatus::Shipped,
            })
        );
        mock.verify();
    }

    #[tokio::test]
    async fn test_highest_sequence() {
        let mut mock = MockClient::<Order>::new();
        mock.expect_list().return_ok(Page {
            items: vec![sample_order(OrderId::new(2026, 88))],
            total: 88,
        });
        mock.expect_list().return_ok(Page {
            items: vec![],
            total: 0,
        });

        let client = OrderClient::new(mock.client());
        assert_eq!(client.highest_sequence(Some(2026)).await, Ok(88));
        assert_eq!(client.highest_sequence(Some(2027)).await, Ok(0));
        mock.verify();
    }

    #[tokio::test]
    async fn test_transport_failure_is_persistence_error() {
        let id = OrderId::new(2026, 3);
        let mut mock = MockClient::<Order>::new();
        mock.expect_get(id.clone()).return_err(FrameworkError::TimedOut);

        let client = OrderClient::new(mock.client());
        let result = client.get(id).await;
        assert_eq!(result.unwrap_err().code(), "PERSISTENCE_ERROR");
        mock.verify();
    }
}
