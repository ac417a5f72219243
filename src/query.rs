//! Admin order listing: pagination, sorting and filtering.

use crate::access;
use crate::clients::{ActorClient, OrderClient};
use crate::config::ListingConfig;
use crate::model::{Caller, Order, OrderFilter, OrderSort, OrderStatus, SortField};
use crate::order_actor::OrderError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

/// List parameters as received from the caller.
///
/// `limit` and `offset` stay untyped: out-of-range or non-numeric values fall
/// back to defaults rather than failing the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListParams {
    pub limit: Option<Value>,
    pub offset: Option<Value>,
    pub sort: Option<String>,
    pub status: Option<String>,
    pub product: Option<String>,
}

impl ListParams {
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit.into());
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset.into());
        self
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }
}

/// One page of orders.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPage {
    pub items: Vec<Order>,
    /// Orders on this page.
    pub count: usize,
    /// Orders matching the filters across all pages.
    pub total: usize,
}

/// A fully resolved list request.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub filter: OrderFilter,
    pub sort: OrderSort,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Clone)]
pub struct QueryEngine {
    client: OrderClient,
    config: ListingConfig,
}

impl QueryEngine {
    pub fn new(client: OrderClient, config: ListingConfig) -> Self {
        Self { client, config }
    }

    /// Lists orders. Admin only.
    #[instrument(skip(self, caller))]
    pub async fn list(&self, params: &ListParams, caller: &Caller) -> Result<OrderPage, OrderError> {
        access::require_admin(caller)?;
        let query = self.resolve(params)?;
        debug!(?query, "Resolved list query");

        let page = self
            .client
            .list(query.filter, query.sort, query.limit, query.offset)
            .await?;
        Ok(OrderPage {
            count: page.items.len(),
            total: page.total,
            items: page.items,
        })
    }

    /// Applies defaults and limits, and rejects unknown sort fields or statuses.
    pub fn resolve(&self, params: &ListParams) -> Result<ListQuery, OrderError> {
        let max = self.config.max_limit;
        let limit = match params.limit.as_ref().and_then(as_integer) {
            Some(n) if n > 0 => usize::try_from(n).unwrap_or(max).min(max),
            _ => self.config.default_limit.min(max),
        };
        let offset = match params.offset.as_ref().and_then(as_integer) {
            Some(n) if n > 0 => usize::try_from(n).unwrap_or(usize::MAX),
            _ => 0,
        };

        let sort = match params.sort.as_deref().map(str::trim) {
            None | Some("") => OrderSort::default(),
            Some(raw) => parse_sort(raw)?,
        };

        let status = match params.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<OrderStatus>()
                    .map_err(|e| OrderError::InvalidFilter(e.to_string()))?,
            ),
        };
        let product = params
            .product
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from);

        Ok(ListQuery {
            filter: OrderFilter {
                status,
                product,
                ..Default::default()
            },
            sort,
            limit,
            offset,
        })
    }
}

/// `field` ascending, `-field` descending.
fn parse_sort(raw: &str) -> Result<OrderSort, OrderError> {
    let (name, descending) = match raw.strip_prefix('-') {
        Some(name) => (name, true),
        None => (raw, false),
    };
    let field = SortField::parse(name).ok_or_else(|| OrderError::InvalidSort(raw.to_string()))?;
    Ok(OrderSort { field, descending })
}

fn as_integer(value: &Value) -> Option<i64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then(|| n.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::mock::MockClient;
    use crate::framework::Page;
    use crate::model::order::tests::sample_order;
    use crate::model::OrderId;
    use serde_json::json;

    fn engine(mock: &MockClient<Order>) -> QueryEngine {
        QueryEngine::new(OrderClient::new(mock.client()), ListingConfig::default())
    }

    #[tokio::test]
    async fn test_limit_and_offset_defaults() {
        let mock = MockClient::<Order>::new();
        let engine = engine(&mock);

        let query = engine.resolve(&ListParams::default()).unwrap();
        assert_eq!((query.limit, query.offset), (50, 0));
        assert_eq!(query.sort, OrderSort::default());

        let query = engine.resolve(&ListParams::default().limit(1000).offset(-4)).unwrap();
        assert_eq!((query.limit, query.offset), (200, 0));

        let query = engine.resolve(&ListParams::default().limit(0)).unwrap();
        assert_eq!(query.limit, 50);

        let params = ListParams {
            limit: Some(json!("ten")),
            offset: Some(json!("20")),
            ..Default::default()
        };
        let query = engine.resolve(&params).unwrap();
        assert_eq!((query.limit, query.offset), (50, 20));
    }

    #[tokio::test]
    async fn test_sort_parsing() {
        let mock = MockClient::<Order>::new();
        let engine = engine(&mock);

        let query = engine.resolve(&ListParams::default().sort("-amount")).unwrap();
        assert_eq!(
            query.sort,
            OrderSort {
                field: SortField::Amount,
                descending: true
            }
        );

        let query = engine.resolve(&ListParams::default().sort("buyerName")).unwrap();
        assert!(!query.sort.descending);

        let err = engine.resolve(&ListParams::default().sort("colour")).unwrap_err();
        assert_eq!(err.code(), "INVALID_SORT");
    }

    #[tokio::test]
    async fn test_filters() {
        let mock = MockClient::<Order>::new();
        let engine = engine(&mock);

        let query = engine
            .resolve(&ListParams::default().status("Shipped").product(" bag "))
            .unwrap();
        assert_eq!(query.filter.status, Some(OrderStatus::Shipped));
        assert_eq!(query.filter.product.as_deref(), Some("bag"));

        let err = engine.resolve(&ListParams::default().status("lost")).unwrap_err();
        assert_eq!(err.code(), "INVALID_FILTER");
    }

    #[tokio::test]
    async fn test_list_requires_admin() {
        let mock = MockClient::<Order>::new();
        let engine = engine(&mock);

        let result = engine.list(&ListParams::default(), &Caller::anonymous()).await;
        assert_eq!(result, Err(OrderError::Unauthorized));

        let result = engine
            .list(&ListParams::default(), &Caller::customer("john@example.com"))
            .await;
        assert_eq!(result, Err(OrderError::Forbidden));
        mock.verify();
    }

    #[tokio::test]
    async fn test_list_shapes_page() {
        let mut mock = MockClient::<Order>::new();
        mock.expect_list().return_ok(Page {
            items: vec![
                sample_order(OrderId::new(2026, 1)),
                sample_order(OrderId::new(2026, 2)),
            ],
            total: 12,
        });

        let page = engine(&mock)
            .list(&ListParams::default().limit(2), &Caller::admin("ops"))
            .await
            .unwrap();
        assert_eq!((page.count, page.total), (2, 12));
        mock.verify();
    }
}
