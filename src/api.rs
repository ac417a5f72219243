//! JSON facade over the pipeline.
//!
//! Each method takes what a transport would hand over (a JSON body or
//! parameters, plus an optional bearer token) and returns an [`ApiResponse`]
//! carrying the HTTP status and the response envelope.

use crate::access::{self, AccessGuard};
use crate::fulfillment::OrderManager;
use crate::model::{Caller, Order, OrderId, RawOrderRequest};
use crate::order_actor::OrderError;
use crate::query::{ListParams, QueryEngine};
use crate::validation::validate;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn ok(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    fn error(error: &OrderError) -> Self {
        let status = error.http_status();
        let mut body = json!({
            "success": false,
            "error": error.to_string(),
            "code": error.code(),
            "status": status,
        });
        if let OrderError::Duplicate { existing } = error {
            body["order_id"] = json!(existing);
        }
        if status >= 500 {
            warn!(code = error.code(), %error, "Request failed");
        } else {
            info!(code = error.code(), %error, "Request rejected");
        }
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        self.body["success"] == true
    }
}

#[derive(Clone)]
pub struct OrderApi {
    manager: Arc<OrderManager>,
    query: QueryEngine,
    guard: AccessGuard,
}

impl OrderApi {
    pub fn new(manager: Arc<OrderManager>, query: QueryEngine, guard: AccessGuard) -> Self {
        Self {
            manager,
            query,
            guard,
        }
    }

    /// `POST /orders`. Anyone may place an order.
    pub async fn create_order(&self, body: &Value, token: Option<&str>) -> ApiResponse {
        let caller = self.guard.authenticate(token).await;
        match self.place(body, &caller).await {
            Ok(order) => ApiResponse::ok(
                201,
                json!({
                    "success": true,
                    "order_id": order.order_id,
                    "message": "Order placed successfully",
                    "status": order.status,
                    "estimatedDelivery": order.estimated_delivery,
                    "shippingCost": order.shipping_cost,
                }),
            ),
            Err(e) => ApiResponse::error(&e),
        }
    }

    async fn place(&self, body: &Value, caller: &Caller) -> Result<Order, OrderError> {
        let input = validate(&RawOrderRequest::from_json_lenient(body))?;
        self.manager.create(input, caller).await
    }

    /// `GET /orders`. Admin only.
    pub async fn list_orders(&self, params: &ListParams, token: Option<&str>) -> ApiResponse {
        let caller = self.guard.authenticate(token).await;
        match self.query.list(params, &caller).await {
            Ok(page) => ApiResponse::ok(
                200,
                json!({
                    "success": true,
                    "count": page.count,
                    "total": page.total,
                    "orders": page.items,
                }),
            ),
            Err(e) => ApiResponse::error(&e),
        }
    }

    /// `GET /orders/{id}`. Admins and the order's buyer.
    pub async fn get_order(&self, order_id: &str, token: Option<&str>) -> ApiResponse {
        let caller = self.guard.authenticate(token).await;
        let result = match parse_id(order_id, &caller, access::require_identified) {
            Ok(id) => self.manager.get(&id, &caller).await,
            Err(e) => Err(e),
        };
        order_envelope(result)
    }

    /// `POST /orders/{id}/ship`. Admin only.
    pub async fn mark_shipped(
        &self,
        order_id: &str,
        tracking_number: &str,
        token: Option<&str>,
    ) -> ApiResponse {
        let caller = self.guard.authenticate(token).await;
        let result = match parse_id(order_id, &caller, access::require_admin) {
            Ok(id) => self.manager.mark_shipped(&id, tracking_number, &caller).await,
            Err(e) => Err(e),
        };
        order_envelope(result)
    }

    /// `POST /orders/{id}/deliver`. Admin only.
    pub async fn mark_delivered(&self, order_id: &str, token: Option<&str>) -> ApiResponse {
        let caller = self.guard.authenticate(token).await;
        let result = match parse_id(order_id, &caller, access::require_admin) {
            Ok(id) => self.manager.mark_delivered(&id, &caller).await,
            Err(e) => Err(e),
        };
        order_envelope(result)
    }

    /// `POST /orders/{id}/cancel`. Admins and the order's buyer.
    pub async fn cancel_order(&self, order_id: &str, token: Option<&str>) -> ApiResponse {
        let caller = self.guard.authenticate(token).await;
        let result = match parse_id(order_id, &caller, access::require_identified) {
            Ok(id) => self.manager.cancel(&id, &caller).await,
            Err(e) => Err(e),
        };
        order_envelope(result)
    }
}

/// Parses a path id. A malformed id is only reported as missing to callers
/// that passed `authorize`, so the privilege check always comes first.
fn parse_id(
    raw: &str,
    caller: &Caller,
    authorize: fn(&Caller) -> Result<(), OrderError>,
) -> Result<OrderId, OrderError> {
    match OrderId::parse(raw) {
        Some(id) => Ok(id),
        None => {
            authorize(caller)?;
            Err(OrderError::NotFound(raw.to_string()))
        }
    }
}

fn order_envelope(result: Result<Order, OrderError>) -> ApiResponse {
    match result {
        Ok(order) => ApiResponse::ok(200, json!({ "success": true, "order": order })),
        Err(e) => ApiResponse::error(&e),
    }
}
