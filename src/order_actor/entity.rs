//! [`StoredRecord`] implementation for [`Order`].
//!
//! Conditional writes compare on [`OrderStatus`], so every lifecycle
//! transition is a compare-and-set against the status the manager read.

use crate::framework::StoredRecord;
use crate::model::{Order, OrderFilter, OrderId, OrderMutation, OrderSort, OrderStatus, SortField};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

impl StoredRecord for Order {
    type Id = OrderId;
    type State = OrderStatus;
    type Mutation = OrderMutation;
    type Filter = OrderFilter;
    type Sort = OrderSort;

    fn id(&self) -> &OrderId {
        &self.order_id
    }

    fn state(&self) -> OrderStatus {
        self.status
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn apply(&mut self, mutation: OrderMutation) {
        self.status = mutation.target();
        match mutation {
            OrderMutation::Ship {
                tracking_number,
                at,
            } => {
                self.tracking_number = Some(tracking_number);
                self.shipped_at = Some(at);
                self.updated_at = at;
            }
            OrderMutation::Deliver { at } => {
                self.delivered_at = Some(at);
                self.updated_at = at;
            }
            OrderMutation::Cancel { at } => {
                self.cancelled_at = Some(at);
                self.updated_at = at;
            }
        }
    }

    fn matches(&self, filter: &OrderFilter) -> bool {
        filter.status.map_or(true, |s| self.status == s)
            && filter.product.as_ref().map_or(true, |p| &self.product == p)
            && filter.buyer.as_ref().map_or(true, |b| &self.buyer_identity == b)
            && filter.year.map_or(true, |y| self.order_id.year() == Some(y))
    }

    /// Orders by the requested field, then by `order_id` ascending so pages
    /// are stable when the field ties.
    fn compare(&self, other: &Self, sort: &OrderSort) -> Ordering {
        let by_field = match sort.field {
            SortField::CreatedAt => self.created_at.cmp(&other.created_at),
            SortField::UpdatedAt => self.updated_at.cmp(&other.updated_at),
            SortField::Amount => self.amount.total_cmp(&other.amount),
            SortField::ShippingCost => self.shipping_cost.total_cmp(&other.shipping_cost),
            SortField::OrderId => Ordering::Equal,
            SortField::Status => self.status.as_str().cmp(other.status.as_str()),
            SortField::Product => self.product.cmp(&other.product),
            SortField::BuyerName => self.buyer_name.cmp(&other.buyer_name),
            SortField::Sequence => self.order_id.sequence().cmp(&other.order_id.sequence()),
        };
        let by_field = if sort.descending {
            by_field.reverse()
        } else {
            by_field
        };

        // Sorting by id honours the direction; the tie-break is always ascending
        let by_id = self.order_id.cmp(&other.order_id);
        match (sort.field, sort.descending) {
            (SortField::OrderId, true) => by_id.reverse(),
            _ => by_field.then(by_id),
        }
    }
}
