//! Order-specific store logic and record implementation.

pub mod entity;
pub mod error;

pub use error::*;

use crate::clients::OrderClient;
use crate::framework::ResourceActor;
use crate::model::Order;
use std::time::Duration;

/// Creates the order store actor and its client.
///
/// With a `timeout`, store calls that are not answered in time fail instead
/// of waiting on a stalled actor.
pub fn new(buffer: usize, timeout: Option<Duration>) -> (ResourceActor<Order>, OrderClient) {
    let (actor, generic_client) = ResourceActor::new(buffer);
    let generic_client = match timeout {
        Some(limit) => generic_client.with_timeout(limit),
        None => generic_client,
    };
    (actor, OrderClient::new(generic_client))
}
