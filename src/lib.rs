//! # Order Intake
//!
//! Accepts order requests, validates and prices them, assigns order IDs,
//! rejects duplicate submissions, and moves orders through their fulfillment
//! lifecycle.
//!
//! ## Request Flow
//!
//! ```text
//! create: AccessGuard → validate → catalog → DuplicateDetector → GeoPricer → OrderIdGenerator → store
//! list:   AccessGuard → QueryEngine → store
//! ```
//!
//! ## Architecture Notes
//!
//! ### 1. The Store Is an Actor
//! Orders live in a [`ResourceActor`](framework::ResourceActor) running in its own
//! Tokio task. It processes requests one at a time, so insert-if-absent and the
//! status compare-and-set are atomic without locks. Everything else talks to it
//! through a cloneable [`OrderClient`](clients::OrderClient).
//!
//! ### 2. IDs Are Confirmed, Not Trusted
//! [`OrderIdGenerator`](order_id::OrderIdGenerator) only proposes candidates; a
//! candidate becomes an order ID when the store accepts the insert.
//!
//! ### 3. Transitions Are Conditional Writes
//! [`OrderManager`](fulfillment::OrderManager) writes a new status only if the
//! status it read is still current. Of two racing requests exactly one wins.
//!
//! ### 4. Type-Safe Error Handling
//! Every failure is an [`OrderError`](order_actor::OrderError) with a stable
//! `code()` and an HTTP status derived from its `kind()`.
//!
//! ## Module Tour
//!
//! - [`framework`]: the generic store actor, its client, and the mock store.
//! - [`model`]: orders, requests and callers.
//! - [`validation`], [`pricing`], [`order_id`], [`duplicate`]: the creation stages.
//! - [`fulfillment`], [`query`], [`access`]: the write path, the read path, and who may use them.
//! - [`api`]: JSON envelopes for a transport layer.
//! - [`runtime`]: [`OrderSystem`](runtime::OrderSystem) wiring and [`setup_tracing`](runtime::setup_tracing).
//!
//! ### Running the Demo
//!
//! ```bash
//! RUST_LOG=info cargo run
//! ```

pub mod access;
pub mod api;
pub mod catalog;
pub mod clients;
pub mod config;
pub mod duplicate;
pub mod framework;
pub mod fulfillment;
pub mod model;
pub mod order_actor;
pub mod order_id;
pub mod pricing;
pub mod query;
pub mod runtime;
pub mod validation;
