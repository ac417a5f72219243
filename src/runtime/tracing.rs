//! # Observability & Tracing
//!
//! [`setup_tracing`] initializes structured logging with the `tracing` crate.
//! Log lines use the compact format without module paths (`with_target(false)`);
//! the store actor tags its lines with `entity_type` instead.
//!
//! ## What Gets Traced
//!
//! - **Store lifecycle**: `Actor started`, `Inserted`, `Updated`, `Shutdown`
//! - **Order flow**: creation, duplicate hits, transitions and lost races
//! - **Rejections**: every failed request with its error `code`
//!
//! ## Usage
//!
//! ```bash
//! # Order flow only
//! RUST_LOG=info cargo run
//!
//! # Full payloads and store requests
//! RUST_LOG=debug cargo run
//!
//! # Store internals only
//! RUST_LOG=order_intake::framework=debug cargo run
//! ```
//!
//! With `RUST_LOG=info` a placed and shipped order reads:
//!
//! ```text
//! INFO Actor started entity_type="Order"
//! INFO Inserted entity_type="Order" id=ORD-2026-000001 size=1
//! INFO create: Order created product=bag order_id=ORD-2026-000001 cost=5.0 tier=Local
//! INFO Updated entity_type="Order" id=ORD-2026-000001 state=Shipped
//! INFO mark_shipped: Order transitioned order_id=ORD-2026-000001 from=pending to=shipped
//! ```

/// Installs the global subscriber. Call once at startup.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // entity_type and span names carry the context
        .compact()
        .init();
}
