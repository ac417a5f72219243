//! Runtime orchestration and lifecycle management.
//!
//! - [`OrderSystem`] starts the order store, wires the pipeline around it and
//!   shuts it down again.
//! - [`setup_tracing`] initializes logging.

pub mod order_system;
pub mod tracing;

pub use order_system::*;
pub use tracing::*;
