//! Generic actor-backed record store.
//!
//! This module provides the store primitives the pipeline is written against:
//! atomic insert-if-absent, keyed lookup, conditional update, recency query and
//! paged listing.
//!
//! # Main Components
//!
//! - [`StoredRecord`] - Trait that record types implement to be kept by the store
//! - [`ResourceActor`] - The actor owning the records
//! - [`ResourceClient`] - Typed, cloneable handle to the actor
//! - [`FrameworkError`] - Store and transport errors
//!
//! # Testing
//!
//! See [`mock`] module for scripting store answers without spawning an actor.

pub mod core;
pub mod mock;

// Re-export core types for convenience
pub use core::*;
