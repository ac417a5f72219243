//! Pure data structures shared by every stage of the pipeline.

pub mod actor;
pub mod order;
pub mod request;

pub use actor::*;
pub use order::*;
pub use request::*;
