//! Cooperative cancellation of pipeline runs.
//!
//! - [`CancellationToken`] is checked between stages and between units of work
//! - [`CancelOnDrop`] cancels a token when a streaming consumer goes away

mod token;

pub use token::{CancelOnDrop, CancellationToken};
