//! Batched write execution
//!
//! - [`splitter`]: cuts a submission into container-sized batches
//! - [`executor`]: sends one operation or one batch
//! - [`reconciler`]: runs the batches in order and merges their outcomes

pub mod executor;
pub mod reconciler;
pub mod splitter;

pub use executor::{BatchDispatcher, BatchExecutor};
pub use reconciler::Reconciler;
pub use splitter::split;
