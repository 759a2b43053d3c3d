//! Fan-out/fan-in aggregation.
//!
//! A [`Task`] collects the outcome of every request; the [`Aggregator`]
//! dispatches the requests and wires their completions into the task.

pub mod aggregator;
pub mod task;

pub use aggregator::Aggregator;
pub use task::Task;
