//! Fan-out dispatch.
//!
//! The [`Aggregator`] issues one GET per URL of a [`Task`] and wires each
//! completion back into the task. It never waits for a response; callers
//! observe the outcome through the task's sink.

use crate::aggregation::task::Task;
use crate::client::HttpClient;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Dispatches a task's requests through an [`HttpClient`].
#[derive(Clone)]
pub struct Aggregator {
    client: Arc<dyn HttpClient>,
}

impl Aggregator {
    /// Create an aggregator on top of the given client.
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }

    /// Start the task and dispatch all of its requests, returning immediately.
    pub fn execute(&self, task: Arc<Task>) {
        info!("Started task with {} urls", task.urls().len());
        task.start();

        for (index, url) in task.urls().iter().enumerate() {
            let dispatched_at = Instant::now();
            let owner = Arc::clone(&task);
            let target = url.clone();

            debug!("Dispatching [{}] GET {}", index, url);
            self.client.get(
                url,
                Box::new(move |outcome| match outcome {
                    Ok(response) => {
                        owner.record_success(index, dispatched_at, response.status, &response.body)
                    }
                    Err(error) => owner.record_failure(index, dispatched_at, &target, &error),
                }),
            );
        }
    }
}
