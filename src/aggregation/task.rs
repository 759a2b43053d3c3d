//! Per-aggregation state shared by all in-flight requests.
//!
//! A [`Task`] owns one write-once slot per URL and a countdown of requests
//! still outstanding. Callbacks record into their own slot and decrement the
//! countdown; the callback that takes it to zero assembles the
//! [`AggregateResponse`] and fires the sink.

use crate::client::FetchError;
use crate::models::{AggregateResponse, ResultRecord};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Single-fire delivery channel for the aggregated response.
pub type Sink = oneshot::Sender<AggregateResponse>;

/// Accumulation point for one fan-out.
pub struct Task {
    urls: Vec<String>,
    results: Vec<OnceLock<ResultRecord>>,
    remaining: AtomicUsize,
    created_at: Instant,
    started_at: OnceLock<Instant>,
    sink: Mutex<Option<Sink>>,
}

impl Task {
    /// Create a task that will deliver into `sink`.
    pub fn new(sink: Sink, urls: Vec<String>) -> Self {
        let results = urls.iter().map(|_| OnceLock::new()).collect();
        let remaining = AtomicUsize::new(urls.len());

        Self {
            urls,
            results,
            remaining,
            created_at: Instant::now(),
            started_at: OnceLock::new(),
            sink: Mutex::new(Some(sink)),
        }
    }

    /// Create a task together with the receiver its result will arrive on.
    pub fn channel(urls: Vec<String>) -> (Self, oneshot::Receiver<AggregateResponse>) {
        let (tx, rx) = oneshot::channel();
        (Self::new(tx, urls), rx)
    }

    /// URLs in dispatch order.
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Number of requests that have not settled yet.
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Mark the beginning of dispatch. An empty task finalizes here.
    pub fn start(&self) {
        if self.started_at.set(Instant::now()).is_err() {
            warn!("Task started more than once; keeping first start time");
            return;
        }

        if self.urls.is_empty() {
            debug!("Task has no URLs, finalizing immediately");
            self.finalize();
        }
    }

    /// Record a received response for `index`. Any HTTP status counts as success.
    pub fn record_success(&self, index: usize, dispatched_at: Instant, status: u16, body: &[u8]) {
        let body = String::from_utf8_lossy(body).into_owned();
        let record = ResultRecord::success(index, status, body, elapsed_millis(dispatched_at));
        self.settle(record);
    }

    /// Record a transport failure for `index`.
    pub fn record_failure(&self, index: usize, dispatched_at: Instant, url: &str, error: &FetchError) {
        warn!("GET {} failed: {}", url, error);
        let record = ResultRecord::failure(index, error.to_string(), elapsed_millis(dispatched_at));
        self.settle(record);
    }

    fn settle(&self, record: ResultRecord) {
        let index = record.index;

        let Some(slot) = self.results.get(index) else {
            warn!(
                "Ignoring result for index {} (task has {} URLs)",
                index,
                self.urls.len()
            );
            return;
        };

        if slot.set(record).is_err() {
            warn!("Ignoring duplicate settlement for index {}", index);
            return;
        }

        // AcqRel: the release half publishes this slot, the acquire half on
        // the final decrement makes every other slot visible to the finalizer.
        let previous = self.remaining.fetch_sub(1, Ordering::AcqRel);
        debug!("Index {} settled, {} remaining", index, previous - 1);

        if previous == 1 {
            self.finalize();
        }
    }

    fn finalize(&self) {
        let responses: Vec<ResultRecord> = self
            .results
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.get()
                    .cloned()
                    .unwrap_or_else(|| ResultRecord::unsettled(i))
            })
            .collect();

        let started_at = self.started_at.get().copied().unwrap_or(self.created_at);
        let response = AggregateResponse {
            responses,
            total_duration_millis: elapsed_millis(started_at),
        };

        info!(
            "Aggregated {} responses in {}ms",
            response.responses.len(),
            response.total_duration_millis
        );

        let sink = match self.sink.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        match sink {
            Some(sink) => {
                if sink.send(response).is_err() {
                    debug!("Aggregation receiver dropped before completion");
                }
            }
            None => warn!("Task finalized more than once; result discarded"),
        }
    }
}

fn elapsed_millis(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}
