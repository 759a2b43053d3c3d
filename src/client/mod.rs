//! Outbound HTTP client used for fan-out requests.
//!
//! The aggregator talks to the network only through [`HttpClient`], which
//! dispatches a GET and later settles it by invoking a one-shot completion
//! callback. [`ReqwestClient`] is the production implementation.

use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::debug;

/// A response received from the remote server, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Transport-level failure of a single request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("failed to read response body: {0}")]
    Body(String),
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        let message = e.to_string();
        if e.is_timeout() {
            FetchError::Timeout(message)
        } else if e.is_connect() {
            FetchError::Connect(message)
        } else if e.is_body() || e.is_decode() {
            FetchError::Body(message)
        } else {
            FetchError::Request(message)
        }
    }
}

/// Errors building a client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP client must be created inside a Tokio runtime")]
    NoRuntime,
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Callback invoked exactly once when a request settles.
pub type Completion = Box<dyn FnOnce(Result<FetchedResponse, FetchError>) + Send + 'static>;

/// Asynchronous GET dispatcher.
///
/// `get` must return without waiting for the request. The completion runs
/// later, on a thread chosen by the implementation, possibly concurrently
/// with completions of other requests.
pub trait HttpClient: Send + Sync {
    fn get(&self, url: &str, on_complete: Completion);
}

/// Settings for [`ReqwestClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            connect_timeout: Some(Duration::from_secs(10)),
            user_agent: format!("urlgather/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl From<&crate::config::ClientConfig> for ClientOptions {
    fn from(config: &crate::config::ClientConfig) -> Self {
        Self {
            timeout: non_zero_secs(config.timeout_seconds),
            connect_timeout: non_zero_secs(config.connect_timeout_seconds),
            user_agent: config.user_agent.clone(),
        }
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// [`HttpClient`] backed by reqwest, settling requests on the Tokio worker pool.
#[derive(Clone)]
pub struct ReqwestClient {
    http: reqwest::Client,
    runtime: Handle,
}

impl ReqwestClient {
    /// Build a client bound to the current Tokio runtime.
    pub fn new(options: &ClientOptions) -> Result<Self, ClientError> {
        let runtime = Handle::try_current().map_err(|_| ClientError::NoRuntime)?;

        let mut builder = reqwest::Client::builder().user_agent(options.user_agent.clone());
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = options.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        Ok(Self {
            http: builder.build()?,
            runtime,
        })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str, on_complete: Completion) {
        let request = self.http.get(url);
        let url = url.to_string();

        self.runtime.spawn(async move {
            let outcome = fetch(request).await;
            debug!("GET {} settled (ok: {})", url, outcome.is_ok());
            on_complete(outcome);
        });
    }
}

async fn fetch(request: reqwest::RequestBuilder) -> Result<FetchedResponse, FetchError> {
    let response = request.send().await?;
    let status = response.status().as_u16();
    let body = response.bytes().await?;

    Ok(FetchedResponse {
        status,
        body: body.to_vec(),
    })
}
