//! Route handlers.

use super::{wait_for, AppState};
use crate::aggregation::Task;
use crate::error::ApiError;
use crate::models::{AggregateResponse, ApiRequest, TimeResponse};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info};

/// `POST /aggregate`
pub async fn aggregate(
    State(state): State<AppState>,
    request: Result<Json<ApiRequest>, JsonRejection>,
) -> Result<Json<AggregateResponse>, ApiError> {
    let Json(request) = request.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let count = request.urls.len();
    if count > state.max_urls {
        return Err(ApiError::TooManyUrls {
            count,
            max: state.max_urls,
        });
    }

    info!("Aggregate request for {} urls", count);
    let (task, rx) = Task::channel(request.urls);
    state.aggregator.execute(Arc::new(task));

    let response = wait_for(rx, state.deadline).await?;
    Ok(Json(response))
}

/// `GET /time/basic`
pub async fn time_basic() -> Json<TimeResponse> {
    debug!("Basic time request");
    Json(TimeResponse::now())
}

/// `GET /time/re`
pub async fn time_re() -> (StatusCode, Json<TimeResponse>) {
    debug!("Response entity request");
    (StatusCode::OK, Json(TimeResponse::now()))
}

/// `GET /time/callable`
///
/// The value is computed by a closure on the blocking pool.
pub async fn time_callable() -> Result<Json<TimeResponse>, ApiError> {
    debug!("Callable time request");
    tokio::task::spawn_blocking(TimeResponse::now)
        .await
        .map(Json)
        .map_err(|_| ApiError::Abandoned)
}

/// `GET /time/deferred`
///
/// The value is produced by a task on the runtime pool and handed back
/// through a oneshot channel.
pub async fn time_deferred() -> Result<Json<TimeResponse>, ApiError> {
    debug!("Deferred time request");
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let _ = tx.send(TimeResponse::now());
    });

    rx.await.map(Json).map_err(|_| ApiError::Abandoned)
}

/// `GET /health`
pub async fn health() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::Aggregator;
    use crate::client::{ClientOptions, ReqwestClient};
    use crate::server::router;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Start the service on an ephemeral port and return its base URL.
    async fn spawn_service(max_urls: usize, deadline: Option<Duration>) -> String {
        let client = ReqwestClient::new(&ClientOptions::default()).unwrap();
        let state = AppState {
            aggregator: Aggregator::new(Arc::new(client)),
            max_urls,
            deadline,
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router(state)).await;
        });

        format!("http://{}", addr)
    }

    async fn upstream() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"name": "json"}))
                    .set_delay(Duration::from_millis(50)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/text"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_string("nope")
                    .set_delay(Duration::from_millis(50)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_aggregate_end_to_end() {
        let upstream = upstream().await;
        let base = spawn_service(16, None).await;

        let refused = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = listener.local_addr().unwrap();
            drop(listener);
            format!("http://{}/", addr)
        };

        let body: Value = reqwest::Client::new()
            .post(format!("{}/aggregate", base))
            .json(&json!({"urls": [
                format!("{}/json", upstream.uri()),
                refused,
                format!("{}/text", upstream.uri()),
            ]}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        let responses = body["responses"].as_array().unwrap();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["status"], json!(200));
        assert_eq!(responses[0]["body"], json!({"name": "json"}));
        assert_eq!(responses[1]["status"], json!(-1));
        assert_eq!(responses[1]["body"], Value::Null);
        assert!(responses[1]["error"].is_string());
        assert_eq!(responses[2]["status"], json!(404));
        assert_eq!(responses[2]["body"], json!("nope"));
        assert!(body["duration"].as_u64().unwrap() >= 50);
    }

    #[tokio::test]
    async fn test_aggregate_empty() {
        let base = spawn_service(16, None).await;

        let body: Value = reqwest::Client::new()
            .post(format!("{}/aggregate", base))
            .json(&json!({"urls": []}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["responses"], json!([]));
        assert!(body["duration"].as_u64().unwrap() < 50);
    }

    #[tokio::test]
    async fn test_aggregate_too_many_urls() {
        let base = spawn_service(1, None).await;

        let response = reqwest::Client::new()
            .post(format!("{}/aggregate", base))
            .json(&json!({"urls": ["http://a", "http://b"]}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"]["code"], json!("TOO_MANY_URLS"));
    }

    #[tokio::test]
    async fn test_aggregate_malformed_body() {
        let base = spawn_service(16, None).await;

        let response = reqwest::Client::new()
            .post(format!("{}/aggregate", base))
            .header("content-type", "application/json")
            .body(r#"{"urls": "not-a-list"#)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"]["code"], json!("INVALID_REQUEST"));
        assert!(body["error"]["message"].is_string());
    }

    #[tokio::test]
    async fn test_aggregate_deadline() {
        let upstream = upstream().await;
        let base = spawn_service(16, Some(Duration::from_millis(300))).await;

        let response = reqwest::Client::new()
            .post(format!("{}/aggregate", base))
            .json(&json!({"urls": [format!("{}/slow", upstream.uri())]}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn test_time_endpoints() {
        let base = spawn_service(16, None).await;
        let client = reqwest::Client::new();

        for endpoint in ["/time/basic", "/time/re", "/time/callable", "/time/deferred"] {
            let body: TimeResponse = client
                .get(format!("{}{}", base, endpoint))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            assert!(!body.time.is_empty());
        }

        let health: Value = client
            .get(format!("{}/health", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], json!("ok"));
    }
}
