//! This client fetches the raw event timeline.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use serde_json::Value;
use tracing::debug;

use crate::error::{UpstreamError, UpstreamResult};

pub const DEFAULT_URL: &str = "https://goo.ogrodje.si/timeline";
pub const DEFAULT_USER_AGENT: &str = "dogodki-google-cal/1.0";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Something the cache can ask for the current timeline.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch the whole timeline as untouched JSON records.
    async fn fetch(&self) -> UpstreamResult<Vec<Value>>;
}

/// Where and how to fetch the timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: String::from(DEFAULT_URL),
            user_agent: String::from(DEFAULT_USER_AGENT),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl SourceConfig {
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// HTTP client for the upstream timeline API.
///
/// Every call issues exactly one request. Retrying is left to whoever calls again later.
#[derive(Debug, Clone)]
pub struct TimelineClient {
    client: reqwest::Client,
    config: SourceConfig,
}

impl TimelineClient {
    pub fn new(config: SourceConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl EventSource for TimelineClient {
    async fn fetch(&self) -> UpstreamResult<Vec<Value>> {
        debug!(url = %self.config.url, "requesting timeline");
        let response = self
            .client
            .get(&self.config.url)
            .header(USER_AGENT, &self.config.user_agent)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(UpstreamError::transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::status(status));
        }
        let body = response.bytes().await.map_err(UpstreamError::transport)?;
        parse(&body)
    }
}

/// Fetch the timeline once, without any caching.
pub async fn get(config: SourceConfig) -> UpstreamResult<Vec<Value>> {
    TimelineClient::new(config).fetch().await
}

/// Parse the response body, which must be a top-level JSON array.
fn parse(body: &[u8]) -> UpstreamResult<Vec<Value>> {
    match serde_json::from_slice(body).map_err(UpstreamError::invalid_json)? {
        Value::Array(events) => Ok(events),
        Value::Object(_) => Err(UpstreamError::unexpected_payload("an object")),
        Value::String(_) => Err(UpstreamError::unexpected_payload("a string")),
        Value::Number(_) => Err(UpstreamError::unexpected_payload("a number")),
        Value::Bool(_) => Err(UpstreamError::unexpected_payload("a boolean")),
        Value::Null => Err(UpstreamError::unexpected_payload("null")),
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::{
        http::{HeaderMap, StatusCode},
        routing::get,
        Json, Router,
    };
    use serde_json::json;

    use super::*;

    /// Serve `router` on a random local port and return the timeline URL on it.
    async fn serve(router: Router) -> String {
        let server = axum::Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0)))
            .serve(router.into_make_service());
        let addr = server.local_addr();
        tokio::spawn(server);
        format!("http://{addr}/timeline")
    }

    async fn fetch_from(router: Router) -> UpstreamResult<Vec<Value>> {
        let url = serve(router).await;
        TimelineClient::new(SourceConfig::default().with_url(url))
            .fetch()
            .await
    }

    #[test]
    fn test_parse() {
        let events = parse(br#"[{"id": "a"}, {"title": "b"}]"#).unwrap();
        assert_eq!(events, vec![json!({"id": "a"}), json!({"title": "b"})]);
        assert_eq!(parse(b"[]").unwrap(), Vec::<Value>::new());
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        let err = parse(br#"{"events": []}"#).unwrap_err();
        assert!(err.message().contains("unexpected payload"));
        let err = parse(b"null").unwrap_err();
        assert!(err.message().contains("unexpected payload"));
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        let err = parse(b"<html>oops</html>").unwrap_err();
        assert!(err.message().contains("invalid JSON"));
    }

    #[tokio::test]
    async fn test_fetch() {
        let router = Router::new().route(
            "/timeline",
            get(|| async { Json(json!([{"id": "1", "title": "Meetup"}])) }),
        );
        let events = fetch_from(router).await.unwrap();
        assert_eq!(events, vec![json!({"id": "1", "title": "Meetup"})]);
    }

    #[tokio::test]
    async fn test_fetch_sends_user_agent() {
        let router = Router::new().route(
            "/timeline",
            get(|headers: HeaderMap| async move {
                let user_agent = headers
                    .get("user-agent")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or_default()
                    .to_owned();
                Json(json!([user_agent]))
            }),
        );
        let events = fetch_from(router).await.unwrap();
        assert_eq!(events, vec![json!(DEFAULT_USER_AGENT)]);
    }

    #[tokio::test]
    async fn test_fetch_server_error() {
        let router = Router::new().route(
            "/timeline",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let err = fetch_from(router).await.unwrap_err();
        assert!(err.message().contains("500"));
    }

    #[tokio::test]
    async fn test_fetch_invalid_json() {
        let router = Router::new().route("/timeline", get(|| async { "not json" }));
        let err = fetch_from(router).await.unwrap_err();
        assert!(err.message().contains("invalid JSON"));
    }

    #[tokio::test]
    async fn test_fetch_object_payload() {
        let router = Router::new().route(
            "/timeline",
            get(|| async { Json(json!({"error": "maintenance"})) }),
        );
        let err = fetch_from(router).await.unwrap_err();
        assert!(err.message().contains("unexpected payload"));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let router = Router::new().route(
            "/timeline",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!([]))
            }),
        );
        let url = serve(router).await;
        let config = SourceConfig::default()
            .with_url(url)
            .with_timeout(Duration::from_millis(100));
        let err = super::get(config).await.unwrap_err();
        assert!(err.message().starts_with("timeline fetch failed"));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let config = SourceConfig::default().with_url(format!("http://{addr}/timeline"));
        let err = super::get(config).await.unwrap_err();
        assert!(err.message().starts_with("timeline fetch failed"));
    }
}
