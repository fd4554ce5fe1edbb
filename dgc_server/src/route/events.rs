use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dgc_core::cache::EventCache;
use serde_json::{json, Value};
use tracing::warn;

static UNAVAILABLE: &str = "Unable to fetch events right now.";

/// Pass the upstream timeline through as it was fetched.
pub async fn handler(
    State(cache): State<Arc<EventCache>>,
) -> Result<Response, (StatusCode, Json<Value>)> {
    let events = cache.get_events().await.map_err(|err| {
        warn!(error = %err, "failed to load events");
        (StatusCode::BAD_GATEWAY, Json(json!({ "error": UNAVAILABLE })))
    })?;
    Ok(Json(events.as_slice()).into_response())
}
