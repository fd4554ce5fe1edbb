use std::sync::Arc;

use axum::{
    extract::State,
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    response::{IntoResponse, Response},
};
use dgc_core::{cache::EventCache, calendar};
use tracing::warn;

static CALENDAR_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";
static CALENDAR_DISPOSITION: &str = r#"attachment; filename="timeline.ics""#;
static UNAVAILABLE: &str = "Unable to build calendar feed right now.";

/// Handle calendar requests.
///
/// Only the timeline is cached, the calendar is rendered for every request.
pub async fn handler(
    State(cache): State<Arc<EventCache>>,
) -> Result<Response, (StatusCode, &'static str)> {
    let events = cache.get_events().await.map_err(|err| {
        warn!(error = %err, "failed to build calendar");
        (StatusCode::BAD_GATEWAY, UNAVAILABLE)
    })?;
    let response = (
        [
            (CONTENT_TYPE, CALENDAR_CONTENT_TYPE),
            (CONTENT_DISPOSITION, CALENDAR_DISPOSITION),
        ],
        calendar::render(&events),
    )
        .into_response();
    Ok(response)
}
