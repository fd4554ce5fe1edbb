use std::{path::Path, sync::Arc};

use axum::{
    http::{
        header::{
            CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
        },
        HeaderValue,
    },
    routing::get,
    Router,
};
use dgc_core::cache::EventCache;
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::route;

static CONTENT_SECURITY: &str = "default-src 'self'; script-src 'self'; \
    style-src 'self' 'unsafe-inline'; img-src 'self' data:; connect-src 'self'; \
    base-uri 'self'; form-action 'self'";

/// Build the application: the feed routes, the static frontend as fallback and the fixed
/// security headers on every response.
pub fn router(cache: Arc<EventCache>, public_dir: impl AsRef<Path>) -> Router {
    let router = Router::new()
        .route("/healthz", get(route::health::handler))
        .route("/api/events", get(route::events::handler))
        .route("/calendar.ics", get(route::calendar::handler))
        .fallback_service(ServeDir::new(public_dir))
        .with_state(cache);
    [
        (X_CONTENT_TYPE_OPTIONS, "nosniff"),
        (X_FRAME_OPTIONS, "DENY"),
        (REFERRER_POLICY, "no-referrer-when-downgrade"),
        (CONTENT_SECURITY_POLICY, CONTENT_SECURITY),
    ]
    .into_iter()
    .fold(router, |router, (name, value)| {
        router.layer(SetResponseHeaderLayer::if_not_present(
            name,
            HeaderValue::from_static(value),
        ))
    })
    .layer(TraceLayer::new_for_http())
}
