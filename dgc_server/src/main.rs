//! This crate implements an HTTP server exposing the Ogrodje timeline twice: as JSON under
//! `/api/events` and as an iCalendar feed under `/calendar.ics`.

mod app;
mod config;
mod route;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use dgc_core::{cache::EventCache, logging::init_tracing, source::TimelineClient};
use tracing::info;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_tracing(config.tracing_config())?;
    let source = TimelineClient::new(config.source_config());
    let cache = Arc::new(EventCache::new(Arc::new(source), config.cache_ttl()));
    let app = app::router(cache, &config.public_dir);
    let addr = config.socket_addr();
    info!(%addr, timeline = %config.timeline_url, "listening");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
