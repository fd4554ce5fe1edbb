//! One-shot export of the Ogrodje timeline, without a server or a cache.

use std::{env::current_dir, fs::write, path::PathBuf};

use anyhow::Result;
use clap::Parser;
use dgc_core::{
    calendar,
    logging::{init_tracing, TracingConfig},
    source::{self, SourceConfig},
};
use tracing::info;

#[derive(Debug, Parser)]
#[command(version)]
pub struct Arguments {
    /// where to write the export, defaults to `timeline.ics` or `timeline.json` in the current
    /// directory
    #[arg(long, short)]
    pub output: Option<PathBuf>,
    /// write the raw timeline JSON instead of the calendar
    #[arg(long)]
    pub json: bool,
    /// the upstream timeline URL
    #[arg(long, env = "TIMELINE_URL", default_value = source::DEFAULT_URL)]
    pub timeline_url: String,
}

impl Arguments {
    fn file_name(&self) -> &'static str {
        if self.json {
            "timeline.json"
        } else {
            "timeline.ics"
        }
    }

    fn output_path(&self) -> Result<PathBuf> {
        if let Some(output) = &self.output {
            return Ok(output.clone());
        }
        let mut path = current_dir()?;
        path.push(self.file_name());
        Ok(path)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(TracingConfig::cli())?;
    let args = Arguments::parse();
    let events = source::get(SourceConfig::default().with_url(&args.timeline_url)).await?;
    let contents = if args.json {
        serde_json::to_string_pretty(&events)?
    } else {
        calendar::render(&events)
    };
    let path = args.output_path()?;
    write(&path, contents)?;
    info!(path = %path.display(), count = events.len(), "wrote timeline");
    Ok(())
}
