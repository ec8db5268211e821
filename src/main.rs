// SPDX-License-Identifier: GPL-3.0-or-later
use anyhow::Context as _;
use structopt::StructOpt;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod camera;
mod error;
mod image_buffer;
mod inference;
mod pipeline;
mod render;
mod settings;
mod storage;
mod temperature;
mod trigger;
mod upload;

use crate::pipeline::Pipeline;
use crate::settings::{Args, Settings};
use crate::trigger::CaptureScheduler;

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::from_args();
    let settings = Settings::load(&args.config_path)?;
    info!(config = %args.config_path.display(), "fire-watch starting");

    let pins = settings
        .trigger
        .open_pins()
        .context("Unable to set up the trigger lines")?;
    let mut scheduler = CaptureScheduler::new(pins, settings.trigger.poll_interval());
    let mut pipeline = Pipeline::from_settings(&settings);
    info!(
        pins = ?settings.trigger.pins,
        "Waiting for a trigger"
    );
    scheduler.run(|| {
        let report = pipeline.run_cycle();
        if report.is_complete() {
            debug!("Capture cycle complete");
        } else {
            warn!(
                sensor = ?report.sensor,
                inference = ?report.inference,
                encoding = ?report.encoding,
                storage = ?report.storage,
                transport = ?report.transport,
                fire = report.classification.fire,
                "Capture cycle finished with failures"
            );
        }
    })
}
