use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::{
    channel::Channel,
    config::Config,
    error::TelemetryError,
    events::{self, EventRule},
    export::{self, Heatmap},
    segment,
    telemetry::{self, Route},
};

/// Per-invocation choices, already merged over the config file.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub channel: String,
    pub output: Option<PathBuf>,
    pub rule: EventRule,
    pub every: NonZeroUsize,
}

/// Renders one log into one HTML map and returns where it was written.
///
/// Nothing is written unless every stage succeeds.
pub fn run(input: &Path, options: &RenderOptions, config: &Config) -> Result<PathBuf, TelemetryError> {
    let channel = Channel::parse(&options.channel)?;
    let gradient = config.gradient(channel)?;

    let samples = telemetry::load(input)?;
    info!("Loaded {} rows from {}", samples.len(), input.display());

    let route = Route::from_samples(samples)?;
    info!("Valid GPS points: {}/{}", route.len(), route.raw_len());

    let summary = route.summary();
    info!(
        "RPM {:.0}-{:.0} (avg {:.0}), speed {:.1}-{:.1} km/h (avg {:.1}), Ax {:.2}-{:.2}g (avg {:.2})",
        summary.rpm.min,
        summary.rpm.max,
        summary.rpm.avg,
        summary.speed.min,
        summary.speed.max,
        summary.speed.avg,
        summary.ax.min,
        summary.ax.max,
        summary.ax.avg,
    );
    info!(
        "VTEC engaged {} times over {} samples, {:.2} km in {:.1} s",
        summary.vtec_engagements,
        summary.vtec_samples,
        summary.distance_m / 1000.0,
        summary.duration_ms as f64 / 1000.0,
    );

    let segments = segment::segments(&route, channel, gradient);
    info!("Drew {} path segments colored by {channel}", segments.len());

    let qualifying = events::annotate(&route, &options.rule);
    let qualifying_count = qualifying.len();
    let events = events::decimate(qualifying, options.every);
    debug!(
        "{qualifying_count} samples matched {}, keeping every {}",
        options.rule, options.every
    );
    info!("Added {} event markers ({})", events.len(), options.rule);

    let html = Heatmap {
        route: &route,
        channel,
        gradient,
        segments: &segments,
        events: &events,
        rule: options.rule,
        summary: &summary,
        map: &config.map,
    }
    .to_html();

    let output = match &options.output {
        Some(path) => path.clone(),
        None => export::output_path(input, channel),
    };
    export::write(&output, &html)?;

    Ok(output)
}
