use std::{
    collections::BTreeMap,
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use strum::IntoEnumIterator;

use crate::{
    channel::Channel,
    error::TelemetryError,
    events::{EventRule, Trigger, VTEC_RPM},
    gradient::{ColorGradient, Rgb},
};

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_PATH: &str = "telemap.toml";

const DEFAULT_EVERY: NonZeroUsize = match NonZeroUsize::new(10) {
    Some(n) => n,
    None => panic!("zero"),
};

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    map: MapConfig,
    events: EventsConfig,
    channels: BTreeMap<String, GradientConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapConfig {
    pub tiles: String,
    pub attribution: String,
    pub zoom: u8,
    pub line_weight: f64,
    pub line_opacity: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            tiles: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_owned(),
            attribution: "&copy; OpenStreetMap contributors".to_owned(),
            zoom: 16,
            line_weight: 6.0,
            line_opacity: 0.9,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EventsConfig {
    pub trigger: Trigger,
    pub threshold: u32,
    // keep every Nth qualifying sample
    pub every: NonZeroUsize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            trigger: Trigger::Vtec,
            threshold: VTEC_RPM,
            every: DEFAULT_EVERY,
        }
    }
}

impl EventsConfig {
    pub fn rule(&self) -> EventRule {
        EventRule {
            trigger: self.trigger,
            threshold: self.threshold,
        }
    }
}

/// Overrides a channel's built-in gradient. Omitted bounds keep the built-in ones.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GradientConfig {
    colors: Vec<String>,
    vmin: Option<f64>,
    vmax: Option<f64>,
    stops: Option<Vec<f64>>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub map: MapConfig,
    pub events: EventsConfig,
    gradients: BTreeMap<Channel, ColorGradient>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            map: MapConfig::default(),
            events: EventsConfig::default(),
            gradients: Channel::iter().map(|c| (c, c.default_gradient())).collect(),
        }
    }
}

impl Config {
    pub fn gradient(&self, channel: Channel) -> Result<&ColorGradient, TelemetryError> {
        self.gradients
            .get(&channel)
            .ok_or_else(|| TelemetryError::UnknownChannel(channel.to_string()))
    }

    fn from_toml(data: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(data).context("Failed to parse config")?;

        let map = file.map;
        if !(map.line_weight > 0.0) {
            bail!("map.line_weight must be positive");
        }
        if !(0.0..=1.0).contains(&map.line_opacity) {
            bail!("map.line_opacity must be within [0, 1]");
        }

        let mut config = Config {
            map,
            events: file.events,
            ..Config::default()
        };
        for (name, gradient) in file.channels {
            let channel = Channel::parse(&name).context("Invalid [channels] entry")?;
            let built = gradient
                .build(channel)
                .with_context(|| format!("Invalid gradient for channel {channel}"))?;
            config.gradients.insert(channel, built);
        }

        Ok(config)
    }
}

impl GradientConfig {
    fn build(self, channel: Channel) -> Result<ColorGradient> {
        let builtin = channel.default_gradient();
        let colors = self
            .colors
            .iter()
            .map(|c| c.parse::<Rgb>())
            .collect::<Result<Vec<_>, _>>()?;
        let vmin = self.vmin.unwrap_or(builtin.vmin());
        let vmax = self.vmax.unwrap_or(builtin.vmax());

        let gradient = match self.stops {
            Some(stops) => ColorGradient::with_stops(&colors, &stops, vmin, vmax)?,
            None => ColorGradient::even(&colors, vmin, vmax)?,
        };
        Ok(gradient)
    }
}

/// Reads `path`, or [`DEFAULT_PATH`] if it exists, or falls back to built-in defaults.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(x) => x.to_path_buf(),
        None => {
            let fallback = PathBuf::from(DEFAULT_PATH);
            if !fallback.exists() {
                return Ok(Config::default());
            }
            fallback
        }
    };

    let data = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    Config::from_toml(&data)
}
