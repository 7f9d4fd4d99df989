use std::str::FromStr;

use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::{
    error::TelemetryError,
    gradient::{ColorGradient, Rgb},
    telemetry::TelemetrySample,
};

/// A numeric telemetry column that the route can be colored by.
///
/// Names match the CSV header exactly.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
pub enum Channel {
    #[strum(serialize = "RPM")]
    Rpm,
    #[strum(serialize = "Spd")]
    Speed,
    #[strum(serialize = "Ax")]
    LongitudinalG,
    #[strum(serialize = "Ay")]
    LateralG,
    #[strum(serialize = "Throttle")]
    Throttle,
}

impl Channel {
    pub fn parse(name: &str) -> Result<Self, TelemetryError> {
        Channel::from_str(name).map_err(|_| TelemetryError::UnknownChannel(name.to_owned()))
    }

    pub fn names() -> Vec<&'static str> {
        Channel::iter().map(<&'static str>::from).collect()
    }

    pub fn value(self, sample: &TelemetrySample) -> f64 {
        match self {
            Channel::Rpm => sample.rpm as f64,
            Channel::Speed => sample.speed,
            Channel::LongitudinalG => sample.ax,
            Channel::LateralG => sample.ay,
            Channel::Throttle => sample.throttle,
        }
    }

    pub fn caption(self) -> &'static str {
        match self {
            Channel::Rpm => "Engine RPM",
            Channel::Speed => "Speed (km/h)",
            Channel::LongitudinalG => "Longitudinal G-Force",
            Channel::LateralG => "Lateral G-Force",
            Channel::Throttle => "Throttle (%)",
        }
    }

    pub fn default_gradient(self) -> ColorGradient {
        const GREEN: Rgb = Rgb::new(0x00, 0xff, 0x00);
        const YELLOW: Rgb = Rgb::new(0xff, 0xff, 0x00);
        const ORANGE: Rgb = Rgb::new(0xff, 0x66, 0x00);
        const RED: Rgb = Rgb::new(0xff, 0x00, 0x00);
        const BLUE: Rgb = Rgb::new(0x00, 0x00, 0xff);
        const CYAN: Rgb = Rgb::new(0x00, 0xff, 0xff);
        const WHITE: Rgb = Rgb::new(0xff, 0xff, 0xff);

        let (colors, vmin, vmax): (&[Rgb], f64, f64) = match self {
            Channel::Rpm => (&[GREEN, YELLOW, RED], 0.0, 7000.0),
            Channel::Speed => (&[BLUE, CYAN, YELLOW, RED], 0.0, 150.0),
            Channel::LongitudinalG => (&[GREEN, YELLOW, ORANGE, RED], -1.0, 1.0),
            Channel::LateralG => (&[BLUE, WHITE, RED], -1.0, 1.0),
            Channel::Throttle => (&[GREEN, YELLOW, RED], 0.0, 100.0),
        };
        // the tables above always hold at least two colors over a non-empty range
        match ColorGradient::even(colors, vmin, vmax) {
            Ok(gradient) => gradient,
            Err(e) => unreachable!("built-in gradient for {self}: {e}"),
        }
    }
}
