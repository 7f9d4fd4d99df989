//! Piecewise-linear color gradients used to color the route by a channel.

use std::{fmt, str::FromStr};

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum GradientError {
    #[error("a gradient needs at least two colors")]
    TooFewColors,
    #[error("invalid range: vmin ({vmin}) must be below vmax ({vmax})")]
    InvalidRange { vmin: f64, vmax: f64 },
    #[error("{stops} stop positions given for {colors} colors")]
    StopCountMismatch { stops: usize, colors: usize },
    #[error("stop positions must be ascending and within [vmin, vmax]")]
    InvalidStops,
    #[error("invalid color '{0}', expected #rrggbb")]
    InvalidColor(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
        }
    }
}

impl FromStr for Rgb {
    type Err = GradientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GradientError::InvalidColor(s.to_owned());
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Ordered color stops over a clamped `[vmin, vmax]` domain.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorGradient {
    stops: Vec<(f64, Rgb)>,
    vmin: f64,
    vmax: f64,
}

impl ColorGradient {
    /// Spreads `colors` evenly across `[vmin, vmax]`.
    pub fn even(colors: &[Rgb], vmin: f64, vmax: f64) -> Result<Self, GradientError> {
        if colors.len() < 2 {
            return Err(GradientError::TooFewColors);
        }
        let last = (colors.len() - 1) as f64;
        let positions: Vec<f64> = (0..colors.len())
            .map(|i| vmin + (vmax - vmin) * i as f64 / last)
            .collect();
        Self::with_stops(colors, &positions, vmin, vmax)
    }

    pub fn with_stops(
        colors: &[Rgb],
        positions: &[f64],
        vmin: f64,
        vmax: f64,
    ) -> Result<Self, GradientError> {
        if colors.len() < 2 {
            return Err(GradientError::TooFewColors);
        }
        // also rejects NaN bounds
        if !(vmin < vmax) {
            return Err(GradientError::InvalidRange { vmin, vmax });
        }
        if positions.len() != colors.len() {
            return Err(GradientError::StopCountMismatch {
                stops: positions.len(),
                colors: colors.len(),
            });
        }
        let in_range = positions.iter().all(|p| (vmin..=vmax).contains(p));
        let ascending = positions.windows(2).all(|w| w[0] <= w[1]);
        if !in_range || !ascending {
            return Err(GradientError::InvalidStops);
        }

        let stops = positions.iter().copied().zip(colors.iter().copied()).collect();
        Ok(Self { stops, vmin, vmax })
    }

    pub fn vmin(&self) -> f64 {
        self.vmin
    }

    pub fn vmax(&self) -> f64 {
        self.vmax
    }

    pub fn stops(&self) -> &[(f64, Rgb)] {
        &self.stops
    }

    /// Total over the real line: out-of-range values clamp, NaN maps to `vmin`.
    pub fn color(&self, value: f64) -> Rgb {
        let value = if value.is_nan() {
            self.vmin
        } else {
            value.clamp(self.vmin, self.vmax)
        };

        let idx = self.stops.partition_point(|(pos, _)| *pos < value);
        if idx == 0 {
            return self.stops[0].1;
        }
        let Some(&(hi_pos, hi)) = self.stops.get(idx) else {
            return self.stops[self.stops.len() - 1].1;
        };
        let (lo_pos, lo) = self.stops[idx - 1];
        let t = if hi_pos > lo_pos {
            (value - lo_pos) / (hi_pos - lo_pos)
        } else {
            1.0
        };
        lo.lerp(hi, t)
    }

    /// CSS `linear-gradient` equivalent, for the map legend.
    pub fn css(&self) -> String {
        let span = self.vmax - self.vmin;
        let stops: Vec<String> = self
            .stops
            .iter()
            .map(|(pos, color)| format!("{color} {:.1}%", (pos - self.vmin) / span * 100.0))
            .collect();
        format!("linear-gradient(to right, {})", stops.join(", "))
    }
}
