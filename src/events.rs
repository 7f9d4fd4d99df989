//! Picking out notable points along the route for map markers.

use std::{fmt, num::NonZeroUsize};

use clap::ValueEnum;
use serde::Deserialize;

use crate::telemetry::{Route, TelemetrySample};

/// RPM above which the J35 switches to the high-lift cam profile.
pub const VTEC_RPM: u32 = 5150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    /// The logged VTEC flag is set
    Vtec,
    /// RPM is strictly above the threshold
    Rpm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRule {
    pub trigger: Trigger,
    pub threshold: u32,
}

impl EventRule {
    pub fn matches(&self, sample: &TelemetrySample) -> bool {
        match self.trigger {
            Trigger::Vtec => sample.vtec,
            Trigger::Rpm => sample.rpm > self.threshold,
        }
    }
}

impl fmt::Display for EventRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.trigger {
            Trigger::Vtec => write!(f, "VTEC engaged"),
            Trigger::Rpm => write!(f, "RPM > {}", self.threshold),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event<'a> {
    /// position in the route
    pub index: usize,
    pub sample: &'a TelemetrySample,
}

impl Event<'_> {
    /// Channel values shown in the marker popup.
    pub fn label(&self) -> Vec<(&'static str, String)> {
        let s = self.sample;
        vec![
            ("RPM", format!("{}", s.rpm)),
            ("Speed", format!("{:.1} km/h", s.speed)),
            ("Ax", format!("{:.2}g", s.ax)),
            ("VTEC", if s.vtec { "on" } else { "off" }.to_owned()),
        ]
    }
}

pub fn annotate<'a>(route: &'a Route, rule: &EventRule) -> Vec<Event<'a>> {
    route
        .samples()
        .iter()
        .enumerate()
        .filter(|(_, sample)| rule.matches(sample))
        .map(|(index, sample)| Event { index, sample })
        .collect()
}

/// Keeps qualifying events 0, N, 2N, ... to avoid cluttering the map.
pub fn decimate(events: Vec<Event<'_>>, every: NonZeroUsize) -> Vec<Event<'_>> {
    events.into_iter().step_by(every.get()).collect()
}
