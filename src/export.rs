//! Writes the rendered route as a standalone Leaflet page.
//!
//! All map layers travel as one GeoJSON `FeatureCollection` embedded in the
//! page; a short script turns segments into colored polylines, events into
//! circle markers and the start/finish points into pins.

use std::{
    fs,
    path::{Path, PathBuf},
};

use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use maud::{html, Markup, PreEscaped, DOCTYPE};
use serde_json::json;

use crate::{
    channel::Channel,
    config::MapConfig,
    error::TelemetryError,
    events::{Event, EventRule},
    gradient::ColorGradient,
    segment::Segment,
    telemetry::{Route, Summary},
};

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";

const STYLE: &str = r#"
html, body { margin: 0; height: 100%; font-family: sans-serif; }
#map { position: absolute; inset: 0; }
.panel { position: absolute; z-index: 1000; background: rgba(255, 255, 255, 0.9);
  padding: 8px 12px; border-radius: 4px; box-shadow: 0 1px 4px rgba(0, 0, 0, 0.4); font-size: 12px; }
.legend { top: 10px; right: 10px; width: 220px; }
.legend .bar { height: 12px; margin: 4px 0; }
.legend .range { display: flex; justify-content: space-between; }
.summary { bottom: 24px; left: 10px; }
.summary td { padding: 0 6px; }
"#;

const SCRIPT: &str = r#"
const map = L.map('map').setView(view.center, view.zoom);
L.tileLayer(view.tiles, { attribution: view.attribution, maxZoom: 19 }).addTo(map);
L.geoJSON(layers, {
  style: (f) => ({ color: f.properties.color, weight: view.weight, opacity: view.opacity }),
  pointToLayer: (f, latlng) => f.properties.kind === 'event'
    ? L.circleMarker(latlng, { radius: 5, color: '#ff0000', fill: true, fillColor: '#ff6600', fillOpacity: 0.8 })
    : L.marker(latlng, { title: f.properties.tooltip }),
  onEachFeature: (f, layer) => {
    if (f.properties.popup) layer.bindPopup(f.properties.popup);
    if (f.properties.tooltip) layer.bindTooltip(f.properties.tooltip);
  },
}).addTo(map);
"#;

/// `<dir>/<stem>_<channel>_heatmap.html` next to the input log.
pub fn output_path(input: &Path, channel: Channel) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    input.with_file_name(format!("{stem}_{channel}_heatmap.html"))
}

/// Everything that ends up on the map for one run.
pub struct Heatmap<'a> {
    pub route: &'a Route,
    pub channel: Channel,
    pub gradient: &'a ColorGradient,
    pub segments: &'a [Segment],
    pub events: &'a [Event<'a>],
    pub rule: EventRule,
    pub summary: &'a Summary,
    pub map: &'a MapConfig,
}

impl Heatmap<'_> {
    pub fn features(&self) -> FeatureCollection {
        let mut features = Vec::with_capacity(self.segments.len() + self.events.len() + 2);

        for segment in self.segments {
            let mut properties = JsonObject::new();
            properties.insert("kind".into(), json!("segment"));
            properties.insert("color".into(), json!(segment.color.to_string()));
            properties.insert("value".into(), json!(segment.value));
            features.push(feature(Value::from(&segment.line), properties));
        }

        for event in self.events {
            let mut properties = JsonObject::new();
            properties.insert("kind".into(), json!("event"));
            properties.insert("index".into(), json!(event.index));
            properties.insert("popup".into(), json!(event_popup(event, self.rule).into_string()));
            properties.insert("tooltip".into(), json!(self.rule.to_string()));
            features.push(feature(Value::from(&event.sample.point()), properties));
        }

        for (kind, title, sample) in [
            ("start", "START", self.route.start()),
            ("finish", "FINISH", self.route.finish()),
        ] {
            let popup = html! { b { (title) } }.into_string();
            let mut properties = JsonObject::new();
            properties.insert("kind".into(), json!(kind));
            properties.insert("popup".into(), json!(popup));
            properties.insert("tooltip".into(), json!(title));
            features.push(feature(Value::from(&sample.point()), properties));
        }

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }

    pub fn to_html(&self) -> String {
        let start = self.route.start();
        let view = json!({
            "center": [start.latitude, start.longitude],
            "zoom": self.map.zoom,
            "tiles": self.map.tiles,
            "attribution": self.map.attribution,
            "weight": self.map.line_weight,
            "opacity": self.map.line_opacity,
        });
        let data = format!(
            "const layers = {};\nconst view = {};\n",
            script_safe(&GeoJson::from(self.features()).to_string()),
            script_safe(&view.to_string()),
        );
        let title = format!("{} telemetry map", self.channel.caption());

        html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="utf-8";
                    meta name="viewport" content="width=device-width, initial-scale=1";
                    title { (title) }
                    link rel="stylesheet" href=(LEAFLET_CSS);
                    script src=(LEAFLET_JS) {}
                    style { (PreEscaped(STYLE)) }
                }
                body {
                    div #map {}
                    (self.legend())
                    (self.summary_panel())
                    script { (PreEscaped(data)) (PreEscaped(SCRIPT)) }
                }
            }
        }
        .into_string()
    }

    fn legend(&self) -> Markup {
        html! {
            div .panel .legend {
                b { (self.channel.caption()) }
                div .bar style={ "background: " (self.gradient.css()) } {}
                div .range {
                    span { (self.gradient.vmin().to_string()) }
                    span { (self.gradient.vmax().to_string()) }
                }
            }
        }
    }

    fn summary_panel(&self) -> Markup {
        let s = self.summary;
        html! {
            div .panel .summary {
                table {
                    tr { td { "RPM" } td { (format!("{:.0} - {:.0} (avg {:.0})", s.rpm.min, s.rpm.max, s.rpm.avg)) } }
                    tr { td { "Speed" } td { (format!("{:.1} - {:.1} km/h (avg {:.1})", s.speed.min, s.speed.max, s.speed.avg)) } }
                    tr { td { "Ax" } td { (format!("{:.2} - {:.2}g (avg {:.2})", s.ax.min, s.ax.max, s.ax.avg)) } }
                    tr { td { "VTEC" } td { (s.vtec_engagements) " engagements" } }
                    tr { td { "Distance" } td { (format!("{:.2} km", s.distance_m / 1000.0)) } }
                    tr { td { "Duration" } td { (format!("{:.1} s", s.duration_ms as f64 / 1000.0)) } }
                    tr { td { "GPS" } td { (self.route.len()) "/" (self.route.raw_len()) " valid points" } }
                    tr { td { "Markers" } td { (self.events.len()) " (" (self.rule.to_string()) ")" } }
                }
            }
        }
    }
}

fn feature(value: Value, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn event_popup(event: &Event<'_>, rule: EventRule) -> Markup {
    html! {
        b { (rule.to_string()) } br;
        @for (name, value) in event.label() {
            (name) ": " b { (value) } br;
        }
    }
}

// JSON inside <script> must not be able to close the element
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}

/// Replaces whatever is at `path`.
pub fn write(path: &Path, html: &str) -> Result<(), TelemetryError> {
    fs::write(path, html).map_err(|source| TelemetryError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        events::{annotate, Trigger},
        segment::segments,
        telemetry::tests::sample,
    };

    #[test]
    fn derived_output_path() {
        assert_eq!(
            output_path(Path::new("data/robust_drive.csv"), Channel::Rpm),
            PathBuf::from("data/robust_drive_RPM_heatmap.html")
        );
        assert_eq!(
            output_path(Path::new("/sd/01271530.CSV"), Channel::Speed),
            PathBuf::from("/sd/01271530_Spd_heatmap.html")
        );
        assert_eq!(
            output_path(Path::new("drive"), Channel::LongitudinalG),
            PathBuf::from("drive_Ax_heatmap.html")
        );
    }

    fn render(rpms: &[u32]) -> (FeatureCollection, String) {
        let samples = rpms
            .iter()
            .enumerate()
            .map(|(i, &rpm)| sample(i as u64 * 500, 43.0 + i as f64 * 1e-4, -81.27, rpm))
            .collect();
        let route = Route::from_samples(samples).unwrap();
        let gradient = Channel::Rpm.default_gradient();
        let segments = segments(&route, Channel::Rpm, &gradient);
        let rule = EventRule {
            trigger: Trigger::Rpm,
            threshold: 5150,
        };
        let events = annotate(&route, &rule);
        let summary = route.summary();
        let map = MapConfig::default();
        let heatmap = Heatmap {
            route: &route,
            channel: Channel::Rpm,
            gradient: &gradient,
            segments: &segments,
            events: &events,
            rule,
            summary: &summary,
            map: &map,
        };
        (heatmap.features(), heatmap.to_html())
    }

    fn kinds(features: &FeatureCollection) -> Vec<String> {
        features
            .features
            .iter()
            .map(|f| f.property("kind").unwrap().as_str().unwrap().to_owned())
            .collect()
    }

    #[test]
    fn layers() {
        let (features, _) = render(&[1000, 5200, 6800, 3000]);
        assert_eq!(
            kinds(&features),
            vec!["segment", "segment", "segment", "event", "event", "start", "finish"]
        );
        assert_eq!(
            features.features[0].property("color").unwrap(),
            &json!("#49ff00")
        );
        let popup = features.features[3].property("popup").unwrap().as_str().unwrap();
        assert!(popup.contains("RPM: <b>5200</b>"));
    }

    #[test]
    fn single_point_has_no_path() {
        let (features, html) = render(&[1000]);
        assert_eq!(kinds(&features), vec!["start", "finish"]);
        assert!(html.contains("const layers = "));
    }

    #[test]
    fn page() {
        let (_, html) = render(&[1000, 5200, 6800]);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Engine RPM"));
        assert!(html.contains("linear-gradient(to right, #00ff00 0.0%"));
        assert!(html.contains(LEAFLET_JS));
        assert!(html.contains("3/3 valid points"));

        // popups are escaped so they cannot end the script element early
        let script = html.split("const layers = ").nth(1).unwrap();
        let data = script.split("const map").next().unwrap();
        assert!(!data.contains("</"));
        assert!(data.contains("<\\/b>"));
    }

    #[test]
    fn overwrites() {
        let path = crate::telemetry::tests::temp_path("overwrite.html");
        write(&path, "first run, longer content").unwrap();
        write(&path, "second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        fs::remove_file(&path).unwrap();
    }
}
