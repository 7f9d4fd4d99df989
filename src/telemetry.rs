//! Loading black-box CSV logs and deriving the drivable route from them.

use std::{fs::File, io, path::Path};

use geo::{Distance, Haversine, Point};
use serde::{de, Deserialize, Deserializer};

use crate::error::TelemetryError;

/// Column order written by the logger.
pub const HEADER: [&str; 10] = [
    "Time", "Ax", "Ay", "Az", "Lat", "Lon", "Spd", "RPM", "Throttle", "VTEC",
];

/// One row of a log, sampled at a fixed rate.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TelemetrySample {
    #[serde(rename = "Time")]
    pub time_ms: u64,
    /// longitudinal acceleration (g)
    #[serde(rename = "Ax")]
    pub ax: f64,
    /// lateral acceleration (g)
    #[serde(rename = "Ay")]
    pub ay: f64,
    /// vertical acceleration (g)
    #[serde(rename = "Az")]
    pub az: f64,
    #[serde(rename = "Lat")]
    pub latitude: f64,
    #[serde(rename = "Lon")]
    pub longitude: f64,
    // the firmware writes one decimal, the simulator whole km/h
    #[serde(rename = "Spd")]
    pub speed: f64,
    #[serde(rename = "RPM")]
    pub rpm: u32,
    #[serde(rename = "Throttle")]
    pub throttle: f64,
    #[serde(rename = "VTEC", deserialize_with = "flag")]
    pub vtec: bool,
}

impl TelemetrySample {
    /// The logger writes 0,0 while the GPS has no fix.
    pub fn has_fix(&self) -> bool {
        self.latitude != 0.0 && self.longitude != 0.0
    }

    pub fn point(&self) -> Point {
        Point::new(self.longitude, self.latitude)
    }
}

fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match u8::deserialize(deserializer)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(de::Error::invalid_value(
            de::Unexpected::Unsigned(other.into()),
            &"0 or 1",
        )),
    }
}

pub fn load(path: &Path) -> Result<Vec<TelemetrySample>, TelemetryError> {
    let file = File::open(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => TelemetryError::FileNotFound(path.to_path_buf()),
        _ => TelemetryError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let parse_error = |source| TelemetryError::Parse {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_reader(file);
    let mut output = Vec::new();
    for result in reader.deserialize() {
        let sample: TelemetrySample = result.map_err(parse_error)?;
        output.push(sample);
    }

    Ok(output)
}

/// Samples with a valid GPS fix, in log order. Never empty.
#[derive(Debug, Clone)]
pub struct Route {
    samples: Vec<TelemetrySample>,
    raw_len: usize,
}

impl Route {
    pub fn from_samples(samples: Vec<TelemetrySample>) -> Result<Self, TelemetryError> {
        let raw_len = samples.len();
        let samples: Vec<_> = samples.into_iter().filter(|s| s.has_fix()).collect();
        if samples.is_empty() {
            return Err(TelemetryError::NoValidData);
        }

        Ok(Self { samples, raw_len })
    }

    pub fn samples(&self) -> &[TelemetrySample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Number of rows before filtering.
    pub fn raw_len(&self) -> usize {
        self.raw_len
    }

    pub fn start(&self) -> &TelemetrySample {
        &self.samples[0]
    }

    pub fn finish(&self) -> &TelemetrySample {
        &self.samples[self.samples.len() - 1]
    }

    pub fn summary(&self) -> Summary {
        let samples = &self.samples;
        let vtec_engagements = samples
            .windows(2)
            .filter(|w| !w[0].vtec && w[1].vtec)
            .count()
            + usize::from(samples[0].vtec);
        let distance_m: f64 = samples
            .windows(2)
            .map(|w| Haversine::distance(w[0].point(), w[1].point()))
            .sum();

        Summary {
            rpm: Stat::of(samples.iter().map(|s| s.rpm as f64)),
            speed: Stat::of(samples.iter().map(|s| s.speed)),
            ax: Stat::of(samples.iter().map(|s| s.ax)),
            vtec_samples: samples.iter().filter(|s| s.vtec).count(),
            vtec_engagements,
            distance_m,
            duration_ms: self.finish().time_ms.saturating_sub(self.start().time_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stat {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl Stat {
    fn of(values: impl Iterator<Item = f64>) -> Self {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut count = 0usize;
        for v in values {
            min = min.min(v);
            max = max.max(v);
            sum += v;
            count += 1;
        }
        let avg = if count == 0 { 0.0 } else { sum / count as f64 };
        Self { min, max, avg }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub rpm: Stat,
    pub speed: Stat,
    pub ax: Stat,
    /// samples logged with VTEC engaged
    pub vtec_samples: usize,
    /// rising edges of the VTEC flag
    pub vtec_engagements: usize,
    pub distance_m: f64,
    pub duration_ms: u64,
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{fs, path::PathBuf};

    use super::*;

    pub(crate) fn sample(time_ms: u64, latitude: f64, longitude: f64, rpm: u32) -> TelemetrySample {
        TelemetrySample {
            time_ms,
            ax: 0.1,
            ay: -0.2,
            az: 1.0,
            latitude,
            longitude,
            speed: rpm as f64 / 70.0,
            rpm,
            throttle: 50.0,
            vtec: rpm > 5150,
        }
    }

    pub(crate) fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("telemap-{}-{name}", std::process::id()))
    }

    #[test]
    fn filters_origin_sentinel() {
        let samples = vec![
            sample(0, 43.0095, -81.2735, 1000),
            sample(500, 0.0, 0.0, 5200),
            sample(1000, 43.0090, -81.2738, 6800),
            // half-zero fixes are dropped too
            sample(1500, 0.0, -81.2740, 6000),
            sample(2000, 43.0085, 0.0, 6000),
        ];
        let route = Route::from_samples(samples.clone()).unwrap();
        assert_eq!(route.len(), 2);
        assert_eq!(route.raw_len(), 5);
        assert_eq!(route.samples(), &[samples[0].clone(), samples[2].clone()]);
    }

    #[test]
    fn preserves_order() {
        let samples: Vec<_> = (0..20)
            .map(|i| {
                let lat = if i % 3 == 0 { 0.0 } else { 43.0 + i as f64 * 1e-4 };
                let lon = if i % 3 == 0 { 0.0 } else { -81.0 };
                sample(i * 500, lat, lon, 1000 + i as u32)
            })
            .collect();
        let route = Route::from_samples(samples).unwrap();
        let times: Vec<_> = route.samples().iter().map(|s| s.time_ms).collect();
        let expected: Vec<_> = (0..20u64).filter(|i| i % 3 != 0).map(|i| i * 500).collect();
        assert_eq!(times, expected);
    }

    #[test]
    fn no_valid_data() {
        let samples = vec![sample(0, 0.0, 0.0, 1000), sample(500, 0.0, 0.0, 1000)];
        assert!(matches!(
            Route::from_samples(samples),
            Err(TelemetryError::NoValidData)
        ));
        assert!(matches!(
            Route::from_samples(Vec::new()),
            Err(TelemetryError::NoValidData)
        ));
    }

    #[test]
    fn loads_csv() {
        let path = temp_path("loads.csv");
        fs::write(
            &path,
            "Time,Ax,Ay,Az,Lat,Lon,Spd,RPM,Throttle,VTEC\n\
             0,0.21,-0.03,1.02,43.009512,-81.273488,41,1523,31.4,0\n\
             500,0.35,0.01,0.98,43.009431,-81.273541,97.5,5321,88.0,1\n",
        )
        .unwrap();
        let samples = load(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].time_ms, 0);
        assert_eq!(samples[0].rpm, 1523);
        assert!(!samples[0].vtec);
        assert_eq!(samples[1].latitude, 43.009431);
        assert_eq!(samples[1].speed, 97.5);
        assert!(samples[1].vtec);
    }

    #[test]
    fn missing_file() {
        let path = temp_path("does-not-exist.csv");
        assert!(matches!(load(&path), Err(TelemetryError::FileNotFound(p)) if p == path));
    }

    #[test]
    fn malformed_rows() {
        let path = temp_path("malformed.csv");
        fs::write(
            &path,
            "Time,Ax,Ay,Az,Lat,Lon,Spd,RPM,Throttle,VTEC\n0,0.2,0.0,1.0,43.0,-81.0,40,abc,30.0,0\n",
        )
        .unwrap();
        let result = load(&path);
        fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(TelemetryError::Parse { .. })));

        let path = temp_path("bad-vtec.csv");
        fs::write(
            &path,
            "Time,Ax,Ay,Az,Lat,Lon,Spd,RPM,Throttle,VTEC\n0,0.2,0.0,1.0,43.0,-81.0,40,1000,30.0,2\n",
        )
        .unwrap();
        let result = load(&path);
        fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(TelemetryError::Parse { .. })));
    }

    #[test]
    fn summary() {
        let samples = vec![
            sample(0, 43.0, -81.0, 1000),
            sample(500, 43.001, -81.0, 5200),
            sample(1000, 43.002, -81.0, 6800),
            sample(1500, 43.003, -81.0, 4000),
            sample(2000, 43.004, -81.0, 6000),
        ];
        let summary = Route::from_samples(samples).unwrap().summary();
        assert_eq!(summary.rpm.min, 1000.0);
        assert_eq!(summary.rpm.max, 6800.0);
        assert_eq!(summary.rpm.avg, 4600.0);
        assert_eq!(summary.vtec_samples, 3);
        assert_eq!(summary.vtec_engagements, 2);
        assert_eq!(summary.duration_ms, 2000);
        // 0.004 degrees of latitude is roughly 445 m
        assert!((summary.distance_m - 445.0).abs() < 5.0);
    }
}
