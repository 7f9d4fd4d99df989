//! Synthetic test drives in the logger's CSV format.
//!
//! The route is a hand-traced loop around Western University (Western Rd,
//! Sarnia Rd, Richmond St and back), interpolated to the requested number of
//! points. RPM, G-force and throttle follow piecewise-linear profiles laid out
//! on a 500-sample timeline (about four minutes at 2 Hz) and are stretched to
//! fit when a different length is requested.

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::Normal;
use serde::Serialize;
use tracing::info;

use crate::events::VTEC_RPM;

const WAYPOINTS: [(f64, f64); 52] = [
    // Western Rd, heading south
    (43.0095, -81.2735),
    (43.0090, -81.2738),
    (43.0085, -81.2741),
    (43.0080, -81.2744),
    (43.0075, -81.2747),
    (43.0070, -81.2750),
    // right onto Sarnia Rd
    (43.0068, -81.2753),
    (43.0066, -81.2758),
    (43.0064, -81.2765),
    (43.0062, -81.2773),
    (43.0060, -81.2780),
    (43.0058, -81.2788),
    (43.0056, -81.2795),
    (43.0054, -81.2802),
    (43.0052, -81.2808),
    (43.0050, -81.2815),
    // left onto Richmond St
    (43.0047, -81.2817),
    (43.0043, -81.2818),
    (43.0038, -81.2819),
    (43.0033, -81.2820),
    (43.0028, -81.2821),
    (43.0023, -81.2822),
    (43.0018, -81.2822),
    (43.0013, -81.2822),
    (43.0008, -81.2822),
    (43.0003, -81.2822),
    // loop back
    (43.0000, -81.2820),
    (42.9998, -81.2816),
    (42.9997, -81.2811),
    (42.9996, -81.2805),
    // north on Proudfoot Ln
    (42.9997, -81.2799),
    (42.9999, -81.2793),
    (43.0002, -81.2787),
    (43.0006, -81.2781),
    (43.0010, -81.2775),
    // back onto Western Rd
    (43.0015, -81.2770),
    (43.0020, -81.2765),
    (43.0025, -81.2760),
    (43.0030, -81.2755),
    (43.0035, -81.2750),
    (43.0040, -81.2746),
    (43.0045, -81.2742),
    (43.0050, -81.2739),
    (43.0055, -81.2737),
    (43.0060, -81.2736),
    (43.0065, -81.2735),
    (43.0070, -81.2735),
    (43.0075, -81.2735),
    (43.0080, -81.2735),
    (43.0085, -81.2735),
    (43.0090, -81.2735),
    (43.0095, -81.2735),
];

/// `(samples, from, to)`: a linear ramp over `samples` points, both ends included.
type Profile = &'static [(usize, f64, f64)];

const RPM_PROFILE: Profile = &[
    (50, 1500.0, 3500.0), // 1st gear
    (50, 3500.0, 6500.0),
    (50, 3000.0, 5800.0), // 2nd
    (50, 5800.0, 3500.0), // braking
    (50, 3500.0, 4000.0), // apex
    (30, 4000.0, 5200.0),
    (70, 5200.0, 6800.0), // full throttle pull
    (20, 6800.0, 4500.0),
    (30, 4500.0, 6500.0),
    (50, 6500.0, 2500.0), // engine braking
    (50, 2500.0, 1500.0),
];

const AX_PROFILE: Profile = &[
    (150, 0.2, 0.6),
    (50, 0.6, -0.7), // hard braking
    (50, 0.0, 0.0),
    (100, 0.4, 0.8),
    (50, 0.5, -0.4),
    (100, 0.0, 0.0),
];

const AY_PROFILE: Profile = &[
    (150, 0.0, 0.0),
    (50, 0.0, 0.6), // right hander
    (50, 0.6, 0.0),
    (150, 0.0, 0.0),
    (50, 0.0, -0.5), // left hander
    (50, -0.5, 0.0),
];

const THROTTLE_PROFILE: Profile = &[
    (150, 30.0, 80.0),
    (50, 80.0, 0.0),
    (50, 0.0, 0.0),
    (100, 50.0, 100.0), // wide open
    (50, 100.0, 20.0),
    (100, 20.0, 10.0),
];

#[derive(Debug, Clone)]
pub struct SimParams {
    pub points: usize,
    pub interval_ms: u64,
    pub seed: u64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            points: 500,
            interval_ms: 500,
            seed: 0,
        }
    }
}

/// One output row, serialized under the logger's column names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimRow {
    #[serde(rename = "Time")]
    pub time_ms: u64,
    #[serde(rename = "Ax")]
    pub ax: f64,
    #[serde(rename = "Ay")]
    pub ay: f64,
    #[serde(rename = "Az")]
    pub az: f64,
    #[serde(rename = "Lat")]
    pub latitude: f64,
    #[serde(rename = "Lon")]
    pub longitude: f64,
    #[serde(rename = "Spd")]
    pub speed: u32,
    #[serde(rename = "RPM")]
    pub rpm: u32,
    #[serde(rename = "Throttle")]
    pub throttle: f64,
    #[serde(rename = "VTEC")]
    pub vtec: u8,
}

fn ramp(from: f64, to: f64, n: usize) -> impl Iterator<Item = f64> {
    let last = n.saturating_sub(1).max(1) as f64;
    (0..n).map(move |i| from + (to - from) * i as f64 / last)
}

fn expand(profile: Profile) -> Vec<f64> {
    profile
        .iter()
        .flat_map(|&(n, from, to)| ramp(from, to, n))
        .collect()
}

/// Linearly resamples `values` to `n` evenly spaced positions, keeping both ends.
fn stretch(values: &[f64], n: usize) -> Vec<f64> {
    let last = (values.len() - 1) as f64;
    ramp(0.0, last, n)
        .map(|x| {
            let i = (x.floor() as usize).min(values.len() - 1);
            let frac = x - i as f64;
            match values.get(i + 1) {
                Some(next) if frac > 0.0 => values[i] + (next - values[i]) * frac,
                _ => values[i],
            }
        })
        .collect()
}

fn noise(rng: &mut StdRng, mean: f64, std_dev: f64, n: usize) -> Result<Vec<f64>> {
    let normal = Normal::new(mean, std_dev)?;
    Ok((0..n).map(|_| rng.sample(normal)).collect())
}

fn round(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

pub fn generate(params: &SimParams) -> Result<Vec<SimRow>> {
    let n = params.points;
    if n == 0 {
        bail!("at least one point is required");
    }
    if (n as u64 - 1).checked_mul(params.interval_ms).is_none() {
        bail!(
            "{n} points at {}ms intervals overflow the timestamp",
            params.interval_ms
        );
    }
    let mut rng = StdRng::seed_from_u64(params.seed);

    let lats: Vec<f64> = WAYPOINTS.iter().map(|w| w.0).collect();
    let lons: Vec<f64> = WAYPOINTS.iter().map(|w| w.1).collect();
    let lats = stretch(&lats, n);
    let lons = stretch(&lons, n);
    let rpm = stretch(&expand(RPM_PROFILE), n);
    let ax = stretch(&expand(AX_PROFILE), n);
    let ay = stretch(&expand(AY_PROFILE), n);
    let throttle = stretch(&expand(THROTTLE_PROFILE), n);

    // about a metre of GPS jitter
    let lat_noise = noise(&mut rng, 0.0, 0.00001, n)?;
    let lon_noise = noise(&mut rng, 0.0, 0.00001, n)?;
    let rpm_noise = noise(&mut rng, 0.0, 50.0, n)?;
    let speed_noise = noise(&mut rng, 20.0, 5.0, n)?;
    let ax_noise = noise(&mut rng, 0.0, 0.05, n)?;
    let ay_noise = noise(&mut rng, 0.0, 0.03, n)?;
    let az_noise = noise(&mut rng, 1.0, 0.05, n)?;
    let throttle_noise = noise(&mut rng, 0.0, 5.0, n)?;

    let rows = (0..n)
        .map(|i| {
            let rpm = (rpm[i] + rpm_noise[i]).clamp(800.0, 7000.0) as u32;
            let speed = (rpm as f64 / 70.0 + speed_noise[i]).clamp(0.0, 140.0) as u32;
            SimRow {
                time_ms: i as u64 * params.interval_ms,
                ax: round((ax[i] + ax_noise[i]).clamp(-1.0, 1.0), 2),
                ay: round((ay[i] + ay_noise[i]).clamp(-1.0, 1.0), 2),
                az: round(az_noise[i].clamp(0.0, 2.0), 2),
                latitude: round(lats[i] + lat_noise[i], 6),
                longitude: round(lons[i] + lon_noise[i], 6),
                speed,
                rpm,
                throttle: round((throttle[i] + throttle_noise[i]).clamp(0.0, 100.0), 1),
                vtec: u8::from(rpm > VTEC_RPM),
            }
        })
        .collect();

    Ok(rows)
}

pub fn write(path: &Path, rows: &[SimRow]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

pub fn run(params: &SimParams, output: &Path) -> Result<()> {
    let rows = generate(params)?;

    let (first, last) = (&rows[0], &rows[rows.len() - 1]);
    info!(
        "Generated {} GPS coordinates from [{:.6}, {:.6}] to [{:.6}, {:.6}]",
        rows.len(),
        first.latitude,
        first.longitude,
        last.latitude,
        last.longitude
    );

    let rpm_min = rows.iter().map(|r| r.rpm).min().unwrap_or_default();
    let rpm_max = rows.iter().map(|r| r.rpm).max().unwrap_or_default();
    let rpm_avg = rows.iter().map(|r| r.rpm as f64).sum::<f64>() / rows.len() as f64;
    info!("RPM min {rpm_min}, max {rpm_max}, avg {rpm_avg:.0}");

    let engagements = rows.windows(2).filter(|w| w[0].vtec == 0 && w[1].vtec == 1).count();
    info!("VTEC engagements: {engagements}");

    write(output, &rows)?;
    info!(
        "Data saved to {} ({:.1} s of driving)",
        output.display(),
        last.time_ms as f64 / 1000.0
    );

    Ok(())
}
