//! Builders shared by unit tests

use chrono::{DateTime, TimeZone, Utc};
use tracing_subscriber::EnvFilter;

use crate::ml::elements::checksum;
use crate::ml::features::{FeatureVector, NUM_FEATURES};
use crate::models::OrbitalRecord;

/// Route `tracing` output through the test harness; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Noon on 1 July of `year`
pub fn at_year(year: i32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, 7, 1, 12, 0, 0).unwrap()
}

/// Build a record with valid checksums. Angles in degrees, mean motion in rev/day.
#[allow(clippy::too_many_arguments)]
pub fn geo_record(
    catalog_number: u32,
    inclination: f64,
    raan: f64,
    eccentricity: f64,
    arg_perigee: f64,
    mean_anomaly: f64,
    revs_per_day: f64,
    launch_yy: u32,
) -> OrbitalRecord {
    let line1 = format!(
        "1 {:05}U {:02}{:03}A   {:02}{:012.8}  .00000100  00000-0  00000-0 0  999",
        catalog_number,
        launch_yy % 100,
        1,
        25,
        23.5,
    );
    let ecc_digits = (eccentricity * 1e7).round() as u32;
    let line2 = format!(
        "2 {:05} {:8.4} {:8.4} {:07} {:8.4} {:8.4} {:11.8}{:05}",
        catalog_number, inclination, raan, ecc_digits, arg_perigee, mean_anomaly, revs_per_day, 1234,
    );

    OrbitalRecord::new(
        format!("OBJECT {}", catalog_number),
        format!("{}{}", line1, checksum(&line1)),
        format!("{}{}", line2, checksum(&line2)),
    )
}

/// Deterministic pseudo-random value in [0, 1) for index `i`
fn jitter(i: usize, salt: u32) -> f32 {
    let x = (i as u32).wrapping_mul(2_654_435_761).wrapping_add(salt.wrapping_mul(40_503));
    (x % 10_000) as f32 / 10_000.0
}

/// A nominal station-kept geostationary vector
pub fn nominal_geo(i: usize) -> FeatureVector {
    let tau = std::f32::consts::TAU;
    let features: [f32; NUM_FEATURES] = [
        0.0005 + 0.001 * jitter(i, 1),
        0.0005 + 0.0001 * jitter(i, 2),
        rad_per_min(1.0027 + 0.0002 * jitter(i, 3)),
        tau * jitter(i, 4),
        tau * jitter(i, 5),
        tau * jitter(i, 6),
        (i % 12) as f32,
    ];
    FeatureVector::new(10_000 + i as u32, features)
}

/// 50 nominal geostationary vectors
pub fn geo_training_set() -> Vec<FeatureVector> {
    (0..50).map(nominal_geo).collect()
}

/// Inclined, drifting object: 8.2 degrees, 0.984 rev/day
pub fn geo_outlier() -> FeatureVector {
    FeatureVector::new(
        99_999,
        [8.2f32.to_radians(), 0.0005, rad_per_min(0.984), 1.0, 2.0, 3.0, 4.0],
    )
}

fn rad_per_min(revs_per_day: f32) -> f32 {
    revs_per_day * std::f32::consts::TAU / 1440.0
}
