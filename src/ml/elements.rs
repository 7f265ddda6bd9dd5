//! Two-line element set decoding
//!
//! Reads the fixed-column element-set format into the mean orbital elements
//! the feature extractor works from. Angles come out in radians and mean
//! motion in radians per minute.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::ElementSetError;

/// Minimum line length including the checksum column
pub const TLE_LINE_LEN: usize = 69;

/// Two-digit years below this pivot belong to the 2000s
const YEAR_PIVOT: u32 = 57;

const DEG_TO_RAD: f64 = PI / 180.0;
const MINUTES_PER_DAY: f64 = 1440.0;

/// Decoded mean orbital elements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitalElements {
    /// Catalog (NORAD) number
    pub catalog_number: u32,
    /// Launch year from the international designator, if present
    pub launch_year: Option<i32>,
    /// Full epoch year
    pub epoch_year: i32,
    /// Fractional day of year at epoch
    pub epoch_day: f64,
    /// Inclination (rad)
    pub inclination: f64,
    /// Right ascension of the ascending node (rad)
    pub raan: f64,
    /// Eccentricity
    pub eccentricity: f64,
    /// Argument of perigee (rad)
    pub arg_perigee: f64,
    /// Mean anomaly (rad)
    pub mean_anomaly: f64,
    /// Mean motion (rad/min)
    pub mean_motion: f64,
}

impl OrbitalElements {
    /// Decode a two-line element set
    pub fn from_tle(line1: &str, line2: &str, verify_checksum: bool) -> Result<Self, ElementSetError> {
        let line1 = line1.trim_end();
        let line2 = line2.trim_end();
        check_line(line1, 1, verify_checksum)?;
        check_line(line2, 2, verify_checksum)?;

        let catalog_number = parse_u32(&line1[2..7], "catalog_number")?;
        let catalog_line2 = parse_u32(&line2[2..7], "catalog_number")?;
        if catalog_number != catalog_line2 {
            return Err(ElementSetError::CatalogMismatch {
                line1: catalog_number,
                line2: catalog_line2,
            });
        }

        let designator_year = line1[9..11].trim();
        let launch_year = if designator_year.is_empty() {
            None
        } else {
            Some(full_year(parse_u32(designator_year, "launch_year")?))
        };

        let epoch_year = full_year(parse_u32(&line1[18..20], "epoch_year")?);
        let epoch_day = parse_f64(&line1[20..32], "epoch_day")?;

        let inclination = parse_f64(&line2[8..16], "inclination")?;
        let raan = parse_f64(&line2[17..25], "raan")?;
        let eccentricity = parse_implied_decimal(&line2[26..33], "eccentricity")?;
        let arg_perigee = parse_f64(&line2[34..42], "arg_perigee")?;
        let mean_anomaly = parse_f64(&line2[43..51], "mean_anomaly")?;
        let revs_per_day = parse_f64(&line2[52..63], "mean_motion")?;

        if !(0.0..=180.0).contains(&inclination) {
            return Err(ElementSetError::OutOfRange {
                field: "inclination",
                value: inclination,
            });
        }
        if eccentricity >= 1.0 {
            return Err(ElementSetError::OutOfRange {
                field: "eccentricity",
                value: eccentricity,
            });
        }
        if revs_per_day <= 0.0 {
            return Err(ElementSetError::OutOfRange {
                field: "mean_motion",
                value: revs_per_day,
            });
        }

        Ok(Self {
            catalog_number,
            launch_year,
            epoch_year,
            epoch_day,
            inclination: inclination * DEG_TO_RAD,
            raan: raan * DEG_TO_RAD,
            eccentricity,
            arg_perigee: arg_perigee * DEG_TO_RAD,
            mean_anomaly: mean_anomaly * DEG_TO_RAD,
            mean_motion: revs_per_day * 2.0 * PI / MINUTES_PER_DAY,
        })
    }
}

/// Mod-10 checksum over the first 68 columns: digits count at face value,
/// minus signs count as one, everything else is ignored.
pub fn checksum(line: &str) -> u8 {
    let sum: u32 = line
        .bytes()
        .take(TLE_LINE_LEN - 1)
        .map(|b| match b {
            b'0'..=b'9' => (b - b'0') as u32,
            b'-' => 1,
            _ => 0,
        })
        .sum();
    (sum % 10) as u8
}

fn check_line(line: &str, number: u8, verify_checksum: bool) -> Result<(), ElementSetError> {
    if !line.is_ascii() {
        return Err(ElementSetError::NonAscii { line: number });
    }
    if line.len() < TLE_LINE_LEN {
        return Err(ElementSetError::LineTooShort {
            line: number,
            got: line.len(),
        });
    }
    if line.as_bytes()[0] != b'0' + number {
        return Err(ElementSetError::WrongLineNumber { line: number });
    }

    if verify_checksum {
        let found_char = line.as_bytes()[TLE_LINE_LEN - 1];
        if !found_char.is_ascii_digit() {
            return Err(ElementSetError::Field {
                field: "checksum",
                value: (found_char as char).to_string(),
            });
        }
        let found = found_char - b'0';
        let expected = checksum(line);
        if found != expected {
            return Err(ElementSetError::Checksum {
                line: number,
                expected,
                found,
            });
        }
    }

    Ok(())
}

fn full_year(two_digit: u32) -> i32 {
    if two_digit < YEAR_PIVOT {
        2000 + two_digit as i32
    } else {
        1900 + two_digit as i32
    }
}

fn parse_u32(raw: &str, field: &'static str) -> Result<u32, ElementSetError> {
    raw.trim().parse().map_err(|_| ElementSetError::Field {
        field,
        value: raw.to_string(),
    })
}

fn parse_f64(raw: &str, field: &'static str) -> Result<f64, ElementSetError> {
    let value: f64 = raw.trim().parse().map_err(|_| ElementSetError::Field {
        field,
        value: raw.to_string(),
    })?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ElementSetError::Field {
            field,
            value: raw.to_string(),
        })
    }
}

fn parse_implied_decimal(raw: &str, field: &'static str) -> Result<f64, ElementSetError> {
    let digits = raw.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ElementSetError::Field {
            field,
            value: raw.to_string(),
        });
    }
    parse_f64(&format!("0.{}", digits), field)
}
