use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::predict::error::PredictError;

/// Seconds since the Unix epoch.
pub type Timestamp = f64;

/// The satellite as seen from the station at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookAngles {
    pub time: Timestamp,
    pub norad_id: u64,
    pub name: Option<String>,
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub slant_range_km: f64,
    pub range_rate_km_s: f64,
    pub orbital_velocity_km_s: f64,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_km: f64,
    pub footprint_km: f64,
    pub doppler_100mhz_hz: f64,
}

/// Raw bounds of one pass as reported by the window finder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PassWindow {
    pub start: Timestamp,
    pub end: Timestamp,
}

/// Analyzed view of a transit, used for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct TransitSummary {
    pub satellite: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_seconds: f64,
    pub azimuth_start_deg: f64,
    pub azimuth_end_deg: f64,
    pub heading_deg: f64,
    pub peak_time: DateTime<Utc>,
    pub peak_elevation_deg: f64,
    pub peak_azimuth_deg: f64,
    pub peak_angular_rate_deg_s: f64,
}

pub fn to_datetime(time: Timestamp) -> Result<DateTime<Utc>, PredictError> {
    if !time.is_finite() {
        return Err(PredictError::InvalidTime(time));
    }
    let secs = time.floor();
    let nanos = (((time - secs) * 1e9).round() as u32).min(999_999_999);
    DateTime::from_timestamp(secs as i64, nanos).ok_or(PredictError::InvalidTime(time))
}

pub fn from_datetime(datetime: DateTime<Utc>) -> Timestamp {
    datetime.timestamp() as f64 + f64::from(datetime.timestamp_subsec_nanos()) * 1e-9
}

pub fn now() -> Timestamp {
    from_datetime(Utc::now())
}
