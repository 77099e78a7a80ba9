use chrono::NaiveDateTime;
use sgp4::{Constants, Elements};

use crate::predict::error::PredictError;
use crate::predict::ground_station::{
    ecef_to_geodetic, StationCoordinates, EARTH_EQUATORIAL_RADIUS_KM, EARTH_ROTATION_RAD_S,
};
use crate::predict::pass_finder;
use crate::predict::types::{to_datetime, LookAngles, PassWindow, Timestamp};
use crate::predict::OrbitalElements;

pub const SPEED_OF_LIGHT_KM_S: f64 = 299_792.458;
const DOPPLER_REFERENCE_HZ: f64 = 100.0e6;

/// Source of look angles for a satellite seen from a station.
///
/// Everything in [`crate::predict::Transit`] is written against this trait,
/// so the analysis can be driven by SGP4 or by an analytic model in tests.
pub trait Propagator {
    /// Look angles at `time`.
    fn observe_at(
        &self,
        elements: &OrbitalElements,
        station: &StationCoordinates,
        time: Timestamp,
    ) -> Result<LookAngles, PredictError>;

    /// The next pass ending strictly after `after`. A pass already in
    /// progress at `after` is returned whole.
    fn find_pass_window(
        &self,
        elements: &OrbitalElements,
        station: &StationCoordinates,
        after: Timestamp,
    ) -> Result<PassWindow, PredictError>;
}

/// SGP4/SDP4 propagation through the `sgp4` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sgp4Propagator;

impl Sgp4Propagator {
    pub fn new() -> Self {
        Self
    }
}

impl Propagator for Sgp4Propagator {
    fn observe_at(
        &self,
        elements: &OrbitalElements,
        station: &StationCoordinates,
        time: Timestamp,
    ) -> Result<LookAngles, PredictError> {
        let (elements, constants) = elements.to_sgp4()?;
        propagate_sample(station, &elements, &constants, time)
    }

    fn find_pass_window(
        &self,
        elements: &OrbitalElements,
        station: &StationCoordinates,
        after: Timestamp,
    ) -> Result<PassWindow, PredictError> {
        let (elements, constants) = elements.to_sgp4()?;
        pass_finder::find_pass_window(station, &elements, &constants, after)
    }
}

pub(crate) fn propagate_sample(
    station: &StationCoordinates,
    elements: &Elements,
    constants: &Constants,
    time: Timestamp,
) -> Result<LookAngles, PredictError> {
    let timestamp: NaiveDateTime = to_datetime(time)?.naive_utc();
    let minutes = elements
        .datetime_to_minutes_since_epoch(&timestamp)
        .map_err(|e| PredictError::Propagation(e.to_string()))?;

    let prediction = constants.propagate(minutes).map_err(|e| {
        PredictError::Propagation(format!("NORAD {} at {:.3}: {}", elements.norad_id, time, e))
    })?;

    let sidereal = sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(&timestamp));

    let sat_ecef = teme_to_ecef_position(prediction.position, sidereal);
    let sat_vel_ecef = teme_to_ecef_velocity(prediction.position, prediction.velocity, sidereal);

    let sta_ecef = station.position_ecef_km();
    let sta_vel = station.velocity_ecef_km_s();

    let dr = [
        sat_ecef[0] - sta_ecef[0],
        sat_ecef[1] - sta_ecef[1],
        sat_ecef[2] - sta_ecef[2],
    ];
    let range_km = norm(dr);

    let enu = ecef_to_enu(dr, station.lat_rad(), station.lon_rad());
    let azimuth = enu.0.atan2(enu.1).to_degrees().rem_euclid(360.0);
    let elevation = if range_km > 0.0 {
        (enu.2 / range_km).asin().to_degrees()
    } else {
        0.0
    };

    let los_unit = if range_km > 0.0 {
        [dr[0] / range_km, dr[1] / range_km, dr[2] / range_km]
    } else {
        [0.0, 0.0, 0.0]
    };
    let rel_vel = [
        sat_vel_ecef[0] - sta_vel[0],
        sat_vel_ecef[1] - sta_vel[1],
        sat_vel_ecef[2] - sta_vel[2],
    ];
    let range_rate_km_s =
        rel_vel[0] * los_unit[0] + rel_vel[1] * los_unit[1] + rel_vel[2] * los_unit[2];

    let (latitude_deg, longitude_deg, altitude_km) = ecef_to_geodetic(sat_ecef);

    Ok(LookAngles {
        time,
        norad_id: elements.norad_id,
        name: elements.object_name.clone(),
        azimuth_deg: azimuth,
        elevation_deg: elevation,
        slant_range_km: range_km,
        range_rate_km_s,
        orbital_velocity_km_s: norm(prediction.velocity),
        latitude_deg,
        longitude_deg,
        altitude_km,
        footprint_km: footprint_km(altitude_km),
        doppler_100mhz_hz: doppler_shift(DOPPLER_REFERENCE_HZ, range_rate_km_s),
    })
}

/// Diameter of the area from which the satellite is above the horizon.
pub fn footprint_km(altitude_km: f64) -> f64 {
    if altitude_km <= 0.0 {
        return 0.0;
    }
    2.0 * EARTH_EQUATORIAL_RADIUS_KM
        * (EARTH_EQUATORIAL_RADIUS_KM / (EARTH_EQUATORIAL_RADIUS_KM + altitude_km)).acos()
}

/// Frequency offset seen on the ground for a carrier at `freq_hz`.
pub fn doppler_shift(freq_hz: f64, range_rate_km_s: f64) -> f64 {
    -freq_hz * range_rate_km_s / SPEED_OF_LIGHT_KM_S
}

pub fn teme_to_ecef_position(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

pub fn teme_to_ecef_velocity(pos_teme: [f64; 3], vel_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    let pos = teme_to_ecef_position(pos_teme, gmst);
    let rotated = [
        vel_teme[0] * cos_gmst + vel_teme[1] * sin_gmst,
        -vel_teme[0] * sin_gmst + vel_teme[1] * cos_gmst,
        vel_teme[2],
    ];
    let rotation = [
        -EARTH_ROTATION_RAD_S * pos[1],
        EARTH_ROTATION_RAD_S * pos[0],
        0.0,
    ];
    [
        rotated[0] - rotation[0],
        rotated[1] - rotation[1],
        rotated[2] - rotation[2],
    ]
}

pub fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let sin_lon = lon_rad.sin();
    let cos_lon = lon_rad.cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    (east, north, up)
}

fn norm(v: [f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}
