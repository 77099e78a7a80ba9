use crate::predict::error::PredictError;

pub const EARTH_ROTATION_RAD_S: f64 = 7.292_115e-5;

// WGS-84
pub const EARTH_EQUATORIAL_RADIUS_KM: f64 = 6378.137;
pub const EARTH_ECCENTRICITY_SQ: f64 = 0.00669437999014;

/// Observer location. Longitude is measured positive *west*, as in predict QTH files.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StationCoordinates {
    pub latitude_deg: f64,
    pub longitude_west_deg: f64,
    pub altitude_m: i32,
}

impl StationCoordinates {
    pub fn new(latitude_deg: f64, longitude_west_deg: f64, altitude_m: i32) -> Self {
        Self {
            latitude_deg,
            longitude_west_deg,
            altitude_m,
        }
    }

    /// Normalize an ordered `(lat N, lon W, alt m)` sequence.
    pub fn from_components<S: AsRef<str>>(components: &[S]) -> Result<Self, PredictError> {
        let [lat, lon, alt] = components else {
            return Err(PredictError::Format(format!(
                "station must consist of exactly three elements (lat(N), long(W), alt(m)), got {}",
                components.len()
            )));
        };
        let lat = parse_component::<f64>(lat.as_ref(), "latitude")?;
        let lon = parse_component::<f64>(lon.as_ref(), "longitude")?;
        let alt = parse_altitude(alt.as_ref())?;
        Ok(Self::new(lat, lon, alt))
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    /// East-positive longitude in radians, used for all geometry.
    pub fn lon_rad(&self) -> f64 {
        (-self.longitude_west_deg).to_radians()
    }

    pub fn position_ecef_km(&self) -> [f64; 3] {
        let lat = self.lat_rad();
        let lon = self.lon_rad();
        let sin_lat = lat.sin();
        let cos_lat = lat.cos();
        let sin_lon = lon.sin();
        let cos_lon = lon.cos();
        let n =
            EARTH_EQUATORIAL_RADIUS_KM / (1.0 - EARTH_ECCENTRICITY_SQ * sin_lat * sin_lat).sqrt();
        let alt_km = f64::from(self.altitude_m) / 1000.0;
        let x = (n + alt_km) * cos_lat * cos_lon;
        let y = (n + alt_km) * cos_lat * sin_lon;
        let z = (n * (1.0 - EARTH_ECCENTRICITY_SQ) + alt_km) * sin_lat;
        [x, y, z]
    }

    pub fn velocity_ecef_km_s(&self) -> [f64; 3] {
        let pos = self.position_ecef_km();
        [
            -EARTH_ROTATION_RAD_S * pos[1],
            EARTH_ROTATION_RAD_S * pos[0],
            0.0,
        ]
    }
}

impl std::str::FromStr for StationCoordinates {
    type Err = PredictError;

    /// Parses `"lat, lon_w, alt"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(|p| p.trim()).collect();
        Self::from_components(parts.as_slice())
    }
}

fn parse_component<T: std::str::FromStr>(value: &str, field: &str) -> Result<T, PredictError> {
    value
        .trim()
        .parse()
        .map_err(|_| PredictError::Format(format!("unable to convert {} '{}'", field, value)))
}

// Accepts "120" as well as "120.0"; fractional metres are truncated.
fn parse_altitude(value: &str) -> Result<i32, PredictError> {
    if let Ok(alt) = value.trim().parse::<i32>() {
        return Ok(alt);
    }
    let alt = parse_component::<f64>(value, "altitude")?;
    if !alt.is_finite() || alt.abs() > f64::from(i32::MAX) {
        return Err(PredictError::Format(format!(
            "unable to convert altitude '{}'",
            value
        )));
    }
    Ok(alt.trunc() as i32)
}

/// Geodetic latitude/longitude (degrees, east-positive) and height (km) of an ECEF point.
pub fn ecef_to_geodetic(pos: [f64; 3]) -> (f64, f64, f64) {
    let [x, y, z] = pos;
    let lon = y.atan2(x);
    let p = (x * x + y * y).sqrt();
    let mut lat = z.atan2(p * (1.0 - EARTH_ECCENTRICITY_SQ));
    let mut height = 0.0;
    for _ in 0..5 {
        let sin_lat = lat.sin();
        let n =
            EARTH_EQUATORIAL_RADIUS_KM / (1.0 - EARTH_ECCENTRICITY_SQ * sin_lat * sin_lat).sqrt();
        height = if lat.cos().abs() > 1e-9 {
            p / lat.cos() - n
        } else {
            z.abs() - n * (1.0 - EARTH_ECCENTRICITY_SQ)
        };
        lat = z.atan2(p * (1.0 - EARTH_ECCENTRICITY_SQ * n / (n + height)));
    }
    (lat.to_degrees(), lon.to_degrees(), height)
}
