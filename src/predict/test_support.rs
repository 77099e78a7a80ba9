use std::cell::Cell;

use crate::predict::{
    LookAngles, OrbitalElements, PassWindow, PredictError, Propagator, StationCoordinates,
    Timestamp,
};

pub const OBJECT_NY: &str = "0 OBJECT NY
1 43550U 98067NY  19009.55938219  .00013482  00000-0  17279-3 0  9995
2 43550 051.6378 066.3469 0004106 279.6394 080.4135 15.59492665028120";

/// Element set epoch, 2019-01-09T13:25:30.621Z.
pub const OBJECT_NY_EPOCH: Timestamp = 1_547_040_330.621;

pub fn object_ny() -> OrbitalElements {
    OrbitalElements::from_text(OBJECT_NY).unwrap()
}

/// Passes with a closed-form elevation profile.
///
/// Pass `k` peaks at `first_peak + k * period` and is above the horizon for
/// `half_width` seconds either side. Elevation is a parabola by default.
pub struct AnalyticPropagator {
    pub first_peak: Timestamp,
    pub period: f64,
    pub half_width: f64,
    pub peak_elevation: f64,
    pub azimuth_rise: f64,
    pub azimuth_set: f64,
    pub slant_range_km: f64,
    pub orbital_velocity_km_s: f64,
    pub profile: Option<Box<dyn Fn(f64) -> f64>>,
    /// Pass windows are still found but every observation fails.
    pub fail_observations: bool,
    calls: Cell<usize>,
}

impl AnalyticPropagator {
    pub fn parabola(first_peak: Timestamp, half_width: f64, peak_elevation: f64) -> Self {
        Self {
            first_peak,
            period: 5_400.0,
            half_width,
            peak_elevation,
            azimuth_rise: 200.0,
            azimuth_set: 20.0,
            slant_range_km: 800.0,
            orbital_velocity_km_s: 7.5,
            profile: None,
            fail_observations: false,
            calls: Cell::new(0),
        }
    }

    /// Replace the parabola with `profile(offset_from_peak)`.
    pub fn with_profile(mut self, profile: impl Fn(f64) -> f64 + 'static) -> Self {
        self.profile = Some(Box::new(profile));
        self
    }

    pub fn with_azimuths(mut self, rise: f64, set: f64) -> Self {
        self.azimuth_rise = rise;
        self.azimuth_set = set;
        self
    }

    pub fn failing_observations(mut self) -> Self {
        self.fail_observations = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    fn nearest_peak(&self, time: Timestamp) -> Timestamp {
        let k = ((time - self.first_peak) / self.period).round();
        self.first_peak + k * self.period
    }

    pub fn elevation(&self, time: Timestamp) -> f64 {
        let offset = time - self.nearest_peak(time);
        match &self.profile {
            Some(profile) => profile(offset),
            None => self.peak_elevation * (1.0 - (offset / self.half_width).powi(2)),
        }
    }

    /// Times at which the parabola crosses `threshold` around the peak.
    pub fn crossings(&self, peak: Timestamp, threshold: f64) -> (Timestamp, Timestamp) {
        let offset = self.half_width * (1.0 - threshold / self.peak_elevation).sqrt();
        (peak - offset, peak + offset)
    }
}

impl Propagator for AnalyticPropagator {
    fn observe_at(
        &self,
        _elements: &OrbitalElements,
        _station: &StationCoordinates,
        time: Timestamp,
    ) -> Result<LookAngles, PredictError> {
        self.calls.set(self.calls.get() + 1);
        if self.fail_observations {
            return Err(PredictError::Propagation(format!("no observation at {}", time)));
        }
        let offset = time - self.nearest_peak(time);
        let fraction = (offset + self.half_width) / (2.0 * self.half_width);
        let azimuth = self.azimuth_rise + (self.azimuth_set - self.azimuth_rise) * fraction;
        Ok(LookAngles {
            time,
            norad_id: 99_999,
            name: None,
            azimuth_deg: azimuth.rem_euclid(360.0),
            elevation_deg: self.elevation(time),
            slant_range_km: self.slant_range_km,
            range_rate_km_s: 0.0,
            orbital_velocity_km_s: self.orbital_velocity_km_s,
            latitude_deg: 0.0,
            longitude_deg: 0.0,
            altitude_km: 500.0,
            footprint_km: 0.0,
            doppler_100mhz_hz: 0.0,
        })
    }

    fn find_pass_window(
        &self,
        _elements: &OrbitalElements,
        _station: &StationCoordinates,
        after: Timestamp,
    ) -> Result<PassWindow, PredictError> {
        self.calls.set(self.calls.get() + 1);
        let mut peak = self.nearest_peak(after) - self.period;
        while peak + self.half_width <= after {
            peak += self.period;
        }
        Ok(PassWindow {
            start: peak - self.half_width,
            end: peak + self.half_width,
        })
    }
}
