use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::predict::error::PredictError;
use crate::predict::ground_station::StationCoordinates;
use crate::predict::propagation::Propagator;
use crate::predict::types::{to_datetime, LookAngles, PassWindow, Timestamp, TransitSummary};
use crate::predict::OrbitalElements;

/// Default resolution of peak and threshold searches.
pub const DEFAULT_EPSILON_SECONDS: f64 = 0.1;

/// One pass of a satellite over a station.
///
/// A transit is only a window plus what is needed to re-query the
/// propagator. Derived geometry (azimuths, heading, peak) is computed when
/// asked for.
///
/// Peak search and pruning assume elevation is unimodal over
/// `[start, end]`: rising then falling, or monotonic. That holds for a
/// single LEO pass but is not verified; use [`Transit::check_unimodal`]
/// when the window may contain more than one maximum.
pub struct Transit<'p, P: ?Sized> {
    propagator: &'p P,
    elements: Arc<OrbitalElements>,
    station: StationCoordinates,
    start: Timestamp,
    end: Timestamp,
}

impl<'p, P: Propagator + ?Sized> Transit<'p, P> {
    pub fn new(
        propagator: &'p P,
        elements: impl Into<Arc<OrbitalElements>>,
        station: StationCoordinates,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Self, PredictError> {
        if !start.is_finite() || !end.is_finite() || start > end {
            return Err(PredictError::InvalidWindow { start, end });
        }
        Ok(Self {
            propagator,
            elements: elements.into(),
            station,
            start,
            end,
        })
    }

    pub fn from_window(
        propagator: &'p P,
        elements: impl Into<Arc<OrbitalElements>>,
        station: StationCoordinates,
        window: PassWindow,
    ) -> Result<Self, PredictError> {
        Self::new(propagator, elements, station, window.start, window.end)
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    pub fn window(&self) -> PassWindow {
        PassWindow {
            start: self.start,
            end: self.end,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn elements(&self) -> &OrbitalElements {
        &self.elements
    }

    pub fn station(&self) -> &StationCoordinates {
        &self.station
    }

    /// Observation at `time`, which must lie within the transit.
    pub fn at(&self, time: Timestamp) -> Result<LookAngles, PredictError> {
        if time < self.start || time > self.end {
            return Err(PredictError::OutOfRange {
                time,
                start: self.start,
                end: self.end,
            });
        }
        self.observe(time)
    }

    // Unchecked; searches probe just outside the window.
    fn observe(&self, time: Timestamp) -> Result<LookAngles, PredictError> {
        self.propagator
            .observe_at(&self.elements, &self.station, time)
    }

    fn elevation(&self, time: Timestamp) -> Result<f64, PredictError> {
        Ok(self.observe(time)?.elevation_deg)
    }

    pub fn azimuth_start(&self) -> Result<f64, PredictError> {
        Ok(self.observe(self.start)?.azimuth_deg)
    }

    pub fn azimuth_end(&self) -> Result<f64, PredictError> {
        Ok(self.observe(self.end)?.azimuth_deg)
    }

    /// Net compass direction of travel from start to end, see [`heading`].
    pub fn heading(&self) -> Result<f64, PredictError> {
        Ok(heading(self.azimuth_start()?, self.azimuth_end()?))
    }

    /// Angular sweep rate at peak in degrees per second.
    ///
    /// Treats the whole orbital velocity as transverse to the line of sight,
    /// which is close at the top of a pass and an overestimate elsewhere.
    pub fn peak_angular_rate(&self) -> Result<f64, PredictError> {
        Ok(angular_rate(&self.peak()?))
    }

    pub fn peak(&self) -> Result<LookAngles, PredictError> {
        self.peak_within(DEFAULT_EPSILON_SECONDS)
    }

    /// Observation within `epsilon` seconds of maximum elevation.
    ///
    /// Hill climb from the midpoint with a step that starts at the full
    /// duration and shrinks by 4 each round. Within a round the climb stops
    /// at a local peak, when the slope changes sign, or when the next step
    /// would leave the window.
    pub fn peak_within(&self, epsilon: f64) -> Result<LookAngles, PredictError> {
        check_epsilon(epsilon)?;

        let mut ts = (self.start + self.end) / 2.0;
        let mut step = self.end - self.start;
        while step > epsilon {
            step /= 4.0;
            let mut direction = None;
            loop {
                let mid = self.elevation(ts)?;
                let left = self.elevation(ts - step)?;
                let right = self.elevation(ts + step)?;
                if left <= mid && mid >= right {
                    break;
                }
                let slope = if left > right { -1.0 } else { 1.0 };
                // Stepped over the peak
                if *direction.get_or_insert(slope) != slope {
                    break;
                }
                let next = ts + slope * step;
                if next < self.start || next > self.end {
                    break;
                }
                ts = next;
            }
        }

        debug!("peak of [{:.1}, {:.1}] at {:.2}", self.start, self.end, ts);
        self.observe(ts)
    }

    /// Portion of the transit at or above `elevation_deg`.
    pub fn above(&self, elevation_deg: f64) -> Result<Self, PredictError> {
        self.prune(|t| Ok(self.elevation(t)? >= elevation_deg))
    }

    pub fn prune<F>(&self, predicate: F) -> Result<Self, PredictError>
    where
        F: FnMut(Timestamp) -> Result<bool, PredictError>,
    {
        self.prune_within(predicate, DEFAULT_EPSILON_SECONDS)
    }

    /// Sub-window on which `predicate` holds.
    ///
    /// `predicate` must be false everywhere or true on exactly one contiguous
    /// interval containing the peak. When false at the peak the result is a
    /// zero-length transit at the peak time. Each boundary is bisected to
    /// within `epsilon` seconds and always lands on the side where the
    /// predicate holds.
    pub fn prune_within<F>(&self, mut predicate: F, epsilon: f64) -> Result<Self, PredictError>
    where
        F: FnMut(Timestamp) -> Result<bool, PredictError>,
    {
        check_epsilon(epsilon)?;
        let peak = self.peak_within(epsilon)?.time;

        if !predicate(peak)? {
            return Ok(self.with_bounds(peak, peak));
        }

        let start = if predicate(self.start)? {
            self.start
        } else {
            // predicate(right) holds throughout
            let (mut left, mut right) = (self.start, peak);
            while right - left > epsilon {
                let mid = (left + right) / 2.0;
                if predicate(mid)? {
                    right = mid;
                } else {
                    left = mid;
                }
            }
            right
        };

        let end = if predicate(self.end)? {
            self.end
        } else {
            // predicate(left) holds throughout
            let (mut left, mut right) = (peak, self.end);
            while right - left > epsilon {
                let mid = (left + right) / 2.0;
                if predicate(mid)? {
                    left = mid;
                } else {
                    right = mid;
                }
            }
            left
        };

        Ok(self.with_bounds(start, end))
    }

    fn with_bounds(&self, start: Timestamp, end: Timestamp) -> Self {
        Self {
            propagator: self.propagator,
            elements: Arc::clone(&self.elements),
            station: self.station,
            start,
            end,
        }
    }

    /// Coarsely sample the window and fail if elevation climbs again after
    /// it has started to fall.
    pub fn check_unimodal(&self, samples: usize) -> Result<(), PredictError> {
        let samples = samples.max(2);
        let step = self.duration() / (samples - 1) as f64;
        let mut previous = self.elevation(self.start)?;
        let mut falling = false;
        for i in 1..samples {
            let time = self.start + step * i as f64;
            let elevation = self.elevation(time)?;
            if elevation < previous {
                falling = true;
            } else if falling && elevation > previous {
                return Err(PredictError::NotUnimodal { time });
            }
            previous = elevation;
        }
        Ok(())
    }

    pub fn summary(&self) -> Result<TransitSummary, PredictError> {
        let azimuth_start_deg = self.azimuth_start()?;
        let azimuth_end_deg = self.azimuth_end()?;
        let peak = self.peak()?;
        Ok(TransitSummary {
            satellite: self.elements.object_name().to_string(),
            start: to_datetime(self.start)?,
            end: to_datetime(self.end)?,
            duration_seconds: self.duration(),
            azimuth_start_deg,
            azimuth_end_deg,
            heading_deg: heading(azimuth_start_deg, azimuth_end_deg),
            peak_time: to_datetime(peak.time)?,
            peak_elevation_deg: peak.elevation_deg,
            peak_azimuth_deg: peak.azimuth_deg,
            peak_angular_rate_deg_s: angular_rate(&peak),
        })
    }
}

impl<P: ?Sized> Clone for Transit<'_, P> {
    fn clone(&self) -> Self {
        Self {
            propagator: self.propagator,
            elements: Arc::clone(&self.elements),
            station: self.station,
            start: self.start,
            end: self.end,
        }
    }
}

impl<P: ?Sized> fmt::Debug for Transit<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transit")
            .field("satellite", &self.elements.object_name())
            .field("station", &self.station)
            .field("start", &self.start)
            .field("end", &self.end)
            .finish()
    }
}

// deg/s, all of the orbital velocity taken as transverse
fn angular_rate(obs: &LookAngles) -> f64 {
    (obs.orbital_velocity_km_s / obs.slant_range_km).to_degrees()
}

fn check_epsilon(epsilon: f64) -> Result<(), PredictError> {
    if epsilon.is_finite() && epsilon > 0.0 {
        Ok(())
    } else {
        Err(PredictError::InvalidTolerance(epsilon))
    }
}

/// Compass direction of the chord from the start azimuth to the end azimuth.
///
/// Both bearings are placed on the unit circle and the direction of the
/// displacement between them is converted back to a bearing, so there is no
/// discontinuity at north. Identical azimuths have no chord and give 0.
pub fn heading(azimuth_start: f64, azimuth_end: f64) -> f64 {
    let (x1, y1) = unit_vector(compass_to_polar(azimuth_start));
    let (x2, y2) = unit_vector(compass_to_polar(azimuth_end));
    let (dx, dy) = (x2 - x1, y2 - y1);
    if dx.hypot(dy) < 1e-12 {
        return 0.0;
    }
    compass_to_polar(dy.atan2(dx).to_degrees())
}

// Reflection about the 45 degree line; its own inverse.
fn compass_to_polar(degrees: f64) -> f64 {
    let polar = (90.0 - degrees).rem_euclid(360.0);
    if polar >= 360.0 {
        0.0
    } else {
        polar
    }
}

fn unit_vector(degrees: f64) -> (f64, f64) {
    let radians = degrees.to_radians();
    (radians.cos(), radians.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::test_support::{object_ny, AnalyticPropagator};

    const PEAK: Timestamp = 1_700_000_000.0;

    fn transit(propagator: &AnalyticPropagator) -> Transit<'_, AnalyticPropagator> {
        let window = PassWindow {
            start: PEAK - propagator.half_width,
            end: PEAK + propagator.half_width,
        };
        Transit::from_window(
            propagator,
            object_ny(),
            StationCoordinates::default(),
            window,
        )
        .unwrap()
    }

    #[test]
    fn test_duration() {
        let propagator = AnalyticPropagator::parabola(PEAK, 300.0, 60.0);
        assert_eq!(transit(&propagator).duration(), 600.0);
    }

    #[test]
    fn test_new_rejects_reversed_window() {
        let propagator = AnalyticPropagator::parabola(PEAK, 300.0, 60.0);
        let err = Transit::new(
            &propagator,
            object_ny(),
            StationCoordinates::default(),
            10.0,
            5.0,
        )
        .unwrap_err();
        assert!(matches!(err, PredictError::InvalidWindow { .. }));
    }

    #[test]
    fn test_construction_does_not_query() {
        let propagator = AnalyticPropagator::parabola(PEAK, 300.0, 60.0);
        let _ = transit(&propagator);
        assert_eq!(propagator.calls(), 0);
    }

    #[test]
    fn test_at_is_range_checked() {
        let propagator = AnalyticPropagator::parabola(PEAK, 300.0, 60.0);
        let t = transit(&propagator);
        assert!(t.at(t.start()).is_ok());
        assert!(t.at(PEAK).is_ok());
        assert!(t.at(t.end()).is_ok());

        let err = t.at(t.end() + 0.001).unwrap_err();
        assert!(matches!(err, PredictError::OutOfRange { .. }));
        assert!(err.to_string().contains("outside transit"));
        assert!(matches!(
            t.at(t.start() - 0.001),
            Err(PredictError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_peak_of_centered_parabola() {
        let propagator = AnalyticPropagator::parabola(PEAK, 300.0, 60.0);
        let peak = transit(&propagator).peak().unwrap();
        assert!((peak.time - PEAK).abs() <= DEFAULT_EPSILON_SECONDS);
        assert!((peak.elevation_deg - 60.0).abs() < 1e-3);
    }

    #[test]
    fn test_peak_off_center() {
        let propagator = AnalyticPropagator::parabola(PEAK, 300.0, 45.0);
        // Window ends 50 s after the peak
        let t = Transit::new(
            &propagator,
            object_ny(),
            StationCoordinates::default(),
            PEAK - 300.0,
            PEAK + 50.0,
        )
        .unwrap();
        let peak = t.peak().unwrap();
        assert!(
            (peak.time - PEAK).abs() <= DEFAULT_EPSILON_SECONDS,
            "{}",
            peak.time - PEAK
        );
    }

    #[test]
    fn test_peak_at_boundary_of_monotonic_window() {
        let propagator = AnalyticPropagator::parabola(PEAK, 300.0, 45.0);
        // Rising the whole way
        let t = Transit::new(
            &propagator,
            object_ny(),
            StationCoordinates::default(),
            PEAK - 300.0,
            PEAK - 100.0,
        )
        .unwrap();
        let peak = t.peak_within(0.01).unwrap();
        assert!(peak.time <= t.end());
        assert!(t.end() - peak.time < 1.0, "{}", t.end() - peak.time);
    }

    #[test]
    fn test_peak_is_idempotent() {
        let propagator = AnalyticPropagator::parabola(PEAK + 17.3, 300.0, 30.0);
        let t = transit(&propagator);
        assert_eq!(t.peak().unwrap(), t.peak().unwrap());
    }

    #[test]
    fn test_peak_of_empty_window() {
        let propagator = AnalyticPropagator::parabola(PEAK, 300.0, 30.0);
        let t = Transit::new(
            &propagator,
            object_ny(),
            StationCoordinates::default(),
            PEAK,
            PEAK,
        )
        .unwrap();
        assert_eq!(t.peak().unwrap().time, PEAK);
    }

    #[test]
    fn test_invalid_epsilon() {
        let propagator = AnalyticPropagator::parabola(PEAK, 300.0, 30.0);
        let t = transit(&propagator);
        assert!(matches!(
            t.peak_within(0.0),
            Err(PredictError::InvalidTolerance(_))
        ));
        assert!(matches!(
            t.prune_within(|_| Ok(true), -1.0),
            Err(PredictError::InvalidTolerance(_))
        ));
    }

    #[test]
    fn test_above_matches_analytic_crossings() {
        let propagator = AnalyticPropagator::parabola(PEAK, 400.0, 70.0);
        let t = transit(&propagator);
        for threshold in [5.0, 20.0, 45.0, 69.0] {
            let pruned = t.above(threshold).unwrap();
            let (rise, set) = propagator.crossings(PEAK, threshold);
            assert!(
                (pruned.start() - rise).abs() <= DEFAULT_EPSILON_SECONDS,
                "threshold {}: start {} vs {}",
                threshold,
                pruned.start(),
                rise
            );
            assert!(
                (pruned.end() - set).abs() <= DEFAULT_EPSILON_SECONDS,
                "threshold {}: end {} vs {}",
                threshold,
                pruned.end(),
                set
            );
            // Boundaries land on the visible side
            assert!(propagator.elevation(pruned.start()) >= threshold);
            assert!(propagator.elevation(pruned.end()) >= threshold);
        }
    }

    #[test]
    fn test_above_horizon_keeps_whole_window() {
        let propagator = AnalyticPropagator::parabola(PEAK, 300.0, 40.0);
        let t = transit(&propagator);
        let pruned = t.above(0.0).unwrap();
        assert_eq!(pruned.start(), t.start());
        assert_eq!(pruned.end(), t.end());
    }

    #[test]
    fn test_above_unreachable_is_empty_at_peak() {
        let propagator = AnalyticPropagator::parabola(PEAK, 300.0, 40.0);
        let t = transit(&propagator);
        let pruned = t.above(50.0).unwrap();
        assert_eq!(pruned.duration(), 0.0);
        assert!((pruned.start() - PEAK).abs() <= DEFAULT_EPSILON_SECONDS);
    }

    #[test]
    fn test_prune_leaves_original_untouched() {
        let propagator = AnalyticPropagator::parabola(PEAK, 300.0, 40.0);
        let t = transit(&propagator);
        let pruned = t.above(20.0).unwrap();
        assert_eq!(t.start(), PEAK - 300.0);
        assert_eq!(t.end(), PEAK + 300.0);
        assert!(pruned.duration() < t.duration());
        assert_eq!(pruned.elements(), t.elements());
        assert_eq!(pruned.station(), t.station());
    }

    #[test]
    fn test_prune_with_generic_predicate() {
        let propagator = AnalyticPropagator::parabola(PEAK, 300.0, 40.0);
        let t = transit(&propagator);
        let pruned = t.prune(|time| Ok((time - PEAK).abs() <= 100.0)).unwrap();
        let (start, end) = (PEAK - 100.0, PEAK + 100.0);
        assert!((pruned.start() - start).abs() <= DEFAULT_EPSILON_SECONDS);
        assert!((pruned.end() - end).abs() <= DEFAULT_EPSILON_SECONDS);
    }

    #[test]
    fn test_prune_propagates_predicate_error() {
        let propagator = AnalyticPropagator::parabola(PEAK, 300.0, 40.0);
        let t = transit(&propagator);
        let result = t.prune(|_| Err(PredictError::Propagation("boom".into())));
        assert!(matches!(result, Err(PredictError::Propagation(_))));
    }

    #[test]
    fn test_heading_wraps_through_north() {
        // Rising NNW, setting NNE: travelling east along the northern sky
        assert!((heading(350.0, 10.0) - 90.0).abs() < 1e-9);
        // Rising S, setting N
        let h = heading(170.0, 10.0);
        assert!(h.min(360.0 - h) < 1e-9, "{}", h);
        // Asymmetric northbound pass lands just west of north, not near 180
        let h = heading(185.0, 350.0);
        assert!(h > 350.0 && h < 360.0, "{}", h);
    }

    #[test]
    fn test_heading_cardinal_directions() {
        assert!((heading(270.0, 90.0) - 90.0).abs() < 1e-9);
        assert!((heading(90.0, 270.0) - 270.0).abs() < 1e-9);
        assert!((heading(0.0, 180.0) - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_heading_degenerate() {
        assert_eq!(heading(123.0, 123.0), 0.0);
        assert_eq!(heading(0.0, 360.0), 0.0);
    }

    #[test]
    fn test_heading_in_range() {
        for start in (0..360).step_by(15) {
            for end in (0..360).step_by(15) {
                let h = heading(start as f64, end as f64);
                assert!((0.0..360.0).contains(&h), "{} -> {} = {}", start, end, h);
            }
        }
    }

    #[test]
    fn test_transit_heading_and_azimuths() {
        let propagator = AnalyticPropagator::parabola(PEAK, 300.0, 40.0).with_azimuths(200.0, 20.0);
        let t = transit(&propagator);
        assert!((t.azimuth_start().unwrap() - 200.0).abs() < 1e-9);
        assert!((t.azimuth_end().unwrap() - 20.0).abs() < 1e-9);
        assert!((t.heading().unwrap() - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_peak_angular_rate() {
        let propagator = AnalyticPropagator::parabola(PEAK, 300.0, 40.0);
        let t = transit(&propagator);
        let expected = (7.5_f64 / 800.0).to_degrees();
        assert!((t.peak_angular_rate().unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_check_unimodal() {
        let propagator = AnalyticPropagator::parabola(PEAK, 300.0, 40.0);
        assert!(transit(&propagator).check_unimodal(50).is_ok());

        let twin = AnalyticPropagator::parabola(PEAK, 300.0, 40.0)
            .with_profile(|offset| 30.0 - 20.0 * (offset / 100.0).cos());
        let err = transit(&twin).check_unimodal(50).unwrap_err();
        assert!(matches!(err, PredictError::NotUnimodal { .. }));
    }

    #[test]
    fn test_summary() {
        let propagator = AnalyticPropagator::parabola(PEAK, 300.0, 40.0);
        let summary = transit(&propagator).summary().unwrap();
        assert_eq!(summary.satellite, "OBJECT NY");
        assert_eq!(summary.duration_seconds, 600.0);
        assert!((summary.peak_elevation_deg - 40.0).abs() < 1e-3);
        assert_eq!(summary.start.timestamp(), (PEAK - 300.0) as i64);
        assert_eq!(
            summary.peak_angular_rate_deg_s,
            transit(&propagator).peak_angular_rate().unwrap()
        );
    }
}
