use log::debug;
use sgp4::{Constants, Elements};

use crate::predict::error::PredictError;
use crate::predict::ground_station::StationCoordinates;
use crate::predict::propagation::propagate_sample;
use crate::predict::types::{PassWindow, Timestamp};

const COARSE_STEP_SECONDS: f64 = 60.0; // 1 minute for initial scan
const REFINE_TOLERANCE_SECONDS: f64 = 0.1;
const HORIZON_ELEVATION: f64 = 0.0;
const MAX_SEARCH_SECONDS: f64 = 14.0 * 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Crossing {
    Rising,
    Setting,
}

/// Find the pass that ends strictly after `after`.
///
/// Both returned bounds are the last/first sample at or above the horizon,
/// refined to within 0.1 s.
pub fn find_pass_window(
    station: &StationCoordinates,
    elements: &Elements,
    constants: &Constants,
    after: Timestamp,
) -> Result<PassWindow, PredictError> {
    let elevation = |t: Timestamp| -> Result<f64, PredictError> {
        Ok(propagate_sample(station, elements, constants, t)?.elevation_deg)
    };
    let no_pass = || PredictError::NoPass {
        norad_id: elements.norad_id,
        after,
    };

    let start = if elevation(after)? >= HORIZON_ELEVATION {
        // Pass in progress, walk back to its rise
        let mut cursor = after;
        loop {
            let previous = cursor - COARSE_STEP_SECONDS;
            if after - previous > MAX_SEARCH_SECONDS {
                return Err(no_pass());
            }
            if elevation(previous)? < HORIZON_ELEVATION {
                break refine_crossing(&elevation, previous, cursor, Crossing::Rising)?;
            }
            cursor = previous;
        }
    } else {
        let mut cursor = after;
        loop {
            let next = cursor + COARSE_STEP_SECONDS;
            if next - after > MAX_SEARCH_SECONDS {
                return Err(no_pass());
            }
            if elevation(next)? >= HORIZON_ELEVATION {
                break refine_crossing(&elevation, cursor, next, Crossing::Rising)?;
            }
            cursor = next;
        }
    };

    let mut cursor = start;
    let end = loop {
        let next = cursor + COARSE_STEP_SECONDS;
        if next - start > MAX_SEARCH_SECONDS {
            // Never sets
            return Err(no_pass());
        }
        if elevation(next)? < HORIZON_ELEVATION {
            break refine_crossing(&elevation, cursor, next, Crossing::Setting)?;
        }
        cursor = next;
    };

    debug!(
        "NORAD {}: pass window [{:.1}, {:.1}] after {:.1}",
        elements.norad_id, start, end, after
    );
    Ok(PassWindow { start, end })
}

/// Binary search to find the horizon crossing between `before` and `after`
fn refine_crossing<F>(
    elevation: &F,
    before: Timestamp,
    after: Timestamp,
    crossing: Crossing,
) -> Result<Timestamp, PredictError>
where
    F: Fn(Timestamp) -> Result<f64, PredictError>,
{
    let mut low = before;
    let mut high = after;

    while high - low > REFINE_TOLERANCE_SECONDS {
        let mid = low + (high - low) / 2.0;
        let above = elevation(mid)? >= HORIZON_ELEVATION;
        match (crossing, above) {
            (Crossing::Rising, true) | (Crossing::Setting, false) => high = mid,
            (Crossing::Rising, false) | (Crossing::Setting, true) => low = mid,
        }
    }

    Ok(match crossing {
        Crossing::Rising => high,
        Crossing::Setting => low,
    })
}
