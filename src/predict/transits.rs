use std::sync::Arc;

use log::debug;

use crate::predict::error::PredictError;
use crate::predict::ground_station::StationCoordinates;
use crate::predict::propagation::Propagator;
use crate::predict::transit::Transit;
use crate::predict::types::{now, LookAngles, Timestamp};
use crate::predict::OrbitalElements;

/// Gap after the end of a pass before asking for the next one, so the
/// window finder does not hand back the same pass.
pub const CURSOR_GUARD_SECONDS: f64 = 60.0;

/// Look angles at `at`, or now.
pub fn observe<P: Propagator + ?Sized>(
    propagator: &P,
    elements: &OrbitalElements,
    station: &StationCoordinates,
    at: Option<Timestamp>,
) -> Result<LookAngles, PredictError> {
    propagator.observe_at(elements, station, at.unwrap_or_else(now))
}

/// Transits ending after `ending_after` (default now), in time order.
///
/// The sequence is unbounded unless `ending_before` is given, in which case
/// it stops at the first transit ending after that cutoff without yielding
/// it. Calling this again recomputes everything from `ending_after`.
pub fn transits<'p, P: Propagator + ?Sized>(
    propagator: &'p P,
    elements: impl Into<Arc<OrbitalElements>>,
    station: StationCoordinates,
    ending_after: Option<Timestamp>,
    ending_before: Option<Timestamp>,
) -> Transits<'p, P> {
    let ending_after = ending_after.unwrap_or_else(now);
    Transits {
        propagator,
        elements: elements.into(),
        station,
        ending_after,
        ending_before,
        cursor: ending_after,
        done: false,
    }
}

pub struct Transits<'p, P: ?Sized> {
    propagator: &'p P,
    elements: Arc<OrbitalElements>,
    station: StationCoordinates,
    ending_after: Timestamp,
    ending_before: Option<Timestamp>,
    cursor: Timestamp,
    done: bool,
}

impl<'p, P: Propagator + ?Sized> Transits<'p, P> {
    /// Only the part of each transit at or above `elevation_deg`, skipping
    /// transits that never reach it.
    pub fn above(self, elevation_deg: f64) -> Above<'p, P> {
        Above {
            transits: self,
            elevation_deg,
        }
    }

    fn next_transit(&mut self) -> Result<Option<Transit<'p, P>>, PredictError> {
        loop {
            let window = self.propagator
                .find_pass_window(&self.elements, &self.station, self.cursor)?;
            let transit = Transit::from_window(
                self.propagator,
                Arc::clone(&self.elements),
                self.station,
                window,
            )?;

            if let Some(before) = self.ending_before {
                if transit.end() > before {
                    return Ok(None);
                }
            }

            self.cursor = transit.end() + CURSOR_GUARD_SECONDS;
            if transit.end() > self.ending_after {
                return Ok(Some(transit));
            }
            debug!(
                "skipping transit ending at {:.1}, before {:.1}",
                transit.end(),
                self.ending_after
            );
        }
    }
}

impl<'p, P: Propagator + ?Sized> Iterator for Transits<'p, P> {
    type Item = Result<Transit<'p, P>, PredictError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_transit() {
            Ok(Some(transit)) => Some(Ok(transit)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<'p, P: Propagator + ?Sized> std::iter::FusedIterator for Transits<'p, P> {}

/// Iterator returned by [`Transits::above`].
pub struct Above<'p, P: ?Sized> {
    transits: Transits<'p, P>,
    elevation_deg: f64,
}

impl<'p, P: Propagator + ?Sized> Iterator for Above<'p, P> {
    type Item = Result<Transit<'p, P>, PredictError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let transit = self.transits.next()?;
            match transit.and_then(|t| t.above(self.elevation_deg)) {
                Ok(t) if t.duration() <= 0.0 => continue,
                Ok(t) => return Some(Ok(t)),
                Err(e) => {
                    self.transits.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl<'p, P: Propagator + ?Sized> std::iter::FusedIterator for Above<'p, P> {}
