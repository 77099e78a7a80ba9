mod elements;
mod error;
mod ground_station;
mod pass_finder;
mod propagation;
mod transit;
mod transits;
mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use elements::OrbitalElements;
pub use error::PredictError;
pub use ground_station::{ecef_to_geodetic, StationCoordinates};
pub use propagation::*;
pub use transit::{heading, Transit, DEFAULT_EPSILON_SECONDS};
pub use transits::{observe, transits, Above, Transits, CURSOR_GUARD_SECONDS};
pub use types::{from_datetime, to_datetime, LookAngles, PassWindow, Timestamp, TransitSummary};
