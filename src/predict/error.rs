use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Invalid format: {0}")]
    Format(String),
    #[error("time {time:.3} outside transit [{start:.3}, {end:.3}]")]
    OutOfRange { time: f64, start: f64, end: f64 },
    #[error("Propagation error: {0}")]
    Propagation(String),
    #[error("Invalid transit window [{start}, {end}]")]
    InvalidWindow { start: f64, end: f64 },
    #[error("time {0} is not a representable UTC timestamp")]
    InvalidTime(f64),
    #[error("NORAD {norad_id} does not rise above the horizon after {after:.3}")]
    NoPass { norad_id: u64, after: f64 },
    #[error("search tolerance must be a positive number of seconds, got {0}")]
    InvalidTolerance(f64),
    #[error("elevation rises again at {time:.3} after falling, pass is not unimodal")]
    NotUnimodal { time: f64 },
}

impl From<sgp4::TleError> for PredictError {
    fn from(err: sgp4::TleError) -> Self {
        PredictError::Propagation(format!("invalid tle: {}", err))
    }
}

impl From<sgp4::ElementsError> for PredictError {
    fn from(err: sgp4::ElementsError) -> Self {
        PredictError::Propagation(format!("elements error: {}", err))
    }
}
