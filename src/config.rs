use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::predict::{PredictError, StationCoordinates};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Unable to process qth: {0}")]
    Qth(String),
    #[error("Invalid station: {0}")]
    Station(#[from] PredictError),
}

/// Ground station description.
///
/// ```yaml
/// name: Home
/// latitude: 37.77     # degrees north
/// longitude: 122.42   # degrees west
/// altitude: 52        # metres
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StationConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: i32,
}

impl StationConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: StationConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Load a predict QTH file: name, latitude (N), longitude (W), altitude (m), one per line.
    pub fn from_qth_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_qth(&content)
            .map_err(|e| ConfigError::Qth(format!("'{}' ({})", path.display(), e)))
    }

    pub fn from_qth(content: &str) -> Result<Self, ConfigError> {
        let lines: Vec<&str> = content
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect();
        let [name, coordinates @ ..] = lines.as_slice() else {
            return Err(ConfigError::Qth("empty file".into()));
        };
        if coordinates.len() != 3 {
            return Err(ConfigError::Qth(format!(
                "must match name, lat(N), long(W), alt; got {} lines",
                lines.len()
            )));
        }
        let station = StationCoordinates::from_components(coordinates)?;
        Ok(Self {
            name: Some(name.to_string()),
            latitude: station.latitude_deg,
            longitude: station.longitude_west_deg,
            altitude: station.altitude_m,
        })
    }

    pub fn coordinates(&self) -> StationCoordinates {
        StationCoordinates::new(self.latitude, self.longitude, self.altitude)
    }
}
