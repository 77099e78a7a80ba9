use sgp4::{Constants, Elements};

use crate::predict::error::PredictError;

/// A three-line element set: object name followed by the two element lines.
///
/// Construction only checks the shape of the input. Whether the lines are
/// acceptable to SGP4 is decided by the propagator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrbitalElements {
    lines: [String; 3],
}

impl OrbitalElements {
    /// Normalize a single string with embedded line breaks.
    pub fn from_text(tle: &str) -> Result<Self, PredictError> {
        let lines: Vec<&str> = tle
            .lines()
            .map(|l| l.trim_end())
            .filter(|l| !l.trim().is_empty())
            .collect();
        Self::from_lines(lines.as_slice())
    }

    /// Normalize an ordered sequence of lines.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Result<Self, PredictError> {
        match lines {
            [name, line1, line2] => Ok(Self {
                lines: [
                    name.as_ref().trim().to_string(),
                    line1.as_ref().trim().to_string(),
                    line2.as_ref().trim().to_string(),
                ],
            }),
            _ => Err(PredictError::Format(format!(
                "TLE must be 3 lines, not {}: {:?}",
                lines.len(),
                lines.iter().map(|l| l.as_ref()).collect::<Vec<_>>()
            ))),
        }
    }

    pub fn name(&self) -> &str {
        &self.lines[0]
    }

    /// Name line without the "0 " marker used by 3LE files.
    pub fn object_name(&self) -> &str {
        strip_name_marker(&self.lines[0])
    }

    pub fn lines(&self) -> &[String; 3] {
        &self.lines
    }

    /// Parse into the SGP4 model.
    pub(crate) fn to_sgp4(&self) -> Result<(Elements, Constants), PredictError> {
        let name = self.object_name();
        let name = if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        };
        let elements =
            Elements::from_tle(name, self.lines[1].as_bytes(), self.lines[2].as_bytes())?;
        let constants = Constants::from_elements(&elements)?;
        Ok((elements, constants))
    }
}

impl std::str::FromStr for OrbitalElements {
    type Err = PredictError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_text(s)
    }
}

// Celestrak 3LE files prefix the name line with "0 ".
fn strip_name_marker(line: &str) -> &str {
    line.strip_prefix("0 ").unwrap_or(line).trim()
}
