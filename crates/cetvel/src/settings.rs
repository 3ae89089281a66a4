//! Persisted display-unit preference.
//!
//! Distances are always computed in meters; the unit only changes how they
//! are printed.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::{fs, io, path::Path};

const FEET_PER_METER: f32 = 3.28084;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Metric,
    Imperial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitSettings {
    pub use_metric: bool,
    pub use_imperial: bool,
}

impl Default for UnitSettings {
    fn default() -> Self {
        Self {
            use_metric: true,
            use_imperial: false,
        }
    }
}

impl UnitSettings {
    /// Read settings from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read(path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No unit settings at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    /// Switch to `unit`, clearing the other flag.
    pub fn select(&mut self, unit: Unit) {
        self.use_metric = unit == Unit::Metric;
        self.use_imperial = unit == Unit::Imperial;
    }

    /// Metric unless imperial is the only flag set.
    pub fn unit(&self) -> Unit {
        if self.use_imperial && !self.use_metric {
            Unit::Imperial
        } else {
            Unit::Metric
        }
    }

    pub fn format_distance(&self, meters: f32) -> String {
        match self.unit() {
            Unit::Metric => format!("{meters:.4}m"),
            Unit::Imperial => format!("{:.4}ft", meters * FEET_PER_METER),
        }
    }
}
