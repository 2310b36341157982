//! Plain records exchanged with the outside world.

use crate::error::Result;
use crate::model::CalibrationModel;
use serde::{Deserialize, Serialize};

/// One reference measurement: a known concentration and the signal it gave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub concentration: f64,
    pub conc_unit: String,
    pub signal: f64,
}

impl Sample {
    pub fn new(concentration: f64, conc_unit: &str, signal: f64) -> Self {
        Self {
            concentration,
            conc_unit: conc_unit.to_string(),
            signal,
        }
    }
}

/// Outcome of a calibration session: the reference samples and the model
/// chosen to convert signals of this analyte.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Standard {
    pub analyte_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyte_name: Option<String>,
    pub samples: Vec<Sample>,
    pub result: CalibrationModel,
}

impl Standard {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
