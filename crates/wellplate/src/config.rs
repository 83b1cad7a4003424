//! JSON pipeline configuration.
//!
//! Every field has a default equal to the reference rig, so a config file
//! only needs the values that differ.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use wellplate_aruco::FiducialParams;
use wellplate_grid::RefineParams;

use crate::layout::DeckCalibration;
use crate::sampler::SamplerParams;
use crate::ConfigError;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub fiducial: FiducialParams,
    pub deck: DeckCalibration,
    pub refine: RefineParams,
    pub sampler: SamplerParams,
}

impl PipelineConfig {
    /// Load a config from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn plate_rows(&self) -> usize {
        self.refine.calibration.plate_rows
    }

    pub fn plate_cols(&self) -> usize {
        self.refine.calibration.plate_cols
    }
}
