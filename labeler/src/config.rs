use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use frames::PcdEncoding;
use serde::{Deserialize, Serialize};

use crate::{
    denoise::DenoiseConfig,
    io::{PlatformConfig, SensorConfig},
    layout::{default_roster, LayoutConfig, ObjectSpec, Roster},
    pipeline::{DiscardPolicy, SettlePolicy},
    sim::WorldConfig,
    LabelError,
};

/// Where and under which names the dataset is written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub output_dir: String,
    pub file_prefix: String,
    /// The first file is written at `start_index + 1`
    pub start_index: u32,
    /// The run is complete once the file with this index was written
    pub max_index: u32,
    pub encoding: PcdEncoding,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            output_dir: "pcd".into(),
            file_prefix: "gazebo_a_".into(),
            start_index: 600,
            max_index: 800,
            encoding: PcdEncoding::default(),
        }
    }
}

/// Complete configuration of an auto labeling run. Every field has a default, so a config file only has to
/// contain the values that differ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelerConfig {
    pub denoise: DenoiseConfig,
    pub layout: LayoutConfig,
    pub roster: Vec<ObjectSpec>,
    pub platform: PlatformConfig,
    pub sensor: SensorConfig,
    pub dataset: DatasetConfig,
    pub discard_policy: DiscardPolicy,
    pub settle: SettlePolicy,
    /// Publish classified frames for live inspection
    pub visual: bool,
    /// Seed for the layout generator. Without a seed every run produces different layouts
    pub seed: Option<u64>,
    pub world: WorldConfig,
}

impl Default for LabelerConfig {
    fn default() -> Self {
        Self {
            denoise: Default::default(),
            layout: Default::default(),
            roster: default_roster(),
            platform: Default::default(),
            sensor: Default::default(),
            dataset: Default::default(),
            discard_policy: Default::default(),
            settle: Default::default(),
            visual: true,
            seed: None,
            world: Default::default(),
        }
    }
}

impl LabelerConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Could not open config file {}", path.display()))?;
        let config = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Could not parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn roster(&self) -> Result<Roster, LabelError> {
        Roster::new(self.roster.clone())
    }

    pub fn validate(&self) -> Result<(), LabelError> {
        if !(self.denoise.radius > 0.0) {
            return Err(LabelError::Config(format!(
                "Denoising radius must be positive, got {}",
                self.denoise.radius
            )));
        }
        if self.layout.range <= 0 {
            return Err(LabelError::Config(format!(
                "Placement range must be positive, got {}",
                self.layout.range
            )));
        }
        if !(self.layout.collision_distance >= 0.0) || !(self.layout.min_origin_distance >= 0.0) {
            return Err(LabelError::Config(
                "Collision distance and origin distance must not be negative".into(),
            ));
        }
        if self.layout.max_attempts == 0 {
            return Err(LabelError::Config("max_attempts must be at least 1".into()));
        }
        if self.dataset.start_index >= self.dataset.max_index {
            return Err(LabelError::Config(format!(
                "start_index ({}) must be smaller than max_index ({})",
                self.dataset.start_index, self.dataset.max_index
            )));
        }
        if self.roster.iter().any(|object| object.id == self.platform.id) {
            return Err(LabelError::Config(format!(
                "Platform '{}' must not be part of the roster",
                self.platform.id
            )));
        }
        self.sensor.orientation.to_rotation()?;
        self.roster()?;
        Ok(())
    }
}
