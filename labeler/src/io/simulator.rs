use anyhow::Result;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Command and query interface of the simulated world
pub trait Simulator {
    /// Teleports the model with the given name to `position`, with identity orientation
    fn set_model_position(&mut self, model: &str, position: Point3<f64>) -> Result<()>;
    /// Current position of the model, or `None` if the simulator does not know the model
    fn model_position(&self, model: &str) -> Result<Option<Point3<f64>>>;
}

/// The platform that carries the sensor. It is moved back to its default pose after every re-layout, so that
/// collisions with the scattered objects can't push it away from the origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub id: String,
    pub position: [f64; 3],
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            id: "wamv".into(),
            position: [0.0, 0.0, -0.0823],
        }
    }
}

impl PlatformConfig {
    pub fn default_pose(&self) -> Point3<f64> {
        Point3::new(self.position[0], self.position[1], self.position[2])
    }
}
