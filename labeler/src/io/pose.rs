use nalgebra::{Quaternion, Rotation3, UnitQuaternion};
use serde::{Deserialize, Serialize};

use crate::LabelError;

/// Source of the current sensor orientation relative to the placement frame
pub trait PoseSource {
    /// Latest known rotation of the sensor frame `frame_id`. Fails with `LabelError::PoseUnavailable` if no
    /// recent pose can be resolved
    fn sensor_rotation(&mut self, frame_id: &str) -> Result<Rotation3<f64>, LabelError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Orientation {
    /// Angles in radians
    Rpy { roll: f64, pitch: f64, yaw: f64 },
    Quaternion { x: f64, y: f64, z: f64, w: f64 },
}

impl Default for Orientation {
    fn default() -> Self {
        Orientation::Rpy {
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
        }
    }
}

impl Orientation {
    pub fn to_rotation(&self) -> Result<Rotation3<f64>, LabelError> {
        match *self {
            Orientation::Rpy { roll, pitch, yaw } => Ok(Rotation3::from_euler_angles(roll, pitch, yaw)),
            Orientation::Quaternion { x, y, z, w } => {
                let quat = Quaternion::new(w, x, y, z);
                if quat.norm() < 1e-9 {
                    return Err(LabelError::Config(
                        "Sensor orientation quaternion must not be zero".into(),
                    ));
                }
                Ok(UnitQuaternion::from_quaternion(quat).to_rotation_matrix())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub source_frame: String,
    pub target_frame: String,
    pub orientation: Orientation,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            source_frame: "/velodyne".into(),
            target_frame: "/base_link".into(),
            orientation: Orientation::default(),
        }
    }
}

/// Pose source for a sensor that is rigidly mounted with a known orientation
#[derive(Debug, Clone)]
pub struct StaticPose {
    rotation: Rotation3<f64>,
    /// The only sensor frame the pose is known for, `None` accepts every frame
    source_frame: Option<String>,
    target_frame: String,
}

impl StaticPose {
    pub fn new(rotation: Rotation3<f64>) -> Self {
        Self {
            rotation,
            source_frame: None,
            target_frame: SensorConfig::default().target_frame,
        }
    }

    pub fn from_config(config: &SensorConfig) -> Result<Self, LabelError> {
        Ok(Self {
            rotation: config.orientation.to_rotation()?,
            source_frame: Some(config.source_frame.clone()),
            target_frame: config.target_frame.clone(),
        })
    }
}

/// Frame ids are compared without the leading slash, "/velodyne" and "velodyne" name the same frame
fn same_frame(a: &str, b: &str) -> bool {
    a.trim_start_matches('/') == b.trim_start_matches('/')
}

impl PoseSource for StaticPose {
    fn sensor_rotation(&mut self, frame_id: &str) -> Result<Rotation3<f64>, LabelError> {
        match &self.source_frame {
            Some(source_frame) if !same_frame(source_frame, frame_id) => Err(LabelError::PoseUnavailable {
                source_frame: frame_id.to_owned(),
                target_frame: self.target_frame.clone(),
            }),
            _ => Ok(self.rotation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_quaternion_and_rpy_agree() {
        let yaw = FRAC_PI_2;
        let from_rpy = Orientation::Rpy {
            roll: 0.0,
            pitch: 0.0,
            yaw,
        }
        .to_rotation()
        .unwrap();
        let from_quat = Orientation::Quaternion {
            x: 0.0,
            y: 0.0,
            z: (yaw / 2.0).sin(),
            w: (yaw / 2.0).cos(),
        }
        .to_rotation()
        .unwrap();

        let v = Vector3::new(3.0, -1.0, 0.0);
        assert!((from_rpy * v - from_quat * v).norm() < 1e-12);
    }

    #[test]
    fn test_zero_quaternion_is_rejected() {
        let zero = Orientation::Quaternion {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 0.0,
        };
        assert!(matches!(zero.to_rotation(), Err(LabelError::Config(_))));
    }

    #[test]
    fn test_orientation_from_json() {
        let orientation: Orientation =
            serde_json::from_str(r#"{"kind": "quaternion", "x": 0, "y": 0, "z": 0, "w": 1}"#).unwrap();
        assert_eq!(orientation.to_rotation().unwrap(), Rotation3::identity());
    }

    #[test]
    fn test_static_pose_resolves_configured_frame() {
        let mut pose = StaticPose::from_config(&SensorConfig::default()).unwrap();
        assert_eq!(pose.sensor_rotation("/velodyne").unwrap(), Rotation3::identity());
        assert_eq!(pose.sensor_rotation("velodyne").unwrap(), Rotation3::identity());
    }

    #[test]
    fn test_static_pose_rejects_unknown_frame() {
        let mut pose = StaticPose::from_config(&SensorConfig::default()).unwrap();
        match pose.sensor_rotation("camera") {
            Err(err @ LabelError::PoseUnavailable { .. }) => {
                assert_eq!(err.to_string(), "Can't find transform between [camera] and [/base_link]");
                assert!(!err.is_fatal());
            }
            other => panic!("Expected unavailable pose, got {:?}", other),
        }
    }

    #[test]
    fn test_unbound_static_pose_accepts_any_frame() {
        let mut pose = StaticPose::new(Rotation3::identity());
        assert!(pose.sensor_rotation("anything").is_ok());
    }
}
