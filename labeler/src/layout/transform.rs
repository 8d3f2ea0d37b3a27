use frames::ClassId;
use nalgebra::{Rotation3, Vector3};

use super::Layout;

/// Position of an object as seen from the sensor
#[derive(Debug, Clone, PartialEq)]
pub struct SensorPlacement {
    pub object_id: String,
    pub class: ClassId,
    pub position: Vector3<f64>,
}

/// A `Layout` expressed in the sensor frame. Placements keep the roster order of the layout they were created from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformedLayout {
    placements: Vec<SensorPlacement>,
}

impl TransformedLayout {
    pub fn new(placements: Vec<SensorPlacement>) -> Self {
        Self { placements }
    }

    pub fn placements(&self) -> &[SensorPlacement] {
        &self.placements
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}

/// Rotates every placement of `layout` into the sensor frame. Only the rotation is applied, the sensor origin
/// coincides with the origin of the placement frame. Placements enter the rotation at z = 0
pub fn to_sensor_frame(layout: &Layout, sensor_rotation: &Rotation3<f64>) -> TransformedLayout {
    let placements = layout
        .placements()
        .iter()
        .map(|placement| SensorPlacement {
            object_id: placement.object_id.clone(),
            class: placement.class,
            position: sensor_rotation * Vector3::new(placement.position.x, placement.position.y, 0.0),
        })
        .collect();
    TransformedLayout::new(placements)
}
