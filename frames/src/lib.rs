mod color;
mod pcd_record;

pub use self::color::*;
pub use self::pcd_record::*;

use std::{collections::BTreeMap, time::Duration};

use nalgebra::Vector3;

/// A single point as delivered by the sensor
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RawPoint {
    pub position: Vector3<f64>,
    pub color: Rgb,
}

impl RawPoint {
    /// Creates a point at the given position, tinted by the side of the sensor it lies on
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            position: Vector3::new(x, y, z),
            color: side_tint(y),
        }
    }
}

/// A point together with its semantic class and the color of that class
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LabeledPoint {
    pub position: Vector3<f64>,
    pub color: Rgb,
    pub label: ClassId,
}

impl LabeledPoint {
    pub fn from_raw(point: &RawPoint, label: ClassId) -> Self {
        Self {
            position: point.position,
            color: label.color_or_sentinel(),
            label,
        }
    }
}

/// One captured sensor frame. Frames are discrete units: they are processed (or dropped) as a whole
#[derive(Clone, Debug, Default)]
pub struct RawFrame {
    pub frame_id: String,
    pub stamp: Duration,
    pub points: Vec<RawPoint>,
}

impl RawFrame {
    pub fn new(frame_id: impl Into<String>, stamp: Duration, points: Vec<RawPoint>) -> Self {
        Self {
            frame_id: frame_id.into(),
            stamp,
            points,
        }
    }

    /// Builds a frame from plain positions, applying the side tint to every point
    pub fn from_positions(
        frame_id: impl Into<String>,
        stamp: Duration,
        positions: impl IntoIterator<Item = Vector3<f64>>,
    ) -> Self {
        let points = positions
            .into_iter()
            .map(|pos| RawPoint::new(pos.x, pos.y, pos.z))
            .collect();
        Self::new(frame_id, stamp, points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// The result of classifying a `RawFrame`
#[derive(Clone, Debug, Default)]
pub struct LabeledFrame {
    pub frame_id: String,
    pub stamp: Duration,
    pub points: Vec<LabeledPoint>,
}

impl LabeledFrame {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of points per class, ordered by class id
    pub fn class_histogram(&self) -> BTreeMap<ClassId, usize> {
        let mut histogram = BTreeMap::new();
        for point in &self.points {
            *histogram.entry(point.label).or_insert(0) += 1;
        }
        histogram
    }
}
