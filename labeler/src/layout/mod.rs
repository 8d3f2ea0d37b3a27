mod generator;
pub use self::generator::*;

mod transform;
pub use self::transform::*;

use std::collections::HashSet;

use frames::ClassId;
use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

use crate::LabelError;

/// One of the known objects that get scattered through the simulated world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSpec {
    /// Model name of the object inside the simulator
    pub id: String,
    pub class: ClassId,
    /// Fixed z coordinate the object is placed at
    pub height: f64,
}

impl ObjectSpec {
    pub fn new(id: impl Into<String>, class: u32, height: f64) -> Self {
        Self {
            id: id.into(),
            class: ClassId(class),
            height,
        }
    }
}

/// The objects of the RobotX docking scene that the dataset is generated from
pub fn default_roster() -> Vec<ObjectSpec> {
    vec![
        ObjectSpec::new("dock1", 3, 0.0),
        ObjectSpec::new("dock2", 3, 0.0),
        ObjectSpec::new("light_buoy", 2, 0.32),
        ObjectSpec::new("buoy_s", 4, 0.23),
    ]
}

/// Validated, ordered set of objects. The order matters: it is the placement order of the layout generator and
/// the tie-break order of the classifier
#[derive(Debug, Clone)]
pub struct Roster {
    objects: Vec<ObjectSpec>,
}

impl Roster {
    pub fn new(objects: Vec<ObjectSpec>) -> Result<Self, LabelError> {
        if objects.is_empty() {
            return Err(LabelError::Config("Roster must contain at least one object".into()));
        }

        let mut seen = HashSet::new();
        for object in &objects {
            if !seen.insert(object.id.as_str()) {
                return Err(LabelError::Config(format!(
                    "Object id '{}' appears more than once in the roster",
                    object.id
                )));
            }
            if object.class.color().is_none() {
                return Err(LabelError::UnknownClass(object.class));
            }
        }

        Ok(Self { objects })
    }

    pub fn objects(&self) -> &[ObjectSpec] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Position of a single object within the placement frame
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub object_id: String,
    pub class: ClassId,
    pub height: f64,
    pub position: Point2<f64>,
}

impl Placement {
    /// Position the object is moved to in the simulated world
    pub fn world_position(&self) -> Point3<f64> {
        Point3::new(self.position.x, self.position.y, self.height)
    }
}

/// The placements of all roster objects for one labeling round, in roster order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    placements: Vec<Placement>,
}

impl Layout {
    pub fn new(placements: Vec<Placement>) -> Self {
        Self { placements }
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}
