use log::debug;
use nalgebra::{distance, Point2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{util::distance_from_origin, LabelError};

use super::{Layout, Placement, Roster};

/// Constraints for scattering the roster through the world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Coordinates are drawn from `[-range, range]`
    pub range: i32,
    /// Minimum distance between any two objects
    pub collision_distance: f64,
    /// Minimum distance between each object and the origin, which is where the sensor platform sits
    pub min_origin_distance: f64,
    /// Maximum number of candidates drawn per object before giving up
    pub max_attempts: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            range: 40,
            collision_distance: 8.0,
            min_origin_distance: 5.0,
            max_attempts: 10_000,
        }
    }
}

/// Generates collision-free layouts through rejection sampling
#[derive(Debug, Clone)]
pub struct LayoutGenerator {
    config: LayoutConfig,
}

impl LayoutGenerator {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Places all objects of `roster` in roster order. Each object is checked only against the objects that were
    /// placed before it, which is sufficient: an accepted candidate never moves again, so every pair is checked
    /// exactly once
    pub fn generate<R: Rng>(&self, roster: &Roster, rng: &mut R) -> Result<Layout, LabelError> {
        let range = self.config.range;
        let mut placements: Vec<Placement> = Vec::with_capacity(roster.len());

        for object in roster.objects() {
            let mut accepted = None;
            for attempt in 1..=self.config.max_attempts {
                let candidate = Point2::new(
                    rng.gen_range(-range..=range) as f64,
                    rng.gen_range(-range..=range) as f64,
                );
                if self.is_valid_candidate(&candidate, &placements) {
                    debug!(
                        "Placed '{}' at ({}, {}) after {} attempt(s)",
                        object.id, candidate.x, candidate.y, attempt
                    );
                    accepted = Some(candidate);
                    break;
                }
            }

            let position = accepted.ok_or_else(|| LabelError::PlacementInfeasible {
                object: object.id.clone(),
                attempts: self.config.max_attempts,
            })?;
            placements.push(Placement {
                object_id: object.id.clone(),
                class: object.class,
                height: object.height,
                position,
            });
        }

        Ok(Layout::new(placements))
    }

    fn is_valid_candidate(&self, candidate: &Point2<f64>, placed: &[Placement]) -> bool {
        if distance_from_origin(candidate) < self.config.min_origin_distance {
            return false;
        }
        placed
            .iter()
            .all(|other| distance(&other.position, candidate) >= self.config.collision_distance)
    }
}
