mod grid;
pub use self::grid::*;

use frames::RawPoint;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenoiseConfig {
    pub radius: f64,
    /// Points with fewer neighbors than this within `radius` are removed
    pub min_neighbors: usize,
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        Self {
            radius: 2.2,
            min_neighbors: 2,
        }
    }
}

/// Radius outlier removal: drops every point that has fewer than `min_neighbors` other points within `radius`.
/// The relative order of the surviving points is kept
#[derive(Debug, Clone)]
pub struct RadiusOutlierFilter {
    radius: f64,
    min_neighbors: usize,
}

impl RadiusOutlierFilter {
    pub fn new(config: &DenoiseConfig) -> Self {
        Self {
            radius: config.radius,
            min_neighbors: config.min_neighbors,
        }
    }

    /// Points with a non-finite coordinate are invalid returns and never survive
    pub fn denoise(&self, points: &[RawPoint]) -> Vec<RawPoint> {
        let points = points
            .iter()
            .filter(|point| point.position.iter().all(|coord| coord.is_finite()))
            .copied()
            .collect::<Vec<_>>();
        if self.min_neighbors == 0 || points.is_empty() {
            return points;
        }

        let grid = NeighborGrid::new(&points, self.radius);
        let keep = (0..points.len())
            .into_par_iter()
            .map(|index| grid.count_neighbors(index, self.radius, self.min_neighbors) >= self.min_neighbors)
            .collect::<Vec<_>>();

        points
            .iter()
            .zip(keep)
            .filter_map(|(point, keep)| if keep { Some(*point) } else { None })
            .collect()
    }
}
