use std::collections::HashMap;

use frames::RawPoint;
use nalgebra::{distance_squared, Point3};

pub type CellIndex = (i64, i64, i64);

/// Sparse uniform grid over a point slice, used to answer fixed-radius neighbor queries. Only occupied cells are
/// stored, so the grid is unbounded and needs no bounding box up front
pub struct NeighborGrid<'a> {
    points: &'a [RawPoint],
    cell_size: f64,
    cells: HashMap<CellIndex, Vec<usize>>,
}

impl<'a> NeighborGrid<'a> {
    /// Builds the grid. `cell_size` should equal the query radius, then all neighbors of a point are found in the
    /// 27 cells around it
    pub fn new(points: &'a [RawPoint], cell_size: f64) -> Self {
        assert!(cell_size > 0.0, "Cell size must be positive");

        let mut cells: HashMap<CellIndex, Vec<usize>> = HashMap::new();
        for (index, point) in points.iter().enumerate() {
            let cell = Self::cell_of(&point_of(point), cell_size);
            cells.entry(cell).or_default().push(index);
        }

        Self {
            points,
            cell_size,
            cells,
        }
    }

    fn cell_of(position: &Point3<f64>, cell_size: f64) -> CellIndex {
        (
            (position.x / cell_size).floor() as i64,
            (position.y / cell_size).floor() as i64,
            (position.z / cell_size).floor() as i64,
        )
    }

    /// Counts the other points within `radius` (inclusive) of the point at `index`. Counting stops as soon as
    /// `limit` neighbors were found, callers only need to know whether a threshold is reached
    pub fn count_neighbors(&self, index: usize, radius: f64, limit: usize) -> usize {
        let center = point_of(&self.points[index]);
        let (cx, cy, cz) = Self::cell_of(&center, self.cell_size);
        let reach = (radius / self.cell_size).ceil() as i64;
        let radius_sqr = radius * radius;

        let mut count = 0;
        for dx in -reach..=reach {
            for dy in -reach..=reach {
                for dz in -reach..=reach {
                    // Saturating, so cells of points far out at the edge of the index range can't overflow
                    let cell = (cx.saturating_add(dx), cy.saturating_add(dy), cz.saturating_add(dz));
                    let Some(candidates) = self.cells.get(&cell) else {
                        continue;
                    };
                    for &other in candidates {
                        if other == index {
                            continue;
                        }
                        if distance_squared(&center, &point_of(&self.points[other])) <= radius_sqr {
                            count += 1;
                            if count >= limit {
                                return count;
                            }
                        }
                    }
                }
            }
        }
        count
    }

    pub fn cells(&self) -> impl Iterator<Item = &CellIndex> {
        self.cells.keys()
    }
}

fn point_of(point: &RawPoint) -> Point3<f64> {
    Point3::from(point.position)
}
