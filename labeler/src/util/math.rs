use nalgebra::{Point2, Vector3};

/// Euclidean distance between two positions, ignoring their z component
pub fn planar_distance(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    planar_distance_squared(a, b).sqrt()
}

pub fn planar_distance_squared(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx * dx + dy * dy
}

/// Distance of a 2D position to the origin of its frame
pub fn distance_from_origin(position: &Point2<f64>) -> f64 {
    position.coords.norm()
}
