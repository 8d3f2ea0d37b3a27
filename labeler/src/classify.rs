use frames::{LabeledFrame, LabeledPoint, RawFrame, RawPoint};
use nalgebra::Vector3;

use crate::{
    layout::{SensorPlacement, TransformedLayout},
    util::planar_distance_squared,
    LabelError,
};

/// Returns the placement closest to `position` in the xy-plane. On ties the placement that comes first wins
pub fn nearest_placement<'a>(
    position: &Vector3<f64>,
    placements: &'a [SensorPlacement],
) -> Option<&'a SensorPlacement> {
    let mut nearest: Option<(&SensorPlacement, f64)> = None;
    for placement in placements {
        let dist = planar_distance_squared(position, &placement.position);
        match nearest {
            Some((_, min_dist)) if min_dist <= dist => {}
            _ => nearest = Some((placement, dist)),
        }
    }
    nearest.map(|(placement, _)| placement)
}

/// Assigns each point the class of its nearest object in `layout` together with the color of that class
pub fn classify(points: &[RawPoint], layout: &TransformedLayout) -> Result<Vec<LabeledPoint>, LabelError> {
    if layout.is_empty() {
        return Err(LabelError::NoReferenceObjects);
    }

    points
        .iter()
        .map(|point| {
            nearest_placement(&point.position, layout.placements())
                .map(|placement| LabeledPoint::from_raw(point, placement.class))
                .ok_or(LabelError::NoReferenceObjects)
        })
        .collect()
}

/// Classifies all points of `frame`, keeping the frame id and stamp
pub fn classify_frame(frame: &RawFrame, layout: &TransformedLayout) -> Result<LabeledFrame, LabelError> {
    Ok(LabeledFrame {
        frame_id: frame.frame_id.clone(),
        stamp: frame.stamp,
        points: classify(&frame.points, layout)?,
    })
}
