use std::path::Path;

use anyhow::{bail, Context, Result};
use nalgebra::Vector3;
use pcd_rs::{DataKind, PcdDeserialize, PcdSerialize, Reader, WriterInit};
use serde::{Deserialize, Serialize};

use crate::{ClassId, LabeledPoint, Rgb};

/// On-disk layout of a labeled point. Field names and types match PCL's `x y z rgb label` convention, so the
/// resulting files can be opened with PCL tooling
#[derive(PcdSerialize, PcdDeserialize, Copy, Clone, Debug, PartialEq)]
pub struct PcdRecord {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rgb: f32,
    pub label: u32,
}

impl From<&LabeledPoint> for PcdRecord {
    fn from(point: &LabeledPoint) -> Self {
        Self {
            x: point.position.x as f32,
            y: point.position.y as f32,
            z: point.position.z as f32,
            rgb: point.color.to_pcl_float(),
            label: point.label.0,
        }
    }
}

impl From<PcdRecord> for LabeledPoint {
    fn from(record: PcdRecord) -> Self {
        Self {
            position: Vector3::new(record.x as f64, record.y as f64, record.z as f64),
            color: Rgb::from_pcl_float(record.rgb),
            label: ClassId(record.label),
        }
    }
}

/// Encoding of the point data section of a PCD file
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PcdEncoding {
    #[default]
    Ascii,
    Binary,
}

impl From<PcdEncoding> for DataKind {
    fn from(encoding: PcdEncoding) -> Self {
        match encoding {
            PcdEncoding::Ascii => DataKind::Ascii,
            PcdEncoding::Binary => DataKind::Binary,
        }
    }
}

/// Writes the given points as an unorganized PCD file (height 1)
pub fn write_labeled_pcd<P: AsRef<Path>>(
    path: P,
    points: &[LabeledPoint],
    encoding: PcdEncoding,
) -> Result<()> {
    let path = path.as_ref();
    if points.is_empty() {
        bail!("Refusing to write empty point cloud to {}", path.display());
    }

    let mut writer = WriterInit {
        width: points.len() as u64,
        height: 1,
        viewpoint: Default::default(),
        data_kind: encoding.into(),
        schema: None,
    }
    .create::<PcdRecord, _>(path)
    .with_context(|| format!("Could not create PCD writer for {}", path.display()))?;

    for point in points {
        writer
            .push(&PcdRecord::from(point))
            .context("Failed to write point")?;
    }
    writer
        .finish()
        .with_context(|| format!("Failed to finish PCD file {}", path.display()))?;
    Ok(())
}

/// Reads all points of a PCD file that was written by `write_labeled_pcd`
pub fn read_labeled_pcd<P: AsRef<Path>>(path: P) -> Result<Vec<LabeledPoint>> {
    let path = path.as_ref();
    let reader: Reader<PcdRecord, _> = Reader::open(path)
        .with_context(|| format!("Could not open PCD file {}", path.display()))?;
    let records = reader
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Error while reading points from {}", path.display()))?;
    Ok(records.into_iter().map(LabeledPoint::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scopeguard::defer;

    fn sample_points() -> Vec<LabeledPoint> {
        vec![
            LabeledPoint {
                position: Vector3::new(10.0, 10.1, 0.5),
                color: Rgb::WHITE,
                label: ClassId(3),
            },
            LabeledPoint {
                position: Vector3::new(-10.0, -9.5, 0.25),
                color: Rgb::BLUE,
                label: ClassId(4),
            },
            LabeledPoint {
                position: Vector3::new(1.5, -2.0, 0.0),
                color: Rgb::YELLOW,
                label: ClassId(2),
            },
        ]
    }

    #[test]
    fn test_write_then_read_binary() -> Result<()> {
        let path = std::env::temp_dir().join(format!("frames_binary_{}.pcd", std::process::id()));
        defer! {
            let _ = std::fs::remove_file(&path);
        }

        let points = sample_points();
        write_labeled_pcd(&path, &points, PcdEncoding::Binary)?;
        let read_back = read_labeled_pcd(&path)?;

        assert_eq!(read_back.len(), points.len());
        for (expected, actual) in points.iter().zip(read_back.iter()) {
            assert_eq!(expected.label, actual.label);
            assert_eq!(expected.color, actual.color);
            assert!((expected.position - actual.position).norm() < 1e-5);
        }
        Ok(())
    }

    #[test]
    fn test_ascii_labels_survive() -> Result<()> {
        let path = std::env::temp_dir().join(format!("frames_ascii_{}.pcd", std::process::id()));
        defer! {
            let _ = std::fs::remove_file(&path);
        }

        write_labeled_pcd(&path, &sample_points(), PcdEncoding::Ascii)?;
        let labels = read_labeled_pcd(&path)?
            .into_iter()
            .map(|point| point.label.0)
            .collect::<Vec<_>>();
        assert_eq!(labels, vec![3, 4, 2]);
        Ok(())
    }

    #[test]
    fn test_empty_cloud_is_rejected() {
        let path = std::env::temp_dir().join("frames_never_written.pcd");
        assert!(write_labeled_pcd(&path, &[], PcdEncoding::Ascii).is_err());
        assert!(!path.exists());
    }
}
