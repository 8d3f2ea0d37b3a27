use frames::ClassId;
use thiserror::Error;

/// Everything that can go wrong while turning a captured frame into a dataset file.
///
/// Per-frame errors are recovered by the pipeline (the frame is dropped and the next one is admitted), the
/// remaining ones stem from static configuration and end the run. See [`LabelError::is_fatal`].
#[derive(Debug, Error)]
pub enum LabelError {
    /// The sensor orientation could not be resolved for the current frame
    #[error("Can't find transform between [{source_frame}] and [{target_frame}]")]
    PoseUnavailable {
        source_frame: String,
        target_frame: String,
    },

    #[error("Classification attempted with an empty object layout")]
    NoReferenceObjects,

    /// Rejection sampling exhausted its retry budget
    #[error("Could not place object '{object}' within {attempts} attempts, placement constraints are infeasible")]
    PlacementInfeasible { object: String, attempts: usize },

    #[error("Failed to persist labeled frame {index}: {source}")]
    Persistence { index: u32, source: anyhow::Error },

    #[error("Simulator command failed: {source}")]
    Simulator { source: anyhow::Error },

    #[error("Class {0} has no entry in the color table")]
    UnknownClass(ClassId),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl LabelError {
    /// Returns true if the error stems from configuration and retrying with the next frame can't help
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LabelError::PlacementInfeasible { .. }
                | LabelError::UnknownClass(_)
                | LabelError::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_fatal_errors() {
        assert!(LabelError::PlacementInfeasible {
            object: "dock1".into(),
            attempts: 10
        }
        .is_fatal());
        assert!(LabelError::Config("empty roster".into()).is_fatal());
        assert!(LabelError::UnknownClass(ClassId(9)).is_fatal());

        assert!(!LabelError::NoReferenceObjects.is_fatal());
        assert!(!LabelError::PoseUnavailable {
            source_frame: "velodyne".into(),
            target_frame: "base_link".into()
        }
        .is_fatal());
        assert!(!LabelError::Persistence {
            index: 3,
            source: anyhow!("disk full")
        }
        .is_fatal());
        assert!(!LabelError::Simulator {
            source: anyhow!("service unavailable")
        }
        .is_fatal());
    }

    #[test]
    fn test_pose_message_names_frames() {
        let err = LabelError::PoseUnavailable {
            source_frame: "/velodyne".into(),
            target_frame: "/base_link".into(),
        };
        assert_eq!(
            err.to_string(),
            "Can't find transform between [/velodyne] and [/base_link]"
        );
    }
}
