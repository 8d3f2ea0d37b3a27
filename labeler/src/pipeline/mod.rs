mod gate;
pub use self::gate::*;

mod sequencer;
pub use self::sequencer::*;

mod settle;
pub use self::settle::*;

mod state;
pub use self::state::*;

use frames::RawFrame;
use log::{debug, info, warn};
use nalgebra::Point3;
use rand::{rngs::StdRng, SeedableRng};

use crate::{
    classify::classify_frame,
    config::LabelerConfig,
    denoise::RadiusOutlierFilter,
    io::{ColorPublisher, FrameWriter, PlatformConfig, PoseSource, Simulator},
    layout::{to_sensor_frame, Layout, LayoutGenerator, Roster, TransformedLayout},
    stats::RunStats,
    LabelError,
};

/// The external systems the pipeline talks to
pub struct Collaborators {
    pub simulator: Box<dyn Simulator + Send>,
    pub pose: Box<dyn PoseSource + Send>,
    pub writer: Box<dyn FrameWriter + Send>,
    /// Side output for classified frames, `None` disables it
    pub publisher: Option<Box<dyn ColorPublisher + Send>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// No layout was realized yet, the frame triggered the first one
    Bootstrap,
    /// The frame may have been captured while the world was still moving to the new layout
    Unsettled,
    /// First frame of the run
    FirstFrame,
}

/// Frames that were dropped because of a recoverable error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    PoseUnavailable,
    NoReferenceObjects,
    /// Writing the frame failed, `index` is retried with the next frame
    Persistence { index: u32 },
    /// The simulator rejected a command, the world is in an unknown state
    Simulator,
}

/// What happened to an admitted frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Discarded(DiscardReason),
    Persisted { index: u32, points: usize },
    SkippedEmpty,
    Skipped(SkipReason),
    /// The dataset was already complete when the frame arrived
    Finished,
}

/// The labeling pipeline. Owns all process-wide state and processes one admitted frame at a time
pub struct Pipeline {
    roster: Roster,
    generator: LayoutGenerator,
    filter: RadiusOutlierFilter,
    platform: PlatformConfig,
    discard_policy: DiscardPolicy,
    settle: SettlePolicy,
    rng: StdRng,
    simulator: Box<dyn Simulator + Send>,
    pose: Box<dyn PoseSource + Send>,
    publisher: Option<Box<dyn ColorPublisher + Send>>,
    sequencer: DatasetSequencer,
    state: PipelineState,
    stats: RunStats,
}

impl Pipeline {
    pub fn new(config: &LabelerConfig, collaborators: Collaborators) -> Result<Self, LabelError> {
        config.validate()?;
        let roster = config.roster()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            roster,
            generator: LayoutGenerator::new(config.layout.clone()),
            filter: RadiusOutlierFilter::new(&config.denoise),
            platform: config.platform.clone(),
            discard_policy: config.discard_policy,
            settle: config.settle.clone(),
            rng,
            simulator: collaborators.simulator,
            pose: collaborators.pose,
            publisher: if config.visual {
                collaborators.publisher
            } else {
                None
            },
            sequencer: DatasetSequencer::new(collaborators.writer),
            state: PipelineState::new(config.dataset.start_index, config.dataset.max_index),
            stats: Default::default(),
        })
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut RunStats {
        &mut self.stats
    }

    pub fn is_done(&self) -> bool {
        self.state.is_done()
    }

    pub fn num_written_frames(&self) -> usize {
        self.sequencer.num_written_frames()
    }

    /// Runs one admitted frame through the pipeline. Recoverable errors are logged and reported as
    /// `FrameOutcome::Skipped`, only errors that make further progress impossible are returned
    pub fn process_frame(&mut self, frame: &RawFrame) -> Result<FrameOutcome, LabelError> {
        if self.state.is_done() {
            self.stats.after_done += 1;
            return Ok(FrameOutcome::Finished);
        }

        let result = match self.discard_policy {
            DiscardPolicy::PerRelayout => self.process_per_relayout(frame),
            DiscardPolicy::FirstFrameOnly => self.process_first_frame_only(frame),
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => match skip_reason(&err) {
                Some(reason) => {
                    warn!("Skipping frame @ {:.3}s: {}", frame.stamp.as_secs_f64(), err);
                    FrameOutcome::Skipped(reason)
                }
                None => return Err(err),
            },
        };
        self.record(&outcome);
        Ok(outcome)
    }

    fn process_per_relayout(&mut self, frame: &RawFrame) -> Result<FrameOutcome, LabelError> {
        let rotation = self.pose.sensor_rotation(&frame.frame_id)?;

        let current = match self.state.realized() {
            Some(layout) => to_sensor_frame(layout, &rotation),
            None => {
                self.state.consume_first_frame();
                self.relayout()?;
                return Ok(FrameOutcome::Discarded(DiscardReason::Bootstrap));
            }
        };

        match self.state.phase() {
            Phase::Armed => {
                self.state.set_phase(Phase::Capturing);
                Ok(FrameOutcome::Discarded(DiscardReason::Unsettled))
            }
            Phase::Capturing => {
                let outcome = self.label_and_persist(frame, &current)?;
                if matches!(outcome, FrameOutcome::Persisted { .. }) && !self.state.is_done() {
                    self.relayout_after_persist()?;
                }
                Ok(outcome)
            }
            Phase::Done => Ok(FrameOutcome::Finished),
        }
    }

    fn process_first_frame_only(&mut self, frame: &RawFrame) -> Result<FrameOutcome, LabelError> {
        let rotation = self.pose.sensor_rotation(&frame.frame_id)?;

        let first_frame = self.state.consume_first_frame();
        let previous = match self.state.take_realized() {
            Some(layout) if !first_frame => layout,
            _ => {
                self.relayout()?;
                return Ok(FrameOutcome::Discarded(DiscardReason::FirstFrame));
            }
        };

        // The frame was captured in the world of the previous layout, so it is labeled against that one while
        // the world already moves on to the next
        let current = to_sensor_frame(&previous, &rotation);
        self.relayout()?;
        self.label_and_persist(frame, &current)
    }

    fn label_and_persist(&mut self, frame: &RawFrame, layout: &TransformedLayout) -> Result<FrameOutcome, LabelError> {
        let denoised = RawFrame {
            frame_id: frame.frame_id.clone(),
            stamp: frame.stamp,
            points: self.filter.denoise(&frame.points),
        };
        debug!(
            "Denoised frame @ {:.3}s: {} -> {} points",
            frame.stamp.as_secs_f64(),
            frame.len(),
            denoised.len()
        );

        let labeled = classify_frame(&denoised, layout)?;
        if let Some(publisher) = self.publisher.as_mut() {
            if let Err(err) = publisher.publish(&labeled) {
                warn!("Could not publish classified frame: {}", err);
            }
        }

        Ok(match self.sequencer.persist(&mut self.state, &labeled)? {
            SequencerStep::Persisted { index, points } => FrameOutcome::Persisted { index, points },
            SequencerStep::SkippedEmpty => FrameOutcome::SkippedEmpty,
        })
    }

    /// A failed re-layout must not undo the frame that was just persisted. The failure is counted and the
    /// pipeline starts over with a fresh layout on the next frame
    fn relayout_after_persist(&mut self) -> Result<(), LabelError> {
        match self.relayout() {
            Err(err) if !err.is_fatal() => {
                warn!("Re-layout after persisting frame {} failed: {}", self.state.counter(), err);
                self.stats.relayout_failures += 1;
                Ok(())
            }
            other => other,
        }
    }

    /// Generates a new layout, moves the world there and waits for it to settle. On simulator failure the
    /// realized layout is forgotten, since the world may now be anywhere in between
    fn relayout(&mut self) -> Result<(), LabelError> {
        let layout = self.generator.generate(&self.roster, &mut self.rng)?;
        if let Err(source) = self.realize(&layout) {
            self.state.forget_layout();
            return Err(LabelError::Simulator { source });
        }

        info!(
            "Realized layout #{}: {}",
            self.stats.layouts_realized + 1,
            layout
                .placements()
                .iter()
                .map(|placement| format!(
                    "{} ({}, {})",
                    placement.object_id, placement.position.x, placement.position.y
                ))
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.stats.layouts_realized += 1;
        self.state.arm(layout);
        Ok(())
    }

    fn realize(&mut self, layout: &Layout) -> anyhow::Result<()> {
        let mut targets: Vec<(String, Point3<f64>)> = layout
            .placements()
            .iter()
            .map(|placement| (placement.object_id.clone(), placement.world_position()))
            .collect();
        targets.push((self.platform.id.clone(), self.platform.default_pose()));

        for (model, position) in &targets {
            self.simulator.set_model_position(model, *position)?;
        }

        let outcome = self.settle.settle(&*self.simulator, &targets)?;
        debug!("Settle: {:?}", outcome);
        Ok(())
    }

    fn record(&mut self, outcome: &FrameOutcome) {
        let stats = &mut self.stats;
        match *outcome {
            FrameOutcome::Discarded(_) => stats.discarded += 1,
            FrameOutcome::Persisted { points, .. } => {
                stats.persisted += 1;
                stats.points_persisted += points;
            }
            FrameOutcome::SkippedEmpty => {
                warn!("Labeled frame is empty after denoising, nothing saved");
                stats.skipped_empty += 1;
            }
            FrameOutcome::Skipped(SkipReason::PoseUnavailable) => stats.pose_unavailable += 1,
            FrameOutcome::Skipped(SkipReason::NoReferenceObjects) => stats.no_reference_objects += 1,
            FrameOutcome::Skipped(SkipReason::Persistence { .. }) => stats.persistence_failures += 1,
            FrameOutcome::Skipped(SkipReason::Simulator) => stats.simulator_failures += 1,
            FrameOutcome::Finished => stats.after_done += 1,
        }
    }
}

/// How a frame that failed with `err` is skipped, or `None` if the error ends the run
fn skip_reason(err: &LabelError) -> Option<SkipReason> {
    match err {
        LabelError::PoseUnavailable { .. } => Some(SkipReason::PoseUnavailable),
        LabelError::NoReferenceObjects => Some(SkipReason::NoReferenceObjects),
        LabelError::Persistence { index, .. } => Some(SkipReason::Persistence { index: *index }),
        LabelError::Simulator { .. } => Some(SkipReason::Simulator),
        LabelError::PlacementInfeasible { .. } | LabelError::UnknownClass(_) | LabelError::Config(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use frames::ClassId;

    #[test]
    fn test_only_fatal_errors_end_the_run() {
        let errors = vec![
            LabelError::PoseUnavailable {
                source_frame: "/velodyne".into(),
                target_frame: "/base_link".into(),
            },
            LabelError::NoReferenceObjects,
            LabelError::Persistence {
                index: 602,
                source: anyhow!("disk full"),
            },
            LabelError::Simulator {
                source: anyhow!("service unavailable"),
            },
            LabelError::PlacementInfeasible {
                object: "dock1".into(),
                attempts: 10,
            },
            LabelError::UnknownClass(ClassId(9)),
            LabelError::Config("bad".into()),
        ];

        for err in &errors {
            assert_eq!(skip_reason(err).is_none(), err.is_fatal(), "{:?}", err);
        }
        assert_eq!(skip_reason(&errors[1]), Some(SkipReason::NoReferenceObjects));
        assert_eq!(skip_reason(&errors[2]), Some(SkipReason::Persistence { index: 602 }));
    }
}
