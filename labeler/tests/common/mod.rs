#![allow(dead_code)]

use std::{
    collections::{BTreeMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{bail, Result};
use frames::{ClassId, LabeledFrame, RawFrame};
use labeler::{
    config::LabelerConfig,
    io::{FrameWriter, InMemoryWriter, PoseSource, Simulator, StaticPose},
    pipeline::{Collaborators, DiscardPolicy, Pipeline, SettlePolicy},
    sim::{SyntheticWorld, WorldConfig},
    LabelError,
};
use nalgebra::{Point3, Rotation3};

pub const SEED: u64 = 42;

/// Config for tests: no settle delay, fixed seed, nothing published
pub fn test_config(start_index: u32, max_index: u32, discard_policy: DiscardPolicy) -> LabelerConfig {
    let mut config = LabelerConfig::default();
    config.dataset.start_index = start_index;
    config.dataset.max_index = max_index;
    config.discard_policy = discard_policy;
    config.settle = SettlePolicy::Fixed { delay_ms: 0 };
    config.seed = Some(SEED);
    config.visual = false;
    config
}

/// A world without clutter, so every rendered point belongs to an object
pub fn quiet_world() -> SyntheticWorld {
    SyntheticWorld::new(
        WorldConfig {
            clutter_points: 0,
            seed: Some(SEED),
            ..Default::default()
        },
        Rotation3::identity(),
    )
    .with_invisible_model("wamv")
}

pub fn collaborators(
    simulator: impl Simulator + Send + 'static,
    pose: impl PoseSource + Send + 'static,
    writer: impl FrameWriter + Send + 'static,
) -> Collaborators {
    Collaborators {
        simulator: Box::new(simulator),
        pose: Box::new(pose),
        writer: Box::new(writer),
        publisher: None,
    }
}

/// Pipeline over a quiet synthetic world with a static identity pose. Returns the world so that tests can render
/// frames from it, and the writer to inspect what was persisted
pub fn world_pipeline(config: &LabelerConfig) -> Result<(Pipeline, SyntheticWorld, InMemoryWriter)> {
    let world = quiet_world();
    let writer = InMemoryWriter::default();
    let pipeline = Pipeline::new(
        config,
        collaborators(
            world.clone(),
            StaticPose::new(Rotation3::identity()),
            writer.clone(),
        ),
    )?;
    Ok((pipeline, world, writer))
}

pub fn render(world: &SyntheticWorld, frame_number: u64) -> RawFrame {
    world
        .render_frame(Duration::from_millis(100 * frame_number))
        .expect("Rendering failed")
}

/// Number of points per class a quiet world renders for the default roster
pub fn expected_histogram() -> BTreeMap<ClassId, usize> {
    let per_object = WorldConfig::default().points_per_object;
    [(ClassId(2), per_object), (ClassId(3), 2 * per_object), (ClassId(4), per_object)]
        .into_iter()
        .collect()
}

pub fn assert_frame_matches_world(frame: &LabeledFrame) {
    assert_eq!(frame.class_histogram(), expected_histogram());
    assert!(frame
        .points
        .iter()
        .all(|point| Some(point.color) == point.label.color()));
}

/// Pose source that fails on the calls whose (zero-based) number is listed
pub struct ScriptedPose {
    calls: usize,
    failing_calls: Vec<usize>,
}

impl ScriptedPose {
    pub fn failing_on(failing_calls: Vec<usize>) -> Self {
        Self {
            calls: 0,
            failing_calls,
        }
    }
}

impl PoseSource for ScriptedPose {
    fn sensor_rotation(&mut self, frame_id: &str) -> Result<Rotation3<f64>, LabelError> {
        let call = self.calls;
        self.calls += 1;
        if self.failing_calls.contains(&call) {
            return Err(LabelError::PoseUnavailable {
                source_frame: frame_id.to_owned(),
                target_frame: "/base_link".into(),
            });
        }
        Ok(Rotation3::identity())
    }
}

/// Writer that fails a given number of times before it starts to write
pub struct FlakyWriter {
    failures_left: usize,
    inner: InMemoryWriter,
}

impl FlakyWriter {
    pub fn new(failures: usize, inner: InMemoryWriter) -> Self {
        Self {
            failures_left: failures,
            inner,
        }
    }
}

impl FrameWriter for FlakyWriter {
    fn write_frame(&mut self, index: u32, frame: &LabeledFrame) -> Result<()> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            bail!("Disk not ready");
        }
        self.inner.write_frame(index, frame)
    }

    fn num_written_frames(&self) -> usize {
        self.inner.num_written_frames()
    }
}

/// Wraps a simulator and rejects the move commands whose (zero-based) number is listed. All commands are recorded
#[derive(Clone)]
pub struct FlakySimulator<S> {
    inner: S,
    failing_commands: Vec<usize>,
    commands: Arc<Mutex<VecDeque<(String, Point3<f64>)>>>,
}

impl<S> FlakySimulator<S> {
    pub fn new(inner: S, failing_commands: Vec<usize>) -> Self {
        Self {
            inner,
            failing_commands,
            commands: Default::default(),
        }
    }

    pub fn commands(&self) -> Vec<(String, Point3<f64>)> {
        self.commands.lock().unwrap().iter().cloned().collect()
    }
}

impl<S: Simulator> Simulator for FlakySimulator<S> {
    fn set_model_position(&mut self, model: &str, position: Point3<f64>) -> Result<()> {
        let command = {
            let mut commands = self.commands.lock().unwrap();
            commands.push_back((model.to_owned(), position));
            commands.len() - 1
        };
        if self.failing_commands.contains(&command) {
            bail!("Service call to move '{}' failed", model);
        }
        self.inner.set_model_position(model, position)
    }

    fn model_position(&self, model: &str) -> Result<Option<Point3<f64>>> {
        self.inner.model_position(model)
    }
}
