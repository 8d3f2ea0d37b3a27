use std::{
    collections::HashMap,
    f64::consts::TAU,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use anyhow::{anyhow, Result};
use frames::RawFrame;
use log::{debug, info};
use nalgebra::{Point3, Rotation3, Vector3};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
};

use crate::io::Simulator;

/// Parameters of the in-process world that stands in for the external simulator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Time between two rendered sensor frames
    pub frame_period_ms: u64,
    /// Points sampled on the surface of every object per frame
    pub points_per_object: usize,
    /// Horizontal radius of the disc the object points are sampled from
    pub object_radius: f64,
    /// Vertical extent of every object above its placement height
    pub object_height: f64,
    /// Isolated points scattered through the scene, the denoiser is expected to remove them
    pub clutter_points: usize,
    /// Clutter is drawn from `[-clutter_range, clutter_range]` in x and y
    pub clutter_range: f64,
    pub seed: Option<u64>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            frame_period_ms: 100,
            points_per_object: 60,
            object_radius: 0.8,
            object_height: 1.5,
            clutter_points: 20,
            clutter_range: 40.0,
            seed: None,
        }
    }
}

struct WorldState {
    models: HashMap<String, Point3<f64>>,
    rng: StdRng,
}

/// A simulated world that accepts model moves, reports model positions back and renders sensor frames of the
/// models it contains. Clones share the same world
#[derive(Clone)]
pub struct SyntheticWorld {
    config: WorldConfig,
    /// Models that are moved around but never show up in a frame, i.e. the platform carrying the sensor
    invisible: Vec<String>,
    /// Frame id stamped on every rendered frame
    frame_id: String,
    sensor_rotation: Rotation3<f64>,
    state: Arc<Mutex<WorldState>>,
}

impl SyntheticWorld {
    pub fn new(config: WorldConfig, sensor_rotation: Rotation3<f64>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            invisible: vec![],
            frame_id: "velodyne".into(),
            sensor_rotation,
            state: Arc::new(Mutex::new(WorldState {
                models: HashMap::new(),
                rng,
            })),
        }
    }

    pub fn with_invisible_model(mut self, model: impl Into<String>) -> Self {
        self.invisible.push(model.into());
        self
    }

    pub fn with_frame_id(mut self, frame_id: impl Into<String>) -> Self {
        self.frame_id = frame_id.into();
        self
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, WorldState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("Synthetic world state is poisoned"))
    }

    /// Renders one sensor frame of the current world, expressed in the sensor frame
    pub fn render_frame(&self, stamp: Duration) -> Result<RawFrame> {
        let mut state = self.lock()?;
        let WorldState { models, rng } = &mut *state;

        let mut world_points = Vec::with_capacity(
            models.len() * self.config.points_per_object + self.config.clutter_points,
        );
        for (model, position) in models.iter() {
            if self.invisible.contains(model) {
                continue;
            }
            for _ in 0..self.config.points_per_object {
                let angle = rng.gen_range(0.0..TAU);
                let radius = self.config.object_radius * rng.gen::<f64>().sqrt();
                world_points.push(Vector3::new(
                    position.x + radius * angle.cos(),
                    position.y + radius * angle.sin(),
                    position.z + rng.gen_range(0.0..=self.config.object_height),
                ));
            }
        }

        let range = self.config.clutter_range;
        for _ in 0..self.config.clutter_points {
            world_points.push(Vector3::new(
                rng.gen_range(-range..=range),
                rng.gen_range(-range..=range),
                rng.gen_range(0.0..=2.0),
            ));
        }

        Ok(RawFrame::from_positions(
            self.frame_id.clone(),
            stamp,
            world_points
                .into_iter()
                .map(|position| self.sensor_rotation * position),
        ))
    }
}

impl Simulator for SyntheticWorld {
    fn set_model_position(&mut self, model: &str, position: Point3<f64>) -> Result<()> {
        self.lock()?.models.insert(model.to_owned(), position);
        Ok(())
    }

    fn model_position(&self, model: &str) -> Result<Option<Point3<f64>>> {
        Ok(self.lock()?.models.get(model).copied())
    }
}

/// Renders a frame every `frame_period_ms` and sends it into `sender` until the receiving side is closed. Frames
/// that don't fit into the channel are lost, like frames of a real sensor that nobody listens to
pub fn spawn_feed(world: SyntheticWorld, sender: mpsc::Sender<RawFrame>) -> JoinHandle<Result<()>> {
    tokio::spawn(async move {
        let period = Duration::from_millis(world.config().frame_period_ms.max(1));
        let mut interval = tokio::time::interval(period);
        let t_start = Instant::now();
        let mut sent = 0usize;

        loop {
            interval.tick().await;
            let frame = world.render_frame(t_start.elapsed())?;
            match sender.try_send(frame) {
                Ok(()) => sent += 1,
                Err(TrySendError::Full(_)) => debug!("Frame channel is full, frame lost"),
                Err(TrySendError::Closed(_)) => break,
            }
        }

        info!("Sensor feed stopped after {} frames", sent);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::planar_distance;
    use std::f64::consts::FRAC_PI_2;

    fn quiet_world() -> SyntheticWorld {
        SyntheticWorld::new(
            WorldConfig {
                clutter_points: 0,
                seed: Some(1),
                ..Default::default()
            },
            Rotation3::identity(),
        )
    }

    #[test]
    fn test_reports_commanded_positions() {
        let mut world = quiet_world();
        assert_eq!(world.model_position("dock1").unwrap(), None);
        world
            .set_model_position("dock1", Point3::new(10.0, -4.0, 0.0))
            .unwrap();
        assert_eq!(
            world.model_position("dock1").unwrap(),
            Some(Point3::new(10.0, -4.0, 0.0))
        );
    }

    #[test]
    fn test_frame_samples_around_visible_models() {
        let mut world = quiet_world().with_invisible_model("wamv");
        world
            .set_model_position("dock1", Point3::new(10.0, 10.0, 0.0))
            .unwrap();
        world.set_model_position("wamv", Point3::origin()).unwrap();

        let frame = world.render_frame(Duration::ZERO).unwrap();
        assert_eq!(frame.len(), world.config().points_per_object);
        let center = Vector3::new(10.0, 10.0, 0.0);
        assert!(frame
            .points
            .iter()
            .all(|point| planar_distance(&point.position, &center) <= world.config().object_radius + 1e-9));
    }

    #[test]
    fn test_frame_is_rotated_into_sensor_frame() {
        let rotation = Rotation3::from_euler_angles(0.0, 0.0, FRAC_PI_2);
        let mut world = SyntheticWorld::new(
            WorldConfig {
                clutter_points: 0,
                object_radius: 0.0,
                object_height: 0.0,
                points_per_object: 1,
                seed: Some(3),
                ..Default::default()
            },
            rotation,
        );
        world
            .set_model_position("buoy_s", Point3::new(10.0, 0.0, 0.0))
            .unwrap();

        let frame = world.render_frame(Duration::ZERO).unwrap();
        assert!((frame.points[0].position - Vector3::new(0.0, 10.0, 0.0)).norm() < 1e-9);
    }

    #[tokio::test]
    async fn test_feed_stops_when_receiver_is_dropped() {
        let world = SyntheticWorld::new(
            WorldConfig {
                frame_period_ms: 1,
                seed: Some(5),
                ..Default::default()
            },
            Rotation3::identity(),
        );
        let (sender, mut receiver) = mpsc::channel(4);
        let feed = spawn_feed(world, sender);

        let frame = receiver.recv().await.unwrap();
        assert_eq!(frame.frame_id, "velodyne");
        drop(receiver);

        feed.await.unwrap().unwrap();
    }
}
