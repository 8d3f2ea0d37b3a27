use std::time::{Duration, Instant};

use anyhow::Result;
use log::{debug, warn};
use nalgebra::{distance, Point3};
use serde::{Deserialize, Serialize};

use crate::io::Simulator;

/// How the pipeline waits for the simulated world to reflect a freshly commanded layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SettlePolicy {
    /// Sleep for a fixed amount of time
    Fixed { delay_ms: u64 },
    /// Poll the simulator until every model reports its commanded position
    Acknowledge {
        timeout_ms: u64,
        poll_interval_ms: u64,
        /// Maximum distance between commanded and reported position
        tolerance: f64,
    },
}

impl Default for SettlePolicy {
    fn default() -> Self {
        SettlePolicy::Fixed { delay_ms: 5000 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    Waited(Duration),
    Acknowledged(Duration),
    /// Some models never reported their target position. The pipeline continues anyway
    TimedOut(Duration),
}

impl SettlePolicy {
    /// Blocks until the world has settled on `targets` according to this policy
    pub fn settle(&self, simulator: &dyn Simulator, targets: &[(String, Point3<f64>)]) -> Result<SettleOutcome> {
        match *self {
            SettlePolicy::Fixed { delay_ms } => {
                let delay = Duration::from_millis(delay_ms);
                std::thread::sleep(delay);
                Ok(SettleOutcome::Waited(delay))
            }
            SettlePolicy::Acknowledge {
                timeout_ms,
                poll_interval_ms,
                tolerance,
            } => {
                let timeout = Duration::from_millis(timeout_ms);
                let poll_interval = Duration::from_millis(poll_interval_ms);
                let t_start = Instant::now();
                loop {
                    let pending = pending_models(simulator, targets, tolerance)?;
                    let elapsed = t_start.elapsed();
                    if pending.is_empty() {
                        debug!("World settled after {}ms", elapsed.as_millis());
                        return Ok(SettleOutcome::Acknowledged(elapsed));
                    }
                    if elapsed >= timeout {
                        warn!(
                            "World did not settle within {}ms, models still off target: {}",
                            timeout_ms,
                            pending.join(", ")
                        );
                        return Ok(SettleOutcome::TimedOut(elapsed));
                    }
                    std::thread::sleep(poll_interval.min(timeout - elapsed));
                }
            }
        }
    }
}

fn pending_models<'a>(
    simulator: &dyn Simulator,
    targets: &'a [(String, Point3<f64>)],
    tolerance: f64,
) -> Result<Vec<&'a str>> {
    let mut pending = vec![];
    for (model, target) in targets {
        let on_target = simulator
            .model_position(model)?
            .map(|position| distance(&position, target) <= tolerance)
            .unwrap_or(false);
        if !on_target {
            pending.push(model.as_str());
        }
    }
    Ok(pending)
}
