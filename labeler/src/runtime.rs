use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use frames::RawFrame;
use log::{debug, error, info};
use tokio::{sync::mpsc, task::JoinSet};

use crate::{
    pipeline::{CaptureGate, FrameOutcome, Pipeline},
    stats::RunStats,
    LabelError,
};

type FrameResult = (Result<FrameOutcome, LabelError>, bool);

/// Feeds the frames arriving on `frames` through `pipeline` until the dataset is complete or the frame source
/// closes. At most one frame is processed at a time, frames arriving in the meantime are dropped
pub async fn run_pipeline(pipeline: Pipeline, mut frames: mpsc::Receiver<RawFrame>) -> Result<RunStats> {
    let t_start = Instant::now();
    let gate = CaptureGate::new(pipeline);
    let mut in_flight: JoinSet<FrameResult> = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            Some(joined) = in_flight.join_next() => {
                if handle_finished_frame(joined)? {
                    break;
                }
            }
            frame = frames.recv() => {
                let frame = match frame {
                    Some(frame) => frame,
                    None => {
                        info!("Frame source closed");
                        break;
                    }
                };
                match gate.try_admit() {
                    Some(mut pipeline) => {
                        in_flight.spawn_blocking(move || {
                            let result = pipeline.process_frame(&frame);
                            (result, pipeline.is_done())
                        });
                    }
                    None => debug!(
                        "Pipeline busy, dropping frame @ {:.3}s",
                        frame.stamp.as_secs_f64()
                    ),
                }
            }
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        handle_finished_frame(joined)?;
    }

    let dropped_busy = gate.dropped_frames();
    let mut pipeline = gate
        .into_inner()
        .ok_or_else(|| anyhow!("Pipeline is still in use after all frames finished"))?;
    let stats = pipeline.stats_mut();
    stats.dropped_busy = dropped_busy;
    stats.runtime = t_start.elapsed();
    Ok(*stats)
}

/// Returns true if the dataset is complete
fn handle_finished_frame(joined: Result<FrameResult, tokio::task::JoinError>) -> Result<bool> {
    let (result, done) = joined.context("Frame processing task failed")?;
    match result {
        Ok(outcome) => {
            debug!("Frame outcome: {:?}", outcome);
            Ok(done)
        }
        Err(err) => {
            error!("Auto labeling aborted: {}", err);
            Err(anyhow::Error::new(err).context("Auto labeling aborted"))
        }
    }
}
