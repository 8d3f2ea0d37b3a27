use anyhow::Result;
use frames::LabeledFrame;
use itertools::Itertools;
use log::debug;

/// Side output for classified frames, used for live inspection while the dataset is generated
pub trait ColorPublisher {
    fn publish(&mut self, frame: &LabeledFrame) -> Result<()>;
}

/// Publishes a per-class summary of each frame to the log
#[derive(Default)]
pub struct LogPublisher {
    published: usize,
}

impl LogPublisher {
    pub fn published(&self) -> usize {
        self.published
    }
}

impl ColorPublisher for LogPublisher {
    fn publish(&mut self, frame: &LabeledFrame) -> Result<()> {
        self.published += 1;
        let summary = frame
            .class_histogram()
            .into_iter()
            .map(|(class, count)| format!("class {}: {}", class, count))
            .join(", ");
        debug!(
            "Classified frame '{}' @ {:.3}s: {} points ({})",
            frame.frame_id,
            frame.stamp.as_secs_f64(),
            frame.len(),
            summary
        );
        Ok(())
    }
}
