use frames::LabeledFrame;
use log::info;

use crate::{io::FrameWriter, LabelError};

use super::PipelineState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerStep {
    Persisted { index: u32, points: usize },
    /// Nothing survived denoising, no file was written and the counter did not move
    SkippedEmpty,
}

/// Writes labeled frames under consecutive indices and decides when the dataset is complete
pub struct DatasetSequencer {
    writer: Box<dyn FrameWriter + Send>,
}

impl DatasetSequencer {
    pub fn new(writer: Box<dyn FrameWriter + Send>) -> Self {
        Self { writer }
    }

    /// Persists `frame` at the next index of `state`. The counter only advances if the write succeeded, so a
    /// failed index is retried with the next eligible frame
    pub fn persist(
        &mut self,
        state: &mut PipelineState,
        frame: &LabeledFrame,
    ) -> Result<SequencerStep, LabelError> {
        if frame.is_empty() {
            return Ok(SequencerStep::SkippedEmpty);
        }

        let index = state.next_index();
        self.writer
            .write_frame(index, frame)
            .map_err(|source| LabelError::Persistence { index, source })?;
        state.record_persisted(index);

        if state.is_done() {
            info!(
                "Finished auto labeling: wrote file {} of {}",
                index,
                state.max_index()
            );
        }

        Ok(SequencerStep::Persisted {
            index,
            points: frame.len(),
        })
    }

    pub fn num_written_frames(&self) -> usize {
        self.writer.num_written_frames()
    }
}
