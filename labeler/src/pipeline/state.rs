use serde::{Deserialize, Serialize};

use crate::layout::Layout;

/// When a frame has to be thrown away instead of labeled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardPolicy {
    /// Discard the first frame after every re-layout, it may have been captured before the world settled
    #[default]
    PerRelayout,
    /// Discard only the very first frame of the run. Every admitted frame triggers a re-layout and is labeled
    /// against the layout that was realized before it
    FirstFrameOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The next admitted frame is discarded
    Armed,
    /// The next admitted frame is labeled against the realized layout
    Capturing,
    /// The dataset is complete, frames are ignored
    Done,
}

/// Process-wide labeling state. Created once per run and never reset
#[derive(Debug, Clone)]
pub struct PipelineState {
    phase: Phase,
    /// Layout currently realized in the simulated world, in the placement frame
    realized: Option<Layout>,
    /// Index of the last persisted file, seeded with the configured start index
    counter: u32,
    max_index: u32,
    first_frame: bool,
}

impl PipelineState {
    pub fn new(start_index: u32, max_index: u32) -> Self {
        Self {
            phase: if start_index >= max_index {
                Phase::Done
            } else {
                Phase::Armed
            },
            realized: None,
            counter: start_index,
            max_index,
            first_frame: true,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn realized(&self) -> Option<&Layout> {
        self.realized.as_ref()
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn max_index(&self) -> u32 {
        self.max_index
    }

    /// Index the next persisted frame is written at
    pub fn next_index(&self) -> u32 {
        self.counter + 1
    }

    pub fn is_first_frame(&self) -> bool {
        self.first_frame
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    pub(crate) fn consume_first_frame(&mut self) -> bool {
        std::mem::replace(&mut self.first_frame, false)
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        if self.phase != Phase::Done {
            self.phase = phase;
        }
    }

    /// Records a new layout as realized in the world and arms the discard of the next frame
    pub(crate) fn arm(&mut self, layout: Layout) {
        self.realized = Some(layout);
        self.set_phase(Phase::Armed);
    }

    pub(crate) fn take_realized(&mut self) -> Option<Layout> {
        self.realized.take()
    }

    /// Forgets the realized layout after the world ended up in an unknown state. The next frame starts over as
    /// if it was the first one
    pub(crate) fn forget_layout(&mut self) {
        self.realized = None;
        self.first_frame = true;
        self.set_phase(Phase::Armed);
    }

    /// Advances the counter to `index` after the frame was persisted there
    pub(crate) fn record_persisted(&mut self, index: u32) {
        debug_assert_eq!(index, self.next_index());
        self.counter = index;
        if self.counter >= self.max_index {
            self.phase = Phase::Done;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = PipelineState::new(601, 605);
        assert_eq!(state.phase(), Phase::Armed);
        assert_eq!(state.counter(), 601);
        assert_eq!(state.next_index(), 602);
        assert!(state.is_first_frame());
        assert!(state.realized().is_none());
    }

    #[test]
    fn test_counter_reaches_max() {
        let mut state = PipelineState::new(601, 605);
        for index in 602..=604 {
            state.record_persisted(index);
            assert!(!state.is_done());
        }
        state.record_persisted(605);
        assert!(state.is_done());
        assert_eq!(state.counter(), 605);
    }

    #[test]
    fn test_done_is_terminal() {
        let mut state = PipelineState::new(1, 2);
        state.record_persisted(2);
        state.arm(Layout::new(vec![]));
        state.forget_layout();
        assert_eq!(state.phase(), Phase::Done);
    }

    #[test]
    fn test_empty_range_starts_done() {
        assert!(PipelineState::new(800, 800).is_done());
    }

    #[test]
    fn test_first_frame_is_consumed_once() {
        let mut state = PipelineState::new(0, 10);
        assert!(state.consume_first_frame());
        assert!(!state.consume_first_frame());
        state.forget_layout();
        assert!(state.consume_first_frame());
    }
}
