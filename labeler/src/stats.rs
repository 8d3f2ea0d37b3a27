use std::{fmt::Display, time::Duration};

/// Bookkeeping over all frames a run has seen. Every frame ends up in exactly one of the frame counters
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct RunStats {
    /// Frames that arrived while another frame was in flight
    pub dropped_busy: usize,
    /// Frames captured before the world was known to match the layout
    pub discarded: usize,
    pub persisted: usize,
    /// Frames that were empty after denoising
    pub skipped_empty: usize,
    pub pose_unavailable: usize,
    pub persistence_failures: usize,
    /// Frames dropped because the simulator rejected a command
    pub simulator_failures: usize,
    /// Re-layouts that failed after their frame was already persisted
    pub relayout_failures: usize,
    pub no_reference_objects: usize,
    /// Frames that arrived after the dataset was complete
    pub after_done: usize,
    pub layouts_realized: usize,
    pub points_persisted: usize,
    pub runtime: Duration,
}

impl RunStats {
    /// Frames that were admitted through the capture gate
    pub fn admitted(&self) -> usize {
        self.discarded
            + self.persisted
            + self.skipped_empty
            + self.pose_unavailable
            + self.persistence_failures
            + self.no_reference_objects
            + self.simulator_failures
            + self.after_done
    }
}

impl Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Runtime: {:.2}s", self.runtime.as_secs_f64())?;
        writeln!(f, "Frames admitted: {}", self.admitted())?;
        writeln!(f, "Frames dropped (busy): {}", self.dropped_busy)?;
        writeln!(f, "Frames discarded: {}", self.discarded)?;
        writeln!(f, "Frames persisted: {}", self.persisted)?;
        writeln!(f, "Frames empty after denoising: {}", self.skipped_empty)?;
        writeln!(f, "Pose unavailable: {}", self.pose_unavailable)?;
        writeln!(f, "Persistence failures: {}", self.persistence_failures)?;
        writeln!(f, "Frames without reference objects: {}", self.no_reference_objects)?;
        writeln!(f, "Simulator failures: {}", self.simulator_failures)?;
        writeln!(f, "Failed re-layouts after persist: {}", self.relayout_failures)?;
        writeln!(f, "Frames after completion: {}", self.after_done)?;
        writeln!(f, "Layouts realized: {}", self.layouts_realized)?;
        writeln!(f, "Points persisted: {}", self.points_persisted)?;
        Ok(())
    }
}
