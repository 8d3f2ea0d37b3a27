use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Context, Result};
use frames::{write_labeled_pcd, LabeledFrame, PcdEncoding};
use log::info;

/// Trait for the component that persists labeled frames under a sequential index
pub trait FrameWriter {
    fn write_frame(&mut self, index: u32, frame: &LabeledFrame) -> Result<()>;
    fn num_written_frames(&self) -> usize;
}

/// Writes each frame into its own PCD file `<root_dir>/<prefix><index>.pcd`
pub struct PcdFrameWriter {
    root_dir: PathBuf,
    file_prefix: String,
    encoding: PcdEncoding,
    written_count: usize,
}

impl PcdFrameWriter {
    pub fn new(root_dir: impl AsRef<Path>, file_prefix: impl Into<String>, encoding: PcdEncoding) -> Result<Self> {
        let path = root_dir.as_ref();
        if !path.exists() {
            std::fs::create_dir_all(path)
                .with_context(|| format!("Could not create output directory {}", path.display()))?;
        }
        if !path.is_dir() {
            return Err(anyhow!("Path {} is no directory!", path.display()));
        }

        Ok(Self {
            root_dir: path.to_owned(),
            file_prefix: file_prefix.into(),
            encoding,
            written_count: 0,
        })
    }

    pub fn file_path(&self, index: u32) -> PathBuf {
        self.root_dir.join(format!("{}{}.pcd", self.file_prefix, index))
    }
}

impl FrameWriter for PcdFrameWriter {
    fn write_frame(&mut self, index: u32, frame: &LabeledFrame) -> Result<()> {
        let file_path = self.file_path(index);
        write_labeled_pcd(&file_path, &frame.points, self.encoding)?;
        self.written_count += 1;
        info!("Saved PCD file {} ({} points)", file_path.display(), frame.len());
        Ok(())
    }

    fn num_written_frames(&self) -> usize {
        self.written_count
    }
}

/// Keeps all written frames in memory. Clones share the same storage, so a handle can be kept to inspect the
/// frames after the writer was handed to a pipeline
#[derive(Clone, Default)]
pub struct InMemoryWriter {
    frames: Arc<Mutex<Vec<(u32, LabeledFrame)>>>,
}

impl InMemoryWriter {
    /// All frames written so far, in write order
    pub fn frames(&self) -> Vec<(u32, LabeledFrame)> {
        self.frames.lock().expect("Mutex was poisoned").clone()
    }

    pub fn indices(&self) -> Vec<u32> {
        self.frames
            .lock()
            .expect("Mutex was poisoned")
            .iter()
            .map(|(index, _)| *index)
            .collect()
    }
}

impl FrameWriter for InMemoryWriter {
    fn write_frame(&mut self, index: u32, frame: &LabeledFrame) -> Result<()> {
        self.frames
            .lock()
            .map_err(|_| anyhow!("In-memory frame storage was poisoned"))?
            .push((index, frame.clone()));
        Ok(())
    }

    fn num_written_frames(&self) -> usize {
        self.frames.lock().map(|frames| frames.len()).unwrap_or_default()
    }
}
