use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use labeler::{
    config::LabelerConfig,
    io::{FrameWriter, InMemoryWriter, LogPublisher, PcdFrameWriter, StaticPose},
    pipeline::{Collaborators, Pipeline, SettlePolicy},
    runtime::run_pipeline,
    sim::{spawn_feed, SyntheticWorld},
};
use log::info;
use tokio::sync::mpsc;

/// Generates a labeled point cloud dataset from a simulated world
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON config file. Missing values fall back to their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory the PCD files are written to
    #[arg(short, long)]
    output: Option<String>,
    #[arg(long)]
    start_index: Option<u32>,
    #[arg(long)]
    max_index: Option<u32>,
    #[arg(long)]
    seed: Option<u64>,
    /// Fixed settle delay in milliseconds, replaces the configured settle policy
    #[arg(long)]
    settle_ms: Option<u64>,
    /// Don't publish classified frames
    #[arg(long)]
    no_visual: bool,
    /// Keep labeled frames in memory instead of writing PCD files
    #[arg(long)]
    dry_run: bool,
    /// Print the effective config as JSON and exit
    #[arg(long)]
    print_config: bool,
}

impl Args {
    fn effective_config(&self) -> Result<LabelerConfig> {
        let mut config = match &self.config {
            Some(path) => LabelerConfig::from_path(path)?,
            None => LabelerConfig::default(),
        };
        if let Some(output) = &self.output {
            config.dataset.output_dir = output.clone();
        }
        if let Some(start_index) = self.start_index {
            config.dataset.start_index = start_index;
        }
        if let Some(max_index) = self.max_index {
            config.dataset.max_index = max_index;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(delay_ms) = self.settle_ms {
            config.settle = SettlePolicy::Fixed { delay_ms };
        }
        if self.no_visual {
            config.visual = false;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();

    let args = Args::parse();
    let config = args.effective_config()?;
    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }
    config.validate().context("Invalid configuration")?;

    let sensor_rotation = config.sensor.orientation.to_rotation()?;
    let world = SyntheticWorld::new(config.world.clone(), sensor_rotation)
        .with_invisible_model(config.platform.id.clone())
        .with_frame_id(config.sensor.source_frame.trim_start_matches('/'));

    let writer: Box<dyn FrameWriter + Send> = if args.dry_run {
        Box::new(InMemoryWriter::default())
    } else {
        Box::new(PcdFrameWriter::new(
            &config.dataset.output_dir,
            config.dataset.file_prefix.clone(),
            config.dataset.encoding,
        )?)
    };
    let pipeline = Pipeline::new(
        &config,
        Collaborators {
            simulator: Box::new(world.clone()),
            pose: Box::new(StaticPose::from_config(&config.sensor)?),
            writer,
            publisher: Some(Box::new(LogPublisher::default())),
        },
    )?;

    info!(
        "Auto labeling files {}..={} into '{}' ({:?})",
        config.dataset.start_index + 1,
        config.dataset.max_index,
        config.dataset.output_dir,
        config.discard_policy
    );

    let (sender, receiver) = mpsc::channel(16);
    let feed = spawn_feed(world, sender);
    let stats = run_pipeline(pipeline, receiver).await?;
    feed.await.context("Sensor feed task failed")??;

    println!("{}", stats);

    Ok(())
}
