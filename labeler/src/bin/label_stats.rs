use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use frames::{read_labeled_pcd, ClassId, LabeledPoint};
use itertools::Itertools;
use rayon::prelude::*;

fn is_pcd_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pcd"))
        .unwrap_or(false)
}

fn get_all_pcd_files(input: &Path) -> Result<Vec<PathBuf>> {
    if !input.exists() {
        bail!("Input path {} does not exist!", input.display());
    }
    if input.is_file() {
        return Ok(vec![input.to_owned()]);
    }

    let files = walkdir::WalkDir::new(input)
        .into_iter()
        .filter_map(|entry| {
            entry.ok().and_then(|entry| {
                if entry.file_type().is_file() && is_pcd_file(entry.path()) {
                    Some(entry.path().to_owned())
                } else {
                    None
                }
            })
        })
        .sorted()
        .collect();
    Ok(files)
}

#[derive(Default)]
struct LabelCounts {
    points_per_class: BTreeMap<ClassId, usize>,
    /// Points whose color does not match the color of their class
    color_mismatches: usize,
}

impl LabelCounts {
    fn from_points(points: &[LabeledPoint]) -> Self {
        let mut counts = Self::default();
        for point in points {
            *counts.points_per_class.entry(point.label).or_default() += 1;
            if point.color != point.label.color_or_sentinel() {
                counts.color_mismatches += 1;
            }
        }
        counts
    }

    fn merge(mut self, other: Self) -> Self {
        for (class, count) in other.points_per_class {
            *self.points_per_class.entry(class).or_default() += count;
        }
        self.color_mismatches += other.color_mismatches;
        self
    }

    fn total(&self) -> usize {
        self.points_per_class.values().sum()
    }
}

/// Prints the number of points per class over a directory of labeled PCD files
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    input: PathBuf,
    /// Print the class counts of every single file
    #[arg(long)]
    per_file: bool,
}

fn main() -> Result<()> {
    pretty_env_logger::init();
    let args = Args::parse();

    let files = get_all_pcd_files(&args.input)?;
    if files.is_empty() {
        bail!("No PCD files found in {}", args.input.display());
    }

    let counts_per_file = files
        .par_iter()
        .map(|file| -> Result<LabelCounts> {
            let points = read_labeled_pcd(file)
                .with_context(|| format!("Could not read labeled PCD file {}", file.display()))?;
            Ok(LabelCounts::from_points(&points))
        })
        .collect::<Result<Vec<_>>>()?;

    if args.per_file {
        for (file, counts) in files.iter().zip(counts_per_file.iter()) {
            println!(
                "{}: {}",
                file.display(),
                counts
                    .points_per_class
                    .iter()
                    .map(|(class, count)| format!("{}={}", class, count))
                    .join(" ")
            );
        }
    }

    let total = counts_per_file
        .into_iter()
        .fold(LabelCounts::default(), LabelCounts::merge);

    println!("Files: {}", files.len());
    println!("Points: {}", total.total());
    for (class, count) in &total.points_per_class {
        println!(
            "Class {}: {} ({:.2}%)",
            class,
            count,
            100.0 * *count as f64 / total.total().max(1) as f64
        );
    }
    if total.color_mismatches > 0 {
        println!("Points with mismatching class color: {}", total.color_mismatches);
    }

    Ok(())
}
