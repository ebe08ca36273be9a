//! Grid clustering tool
//!
//! Reads 2D points from a CSV file, clusters them hierarchically on a grid,
//! and writes the cluster label of every point.

use anyhow::{Context, Result, bail};
use bitvec::prelude::*;
use clap::Parser;
use csv::{ReaderBuilder, WriterBuilder};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::PathBuf;

use grid_cluster::cluster::{
    Cluster, ClusterId, GridClustering, ProgressSink, ScaledDistance, UNSET_PROPERTY,
    uniform_edges,
};


/// Label of points that ended up in no cluster
const UNASSIGNED_LABEL: i64 = -1;

#[derive(Parser)]
#[command(name = "grid_cluster")]
#[command(about = "Grid-accelerated hierarchical clustering of 2D points", long_about = None)]
struct Args {
    /// Input CSV file with x,y[,property_a[,property_b]] columns
    #[arg(short, long, default_value = "points.csv")]
    input: PathBuf,

    /// Output CSV file with cluster labels (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Grid cell width in x
    #[arg(long)]
    grid_x: f64,

    /// Grid cell height in y
    #[arg(long)]
    grid_y: f64,

    /// Scaling of y in the distance metric
    #[arg(long, default_value_t = 1.0)]
    scale_y: f64,

    /// Merge adjacent clusters further in y-direction
    #[arg(long)]
    extend_y: bool,

    /// Drop clusters whose bounding box is lower than this in y
    #[arg(long)]
    min_height: Option<f64>,

    /// Show a progress bar while clustering
    #[arg(long)]
    progress: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

/// Points and their properties as read from CSV
#[derive(Debug, Default)]
struct Input {
    x: Vec<f64>,
    y: Vec<f64>,
    properties_a: Vec<i32>,
    properties_b: Vec<i32>,
}

impl Input {
    fn len(&self) -> usize {
        self.x.len()
    }

    fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Forwards engine progress to a progress bar
struct ProgressBarSink(ProgressBar);

impl ProgressSink for ProgressBarSink {
    fn start(&mut self, total: usize) {
        self.0.set_length(total as u64);
        self.0.set_position(0);
    }

    fn set(&mut self, done: usize) {
        self.0.set_position(done as u64);
    }

    fn finish(&mut self) {
        self.0.finish_and_clear();
    }
}

fn main() {
    let args = Args::parse();

    let level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(&args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let input = read_points(&args.input)
        .with_context(|| format!("reading points from {:?}", args.input))?;

    if input.is_empty() {
        bail!("no points found in {:?}", args.input);
    }
    debug!("read {} points from {:?}", input.len(), args.input);

    let (edges_x, edges_y) = grid_edges(&input, args.grid_x, args.grid_y)?;
    debug!(
        "grid of {} x {} cells",
        edges_x.len() - 1,
        edges_y.len() - 1
    );

    let metric = ScaledDistance::new(1.0, args.scale_y);
    let mut clustering = GridClustering::with_properties(
        metric,
        &input.x,
        &input.y,
        &input.properties_a,
        &input.properties_b,
        edges_x,
        edges_y,
    )?;

    let bar = if args.progress {
        let bar = ProgressBar::new(input.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("clustering [{bar:40}] {pos}/{len}")
        {
            bar.set_style(style.progress_chars("=>="));
        }
        bar
    } else {
        ProgressBar::hidden()
    };
    clustering.cluster_with_progress(&mut ProgressBarSink(bar))?;

    if args.extend_y {
        clustering.extend_clusters_y()?;
    }
    if let Some(threshold) = args.min_height {
        clustering.remove_small_clusters_y(threshold);
    }

    let results = clustering.results();
    info!("found {} clusters", results.len());

    let labels = build_labels(&results, input.len());

    match &args.output {
        None => write_labels_to_stdout(&input, &labels),
        Some(output_file) => {
            write_labels_to_csv(output_file, &input, &labels)
                .with_context(|| format!("writing labels to {:?}", output_file))?;
            debug!("labels written to {:?}", output_file);
        }
    }
    Ok(())
}

/// Reads points from a CSV file
///
/// Expected format: `x,y[,property_a[,property_b]]` (header row is optional).
/// Rows with unparseable coordinates are skipped, missing or unparseable
/// properties are unset.
fn read_points(filename: &PathBuf) -> Result<Input> {
    let file = File::open(filename)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut input = Input::default();
    for (row, result) in reader.records().enumerate() {
        let record = result?;
        if record.len() < 2 {
            continue;
        }

        let x = record[0].trim().parse::<f64>();
        let y = record[1].trim().parse::<f64>();
        let (x, y) = match (x, y) {
            (Ok(x), Ok(y)) => (x, y),
            // a non-numeric first row is a header
            _ if row == 0 => continue,
            _ => {
                debug!("skipping row {}: unparseable coordinates", row);
                continue;
            }
        };

        let prop = |col: usize| {
            record
                .get(col)
                .and_then(|s| s.trim().parse::<i32>().ok())
                .unwrap_or(UNSET_PROPERTY)
        };
        input.x.push(x);
        input.y.push(y);
        input.properties_a.push(prop(2));
        input.properties_b.push(prop(3));
    }

    Ok(input)
}

/// Uniform grid edges covering the bounding box of the input
fn grid_edges(input: &Input, step_x: f64, step_y: f64) -> Result<(Vec<f64>, Vec<f64>)> {
    let (min_x, max_x) = min_max(&input.x);
    let (min_y, max_y) = min_max(&input.y);

    let edges_x = uniform_edges(min_x, max_x, step_x).context("grid in x")?;
    let edges_y = uniform_edges(min_y, max_y, step_y).context("grid in y")?;
    Ok((edges_x, edges_y))
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

/// Creates a labels array from the final clusters
///
/// `labels[i]` = cluster id for point i, or -1 if its cluster was removed
fn build_labels(results: &BTreeMap<ClusterId, Cluster>, num_points: usize) -> Vec<i64> {
    let mut labels = vec![UNASSIGNED_LABEL; num_points];
    let mut assigned = bitvec![0; num_points];

    for (&id, cluster) in results {
        for &idx in cluster.points() {
            labels[idx] = id as i64;
            assigned.set(idx, true);
        }
    }

    let unassigned = assigned.count_zeros();
    if unassigned > 0 {
        debug!("{} points are in no cluster", unassigned);
    }

    labels
}

/// Writes `index,x,y,cluster` rows to a CSV file
fn write_labels_to_csv(output_file: &PathBuf, input: &Input, labels: &[i64]) -> Result<()> {
    let out_file = File::create(output_file)?;
    let mut writer = WriterBuilder::new().from_writer(out_file);

    writer.write_record(["index", "x", "y", "cluster"])?;
    for (i, label) in labels.iter().enumerate() {
        writer.write_record(&[
            i.to_string(),
            input.x[i].to_string(),
            input.y[i].to_string(),
            label.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes labels to stdout as a simple list
///
/// Format: `index,x,y,cluster` (one point per line)
fn write_labels_to_stdout(input: &Input, labels: &[i64]) {
    for (i, label) in labels.iter().enumerate() {
        println!("{},{},{},{}", i, input.x[i], input.y[i], label);
    }
}
