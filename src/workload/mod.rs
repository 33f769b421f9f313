//! Synthetic workload generation.
//!
//! The external scheduler reads its jobs from a CSV file:
//! Job ID,Duration
//! Job_1,37
//! Job_2,5
//! ...

use anyhow::{Context, bail};
use rand::Rng;
use std::path::{Path, PathBuf};
use tracing::info;

pub const WORKLOAD_HEADER: [&str; 2] = ["Job ID", "Duration"];

/// A single job handed to the external scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub id: String,
    pub duration: u32,
}

/// Generate `num_items` jobs with durations drawn uniformly from
/// `[min_duration, max_duration]` and write them to `output`.
pub fn generate(
    num_items: u32,
    min_duration: u32,
    max_duration: u32,
    output: &Path,
) -> anyhow::Result<Vec<WorkItem>> {
    generate_with_rng(num_items, min_duration, max_duration, output, &mut rand::rng())
}

pub fn generate_with_rng<R: Rng + ?Sized>(
    num_items: u32,
    min_duration: u32,
    max_duration: u32,
    output: &Path,
    rng: &mut R,
) -> anyhow::Result<Vec<WorkItem>> {
    if num_items == 0 {
        bail!("workload must contain at least one job");
    }
    if min_duration == 0 || min_duration > max_duration {
        bail!(
            "invalid duration bounds [{}, {}]: need 1 <= min <= max",
            min_duration,
            max_duration
        );
    }

    let items: Vec<WorkItem> = (1..=num_items)
        .map(|k| WorkItem {
            id: format!("Job_{}", k),
            duration: rng.random_range(min_duration..=max_duration),
        })
        .collect();

    write_workload(&items, output)?;
    info!(
        jobs = num_items,
        path = %output.display(),
        "generated workload"
    );
    Ok(items)
}

/// Truncate `output` and write the header followed by one row per item.
pub fn write_workload(items: &[WorkItem], output: &Path) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(output)
        .with_context(|| format!("open workload file {}", output.display()))?;
    writer
        .write_record(WORKLOAD_HEADER)
        .with_context(|| format!("write workload header to {}", output.display()))?;
    for item in items {
        writer
            .write_record([item.id.as_str(), &item.duration.to_string()])
            .with_context(|| format!("write workload row to {}", output.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("flush workload file {}", output.display()))?;
    Ok(())
}

/// Source of the workload file consumed by a sweep.
///
/// Called once per distinct job count before the nested dimensions run.
pub trait Workload {
    fn prepare(&mut self, num_jobs: u32) -> anyhow::Result<()>;
}

/// Regenerates the workload file on disk with random durations.
#[derive(Debug, Clone)]
pub struct WorkloadGenerator {
    pub path: PathBuf,
    pub min_duration: u32,
    pub max_duration: u32,
}

impl Workload for WorkloadGenerator {
    fn prepare(&mut self, num_jobs: u32) -> anyhow::Result<()> {
        generate(num_jobs, self.min_duration, self.max_duration, &self.path)?;
        Ok(())
    }
}

/// For programs that carry their own workload; range sweeps never prepare one.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltInWorkload;

impl Workload for BuiltInWorkload {
    fn prepare(&mut self, _num_jobs: u32) -> anyhow::Result<()> {
        Ok(())
    }
}
