//! Sweep orchestration: walk the parameter space, run repeated trials per
//! point, and keep the means of the trials that succeeded.
//!
//! Per-trial failures (launch errors, timeouts, missing markers) are logged and
//! skipped. Workload I/O failures abort the sweep.

pub mod aggregate;
pub mod space;

pub use aggregate::{Aggregate, AggregatedRow, TrialResult};
pub use space::{ConfigSpace, CoolingMethod, ParameterPoint, ProcessRange, SchedulerGrid};

use crate::Result;
use crate::trial::Trial;
use crate::workload::Workload;
use anyhow::{Context, bail};
use std::num::NonZeroU32;
use tracing::{debug, error, info, warn};

/// Aggregated rows in sweep order, plus the points that produced nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    pub rows: Vec<AggregatedRow>,
    pub skipped: Vec<ParameterPoint>,
}

/// Run every point of `space` `repeats` times, sequentially.
///
/// The workload is prepared once per distinct job count, before the nested
/// points of that group run.
pub fn run_sweep<T, W>(
    space: &ConfigSpace,
    repeats: NonZeroU32,
    trial: &mut T,
    workload: &mut W,
) -> Result<ResultTable>
where
    T: Trial + ?Sized,
    W: Workload + ?Sized,
{
    let groups = space.groups();
    if groups.iter().all(|g| g.points.is_empty()) {
        bail!("sweep has no parameter points");
    }

    info!(points = space.point_count(), repeats = repeats.get(), "starting sweep");
    let mut table = ResultTable::default();
    for group in groups {
        if let Some(num_jobs) = group.num_jobs {
            workload
                .prepare(num_jobs)
                .with_context(|| format!("prepare workload with {} jobs", num_jobs))?;
        }

        for point in group.points {
            info!(%point, "running");
            match run_point(&point, repeats, trial) {
                Some(row) => {
                    info!(
                        %point,
                        avg_cost = row.avg_cost,
                        avg_secs = format_args!("{:.2}", row.avg_latency_secs),
                        trials = row.trials,
                        "result"
                    );
                    table.rows.push(row);
                }
                None => {
                    warn!(%point, "no successful trials, skipping point");
                    table.skipped.push(point);
                }
            }
        }
    }

    Ok(table)
}

fn run_point<T: Trial + ?Sized>(
    point: &ParameterPoint,
    repeats: NonZeroU32,
    trial: &mut T,
) -> Option<AggregatedRow> {
    let mut agg = Aggregate::default();
    for attempt in 1..=repeats.get() {
        match trial.run(point) {
            Ok(output) => {
                let latency_secs = output.latency.as_secs_f64();
                debug!(%point, attempt, latency_secs, status = %output.status, "trial finished");
                match output.cost {
                    Some(cost) => agg.push(TrialResult { cost, latency_secs }),
                    None => warn!(
                        %point,
                        attempt,
                        stdout = %output.stdout,
                        stderr = %output.stderr,
                        "marker not found in program output"
                    ),
                }
            }
            Err(err) => error!(%point, attempt, error = %err, "trial failed"),
        }
    }
    agg.finish(*point)
}
