//! Parameter space of a sweep and the points it expands to.

use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Annealing strategy selector understood by the single scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum CoolingMethod {
    #[serde(rename = "boltzmann")]
    Boltzmann,
    #[serde(rename = "kosh")]
    Kosh,
    #[serde(rename = "SM")]
    Sm,
}

impl CoolingMethod {
    pub const ALL: [CoolingMethod; 3] = [CoolingMethod::Boltzmann, CoolingMethod::Kosh, CoolingMethod::Sm];

    pub fn as_str(self) -> &'static str {
        match self {
            CoolingMethod::Boltzmann => "boltzmann",
            CoolingMethod::Kosh => "kosh",
            CoolingMethod::Sm => "SM",
        }
    }
}

impl fmt::Display for CoolingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One concrete combination of sweep-dimension values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterPoint {
    Mult {
        num_processes: u32,
    },
    Solo {
        num_jobs: u32,
        num_processors: u32,
        cooling: CoolingMethod,
    },
}

impl ParameterPoint {
    /// Command line for the external program at this point.
    pub fn args(&self, workload: &Path) -> Vec<String> {
        match self {
            ParameterPoint::Mult { num_processes } => vec![num_processes.to_string()],
            ParameterPoint::Solo {
                num_processors,
                cooling,
                ..
            } => vec![
                workload.display().to_string(),
                num_processors.to_string(),
                cooling.to_string(),
            ],
        }
    }
}

impl fmt::Display for ParameterPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterPoint::Mult { num_processes } => write!(f, "num_proc={}", num_processes),
            ParameterPoint::Solo {
                num_jobs,
                num_processors,
                cooling,
            } => write!(
                f,
                "num_jobs={} num_processors={} cooling={}",
                num_jobs, num_processors, cooling
            ),
        }
    }
}

/// Inclusive stepped range of process counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessRange {
    pub start: u32,
    pub end: u32,
    pub step: u32,
}

impl ProcessRange {
    pub fn values(&self) -> Vec<u32> {
        if self.step == 0 {
            return Vec::new();
        }
        (self.start..=self.end).step_by(self.step as usize).collect()
    }
}

/// Cartesian product: jobs (outer) x processors x cooling (inner).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerGrid {
    pub num_jobs: Vec<u32>,
    pub num_processors: Vec<u32>,
    pub cooling: Vec<CoolingMethod>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSpace {
    Processes(ProcessRange),
    Grid(SchedulerGrid),
}

/// Points sharing one workload. `num_jobs` is `Some` when the workload file
/// has to be regenerated before the group runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointGroup {
    pub num_jobs: Option<u32>,
    pub points: Vec<ParameterPoint>,
}

impl ConfigSpace {
    /// Expand into groups in iteration order; the outer dimension varies slowest.
    pub fn groups(&self) -> Vec<PointGroup> {
        match self {
            ConfigSpace::Processes(range) => vec![PointGroup {
                num_jobs: None,
                points: range
                    .values()
                    .into_iter()
                    .map(|num_processes| ParameterPoint::Mult { num_processes })
                    .collect(),
            }],
            ConfigSpace::Grid(grid) => grid
                .num_jobs
                .iter()
                .map(|&num_jobs| {
                    let mut points = Vec::with_capacity(grid.num_processors.len() * grid.cooling.len());
                    for &num_processors in &grid.num_processors {
                        for &cooling in &grid.cooling {
                            points.push(ParameterPoint::Solo {
                                num_jobs,
                                num_processors,
                                cooling,
                            });
                        }
                    }
                    PointGroup {
                        num_jobs: Some(num_jobs),
                        points,
                    }
                })
                .collect(),
        }
    }

    pub fn point_count(&self) -> usize {
        self.groups().iter().map(|g| g.points.len()).sum()
    }
}
