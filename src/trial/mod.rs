//! Trial execution: one blocking invocation of the external program per call.

pub mod marker;
pub mod runner;

pub use marker::{Marker, parse_marker};
pub use runner::{TrialError, TrialOutput, TrialRunner};

use crate::sweep::ParameterPoint;
use std::path::PathBuf;

/// Produces one trial outcome for a parameter point.
pub trait Trial {
    fn run(&mut self, point: &ParameterPoint) -> Result<TrialOutput, TrialError>;
}

/// Runs the real executable, building its command line from the point.
#[derive(Debug, Clone)]
pub struct ProcessTrial {
    pub runner: TrialRunner,
    /// Passed as the first argument in single-scheduler mode.
    pub workload: PathBuf,
}

impl Trial for ProcessTrial {
    fn run(&mut self, point: &ParameterPoint) -> Result<TrialOutput, TrialError> {
        self.runner.run(&point.args(&self.workload))
    }
}
