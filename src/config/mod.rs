//! Sweep configuration (optional TOML file, overridden by CLI flags).
//!
//! Example:
//! ```toml
//! repeats = 3
//! timeout_secs = 600
//!
//! [mult]
//! executable = "./mult.out"
//! start = 2
//! end = 14
//! step = 2
//!
//! [solo]
//! num_jobs = [16000, 32000]
//! cooling_methods = ["boltzmann", "SM"]
//! ```
//!
//! Missing keys fall back to the defaults below.

use crate::Result;
use crate::sweep::{ConfigSpace, CoolingMethod, ProcessRange, SchedulerGrid};
use anyhow::{Context, bail};
use serde::Deserialize;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    /// Trials per parameter point.
    pub repeats: u32,
    /// Kill a trial after this many seconds. Unset blocks indefinitely.
    pub timeout_secs: Option<u64>,
    pub mult: MultConfig,
    pub solo: SoloConfig,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            repeats: 1,
            timeout_secs: None,
            mult: MultConfig::default(),
            solo: SoloConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MultConfig {
    pub executable: PathBuf,
    pub output: PathBuf,
    pub start: u32,
    pub end: u32,
    pub step: u32,
}

impl Default for MultConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("./mult.out"),
            output: PathBuf::from("results_mult.csv"),
            start: 2,
            end: 14,
            step: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SoloConfig {
    pub executable: PathBuf,
    pub workload: PathBuf,
    pub output: PathBuf,
    pub num_jobs: Vec<u32>,
    pub num_processors: Vec<u32>,
    pub cooling_methods: Vec<CoolingMethod>,
    pub min_duration: u32,
    pub max_duration: u32,
}

impl Default for SoloConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("./solo.out"),
            workload: PathBuf::from("jobs.csv"),
            output: PathBuf::from("results.csv"),
            num_jobs: vec![256_000, 128_000, 64_000, 32_000, 16_000],
            num_processors: vec![640, 320, 160, 80, 40],
            cooling_methods: CoolingMethod::ALL.to_vec(),
            min_duration: 1,
            max_duration: 100,
        }
    }
}

impl SweepConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let config: SweepConfig = toml::from_str(&text)
            .with_context(|| format!("parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load from `path` if given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn repeats(&self) -> Result<NonZeroU32> {
        NonZeroU32::new(self.repeats).context("repeats must be at least 1")
    }

    /// Per-trial limit. Zero would fail every trial, so it is rejected.
    pub fn timeout(&self) -> Result<Option<Duration>> {
        match self.timeout_secs {
            Some(0) => bail!("timeout_secs must be at least 1; omit it to wait indefinitely"),
            secs => Ok(secs.map(Duration::from_secs)),
        }
    }
}

impl MultConfig {
    pub fn space(&self) -> Result<ConfigSpace> {
        if self.step == 0 {
            bail!("mult.step must be at least 1");
        }
        if self.start == 0 {
            bail!("mult.start must be a positive process count");
        }
        if self.start > self.end {
            bail!("mult.start ({}) exceeds mult.end ({})", self.start, self.end);
        }
        Ok(ConfigSpace::Processes(ProcessRange {
            start: self.start,
            end: self.end,
            step: self.step,
        }))
    }
}

impl SoloConfig {
    pub fn space(&self) -> Result<ConfigSpace> {
        check_dimension("solo.num_jobs", &self.num_jobs)?;
        check_dimension("solo.num_processors", &self.num_processors)?;
        if self.cooling_methods.is_empty() {
            bail!("solo.cooling_methods must not be empty");
        }
        if self.min_duration == 0 || self.min_duration > self.max_duration {
            bail!(
                "invalid duration bounds [{}, {}]: need 1 <= min_duration <= max_duration",
                self.min_duration,
                self.max_duration
            );
        }
        Ok(ConfigSpace::Grid(SchedulerGrid {
            num_jobs: self.num_jobs.clone(),
            num_processors: self.num_processors.clone(),
            cooling: self.cooling_methods.clone(),
        }))
    }
}

fn check_dimension(name: &str, values: &[u32]) -> Result<()> {
    if values.is_empty() {
        bail!("{} must not be empty", name);
    }
    if values.contains(&0) {
        bail!("{} must only contain positive values", name);
    }
    Ok(())
}
