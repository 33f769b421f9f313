use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

mod config;
mod report;
mod sweep;
mod trial;
mod workload;

use config::SweepConfig;
use trial::{Marker, ProcessTrial, Trial, TrialRunner};
use workload::{BuiltInWorkload, Workload, WorkloadGenerator};

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "sweep-harness")]
#[command(about = "Parameter sweeps over an external scheduler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

/// Flags shared by both sweep modes. Unset flags keep the config value.
#[derive(clap::Args)]
struct SweepArgs {
    /// TOML file with sweep settings.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    executable: Option<PathBuf>,

    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Trials per parameter point.
    #[arg(long)]
    repeats: Option<u32>,

    /// Kill a trial that runs longer than this.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a random workload file.
    Generate {
        #[arg(long, default_value_t = 100)]
        jobs: u32,

        #[arg(long, default_value_t = 1)]
        min_duration: u32,

        #[arg(long, default_value_t = 100)]
        max_duration: u32,

        #[arg(short = 'o', long, default_value = "jobs.csv")]
        out: PathBuf,
    },

    /// Sweep the multi-process scheduler over a range of process counts.
    Mult {
        #[command(flatten)]
        sweep: SweepArgs,

        #[arg(long)]
        start: Option<u32>,

        #[arg(long)]
        end: Option<u32>,

        #[arg(long)]
        step: Option<u32>,
    },

    /// Sweep the single scheduler over jobs x processors x cooling method.
    Solo {
        #[command(flatten)]
        sweep: SweepArgs,

        /// Workload file regenerated for every job count.
        #[arg(long)]
        workload: Option<PathBuf>,
    },

    /// Parse a saved program output the way a sweep would.
    Parse {
        #[arg(long, value_enum)]
        mode: Marker,

        file: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    execute(cli.cmd)
}

fn execute(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Generate {
            jobs,
            min_duration,
            max_duration,
            out,
        } => {
            workload::generate(jobs, min_duration, max_duration, &out)?;
        }
        Commands::Mult {
            sweep: args,
            start,
            end,
            step,
        } => {
            let mut config = load_config(&args)?;
            let mult = &mut config.mult;
            override_opt(&mut mult.executable, args.executable);
            override_opt(&mut mult.output, args.output);
            override_opt(&mut mult.start, start);
            override_opt(&mut mult.end, end);
            override_opt(&mut mult.step, step);

            let mut trial = ProcessTrial {
                runner: TrialRunner::new(&config.mult.executable, Marker::Mult)
                    .with_timeout(config.timeout()?),
                workload: PathBuf::new(),
            };
            run_mult(&config, &mut trial)?;
        }
        Commands::Solo { sweep: args, workload } => {
            let mut config = load_config(&args)?;
            let solo = &mut config.solo;
            override_opt(&mut solo.executable, args.executable);
            override_opt(&mut solo.output, args.output);
            override_opt(&mut solo.workload, workload);

            let mut trial = ProcessTrial {
                runner: TrialRunner::new(&config.solo.executable, Marker::Solo)
                    .with_timeout(config.timeout()?),
                workload: config.solo.workload.clone(),
            };
            let mut generator = WorkloadGenerator {
                path: config.solo.workload.clone(),
                min_duration: config.solo.min_duration,
                max_duration: config.solo.max_duration,
            };
            run_solo(&config, &mut trial, &mut generator)?;
        }
        Commands::Parse { mode, file } => match parse_output(mode, &file)? {
            Some(cost) => println!("{}", cost),
            None => println!("absent"),
        },
    }

    Ok(())
}

/// Process-count sweep against a program with a built-in workload.
fn run_mult<T: Trial + ?Sized>(config: &SweepConfig, trial: &mut T) -> Result<sweep::ResultTable> {
    let space = config.mult.space()?;
    let table = sweep::run_sweep(&space, config.repeats()?, trial, &mut BuiltInWorkload)?;
    summarize(&table);
    report::write_results(&table, &config.mult.output, &report::MULT_SCHEMA)?;
    Ok(table)
}

/// Jobs x processors x cooling sweep, regenerating the workload per job count.
fn run_solo<T, W>(config: &SweepConfig, trial: &mut T, workload: &mut W) -> Result<sweep::ResultTable>
where
    T: Trial + ?Sized,
    W: Workload + ?Sized,
{
    let space = config.solo.space()?;
    let table = sweep::run_sweep(&space, config.repeats()?, trial, workload)?;
    summarize(&table);
    report::write_results(&table, &config.solo.output, &report::SOLO_SCHEMA)?;
    Ok(table)
}

fn parse_output(mode: Marker, file: &Path) -> Result<Option<f64>> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("read program output {}", file.display()))?;
    let cost = trial::parse_marker(mode, &text);
    if cost.is_none() {
        warn!(path = %file.display(), pattern = %mode.pattern(), "marker not found");
    }
    Ok(cost)
}

fn load_config(args: &SweepArgs) -> Result<SweepConfig> {
    let mut config = SweepConfig::load_or_default(args.config.as_deref())?;
    override_opt(&mut config.repeats, args.repeats);
    if args.timeout_secs.is_some() {
        config.timeout_secs = args.timeout_secs;
    }
    Ok(config)
}

fn override_opt<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

fn summarize(table: &sweep::ResultTable) {
    info!(
        aggregated = table.rows.len(),
        skipped = table.skipped.len(),
        "sweep finished"
    );
    for point in &table.skipped {
        warn!(%point, "point has no result row");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::sweep::{ConfigSpace, CoolingMethod, ParameterPoint, SchedulerGrid};
    use crate::trial::{TrialError, TrialOutput};
    use pretty_assertions::assert_eq;
    use std::num::NonZeroU32;

    /// Stands in for both schedulers: prints a cost derived from the point,
    /// or nothing parsable for the points it treats as crashes.
    struct ShellScheduler {
        runner: TrialRunner,
    }

    impl Trial for ShellScheduler {
        fn run(&mut self, point: &ParameterPoint) -> std::result::Result<TrialOutput, TrialError> {
            let script = match point {
                ParameterPoint::Solo {
                    num_processors,
                    cooling: CoolingMethod::Boltzmann,
                    ..
                } => format!("echo 'Best solution found with cost: {}.5'", num_processors),
                // Odd counts crash; even ones print a stream-formatted double.
                ParameterPoint::Mult { num_processes } if num_processes % 2 == 0 => format!(
                    "echo 'Current best solution cost: {}e+06'",
                    num_processes
                ),
                _ => "echo 'crashed'".to_string(),
            };
            self.runner.run(&["-c".to_string(), script])
        }
    }

    #[test]
    fn solo_pipeline_writes_only_parsed_points() {
        let dir = tempfile::tempdir().unwrap();
        let workload_path = dir.path().join("jobs.csv");
        let results_path = dir.path().join("results.csv");

        let space = ConfigSpace::Grid(SchedulerGrid {
            num_jobs: vec![3],
            num_processors: vec![10, 20],
            cooling: vec![CoolingMethod::Boltzmann, CoolingMethod::Kosh],
        });
        let mut trial = ShellScheduler {
            runner: TrialRunner::new("/bin/sh", Marker::Solo),
        };
        let mut generator = WorkloadGenerator {
            path: workload_path.clone(),
            min_duration: 1,
            max_duration: 100,
        };

        let table = sweep::run_sweep(&space, NonZeroU32::new(2).unwrap(), &mut trial, &mut generator).unwrap();
        assert_eq!(table.skipped.len(), 2);
        report::write_results(&table, &results_path, &report::SOLO_SCHEMA).unwrap();

        assert_eq!(std::fs::read_to_string(&workload_path).unwrap().lines().count(), 4);

        let text = std::fs::read_to_string(&results_path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "num_jobs,num_processors,cooling_method,final_cost,execution_time");
        assert!(lines[1].starts_with("3,10,boltzmann,10.5,"), "{}", lines[1]);
        assert!(lines[2].starts_with("3,20,boltzmann,20.5,"), "{}", lines[2]);
    }

    #[test]
    fn cli_overrides_config_values() {
        let cli = Cli::parse_from([
            "sweep-harness",
            "mult",
            "--repeats",
            "5",
            "--timeout-secs",
            "9",
            "--end",
            "8",
        ]);
        let Commands::Mult { sweep: args, end, .. } = cli.cmd else {
            panic!("expected mult subcommand");
        };
        let config = load_config(&args).unwrap();
        assert_eq!(config.repeats, 5);
        assert_eq!(config.timeout_secs, Some(9));
        assert_eq!(end, Some(8));
        assert_eq!(config.mult.executable, PathBuf::from("./mult.out"));
    }

    #[test]
    fn mult_pipeline_writes_process_count_results() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SweepConfig::default();
        config.repeats = 2;
        config.mult.start = 1;
        config.mult.end = 4;
        config.mult.step = 1;
        config.mult.output = dir.path().join("results_mult.csv");
        let mut trial = ShellScheduler {
            runner: TrialRunner::new("/bin/sh", Marker::Mult),
        };

        let table = run_mult(&config, &mut trial).unwrap();
        assert_eq!(
            table.skipped,
            vec![
                ParameterPoint::Mult { num_processes: 1 },
                ParameterPoint::Mult { num_processes: 3 },
            ]
        );

        let text = std::fs::read_to_string(&config.mult.output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "num_proc,avg_exec_time,avg_final_cost");
        assert!(lines[1].starts_with("2,") && lines[1].ends_with(",2000000"), "{}", lines[1]);
        assert!(lines[2].starts_with("4,") && lines[2].ends_with(",4000000"), "{}", lines[2]);
    }

    #[test]
    fn generate_command_writes_workload() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("jobs.csv");
        let out_arg = out.display().to_string();
        let cli = Cli::parse_from([
            "sweep-harness",
            "generate",
            "--jobs",
            "3",
            "--min-duration",
            "5",
            "--max-duration",
            "5",
            "-o",
            out_arg.as_str(),
        ]);

        execute(cli.cmd).unwrap();

        let text = std::fs::read_to_string(&out).unwrap();
        assert_eq!(text.lines().collect::<Vec<_>>(), vec!["Job ID,Duration", "Job_1,5", "Job_2,5", "Job_3,5"]);
    }

    #[test]
    fn parse_command_reports_absent_marker() {
        let dir = tempfile::tempdir().unwrap();
        let capture = dir.path().join("stdout.txt");
        std::fs::write(&capture, "segfault\nCurrent best solution cost: 1.5e+06 (partial)\n").unwrap();

        assert_eq!(parse_output(Marker::Mult, &capture).unwrap(), None);
        assert_eq!(parse_output(Marker::Solo, &capture).unwrap(), None);

        let path_arg = capture.display().to_string();
        let cli = Cli::parse_from(["sweep-harness", "parse", "--mode", "mult", path_arg.as_str()]);
        execute(cli.cmd).unwrap();
    }

    #[test]
    fn parse_command_reads_marker_and_fails_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let capture = dir.path().join("stdout.txt");
        std::fs::write(&capture, "noise\nCurrent best solution cost: 1483\nmore noise\n").unwrap();

        assert_eq!(parse_output(Marker::Mult, &capture).unwrap(), Some(1483.0));
        assert!(parse_output(Marker::Mult, &dir.path().join("missing.txt")).is_err());
    }

    #[test]
    fn zero_timeout_is_rejected_before_sweeping() {
        let cli = Cli::parse_from(["sweep-harness", "mult", "--timeout-secs", "0", "--executable", "/nonexistent"]);
        assert!(execute(cli.cmd).is_err());
    }
}
