use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Deserialize;
use subsim_engine::checkpoint::CheckpointPayload;
use subsim_engine::{resume, run, LimitStateConfig, LinearLimitState, RunConfig, RunSummary};

#[derive(Parser, Debug)]
#[command(name = "subsim", about = "Subset simulation failure probability estimator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Estimate the failure probability of a reference limit state.
    Run(RunArgs),
    /// Continue a run from a level checkpoint.
    Resume(ResumeArgs),
}

#[derive(ClapArgs, Debug)]
struct RunArgs {
    /// YAML configuration describing the run and the limit state.
    #[arg(long)]
    config: PathBuf,
    /// Output directory for run artefacts.
    #[arg(long)]
    out: PathBuf,
}

#[derive(ClapArgs, Debug)]
struct ResumeArgs {
    /// Checkpoint written by a previous run.
    #[arg(long)]
    checkpoint: PathBuf,
    /// YAML configuration holding the limit state of the original run.
    #[arg(long)]
    config: PathBuf,
}

/// Configuration file layout: run parameters plus the limit state.
#[derive(Debug, Deserialize)]
struct JobFile {
    #[serde(flatten)]
    run: RunConfig,
    limit_state: LimitStateConfig,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run_job(args),
        Command::Resume(args) => resume_job(args),
    }
}

fn run_job(args: RunArgs) -> Result<(), Box<dyn Error>> {
    let job = load_job(&args.config)?;
    let summary = execute_run(job, &args.out)?;
    persist_config(&args.config, &args.out)?;
    print_summary(&summary)
}

fn resume_job(args: ResumeArgs) -> Result<(), Box<dyn Error>> {
    let job = load_job(&args.config)?;
    let summary = execute_resume(&args.checkpoint, &job)?;
    print_summary(&summary)
}

fn execute_run(mut job: JobFile, out: &Path) -> Result<RunSummary, Box<dyn Error>> {
    fs::create_dir_all(out)?;
    job.run.output.run_directory = Some(out.to_path_buf());
    let evaluator = job.limit_state.build()?;
    check_dimension(&evaluator, job.run.dimension)?;
    tracing::info!(
        exact_pf = evaluator.exact_failure_probability(),
        out = %out.display(),
        "starting run"
    );

    let summary = run(&job.run, &evaluator)?;
    write_json(out.join("summary.json"), &summary)?;
    Ok(summary)
}

fn execute_resume(checkpoint: &Path, job: &JobFile) -> Result<RunSummary, Box<dyn Error>> {
    let payload = CheckpointPayload::load(checkpoint)?;
    let evaluator = job.limit_state.build()?;
    check_dimension(&evaluator, payload.config.dimension)?;
    tracing::info!(
        checkpoint = %checkpoint.display(),
        level = payload.level,
        "resuming run"
    );

    let summary = resume(checkpoint, &evaluator)?;
    if let Some(run_dir) = &payload.config.output.run_directory {
        write_json(run_dir.join("summary.json"), &summary)?;
    }
    Ok(summary)
}

fn check_dimension(evaluator: &LinearLimitState, dimension: usize) -> Result<(), Box<dyn Error>> {
    if evaluator.dimension() != dimension {
        return Err(format!(
            "limit state dimension {} differs from run dimension {}",
            evaluator.dimension(),
            dimension
        )
        .into());
    }
    Ok(())
}

/// Copies the job file next to the artefacts it produced.
fn persist_config(config: &Path, out: &Path) -> Result<(), Box<dyn Error>> {
    let target = out.join("config.yaml");
    fs::copy(config, &target).map_err(|err| {
        format!(
            "cannot copy {} to {}: {err}",
            config.display(),
            target.display()
        )
    })?;
    Ok(())
}

fn load_job(path: &Path) -> Result<JobFile, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&contents)?)
}

fn print_summary(summary: &RunSummary) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

fn write_json<P: AsRef<Path>, T: serde::Serialize>(
    path: P,
    value: &T,
) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}
