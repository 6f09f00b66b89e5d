use std::path::{Path, PathBuf};

use rayon::prelude::*;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};
use subsim_core::errors::ErrorInfo;
use subsim_core::{PerformanceFunction, Population, RngHandle, SubsimError};

use crate::adapter::{AdaptationRecord, ProposalAdapter};
use crate::aggregate;
use crate::chain::{self, Chain};
use crate::checkpoint::{self, CheckpointPayload};
use crate::config::{LevelPlan, OutputConfig, ProposalConfig, RunConfig};
use crate::determinism;
use crate::direct::DirectMonteCarloSampler;
use crate::manifest::RunManifest;
use crate::metrics::MetricsRecorder;
use crate::proposal::{MarkovChainProposal, ProposalKind};
use crate::threshold::{self, ThresholdSelection};

/// Position of a run in the level loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Configuration validated, level 0 not sampled yet.
    DirectMc,
    /// Seeds and threshold of the next level are known.
    LevelActive,
    /// The run has stopped; no further level will be created.
    Done,
}

/// Finalized statistics and seeds of one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelRecord {
    /// Level index, 0 for direct Monte Carlo.
    pub index: usize,
    /// Threshold defining the next intermediate domain, 0 on the terminal level.
    pub threshold: f64,
    /// Chains started from this level's seeds (0 on the terminal level).
    pub num_chains: usize,
    /// Population size of the level.
    pub num_samples: usize,
    /// Samples inside the true failure domain.
    pub num_failed: usize,
    /// Conditional probability of the level.
    pub level_pf: f64,
    /// Coefficient of variation of `level_pf`.
    pub level_cov: f64,
    /// Chain correlation factor used for `level_cov`.
    pub gamma: f64,
    /// Running failure probability estimate up to this level.
    pub pf: f64,
    /// Whether the run stopped at this level because the failure domain was reached.
    pub is_finished: bool,
    /// Seeds of the next level, most critical first.
    pub seeds: Vec<Vec<f64>>,
    /// Performance values of `seeds`.
    pub seed_evaluations: Vec<f64>,
    /// Mean chain acceptance while growing this level (none for level 0).
    pub acceptance_rate: Option<f64>,
    /// Proposal adaptations performed while growing this level.
    pub adaptations: Vec<AdaptationRecord>,
    /// Adaptive scale parameter at the end of the level.
    pub lambda: Option<f64>,
}

/// Summary returned to callers after a run completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// Proposal strategy used to grow the chains.
    pub proposal: ProposalKind,
    /// Level history in creation order.
    pub levels: Vec<LevelRecord>,
    /// Failure probability estimate.
    pub failure_probability: f64,
    /// Aggregate COV assuming uncorrelated levels.
    pub cov: f64,
    /// Aggregate COV assuming fully correlated levels.
    pub cov_upper_bound: f64,
    /// Whether the failure domain was reached before `max_levels`.
    pub is_finished: bool,
    /// Performance function evaluations spent by the run.
    pub evaluations: usize,
    /// Level table written during the run.
    pub levels_path: Option<PathBuf>,
    /// Manifest path, if emitted.
    pub manifest_path: Option<PathBuf>,
    /// Checkpoint files retained at the end of the run.
    pub checkpoints: Vec<PathBuf>,
}

/// Subset simulation controller driving the level loop one level at a time.
///
/// A caller may stop between two calls to [`SubsetSimulation::advance`]; the
/// state at that point is exactly what a checkpoint stores.
#[derive(Debug)]
pub struct SubsetSimulation {
    config: RunConfig,
    plan: LevelPlan,
    phase: Phase,
    levels: Vec<LevelRecord>,
    adapter: Option<ProposalAdapter>,
    evaluations: usize,
    pool: ThreadPool,
}

impl SubsetSimulation {
    /// Validates `config` and prepares a run. No evaluation happens here.
    pub fn new(config: RunConfig) -> Result<Self, SubsimError> {
        let plan = config.validate()?;
        let adapter = match &config.proposal {
            ProposalConfig::AdaptiveConditionalSampling { initial_lambda, .. } => {
                Some(ProposalAdapter::new(*initial_lambda))
            }
            _ => None,
        };
        let pool = build_pool(config.concurrency)?;
        Ok(Self {
            config,
            plan,
            phase: Phase::DirectMc,
            levels: Vec::new(),
            adapter,
            evaluations: 0,
            pool,
        })
    }

    /// Rebuilds a controller from a level-boundary checkpoint.
    pub fn from_checkpoint(payload: CheckpointPayload) -> Result<Self, SubsimError> {
        let mut simulation = Self::new(payload.config)?;
        let Some(last) = payload.levels.last() else {
            return Err(SubsimError::Serde(ErrorInfo::new(
                "checkpoint-empty",
                "checkpoint contains no completed level",
            )));
        };
        if last.is_finished || last.seeds.len() != simulation.plan.num_chains {
            return Err(SubsimError::Serde(
                ErrorInfo::new("checkpoint-state", "checkpoint does not end on an open level")
                    .with_context("level", last.index)
                    .with_context("seeds", last.seeds.len()),
            ));
        }
        if let (Some(adapter), Some(lambda)) = (simulation.adapter.as_mut(), payload.lambda) {
            *adapter = ProposalAdapter::new(lambda);
        }
        simulation.levels = payload.levels;
        simulation.evaluations = payload.evaluations;
        simulation.phase = if simulation.levels.len() >= simulation.config.max_levels {
            Phase::Done
        } else {
            Phase::LevelActive
        };
        Ok(simulation)
    }

    /// Current phase of the level loop.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Chain layout derived from the configuration.
    pub fn plan(&self) -> LevelPlan {
        self.plan
    }

    /// Configuration of the run.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Completed levels in creation order.
    pub fn levels(&self) -> &[LevelRecord] {
        &self.levels
    }

    /// Evaluations spent so far.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    /// Runs the next level. Returns `None` once the run is done.
    pub fn advance<F>(&mut self, evaluator: &F) -> Result<Option<&LevelRecord>, SubsimError>
    where
        F: PerformanceFunction + ?Sized,
    {
        match self.phase {
            Phase::Done => return Ok(None),
            Phase::DirectMc => {
                let population = self.sample_direct(evaluator)?;
                self.finalize_level(population, None, Vec::new())?;
            }
            Phase::LevelActive => {
                let (population, chain_evaluations, adaptations, acceptance) =
                    self.grow_level(evaluator)?;
                self.finalize_level(
                    population,
                    Some((chain_evaluations, acceptance)),
                    adaptations,
                )?;
            }
        }
        Ok(self.levels.last())
    }

    /// Serializable state at the current level boundary.
    pub fn checkpoint_payload(&self) -> CheckpointPayload {
        CheckpointPayload {
            level: self.levels.len(),
            config: self.config.clone(),
            master_seed: self.config.seed_policy.master_seed,
            levels: self.levels.clone(),
            lambda: self.adapter.as_ref().map(ProposalAdapter::lambda),
            evaluations: self.evaluations,
        }
    }

    /// Consumes the controller and assembles the run summary.
    pub fn into_summary(self) -> RunSummary {
        let level_covs: Vec<f64> = self.levels.iter().map(|level| level.level_cov).collect();
        let (cov, cov_upper_bound) = aggregate::aggregate_cov(&level_covs);
        RunSummary {
            proposal: ProposalKind::from(&self.config.proposal),
            failure_probability: self.levels.last().map(|level| level.pf).unwrap_or(1.0),
            cov,
            cov_upper_bound,
            is_finished: self.levels.last().map(|l| l.is_finished).unwrap_or(false),
            evaluations: self.evaluations,
            levels: self.levels,
            levels_path: None,
            manifest_path: None,
            checkpoints: Vec::new(),
        }
    }

    fn sample_direct<F>(&mut self, evaluator: &F) -> Result<Population, SubsimError>
    where
        F: PerformanceFunction + ?Sized,
    {
        let mut rng =
            RngHandle::from_seed(determinism::direct_mc_seed(self.config.seed_policy.master_seed));
        let sampler = DirectMonteCarloSampler::new(self.config.dimension);
        let samples = sampler.sample(self.config.samples_per_level, &mut rng);
        let evaluations = evaluate_all(&self.pool, evaluator, &samples)?;
        self.evaluations += samples.len();
        Population::new(samples, evaluations)
    }

    #[allow(clippy::type_complexity)]
    fn grow_level<F>(
        &mut self,
        evaluator: &F,
    ) -> Result<(Population, Vec<Vec<f64>>, Vec<AdaptationRecord>, f64), SubsimError>
    where
        F: PerformanceFunction + ?Sized,
    {
        let level = self.levels.len();
        let Some(previous) = self.levels.last() else {
            return Err(SubsimError::numerical(
                "missing-seeds",
                "no completed level to seed chains from",
            ));
        };
        let threshold = previous.threshold;
        let seeds = &previous.seeds;
        let seed_evaluations = &previous.seed_evaluations;
        let master_seed = self.config.seed_policy.master_seed;
        let states_per_chain = self.plan.states_per_chain;

        if let Some(adapter) = self.adapter.as_mut() {
            adapter.start_level();
        }

        let mut chains: Vec<Chain> = Vec::with_capacity(self.plan.num_chains);
        let mut adaptations = Vec::new();
        let mut accepted = 0usize;
        let mut steps = 0usize;

        for batch_start in (0..self.plan.num_chains).step_by(self.plan.chains_per_adaptation) {
            let batch_end = (batch_start + self.plan.chains_per_adaptation).min(seeds.len());
            let lambda = self.adapter.as_ref().map(ProposalAdapter::lambda).unwrap_or(1.0);
            let proposal = MarkovChainProposal::from_config(&self.config.proposal, lambda)?;

            let batch: Vec<Chain> = self.pool.install(|| {
                (batch_start..batch_end)
                    .into_par_iter()
                    .map(|index| {
                        let mut rng = RngHandle::from_seed(determinism::chain_seed(
                            master_seed,
                            level,
                            index,
                        ));
                        chain::grow_chain(
                            seeds[index].clone(),
                            seed_evaluations[index],
                            states_per_chain,
                            threshold,
                            &proposal,
                            evaluator,
                            &mut rng,
                        )
                    })
                    .collect::<Result<Vec<_>, SubsimError>>()
            })?;

            let flags: Vec<bool> = batch.iter().flat_map(Chain::acceptance_flags).collect();
            accepted += flags.iter().filter(|&&flag| flag).count();
            steps += flags.len();
            if let Some(record) = self.adapter.as_mut().and_then(|a| a.update(&flags)) {
                tracing::debug!(
                    level,
                    batch = record.batch_index,
                    accept_rate = record.accept_rate,
                    lambda = record.lambda_after,
                    "adapted proposal scale"
                );
                adaptations.push(record);
            }
            chains.extend(batch);
        }

        self.evaluations += chains.len() * states_per_chain.saturating_sub(1);
        let acceptance = if steps == 0 {
            0.0
        } else {
            accepted as f64 / steps as f64
        };

        let chain_evaluations: Vec<Vec<f64>> = chains.iter().map(Chain::evaluations).collect();
        let mut samples = Vec::with_capacity(self.config.samples_per_level);
        let mut evaluations = Vec::with_capacity(self.config.samples_per_level);
        for chain in chains {
            let (states, values) = chain.into_parts();
            samples.extend(states);
            evaluations.extend(values);
        }
        let population = Population::new(samples, evaluations)?;
        Ok((population, chain_evaluations, adaptations, acceptance))
    }

    fn finalize_level(
        &mut self,
        population: Population,
        chain_structure: Option<(Vec<Vec<f64>>, f64)>,
        adaptations: Vec<AdaptationRecord>,
    ) -> Result<(), SubsimError> {
        let index = self.levels.len();
        let selection = threshold::select_threshold(&population, self.config.p0)?;
        let terminal = reaches_terminal_level(&selection, self.plan.num_chains);
        let threshold = if terminal { 0.0 } else { selection.threshold };

        check_seeds_inside(&selection, index, terminal)?;

        // Intermediate levels hold exactly the seed fraction above their threshold.
        let intermediate_pf = self.plan.num_chains as f64 / selection.num_samples as f64;
        let (level_pf, exceeding) = if terminal {
            (
                aggregate::exceedance_probability(population.evaluations(), 0.0),
                selection.num_failed,
            )
        } else {
            (intermediate_pf, self.plan.num_chains)
        };
        if terminal && level_pf <= 0.0 {
            tracing::warn!(level = index, "no failed samples on the terminal level");
        }

        let (stats, acceptance_rate) = match &chain_structure {
            None => (
                aggregate::direct_level_statistics(selection.num_samples, level_pf),
                None,
            ),
            Some((chain_evaluations, acceptance)) => (
                aggregate::chain_level_statistics(chain_evaluations, threshold, level_pf),
                Some(*acceptance),
            ),
        };
        let pf = aggregate::level_failure_probability(
            intermediate_pf,
            index,
            exceeding,
            selection.num_samples,
        );
        let (seeds, seed_evaluations) = if terminal {
            (Vec::new(), Vec::new())
        } else {
            (selection.seeds, selection.seed_evaluations)
        };

        tracing::info!(
            level = index,
            threshold,
            level_pf = stats.level_pf,
            cov = stats.cov,
            pf,
            num_failed = selection.num_failed,
            terminal,
            "level complete"
        );

        self.levels.push(LevelRecord {
            index,
            threshold,
            num_chains: seeds.len(),
            num_samples: selection.num_samples,
            num_failed: selection.num_failed,
            level_pf: stats.level_pf,
            level_cov: stats.cov,
            gamma: stats.gamma,
            pf,
            is_finished: terminal,
            seeds,
            seed_evaluations,
            acceptance_rate,
            adaptations,
            lambda: self.adapter.as_ref().map(ProposalAdapter::lambda),
        });

        self.phase = if terminal {
            Phase::Done
        } else if self.levels.len() >= self.config.max_levels {
            tracing::warn!(
                max_levels = self.config.max_levels,
                pf,
                "level limit reached before the failure domain; estimate is incomplete"
            );
            Phase::Done
        } else {
            Phase::LevelActive
        };
        Ok(())
    }
}

/// Termination test applied after every level.
fn reaches_terminal_level(selection: &ThresholdSelection, num_chains: usize) -> bool {
    selection.num_failed >= num_chains || selection.reaches_failure_domain()
}

fn check_seeds_inside(
    selection: &ThresholdSelection,
    index: usize,
    terminal: bool,
) -> Result<(), SubsimError> {
    if terminal || selection.seeds_exceed_threshold() {
        return Ok(());
    }
    Err(SubsimError::Numerical(
        ErrorInfo::new(
            "level-probability-vanished",
            "no sample exceeds the intermediate threshold",
        )
        .with_context("level", index)
        .with_context("threshold", selection.threshold)
        .with_hint("the performance function is constant over the top of the population"),
    ))
}

fn build_pool(concurrency: usize) -> Result<ThreadPool, SubsimError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(concurrency.max(1))
        .build()
        .map_err(|err| SubsimError::Config(ErrorInfo::new("thread-pool", err.to_string())))
}

fn evaluate_all<F>(
    pool: &ThreadPool,
    evaluator: &F,
    samples: &[Vec<f64>],
) -> Result<Vec<f64>, SubsimError>
where
    F: PerformanceFunction + ?Sized,
{
    pool.install(|| {
        samples
            .par_iter()
            .map(|sample| evaluator.evaluate(sample))
            .collect()
    })
}

/// Runs a subset simulation from scratch.
pub fn run<F>(config: &RunConfig, evaluator: &F) -> Result<RunSummary, SubsimError>
where
    F: PerformanceFunction + ?Sized,
{
    let simulation = SubsetSimulation::new(config.clone())?;
    drive(simulation, evaluator)
}

/// Resumes a run from a level-boundary checkpoint file.
pub fn resume<F>(path: &Path, evaluator: &F) -> Result<RunSummary, SubsimError>
where
    F: PerformanceFunction + ?Sized,
{
    let payload = CheckpointPayload::load(path)?;
    let simulation = SubsetSimulation::from_checkpoint(payload)?;
    drive(simulation, evaluator)
}

fn drive<F>(mut simulation: SubsetSimulation, evaluator: &F) -> Result<RunSummary, SubsimError>
where
    F: PerformanceFunction + ?Sized,
{
    let config = simulation.config().clone();
    let layout = resolve_output_paths(&config.output);
    let mut recorder = MetricsRecorder::new();
    for level in simulation.levels() {
        recorder.push_level(level);
    }
    let mut checkpoints = Vec::new();

    while let Some(level) = simulation.advance(evaluator)? {
        recorder.push_level(level);
        let completed = level.index + 1;
        let open = !level.is_finished;
        if open
            && simulation.phase() == Phase::LevelActive
            && config.checkpoint.interval > 0
            && completed % config.checkpoint.interval == 0
        {
            if let Some(path) = write_checkpoint(&simulation, &layout)? {
                checkpoints.push(path);
                enforce_checkpoint_retention(&mut checkpoints, config.checkpoint.max_to_keep)?;
            }
        }
    }

    let mut summary = simulation.into_summary();

    if let (Some(run_dir), Some(levels_rel)) = (&layout.run_directory, &layout.levels_file) {
        let path = run_dir.join(levels_rel);
        recorder
            .write_csv(&path)
            .map_err(|err| SubsimError::io("levels-write", err, &path))?;
        summary.levels_path = Some(path);
    }

    if let Some(run_dir) = &layout.run_directory {
        let manifest_path = run_dir.join(layout.manifest_file.clone().unwrap_or_default());
        let manifest = RunManifest::from_summary(&config, &summary, run_dir, &checkpoints)?;
        manifest.write(&manifest_path)?;
        summary.manifest_path = Some(manifest_path);
    }
    summary.checkpoints = checkpoints;

    if !summary.is_finished {
        tracing::warn!(
            levels = summary.levels.len(),
            "run stopped before reaching the failure domain"
        );
    }
    Ok(summary)
}

fn write_checkpoint(
    simulation: &SubsetSimulation,
    layout: &ResolvedOutput,
) -> Result<Option<PathBuf>, SubsimError> {
    let run_dir = match &layout.run_directory {
        Some(dir) => dir,
        None => return Ok(None),
    };
    let checkpoint_dir = run_dir.join(layout.checkpoint_dir.clone().unwrap_or_default());
    let payload = simulation.checkpoint_payload();
    let path = checkpoint::checkpoint_path(&checkpoint_dir, payload.level);
    payload.store(&path)?;
    tracing::debug!(path = %path.display(), level = payload.level, "checkpoint written");
    Ok(Some(path))
}

fn enforce_checkpoint_retention(
    paths: &mut Vec<PathBuf>,
    max_to_keep: usize,
) -> Result<(), SubsimError> {
    if paths.len() <= max_to_keep {
        return Ok(());
    }
    let mut removed = Vec::new();
    while paths.len() > max_to_keep {
        removed.push(paths.remove(0));
    }
    for path in removed {
        std::fs::remove_file(&path)
            .map_err(|err| SubsimError::io("checkpoint-remove", err, &path))?;
    }
    Ok(())
}

#[derive(Default)]
struct ResolvedOutput {
    run_directory: Option<PathBuf>,
    levels_file: Option<PathBuf>,
    manifest_file: Option<PathBuf>,
    checkpoint_dir: Option<PathBuf>,
}

fn resolve_output_paths(config: &OutputConfig) -> ResolvedOutput {
    if config.run_directory.is_none() {
        ResolvedOutput::default()
    } else {
        ResolvedOutput {
            run_directory: config.run_directory.clone(),
            levels_file: Some(config.levels_file.clone()),
            manifest_file: Some(config.manifest_file.clone()),
            checkpoint_dir: Some(config.checkpoint_dir.clone()),
        }
    }
}
