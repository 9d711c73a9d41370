//! Trial orchestration: runs a scenario's configured trial count in
//! parallel, each with its own seeded RNG, with optional progress reporting
//! and cooperative cancellation (spec §9 supplemented features, §5
//! "Monte Carlo").

use crate::error::SimResult;
use crate::program::Program;
use crate::result::ResultRecord;
use crate::scenario::ScenarioRunner;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Run parameters a host (the CLI, or any other embedder) threads into the
/// trial orchestrator: an override for the scenario's configured trial
/// count, the base RNG seed, and a cooperative cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub trials_override: Option<u32>,
    pub seed: u64,
    pub cancel: Option<Arc<AtomicBool>>,
}

/// Drives all trials of one scenario.
pub struct TrialOrchestrator<'p> {
    program: &'p Program,
    scenario_name: String,
    progress: bool,
    cancel: Option<Arc<AtomicBool>>,
    trials_override: Option<u32>,
}

impl<'p> TrialOrchestrator<'p> {
    pub fn new(program: &'p Program, scenario_name: impl Into<String>) -> Self {
        Self {
            program,
            scenario_name: scenario_name.into(),
            progress: false,
            cancel: None,
            trials_override: None,
        }
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_trials_override(mut self, trials: Option<u32>) -> Self {
        self.trials_override = trials;
        self
    }

    /// Applies a [`RunConfig`] wholesale, returning the base seed to pass to
    /// [`Self::run`].
    pub fn with_config(self, config: &RunConfig) -> (Self, u64) {
        let mut orchestrator = self.with_trials_override(config.trials_override);
        if let Some(cancel) = &config.cancel {
            orchestrator = orchestrator.with_cancel(cancel.clone());
        }
        (orchestrator, config.seed)
    }

    /// Runs every trial configured on the scenario (or `trials_override`,
    /// if set), seeding each trial's RNG from `base_seed + trial_index` so a
    /// run is reproducible given a fixed seed. Returns the concatenation of
    /// every trial's records; a trial that observes cancellation mid-run is
    /// simply omitted, along with every trial queued after it.
    pub fn run(&self, base_seed: u64) -> SimResult<Vec<ResultRecord>> {
        let runner = ScenarioRunner::new(self.program, &self.scenario_name)?;
        let trials = self.trials_override.unwrap_or(runner.scenario().trials);

        let bar = if self.progress {
            let bar = ProgressBar::new(trials as u64);
            bar.set_style(
                ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} trials ({eta})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            Some(bar)
        } else {
            None
        };

        let results: Vec<SimResult<Vec<ResultRecord>>> = (0..trials)
            .into_par_iter()
            .map(|trial| {
                if let Some(flag) = &self.cancel {
                    if flag.load(Ordering::Relaxed) {
                        return Ok(Vec::new());
                    }
                }
                let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(trial as u64));
                let records = runner.run_trial(trial, &mut rng);
                if let Some(bar) = &bar {
                    bar.inc(1);
                }
                records
            })
            .collect();

        if let Some(bar) = &bar {
            bar.finish_and_clear();
        }

        let mut all = Vec::new();
        for r in results {
            all.extend(r?);
        }
        Ok(all)
    }
}
