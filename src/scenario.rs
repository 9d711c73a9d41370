//! Scenario execution: merges the default stanza with a scenario's named
//! policies in `using ... then ...` order, then walks year by year, applying
//! each (application, substance)'s command list and capturing one
//! [`ResultRecord`] per year (spec §4.8).

use crate::error::{ScopeError, SimResult};
use crate::interpreter::Interpreter;
use crate::program::command::Command;
use crate::program::{Program, ScenarioDef};
use crate::quantity::Quantity;
use crate::result::ResultRecord;
use crate::sampling;
use crate::state::store::StreamStore;
use crate::state::{CarryOverMode, StreamName, Substream, UseKey};
use rand::Rng;
use rust_decimal::Decimal;
use std::collections::HashMap;

pub struct ScenarioRunner<'p> {
    program: &'p Program,
    scenario: &'p ScenarioDef,
}

impl<'p> ScenarioRunner<'p> {
    pub fn new(program: &'p Program, scenario_name: &str) -> SimResult<Self> {
        let scenario = program
            .scenario(scenario_name)
            .ok_or_else(|| ScopeError::UnknownScenario(scenario_name.to_string()))?;
        Ok(Self { program, scenario })
    }

    pub fn scenario(&self) -> &ScenarioDef {
        self.scenario
    }

    /// Merges the default stanza's commands with each named policy's, in
    /// listed order. A policy never replaces or removes a default command —
    /// it appends more commands to the same (application, substance)'s list,
    /// executed after the default's (spec §4.8 step 2 "using ... then").
    fn merged_commands(&self) -> SimResult<HashMap<UseKey, Vec<Command>>> {
        let mut merged: HashMap<UseKey, Vec<Command>> = HashMap::new();
        for app in &self.program.default.applications {
            for sub in &app.substances {
                let key = UseKey::new(app.name.clone(), sub.name.clone());
                merged.entry(key).or_default().extend(sub.commands.clone());
            }
        }
        for policy_name in &self.scenario.policies {
            let policy = self
                .program
                .policy(policy_name)
                .ok_or_else(|| ScopeError::UnknownPolicy(policy_name.clone()))?;
            for app in &policy.stanza.applications {
                for sub in &app.substances {
                    let key = UseKey::new(app.name.clone(), sub.name.clone());
                    merged.entry(key).or_default().extend(sub.commands.clone());
                }
            }
        }
        Ok(merged)
    }

    fn initial_variables(&self, rng: &mut impl Rng) -> SimResult<HashMap<String, Quantity>> {
        let mut variables = HashMap::new();
        for (name, expr) in &self.program.variables.values {
            let q = sampling::resolve(expr, &variables.clone(), rng, None)?;
            variables.insert(name.clone(), q);
        }
        Ok(variables)
    }

    /// Runs one trial (one full draw of the scenario's Monte Carlo
    /// parameters) from `year_start` through `year_end` inclusive, returning
    /// one [`ResultRecord`] per (application, substance) per year.
    pub fn run_trial(&self, trial: u32, rng: &mut impl Rng) -> SimResult<Vec<ResultRecord>> {
        let commands = self.merged_commands()?;
        let mut store = StreamStore::new();
        for key in commands.keys() {
            store.ensure(key);
        }
        let mut variables = self.initial_variables(rng)?;
        let mut records = Vec::new();
        let mut prior_bank = HashMap::new();

        for year in self.scenario.year_start..=self.scenario.year_end {
            for (key, cmds) in &commands {
                store.reset_step(key)?;
                let mut interp = Interpreter::new(&mut store);
                for cmd in cmds {
                    interp.execute(key, cmd, year, &mut variables, rng)?;
                }
            }
            for key in commands.keys() {
                records.push(ResultRecord::capture(&self.scenario.name, trial, year, key, &store, &mut prior_bank)?);
            }
            for key in commands.keys() {
                roll_year(&mut store, key)?;
            }
        }
        Ok(records)
    }
}

/// Folds this year's recycled/induced material into next year's baseline
/// domestic/import volume, then resets the per-year recycling/induction
/// substreams and advances the population bookkeeping (spec §4.8 step 3).
///
/// A stream whose standing `assume` mode is `no` skips redistribution
/// entirely — recycling that stream's material is discarded rather than
/// carried forward (spec §9 Open Questions).
fn roll_year(store: &mut StreamStore, key: &UseKey) -> SimResult<()> {
    let recycle_total = store.get(key)?.streams.recycle().value;
    let induction_total = store.get(key)?.streams.induction().value;
    let total = recycle_total + induction_total;
    if !total.is_zero() {
        let (pct_domestic, pct_import) = store.sales_distribution(key)?;
        redistribute_into(store, key, Substream::Domestic, StreamName::Domestic, total * pct_domestic)?;
        redistribute_into(store, key, Substream::Import, StreamName::Import, total * pct_import)?;
    }
    store.reset_recycling_and_induction(key)?;
    store.snapshot_prior(key)?;
    store.roll_equipment(key)?;
    Ok(())
}

fn redistribute_into(
    store: &mut StreamStore,
    key: &UseKey,
    substream: Substream,
    stream_name: StreamName,
    share: Decimal,
) -> SimResult<()> {
    if store.carry_over_for(key, stream_name)? == CarryOverMode::No {
        return Ok(());
    }
    let current = match substream {
        Substream::Domestic => store.get(key)?.streams.domestic.value,
        Substream::Import => store.get(key)?.streams.import.value,
        Substream::Export => store.get(key)?.streams.export.value,
    };
    store.set_substream_kg(key, substream, current + share)
}
