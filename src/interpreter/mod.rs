//! The command interpreter: executes one compiled [`Command`] node against a
//! use-key's state, triggering whatever recalculation chain spec §5's
//! propagation table calls for (spec §4.6, §4.8 step 3).

pub mod displacement;

use crate::error::{ConfigError, SimResult};
use crate::program::command::{Command, DisplacementTarget};
use crate::program::expr::ValueExpr;
use crate::program::year_matcher::YearMatcher;
use crate::quantity::context::Temporal;
use crate::quantity::{BaseUnit, Quantity, Units};
use crate::recalc;
use crate::sampling;
use crate::state::parameterization::ExplicitRate;
use crate::state::store::{StreamStore, WriteMode};
use crate::state::{Stage, StreamName, Substream, UseKey};
use rand::Rng;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Which year matcher gates a command, if any. `enable`/`initialCharge`/
/// `define`/`get` aren't year-scoped — they take effect the moment the
/// interpreter reaches them.
fn command_year(command: &Command) -> Option<&YearMatcher> {
    match command {
        Command::Set { year, .. }
        | Command::Change { year, .. }
        | Command::Equals { year, .. }
        | Command::Retire { year, .. }
        | Command::Recharge { year, .. }
        | Command::Recover { year, .. }
        | Command::Cap { year, .. }
        | Command::Floor { year, .. }
        | Command::Replace { year, .. }
        | Command::Assume { year, .. } => Some(year),
        Command::Enable { .. }
        | Command::InitialCharge { .. }
        | Command::Define { .. }
        | Command::Get { .. } => None,
    }
}

fn cap_floor_substream(stream: StreamName) -> SimResult<Substream> {
    match stream {
        StreamName::Domestic => Ok(Substream::Domestic),
        StreamName::Import => Ok(Substream::Import),
        StreamName::Export => Ok(Substream::Export),
        other => Err(ConfigError::Other(format!("{other} cannot be capped or floored")).into()),
    }
}

fn to_kg(store: &StreamStore, key: &UseKey, q: &Quantity) -> SimResult<Decimal> {
    if q.units.is_base(BaseUnit::Unit) {
        let charge = store.effective_initial_charge(key)?;
        Ok(q.value * charge.value)
    } else if q.units.is_base(BaseUnit::Mt) {
        Ok(q.value * Decimal::from(1000))
    } else {
        Ok(q.value)
    }
}

fn expect_units(q: &Quantity) -> SimResult<Decimal> {
    if q.units.is_base(BaseUnit::Unit) {
        Ok(q.value)
    } else {
        Err(ConfigError::Other(format!("expected a unit count, got {}", q.units)).into())
    }
}

fn substream_kg(store: &StreamStore, key: &UseKey, substream: Substream) -> SimResult<Decimal> {
    let state = store.get(key)?;
    Ok(match substream {
        Substream::Domestic => state.streams.domestic.value,
        Substream::Import => state.streams.import.value,
        Substream::Export => state.streams.export.value,
    })
}

/// Executes compiled commands against one use-key, resolving `ValueExpr`
/// nodes through a caller-owned RNG and variable scope (spec §9 "Monte Carlo
/// sampling").
pub struct Interpreter<'a> {
    pub store: &'a mut StreamStore,
}

impl<'a> Interpreter<'a> {
    pub fn new(store: &'a mut StreamStore) -> Self {
        Self { store }
    }

    /// Runs `command` against `key` for `year`, skipping it if the command's
    /// year matcher doesn't cover `year` (spec §3 "Year matcher").
    pub fn execute(
        &mut self,
        key: &UseKey,
        command: &Command,
        year: i32,
        variables: &mut HashMap<String, Quantity>,
        rng: &mut impl Rng,
    ) -> SimResult<()> {
        if let Some(matcher) = command_year(command) {
            if !matcher.covers(year) {
                return Ok(());
            }
        }
        match command {
            Command::Enable { stream } => self.store.enable(key, *stream),
            Command::InitialCharge { substream, value } => {
                self.exec_initial_charge(key, *substream, value, variables, rng)
            }
            Command::Set { stream, value, .. } => self.exec_set(key, *stream, value, variables, rng),
            Command::Change { stream, delta, .. } => self.exec_change(key, *stream, delta, variables, rng),
            Command::Equals { ghg_intensity, energy_intensity, .. } => {
                self.exec_equals(key, ghg_intensity.as_ref(), energy_intensity.as_ref(), variables, rng)
            }
            Command::Retire { amount, with_replacement, .. } => {
                self.exec_retire(key, amount, *with_replacement, variables, rng)
            }
            Command::Recharge { population, intensity, .. } => {
                self.exec_recharge(key, population, intensity, variables, rng)
            }
            Command::Recover { amount, stage, yield_rate, induction, displacing, .. } => self.exec_recover(
                key,
                amount,
                *stage,
                yield_rate,
                induction.as_ref(),
                displacing.as_ref(),
                variables,
                rng,
            ),
            Command::Cap { stream, value, displacing, .. } => {
                self.exec_cap(key, *stream, value, displacing.as_ref(), variables, rng)
            }
            Command::Floor { stream, value, displacing, .. } => {
                self.exec_floor(key, *stream, value, displacing.as_ref(), variables, rng)
            }
            Command::Replace { amount, stream, target_substance, .. } => {
                self.exec_replace(key, amount, *stream, target_substance, variables, rng)
            }
            Command::Assume { mode, stream, .. } => {
                self.store.get_mut(key)?.parameterization.carry_over.insert(*stream, *mode);
                Ok(())
            }
            Command::Define { name, value } => {
                let q = sampling::resolve(value, variables, rng, Some((&*self.store, key)))?;
                variables.insert(name.clone(), q);
                Ok(())
            }
            Command::Get { stream, of_substance, as_units } => {
                self.exec_get(key, *stream, of_substance.as_deref(), as_units.clone(), rng)
            }
        }
    }

    fn exec_initial_charge(
        &mut self,
        key: &UseKey,
        substream: Substream,
        value: &ValueExpr,
        variables: &HashMap<String, Quantity>,
        rng: &mut impl Rng,
    ) -> SimResult<()> {
        let q = sampling::resolve(value, variables, rng, Some((&*self.store, key)))?;
        self.store.get_mut(key)?.parameterization.initial_charge.insert(substream, q);
        Ok(())
    }

    /// `set stream to V` (spec §4.6). `sales` can't be set directly (spec
    /// §4.2: "the aggregate cannot be stored directly"); derived streams
    /// (`consumption`, `age`, `bank`, ...) are read-only.
    fn exec_set(
        &mut self,
        key: &UseKey,
        stream: StreamName,
        value: &ValueExpr,
        variables: &HashMap<String, Quantity>,
        rng: &mut impl Rng,
    ) -> SimResult<()> {
        let q = sampling::resolve(value, variables, rng, Some((&*self.store, key)))?;
        match stream {
            StreamName::Domestic => {
                self.store.write_substream(key, Substream::Domestic, &q, WriteMode::Gross)?;
                recalc::propagate_from_population(self.store, key)
            }
            StreamName::Import => {
                self.store.write_substream(key, Substream::Import, &q, WriteMode::Gross)?;
                recalc::propagate_from_population(self.store, key)
            }
            StreamName::Export => {
                self.store.write_substream(key, Substream::Export, &q, WriteMode::Gross)?;
                recalc::propagate_from_population(self.store, key)
            }
            StreamName::Recycle => {
                let kg = to_kg(self.store, key, &q)?;
                self.store.write_recycle_total(key, kg)?;
                recalc::propagate_full(self.store, key)
            }
            StreamName::Equipment => {
                let units = expect_units(&q)?;
                self.store.get_mut(key)?.streams.equipment = Quantity::new(units, Units::UNIT);
                recalc::propagate_sales_then_consumption(self.store, key)
            }
            StreamName::PriorEquipment => {
                let units = expect_units(&q)?;
                let new_prior = Quantity::new(units, Units::UNIT);
                let state = self.store.get_mut(key)?;
                state.cumulative_base.rescale_recharge_on_manual_edit(&new_prior);
                state.cumulative_base.rescale_retirement_on_manual_edit(&new_prior);
                state.streams.prior_equipment = new_prior;
                recalc::propagate_population_only(self.store, key)
            }
            StreamName::Sales => {
                Err(ConfigError::Other("sales is a computed aggregate and cannot be set directly".into()).into())
            }
            other => Err(ConfigError::Other(format!("{other} is not directly settable")).into()),
        }
    }

    /// `change stream by V [/ year]` (spec §4.6). A percent delta is
    /// relative to the stream's current value; anything else is an absolute
    /// kg/mt/unit delta. Each covered year re-executes the command, so the
    /// `/ year` rate modifier needs no extra scaling here.
    fn exec_change(
        &mut self,
        key: &UseKey,
        stream: StreamName,
        delta: &ValueExpr,
        variables: &HashMap<String, Quantity>,
        rng: &mut impl Rng,
    ) -> SimResult<()> {
        let d = sampling::resolve(delta, variables, rng, Some((&*self.store, key)))?;
        let substream = cap_floor_substream(stream)?;
        let current_kg = substream_kg(self.store, key, substream)?;
        let new_kg = if d.units.is_percent() {
            current_kg * (Decimal::ONE + d.value)
        } else {
            current_kg + to_kg(self.store, key, &d)?
        };
        let target = Quantity::new(new_kg, Units::KG);
        self.store.write_substream(key, substream, &target, WriteMode::Gross)?;
        recalc::propagate_from_population(self.store, key)
    }

    fn exec_equals(
        &mut self,
        key: &UseKey,
        ghg_intensity: Option<&ValueExpr>,
        energy_intensity: Option<&ValueExpr>,
        variables: &HashMap<String, Quantity>,
        rng: &mut impl Rng,
    ) -> SimResult<()> {
        if let Some(expr) = ghg_intensity {
            let q = sampling::resolve(expr, variables, rng, Some((&*self.store, key)))?;
            self.store.get_mut(key)?.parameterization.ghg_intensity = q;
        }
        if let Some(expr) = energy_intensity {
            let q = sampling::resolve(expr, variables, rng, Some((&*self.store, key)))?;
            self.store.get_mut(key)?.parameterization.energy_intensity = q;
        }
        // Neither sales nor population reads ghg/energy intensity, so only
        // consumption needs to be recomputed (spec §5's propagation table).
        recalc::propagate_consumption_only(self.store, key)
    }

    /// `retire V [with replacement]` (spec §4.5, §4.6). Multiple `retire`
    /// commands within the same step accumulate against the step's captured
    /// base rather than against the population "as of now" — see
    /// [`crate::state::cumulative_base::CumulativeBase::capture_retirement_base`].
    fn exec_retire(
        &mut self,
        key: &UseKey,
        amount: &ValueExpr,
        with_replacement: bool,
        variables: &HashMap<String, Quantity>,
        rng: &mut impl Rng,
    ) -> SimResult<()> {
        let q = sampling::resolve(amount, variables, rng, Some((&*self.store, key)))?;
        let prior_equipment = self.store.get(key)?.streams.prior_equipment.clone();
        let state = self.store.get_mut(key)?;
        state.cumulative_base.capture_retirement_base(&prior_equipment);
        let base = state
            .cumulative_base
            .retirement_base_population
            .clone()
            .expect("just captured above");
        let delta_units = if q.units.is_percent() { base.value * q.value } else { q.value };
        state.cumulative_base.applied_retirement_amount =
            state.cumulative_base.applied_retirement_amount.clone() + Quantity::new(delta_units, Units::UNIT);
        if q.units.is_percent() {
            state.parameterization.retirement_rate = Quantity::new(q.value, Units::PERCENT);
        }
        if with_replacement {
            state.cumulative_base.has_replacement_this_step = true;
        }
        recalc::propagate_full(self.store, key)
    }

    /// `recharge V with I` (spec §4.6). Rate accumulates additively across
    /// commands in a step; intensity is the rate-weighted average (spec
    /// §4.7). The first `recharge` command touching a step's rate resets the
    /// standing rate/intensity to zero first, so a standing multi-year
    /// command doesn't accumulate without bound (spec §4.5).
    fn exec_recharge(
        &mut self,
        key: &UseKey,
        population: &ValueExpr,
        intensity: &ValueExpr,
        variables: &HashMap<String, Quantity>,
        rng: &mut impl Rng,
    ) -> SimResult<()> {
        let pop_q = sampling::resolve(population, variables, rng, Some((&*self.store, key)))?;
        let intensity_q = sampling::resolve(intensity, variables, rng, Some((&*self.store, key)))?;
        let prior_equipment = self.store.get(key)?.streams.prior_equipment.clone();
        let state = self.store.get_mut(key)?;
        state.cumulative_base.capture_recharge_base(&prior_equipment);
        if state.cumulative_base.touch_recharge_rate() {
            state.parameterization.recharge_population = Quantity::zero(Units::PERCENT);
            state.parameterization.recharge_intensity = Quantity::zero(Units::kg_per_unit());
        }
        state.parameterization.accumulate_recharge(pop_q, intensity_q);
        recalc::propagate_full(self.store, key)
    }

    /// `recover V with Y [at stage] [with I induction] [displacing D]`
    /// (spec §4.6). Recycling never supports displacement — any `displacing`
    /// clause here is rejected outright (spec §4.6 "Substance-target
    /// displacement in recycling is not supported").
    #[allow(clippy::too_many_arguments)]
    fn exec_recover(
        &mut self,
        key: &UseKey,
        amount: &ValueExpr,
        stage: Stage,
        yield_rate: &ValueExpr,
        induction: Option<&ValueExpr>,
        displacing: Option<&DisplacementTarget>,
        variables: &HashMap<String, Quantity>,
        rng: &mut impl Rng,
    ) -> SimResult<()> {
        if let Some(target) = displacing {
            return displacement::reject_recycling_displacement(target);
        }
        let amount_q = sampling::resolve(amount, variables, rng, Some((&*self.store, key)))?;
        let yield_q = sampling::resolve(yield_rate, variables, rng, Some((&*self.store, key)))?;
        let induction_q = match induction {
            Some(expr) => Some(sampling::resolve(expr, variables, rng, Some((&*self.store, key)))?),
            None => None,
        };

        let state = self.store.get_mut(key)?;
        if state.cumulative_base.touch_recovery(stage) {
            state.parameterization.recovery_rate.insert(stage, ExplicitRate::default_zero(Units::PERCENT));
        }
        state.parameterization.accumulate_recovery_rate(stage, amount_q);

        if state.cumulative_base.touch_yield(stage) {
            state.parameterization.yield_rate.insert(stage, ExplicitRate::default_zero(Units::PERCENT));
        }
        let count = state.cumulative_base.yield_sample_count_mut(stage);
        state.parameterization.accumulate_yield_rate(stage, yield_q, count);

        if let Some(induction_q) = induction_q {
            state.parameterization.set_induction_rate(stage, induction_q);
        }
        recalc::propagate_full(self.store, key)
    }

    /// `cap stream to V [displacing D]` (spec §4.6). Only reduces — if the
    /// stream is already at or below `V`, this is a no-op. A cap/floor
    /// target must be enabled (spec §4.6: "cap/floor target stream
    /// disabled" is a `ConfigError`).
    fn exec_cap(
        &mut self,
        key: &UseKey,
        stream: StreamName,
        value: &ValueExpr,
        displacing: Option<&DisplacementTarget>,
        variables: &HashMap<String, Quantity>,
        rng: &mut impl Rng,
    ) -> SimResult<()> {
        let cap_q = sampling::resolve(value, variables, rng, Some((&*self.store, key)))?;
        let substream = cap_floor_substream(stream)?;
        if !self.store.is_enabled(key, stream)? {
            return Err(
                ConfigError::DisabledCapTarget { stream: stream.to_string(), scope: key.to_string() }.into(),
            );
        }
        let cap_kg = to_kg(self.store, key, &cap_q)?;
        let current_kg = substream_kg(self.store, key, substream)?;
        if current_kg > cap_kg {
            let reduction = current_kg - cap_kg;
            self.store.set_substream_kg(key, substream, cap_kg)?;
            if let Some(target) = displacing {
                displacement::displace(self.store, key, target, reduction)?;
            }
        }
        recalc::propagate_from_population(self.store, key)
    }

    /// `floor stream to V [displacing D]` (spec §4.6). Symmetric to `cap`:
    /// only raises, and any `displacing` source has the shortfall subtracted
    /// from it.
    fn exec_floor(
        &mut self,
        key: &UseKey,
        stream: StreamName,
        value: &ValueExpr,
        displacing: Option<&DisplacementTarget>,
        variables: &HashMap<String, Quantity>,
        rng: &mut impl Rng,
    ) -> SimResult<()> {
        let floor_q = sampling::resolve(value, variables, rng, Some((&*self.store, key)))?;
        let substream = cap_floor_substream(stream)?;
        if !self.store.is_enabled(key, stream)? {
            return Err(
                ConfigError::DisabledCapTarget { stream: stream.to_string(), scope: key.to_string() }.into(),
            );
        }
        let floor_kg = to_kg(self.store, key, &floor_q)?;
        let current_kg = substream_kg(self.store, key, substream)?;
        if current_kg < floor_kg {
            let shortfall = floor_kg - current_kg;
            self.store.set_substream_kg(key, substream, floor_kg)?;
            if let Some(target) = displacing {
                displacement::displace(self.store, key, target, -shortfall)?;
            }
        }
        recalc::propagate_from_population(self.store, key)
    }

    /// `replace P of stream with "S2"` (spec §4.6). Moves a portion of
    /// `stream`'s current value unconditionally into `target_substance`'s
    /// domestic stream — unlike `cap`/`floor`, `replace` always moves
    /// something (when `P` is nonzero), independent of any threshold.
    fn exec_replace(
        &mut self,
        key: &UseKey,
        amount: &ValueExpr,
        stream: StreamName,
        target_substance: &str,
        variables: &HashMap<String, Quantity>,
        rng: &mut impl Rng,
    ) -> SimResult<()> {
        let amount_q = sampling::resolve(amount, variables, rng, Some((&*self.store, key)))?;
        let substream = cap_floor_substream(stream)?;
        let current_kg = substream_kg(self.store, key, substream)?;
        let moved_kg = if amount_q.units.is_percent() {
            current_kg * amount_q.value
        } else {
            to_kg(self.store, key, &amount_q)?
        };
        let moved_kg = moved_kg.min(current_kg);
        self.store.set_substream_kg(key, substream, current_kg - moved_kg)?;
        let target = DisplacementTarget::Substance(target_substance.to_string());
        displacement::displace(self.store, key, &target, moved_kg)?;
        recalc::propagate_from_population(self.store, key)
    }

    /// `get stream [of S] [as U]` as a bare statement (spec §4.6 "get"). It
    /// has no binding to write its result into — that's what `define name as
    /// get ...` is for — so the read surfaces only as a trace event. Shares
    /// the conversion path `ValueExpr::Get` uses so a bare `get` and a
    /// `define`-composed one agree on what a read means.
    fn exec_get(
        &mut self,
        key: &UseKey,
        stream: StreamName,
        of_substance: Option<&str>,
        as_units: Option<Units>,
        rng: &mut impl Rng,
    ) -> SimResult<()> {
        let expr = ValueExpr::Get {
            stream,
            of_substance: of_substance.map(str::to_string),
            as_units,
            temporal: Temporal::Current,
        };
        let q = sampling::resolve(&expr, &HashMap::new(), rng, Some((&*self.store, key)))?;
        tracing::debug!(scope = %key, %stream, value = %q.value, units = %q.units, "get");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::quantity::Units;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rust_decimal_macros::dec;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(1)
    }

    #[test]
    fn set_domestic_enables_and_runs_population_then_consumption() {
        let key = UseKey::new("test", "sub");
        let mut store = StreamStore::new();
        store.ensure(&key);
        {
            let state = store.get_mut(&key).unwrap();
            state
                .parameterization
                .initial_charge
                .insert(Substream::Domestic, Quantity::new(dec!(1), Units::kg_per_unit()));
        }
        let mut variables = HashMap::new();
        let mut rng = rng();
        let cmd = Command::Set {
            stream: StreamName::Domestic,
            value: ValueExpr::Literal(Quantity::new(dec!(1000), Units::KG)),
            year: YearMatcher::any(),
        };
        let mut interp = Interpreter::new(&mut store);
        interp.execute(&key, &cmd, 2030, &mut variables, &mut rng).unwrap();
        let state = store.get(&key).unwrap();
        assert_eq!(state.streams.domestic.value, dec!(1000));
        assert_eq!(state.streams.new_equipment.value, dec!(1000));
    }

    #[test]
    fn setting_sales_directly_is_rejected() {
        let key = UseKey::new("test", "sub");
        let mut store = StreamStore::new();
        store.ensure(&key);
        let mut variables = HashMap::new();
        let mut rng = rng();
        let cmd = Command::Set {
            stream: StreamName::Sales,
            value: ValueExpr::Literal(Quantity::new(dec!(1), Units::KG)),
            year: YearMatcher::any(),
        };
        let mut interp = Interpreter::new(&mut store);
        assert!(interp.execute(&key, &cmd, 2030, &mut variables, &mut rng).is_err());
    }

    #[test]
    fn command_outside_its_year_matcher_is_a_no_op() {
        let key = UseKey::new("test", "sub");
        let mut store = StreamStore::new();
        store.ensure(&key);
        store.enable(&key, StreamName::Domestic).unwrap();
        let mut variables = HashMap::new();
        let mut rng = rng();
        let cmd = Command::Set {
            stream: StreamName::Domestic,
            value: ValueExpr::Literal(Quantity::new(dec!(1000), Units::KG)),
            year: YearMatcher::exact(2050),
        };
        let mut interp = Interpreter::new(&mut store);
        interp.execute(&key, &cmd, 2030, &mut variables, &mut rng).unwrap();
        assert_eq!(store.get(&key).unwrap().streams.domestic.value, Decimal::ZERO);
    }

    #[test]
    fn retire_with_replacement_leaves_population_unchanged() {
        let key = UseKey::new("test", "sub");
        let mut store = StreamStore::new();
        store.ensure(&key);
        store.enable(&key, StreamName::Domestic).unwrap();
        {
            let state = store.get_mut(&key).unwrap();
            state.streams.prior_equipment = Quantity::new(dec!(1000), Units::UNIT);
            state
                .parameterization
                .initial_charge
                .insert(Substream::Domestic, Quantity::new(dec!(1), Units::kg_per_unit()));
        }
        let mut variables = HashMap::new();
        let mut rng = rng();
        let cmd = Command::Retire {
            amount: ValueExpr::Literal(Quantity::new(dec!(0.1), Units::PERCENT)),
            with_replacement: true,
            year: YearMatcher::any(),
        };
        let mut interp = Interpreter::new(&mut store);
        interp.execute(&key, &cmd, 2030, &mut variables, &mut rng).unwrap();
        let state = store.get(&key).unwrap();
        assert_eq!(state.streams.retired.value, dec!(100));
        assert_eq!(state.streams.equipment.value, dec!(1000));
    }

    #[test]
    fn cap_reduces_domestic_and_displaces_into_another_substance() {
        let a = UseKey::new("test", "sub_a");
        let b = UseKey::new("test", "sub_b");
        let mut store = StreamStore::new();
        store.ensure(&a);
        store.ensure(&b);
        store.enable(&a, StreamName::Domestic).unwrap();
        store.enable(&b, StreamName::Domestic).unwrap();
        {
            let state = store.get_mut(&a).unwrap();
            state.streams.domestic = Quantity::new(dec!(1000), Units::KG);
            state
                .parameterization
                .initial_charge
                .insert(Substream::Domestic, Quantity::new(dec!(1), Units::kg_per_unit()));
        }
        {
            let state = store.get_mut(&b).unwrap();
            state
                .parameterization
                .initial_charge
                .insert(Substream::Domestic, Quantity::new(dec!(1), Units::kg_per_unit()));
        }
        let mut variables = HashMap::new();
        let mut rng = rng();
        let cmd = Command::Cap {
            stream: StreamName::Domestic,
            value: ValueExpr::Literal(Quantity::new(dec!(600), Units::KG)),
            displacing: Some(DisplacementTarget::Substance("sub_b".into())),
            year: YearMatcher::any(),
        };
        let mut interp = Interpreter::new(&mut store);
        interp.execute(&a, &cmd, 2030, &mut variables, &mut rng).unwrap();
        assert_eq!(store.get(&a).unwrap().streams.domestic.value, dec!(600));
        assert_eq!(store.get(&b).unwrap().streams.domestic.value, dec!(400));
    }

    #[test]
    fn recover_with_displacement_is_unsupported() {
        let key = UseKey::new("test", "sub");
        let mut store = StreamStore::new();
        store.ensure(&key);
        let mut variables = HashMap::new();
        let mut rng = rng();
        let cmd = Command::Recover {
            amount: ValueExpr::Literal(Quantity::new(dec!(0.3), Units::PERCENT)),
            stage: Stage::Eol,
            yield_rate: ValueExpr::Literal(Quantity::new(dec!(0.9), Units::PERCENT)),
            induction: None,
            displacing: Some(DisplacementTarget::Substance("sub_b".into())),
            year: YearMatcher::any(),
        };
        let mut interp = Interpreter::new(&mut store);
        assert!(interp.execute(&key, &cmd, 2030, &mut variables, &mut rng).is_err());
    }

    #[test]
    fn define_binds_a_variable_without_touching_the_store() {
        let key = UseKey::new("test", "sub");
        let mut store = StreamStore::new();
        store.ensure(&key);
        let mut variables = HashMap::new();
        let mut rng = rng();
        let cmd = Command::Define {
            name: "x".to_string(),
            value: ValueExpr::Literal(Quantity::new(dec!(42), Units::KG)),
        };
        let mut interp = Interpreter::new(&mut store);
        interp.execute(&key, &cmd, 2030, &mut variables, &mut rng).unwrap();
        assert_eq!(variables.get("x").unwrap().value, dec!(42));
    }

    #[test]
    fn define_as_get_captures_a_stream_into_a_variable() {
        let key = UseKey::new("test", "sub");
        let mut store = StreamStore::new();
        store.ensure(&key);
        store.get_mut(&key).unwrap().streams.domestic = Quantity::new(dec!(500), Units::KG);
        let mut variables = HashMap::new();
        let mut rng = rng();
        let cmd = Command::Define {
            name: "prior_domestic".to_string(),
            value: ValueExpr::Get {
                stream: StreamName::Domestic,
                of_substance: None,
                as_units: None,
                temporal: crate::quantity::context::Temporal::Current,
            },
        };
        let mut interp = Interpreter::new(&mut store);
        interp.execute(&key, &cmd, 2030, &mut variables, &mut rng).unwrap();
        assert_eq!(variables.get("prior_domestic").unwrap().value, dec!(500));
    }

    #[test]
    fn bare_get_is_a_side_effect_free_read() {
        let key = UseKey::new("test", "sub");
        let mut store = StreamStore::new();
        store.ensure(&key);
        store.get_mut(&key).unwrap().streams.domestic = Quantity::new(dec!(10), Units::KG);
        let mut variables = HashMap::new();
        let mut rng = rng();
        let cmd = Command::Get { stream: StreamName::Domestic, of_substance: None, as_units: None };
        let mut interp = Interpreter::new(&mut store);
        interp.execute(&key, &cmd, 2030, &mut variables, &mut rng).unwrap();
        assert_eq!(store.get(&key).unwrap().streams.domestic.value, dec!(10));
    }
}
