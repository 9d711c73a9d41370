//! The stream store: owns per-use-key stream values and parameterizations,
//! and enforces the write semantics of spec §4.2.

use super::cumulative_base::CumulativeBase;
use super::parameterization::Parameterization;
use super::streams::Streams;
use super::{CarryOverMode, StreamName, Substream, UseKey};
use crate::error::{ConfigError, InternalError, ScopeError, SimError, SimResult};
use crate::quantity::context::{ContextChannel, ContextSource, Temporal};
use crate::quantity::{Quantity, Units};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// All state owned for one use-key: current streams, the prior-year
/// snapshot, parameterization, and this step's cumulative bases.
#[derive(Debug, Clone)]
pub struct SubstanceState {
    pub streams: Streams,
    pub prior_streams: Streams,
    pub parameterization: Parameterization,
    pub cumulative_base: CumulativeBase,
}

impl Default for SubstanceState {
    fn default() -> Self {
        Self {
            streams: Streams::default(),
            prior_streams: Streams::default(),
            parameterization: Parameterization::default(),
            cumulative_base: CumulativeBase::new(
                Quantity::zero(Units::UNIT),
                Quantity::zero(Units::KG),
            ),
        }
    }
}

/// Whether a substream write already has recycling subtracted out, or is a
/// gross figure the store must subtract recycling from (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Gross,
    NetOfRecycle,
}

#[derive(Debug, Default)]
pub struct StreamStore {
    states: HashMap<UseKey, SubstanceState>,
}

impl StreamStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates zeroed state on first reference (spec §3 Lifecycle).
    pub fn ensure(&mut self, key: &UseKey) {
        self.states.entry(key.clone()).or_default();
    }

    pub fn get(&self, key: &UseKey) -> SimResult<&SubstanceState> {
        self.states.get(key).ok_or_else(|| {
            ScopeError::UnknownSubstance {
                application: key.application.clone(),
                substance: key.substance.clone(),
            }
            .into()
        })
    }

    pub fn get_mut(&mut self, key: &UseKey) -> SimResult<&mut SubstanceState> {
        self.states.get_mut(key).ok_or_else(|| {
            ScopeError::UnknownSubstance {
                application: key.application.clone(),
                substance: key.substance.clone(),
            }
            .into()
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &UseKey> {
        self.states.keys()
    }

    // ============================================================
    // Enablement
    // ============================================================

    pub fn enable(&mut self, key: &UseKey, stream: StreamName) -> SimResult<()> {
        self.get_mut(key)?.parameterization.mark_enabled(stream);
        Ok(())
    }

    pub fn is_enabled(&self, key: &UseKey, stream: StreamName) -> SimResult<bool> {
        Ok(self.get(key)?.parameterization.is_enabled(stream))
    }

    fn substream_name(substream: Substream) -> StreamName {
        match substream {
            Substream::Domestic => StreamName::Domestic,
            Substream::Import => StreamName::Import,
            Substream::Export => StreamName::Export,
        }
    }

    // ============================================================
    // Distribution (spec §4.2)
    // ============================================================

    /// `(pct_domestic, pct_import, pct_export)` computed from current
    /// enabled-substream values. If all enabled streams are zero, splits
    /// evenly across enabled streams; disabled streams always get zero.
    pub fn distribution(&self, key: &UseKey) -> SimResult<(Decimal, Decimal, Decimal)> {
        let state = self.get(key)?;
        let p = &state.parameterization;
        let enabled = [
            (Substream::Domestic, p.is_enabled(StreamName::Domestic), state.streams.domestic.value),
            (Substream::Import, p.is_enabled(StreamName::Import), state.streams.import.value),
            (Substream::Export, p.is_enabled(StreamName::Export), state.streams.export.value),
        ];
        let total: Decimal = enabled
            .iter()
            .filter(|(_, en, _)| *en)
            .map(|(_, _, v)| *v)
            .sum();
        let enabled_count = enabled.iter().filter(|(_, en, _)| *en).count();
        if enabled_count == 0 {
            return Ok((Decimal::ZERO, Decimal::ZERO, Decimal::ZERO));
        }
        if total.is_zero() {
            let share = Decimal::ONE / Decimal::from(enabled_count as u64);
            let pick = |en: bool| if en { share } else { Decimal::ZERO };
            return Ok((pick(enabled[0].1), pick(enabled[1].1), pick(enabled[2].1)));
        }
        let pick = |en: bool, v: Decimal| if en { v / total } else { Decimal::ZERO };
        Ok((
            pick(enabled[0].1, enabled[0].2),
            pick(enabled[1].1, enabled[1].2),
            pick(enabled[2].1, enabled[2].2),
        ))
    }

    /// Domestic and import shares only (sales distribution, spec §4.3 step
    /// 10), re-normalized over just those two substreams.
    pub fn sales_distribution(&self, key: &UseKey) -> SimResult<(Decimal, Decimal)> {
        let (d, i, _e) = self.distribution(key)?;
        let total = d + i;
        if total.is_zero() {
            let state = self.get(key)?;
            let p = &state.parameterization;
            let d_en = p.is_enabled(StreamName::Domestic);
            let i_en = p.is_enabled(StreamName::Import);
            let count = [d_en, i_en].iter().filter(|x| **x).count();
            if count == 0 {
                return Ok((Decimal::ZERO, Decimal::ZERO));
            }
            let share = Decimal::ONE / Decimal::from(count as u64);
            return Ok((
                if d_en { share } else { Decimal::ZERO },
                if i_en { share } else { Decimal::ZERO },
            ));
        }
        Ok((d / total, i / total))
    }

    // ============================================================
    // Substream writes (domestic / import / export)
    // ============================================================

    /// Writes a value to a sales substream (domestic or import) or export,
    /// per spec §4.2. `value` may be in `kg`/`mt` (mass) or `units`
    /// (population-intent); units-intent sets `unit_based_sales` so later
    /// recalculation preserves implicit-recharge semantics.
    pub fn write_substream(
        &mut self,
        key: &UseKey,
        substream: Substream,
        value: &Quantity,
        mode: WriteMode,
    ) -> SimResult<()> {
        let stream_name = Self::substream_name(substream);
        let is_unit_spec = value.units.is_base(crate::quantity::BaseUnit::Unit);

        let kg_value = if is_unit_spec {
            let charge = self.get(key)?.parameterization.initial_charge_for(substream);
            if charge.value.is_zero() {
                return Err(ConfigError::ZeroInitialCharge {
                    stream: stream_name.to_string(),
                    scope: key.to_string(),
                }
                .into());
            }
            value.value * charge.value
        } else if value.units.is_base(crate::quantity::BaseUnit::Mt) {
            value.value * Decimal::from(1000)
        } else {
            value.value
        };

        let state = self.get_mut(key)?;
        if kg_value.is_zero() && !state.parameterization.is_enabled(stream_name) {
            // Writes of zero to a disabled stream are enablement no-ops.
        } else if !kg_value.is_zero() && !state.parameterization.is_enabled(stream_name) {
            return Err(ConfigError::DisabledStream {
                stream: stream_name.to_string(),
                scope: key.to_string(),
            }
            .into());
        }
        if !kg_value.is_zero() {
            state.parameterization.mark_enabled(stream_name);
        }

        let net_kg = match mode {
            WriteMode::NetOfRecycle => kg_value,
            WriteMode::Gross => {
                let share = self.recycle_share_for(key, substream)?;
                (kg_value - share).max(Decimal::ZERO)
            }
        };

        let state = self.get_mut(key)?;
        let mut q = Quantity::new(net_kg, Units::KG);
        if q.clamp_non_negative() {
            tracing::warn!(scope = %key, stream = %stream_name, "clamped negative computed volume to zero");
        }
        match substream {
            Substream::Domestic => state.streams.domestic = q,
            Substream::Import => state.streams.import = q,
            Substream::Export => state.streams.export = q,
        }
        if is_unit_spec {
            state.parameterization.unit_based_sales = true;
        }
        state
            .parameterization
            .last_specified_value
            .insert(stream_name, value.clone());
        Ok(())
    }

    /// Sets a substream directly to an already-fully-computed kg value,
    /// bypassing the enablement/`ConfigError` checks of [`Self::write_substream`].
    /// Used by recalc strategies, which derive values from state rather than
    /// accepting a user command (spec §4.3 step 11, §4.4).
    pub fn set_substream_kg(&mut self, key: &UseKey, substream: Substream, kg: Decimal) -> SimResult<()> {
        let state = self.get_mut(key)?;
        let mut q = Quantity::new(kg, Units::KG);
        let stream_name = Self::substream_name(substream);
        if q.clamp_non_negative() {
            tracing::warn!(scope = %key, stream = %stream_name, "clamped negative recalculated volume to zero");
        }
        match substream {
            Substream::Domestic => state.streams.domestic = q,
            Substream::Import => state.streams.import = q,
            Substream::Export => state.streams.export = q,
        }
        Ok(())
    }

    /// The current substream's proportional share of total recycled
    /// material, used when subtracting recycling from a gross write.
    fn recycle_share_for(&self, key: &UseKey, substream: Substream) -> SimResult<Decimal> {
        let (d, i, e) = self.distribution(key)?;
        let state = self.get(key)?;
        let recycle = state.streams.recycle().value;
        let share = match substream {
            Substream::Domestic => d,
            Substream::Import => i,
            Substream::Export => e,
        };
        Ok(recycle * share)
    }

    // ============================================================
    // Recycle write (spec §4.2, §9 dead-code consolidation)
    // ============================================================

    /// Splits a total recycle quantity between the EOL and recharge
    /// substreams proportionally to their current values (50/50 if both
    /// are zero). Per spec §9, the recycle stream is always set directly on
    /// its substreams — there is no separate gross-aggregate entry point.
    pub fn write_recycle_total(&mut self, key: &UseKey, total_kg: Decimal) -> SimResult<()> {
        let state = self.get_mut(key)?;
        let eol = state.streams.recycle_eol.value;
        let recharge = state.streams.recycle_recharge.value;
        let sum = eol + recharge;
        let (eol_share, recharge_share) = if sum.is_zero() {
            (Decimal::ONE / Decimal::TWO, Decimal::ONE / Decimal::TWO)
        } else {
            (eol / sum, recharge / sum)
        };
        state.streams.recycle_eol = Quantity::new(total_kg * eol_share, Units::KG);
        state.streams.recycle_recharge = Quantity::new(total_kg * recharge_share, Units::KG);
        Ok(())
    }

    /// Commits the population recalc's outputs (spec §4.4).
    pub fn set_population(
        &mut self,
        key: &UseKey,
        new_equipment: Quantity,
        retired: Quantity,
        equipment: Quantity,
        age: Quantity,
    ) -> SimResult<()> {
        let state = self.get_mut(key)?;
        let mut equipment = equipment;
        if equipment.clamp_non_negative() {
            tracing::warn!(scope = %key, "clamped negative computed population to zero");
        }
        state.streams.new_equipment = new_equipment;
        state.streams.retired = retired;
        state.streams.equipment = equipment;
        state.streams.age = age;
        Ok(())
    }

    /// Commits the consumption recalc's outputs (spec §4.4).
    #[allow(clippy::too_many_arguments)]
    pub fn set_consumption(
        &mut self,
        key: &UseKey,
        domestic_consumption: Quantity,
        import_consumption: Quantity,
        export_consumption: Quantity,
        recycle_consumption: Quantity,
        recharge_emissions: Quantity,
        eol_emissions: Quantity,
        initial_charge_emissions: Quantity,
        energy_consumption: Quantity,
    ) -> SimResult<()> {
        let state = self.get_mut(key)?;
        state.streams.domestic_consumption = domestic_consumption;
        state.streams.import_consumption = import_consumption;
        state.streams.export_consumption = export_consumption;
        state.streams.recycle_consumption = recycle_consumption;
        state.streams.recharge_emissions = recharge_emissions;
        state.streams.eol_emissions = eol_emissions;
        state.streams.initial_charge_emissions = initial_charge_emissions;
        state.streams.energy_consumption = energy_consumption;
        Ok(())
    }

    /// Commits one stage's recalculated recycle/induction volumes (spec
    /// §4.4 "Recycling recalc"), independent of the other stage.
    pub fn commit_eol_recycling(&mut self, key: &UseKey, recycle_kg: Decimal, induction_kg: Decimal) -> SimResult<()> {
        let state = self.get_mut(key)?;
        state.streams.recycle_eol = Quantity::new(recycle_kg, Units::KG);
        state.streams.induction_eol = Quantity::new(induction_kg, Units::KG);
        Ok(())
    }

    pub fn commit_recharge_recycling(
        &mut self,
        key: &UseKey,
        recycle_kg: Decimal,
        induction_kg: Decimal,
    ) -> SimResult<()> {
        let state = self.get_mut(key)?;
        state.streams.recycle_recharge = Quantity::new(recycle_kg, Units::KG);
        state.streams.induction_recharge = Quantity::new(induction_kg, Units::KG);
        Ok(())
    }

    // ============================================================
    // Year lifecycle (spec §3 Lifecycle, §4.5)
    // ============================================================

    /// Snapshots current streams into the prior-year slot.
    pub fn snapshot_prior(&mut self, key: &UseKey) -> SimResult<()> {
        let state = self.get_mut(key)?;
        state.prior_streams = state.streams.clone();
        Ok(())
    }

    /// Ages equipment across the year boundary: `priorEquipment[y+1] =
    /// equipment[y]`, `priorRetired[y+1] = retired[y]`, and age becomes the
    /// population-weighted mean (spec §3 invariants).
    pub fn roll_equipment(&mut self, key: &UseKey) -> SimResult<()> {
        let state = self.get_mut(key)?;
        let new_population = state.streams.new_equipment.clone();
        let prior_age = state.streams.age.clone();
        let prior_population = state.streams.prior_equipment.clone();
        state.streams.age = Streams::weighted_age(&prior_age, &prior_population, &new_population);
        state.streams.prior_equipment = state.streams.equipment.clone();
        state.streams.prior_retired = state.streams.retired.clone();
        Ok(())
    }

    /// Resets recycling/induction substreams to zero. Called after
    /// redistribution at year roll-over (spec §4.8 step 3d).
    pub fn reset_recycling_and_induction(&mut self, key: &UseKey) -> SimResult<()> {
        let state = self.get_mut(key)?;
        state.streams.recycle_eol = Quantity::zero(Units::KG);
        state.streams.recycle_recharge = Quantity::zero(Units::KG);
        state.streams.induction_eol = Quantity::zero(Units::KG);
        state.streams.induction_recharge = Quantity::zero(Units::KG);
        Ok(())
    }

    /// Resets per-step cumulative bases and the implicit-recharge
    /// accumulator (spec §4.5).
    pub fn reset_step(&mut self, key: &UseKey) -> SimResult<()> {
        let state = self.get_mut(key)?;
        state.cumulative_base.reset_for_new_step();
        state.streams.implicit_recharge = Quantity::zero(Units::KG);
        state.parameterization.unit_based_sales = false;
        Ok(())
    }

    pub fn carry_over_for(&self, key: &UseKey, stream: StreamName) -> SimResult<CarryOverMode> {
        Ok(self.get(key)?.parameterization.carry_over_for(stream))
    }

    // ============================================================
    // Bank (derived, spec §3)
    // ============================================================

    pub fn bank(&self, key: &UseKey) -> SimResult<Quantity> {
        let state = self.get(key)?;
        let charge = self.effective_initial_charge(key)?;
        Ok(state.streams.bank(&charge))
    }

    /// The initial charge used for bank reporting: domestic's if domestic
    /// is enabled, else import's, else export's (spec §3 leaves "effective"
    /// unspecified beyond "initial charge"; this engine resolves it to
    /// whichever sales substream currently carries the equipment stock).
    pub fn effective_initial_charge(&self, key: &UseKey) -> SimResult<Quantity> {
        let state = self.get(key)?;
        let p = &state.parameterization;
        if p.is_enabled(StreamName::Domestic) {
            Ok(p.initial_charge_for(Substream::Domestic))
        } else if p.is_enabled(StreamName::Import) {
            Ok(p.initial_charge_for(Substream::Import))
        } else {
            Ok(p.initial_charge_for(Substream::Export))
        }
    }

    // ============================================================
    // Stream read (spec §4.6 "get")
    // ============================================================

    /// Reads one named stream's current value, computing derived streams
    /// (`sales`, `recycle`, `induction`, `consumption`, `bank`) the same way
    /// the recalc strategies do (spec §3 "Derived streams").
    pub fn read_stream(&self, key: &UseKey, stream: StreamName) -> SimResult<Quantity> {
        if stream == StreamName::Bank {
            return self.bank(key);
        }
        let streams = &self.get(key)?.streams;
        Ok(Self::read_from(streams, stream))
    }

    /// Reads `stream` as it stood at the close of the previous year (spec
    /// §8 "Year snapshot": `get X during prior year`).
    pub fn read_prior_stream(&self, key: &UseKey, stream: StreamName) -> SimResult<Quantity> {
        if stream == StreamName::Bank {
            let charge = self.effective_initial_charge(key)?;
            return Ok(self.get(key)?.prior_streams.bank(&charge));
        }
        let streams = &self.get(key)?.prior_streams;
        Ok(Self::read_from(streams, stream))
    }

    fn read_from(streams: &Streams, stream: StreamName) -> Quantity {
        match stream {
            StreamName::Domestic => streams.domestic.clone(),
            StreamName::Import => streams.import.clone(),
            StreamName::Export => streams.export.clone(),
            StreamName::Sales => streams.sales(),
            StreamName::Recycle => streams.recycle(),
            StreamName::RecycleRecharge => streams.recycle_recharge.clone(),
            StreamName::RecycleEol => streams.recycle_eol.clone(),
            StreamName::Induction => streams.induction(),
            StreamName::InductionRecharge => streams.induction_recharge.clone(),
            StreamName::InductionEol => streams.induction_eol.clone(),
            StreamName::Consumption => streams.consumption(),
            StreamName::Equipment => streams.equipment.clone(),
            StreamName::PriorEquipment => streams.prior_equipment.clone(),
            StreamName::NewEquipment => streams.new_equipment.clone(),
            StreamName::Retired => streams.retired.clone(),
            StreamName::PriorRetired => streams.prior_retired.clone(),
            StreamName::RechargeEmissions => streams.recharge_emissions.clone(),
            StreamName::EolEmissions => streams.eol_emissions.clone(),
            StreamName::ImplicitRecharge => streams.implicit_recharge.clone(),
            StreamName::Age => streams.age.clone(),
            StreamName::EnergyConsumption => streams.energy_consumption.clone(),
            StreamName::Bank => unreachable!("handled by the caller before reaching read_from"),
        }
    }

    // ============================================================
    // Context snapshot (feeds quantity::convert)
    // ============================================================

    /// Builds an owned context map covering every channel for both the
    /// current and the prior year, so a recalc strategy can drive
    /// [`crate::quantity::convert::convert`] without holding a borrow of the
    /// store across the whole computation.
    pub fn context_snapshot(
        &self,
        key: &UseKey,
    ) -> SimResult<HashMap<(ContextChannel, Temporal), Decimal>> {
        let state = self.get(key)?;
        let ctx = SubstanceContext { state };
        let channels = [
            ContextChannel::SubstanceConsumption,
            ContextChannel::EnergyIntensity,
            ContextChannel::AmortizedUnitVolume,
            ContextChannel::Population,
            ContextChannel::YearsElapsed,
            ContextChannel::GhgConsumption,
            ContextChannel::EnergyConsumption,
            ContextChannel::Volume,
            ContextChannel::PopulationChange,
        ];
        let mut map = HashMap::new();
        for channel in channels {
            for when in [Temporal::Current, Temporal::Prior] {
                if let Some(v) = ctx.get_context(channel, when) {
                    map.insert((channel, when), v);
                }
            }
        }
        Ok(map)
    }

    // ============================================================
    // NaN guard (spec §7 "Silent handling" / InternalError::Nan)
    // ============================================================

    /// `Decimal` has no NaN representation, so this guard exists for the
    /// boundary where a host embeds a float-sourced `Quantity` (e.g. from a
    /// JSON payload originally produced by floating point computation).
    pub fn guard_finite(value: Decimal, what: &str) -> SimResult<Decimal> {
        if value.is_sign_positive() || value.is_sign_negative() || value.is_zero() {
            Ok(value)
        } else {
            Err(InternalError::Nan(what.to_string()).into())
        }
    }
}

/// Adapts a use-key's current state into a [`ContextSource`] for unit
/// conversion (spec §4.1's context channels).
pub struct SubstanceContext<'a> {
    pub state: &'a SubstanceState,
}

impl<'a> ContextSource for SubstanceContext<'a> {
    fn get_context(&self, channel: ContextChannel, when: Temporal) -> Option<Decimal> {
        let streams = match when {
            Temporal::Current => &self.state.streams,
            Temporal::Prior => &self.state.prior_streams,
        };
        match channel {
            ContextChannel::SubstanceConsumption => Some(self.state.parameterization.ghg_intensity.value),
            ContextChannel::EnergyIntensity => Some(self.state.parameterization.energy_intensity.value),
            ContextChannel::AmortizedUnitVolume => {
                Some(self.state.parameterization.initial_charge_for(Substream::Domestic).value)
            }
            ContextChannel::Population => Some(streams.equipment.value),
            ContextChannel::YearsElapsed => Some(Decimal::ONE),
            ContextChannel::GhgConsumption => Some(streams.consumption().value),
            ContextChannel::EnergyConsumption => Some(streams.energy_consumption.value),
            ContextChannel::Volume => Some(streams.sales().value),
            ContextChannel::PopulationChange => {
                Some((streams.equipment.value - streams.prior_equipment.value).max(Decimal::ZERO))
            }
        }
    }
}

fn _assert_send_sync()
where
    StreamStore: Send + Sync,
{
}

#[cfg(test)]
mod test {
    use super::*;
    use rust_decimal_macros::dec;

    fn key() -> UseKey {
        UseKey::new("test", "test")
    }

    #[test]
    fn write_fails_when_disabled() {
        let mut store = StreamStore::new();
        store.ensure(&key());
        let q = Quantity::new(dec!(100), Units::KG);
        let err = store.write_substream(&key(), Substream::Domestic, &q, WriteMode::NetOfRecycle);
        assert!(err.is_err());
    }

    #[test]
    fn enable_then_write_succeeds() {
        let mut store = StreamStore::new();
        store.ensure(&key());
        store.enable(&key(), StreamName::Domestic).unwrap();
        let q = Quantity::new(dec!(100), Units::KG);
        store
            .write_substream(&key(), Substream::Domestic, &q, WriteMode::NetOfRecycle)
            .unwrap();
        assert_eq!(store.get(&key()).unwrap().streams.domestic.value, dec!(100));
    }

    #[test]
    fn zero_initial_charge_on_unit_spec_is_config_error() {
        let mut store = StreamStore::new();
        store.ensure(&key());
        store.enable(&key(), StreamName::Domestic).unwrap();
        let q = Quantity::new(dec!(10), Units::UNIT);
        let err = store.write_substream(&key(), Substream::Domestic, &q, WriteMode::NetOfRecycle);
        assert!(matches!(err, Err(SimError::Config(ConfigError::ZeroInitialCharge { .. }))));
    }

    #[test]
    fn recycle_total_splits_evenly_when_both_substreams_zero() {
        let mut store = StreamStore::new();
        store.ensure(&key());
        store.write_recycle_total(&key(), dec!(100)).unwrap();
        let state = store.get(&key()).unwrap();
        assert_eq!(state.streams.recycle_eol.value, dec!(50));
        assert_eq!(state.streams.recycle_recharge.value, dec!(50));
    }

    #[test]
    fn distribution_splits_evenly_across_enabled_streams_when_all_zero() {
        let mut store = StreamStore::new();
        store.ensure(&key());
        store.enable(&key(), StreamName::Domestic).unwrap();
        store.enable(&key(), StreamName::Import).unwrap();
        let (d, i, e) = store.distribution(&key()).unwrap();
        assert_eq!(d, dec!(0.5));
        assert_eq!(i, dec!(0.5));
        assert_eq!(e, Decimal::ZERO);
    }
}
