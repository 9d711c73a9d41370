//! Per-use-key parameterization (spec §3 "Parameterization").

use super::{CarryOverMode, Stage, StreamName, Substream};
use crate::quantity::{Quantity, Units};
use crate::sorted_vec_map::SortedVecMap;
use serde::{Deserialize, Serialize};

/// A rate accumulated across commands within a step, tracking whether it
/// was ever explicitly set (spec §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplicitRate {
    pub value: Quantity,
    pub explicit: bool,
}

impl ExplicitRate {
    pub fn default_zero(units: Units) -> Self {
        Self {
            value: Quantity::zero(units),
            explicit: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameterization {
    pub ghg_intensity: Quantity,
    pub energy_intensity: Quantity,
    pub initial_charge: SortedVecMap<Substream, Quantity>,
    pub recharge_population: Quantity,
    pub recharge_intensity: Quantity,
    pub retirement_rate: Quantity,
    pub recovery_rate: SortedVecMap<Stage, ExplicitRate>,
    pub yield_rate: SortedVecMap<Stage, ExplicitRate>,
    pub induction_rate: SortedVecMap<Stage, ExplicitRate>,
    pub last_specified_value: SortedVecMap<StreamName, Quantity>,
    pub stream_enabled: SortedVecMap<StreamName, bool>,
    pub carry_over: SortedVecMap<StreamName, CarryOverMode>,
    /// True once a `set`/`change` on sales specified a quantity in `units`
    /// rather than mass, triggering implicit-recharge semantics (spec §3,
    /// §4.3 step 9).
    pub unit_based_sales: bool,
}

impl Default for Parameterization {
    fn default() -> Self {
        Self {
            ghg_intensity: Quantity::zero(Units::tco2e_per_kg()),
            energy_intensity: Quantity::zero(Units::kwh_per_kg()),
            initial_charge: SortedVecMap::new(),
            recharge_population: Quantity::zero(Units::PERCENT),
            recharge_intensity: Quantity::zero(Units::kg_per_unit()),
            retirement_rate: Quantity::zero(Units::PERCENT),
            recovery_rate: SortedVecMap::new(),
            yield_rate: SortedVecMap::new(),
            induction_rate: SortedVecMap::new(),
            last_specified_value: SortedVecMap::new(),
            stream_enabled: SortedVecMap::new(),
            carry_over: SortedVecMap::new(),
            unit_based_sales: false,
        }
    }
}

impl Parameterization {
    pub fn is_enabled(&self, stream: StreamName) -> bool {
        self.stream_enabled.get(&stream).copied().unwrap_or(false)
    }

    pub fn mark_enabled(&mut self, stream: StreamName) {
        self.stream_enabled.insert(stream, true);
    }

    pub fn initial_charge_for(&self, substream: Substream) -> Quantity {
        self.initial_charge
            .get(&substream)
            .cloned()
            .unwrap_or_else(|| Quantity::zero(Units::kg_per_unit()))
    }

    /// The effective induction rate for a stage: explicitly-set ratio if
    /// present, else the default from spec §4.3 step 9 (0 for unit-based
    /// specs, 1 otherwise).
    pub fn effective_induction_rate(&self, stage: Stage) -> Quantity {
        if let Some(rate) = self.induction_rate.get(&stage) {
            if rate.explicit {
                return rate.value.clone();
            }
        }
        let default = if self.unit_based_sales { 0 } else { 1 };
        Quantity::new(rust_decimal::Decimal::from(default), Units::PERCENT)
    }

    pub fn recovery_rate_for(&self, stage: Stage) -> Quantity {
        self.recovery_rate
            .get(&stage)
            .map(|r| r.value.clone())
            .unwrap_or_else(|| Quantity::zero(Units::PERCENT))
    }

    pub fn yield_rate_for(&self, stage: Stage) -> Quantity {
        self.yield_rate
            .get(&stage)
            .map(|r| r.value.clone())
            .unwrap_or_else(|| Quantity::zero(Units::PERCENT))
    }

    pub fn carry_over_for(&self, stream: StreamName) -> CarryOverMode {
        self.carry_over.get(&stream).copied().unwrap_or_default()
    }

    /// Accumulate a recovery-rate command (spec §4.7: additive).
    pub fn accumulate_recovery_rate(&mut self, stage: Stage, delta: Quantity) {
        let entry = self
            .recovery_rate
            .entry(stage)
            .or_insert_with(|| ExplicitRate::default_zero(Units::PERCENT));
        entry.value = entry.value.clone() + delta;
        entry.explicit = true;
    }

    /// Accumulate a yield-rate command (spec §4.7: equal-weighted average).
    pub fn accumulate_yield_rate(&mut self, stage: Stage, new_value: Quantity, count: &mut u32) {
        let entry = self
            .yield_rate
            .entry(stage)
            .or_insert_with(|| ExplicitRate::default_zero(Units::PERCENT));
        let total_before = entry.value.value * rust_decimal::Decimal::from(*count);
        *count += 1;
        entry.value = Quantity::new(
            (total_before + new_value.value) / rust_decimal::Decimal::from(*count),
            Units::PERCENT,
        );
        entry.explicit = true;
    }

    /// Set the induction rate for a stage; last explicit setting wins
    /// (spec §4.7).
    pub fn set_induction_rate(&mut self, stage: Stage, value: Quantity) {
        self.induction_rate.insert(
            stage,
            ExplicitRate {
                value,
                explicit: true,
            },
        );
    }

    /// Accumulate a recharge-rate/intensity command: rate adds, intensity is
    /// a weighted average with weights = absolute rates (spec §4.7).
    pub fn accumulate_recharge(&mut self, rate_delta: Quantity, intensity: Quantity) {
        let old_rate = self.recharge_population.value;
        let new_rate = old_rate + rate_delta.value;
        if new_rate.is_zero() {
            self.recharge_intensity = intensity;
        } else {
            let weighted = self.recharge_intensity.value * old_rate + intensity.value * rate_delta.value;
            self.recharge_intensity = Quantity::new(weighted / new_rate, self.recharge_intensity.units.clone());
        }
        self.recharge_population = Quantity::new(new_rate, Units::PERCENT);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn effective_induction_rate_defaults_by_unit_intent() {
        let mut p = Parameterization::default();
        assert_eq!(p.effective_induction_rate(Stage::Eol).value, dec!(1));
        p.unit_based_sales = true;
        assert_eq!(p.effective_induction_rate(Stage::Eol).value, dec!(0));
    }

    #[test]
    fn explicit_induction_rate_overrides_default() {
        let mut p = Parameterization::default();
        p.set_induction_rate(Stage::Recharge, Quantity::new(dec!(0.5), Units::PERCENT));
        assert_eq!(p.effective_induction_rate(Stage::Recharge).value, dec!(0.5));
    }

    #[test]
    fn recovery_rate_accumulates_additively() {
        let mut p = Parameterization::default();
        p.accumulate_recovery_rate(Stage::Eol, Quantity::new(dec!(0.3), Units::PERCENT));
        p.accumulate_recovery_rate(Stage::Eol, Quantity::new(dec!(0.2), Units::PERCENT));
        assert_eq!(p.recovery_rate_for(Stage::Eol).value, dec!(0.5));
    }

    #[test]
    fn yield_rate_accumulates_as_equal_weighted_average() {
        let mut p = Parameterization::default();
        let mut count = 0u32;
        p.accumulate_yield_rate(Stage::Eol, Quantity::new(dec!(0.8), Units::PERCENT), &mut count);
        p.accumulate_yield_rate(Stage::Eol, Quantity::new(dec!(1.0), Units::PERCENT), &mut count);
        assert_eq!(p.yield_rate_for(Stage::Eol).value, dec!(0.9));
    }

    #[test]
    fn recharge_rate_adds_and_intensity_weights_by_absolute_rate() {
        let mut p = Parameterization::default();
        p.accumulate_recharge(
            Quantity::new(dec!(0.3), Units::PERCENT),
            Quantity::new(dec!(1.0), Units::kg_per_unit()),
        );
        p.accumulate_recharge(
            Quantity::new(dec!(0.1), Units::PERCENT),
            Quantity::new(dec!(2.0), Units::kg_per_unit()),
        );
        assert_eq!(p.recharge_population.value, dec!(0.4));
        // (1.0*0.3 + 2.0*0.1) / 0.4 = 1.25
        assert_eq!(p.recharge_intensity.value, dec!(1.25));
    }
}
