//! Cumulative bases for multi-command steps (spec §4.5).
//!
//! Within a single simulation step, several `retire`/`recharge`/`recover`
//! commands may execute. To keep their combined effect additive and
//! order-independent, the first such command in a step snapshots the
//! relevant prior-year population as a "base", and every subsequent command
//! in the same family adds to an "applied amount" computed against that
//! same base rather than against whatever the population is *now*.

use super::Stage;
use crate::quantity::Quantity;
use crate::sorted_vec_map::SortedVecMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CumulativeBase {
    pub retirement_base_population: Option<Quantity>,
    pub applied_retirement_amount: Quantity,
    pub recharge_base_population: Option<Quantity>,
    pub applied_recharge_amount: Quantity,
    pub has_replacement_this_step: bool,
    pub retire_calculated_this_step: bool,
    pub recycling_calculated_this_step: bool,

    /// Per-stage "has a recover command touched this rate yet this step"
    /// flags. The first touch resets the persistent rate to zero before
    /// accumulation begins, so repeated yearly re-execution of the same
    /// standing `recover` command doesn't accumulate without bound —
    /// only multiple commands *within the same step* accumulate (spec
    /// §4.5, §4.7).
    pub recovery_touched_this_step: SortedVecMap<Stage, bool>,
    pub yield_touched_this_step: SortedVecMap<Stage, bool>,
    pub yield_sample_count: SortedVecMap<Stage, u32>,

    /// Whether a `recharge` command has touched the standing rate/intensity
    /// this step. Like `recovery_touched_this_step`, the first touch resets
    /// `Parameterization::recharge_population`/`recharge_intensity` to zero
    /// before accumulating, so a standing multi-year `recharge` command
    /// doesn't accumulate without bound across years (spec §4.5, §4.7).
    pub recharge_rate_touched_this_step: bool,
}

impl CumulativeBase {
    pub fn new(zero_population: Quantity, zero_kg: Quantity) -> Self {
        Self {
            retirement_base_population: None,
            applied_retirement_amount: zero_population.clone(),
            recharge_base_population: None,
            applied_recharge_amount: zero_kg,
            has_replacement_this_step: false,
            retire_calculated_this_step: false,
            recycling_calculated_this_step: false,
            recovery_touched_this_step: SortedVecMap::new(),
            yield_touched_this_step: SortedVecMap::new(),
            yield_sample_count: SortedVecMap::new(),
            recharge_rate_touched_this_step: false,
        }
    }

    /// Returns `true` the first time it's called within a step.
    pub fn touch_recharge_rate(&mut self) -> bool {
        let first = !self.recharge_rate_touched_this_step;
        self.recharge_rate_touched_this_step = true;
        first
    }

    /// Returns `true` the first time it's called for `stage` within a step.
    pub fn touch_recovery(&mut self, stage: Stage) -> bool {
        let first = !self.recovery_touched_this_step.get(&stage).copied().unwrap_or(false);
        self.recovery_touched_this_step.insert(stage, true);
        first
    }

    /// Returns `true` the first time it's called for `stage` within a step.
    pub fn touch_yield(&mut self, stage: Stage) -> bool {
        let first = !self.yield_touched_this_step.get(&stage).copied().unwrap_or(false);
        self.yield_touched_this_step.insert(stage, true);
        if first {
            self.yield_sample_count.insert(stage, 0);
        }
        first
    }

    pub fn yield_sample_count_mut(&mut self, stage: Stage) -> &mut u32 {
        self.yield_sample_count.entry(stage).or_insert(0)
    }

    /// Resets all per-step flags and bases. Called at year roll-over
    /// (spec §4.5: "At year roll-over all per-step flags and cumulative
    /// bases reset").
    pub fn reset_for_new_step(&mut self) {
        self.retirement_base_population = None;
        self.applied_retirement_amount = Quantity::zero(self.applied_retirement_amount.units.clone());
        self.recharge_base_population = None;
        self.applied_recharge_amount = Quantity::zero(self.applied_recharge_amount.units.clone());
        self.has_replacement_this_step = false;
        self.retire_calculated_this_step = false;
        self.recycling_calculated_this_step = false;
        self.recovery_touched_this_step.clear();
        self.yield_touched_this_step.clear();
        self.yield_sample_count.clear();
        self.recharge_rate_touched_this_step = false;
    }

    pub fn capture_retirement_base(&mut self, prior_equipment: &Quantity) {
        if self.retirement_base_population.is_none() {
            self.retirement_base_population = Some(prior_equipment.clone());
            self.applied_retirement_amount = Quantity::zero(prior_equipment.units.clone());
        }
    }

    pub fn capture_recharge_base(&mut self, prior_equipment: &Quantity) {
        if self.recharge_base_population.is_none() {
            self.recharge_base_population = Some(prior_equipment.clone());
        }
    }

    /// A tolerance below which a manual `priorEquipment` edit is treated as
    /// a no-op rescale (spec §4.5).
    const RESCALE_TOLERANCE: &'static str = "0.0001";

    /// Rescales recharge base/applied amounts proportionally to a manual
    /// `priorEquipment` edit: `new_prior / old_base` (spec §4.5).
    pub fn rescale_recharge_on_manual_edit(&mut self, new_prior_equipment: &Quantity) {
        let Some(base) = self.recharge_base_population.clone() else {
            return;
        };
        let tolerance: rust_decimal::Decimal = Self::RESCALE_TOLERANCE.parse().unwrap();
        if (new_prior_equipment.value - base.value).abs() < tolerance {
            return;
        }
        if base.value.is_zero() {
            return;
        }
        let factor = new_prior_equipment.value / base.value;
        self.recharge_base_population = Some(new_prior_equipment.clone());
        self.applied_recharge_amount = self.applied_recharge_amount.scale(factor);
    }

    /// Rescales retirement base/applied amounts preserving the
    /// `applied/base` ratio (spec §4.5).
    pub fn rescale_retirement_on_manual_edit(&mut self, new_prior_equipment: &Quantity) {
        let Some(base) = self.retirement_base_population.clone() else {
            return;
        };
        let tolerance: rust_decimal::Decimal = Self::RESCALE_TOLERANCE.parse().unwrap();
        if (new_prior_equipment.value - base.value).abs() < tolerance {
            return;
        }
        if base.value.is_zero() {
            return;
        }
        let ratio = self.applied_retirement_amount.value / base.value;
        self.retirement_base_population = Some(new_prior_equipment.clone());
        self.applied_retirement_amount = Quantity::new(
            new_prior_equipment.value * ratio,
            self.applied_retirement_amount.units.clone(),
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::quantity::Units;
    use rust_decimal_macros::dec;

    fn base() -> CumulativeBase {
        CumulativeBase::new(Quantity::zero(Units::UNIT), Quantity::zero(Units::KG))
    }

    #[test]
    fn first_capture_wins_subsequent_captures_are_no_ops() {
        let mut cb = base();
        cb.capture_retirement_base(&Quantity::new(dec!(100), Units::UNIT));
        cb.capture_retirement_base(&Quantity::new(dec!(999), Units::UNIT));
        assert_eq!(
            cb.retirement_base_population.unwrap().value,
            dec!(100)
        );
    }

    #[test]
    fn reset_clears_bases_and_flags() {
        let mut cb = base();
        cb.capture_retirement_base(&Quantity::new(dec!(100), Units::UNIT));
        cb.retire_calculated_this_step = true;
        cb.reset_for_new_step();
        assert!(cb.retirement_base_population.is_none());
        assert!(!cb.retire_calculated_this_step);
    }

    #[test]
    fn rescale_recharge_base_scales_applied_amount_proportionally() {
        let mut cb = base();
        cb.capture_recharge_base(&Quantity::new(dec!(100), Units::UNIT));
        cb.applied_recharge_amount = Quantity::new(dec!(50), Units::KG);
        cb.rescale_recharge_on_manual_edit(&Quantity::new(dec!(200), Units::UNIT));
        assert_eq!(cb.recharge_base_population.unwrap().value, dec!(200));
        assert_eq!(cb.applied_recharge_amount.value, dec!(100));
    }

    #[test]
    fn rescale_within_tolerance_is_a_no_op() {
        let mut cb = base();
        cb.capture_recharge_base(&Quantity::new(dec!(100), Units::UNIT));
        cb.applied_recharge_amount = Quantity::new(dec!(50), Units::KG);
        cb.rescale_recharge_on_manual_edit(&Quantity::new(dec!(100.00001), Units::UNIT));
        assert_eq!(cb.applied_recharge_amount.value, dec!(50));
    }
}
