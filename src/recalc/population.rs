//! Population recalculation: derives `newEquipment`, `retired`, and
//! `equipment` from this step's sales output (spec §4.4).

use super::shared;
use crate::error::SimResult;
use crate::quantity::context::{ContextChannel, ContextFrame, ContextStack, Temporal};
use crate::quantity::convert::convert;
use crate::quantity::{Quantity, Units};
use crate::state::store::StreamStore;
use crate::state::streams::Streams;
use crate::state::UseKey;
use rust_decimal::Decimal;

pub fn recalc(store: &mut StreamStore, key: &UseKey) -> SimResult<()> {
    let ctx_map = store.context_snapshot(key)?;
    let state = store.get(key)?.clone();
    let initial_charge = store.effective_initial_charge(key)?;

    let recharge_vol = shared::recharge_volume_kg(
        &state.cumulative_base,
        &state.parameterization,
        &state.streams.prior_equipment,
        &ctx_map,
    )?;

    // "current sales (virgin + induction)" (spec §4.4): the freshly produced
    // domestic/import volume plus whatever recycled material was routed back
    // into demand this step, minus what recharge already consumed.
    let virgin_kg = state.streams.domestic.value + state.streams.import.value;
    let induction_kg = state.streams.induction().value;
    let mut available_for_growth_kg = virgin_kg + induction_kg - recharge_vol;
    if available_for_growth_kg.is_sign_negative() {
        available_for_growth_kg = Decimal::ZERO;
    }

    let growth = Quantity::new(available_for_growth_kg, Units::KG);
    let mut ctx = ContextStack::new(&ctx_map);
    let new_equipment_units = ctx.with_frame(
        ContextFrame::new().with(
            ContextChannel::AmortizedUnitVolume,
            Temporal::Current,
            initial_charge.value,
        ),
        |ctx| convert(&growth, &Units::UNIT, ctx, Temporal::Current),
    )?;

    // Retirement, per §4.5's cumulative base: the interpreter accumulates
    // `applied_retirement_amount` against the step's captured base as retire
    // commands execute; absent any retire command this step, fall back to
    // the standing rate applied directly against prior equipment.
    let retired_units = if state.cumulative_base.retirement_base_population.is_some() {
        state.cumulative_base.applied_retirement_amount.value
    } else {
        state.streams.prior_equipment.value * state.parameterization.retirement_rate.value
    };
    let retired = Quantity::new(retired_units, Units::UNIT);

    // "With replacement" retirement (spec §4.6 `retire ... with replacement`)
    // feeds the retired units straight back into demand for new equipment,
    // so the retirement has no net effect on population this step.
    let replacement_offset = if state.cumulative_base.has_replacement_this_step {
        retired.value
    } else {
        Decimal::ZERO
    };
    let equipment_value =
        state.streams.prior_equipment.value + new_equipment_units.value + replacement_offset - retired.value;
    let equipment = Quantity::new(equipment_value, Units::UNIT);

    let age = Streams::weighted_age(&state.streams.age, &state.streams.prior_equipment, &new_equipment_units);

    store.set_population(key, new_equipment_units, retired, equipment, age)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::quantity::Units;
    use crate::state::{Substream, StreamName};
    use rust_decimal_macros::dec;

    fn setup() -> (StreamStore, UseKey) {
        let key = UseKey::new("test", "test");
        let mut store = StreamStore::new();
        store.ensure(&key);
        store.enable(&key, StreamName::Domestic).unwrap();
        {
            let state = store.get_mut(&key).unwrap();
            state
                .parameterization
                .initial_charge
                .insert(Substream::Domestic, Quantity::new(dec!(2), Units::kg_per_unit()));
        }
        (store, key)
    }

    #[test]
    fn new_equipment_converts_virgin_kg_to_units() {
        let (mut store, key) = setup();
        {
            let state = store.get_mut(&key).unwrap();
            state.streams.domestic = Quantity::new(dec!(200), Units::KG);
        }
        recalc(&mut store, &key).unwrap();
        let state = store.get(&key).unwrap();
        assert_eq!(state.streams.new_equipment.value, dec!(100));
        assert_eq!(state.streams.equipment.value, dec!(100));
    }

    #[test]
    fn retirement_reduces_equipment_from_prior() {
        let (mut store, key) = setup();
        {
            let state = store.get_mut(&key).unwrap();
            state.streams.prior_equipment = Quantity::new(dec!(1000), Units::UNIT);
            state.cumulative_base.retirement_base_population =
                Some(Quantity::new(dec!(1000), Units::UNIT));
            state.cumulative_base.applied_retirement_amount = Quantity::new(dec!(50), Units::UNIT);
        }
        recalc(&mut store, &key).unwrap();
        let state = store.get(&key).unwrap();
        assert_eq!(state.streams.retired.value, dec!(50));
        assert_eq!(state.streams.equipment.value, dec!(950));
    }
}
