//! Sales recalculation: the inner loop invoked whenever a mutation may
//! change the required virgin material (spec §4.3).

use super::recycling;
use super::shared;
use crate::error::SimResult;
use crate::quantity::context::{ContextChannel, Temporal};
use crate::state::store::StreamStore;
use crate::state::{Substream, UseKey};
use rust_decimal::Decimal;

/// Runs the 11-step sales recalculation for one use-key.
pub fn recalc(store: &mut StreamStore, key: &UseKey) -> SimResult<()> {
    // Step 1: capture this step's recharge base on first touch.
    {
        let state = store.get_mut(key)?;
        let prior_equipment = state.streams.prior_equipment.clone();
        state.cumulative_base.capture_recharge_base(&prior_equipment);
    }

    // Steps 2, 4, 5: each stage's recycling strategy computes and commits
    // its own recycle/induction volumes (spec §4.4).
    recycling::recalc_eol(store, key)?;
    recycling::recalc_recharge(store, key)?;

    let ctx_map = store.context_snapshot(key)?;
    let state = store.get(key)?.clone();
    let initial_charge = store.effective_initial_charge(key)?;

    let recharge_vol = shared::recharge_volume_kg(
        &state.cumulative_base,
        &state.parameterization,
        &state.streams.prior_equipment,
        &ctx_map,
    )?;
    let eol_recycled = state.streams.recycle_eol.value;
    let recharge_recycled = state.streams.recycle_recharge.value;
    let induction_eol_kg = state.streams.induction_eol.value;
    let induction_recharge_kg = state.streams.induction_recharge.value;

    // Step 6: new-equipment volume, from the population-change context
    // channel (current equipment minus prior, clamped to >=0 at the source).
    let population_change = ctx_map
        .get(&(ContextChannel::PopulationChange, Temporal::Current))
        .copied()
        .unwrap_or(Decimal::ZERO);
    let new_equipment_kg = population_change * initial_charge.value;

    // Step 7: implicit recharge, accumulated by unit-based sets this step.
    let implicit_recharge_kg = state.streams.implicit_recharge.value;

    // Step 8: total demand.
    let total_demand = recharge_vol + new_equipment_kg - implicit_recharge_kg;

    // Step 9: virgin material.
    let unit_based = state.parameterization.unit_based_sales;

    let mut virgin = if unit_based {
        total_demand + induction_eol_kg + induction_recharge_kg
    } else {
        let recycled_total = eol_recycled + recharge_recycled;
        let induced_back = induction_eol_kg + induction_recharge_kg;
        total_demand - recycled_total + induced_back
    };
    if virgin.is_sign_negative() {
        tracing::warn!(scope = %key, "clamped negative virgin material to zero");
        virgin = Decimal::ZERO;
    }

    // Step 10: distribute.
    let (pct_domestic, pct_import) = store.sales_distribution(key)?;
    let domestic_kg = pct_domestic * virgin;
    let import_kg = pct_import * virgin;

    // Step 11: commit. Recycle/induction streams were already committed by
    // the per-stage recycling strategies above.
    store.set_substream_kg(key, Substream::Domestic, domestic_kg)?;
    store.set_substream_kg(key, Substream::Import, import_kg)?;

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::quantity::{Quantity, Units};
    use crate::state::StreamName;
    use rust_decimal_macros::dec;

    fn setup() -> (StreamStore, UseKey) {
        let key = UseKey::new("test", "test");
        let mut store = StreamStore::new();
        store.ensure(&key);
        store.enable(&key, StreamName::Domestic).unwrap();
        store.enable(&key, StreamName::Import).unwrap();
        {
            let state = store.get_mut(&key).unwrap();
            state
                .parameterization
                .initial_charge
                .insert(Substream::Domestic, Quantity::new(dec!(1), Units::kg_per_unit()));
            state
                .parameterization
                .initial_charge
                .insert(Substream::Import, Quantity::new(dec!(1), Units::kg_per_unit()));
        }
        (store, key)
    }

    #[test]
    fn pure_new_equipment_demand_splits_across_domestic_and_import() {
        let (mut store, key) = setup();
        {
            let state = store.get_mut(&key).unwrap();
            state.streams.equipment = Quantity::new(dec!(1000), Units::UNIT);
            state.streams.prior_equipment = Quantity::zero(Units::UNIT);
        }
        recalc(&mut store, &key).unwrap();
        let state = store.get(&key).unwrap();
        assert_eq!(state.streams.domestic.value, dec!(500));
        assert_eq!(state.streams.import.value, dec!(500));
    }

    #[test]
    fn negative_demand_clamps_to_zero() {
        let (mut store, key) = setup();
        {
            let state = store.get_mut(&key).unwrap();
            state.streams.implicit_recharge = Quantity::new(dec!(1000), Units::KG);
        }
        recalc(&mut store, &key).unwrap();
        let state = store.get(&key).unwrap();
        assert_eq!(state.streams.domestic.value, Decimal::ZERO);
        assert_eq!(state.streams.import.value, Decimal::ZERO);
    }
}
