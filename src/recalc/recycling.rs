//! Recycling recalculation, one dedicated strategy per stage (spec §4.4).
//!
//! Each stage picks its own base volume — retiring-units × initial charge
//! for EOL, recharge units × intensity for RECHARGE — then applies that
//! stage's recovery and yield rates to produce its recycle and induction
//! streams.

use super::shared;
use crate::error::SimResult;
use crate::state::store::StreamStore;
use crate::state::{Stage, UseKey};

pub fn recalc_eol(store: &mut StreamStore, key: &UseKey) -> SimResult<()> {
    let state = store.get(key)?.clone();
    let initial_charge = store.effective_initial_charge(key)?;
    let eol_recycled = shared::eol_recycled_kg(&state.parameterization, &state.streams.retired, &initial_charge);
    let induction_eol = state.parameterization.effective_induction_rate(Stage::Eol).value;
    store.commit_eol_recycling(key, eol_recycled, eol_recycled * induction_eol)
}

pub fn recalc_recharge(store: &mut StreamStore, key: &UseKey) -> SimResult<()> {
    let ctx_map = store.context_snapshot(key)?;
    let state = store.get(key)?.clone();
    let recharge_vol = shared::recharge_volume_kg(
        &state.cumulative_base,
        &state.parameterization,
        &state.streams.prior_equipment,
        &ctx_map,
    )?;
    let recharge_recycled = shared::recharge_recycled_kg(&state.parameterization, recharge_vol);
    let induction_recharge = state.parameterization.effective_induction_rate(Stage::Recharge).value;
    store.commit_recharge_recycling(key, recharge_recycled, recharge_recycled * induction_recharge)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::quantity::{Quantity, Units};
    use crate::state::{Substream, StreamName};
    use rust_decimal_macros::dec;

    #[test]
    fn eol_recycling_applies_recovery_and_yield() {
        let key = UseKey::new("test", "test");
        let mut store = StreamStore::new();
        store.ensure(&key);
        store.enable(&key, StreamName::Domestic).unwrap();
        {
            let state = store.get_mut(&key).unwrap();
            state.streams.retired = Quantity::new(dec!(100), Units::UNIT);
            state
                .parameterization
                .initial_charge
                .insert(Substream::Domestic, Quantity::new(dec!(1), Units::kg_per_unit()));
            state
                .parameterization
                .accumulate_recovery_rate(Stage::Eol, Quantity::new(dec!(0.5), Units::PERCENT));
            let mut count = 0u32;
            state.parameterization.accumulate_yield_rate(
                Stage::Eol,
                Quantity::new(dec!(1.0), Units::PERCENT),
                &mut count,
            );
        }
        recalc_eol(&mut store, &key).unwrap();
        let state = store.get(&key).unwrap();
        // 100 units * 1 kg/unit * 0.5 recovery * 1.0 yield = 50 kg
        assert_eq!(state.streams.recycle_eol.value, dec!(50));
    }
}
