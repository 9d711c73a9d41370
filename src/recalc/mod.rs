//! Recalculation strategies: the derived-stream refresh triggered whenever
//! a mutation changes something downstream consumers depend on (spec §4.3,
//! §4.4, §9).
//!
//! The original engine expressed these as subclasses of an abstract
//! `CalculationStrategy`. Here they're a closed, exhaustively-matched enum
//! instead — every recalculation a mutation can trigger is one of these five
//! variants, and `execute` is the single place that dispatches to the
//! concrete pure function.

pub mod consumption;
pub mod population;
pub mod recycling;
pub mod sales;
mod shared;

use crate::error::SimResult;
use crate::state::store::StreamStore;
use crate::state::UseKey;

/// One derived-stream recalculation, named by what it recomputes rather
/// than by which command triggered it (spec §9 design note).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Sales,
    Population,
    Consumption,
    EolRecycling,
    RechargeRecycling,
}

impl Strategy {
    /// Runs this strategy's recalculation against the current state of
    /// `key`. Each strategy is idempotent given fixed parameters: running it
    /// twice in a row without an intervening mutation reproduces the same
    /// output (spec §9), so callers don't need to track whether a
    /// recalculation has "already happened" this step.
    pub fn execute(self, store: &mut StreamStore, key: &UseKey) -> SimResult<()> {
        match self {
            Strategy::Sales => sales::recalc(store, key),
            Strategy::Population => population::recalc(store, key),
            Strategy::Consumption => consumption::recalc(store, key),
            Strategy::EolRecycling => recycling::recalc_eol(store, key),
            Strategy::RechargeRecycling => recycling::recalc_recharge(store, key),
        }
    }
}

/// Runs the full sales → population → consumption chain for `key`.
///
/// This is the propagation the spec's dependency table (§5) calls for after
/// any mutation broad enough to affect all three: sales recalculates first
/// (and, as part of that, refreshes both recycling stages), population reads
/// the resulting sales/recycling volumes, and consumption reads the
/// resulting sales/population volumes. No transitive re-iteration is
/// performed — one pass per strategy is sufficient because each is
/// idempotent given fixed parameters (spec §9).
pub fn propagate_full(store: &mut StreamStore, key: &UseKey) -> SimResult<()> {
    Strategy::Sales.execute(store, key)?;
    Strategy::Population.execute(store, key)?;
    Strategy::Consumption.execute(store, key)?;
    Ok(())
}

/// Runs population → consumption, for mutations that bypass sales (e.g. a
/// direct `equipment` edit, spec §5's propagation table).
pub fn propagate_from_population(store: &mut StreamStore, key: &UseKey) -> SimResult<()> {
    Strategy::Population.execute(store, key)?;
    Strategy::Consumption.execute(store, key)?;
    Ok(())
}

/// Runs population alone, for a direct `priorEquipment` edit — treated as
/// authoritative, so nothing upstream of population needs to be recomputed
/// (spec §5's propagation table).
pub fn propagate_population_only(store: &mut StreamStore, key: &UseKey) -> SimResult<()> {
    Strategy::Population.execute(store, key)
}

/// Runs sales → consumption, skipping population — for a direct `equipment`
/// edit, where the edited stream itself is population's output (spec §5's
/// propagation table: "Set equipment: sales recalc; consumption recalc
/// follows sales").
pub fn propagate_sales_then_consumption(store: &mut StreamStore, key: &UseKey) -> SimResult<()> {
    Strategy::Sales.execute(store, key)?;
    Strategy::Consumption.execute(store, key)?;
    Ok(())
}

/// Runs consumption alone, for mutations that only affect GHG/energy
/// accounting (e.g. an `equals` intensity change with sales already fixed,
/// spec §5's propagation table).
pub fn propagate_consumption_only(store: &mut StreamStore, key: &UseKey) -> SimResult<()> {
    Strategy::Consumption.execute(store, key)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::quantity::{Quantity, Units};
    use crate::state::{Substream, StreamName};
    use rust_decimal_macros::dec;

    #[test]
    fn propagate_full_runs_sales_then_population_then_consumption() {
        let key = UseKey::new("test", "test");
        let mut store = StreamStore::new();
        store.ensure(&key);
        store.enable(&key, StreamName::Domestic).unwrap();
        store.enable(&key, StreamName::Import).unwrap();
        {
            let state = store.get_mut(&key).unwrap();
            state.streams.equipment = Quantity::new(dec!(1000), Units::UNIT);
            state.streams.prior_equipment = Quantity::zero(Units::UNIT);
            state
                .parameterization
                .initial_charge
                .insert(Substream::Domestic, Quantity::new(dec!(1), Units::kg_per_unit()));
            state
                .parameterization
                .initial_charge
                .insert(Substream::Import, Quantity::new(dec!(1), Units::kg_per_unit()));
            state.parameterization.ghg_intensity = Quantity::new(dec!(2), Units::tco2e_per_kg());
        }
        propagate_full(&mut store, &key).unwrap();
        let state = store.get(&key).unwrap();
        // sales: 1000 units * 1 kg/unit split 50/50 = 500 domestic + 500 import
        assert_eq!(state.streams.domestic.value, dec!(500));
        assert_eq!(state.streams.import.value, dec!(500));
        // population: 1000 kg virgin -> 1000 units new equipment
        assert_eq!(state.streams.new_equipment.value, dec!(1000));
        // consumption: 1000 kg total sales * 2 tCO2e/kg
        assert_eq!(
            state.streams.domestic_consumption.value + state.streams.import_consumption.value,
            dec!(2000)
        );
    }
}
