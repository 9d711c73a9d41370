//! Consumption recalculation: GHG and energy accounting derived from the
//! current sales/population state (spec §4.4).

use super::shared;
use crate::error::SimResult;
use crate::quantity::units::BaseUnit;
use crate::quantity::{Quantity, Units};
use crate::state::store::StreamStore;
use crate::state::UseKey;
use rust_decimal::Decimal;

pub fn recalc(store: &mut StreamStore, key: &UseKey) -> SimResult<()> {
    let ctx_map = store.context_snapshot(key)?;
    let state = store.get(key)?.clone();
    let initial_charge = store.effective_initial_charge(key)?;
    let ghg_intensity = state.parameterization.ghg_intensity.value;
    let energy_intensity = &state.parameterization.energy_intensity;

    let domestic_consumption = state.streams.domestic.value * ghg_intensity;
    let import_consumption = state.streams.import.value * ghg_intensity;
    let export_consumption = state.streams.export.value * ghg_intensity;

    let recharge_vol = shared::recharge_volume_kg(
        &state.cumulative_base,
        &state.parameterization,
        &state.streams.prior_equipment,
        &ctx_map,
    )?;
    let eol_recycled = shared::eol_recycled_kg(&state.parameterization, &state.streams.retired, &initial_charge);
    let recharge_recycled = shared::recharge_recycled_kg(&state.parameterization, recharge_vol);
    let recycle_consumption = (eol_recycled + recharge_recycled) * ghg_intensity;

    let recharge_emissions = recharge_vol * ghg_intensity;
    let eol_available = state.streams.retired.value * initial_charge.value;
    let eol_emissions = (eol_available - eol_recycled).max(Decimal::ZERO) * ghg_intensity;
    let initial_charge_emissions = state.streams.new_equipment.value * initial_charge.value * ghg_intensity;

    // energyConsumption is driven off whichever total matches the
    // intensity's denominator unit: kg uses total sales volume, unit uses
    // equipment population (spec §4.4).
    let energy_consumption = match energy_intensity.units.as_ratio() {
        Some((_, Units::Base(BaseUnit::Unit))) => state.streams.equipment.value * energy_intensity.value,
        _ => state.streams.sales().value * energy_intensity.value,
    };

    store.set_consumption(
        key,
        Quantity::new(domestic_consumption, Units::T_CO2E),
        Quantity::new(import_consumption, Units::T_CO2E),
        Quantity::new(export_consumption, Units::T_CO2E),
        Quantity::new(recycle_consumption, Units::T_CO2E),
        Quantity::new(recharge_emissions, Units::T_CO2E),
        Quantity::new(eol_emissions, Units::T_CO2E),
        Quantity::new(initial_charge_emissions, Units::T_CO2E),
        Quantity::new(energy_consumption, Units::KWH),
    )?;
    Ok(())
}
