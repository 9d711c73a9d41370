//! Arithmetic shared by more than one recalc strategy (spec §4.3, §4.4).
//!
//! Recharge volume and stage-recycling amounts are needed by the sales,
//! consumption, and recycling strategies alike. Each strategy recomputes
//! them from current state rather than threading intermediate results
//! between passes, keeping every strategy a pure function of the store
//! (spec §9: "each strategy is idempotent given fixed parameters").

use crate::error::SimResult;
use crate::quantity::context::{ContextChannel, ContextFrame, ContextStack, Temporal};
use crate::quantity::convert::convert;
use crate::quantity::{Quantity, Units};
use crate::state::cumulative_base::CumulativeBase;
use crate::state::parameterization::Parameterization;
use crate::state::Stage;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// `recharge_volume_kg` per spec §4.3 steps 1-2: the recharge-stage demand
/// implied by the currently accumulated recharge rate/intensity, measured
/// against this step's captured base population (or `prior_equipment` if no
/// command has captured one yet this step).
pub fn recharge_volume_kg(
    cumulative_base: &CumulativeBase,
    parameterization: &Parameterization,
    prior_equipment: &Quantity,
    ctx_map: &HashMap<(ContextChannel, Temporal), Decimal>,
) -> SimResult<Decimal> {
    let base = cumulative_base
        .recharge_base_population
        .clone()
        .unwrap_or_else(|| prior_equipment.clone());
    let mut ctx = ContextStack::new(ctx_map);
    let recharge_units = ctx.with_frame(
        ContextFrame::new().with(ContextChannel::Population, Temporal::Current, base.value),
        |ctx| convert(&parameterization.recharge_population, &Units::UNIT, ctx, Temporal::Current),
    )?;
    Ok(recharge_units.value * parameterization.recharge_intensity.value)
}

/// `eol_recycled_kg` per spec §4.3 step 4: `retired × initial_charge`,
/// scaled by the EOL stage's recovery and yield rates.
pub fn eol_recycled_kg(
    parameterization: &Parameterization,
    retired: &Quantity,
    initial_charge: &Quantity,
) -> Decimal {
    let available = retired.value * initial_charge.value;
    available
        * parameterization.recovery_rate_for(Stage::Eol).value
        * parameterization.yield_rate_for(Stage::Eol).value
}

/// `recharge_recycled_kg` per spec §4.3 step 5: the recharge stage's
/// recovery/yield rates applied against `recharge_volume_kg`.
pub fn recharge_recycled_kg(parameterization: &Parameterization, recharge_volume_kg: Decimal) -> Decimal {
    recharge_volume_kg
        * parameterization.recovery_rate_for(Stage::Recharge).value
        * parameterization.yield_rate_for(Stage::Recharge).value
}
