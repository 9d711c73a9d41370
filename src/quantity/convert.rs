//! Context-aware unit conversion (spec §4.1).
//!
//! `convert` is a pure function of `(Quantity, target units, context)`. It
//! never reads or writes the stream store directly — all contextual
//! information comes through the [`ContextStack`] so the same conversion
//! logic works whether it's invoked from a recalc strategy, the
//! interpreter, or a unit test with a hand-built context.

use super::context::{ContextChannel, ContextStack, Temporal};
use super::units::{BaseUnit, Units};
use super::Quantity;
use crate::error::{SimError, UnitError};
use rust_decimal::Decimal;

const ONE_THOUSAND: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

/// Converts `q` to `target` units, reading whatever contextual channels the
/// conversion needs from `ctx`. `when` selects whether contextual reads
/// (population, volume, ...) should come from the current step or the
/// prior year, supporting "get X as Y during prior year" (spec §4.1).
pub fn convert(
    q: &Quantity,
    target: &Units,
    ctx: &ContextStack,
    when: Temporal,
) -> Result<Quantity, SimError> {
    if q.units == *target {
        return Ok(q.clone());
    }

    // Pivot mt through kg so the rest of the table only has to know about kg.
    if let Units::Base(BaseUnit::Mt) = q.units {
        let as_kg = Quantity::new(q.value * ONE_THOUSAND, Units::KG);
        return convert(&as_kg, target, ctx, when);
    }
    if let Units::Base(BaseUnit::Mt) = target {
        let as_kg = convert(q, &Units::KG, ctx, when)?;
        return Ok(Quantity::new(as_kg.value / ONE_THOUSAND, Units::MT));
    }

    match (&q.units, target) {
        (Units::Base(BaseUnit::TCo2e), Units::Base(BaseUnit::KgCo2e)) => {
            Ok(Quantity::new(q.value * ONE_THOUSAND, target.clone()))
        }
        (Units::Base(BaseUnit::KgCo2e), Units::Base(BaseUnit::TCo2e)) => {
            Ok(Quantity::new(q.value / ONE_THOUSAND, target.clone()))
        }

        (Units::Base(BaseUnit::Kg), Units::Base(BaseUnit::Unit)) => {
            let amortized = require(ctx, ContextChannel::AmortizedUnitVolume, when, &q.units, target)?;
            if amortized.is_zero() {
                return Err(UnitError::new(&q.units, target).into());
            }
            Ok(Quantity::new(q.value / amortized, target.clone()))
        }
        (Units::Base(BaseUnit::Unit), Units::Base(BaseUnit::Kg)) => {
            let amortized = require(ctx, ContextChannel::AmortizedUnitVolume, when, &q.units, target)?;
            Ok(Quantity::new(q.value * amortized, target.clone()))
        }

        (Units::Base(BaseUnit::Kg), Units::Base(BaseUnit::TCo2e)) => {
            let intensity = require(ctx, ContextChannel::SubstanceConsumption, when, &q.units, target)?;
            Ok(Quantity::new(q.value * intensity, target.clone()))
        }
        (Units::Base(BaseUnit::TCo2e), Units::Base(BaseUnit::Kg)) => {
            let intensity = require(ctx, ContextChannel::SubstanceConsumption, when, &q.units, target)?;
            if intensity.is_zero() {
                return Err(UnitError::new(&q.units, target).into());
            }
            Ok(Quantity::new(q.value / intensity, target.clone()))
        }

        (Units::Base(BaseUnit::Kg), Units::Base(BaseUnit::Kwh)) => {
            let intensity = require(ctx, ContextChannel::EnergyIntensity, when, &q.units, target)?;
            Ok(Quantity::new(q.value * intensity, target.clone()))
        }
        (Units::Base(BaseUnit::Kwh), Units::Base(BaseUnit::Kg)) => {
            let intensity = require(ctx, ContextChannel::EnergyIntensity, when, &q.units, target)?;
            if intensity.is_zero() {
                return Err(UnitError::new(&q.units, target).into());
            }
            Ok(Quantity::new(q.value / intensity, target.clone()))
        }
        (Units::Base(BaseUnit::Unit), Units::Base(BaseUnit::Kwh)) => {
            let intensity = require(ctx, ContextChannel::EnergyIntensity, when, &q.units, target)?;
            Ok(Quantity::new(q.value * intensity, target.clone()))
        }
        (Units::Base(BaseUnit::Kwh), Units::Base(BaseUnit::Unit)) => {
            let intensity = require(ctx, ContextChannel::EnergyIntensity, when, &q.units, target)?;
            if intensity.is_zero() {
                return Err(UnitError::new(&q.units, target).into());
            }
            Ok(Quantity::new(q.value / intensity, target.clone()))
        }

        (Units::Base(BaseUnit::Percent), Units::Base(base)) => {
            // `Units::PERCENT` quantities are stored as plain fractions
            // (0.10 means 10%), not nominal percents, so the total is
            // scaled directly rather than divided by 100.
            let total = contextual_total(*base, ctx, when, &q.units, target)?;
            Ok(Quantity::new(q.value * total, target.clone()))
        }

        (Units::Ratio(n, d), _) if target == n.as_ref() => match d.as_ref() {
            Units::Base(BaseUnit::Year) => {
                let years = require(ctx, ContextChannel::YearsElapsed, when, &q.units, target)?;
                Ok(Quantity::new(q.value * years, target.clone()))
            }
            Units::Base(BaseUnit::Unit) => {
                let population = require(ctx, ContextChannel::Population, when, &q.units, target)?;
                Ok(Quantity::new(q.value * population, target.clone()))
            }
            _ => Err(UnitError::new(&q.units, target).into()),
        },

        _ => {
            // Ratio inversion (spec §4.1): A -> B undefined, but A = N/D and
            // B is expressible as D*N/1 (i.e. B == N and we're missing a
            // direct rule) — already handled above. The remaining case is
            // literal inversion: A = N/D, B = D/N.
            if let Some(inverted) = q.units.inverted() {
                if inverted == *target {
                    if q.value.is_zero() {
                        return Err(UnitError::new(&q.units, target).into());
                    }
                    return Ok(Quantity::new(Decimal::ONE / q.value, target.clone()));
                }
            }
            Err(UnitError::new(&q.units, target).into())
        }
    }
}

fn require(
    ctx: &ContextStack,
    channel: ContextChannel,
    when: Temporal,
    from: &Units,
    to: &Units,
) -> Result<Decimal, SimError> {
    ctx.get(channel, when)
        .ok_or_else(|| UnitError::missing_context(from, to, channel_name(channel)).into())
}

fn channel_name(channel: ContextChannel) -> &'static str {
    match channel {
        ContextChannel::SubstanceConsumption => "substance_consumption",
        ContextChannel::EnergyIntensity => "energy_intensity",
        ContextChannel::AmortizedUnitVolume => "amortized_unit_volume",
        ContextChannel::Population => "population",
        ContextChannel::YearsElapsed => "years_elapsed",
        ContextChannel::GhgConsumption => "ghg_consumption",
        ContextChannel::EnergyConsumption => "energy_consumption",
        ContextChannel::Volume => "volume",
        ContextChannel::PopulationChange => "population_change",
    }
}

/// The contextual total a `%` conversion multiplies against, keyed by the
/// target's base unit (spec §4.1: population for units, volume for kg/mt,
/// ghg_consumption for tCO2e, energy_consumption for kwh).
fn contextual_total(
    base: BaseUnit,
    ctx: &ContextStack,
    when: Temporal,
    from: &Units,
    to: &Units,
) -> Result<Decimal, SimError> {
    let channel = match base {
        BaseUnit::Unit => ContextChannel::Population,
        BaseUnit::Kg | BaseUnit::Mt => ContextChannel::Volume,
        BaseUnit::TCo2e | BaseUnit::KgCo2e => ContextChannel::GhgConsumption,
        BaseUnit::Kwh => ContextChannel::EnergyConsumption,
        BaseUnit::Percent | BaseUnit::Year => {
            return Err(UnitError::new(from, to).into());
        }
    };
    require(ctx, channel, when, from, to)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::quantity::context::ContextFrame;
    use rust_decimal_macros::dec;

    fn ctx_with(channel: ContextChannel, value: Decimal) -> (ContextFrame,) {
        (ContextFrame::new().with(channel, Temporal::Current, value),)
    }

    struct Empty;
    impl crate::quantity::context::ContextSource for Empty {
        fn get_context(&self, _c: ContextChannel, _w: Temporal) -> Option<Decimal> {
            None
        }
    }

    #[test]
    fn kg_to_mt_scales_by_a_thousand() {
        let empty = Empty;
        let ctx = ContextStack::new(&empty);
        let q = Quantity::new(dec!(2500), Units::KG);
        let mt = convert(&q, &Units::MT, &ctx, Temporal::Current).unwrap();
        assert_eq!(mt.value, dec!(2.5));
    }

    #[test]
    fn kg_to_units_divides_by_amortized_unit_volume() {
        let empty = Empty;
        let mut ctx = ContextStack::new(&empty);
        let (frame,) = ctx_with(ContextChannel::AmortizedUnitVolume, dec!(2));
        ctx.push(frame);
        let q = Quantity::new(dec!(100), Units::KG);
        let units = convert(&q, &Units::UNIT, &ctx, Temporal::Current).unwrap();
        assert_eq!(units.value, dec!(50));
    }

    #[test]
    fn percent_to_kg_multiplies_by_volume() {
        let empty = Empty;
        let mut ctx = ContextStack::new(&empty);
        let (frame,) = ctx_with(ContextChannel::Volume, dec!(1000));
        ctx.push(frame);
        let q = Quantity::new(dec!(0.10), Units::PERCENT);
        let kg = convert(&q, &Units::KG, &ctx, Temporal::Current).unwrap();
        assert_eq!(kg.value, dec!(100));
    }

    #[test]
    fn missing_context_surfaces_unit_error() {
        let empty = Empty;
        let ctx = ContextStack::new(&empty);
        let q = Quantity::new(dec!(100), Units::KG);
        let err = convert(&q, &Units::UNIT, &ctx, Temporal::Current);
        assert!(err.is_err());
    }

    #[test]
    fn ratio_inversion_divides_into_one() {
        let empty = Empty;
        let ctx = ContextStack::new(&empty);
        let q = Quantity::new(dec!(4), Units::kg_per_unit());
        let inverted = convert(&q, &Units::ratio(Units::UNIT, Units::KG), &ctx, Temporal::Current)
            .unwrap();
        assert_eq!(inverted.value, dec!(0.25));
    }
}
