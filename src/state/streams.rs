//! The per-use-key bag of stream values (spec §3 "Streams", "Derived
//! streams").

use crate::quantity::{Quantity, Units};
use serde::{Deserialize, Serialize};

/// All stored streams for one (application, substance). Derived streams
/// (`sales`, `recycle`, `induction`, `bank`) are never stored — they're
/// computed on read from these fields, per spec §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Streams {
    pub domestic: Quantity,
    pub import: Quantity,
    pub export: Quantity,

    pub recycle_recharge: Quantity,
    pub recycle_eol: Quantity,
    pub induction_recharge: Quantity,
    pub induction_eol: Quantity,

    pub domestic_consumption: Quantity,
    pub import_consumption: Quantity,
    pub export_consumption: Quantity,
    pub recycle_consumption: Quantity,

    pub equipment: Quantity,
    pub prior_equipment: Quantity,
    pub new_equipment: Quantity,
    pub retired: Quantity,
    pub prior_retired: Quantity,

    pub recharge_emissions: Quantity,
    pub eol_emissions: Quantity,
    pub initial_charge_emissions: Quantity,

    pub implicit_recharge: Quantity,
    pub age: Quantity,
    pub energy_consumption: Quantity,

    /// Portion of `import` attributable to new-equipment initial charge
    /// (vs recharge servicing of existing equipment).
    pub import_initial_charge_value: Quantity,
    pub import_initial_charge_consumption: Quantity,
    pub import_population: Quantity,
}

impl Default for Streams {
    fn default() -> Self {
        Self {
            domestic: Quantity::zero(Units::KG),
            import: Quantity::zero(Units::KG),
            export: Quantity::zero(Units::KG),
            recycle_recharge: Quantity::zero(Units::KG),
            recycle_eol: Quantity::zero(Units::KG),
            induction_recharge: Quantity::zero(Units::KG),
            induction_eol: Quantity::zero(Units::KG),
            domestic_consumption: Quantity::zero(Units::T_CO2E),
            import_consumption: Quantity::zero(Units::T_CO2E),
            export_consumption: Quantity::zero(Units::T_CO2E),
            recycle_consumption: Quantity::zero(Units::T_CO2E),
            equipment: Quantity::zero(Units::UNIT),
            prior_equipment: Quantity::zero(Units::UNIT),
            new_equipment: Quantity::zero(Units::UNIT),
            retired: Quantity::zero(Units::UNIT),
            prior_retired: Quantity::zero(Units::UNIT),
            recharge_emissions: Quantity::zero(Units::T_CO2E),
            eol_emissions: Quantity::zero(Units::T_CO2E),
            initial_charge_emissions: Quantity::zero(Units::T_CO2E),
            implicit_recharge: Quantity::zero(Units::KG),
            age: Quantity::zero(Units::YEAR),
            energy_consumption: Quantity::zero(Units::KWH),
            import_initial_charge_value: Quantity::zero(Units::KG),
            import_initial_charge_consumption: Quantity::zero(Units::T_CO2E),
            import_population: Quantity::zero(Units::UNIT),
        }
    }
}

impl Streams {
    /// `sales = domestic + import + recycle` (spec §3 derived streams).
    pub fn sales(&self) -> Quantity {
        self.domestic.clone() + self.import.clone() + self.recycle()
    }

    /// `recycle = recycleRecharge + recycleEol`.
    pub fn recycle(&self) -> Quantity {
        self.recycle_recharge.clone() + self.recycle_eol.clone()
    }

    /// `induction = inductionRecharge + inductionEol`.
    pub fn induction(&self) -> Quantity {
        self.induction_recharge.clone() + self.induction_eol.clone()
    }

    pub fn consumption(&self) -> Quantity {
        self.domestic_consumption.clone() + self.import_consumption.clone()
            - self.export_consumption.clone()
    }

    /// `bank = equipment * effective initial charge`, where the effective
    /// charge is supplied by the caller (the store knows which substream's
    /// initial charge to use — see [`crate::state::store::StreamStore::bank`]).
    pub fn bank(&self, effective_initial_charge: &Quantity) -> Quantity {
        Quantity::new(
            self.equipment.value * effective_initial_charge.value,
            Units::KG,
        )
    }

    /// Population-weighted mean of (prior age + 1) and (new units at age 1),
    /// per spec §3's `age[year+1]` invariant.
    pub fn weighted_age(
        prior_age: &Quantity,
        prior_population: &Quantity,
        new_population: &Quantity,
    ) -> Quantity {
        let total = prior_population.value + new_population.value;
        if total.is_zero() {
            return Quantity::zero(Units::YEAR);
        }
        let aged_prior = prior_age.value + rust_decimal::Decimal::ONE;
        let weighted = aged_prior * prior_population.value + rust_decimal::Decimal::ONE * new_population.value;
        Quantity::new(weighted / total, Units::YEAR)
    }
}
