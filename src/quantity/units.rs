//! Unit labels carried by every [`super::Quantity`].
//!
//! Units are either one of the base kinds in spec §3, or a ratio of two
//! units (e.g. `kg / unit`, `tCO2e / kg`). Ratios are represented
//! structurally rather than as opaque strings so the converter can pattern
//! match on numerator/denominator instead of re-parsing text.

use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumString};

/// A single (non-ratio) unit kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum BaseUnit {
    #[strum(serialize = "kg")]
    Kg,
    #[strum(serialize = "mt", serialize = "t", serialize = "tonnes")]
    Mt,
    #[strum(serialize = "units", serialize = "unit")]
    Unit,
    #[strum(serialize = "tCO2e", serialize = "tco2e")]
    TCo2e,
    #[strum(serialize = "kgCO2e", serialize = "kgco2e")]
    KgCo2e,
    #[strum(serialize = "kwh")]
    Kwh,
    #[strum(serialize = "%", serialize = "percent")]
    Percent,
    #[strum(serialize = "year", serialize = "yr", serialize = "years")]
    Year,
}

/// A unit expression: a bare base unit, or a ratio `numerator / denominator`.
///
/// Only a single level of nesting is needed by this engine (no unit ever
/// appears as a ratio-of-ratios), but `Units` is still recursive in shape so
/// the inversion rule in spec §4.1 ("ratio inversion") can be expressed
/// uniformly as swapping numerator and denominator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Units {
    Base(BaseUnit),
    Ratio(Box<Units>, Box<Units>),
}

impl Units {
    pub const KG: Units = Units::Base(BaseUnit::Kg);
    pub const MT: Units = Units::Base(BaseUnit::Mt);
    pub const UNIT: Units = Units::Base(BaseUnit::Unit);
    pub const T_CO2E: Units = Units::Base(BaseUnit::TCo2e);
    pub const KG_CO2E: Units = Units::Base(BaseUnit::KgCo2e);
    pub const KWH: Units = Units::Base(BaseUnit::Kwh);
    pub const PERCENT: Units = Units::Base(BaseUnit::Percent);
    pub const YEAR: Units = Units::Base(BaseUnit::Year);

    pub fn ratio(numerator: Units, denominator: Units) -> Units {
        Units::Ratio(Box::new(numerator), Box::new(denominator))
    }

    pub fn kg_per_unit() -> Units {
        Units::ratio(Units::KG, Units::UNIT)
    }

    pub fn kg_per_year() -> Units {
        Units::ratio(Units::KG, Units::YEAR)
    }

    pub fn tco2e_per_kg() -> Units {
        Units::ratio(Units::T_CO2E, Units::KG)
    }

    pub fn kwh_per_kg() -> Units {
        Units::ratio(Units::KWH, Units::KG)
    }

    pub fn kwh_per_unit() -> Units {
        Units::ratio(Units::KWH, Units::UNIT)
    }

    pub fn is_base(&self, base: BaseUnit) -> bool {
        matches!(self, Units::Base(b) if *b == base)
    }

    pub fn is_percent(&self) -> bool {
        self.is_base(BaseUnit::Percent)
    }

    /// Returns `(numerator, denominator)` if this is a ratio.
    pub fn as_ratio(&self) -> Option<(&Units, &Units)> {
        match self {
            Units::Ratio(n, d) => Some((n, d)),
            Units::Base(_) => None,
        }
    }

    /// The inverted ratio `D / N`, per spec §4.1's ratio inversion rule.
    /// Returns `None` for non-ratio units (inversion is only defined there).
    pub fn inverted(&self) -> Option<Units> {
        self.as_ratio()
            .map(|(n, d)| Units::ratio(d.clone(), n.clone()))
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Units::Base(b) => write!(f, "{b}"),
            Units::Ratio(n, d) => write!(f, "{n} / {d}"),
        }
    }
}

impl From<BaseUnit> for Units {
    fn from(value: BaseUnit) -> Self {
        Units::Base(value)
    }
}

/// Parses the subset of unit literals the engine recognizes (the surface
/// DSL's own unit lexing is out of scope, but the pre-parsed program tree
/// still needs to hand the engine *some* string it can normalize, e.g. from
/// a JSON-encoded command).
impl std::str::FromStr for Units {
    type Err = crate::error::UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((num, den)) = s.split_once('/') {
            let n = num.trim().parse::<Units>()?;
            let d = den.trim().parse::<Units>()?;
            return Ok(Units::ratio(n, d));
        }
        let base = s
            .parse::<BaseUnit>()
            .map_err(|_| crate::error::UnitError::new(s, "<recognized unit>"))?;
        Ok(Units::Base(base))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_bare_units() {
        assert_eq!("kg".parse::<Units>().unwrap(), Units::KG);
        assert_eq!("units".parse::<Units>().unwrap(), Units::UNIT);
        assert_eq!("%".parse::<Units>().unwrap(), Units::PERCENT);
    }

    #[test]
    fn parses_ratio_units() {
        let u = "kg / unit".parse::<Units>().unwrap();
        assert_eq!(u, Units::kg_per_unit());
    }

    #[test]
    fn inversion_swaps_numerator_and_denominator() {
        let u = Units::kg_per_unit();
        assert_eq!(u.inverted().unwrap(), Units::ratio(Units::UNIT, Units::KG));
        assert!(Units::KG.inverted().is_none());
    }
}
