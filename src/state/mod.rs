//! The per-(application, substance) state owned by a trial (spec §3, §4.2).

pub mod cumulative_base;
pub mod parameterization;
pub mod store;
pub mod streams;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// The storage key under which streams and parameterizations live.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UseKey {
    pub application: String,
    pub substance: String,
}

impl UseKey {
    pub fn new(application: impl Into<String>, substance: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            substance: substance.into(),
        }
    }
}

impl std::fmt::Display for UseKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.application, self.substance)
    }
}

/// `(stanza, application, substance)` — identifies a substance within an
/// application within a stanza (default, policy name, or scenario).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub stanza: String,
    pub application: String,
    pub substance: String,
}

impl Scope {
    pub fn new(
        stanza: impl Into<String>,
        application: impl Into<String>,
        substance: impl Into<String>,
    ) -> Self {
        Self {
            stanza: stanza.into(),
            application: application.into(),
            substance: substance.into(),
        }
    }

    pub fn use_key(&self) -> UseKey {
        UseKey::new(self.application.clone(), self.substance.clone())
    }

    pub fn with_substance(&self, substance: impl Into<String>) -> Scope {
        Scope::new(self.stanza.clone(), self.application.clone(), substance)
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}/{}", self.stanza, self.application, self.substance)
    }
}

/// The lifecycle stage at which recycling applies (spec GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString)]
pub enum Stage {
    #[strum(serialize = "eol")]
    Eol,
    #[strum(serialize = "recharge")]
    Recharge,
}

/// A sales substream (spec GLOSSARY: "sales / substreams").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString)]
pub enum Substream {
    #[strum(serialize = "domestic")]
    Domestic,
    #[strum(serialize = "import")]
    Import,
    #[strum(serialize = "export")]
    Export,
}

/// A named stream (spec §3 "Streams").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString)]
pub enum StreamName {
    #[strum(serialize = "domestic")]
    Domestic,
    #[strum(serialize = "import")]
    Import,
    #[strum(serialize = "export")]
    Export,
    #[strum(serialize = "sales")]
    Sales,
    #[strum(serialize = "recycle")]
    Recycle,
    #[strum(serialize = "recycleRecharge")]
    RecycleRecharge,
    #[strum(serialize = "recycleEol")]
    RecycleEol,
    #[strum(serialize = "induction")]
    Induction,
    #[strum(serialize = "inductionRecharge")]
    InductionRecharge,
    #[strum(serialize = "inductionEol")]
    InductionEol,
    #[strum(serialize = "consumption")]
    Consumption,
    #[strum(serialize = "equipment")]
    Equipment,
    #[strum(serialize = "priorEquipment")]
    PriorEquipment,
    #[strum(serialize = "newEquipment")]
    NewEquipment,
    #[strum(serialize = "retired")]
    Retired,
    #[strum(serialize = "priorRetired")]
    PriorRetired,
    #[strum(serialize = "rechargeEmissions")]
    RechargeEmissions,
    #[strum(serialize = "eolEmissions")]
    EolEmissions,
    #[strum(serialize = "implicitRecharge")]
    ImplicitRecharge,
    #[strum(serialize = "age")]
    Age,
    #[strum(serialize = "energyConsumption")]
    EnergyConsumption,
    #[strum(serialize = "bank")]
    Bank,
}

/// Carry-over assumption for a stream across a year boundary (spec §4.6
/// `assume`, §9 Open Questions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display, EnumString)]
pub enum CarryOverMode {
    #[default]
    #[strum(serialize = "continued")]
    Continued,
    #[strum(serialize = "no")]
    No,
    #[strum(serialize = "onlyRecharge", serialize = "only recharge")]
    OnlyRecharge,
}
