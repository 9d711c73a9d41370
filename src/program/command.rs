//! Compiled command nodes (spec §4.6 "Policy interpreter").
//!
//! Each variant corresponds to one bullet in spec §4.6; the interpreter
//! matches on this enum and dispatches to the propagation chain the node's
//! mutation implies (spec §5's dependency table).

use crate::program::expr::ValueExpr;
use crate::program::year_matcher::YearMatcher;
use crate::quantity::Units;
use crate::state::{CarryOverMode, Stage, StreamName, Substream};
use serde::{Deserialize, Serialize};

/// `cap`/`floor`/`replace`'s displacement target: another stream on the
/// same substance, or another substance entirely (spec §4.6 "Displacement
/// semantics").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplacementTarget {
    Stream(StreamName),
    Substance(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// `enable X`.
    Enable { stream: StreamName },

    /// `initial charge with V for stream`.
    InitialCharge { substream: Substream, value: ValueExpr },

    /// `set stream to V [during Y]`.
    Set {
        stream: StreamName,
        value: ValueExpr,
        year: YearMatcher,
    },

    /// `change stream by V [/ year] [during Y]`.
    Change {
        stream: StreamName,
        delta: ValueExpr,
        per_year: bool,
        year: YearMatcher,
    },

    /// `equals V1 [V2]` — sets ghg_intensity and/or energy_intensity.
    Equals {
        ghg_intensity: Option<ValueExpr>,
        energy_intensity: Option<ValueExpr>,
        year: YearMatcher,
    },

    /// `retire V [with replacement] [during Y]`.
    Retire {
        amount: ValueExpr,
        with_replacement: bool,
        year: YearMatcher,
    },

    /// `recharge V with I [during Y]`.
    Recharge {
        population: ValueExpr,
        intensity: ValueExpr,
        year: YearMatcher,
    },

    /// `recover V with Y [at stage] [with I induction] [displacing D]
    /// [during Y]`.
    Recover {
        amount: ValueExpr,
        stage: Stage,
        yield_rate: ValueExpr,
        induction: Option<ValueExpr>,
        displacing: Option<DisplacementTarget>,
        year: YearMatcher,
    },

    /// `cap stream to V [displacing D] [during Y]`.
    Cap {
        stream: StreamName,
        value: ValueExpr,
        displacing: Option<DisplacementTarget>,
        year: YearMatcher,
    },

    /// `floor stream to V [displacing D] [during Y]`.
    Floor {
        stream: StreamName,
        value: ValueExpr,
        displacing: Option<DisplacementTarget>,
        year: YearMatcher,
    },

    /// `replace P of stream with "S2" [during Y]`.
    Replace {
        amount: ValueExpr,
        stream: StreamName,
        target_substance: String,
        year: YearMatcher,
    },

    /// `assume (no|only recharge|continued) stream [during Y]`.
    Assume {
        mode: CarryOverMode,
        stream: StreamName,
        year: YearMatcher,
    },

    /// `define name as expr` — a local variable, scoped to the stanza it
    /// appears in.
    Define { name: String, value: ValueExpr },

    /// `get stream [of S] [as U]` — a read that traces the resolved value
    /// rather than mutating state. `define name as get ...` is how a
    /// program captures a read into a variable it can act on later.
    Get {
        stream: StreamName,
        of_substance: Option<String>,
        as_units: Option<Units>,
    },
}
