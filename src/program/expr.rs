//! Value expressions: the right-hand side of a command (spec §4.6, §9
//! "Monte Carlo sampling").
//!
//! A pre-parsed program tree hands the engine expressions rather than raw
//! numbers so that Monte Carlo sampling nodes can be re-evaluated on every
//! visit instead of being resolved once at parse time.

use crate::quantity::context::Temporal;
use crate::quantity::{Quantity, Units};
use crate::state::StreamName;
use serde::{Deserialize, Serialize};

/// A value the interpreter resolves against a trial's RNG and variable
/// scope. Literal values resolve to the same `Quantity` every time;
/// `SampleNormal`/`SampleUniform` draw a fresh value on each evaluation
/// (spec §9: "samples inside a command that runs in N years draw N times").
/// `Get` reads a stream from the active substance scope (spec §4.6 "get"),
/// which is what lets `define x as get domestic` observe simulation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueExpr {
    Literal(Quantity),
    SampleNormal { mean: f64, std: f64, units: Units },
    SampleUniform { low: f64, high: f64, units: Units },
    Variable(String),
    Get {
        stream: StreamName,
        of_substance: Option<String>,
        as_units: Option<Units>,
        temporal: Temporal,
    },
}

impl ValueExpr {
    pub fn literal(value: impl Into<rust_decimal::Decimal>, units: Units) -> Self {
        ValueExpr::Literal(Quantity::new(value.into(), units))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn literal_round_trips_through_serde() {
        let expr = ValueExpr::Literal(Quantity::new(dec!(5), Units::KG));
        let json = serde_json::to_string(&expr).unwrap();
        let back: ValueExpr = serde_json::from_str(&json).unwrap();
        assert_eq!(expr, back);
    }
}
