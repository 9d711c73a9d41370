//! Monte Carlo sampling nodes (spec §4.8 step 4, §9 "Monte Carlo sampling").
//!
//! A sampling node is re-evaluated every time its enclosing expression is
//! evaluated — a `sample normally ...` inside a command that runs for N
//! years draws N independent values, not one value reused N times. Callers
//! that need a stable value across a step must resolve the expression once
//! and hold onto the resulting `Quantity` themselves.

use crate::error::{ScopeError, SimResult};
use crate::program::expr::ValueExpr;
use crate::quantity::context::{ContextStack, Temporal};
use crate::quantity::convert::convert;
use crate::quantity::Quantity;
use crate::state::store::StreamStore;
use crate::state::UseKey;
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// The active substance scope a `get` expression reads against, if any.
/// `None` at call sites with no natural "current substance" (e.g. top-level
/// program variables), in which case a `Get` expression is a scope error.
pub type StreamScope<'a> = Option<(&'a StreamStore, &'a UseKey)>;

/// Resolves a value expression against a trial's RNG, the current variable
/// scope, and (when available) the active substance's stream store.
pub fn resolve(
    expr: &ValueExpr,
    variables: &HashMap<String, Quantity>,
    rng: &mut impl Rng,
    scope: StreamScope<'_>,
) -> SimResult<Quantity> {
    match expr {
        ValueExpr::Literal(q) => Ok(q.clone()),
        ValueExpr::Variable(name) => variables
            .get(name)
            .cloned()
            .ok_or_else(|| ScopeError::NoActiveScope { operation: format!("get variable {name:?}") }.into()),
        ValueExpr::SampleNormal { mean, std, units } => {
            let dist = Normal::new(*mean, *std)
                .expect("std must be finite and non-negative; upstream validation guarantees this");
            let draw = dist.sample(rng);
            Ok(Quantity::new(decimal_from_f64(draw), units.clone()))
        }
        ValueExpr::SampleUniform { low, high, units } => {
            let dist = Uniform::new(*low, *high)
                .expect("low must be < high; upstream validation guarantees this");
            let draw = dist.sample(rng);
            Ok(Quantity::new(decimal_from_f64(draw), units.clone()))
        }
        ValueExpr::Get { stream, of_substance, as_units, temporal } => {
            let (store, key) = scope.ok_or_else(|| ScopeError::NoActiveScope {
                operation: format!("get {stream} outside a substance scope"),
            })?;
            let read_key = match of_substance {
                Some(substance) => UseKey::new(key.application.clone(), substance.clone()),
                None => key.clone(),
            };
            let raw = match temporal {
                Temporal::Current => store.read_stream(&read_key, *stream)?,
                Temporal::Prior => store.read_prior_stream(&read_key, *stream)?,
            };
            match as_units {
                Some(target) if *target != raw.units => {
                    let map = store.context_snapshot(&read_key)?;
                    let ctx = ContextStack::new(&map);
                    convert(&raw, target, &ctx, *temporal)
                }
                _ => Ok(raw),
            }
        }
    }
}

/// `Decimal::from_f64_retain` loses no precision for the finite f64 draws
/// `rand_distr` produces; `unwrap_or(Decimal::ZERO)` only triggers on NaN/inf,
/// which a normal/uniform distribution never yields.
fn decimal_from_f64(v: f64) -> Decimal {
    Decimal::from_f64_retain(v).unwrap_or(Decimal::ZERO)
}
