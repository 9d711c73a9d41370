//! Cross-stream / cross-substance displacement (spec §4.6 "Displacement
//! semantics").
//!
//! A reduction in one substance's stream can be configured to deposit into
//! another stream of the same substance, or into another substance
//! entirely. Recycling (`recover`) never supports displacement at all — any
//! `displacing` clause on a `recover` command is rejected outright.

use crate::error::{ConfigError, SimResult, UnsupportedError};
use crate::program::command::DisplacementTarget;
use crate::recalc;
use crate::state::store::StreamStore;
use crate::state::{StreamName, Substream, UseKey};
use rust_decimal::Decimal;

fn substream_for(stream: StreamName, scope: &str) -> SimResult<Substream> {
    match stream {
        StreamName::Domestic => Ok(Substream::Domestic),
        StreamName::Import => Ok(Substream::Import),
        StreamName::Export => Ok(Substream::Export),
        other => Err(ConfigError::Other(format!(
            "{other} is not a valid displacement target stream in {scope}"
        ))
        .into()),
    }
}

/// Moves `reduction` (a kg delta) out of `origin` and into `target`. The
/// deposit always lands in the target's domestic substream when the target
/// is a different substance (matching spec §8 S3's `sub_b.domestic`); when
/// the target is a stream on the same substance, it lands in that stream.
///
/// Runs population→consumption recalc on whichever use-key received the
/// deposit, per spec §4.6: displacement bypasses standard (sales)
/// propagation on the receiving side.
pub fn displace(
    store: &mut StreamStore,
    origin: &UseKey,
    target: &DisplacementTarget,
    reduction: Decimal,
) -> SimResult<()> {
    let (target_key, into_substream) = match target {
        DisplacementTarget::Substance(name) => {
            (UseKey::new(origin.application.clone(), name.clone()), Substream::Domestic)
        }
        DisplacementTarget::Stream(stream) => {
            (origin.clone(), substream_for(*stream, &origin.to_string())?)
        }
    };

    let delta_kg = reduction;

    let current = match into_substream {
        Substream::Domestic => store.get(&target_key)?.streams.domestic.value,
        Substream::Import => store.get(&target_key)?.streams.import.value,
        Substream::Export => store.get(&target_key)?.streams.export.value,
    };
    store.set_substream_kg(&target_key, into_substream, current + delta_kg)?;
    recalc::propagate_from_population(store, &target_key)?;
    Ok(())
}

/// Recycling displacement is unconditionally rejected (spec §4.6:
/// "Substance-target displacement in recycling is not supported").
pub fn reject_recycling_displacement(target: &DisplacementTarget) -> SimResult<()> {
    let name = match target {
        DisplacementTarget::Substance(name) => name.clone(),
        DisplacementTarget::Stream(stream) => stream.to_string(),
    };
    Err(UnsupportedError::RecyclingDisplacement { target: name }.into())
}
