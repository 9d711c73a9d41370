//! The state-getter context stack (spec §4.1, design note in spec §9).
//!
//! Unit conversion needs outside information — population, volume, GHG
//! intensity, and so on — that the converter itself doesn't own. Rather
//! than threading that information through every call, the engine exposes
//! it through a small pluggable trait (`ContextSource`) plus a stack of
//! temporary overrides (`ContextStack`) that a computation can push before
//! it runs and must pop afterwards. Frames are balanced by construction: a
//! `ContextGuard` pops on drop, so an early `?` return can never leak one.

use crate::error::{InternalError, SimError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// The context channels a conversion may need to read (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextChannel {
    SubstanceConsumption,
    EnergyIntensity,
    AmortizedUnitVolume,
    Population,
    YearsElapsed,
    GhgConsumption,
    EnergyConsumption,
    Volume,
    PopulationChange,
}

/// Whether a channel read refers to the current step or the prior year
/// (spec §4.1: "get X as Y during prior year").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Temporal {
    Current,
    Prior,
}

/// Supplies context values. Implemented by the stream store for the common
/// case, and by ad-hoc maps for tests.
pub trait ContextSource {
    fn get_context(&self, channel: ContextChannel, when: Temporal) -> Option<Decimal>;
}

impl ContextSource for HashMap<(ContextChannel, Temporal), Decimal> {
    fn get_context(&self, channel: ContextChannel, when: Temporal) -> Option<Decimal> {
        self.get(&(channel, when)).copied()
    }
}

/// A single pushed override frame.
#[derive(Debug, Clone, Default)]
pub struct ContextFrame {
    overrides: HashMap<(ContextChannel, Temporal), Decimal>,
}

impl ContextFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, channel: ContextChannel, when: Temporal, value: Decimal) -> Self {
        self.overrides.insert((channel, when), value);
        self
    }
}

/// A stack of override frames sitting in front of a base [`ContextSource`].
///
/// `push`/`pop` must balance; an unbalanced `pop` (more pops than pushes)
/// is an [`InternalError`], not a silently-ignored no-op, since it would
/// otherwise mask a bug in whichever computation forgot to push its frame.
pub struct ContextStack<'a> {
    base: &'a dyn ContextSource,
    frames: Vec<ContextFrame>,
}

impl<'a> ContextStack<'a> {
    pub fn new(base: &'a dyn ContextSource) -> Self {
        Self {
            base,
            frames: Vec::new(),
        }
    }

    pub fn push(&mut self, frame: ContextFrame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> SimResultUnit {
        if self.frames.pop().is_none() {
            return Err(InternalError::UnbalancedContextFrame.into());
        }
        Ok(())
    }

    /// Runs `f` with `frame` pushed, guaranteeing the frame is popped
    /// afterwards even if `f` returns an error.
    pub fn with_frame<T>(
        &mut self,
        frame: ContextFrame,
        f: impl FnOnce(&mut Self) -> Result<T, SimError>,
    ) -> Result<T, SimError> {
        self.push(frame);
        let result = f(self);
        self.pop()?;
        result
    }

    pub fn get(&self, channel: ContextChannel, when: Temporal) -> Option<Decimal> {
        for frame in self.frames.iter().rev() {
            if let Some(v) = frame.overrides.get(&(channel, when)) {
                return Some(*v);
            }
        }
        self.base.get_context(channel, when)
    }
}

type SimResultUnit = Result<(), SimError>;

#[cfg(test)]
mod test {
    use super::*;

    struct Empty;
    impl ContextSource for Empty {
        fn get_context(&self, _channel: ContextChannel, _when: Temporal) -> Option<Decimal> {
            None
        }
    }

    #[test]
    fn override_shadows_base_and_pop_restores() {
        let empty = Empty;
        let mut stack = ContextStack::new(&empty);
        assert_eq!(stack.get(ContextChannel::Population, Temporal::Current), None);

        let frame = ContextFrame::new().with(
            ContextChannel::Population,
            Temporal::Current,
            Decimal::from(42),
        );
        stack.push(frame);
        assert_eq!(
            stack.get(ContextChannel::Population, Temporal::Current),
            Some(Decimal::from(42))
        );
        stack.pop().unwrap();
        assert_eq!(stack.get(ContextChannel::Population, Temporal::Current), None);
    }

    #[test]
    fn unbalanced_pop_is_an_internal_error() {
        let empty = Empty;
        let mut stack = ContextStack::new(&empty);
        assert!(stack.pop().is_err());
    }
}
