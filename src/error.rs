//! Error taxonomy for the simulation engine.
//!
//! Mirrors the shape of the teacher's error module: one top-level enum that
//! wraps per-concern sub-enums via `#[error(transparent)] #[from]`, so call
//! sites can `?` a `ScopeError` or a `UnitError` straight into a `SimResult`.

use thiserror::Error;

pub type SimResult<T> = Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Duplicate(#[from] DuplicateError),

    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error(transparent)]
    Unit(#[from] UnitError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Unsupported(#[from] UnsupportedError),

    #[error(transparent)]
    Internal(#[from] InternalError),

    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("failed to decode program tree")]
    Serde(#[from] serde_json::Error),

    #[error("result table error")]
    Polars(#[from] polars::error::PolarsError),
}

/// Syntactic errors from the external parser. The parser itself is out of
/// scope for this crate (spec §1); this variant exists only so that a
/// hosting CLI with its own parser can report through the same taxonomy.
#[derive(Debug, Error)]
#[error("(line {line}, col {col}): {message}")]
pub struct ParseError {
    pub line: u32,
    pub col: u32,
    pub message: String,
}

/// A scenario, policy, application, or substance name collided with an
/// existing one within the same stanza.
#[derive(Debug, Error)]
#[error("duplicate {kind} {name:?} in {context}")]
pub struct DuplicateError {
    pub kind: DuplicateKind,
    pub name: String,
    pub context: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKind {
    Scenario,
    Policy,
    Application,
    Substance,
}

impl std::fmt::Display for DuplicateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DuplicateKind::Scenario => "scenario",
            DuplicateKind::Policy => "policy",
            DuplicateKind::Application => "application",
            DuplicateKind::Substance => "substance",
        };
        f.write_str(s)
    }
}

/// Reference to an application/substance that doesn't exist, or an
/// operation attempted outside of a valid scope.
#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("unknown application {application:?}")]
    UnknownApplication { application: String },

    #[error("unknown substance {substance:?} in application {application:?}")]
    UnknownSubstance {
        application: String,
        substance: String,
    },

    #[error("no active scope for operation {operation}")]
    NoActiveScope { operation: String },

    #[error("unknown policy {0:?}")]
    UnknownPolicy(String),

    #[error("unknown scenario {0:?}")]
    UnknownScenario(String),
}

/// Unit conversion failures.
#[derive(Debug, Error)]
#[error("cannot convert from {from} to {to}{context}")]
pub struct UnitError {
    pub from: String,
    pub to: String,
    pub context: String,
}

impl UnitError {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            context: String::new(),
        }
    }

    pub fn missing_context(from: impl Into<String>, to: impl Into<String>, channel: &str) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            context: format!(" (missing context channel: {channel})"),
        }
    }
}

/// Semantic misconfiguration: a command is syntactically fine but violates
/// an invariant spec §4 requires be rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("zero initial charge for unit-based set on stream {stream} in {scope}")]
    ZeroInitialCharge { stream: String, scope: String },

    #[error("stream {stream} in {scope} is disabled and cannot accept a non-zero value")]
    DisabledStream { stream: String, scope: String },

    #[error("cap/floor target stream {stream} in {scope} is disabled")]
    DisabledCapTarget { stream: String, scope: String },

    #[error("invalid command configuration: {0}")]
    Other(String),
}

/// A feature explicitly rejected by the spec.
#[derive(Debug, Error)]
pub enum UnsupportedError {
    #[error("substance-target displacement in recycling is not supported (target: {target})")]
    RecyclingDisplacement { target: String },

    #[error("unsupported feature: {0}")]
    Other(String),
}

/// Invariant violations — bugs, not user errors.
#[derive(Debug, Error)]
pub enum InternalError {
    #[error("NaN encountered while computing {0}")]
    Nan(String),

    #[error("unbalanced context frame pop")]
    UnbalancedContextFrame,

    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}
