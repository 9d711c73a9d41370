//! In-memory representation of the parsed program (spec §2 "Program AST",
//! §6 "Program input").
//!
//! The surface DSL grammar and its parser are out of scope (spec §1); this
//! module only defines the tree the interpreter consumes, assembled by an
//! external collaborator (or, for this crate's own tests, constructed
//! directly or decoded from JSON via serde).

pub mod command;
pub mod expr;
pub mod year_matcher;

use crate::error::{DuplicateError, DuplicateKind, SimResult};
use command::Command;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One substance's command list within a stanza.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SubstanceDef {
    pub name: String,
    pub commands: Vec<Command>,
}

/// One application's substances within a stanza.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApplicationDef {
    pub name: String,
    pub substances: Vec<SubstanceDef>,
}

impl ApplicationDef {
    pub fn substance(&self, name: &str) -> Option<&SubstanceDef> {
        self.substances.iter().find(|s| s.name == name)
    }
}

/// A stanza: the `default` program or a named `policy`, each an ordered
/// list of applications (spec §6 "Program input").
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Stanza {
    pub applications: Vec<ApplicationDef>,
}

impl Stanza {
    pub fn application(&self, name: &str) -> Option<&ApplicationDef> {
        self.applications.iter().find(|a| a.name == name)
    }

    /// Validates that application names, and substance names within each
    /// application, are unique (spec §6 "Uniqueness").
    pub fn validate_uniqueness(&self, context: &str) -> SimResult<()> {
        let mut seen_apps = HashMap::new();
        for app in &self.applications {
            if seen_apps.insert(app.name.clone(), ()).is_some() {
                return Err(DuplicateError {
                    kind: DuplicateKind::Application,
                    name: app.name.clone(),
                    context: context.to_string(),
                }
                .into());
            }
            let mut seen_subs = HashMap::new();
            for sub in &app.substances {
                if seen_subs.insert(sub.name.clone(), ()).is_some() {
                    return Err(DuplicateError {
                        kind: DuplicateKind::Substance,
                        name: sub.name.clone(),
                        context: format!("{context}::{}", app.name),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
}

/// A named policy stanza, applied to the default via `using … then …`
/// (spec §4.8 step 2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDef {
    pub name: String,
    pub stanza: Stanza,
}

/// One entry in the `simulations` stanza (spec §6 "Program input").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDef {
    pub name: String,
    pub policies: Vec<String>,
    pub year_start: i32,
    pub year_end: i32,
    pub trials: u32,
}

/// Global variable definitions, set by top-level `define` commands outside
/// any application (spec §4.6 `define`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Variables {
    pub values: HashMap<String, expr::ValueExpr>,
}

/// Free-form run metadata, carried through untouched (spec §6 `about`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AboutMeta {
    pub fields: HashMap<String, String>,
}

/// The whole parsed program (spec §6 "Program input").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub default: Stanza,
    pub policies: Vec<PolicyDef>,
    pub scenarios: Vec<ScenarioDef>,
    #[serde(default)]
    pub variables: Variables,
    #[serde(default)]
    pub about: Option<AboutMeta>,
}

impl Program {
    pub fn policy(&self, name: &str) -> Option<&PolicyDef> {
        self.policies.iter().find(|p| p.name == name)
    }

    pub fn scenario(&self, name: &str) -> Option<&ScenarioDef> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    /// Validates scenario/policy name uniqueness and each stanza's own
    /// application/substance uniqueness (spec §6 "Uniqueness").
    pub fn validate(&self) -> SimResult<()> {
        self.default.validate_uniqueness("default")?;

        let mut seen_policies = HashMap::new();
        for policy in &self.policies {
            if seen_policies.insert(policy.name.clone(), ()).is_some() {
                return Err(DuplicateError {
                    kind: DuplicateKind::Policy,
                    name: policy.name.clone(),
                    context: "policies".to_string(),
                }
                .into());
            }
            policy.stanza.validate_uniqueness(&format!("policy {:?}", policy.name))?;
        }

        let mut seen_scenarios = HashMap::new();
        for scenario in &self.scenarios {
            if seen_scenarios.insert(scenario.name.clone(), ()).is_some() {
                return Err(DuplicateError {
                    kind: DuplicateKind::Scenario,
                    name: scenario.name.clone(),
                    context: "simulations".to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}
