//! Shared fixture builders for the scenario-level integration tests, the
//! way the teacher's `tests/common` provides strategy/data-provider setup
//! for its own integration suite.

use kigali_sim::program::command::Command;
use kigali_sim::program::{ApplicationDef, PolicyDef, Program, ScenarioDef, Stanza, SubstanceDef, Variables};

pub const APPLICATION: &str = "test";

pub fn substance(name: &str, commands: Vec<Command>) -> SubstanceDef {
    SubstanceDef { name: name.to_string(), commands }
}

pub fn default_stanza(substances: Vec<SubstanceDef>) -> Stanza {
    Stanza {
        applications: vec![ApplicationDef { name: APPLICATION.to_string(), substances }],
    }
}

pub fn policy(name: &str, substances: Vec<SubstanceDef>) -> PolicyDef {
    PolicyDef { name: name.to_string(), stanza: default_stanza(substances) }
}

pub fn scenario(name: &str, policies: Vec<String>, year_start: i32, year_end: i32) -> ScenarioDef {
    ScenarioDef { name: name.to_string(), policies, year_start, year_end, trials: 1 }
}

pub fn program(
    default: Stanza,
    policies: Vec<PolicyDef>,
    scenarios: Vec<ScenarioDef>,
) -> Program {
    Program {
        default,
        policies,
        scenarios,
        variables: Variables::default(),
        about: None,
    }
}
