//! End-to-end scenario runs exercising each command family together,
//! against hand-derived expected figures rather than a golden file — the
//! way the teacher's own integration suite asserts on concrete backtest
//! numbers instead of snapshotting.

mod common;

use common::{policy, program, scenario, substance};
use kigali_sim::program::command::{Command, DisplacementTarget};
use kigali_sim::program::expr::ValueExpr;
use kigali_sim::program::year_matcher::YearMatcher;
use kigali_sim::program::Stanza;
use kigali_sim::quantity::{Quantity, Units};
use kigali_sim::scenario::ScenarioRunner;
use kigali_sim::state::{Stage, StreamName, Substream};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn rng() -> StdRng {
    StdRng::seed_from_u64(1)
}

fn lit(value: Decimal, units: Units) -> ValueExpr {
    ValueExpr::Literal(Quantity::new(value, units))
}

/// A fixed domestic charge with a flat GHG intensity, grown by a flat
/// percentage in year two. Mirrors the simplest single-substance, no-policy
/// scenario family (spec §8 "S1"/"S2").
#[test]
fn flat_domestic_charge_grows_by_a_fixed_percentage() {
    let sub = substance(
        "HFC-134a",
        vec![
            Command::Enable { stream: StreamName::Domestic },
            Command::InitialCharge { substream: Substream::Domestic, value: lit(dec!(1), Units::kg_per_unit()) },
            Command::Set {
                stream: StreamName::Domestic,
                value: lit(dec!(100), Units::MT),
                year: YearMatcher::exact(2025),
            },
            Command::Equals {
                ghg_intensity: Some(lit(dec!(0.005), Units::tco2e_per_kg())),
                energy_intensity: None,
                year: YearMatcher::any(),
            },
            Command::Change {
                stream: StreamName::Domestic,
                delta: lit(dec!(0.1), Units::PERCENT),
                per_year: false,
                year: YearMatcher::exact(2026),
            },
        ],
    );
    let prog = program(
        Stanza {
            applications: vec![kigali_sim::program::ApplicationDef {
                name: common::APPLICATION.to_string(),
                substances: vec![sub],
            }],
        },
        vec![],
        vec![scenario("BAU", vec![], 2025, 2026)],
    );

    let runner = ScenarioRunner::new(&prog, "BAU").unwrap();
    let mut rng = rng();
    let records = runner.run_trial(0, &mut rng).unwrap();
    assert_eq!(records.len(), 2);

    let y1 = records.iter().find(|r| r.year == 2025).unwrap();
    assert_eq!(y1.domestic_kg, dec!(100000));
    assert_eq!(y1.population_units, dec!(100000));
    assert_eq!(y1.domestic_consumption_tco2e, dec!(500));

    let y2 = records.iter().find(|r| r.year == 2026).unwrap();
    assert_eq!(y2.domestic_kg, dec!(110000));
    assert_eq!(y2.domestic_consumption_tco2e, dec!(550));
}

/// A cap on one substance's domestic stream displaces the reduction into a
/// second substance's domestic stream (spec §8 "S3" family, with round
/// numbers chosen so the transfer can be checked by hand).
#[test]
fn capping_one_substance_displaces_into_another() {
    let sub_a = substance(
        "sub_a",
        vec![
            Command::Enable { stream: StreamName::Domestic },
            Command::InitialCharge { substream: Substream::Domestic, value: lit(dec!(10), Units::kg_per_unit()) },
            Command::Set {
                stream: StreamName::Domestic,
                value: lit(dec!(300), Units::KG),
                year: YearMatcher::exact(2025),
            },
            Command::Cap {
                stream: StreamName::Domestic,
                value: lit(dec!(5), Units::UNIT),
                displacing: Some(DisplacementTarget::Substance("sub_b".to_string())),
                year: YearMatcher::exact(2025),
            },
        ],
    );
    let sub_b = substance(
        "sub_b",
        vec![
            Command::Enable { stream: StreamName::Domestic },
            Command::InitialCharge { substream: Substream::Domestic, value: lit(dec!(20), Units::kg_per_unit()) },
            Command::Set {
                stream: StreamName::Domestic,
                value: lit(dec!(200), Units::KG),
                year: YearMatcher::exact(2025),
            },
        ],
    );
    let prog = program(
        kigali_sim::program::Stanza {
            applications: vec![kigali_sim::program::ApplicationDef {
                name: common::APPLICATION.to_string(),
                substances: vec![sub_a, sub_b],
            }],
        },
        vec![],
        vec![scenario("BAU", vec![], 2025, 2025)],
    );

    let runner = ScenarioRunner::new(&prog, "BAU").unwrap();
    let mut rng = rng();
    let records = runner.run_trial(0, &mut rng).unwrap();
    assert_eq!(records.len(), 2);

    let a = records.iter().find(|r| r.substance == "sub_a").unwrap();
    let b = records.iter().find(|r| r.substance == "sub_b").unwrap();
    // 300kg capped to 5 units * 10 kg/unit = 50kg; the 250kg reduction moves to sub_b.
    assert_eq!(a.domestic_kg, dec!(50));
    assert_eq!(b.domestic_kg, dec!(450));
}

/// Recharge demand computed against last year's population feeds a
/// recharge-stage recovery/yield pass (spec §8 "S4" family).
#[test]
fn recharge_recovery_recycles_a_share_of_recharge_volume() {
    let sub = substance(
        "HFC-134a",
        vec![
            Command::Enable { stream: StreamName::Domestic },
            Command::InitialCharge { substream: Substream::Domestic, value: lit(dec!(1), Units::kg_per_unit()) },
            Command::Set {
                stream: StreamName::Domestic,
                value: lit(dec!(1000), Units::KG),
                year: YearMatcher::exact(2025),
            },
            Command::Equals {
                ghg_intensity: Some(lit(dec!(0.01), Units::tco2e_per_kg())),
                energy_intensity: None,
                year: YearMatcher::any(),
            },
            Command::Recharge {
                population: lit(dec!(0.5), Units::PERCENT),
                intensity: lit(dec!(1), Units::kg_per_unit()),
                year: YearMatcher::exact(2026),
            },
            Command::Recover {
                amount: lit(dec!(0.5), Units::PERCENT),
                stage: Stage::Recharge,
                yield_rate: lit(dec!(1.0), Units::PERCENT),
                induction: None,
                displacing: None,
                year: YearMatcher::exact(2026),
            },
        ],
    );
    let prog = program(
        kigali_sim::program::Stanza {
            applications: vec![kigali_sim::program::ApplicationDef {
                name: common::APPLICATION.to_string(),
                substances: vec![sub],
            }],
        },
        vec![],
        vec![scenario("BAU", vec![], 2025, 2026)],
    );

    let runner = ScenarioRunner::new(&prog, "BAU").unwrap();
    let mut rng = rng();
    let records = runner.run_trial(0, &mut rng).unwrap();
    let y2 = records.iter().find(|r| r.year == 2026).unwrap();
    // prior equipment (1000 units) * 50% recharge = 500 units * 1kg/unit = 500kg recharge volume
    // 500kg * 50% recovery * 100% yield = 250kg recycled
    assert_eq!(y2.recycle_kg, dec!(250));
    assert_eq!(y2.recycle_consumption_tco2e, dec!(2.5));
}

/// `replace` moves a share of one substance's domestic stream onto another
/// substance entirely, unconditionally (recycling's `displacing` clause is
/// rejected outright, but `replace`'s is not — spec §8 "S5" family).
#[test]
fn replace_moves_a_percentage_of_one_substance_into_another() {
    let sub_a = substance(
        "sub_a",
        vec![
            Command::Enable { stream: StreamName::Domestic },
            Command::InitialCharge { substream: Substream::Domestic, value: lit(dec!(1), Units::kg_per_unit()) },
            Command::Set {
                stream: StreamName::Domestic,
                value: lit(dec!(1000), Units::KG),
                year: YearMatcher::exact(2025),
            },
            Command::Equals {
                ghg_intensity: Some(lit(dec!(2), Units::tco2e_per_kg())),
                energy_intensity: None,
                year: YearMatcher::any(),
            },
            Command::Replace {
                amount: lit(dec!(1.0), Units::PERCENT),
                stream: StreamName::Domestic,
                target_substance: "sub_b".to_string(),
                year: YearMatcher::exact(2025),
            },
        ],
    );
    let sub_b = substance(
        "sub_b",
        vec![
            Command::Enable { stream: StreamName::Domestic },
            Command::InitialCharge { substream: Substream::Domestic, value: lit(dec!(1), Units::kg_per_unit()) },
            Command::Equals {
                ghg_intensity: Some(lit(dec!(1), Units::tco2e_per_kg())),
                energy_intensity: None,
                year: YearMatcher::any(),
            },
        ],
    );
    let prog = program(
        kigali_sim::program::Stanza {
            applications: vec![kigali_sim::program::ApplicationDef {
                name: common::APPLICATION.to_string(),
                substances: vec![sub_a, sub_b],
            }],
        },
        vec![],
        vec![scenario("BAU", vec![], 2025, 2025)],
    );

    let runner = ScenarioRunner::new(&prog, "BAU").unwrap();
    let mut rng = rng();
    let records = runner.run_trial(0, &mut rng).unwrap();

    let a = records.iter().find(|r| r.substance == "sub_a").unwrap();
    let b = records.iter().find(|r| r.substance == "sub_b").unwrap();
    assert_eq!(a.domestic_kg, dec!(0));
    assert_eq!(a.domestic_consumption_tco2e, dec!(0));
    assert_eq!(b.domestic_kg, dec!(1000));
    assert_eq!(b.domestic_consumption_tco2e, dec!(1000));
}

/// A named policy's commands append after the default stanza's, in listed
/// order, rather than replacing them (spec §4.8 step 2).
#[test]
fn a_policy_appends_commands_after_the_default_stanza() {
    let default_sub = substance(
        "HFC-134a",
        vec![
            Command::Enable { stream: StreamName::Domestic },
            Command::InitialCharge { substream: Substream::Domestic, value: lit(dec!(1), Units::kg_per_unit()) },
            Command::Set {
                stream: StreamName::Domestic,
                value: lit(dec!(1000), Units::KG),
                year: YearMatcher::any(),
            },
        ],
    );
    let policy_sub = substance(
        "HFC-134a",
        vec![Command::Change {
            stream: StreamName::Domestic,
            delta: lit(dec!(500), Units::KG),
            per_year: false,
            year: YearMatcher::any(),
        }],
    );
    let prog = program(
        kigali_sim::program::Stanza {
            applications: vec![kigali_sim::program::ApplicationDef {
                name: common::APPLICATION.to_string(),
                substances: vec![default_sub],
            }],
        },
        vec![policy("ambitious", vec![policy_sub])],
        vec![scenario("ambitious_scenario", vec!["ambitious".to_string()], 2025, 2025)],
    );

    let runner = ScenarioRunner::new(&prog, "ambitious_scenario").unwrap();
    let mut rng = rng();
    let records = runner.run_trial(0, &mut rng).unwrap();
    assert_eq!(records[0].domestic_kg, dec!(1500));
}
