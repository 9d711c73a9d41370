//! Longitudinal stock-flow simulation engine for refrigerant substances
//! under Montreal Protocol / Kigali Amendment policy analysis.
//!
//! This crate consumes an already-parsed program tree (see [`program`]) and
//! runs it: [`interpreter`] executes one year's commands against a
//! [`state::store::StreamStore`], [`recalc`] keeps population/sales/
//! consumption derived quantities consistent after every edit, [`scenario`]
//! and [`trial`] drive a scenario's policies and Monte Carlo trials across
//! years, and [`result`]/[`report`] capture and export the results.

pub mod error;
pub mod interpreter;
pub mod program;
pub mod quantity;
pub mod recalc;
pub mod report;
pub mod result;
pub mod sampling;
pub mod scenario;
pub mod sorted_vec_map;
pub mod state;
pub mod trial;
