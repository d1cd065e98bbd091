//! Shared test harness modules for the `ogs` CLI.
#![expect(
    clippy::panic,
    reason = "Tests assert panic branches to surface unexpected CLI outcomes"
)]

use super::*;

mod helpers;
mod stage_unit;
mod steps;
