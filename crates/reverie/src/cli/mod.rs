//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the reverie binary.

mod commands;
mod simulate;

pub use commands::{Cli, Commands, SimulateArgs};
pub use simulate::run_simulation;
