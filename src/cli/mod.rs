//! Command line interface module
//!
//! Argument parsing, validation, and the runner that wires the registry client,
//! transfer backend and provisioner into a migration run.

pub mod args;
pub mod runner;

pub use args::{Args, Backend};
pub use runner::Runner;
