//! Driftwatch CLI library.
//!
//! Indexes a local checkout, verifies documentation claims against it and
//! reports stored results. The binary in `main.rs` is a thin dispatcher over
//! the `commands` module.

pub mod checkout;
pub mod claims;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::{Cli, Command};
pub use config::Config;
pub use error::{CliError, Result};
pub use output::Formatter;
