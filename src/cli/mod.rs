// CLI module for chapsplit
//
// Command-line front end over the library; only compiled into the binary.

pub mod commands;
pub mod config;
pub mod output;

pub use config::{Commands, Config};
pub use output::OutputFormatter;
