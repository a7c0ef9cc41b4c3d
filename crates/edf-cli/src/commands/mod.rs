//! Subcommands of the `edf` binary.

pub mod config;
pub mod documents;
pub mod evaluate;
pub mod extract;
pub mod output;
