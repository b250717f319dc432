//! Ticket flow mining CLI library.
//!
//! This crate provides the `pm` command-line interface.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
