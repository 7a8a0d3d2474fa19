//! CLI module for the traynotes application
//!
//! This module handles the command-line interface for interacting with the
//! note store and the reminder scheduler.

mod app;
mod args;

pub use app::App;
pub use args::Cli;
