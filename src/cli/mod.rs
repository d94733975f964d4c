//! CLI module for hybrid-retrieval
//!
//! Handles command-line argument parsing and verbosity control.

pub mod args;

pub use args::{Args, Commands, OutputFormat, Verbosity};
