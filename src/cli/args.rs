//! Command-line argument parsing
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::strategy::StrategyKind;

/// hybrid-retrieval - dense + sparse search with per-query alpha tuning
#[derive(Parser, Debug)]
#[command(name = "hybrid-retrieval")]
#[command(author = "Jerome (Kubashen) Naidoo")]
#[command(version)]
#[command(about = "Hybrid dense + sparse retrieval with dynamic alpha tuning", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: default (warnings), -v (info), -vv (debug), -vvv (trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a ranked search against a collection
    Search {
        /// Query text
        #[arg(value_name = "QUERY")]
        query: String,

        /// Collection (Qdrant collection / Elasticsearch index)
        #[arg(long)]
        collection: String,

        /// Number of merged results to return
        #[arg(long, default_value_t = 10)]
        top_k: usize,

        /// Retrieval strategy: hybrid or dense
        #[arg(long, default_value = "hybrid", value_parser = parse_strategy)]
        strategy: StrategyKind,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Display current configuration
    Config {
        /// Write the default configuration to the config path
        #[arg(long)]
        init: bool,
    },
}

fn parse_strategy(value: &str) -> Result<StrategyKind, String> {
    value.parse::<StrategyKind>().map_err(|e| e.to_string())
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Normal,
    Verbose,
    VeryVerbose,
    Trace,
}

/// How search results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        match self.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            2 => Verbosity::VeryVerbose,
            _ => Verbosity::Trace,
        }
    }
}

impl Verbosity {
    /// Default log filter when no environment override is set
    pub fn log_filter(&self) -> &'static str {
        match self {
            Verbosity::Normal => "hybrid_retrieval=warn",
            Verbosity::Verbose => "hybrid_retrieval=info,warn",
            Verbosity::VeryVerbose => "hybrid_retrieval=debug,info",
            Verbosity::Trace => "hybrid_retrieval=trace,debug",
        }
    }
}
