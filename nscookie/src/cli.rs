//! # Cli
//!
//! Command line interface of the probe reporter.

use std::{path::PathBuf, str::FromStr};

use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use log::LevelFilter;

#[derive(ValueEnum, Clone, Copy, Debug)]
pub(crate) enum Format {
    Text,
    Json,
}

/// Report whether a kernel supports netns cookie attribution, and with what
/// field offsets.
#[derive(Parser, Debug)]
#[command(name = "nscookie", version)]
pub(crate) struct Cli {
    #[arg(
        long,
        help = "Path to a BTF file to inspect instead of the running kernel's (/sys/kernel/btf/vmlinux)"
    )]
    pub(crate) btf: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = Format::Text, help = "Output format")]
    pub(crate) format: Format,
    #[arg(
        long,
        default_value = "info",
        help = "Log level (error, warn, info, debug, trace)"
    )]
    pub(crate) log_level: String,
}

impl Cli {
    pub(crate) fn log_level(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|e| anyhow!("invalid log level {}: {e}", self.log_level))
    }
}
