//! Command-line arguments.

use crate::config::Settings;
use clap::Parser;
use std::path::PathBuf;

/// Build a static index of variant-aware wheels
#[derive(Parser, Debug)]
#[command(name = "vindex")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to the index configuration
    #[arg(short, long, default_value = "index.toml")]
    pub config: PathBuf,

    /// Output directory (overrides `build-dir`)
    #[arg(long)]
    pub build_dir: Option<PathBuf>,

    /// Variant document cache directory (overrides `cache-dir`)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Number of packages built concurrently (overrides `jobs`)
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    pub jobs: Option<u16>,

    /// Do not scan the fallback index
    #[arg(long)]
    pub no_fallback: bool,

    /// Skip validation against the published JSON schemas
    #[arg(long)]
    pub no_remote_validation: bool,

    /// Remove the build directory before building (this also drops cached
    /// variant documents unless `cache-dir` points elsewhere)
    #[arg(long)]
    pub clean: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the file settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(build_dir) = &self.build_dir {
            // an explicit cache dir in the file is kept; otherwise it follows
            if settings.cache_dir == settings.build_dir {
                settings.cache_dir.clone_from(build_dir);
            }
            settings.build_dir.clone_from(build_dir);
        }
        if let Some(cache_dir) = &self.cache_dir {
            settings.cache_dir.clone_from(cache_dir);
        }
        if let Some(jobs) = self.jobs {
            settings.jobs = usize::from(jobs);
        }
        if self.no_fallback {
            settings.fallback_index = None;
        }
        if self.no_remote_validation {
            settings.validate_remote_schema = false;
        }
    }

    /// Log filter used when `RUST_LOG` is not set.
    pub fn default_log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
