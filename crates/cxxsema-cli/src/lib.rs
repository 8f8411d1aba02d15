//! cxxsema command-line interface.
//!
pub mod discovery;
pub mod output;
pub mod pipeline;

use std::collections::HashSet;

use cxxsema_error::Result;
use cxxsema_resolver::Config;

pub use output::{OutputFormat, Record, render};
pub use pipeline::{FileReport, process_files};

/// Extensions picked up when walking directories.
pub const CPP_EXTENSIONS: &[&str] = &["cpp", "cc", "cxx", "hpp", "hh", "h"];

/// Options for running cxxsema.
#[derive(Debug, Clone, Default)]
pub struct CxxsemaOptions {
    pub files: Vec<String>,
    pub dirs: Vec<String>,
    /// TOML file with the target model and resolver limits.
    pub target: Option<String>,
    pub format: OutputFormat,
    pub sequential: bool,
    pub problems_only: bool,
}

/// Main entry point
pub fn run_main(opts: &CxxsemaOptions) -> Result<String> {
    let config = match &opts.target {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let extensions: HashSet<&str> = CPP_EXTENSIONS.iter().copied().collect();

    let files = discovery::discover_files(opts, &extensions)?;
    let reports = process_files(opts, &files, &config);
    for report in &reports {
        if let Some(error) = &report.error {
            eprintln!("error: {}: {}", report.file, error);
        }
    }
    render(&reports, opts.format, opts.problems_only)
}
