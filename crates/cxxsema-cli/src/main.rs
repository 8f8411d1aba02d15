use std::time::Instant;

use clap::ArgGroup;
use clap::Parser;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[cfg(target_env = "msvc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use cxxsema_cli::{CxxsemaOptions, OutputFormat, run_main};
use cxxsema_error::Result;

#[derive(Parser, Debug)]
#[command(
    name = "cxxsema",
    about = "cxxsema: static types of C++ unary expressions",
    version,
    group = ArgGroup::new("inputs").required(true).multiple(true).args(["files", "dirs"])
)]
pub struct Cli {
    /// Individual files to analyze (repeatable)
    #[arg(
        short = 'f',
        long = "file",
        value_name = "FILE",
        num_args = 1..,
        action = clap::ArgAction::Append
    )]
    files: Vec<String>,

    /// Directories to scan recursively (repeatable)
    #[arg(
        short = 'd',
        long = "dir",
        value_name = "DIR",
        num_args = 1..,
        action = clap::ArgAction::Append
    )]
    dirs: Vec<String>,

    /// TOML file describing the target (sizeof/typeid types, depth limit)
    #[arg(long, value_name = "FILE")]
    target: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Analyze files one at a time
    #[arg(long, default_value_t = false)]
    sequential: bool,

    /// Print only expressions whose type is a problem
    #[arg(long, default_value_t = false)]
    problems_only: bool,

    /// Output file path (writes to file instead of stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<String>,
}

pub fn run(args: Cli) -> Result<()> {
    let total_start = Instant::now();

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }

    let opts = CxxsemaOptions {
        files: args.files,
        dirs: args.dirs,
        target: args.target,
        format: args.format,
        sequential: args.sequential,
        problems_only: args.problems_only,
    };

    let output = run_main(&opts)?;
    if let Some(ref path) = args.output {
        std::fs::write(path, &output)?;
        tracing::info!(path, "output written");
    } else {
        print!("{output}");
    }

    let total_secs = total_start.elapsed().as_secs_f64();
    tracing::info!(total_secs, "complete");
    Ok(())
}

pub fn main() -> Result<()> {
    let args = Cli::parse();
    run(args)
}
