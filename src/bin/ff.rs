//! Binary entry point for the `ff` CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Show the regex a pattern compiles to
//! ff regex '%(Y)/SST_%(Y)%(m)%(d).nc' --fix Y=2007
//!
//! # List matching files and their group matches
//! ff find /data '%(Y)/SST_%(Y)%(m)%(d).nc' --fix m=1,2,3 --relative
//!
//! # Generate a filename
//! ff make '%(Y)/SST_%(Y)%(m)%(d).nc' --fix Y=2007 --fix m=1 --fix d=15
//!
//! # Parse values out of a filename
//! ff parse '%(Y)/SST_%(Y)%(m)%(d).nc' 2007/SST_20070115.nc
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use filefinder::cli::{parse_fix_arg, run_find, run_make, run_parse, run_regex};
use filefinder::output::{emit_response, ErrorResponse};
use filefinder::{FinderConfig, FinderError, Fix, GroupKey, OutputErrorCode};

// ============================================================================
// CLI Structure
// ============================================================================

/// Find files whose names follow a structured pattern.
///
/// All output is JSON.
#[derive(Parser, Debug)]
#[command(name = "ff", version, about = "Find files by filename pattern")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Treat text outside groups as a regex.
    #[arg(long, global = true)]
    use_regex: bool,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the regex a pattern compiles to.
    Regex {
        pattern: String,
        /// Fix a group: `KEY=VALUE[,VALUE...]`. Repeatable.
        #[arg(long, value_parser = parse_fix_arg)]
        fix: Vec<(GroupKey, Fix)>,
    },
    /// Scan a directory and list matching files.
    Find {
        root: PathBuf,
        pattern: String,
        /// Fix a group: `KEY=VALUE[,VALUE...]`. Repeatable.
        #[arg(long, value_parser = parse_fix_arg)]
        fix: Vec<(GroupKey, Fix)>,
        /// Print paths relative to the root.
        #[arg(long)]
        relative: bool,
        /// Walk the whole tree instead of pruning directories level by level.
        #[arg(long)]
        scan_everything: bool,
        /// Maximum depth when scanning everything.
        #[arg(long)]
        max_depth: Option<usize>,
        /// Follow symbolic links.
        #[arg(long)]
        follow_links: bool,
    },
    /// Generate a filename from fixed values.
    Make {
        pattern: String,
        /// Prefix the filename with this directory.
        #[arg(long)]
        root: Option<PathBuf>,
        /// Fix a group: `KEY=VALUE[,VALUE...]`. Repeatable.
        #[arg(long, value_parser = parse_fix_arg, required = true)]
        fix: Vec<(GroupKey, Fix)>,
    },
    /// Parse the values of every group out of a filename.
    Parse { pattern: String, filename: String },
}

// ============================================================================
// Main
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::new(&err);

            // Errors go to stdout as JSON, like every other response.
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber. `RUST_LOG` takes precedence over `--log-level`.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn execute(cli: Cli) -> Result<(), FinderError> {
    let config = FinderConfig::default().with_use_regex(cli.global.use_regex);
    let mut stdout = io::stdout();

    match cli.command {
        Command::Regex { pattern, fix } => {
            let response = run_regex(&pattern, fix, config)?;
            emit_response(&response, &mut stdout)?;
        }
        Command::Find {
            root,
            pattern,
            fix,
            relative,
            scan_everything,
            max_depth,
            follow_links,
        } => {
            let mut config = config
                .with_scan_everything(scan_everything)
                .with_follow_links(follow_links);
            if let Some(depth) = max_depth {
                config = config.with_max_depth(depth);
            }
            let response = run_find(&root, &pattern, fix, config, relative)?;
            emit_response(&response, &mut stdout)?;
        }
        Command::Make { pattern, root, fix } => {
            let response = run_make(&pattern, root.as_deref(), fix, config)?;
            emit_response(&response, &mut stdout)?;
        }
        Command::Parse { pattern, filename } => {
            let response = run_parse(&pattern, &filename, config)?;
            emit_response(&response, &mut stdout)?;
        }
    }
    Ok(())
}
