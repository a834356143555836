//! # window-hider: The Main Entry Point
//!
//! This module handles Command Line Interface (CLI) parsing, logging initialization,
//! locating the capture-exclusion module, and dispatching to the test window or the doctor report.
//!
//! The harness never needs elevation: a process may always change the display affinity of its
//! own windows.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::{LevelFilter, error, info};
use simplelog::{Config, SimpleLogger};

use window_hider::doctor;
use window_hider::loader::default_candidates;

/// The primary Command Line Interface (CLI) configuration.
#[derive(Parser)]
#[command(name = "window-hider")]
#[command(about = "Test harness for the window-hider capture-exclusion module", long_about = None)]
struct Cli {
    /// What to run. Opens the test window when omitted.
    #[command(subcommand)]
    command: Option<Commands>,

    /// Try this module file before the default locations.
    ///
    /// Defaults, in order: next to this executable, the working directory,
    /// and the installed copy under the local data directory.
    #[arg(long, global = true)]
    module: Option<PathBuf>,

    /// Turn on verbose logging.
    ///
    /// - `-v`: Debug
    /// - `-vv`: Trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the test window (the default).
    ///
    /// The window resolves its own top-level handle, loads the module and offers
    /// one button that toggles HideAllWindows() / ShowAllWindows().
    Gui,
    /// Report where the module is searched for and whether it binds.
    Doctor {
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    // We ignore the result here as logging failure shouldn't crash the startup
    let _ = SimpleLogger::init(log_level, Config::default());

    info!("window-hider starting (pid {})", std::process::id());
    let candidates = default_candidates(cli.module.as_deref());

    match cli.command {
        Some(Commands::Doctor { json }) => {
            let report = platform::inspect(&candidates);
            if json {
                match serde_json::to_string_pretty(&report) {
                    Ok(text) => println!("{}", text),
                    Err(e) => {
                        error!("Failed to serialize report: {}", e);
                        std::process::exit(1);
                    }
                }
            } else {
                print!("{}", doctor::render(&report));
            }
        }
        Some(Commands::Gui) | None => {
            if let Err(e) = platform::run_gui(&candidates) {
                error!("Test window failed: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}

#[cfg(windows)]
mod platform {
    use std::path::PathBuf;

    use anyhow::Result;
    use window_hider::doctor::{self, ModuleReport};
    use window_hider::harness::Harness;
    use window_hider::loader::load_first;
    use window_hider::native::Win32Loader;
    use window_hider::ui;

    pub fn inspect(candidates: &[PathBuf]) -> ModuleReport {
        doctor::inspect(&Win32Loader, candidates)
    }

    pub fn run_gui(candidates: &[PathBuf]) -> Result<()> {
        let harness = Harness::new(load_first(&Win32Loader, candidates));
        ui::run(harness)
    }
}

#[cfg(not(windows))]
mod platform {
    use std::path::PathBuf;

    use anyhow::{Result, bail};
    use window_hider::doctor::{CandidateReport, FailureReport, ModuleReport};
    use window_hider::errors::LoadError;

    /// Without a Win32 loader the report can still list the search order.
    pub fn inspect(candidates: &[PathBuf]) -> ModuleReport {
        ModuleReport {
            candidates: candidates
                .iter()
                .map(|path| CandidateReport {
                    path: path.clone(),
                    exists: path.exists(),
                })
                .collect(),
            loaded: None,
            error: Some(FailureReport::from(&LoadError::Unsupported)),
            failures: Vec::new(),
        }
    }

    pub fn run_gui(_candidates: &[PathBuf]) -> Result<()> {
        bail!("The test window needs Windows (display affinity is a Win32 feature)")
    }
}
