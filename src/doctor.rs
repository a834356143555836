//! # Doctor
//!
//! Headless answer to "why is the toggle greyed out?": where the module was looked for, what
//! exists, and what happened when binding it.

use std::path::PathBuf;

use serde::Serialize;

use crate::errors::LoadError;
use crate::loader::{ModuleLoader, load_first};

#[derive(Debug, Serialize)]
pub struct CandidateReport {
    pub path: PathBuf,
    pub exists: bool,
}

#[derive(Debug, Serialize)]
pub struct FailureReport {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ModuleReport {
    pub candidates: Vec<CandidateReport>,
    pub loaded: Option<PathBuf>,
    pub error: Option<FailureReport>,
    /// Per-candidate open/bind failures, when no candidate loaded.
    pub failures: Vec<FailureReport>,
}

impl ModuleReport {
    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }
}

impl From<&LoadError> for FailureReport {
    fn from(e: &LoadError) -> Self {
        Self {
            code: e.error_code(),
            message: e.to_string(),
        }
    }
}

/// Runs the same search the harness runs at startup and describes the outcome.
pub fn inspect<L: ModuleLoader>(loader: &L, candidates: &[PathBuf]) -> ModuleReport {
    let listed = candidates
        .iter()
        .map(|path| CandidateReport {
            path: path.clone(),
            exists: loader.exists(path),
        })
        .collect();

    match load_first(loader, candidates) {
        Ok(loaded) => ModuleReport {
            candidates: listed,
            loaded: Some(loaded.path),
            error: None,
            failures: Vec::new(),
        },
        Err(e) => {
            let failures = match &e {
                LoadError::NotFound { failures, .. } => failures.iter().map(FailureReport::from).collect(),
                _ => Vec::new(),
            };
            ModuleReport {
                candidates: listed,
                loaded: None,
                error: Some(FailureReport::from(&e)),
                failures,
            }
        }
    }
}

/// Human readable rendering of a [`ModuleReport`].
pub fn render(report: &ModuleReport) -> String {
    let mut out = String::new();
    out.push_str("Capture-exclusion module search order:\n");
    for (i, candidate) in report.candidates.iter().enumerate() {
        let mark = if report.loaded.as_ref() == Some(&candidate.path) {
            "loaded"
        } else if candidate.exists {
            "present"
        } else {
            "missing"
        };
        out.push_str(&format!("  {}. [{}] {}\n", i + 1, mark, candidate.path.display()));
    }

    for failure in &report.failures {
        out.push_str(&format!("  ! {} ({})\n", failure.message, failure.code));
    }

    match (&report.loaded, &report.error) {
        (Some(path), _) => out.push_str(&format!("\nModule: loaded from {}\n", path.display())),
        (None, Some(error)) => out.push_str(&format!("\nModule: not found. {}\n", error.message)),
        (None, None) => out.push_str("\nModule: not found\n"),
    }
    out
}
