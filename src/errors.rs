use std::path::PathBuf;

/// Why the capture-exclusion module could not be bound.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to open module {path}: {reason}")]
    Open { path: PathBuf, reason: String },

    #[error("Entry point '{symbol}' missing from {path}")]
    MissingSymbol { path: PathBuf, symbol: &'static str },

    #[error("Module not found ({} candidate(s) searched, {} failed to bind)", .searched.len(), .failures.len())]
    NotFound {
        searched: Vec<PathBuf>,
        failures: Vec<LoadError>,
    },

    #[error("Loading native modules is not supported on this platform")]
    Unsupported,
}

impl LoadError {
    /// Error code for programmatic handling (doctor JSON output).
    pub fn error_code(&self) -> &'static str {
        match self {
            LoadError::Open { .. } => "MODULE_OPEN_FAILED",
            LoadError::MissingSymbol { .. } => "MODULE_SYMBOL_MISSING",
            LoadError::NotFound { .. } => "MODULE_NOT_FOUND",
            LoadError::Unsupported => "MODULE_UNSUPPORTED",
        }
    }
}

/// A call into a bound entry point failed.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("{entry_point} failed: {reason}")]
    Failed {
        entry_point: &'static str,
        reason: String,
    },

    #[error("Window handle is null")]
    NullHandle,
}

/// Errors the harness hands to the UI for presentation.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("Module not loaded")]
    ModuleNotLoaded,

    #[error("Operation failed: {source}")]
    Invoke {
        #[from]
        source: InvokeError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_counts_candidates() {
        let err = LoadError::NotFound {
            searched: vec![PathBuf::from("a.dll"), PathBuf::from("b.dll")],
            failures: vec![LoadError::MissingSymbol {
                path: PathBuf::from("a.dll"),
                symbol: "HideAllWindows",
            }],
        };
        assert_eq!(err.to_string(), "Module not found (2 candidate(s) searched, 1 failed to bind)");
        assert_eq!(err.error_code(), "MODULE_NOT_FOUND");
    }

    #[test]
    fn test_invoke_error_wraps_into_harness_error() {
        let err: HarnessError = InvokeError::Failed {
            entry_point: "HideAllWindows",
            reason: "access violation".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Operation failed: HideAllWindows failed: access violation");
    }
}
