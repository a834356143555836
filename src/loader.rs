//! # Module Binding
//!
//! Finds the capture-exclusion module on disk and binds its entry points.
//!
//! The harness searches an ordered list of candidate paths and keeps the first module whose
//! entry points all bind. Order encodes priority:
//!
//! 1.  An explicit `--module` path, if given.
//! 2.  Next to the running executable (cargo's build output places the cdylib there).
//! 3.  The working directory (a local copy).
//! 4.  The per-user installed copy under the local data directory.
//!
//! A candidate that is missing, fails to open, or lacks an entry point is skipped. There are no
//! retries, and nothing here is fatal: the caller gets a [`LoadError`] and degrades.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, info, warn};

use crate::errors::{InvokeError, LoadError};
use crate::handle::WindowHandle;

/// Exported entry points the harness binds by name.
pub const HIDE_ALL_WINDOWS: &str = "HideAllWindows";
pub const SHOW_ALL_WINDOWS: &str = "ShowAllWindows";
pub const SET_WINDOW_VISIBILITY: &str = "SetWindowVisibility";

/// Sub-directory of the local data directory holding the installed copy.
pub const INSTALL_DIR_NAME: &str = "window-hider";

/// File name of the module on this platform (`window_hider.dll` on Windows).
pub fn module_file_name() -> String {
    format!(
        "{}window_hider{}",
        std::env::consts::DLL_PREFIX,
        std::env::consts::DLL_SUFFIX
    )
}

/// The bound surface of a capture-exclusion module.
pub trait CaptureExclusion {
    /// Exclude every app window of this process from capture.
    fn hide_all_windows(&self) -> Result<(), InvokeError>;

    /// Undo [`CaptureExclusion::hide_all_windows`].
    fn show_all_windows(&self) -> Result<(), InvokeError>;

    /// Set (`hide = true`) or clear capture exclusion on one window.
    /// `Ok(false)` means the module ran but the OS refused.
    fn set_window_visibility(&self, hwnd: WindowHandle, hide: bool) -> Result<bool, InvokeError>;
}

/// Opens module files. Production uses [`crate::native::Win32Loader`].
pub trait ModuleLoader {
    type Module: CaptureExclusion;

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    /// Opens `path` and binds every entry point, or fails without keeping anything loaded.
    fn load(&self, path: &Path) -> Result<Self::Module, LoadError>;
}

/// A bound module and where it came from.
#[derive(Debug)]
pub struct Loaded<M> {
    pub module: M,
    pub path: PathBuf,
}

/// Builds the ordered, de-duplicated candidate list.
///
/// # Arguments
/// * `explicit` - A user supplied module path; tried first.
/// * `exe_dir` - Directory of the running executable.
/// * `cwd` - The working directory.
/// * `local_data_dir` - Per-user local data directory (e.g. `%LOCALAPPDATA%`).
pub fn candidate_paths(
    explicit: Option<&Path>,
    exe_dir: Option<&Path>,
    cwd: Option<&Path>,
    local_data_dir: Option<&Path>,
) -> Vec<PathBuf> {
    let file_name = module_file_name();
    let defaults = [
        exe_dir.map(|d| d.join(&file_name)),
        cwd.map(|d| d.join(&file_name)),
        local_data_dir.map(|d| d.join(INSTALL_DIR_NAME).join(&file_name)),
    ];

    let mut candidates: Vec<PathBuf> = Vec::new();
    for path in explicit.map(Path::to_path_buf).into_iter().chain(defaults.into_iter().flatten()) {
        if !candidates.contains(&path) {
            candidates.push(path);
        }
    }
    candidates
}

/// Candidate list for the current process environment.
pub fn default_candidates(explicit: Option<&Path>) -> Vec<PathBuf> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let cwd = std::env::current_dir().ok();
    let base_dirs = directories::BaseDirs::new();
    let local_data = base_dirs.as_ref().map(|b| b.data_local_dir());

    candidate_paths(explicit, exe_dir.as_deref(), cwd.as_deref(), local_data)
}

/// Loads the first candidate that exists and binds.
pub fn load_first<L: ModuleLoader>(
    loader: &L,
    candidates: &[PathBuf],
) -> Result<Loaded<L::Module>, LoadError> {
    let mut failures = Vec::new();

    for path in candidates {
        if !loader.exists(path) {
            debug!("No module at {:?}", path);
            continue;
        }

        match loader.load(path) {
            Ok(module) => {
                info!("Loaded capture-exclusion module: {:?}", path);
                return Ok(Loaded {
                    module,
                    path: path.clone(),
                });
            }
            Err(e) => {
                warn!("Skipping {:?}: {}", path, e);
                failures.push(e);
            }
        }
    }

    Err(LoadError::NotFound {
        searched: candidates.to_vec(),
        failures,
    })
}

/// A Mock Module for Testing. Records every entry point call by name.
#[derive(Debug, Default)]
pub struct MockModule {
    pub calls: Mutex<Vec<&'static str>>,
    /// When set, the next call fails with this reason (then clears).
    pub fail_next: Mutex<Option<String>>,
}

impl MockModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_next_call(&self, reason: &str) {
        *self.fail_next.lock().unwrap() = Some(reason.to_string());
    }

    fn record(&self, entry_point: &'static str) -> Result<(), InvokeError> {
        if let Some(reason) = self.fail_next.lock().unwrap().take() {
            return Err(InvokeError::Failed { entry_point, reason });
        }
        self.calls.lock().unwrap().push(entry_point);
        Ok(())
    }
}

impl CaptureExclusion for MockModule {
    fn hide_all_windows(&self) -> Result<(), InvokeError> {
        self.record(HIDE_ALL_WINDOWS)
    }

    fn show_all_windows(&self) -> Result<(), InvokeError> {
        self.record(SHOW_ALL_WINDOWS)
    }

    fn set_window_visibility(&self, hwnd: WindowHandle, _hide: bool) -> Result<bool, InvokeError> {
        if hwnd.is_null() {
            return Err(InvokeError::NullHandle);
        }
        self.record(SET_WINDOW_VISIBILITY)?;
        Ok(true)
    }
}

/// A Mock Loader for Testing.
///
/// `present` paths "exist"; among those, `broken` paths fail to bind `HideAllWindows`.
#[derive(Debug, Default)]
pub struct MockLoader {
    pub present: Vec<PathBuf>,
    pub broken: Vec<PathBuf>,
    pub load_attempts: Mutex<Vec<PathBuf>>,
}

impl ModuleLoader for MockLoader {
    type Module = MockModule;

    fn exists(&self, path: &Path) -> bool {
        self.present.iter().any(|p| p == path)
    }

    fn load(&self, path: &Path) -> Result<MockModule, LoadError> {
        self.load_attempts.lock().unwrap().push(path.to_path_buf());
        if self.broken.iter().any(|p| p == path) {
            return Err(LoadError::MissingSymbol {
                path: path.to_path_buf(),
                symbol: HIDE_ALL_WINDOWS,
            });
        }
        Ok(MockModule::new())
    }
}
