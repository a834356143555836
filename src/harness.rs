//! # Harness State
//!
//! Everything the test window shows, and what happens when its button is pressed, without any
//! Win32 in sight. The window layer (`ui`) only copies these strings into controls and turns
//! [`HarnessError`]s into message boxes.

use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::errors::{HarnessError, LoadError};
use crate::handle::{WindowHandle, resolve_top_level};
use crate::invariants::{Invariant, assert_invariant};
use crate::loader::{CaptureExclusion, Loaded};
use crate::system::WindowOps;
use crate::toggle::{Visibility, VisibilityToggle};

pub const WINDOW_TITLE: &str = "WindowHider Test";
pub const HEADING: &str = "WindowHider capture-exclusion test";
pub const INFO_TEXT: &str = "Press the button to toggle capture exclusion.\n\
     While hidden you still see this window, but screenshots and screen sharing do not.";

/// Where the top-level handle lookup stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// The window is not on screen yet.
    Pending,
    Resolved(WindowHandle),
    /// Both lookup strategies came back empty.
    Unavailable,
}

/// Outcome of the startup module search.
#[derive(Debug)]
pub enum ModuleStatus {
    Loaded(PathBuf),
    Unavailable(LoadError),
}

impl ModuleStatus {
    pub fn line(&self) -> &'static str {
        match self {
            ModuleStatus::Loaded(_) => "Module: loaded",
            ModuleStatus::Unavailable(_) => "Module: not found",
        }
    }
}

pub struct Harness<M> {
    module: Option<M>,
    module_status: ModuleStatus,
    handle: HandleState,
    toggle: VisibilityToggle,
    last_result: String,
}

impl<M: CaptureExclusion> Harness<M> {
    /// Builds the harness from the startup load result. A failed load degrades, never aborts.
    pub fn new(load: Result<Loaded<M>, LoadError>) -> Self {
        let (module, module_status) = match load {
            Ok(loaded) => (Some(loaded.module), ModuleStatus::Loaded(loaded.path)),
            Err(e) => {
                warn!("Capture exclusion disabled: {}", e);
                (None, ModuleStatus::Unavailable(e))
            }
        };

        Self {
            module,
            module_status,
            handle: HandleState::Pending,
            toggle: VisibilityToggle::new(),
            last_result: String::new(),
        }
    }

    pub fn module(&self) -> Option<&M> {
        self.module.as_ref()
    }

    pub fn module_status(&self) -> &ModuleStatus {
        &self.module_status
    }

    pub fn module_path(&self) -> Option<&Path> {
        match &self.module_status {
            ModuleStatus::Loaded(path) => Some(path),
            ModuleStatus::Unavailable(_) => None,
        }
    }

    pub fn handle_state(&self) -> HandleState {
        self.handle
    }

    pub fn visibility(&self) -> Visibility {
        self.toggle.state()
    }

    /// Resolves the top-level window from one of the harness's own controls.
    pub fn resolve_handle(&mut self, ops: &impl WindowOps, control: WindowHandle) -> HandleState {
        self.handle = match resolve_top_level(ops, control) {
            Some(top) => {
                info!("Child window handle: {} ({})", control, control.0);
                info!("Top-level window handle: {} ({})", top, top.0);
                HandleState::Resolved(top)
            }
            None => {
                error!("Could not resolve a top-level window from {}", control);
                HandleState::Unavailable
            }
        };
        self.handle
    }

    /// Whether the toggle button accepts clicks.
    pub fn toggle_enabled(&self) -> bool {
        let enabled = self.module.is_some() && self.handle != HandleState::Unavailable;
        assert_invariant(!enabled || self.module.is_some(), Invariant::ToggleRequiresModule);
        enabled
    }

    /// Handles a click on the toggle button.
    ///
    /// # Returns
    /// The new state, or the error to show the user. On error nothing visible changes.
    pub fn on_toggle(&mut self) -> Result<Visibility, HarnessError> {
        let module = self.module.as_ref().ok_or(HarnessError::ModuleNotLoaded)?;
        let state = self.toggle.toggle(module)?;
        self.last_result = format!("Called {}()", state.entry_point());
        Ok(state)
    }

    pub fn handle_line(&self) -> String {
        match self.handle {
            HandleState::Pending => "Window handle: resolving...".to_string(),
            HandleState::Resolved(h) => format!("Top-level window handle: {}", h),
            HandleState::Unavailable => "Top-level window handle: unavailable".to_string(),
        }
    }

    pub fn status_line(&self) -> &'static str {
        self.visibility().status_text()
    }

    pub fn button_label(&self) -> &'static str {
        self.visibility().button_label()
    }

    pub fn result_line(&self) -> &str {
        &self.last_result
    }

    pub fn module_line(&self) -> &'static str {
        self.module_status.line()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{
        HIDE_ALL_WINDOWS, MockLoader, MockModule, SET_WINDOW_VISIBILITY, candidate_paths, load_first,
    };
    use crate::system::{MockWindow, MockWindows};

    fn candidates() -> Vec<PathBuf> {
        candidate_paths(
            None,
            Some(Path::new("/app/bin")),
            Some(Path::new("/work")),
            Some(Path::new("/data")),
        )
    }

    fn loaded_harness() -> Harness<MockModule> {
        let candidates = candidates();
        let loader = MockLoader {
            present: vec![candidates[0].clone()],
            ..Default::default()
        };
        Harness::new(load_first(&loader, &candidates))
    }

    #[test]
    fn test_module_absent_everywhere_disables_toggle() {
        let candidates = candidates();
        let harness: Harness<MockModule> = Harness::new(load_first(&MockLoader::default(), &candidates));

        assert_eq!(harness.module_line(), "Module: not found");
        assert!(!harness.toggle_enabled());
        assert!(harness.module_path().is_none());
        match harness.module_status() {
            ModuleStatus::Unavailable(LoadError::NotFound { searched, .. }) => assert_eq!(searched.len(), 3),
            other => panic!("unexpected status {:?}", other),
        }
    }

    #[test]
    fn test_toggle_without_module_reports_not_loaded() {
        let mut harness: Harness<MockModule> = Harness::new(Err(LoadError::Unsupported));
        let err = harness.on_toggle().unwrap_err();
        assert!(matches!(err, HarnessError::ModuleNotLoaded));
        assert_eq!(err.to_string(), "Module not loaded");
        assert_eq!(harness.visibility(), Visibility::Visible);
        assert_eq!(harness.result_line(), "");
    }

    #[test]
    fn test_single_press_hides_through_hide_all_only() {
        let mut harness = loaded_harness();
        assert_eq!(harness.module_line(), "Module: loaded");
        assert!(harness.toggle_enabled());
        let label_before = harness.button_label();

        assert_eq!(harness.on_toggle().unwrap(), Visibility::Hidden);

        assert_ne!(harness.button_label(), label_before);
        assert_eq!(harness.status_line(), Visibility::Hidden.status_text());
        assert_eq!(harness.result_line(), "Called HideAllWindows()");
        let calls = harness.module().unwrap().calls();
        assert_eq!(calls, vec![HIDE_ALL_WINDOWS]);
        assert!(!calls.contains(&SET_WINDOW_VISIBILITY));
    }

    #[test]
    fn test_second_press_shows_again() {
        let mut harness = loaded_harness();
        harness.on_toggle().unwrap();
        assert_eq!(harness.on_toggle().unwrap(), Visibility::Visible);
        assert_eq!(harness.result_line(), "Called ShowAllWindows()");
        assert_eq!(harness.button_label(), Visibility::Visible.button_label());
    }

    #[test]
    fn test_failed_press_changes_nothing_visible() {
        let mut harness = loaded_harness();
        harness.on_toggle().unwrap();
        let (status, label, result) = (harness.status_line(), harness.button_label(), harness.result_line().to_string());

        harness.module().unwrap().fail_next_call("access violation");
        let err = harness.on_toggle().unwrap_err();

        assert_eq!(err.to_string(), "Operation failed: ShowAllWindows failed: access violation");
        assert_eq!(harness.status_line(), status);
        assert_eq!(harness.button_label(), label);
        assert_eq!(harness.result_line(), result);
    }

    #[test]
    fn test_handle_line_follows_resolution() {
        let mut harness = loaded_harness();
        assert_eq!(harness.handle_line(), "Window handle: resolving...");

        let windows = MockWindows::new(1);
        let top = WindowHandle(0xBEEF);
        let button = WindowHandle(0xF00D);
        windows.insert(top, MockWindow::app(1, "WindowHider Test"));
        windows.insert(button, MockWindow::control(top));

        assert_eq!(harness.resolve_handle(&windows, button), HandleState::Resolved(top));
        assert_eq!(harness.handle_line(), "Top-level window handle: 0xBEEF");
        assert!(harness.toggle_enabled());
    }

    #[test]
    fn test_unresolvable_handle_disables_toggle() {
        let mut harness = loaded_harness();
        let windows = MockWindows::new(1);
        assert_eq!(harness.resolve_handle(&windows, WindowHandle::NULL), HandleState::Unavailable);
        assert_eq!(harness.handle_line(), "Top-level window handle: unavailable");
        assert!(!harness.toggle_enabled());
    }

    #[test]
    fn test_toggle_checks_its_contracts() {
        let mut harness = loaded_harness();
        harness.toggle_enabled();
        harness.on_toggle().unwrap();
        crate::invariants::contract_test(
            "harness toggle",
            &[Invariant::ToggleRequiresModule, Invariant::StateFollowsSuccessfulCall],
        );
    }
}
