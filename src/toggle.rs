//! # Visibility Toggle
//!
//! Two states, `Visible` and `Hidden`, starting at `Visible`:
//!
//! - `Visible → Hidden` calls `HideAllWindows()`.
//! - `Hidden → Visible` calls `ShowAllWindows()`.
//!
//! If the call fails the state does not move. The state is never read back from the OS, so it
//! describes the last successful call, nothing more.

use log::{error, info};

use crate::errors::InvokeError;
use crate::invariants::{Invariant, assert_invariant};
use crate::loader::{CaptureExclusion, HIDE_ALL_WINDOWS, SHOW_ALL_WINDOWS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

impl Visibility {
    pub fn toggled(self) -> Self {
        match self {
            Visibility::Visible => Visibility::Hidden,
            Visibility::Hidden => Visibility::Visible,
        }
    }

    /// Status line shown for this state.
    pub fn status_text(self) -> &'static str {
        match self {
            Visibility::Visible => "Status: visible",
            Visibility::Hidden => "Status: hidden (excluded from capture, still visible to you)",
        }
    }

    /// Label of the toggle button, i.e. what pressing it will do.
    pub fn button_label(self) -> &'static str {
        match self {
            Visibility::Visible => "Hide window (from capture)",
            Visibility::Hidden => "Show window (restore)",
        }
    }

    /// The entry point that moves *into* this state.
    pub fn entry_point(self) -> &'static str {
        match self {
            Visibility::Visible => SHOW_ALL_WINDOWS,
            Visibility::Hidden => HIDE_ALL_WINDOWS,
        }
    }
}

#[derive(Debug, Default)]
pub struct VisibilityToggle {
    state: Visibility,
}

impl VisibilityToggle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Visibility {
        self.state
    }

    /// Performs one transition through `module`.
    ///
    /// # Returns
    /// The new state, or the call's error with the state left as it was.
    pub fn toggle(&mut self, module: &impl CaptureExclusion) -> Result<Visibility, InvokeError> {
        let before = self.state;
        let target = before.toggled();

        let outcome = match target {
            Visibility::Hidden => module.hide_all_windows(),
            Visibility::Visible => module.show_all_windows(),
        };

        if let Err(e) = outcome {
            error!("{}() failed, staying {:?}: {}", target.entry_point(), before, e);
            return Err(e);
        }

        self.state = target;
        assert_invariant(self.state != before, Invariant::StateFollowsSuccessfulCall);
        info!("Called {}()", target.entry_point());
        Ok(target)
    }
}
