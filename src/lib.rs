//! # window-hider
//!
//! Keeps application windows visible on screen while leaving them out of screenshots, screen
//! recordings and screen sharing (`SetWindowDisplayAffinity` with `WDA_EXCLUDEFROMCAPTURE`).
//!
//! The crate builds two things:
//!
//! - **The module** (`window_hider.dll`): a cdylib exporting `HideAllWindows`, `ShowAllWindows`,
//!   `SetWindowVisibility` and `HideFromTaskbar` for any process that loads it.
//! - **The harness** (`window-hider.exe`): a small test window that finds the module on disk,
//!   binds it, and toggles capture exclusion on itself.
//!
//! Everything that talks to the OS sits behind a trait ([`system::WindowOps`],
//! [`loader::ModuleLoader`], [`loader::CaptureExclusion`]) so the rules can be tested against mocks
//! on any platform.

pub mod affinity;
pub mod doctor;
pub mod errors;
pub mod handle;
pub mod harness;
pub mod invariants;
pub mod loader;
pub mod system;
pub mod toggle;

#[cfg(windows)]
pub mod exports;
#[cfg(windows)]
pub mod native;
#[cfg(windows)]
pub mod ui;
