//! # Module Entry Points
//!
//! The C ABI the harness (or any other host) binds by name once the cdylib is loaded into its
//! process. Arguments and results are Win32 `BOOL`s so C, C++ and ctypes callers can use the
//! usual `BOOL(HWND, BOOL)` prototypes.
//!
//! Requires Windows 10 version 2004 or later for `WDA_EXCLUDEFROMCAPTURE`.

#![allow(non_snake_case)]

use windows::Win32::Foundation::HWND;
use windows::core::BOOL;

use crate::affinity;
use crate::system::Win32Windows;

/// Excludes `hwnd` from screen capture (`hide` TRUE) or restores normal capture (`hide` FALSE).
///
/// Returns FALSE for a null handle or when the OS rejects the change.
#[unsafe(no_mangle)]
pub extern "system" fn SetWindowVisibility(hwnd: HWND, hide: BOOL) -> BOOL {
    affinity::set_window_visibility(&Win32Windows, hwnd.into(), hide.as_bool()).into()
}

/// Excludes every app window of the calling process from screen capture.
#[unsafe(no_mangle)]
pub extern "system" fn HideAllWindows() {
    affinity::set_all_windows_visibility(&Win32Windows, true);
}

/// Restores normal capture for every app window of the calling process.
#[unsafe(no_mangle)]
pub extern "system" fn ShowAllWindows() {
    affinity::set_all_windows_visibility(&Win32Windows, false);
}

/// Hides `hwnd` from the taskbar and Alt-Tab (`hide` TRUE) or shows it there again.
#[unsafe(no_mangle)]
pub extern "system" fn HideFromTaskbar(hwnd: HWND, hide: BOOL) -> BOOL {
    affinity::hide_from_taskbar(&Win32Windows, hwnd.into(), hide.as_bool()).into()
}
