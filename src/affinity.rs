//! # Capture Exclusion Logic
//!
//! The behavior behind the module's exported entry points, written against [`WindowOps`] so it
//! can run against a mock desktop in tests.
//!
//! Capture exclusion is the `WDA_EXCLUDEFROMCAPTURE` display affinity (Windows 10 2004+): the
//! window is composed on the physical display as usual but left out of screenshots, screen
//! recordings and screen sharing. The OS only lets a process change the affinity of its own
//! windows.

use log::{debug, warn};

use crate::handle::WindowHandle;
use crate::invariants::{Invariant, assert_invariant};
use crate::system::{WS_CHILD, WS_EX_APPWINDOW, WS_EX_TOOLWINDOW, WindowOps};

/// Win32 `WINDOW_DISPLAY_AFFINITY` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayAffinity {
    /// Normal: visible everywhere.
    #[default]
    None,
    /// Legacy mode: shown as a black rectangle in captures.
    Monitor,
    /// Omitted from captures, still shown on the monitor.
    ExcludeFromCapture,
}

impl DisplayAffinity {
    pub fn raw(self) -> u32 {
        match self {
            DisplayAffinity::None => 0x00,
            DisplayAffinity::Monitor => 0x01,
            DisplayAffinity::ExcludeFromCapture => 0x11,
        }
    }

    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0x00 => Some(DisplayAffinity::None),
            0x01 => Some(DisplayAffinity::Monitor),
            0x11 => Some(DisplayAffinity::ExcludeFromCapture),
            _ => None,
        }
    }

    /// The affinity a `hide` flag maps to.
    pub fn for_hide(hide: bool) -> Self {
        if hide {
            DisplayAffinity::ExcludeFromCapture
        } else {
            DisplayAffinity::None
        }
    }
}

/// Checks if `hwnd` is a window a user would recognise as part of the application.
///
/// Excludes hidden windows, child controls, windows parented to anything but the desktop,
/// tool windows and untitled helper windows (IME, message-only, etc).
pub fn is_valid_app_window(ops: &impl WindowOps, hwnd: WindowHandle) -> bool {
    if !ops.is_visible(hwnd) {
        return false;
    }

    let parent = ops.parent(hwnd);
    if !parent.is_null() && parent != ops.desktop_window() {
        return false;
    }

    if ops.style(hwnd) & WS_CHILD != 0 {
        return false;
    }

    if ops.ex_style(hwnd) & WS_EX_TOOLWINDOW != 0 {
        return false;
    }

    ops.title_len(hwnd) > 0
}

/// Sets or clears capture exclusion on one window.
///
/// # Returns
/// * `true` - The OS accepted the new affinity.
/// * `false` - Null handle, or the OS refused (foreign window, destroyed window, old Windows build).
pub fn set_window_visibility(ops: &impl WindowOps, hwnd: WindowHandle, hide: bool) -> bool {
    if hwnd.is_null() {
        return false;
    }

    match ops.set_display_affinity(hwnd, DisplayAffinity::for_hide(hide)) {
        Ok(()) => true,
        Err(e) => {
            warn!("SetWindowDisplayAffinity failed for {}: {}", hwnd, e);
            false
        }
    }
}

/// Applies capture exclusion (or clears it) on every valid app window of the calling process.
///
/// Returns the number of windows whose affinity was changed.
pub fn set_all_windows_visibility(ops: &impl WindowOps, hide: bool) -> usize {
    let current_pid = ops.current_process_id();
    let affinity = DisplayAffinity::for_hide(hide);
    let mut applied = 0;

    for hwnd in ops.top_level_windows() {
        if ops.window_process_id(hwnd) != current_pid || !is_valid_app_window(ops, hwnd) {
            continue;
        }

        assert_invariant(
            ops.window_process_id(hwnd) == current_pid,
            Invariant::ExclusionStaysInProcess,
        );

        match ops.set_display_affinity(hwnd, affinity) {
            Ok(()) => applied += 1,
            Err(e) => warn!("Could not set {:?} on {}: {}", affinity, hwnd, e),
        }
    }

    debug!("Applied {:?} to {} window(s) of process {}", affinity, applied, current_pid);
    applied
}

/// Removes `hwnd` from the taskbar and Alt-Tab (tool window), or puts it back (app window).
///
/// # Returns
/// * `false` - Null handle, or the window has no readable extended style.
pub fn hide_from_taskbar(ops: &impl WindowOps, hwnd: WindowHandle, hide: bool) -> bool {
    if hwnd.is_null() {
        return false;
    }

    let mut style = ops.ex_style(hwnd);
    if style == 0 {
        return false;
    }

    if hide {
        style |= WS_EX_TOOLWINDOW;
        style &= !WS_EX_APPWINDOW;
    } else {
        style |= WS_EX_APPWINDOW;
        style &= !WS_EX_TOOLWINDOW;
    }

    if let Err(e) = ops.set_ex_style(hwnd, style) {
        warn!("Could not update extended style of {}: {}", hwnd, e);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{MockWindow, MockWindows};
    use proptest::prelude::*;

    const PID: u32 = 4242;

    fn desktop() -> MockWindows {
        let windows = MockWindows::new(PID);
        windows.insert(WindowHandle(0x1), MockWindow::app(PID, "Main"));
        windows.insert(WindowHandle(0x2), MockWindow::app(PID, "Settings"));
        windows.insert(WindowHandle(0x3), MockWindow::app(7, "Someone else"));
        windows.insert(WindowHandle(0x4), MockWindow { visible: false, ..MockWindow::app(PID, "Hidden") });
        windows.insert(WindowHandle(0x5), MockWindow { ex_style: WS_EX_TOOLWINDOW, ..MockWindow::app(PID, "Tool") });
        windows.insert(WindowHandle(0x6), MockWindow::app(PID, ""));
        windows.insert(WindowHandle(0x7), MockWindow { parent: WindowHandle(0x1), ..MockWindow::app(PID, "Owned") });
        windows.insert(WindowHandle(0x8), MockWindow::control(WindowHandle(0x1)));
        windows
    }

    #[test]
    fn test_raw_values_match_win32() {
        assert_eq!(DisplayAffinity::ExcludeFromCapture.raw(), 0x11);
        assert_eq!(DisplayAffinity::from_raw(0x01), Some(DisplayAffinity::Monitor));
        assert_eq!(DisplayAffinity::from_raw(0x02), None);
    }

    #[test]
    fn test_valid_app_window_rules() {
        let windows = desktop();
        let valid: Vec<isize> = (1..=8)
            .filter(|i| is_valid_app_window(&windows, WindowHandle(*i)))
            .collect();
        // 0x3 is valid on its own; process filtering happens in set_all_windows_visibility.
        assert_eq!(valid, vec![1, 2, 3]);
    }

    #[test]
    fn test_desktop_parent_counts_as_unparented() {
        let windows = desktop();
        let desktop_handle = windows.desktop_window();
        windows.insert(WindowHandle(0x9), MockWindow { parent: desktop_handle, ..MockWindow::app(PID, "Popup") });
        assert!(is_valid_app_window(&windows, WindowHandle(0x9)));
    }

    #[test]
    fn test_hide_all_only_touches_own_valid_windows() {
        let windows = desktop();
        assert_eq!(set_all_windows_visibility(&windows, true), 2);

        let calls = windows.affinity_calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                (WindowHandle(0x1), DisplayAffinity::ExcludeFromCapture),
                (WindowHandle(0x2), DisplayAffinity::ExcludeFromCapture),
            ]
        );
        assert_eq!(windows.get(WindowHandle(0x3)).unwrap().affinity, DisplayAffinity::None);
        crate::invariants::contract_test("hide all", &[Invariant::ExclusionStaysInProcess]);
    }

    #[test]
    fn test_set_window_visibility_null_handle() {
        let windows = desktop();
        assert!(!set_window_visibility(&windows, WindowHandle::NULL, true));
        assert!(windows.affinity_calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_set_window_visibility_reports_os_refusal() {
        let windows = desktop();
        assert!(!set_window_visibility(&windows, WindowHandle(0x3), true));
        assert!(!set_window_visibility(&windows, WindowHandle(0x99), true));
    }

    #[test]
    fn test_set_window_visibility_round_trip() {
        let windows = desktop();
        let hwnd = WindowHandle(0x2);
        assert!(set_window_visibility(&windows, hwnd, true));
        assert_eq!(windows.display_affinity(hwnd).unwrap(), DisplayAffinity::ExcludeFromCapture);
        assert!(set_window_visibility(&windows, hwnd, false));
        assert_eq!(windows.display_affinity(hwnd).unwrap(), DisplayAffinity::None);
    }

    #[test]
    fn test_taskbar_flags_swap() {
        let windows = desktop();
        let hwnd = WindowHandle(0x1);

        assert!(hide_from_taskbar(&windows, hwnd, true));
        let style = windows.ex_style(hwnd);
        assert_ne!(style & WS_EX_TOOLWINDOW, 0);
        assert_eq!(style & WS_EX_APPWINDOW, 0);

        assert!(hide_from_taskbar(&windows, hwnd, false));
        let style = windows.ex_style(hwnd);
        assert_eq!(style & WS_EX_TOOLWINDOW, 0);
        assert_ne!(style & WS_EX_APPWINDOW, 0);
    }

    #[test]
    fn test_taskbar_rejects_null_and_styleless_windows() {
        let windows = desktop();
        assert!(!hide_from_taskbar(&windows, WindowHandle::NULL, true));
        // Child controls in the mock carry no extended style.
        assert!(!hide_from_taskbar(&windows, WindowHandle(0x8), true));
    }

    #[derive(Debug, Clone)]
    struct Shape {
        pid: u32,
        visible: bool,
        tool: bool,
        titled: bool,
    }

    fn window_shape() -> impl Strategy<Value = Shape> {
        (prop_oneof![Just(PID), Just(7u32)], any::<bool>(), any::<bool>(), any::<bool>())
            .prop_map(|(pid, visible, tool, titled)| Shape { pid, visible, tool, titled })
    }

    proptest! {
        #[test]
        fn test_hide_then_show_restores_every_window(shapes in prop::collection::vec(window_shape(), 0..12)) {
            let windows = MockWindows::new(PID);
            for (i, shape) in shapes.iter().enumerate() {
                windows.insert(WindowHandle(0x100 + i as isize), MockWindow {
                    visible: shape.visible,
                    ex_style: if shape.tool { WS_EX_TOOLWINDOW } else { WS_EX_APPWINDOW },
                    ..MockWindow::app(shape.pid, if shape.titled { "Title" } else { "" })
                });
            }

            let hidden = set_all_windows_visibility(&windows, true);
            let expected = shapes.iter().filter(|s| s.pid == PID && s.visible && !s.tool && s.titled).count();
            prop_assert_eq!(hidden, expected);

            set_all_windows_visibility(&windows, false);
            for (i, _) in shapes.iter().enumerate() {
                let window = windows.get(WindowHandle(0x100 + i as isize)).unwrap();
                prop_assert_eq!(window.affinity, DisplayAffinity::None);
            }
        }
    }
}
