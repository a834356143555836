use std::collections::BTreeMap;
use std::sync::Mutex;
use anyhow::Result;

use crate::affinity::DisplayAffinity;
use crate::handle::WindowHandle;

// Win32 style bits the affinity rules look at (winuser.h values).
pub const WS_CHILD: u32 = 0x4000_0000;
pub const WS_EX_TOOLWINDOW: u32 = 0x0000_0080;
pub const WS_EX_APPWINDOW: u32 = 0x0004_0000;

/// Abstraction for the window-manager calls (queries, styles, display affinity).
/// This allows us to exercise the capture-exclusion rules without a desktop session.
pub trait WindowOps {
    /// All top-level windows on the desktop, in Z order.
    fn top_level_windows(&self) -> Vec<WindowHandle>;

    /// Id of the process that created `hwnd` (0 if the window is gone).
    fn window_process_id(&self, hwnd: WindowHandle) -> u32;

    /// Id of the calling process.
    fn current_process_id(&self) -> u32;

    fn is_visible(&self, hwnd: WindowHandle) -> bool;

    /// Parent (or owner) of `hwnd`; null if it has none.
    fn parent(&self, hwnd: WindowHandle) -> WindowHandle;

    /// Root of the parent chain of `hwnd`; null if the lookup fails.
    fn root_ancestor(&self, hwnd: WindowHandle) -> WindowHandle;

    fn desktop_window(&self) -> WindowHandle;

    fn style(&self, hwnd: WindowHandle) -> u32;

    fn ex_style(&self, hwnd: WindowHandle) -> u32;

    fn set_ex_style(&self, hwnd: WindowHandle, ex_style: u32) -> Result<()>;

    /// Length of the window title in UTF-16 units.
    fn title_len(&self, hwnd: WindowHandle) -> usize;

    fn display_affinity(&self, hwnd: WindowHandle) -> Result<DisplayAffinity>;

    /// Applies `affinity`. Fails if the OS rejects it (e.g. the window belongs to another process).
    fn set_display_affinity(&self, hwnd: WindowHandle, affinity: DisplayAffinity) -> Result<()>;
}

/// The Real Window Manager implementation (Production).
#[cfg(windows)]
pub struct Win32Windows;

#[cfg(windows)]
mod win32 {
    use super::*;
    use windows::Win32::Foundation::{HWND, LPARAM};
    use windows::Win32::System::Threading::GetCurrentProcessId;
    use windows::Win32::UI::WindowsAndMessaging::{
        EnumWindows, GA_ROOT, GWL_EXSTYLE, GWL_STYLE, GetAncestor, GetDesktopWindow, GetParent,
        GetWindowDisplayAffinity, GetWindowLongW, GetWindowTextLengthW, GetWindowThreadProcessId,
        IsWindowVisible, SetWindowDisplayAffinity, SetWindowLongW, WINDOW_DISPLAY_AFFINITY,
    };
    use windows::core::BOOL;

    unsafe extern "system" fn collect_window(hwnd: HWND, lparam: LPARAM) -> BOOL {
        let found = unsafe { &mut *(lparam.0 as *mut Vec<WindowHandle>) };
        found.push(hwnd.into());
        true.into()
    }

    impl WindowOps for Win32Windows {
        fn top_level_windows(&self) -> Vec<WindowHandle> {
            let mut found: Vec<WindowHandle> = Vec::new();
            unsafe {
                let _ = EnumWindows(
                    Some(collect_window),
                    LPARAM(&mut found as *mut Vec<WindowHandle> as isize),
                );
            }
            found
        }

        fn window_process_id(&self, hwnd: WindowHandle) -> u32 {
            let mut pid: u32 = 0;
            unsafe {
                GetWindowThreadProcessId(hwnd.into(), Some(&mut pid));
            }
            pid
        }

        fn current_process_id(&self) -> u32 {
            unsafe { GetCurrentProcessId() }
        }

        fn is_visible(&self, hwnd: WindowHandle) -> bool {
            unsafe { IsWindowVisible(hwnd.into()).as_bool() }
        }

        fn parent(&self, hwnd: WindowHandle) -> WindowHandle {
            unsafe { GetParent(hwnd.into()) }
                .map(WindowHandle::from)
                .unwrap_or(WindowHandle::NULL)
        }

        fn root_ancestor(&self, hwnd: WindowHandle) -> WindowHandle {
            unsafe { GetAncestor(hwnd.into(), GA_ROOT) }.into()
        }

        fn desktop_window(&self) -> WindowHandle {
            unsafe { GetDesktopWindow() }.into()
        }

        fn style(&self, hwnd: WindowHandle) -> u32 {
            unsafe { GetWindowLongW(hwnd.into(), GWL_STYLE) as u32 }
        }

        fn ex_style(&self, hwnd: WindowHandle) -> u32 {
            unsafe { GetWindowLongW(hwnd.into(), GWL_EXSTYLE) as u32 }
        }

        fn set_ex_style(&self, hwnd: WindowHandle, ex_style: u32) -> Result<()> {
            // SetWindowLongW returns the previous value, which may legitimately be 0.
            unsafe {
                SetWindowLongW(hwnd.into(), GWL_EXSTYLE, ex_style as i32);
            }
            Ok(())
        }

        fn title_len(&self, hwnd: WindowHandle) -> usize {
            unsafe { GetWindowTextLengthW(hwnd.into()) }.max(0) as usize
        }

        fn display_affinity(&self, hwnd: WindowHandle) -> Result<DisplayAffinity> {
            let mut raw: u32 = 0;
            unsafe { GetWindowDisplayAffinity(hwnd.into(), &mut raw)? };
            DisplayAffinity::from_raw(raw)
                .ok_or_else(|| anyhow::anyhow!("Unknown display affinity 0x{:X} on {}", raw, hwnd))
        }

        fn set_display_affinity(&self, hwnd: WindowHandle, affinity: DisplayAffinity) -> Result<()> {
            unsafe { SetWindowDisplayAffinity(hwnd.into(), WINDOW_DISPLAY_AFFINITY(affinity.raw()))? };
            Ok(())
        }
    }
}

/// One fake window in a [`MockWindows`] desktop.
#[derive(Debug, Clone)]
pub struct MockWindow {
    pub pid: u32,
    pub parent: WindowHandle,
    pub visible: bool,
    pub style: u32,
    pub ex_style: u32,
    pub title: String,
    pub affinity: DisplayAffinity,
}

impl MockWindow {
    /// A visible, titled, unparented application window owned by `pid`.
    pub fn app(pid: u32, title: &str) -> Self {
        Self {
            pid,
            parent: WindowHandle::NULL,
            visible: true,
            style: 0,
            ex_style: WS_EX_APPWINDOW,
            title: title.to_string(),
            affinity: DisplayAffinity::None,
        }
    }

    /// An embedded child control of `parent`.
    pub fn control(parent: WindowHandle) -> Self {
        Self {
            parent,
            style: WS_CHILD,
            ex_style: 0,
            ..Self::app(0, "control")
        }
    }
}

/// A Mock Window Manager for Testing.
#[derive(Debug, Default)]
pub struct MockWindows {
    pub windows: Mutex<BTreeMap<WindowHandle, MockWindow>>,
    pub pid: u32,
    pub desktop: WindowHandle,
    /// Makes `root_ancestor` return null so callers must fall back to the parent walk.
    pub ancestor_lookup_broken: bool,
    /// Every `set_display_affinity` call, in order.
    pub affinity_calls: Mutex<Vec<(WindowHandle, DisplayAffinity)>>,
}

impl MockWindows {
    pub fn new(pid: u32) -> Self {
        Self {
            pid,
            desktop: WindowHandle(0x10010),
            ..Default::default()
        }
    }

    pub fn insert(&self, hwnd: WindowHandle, window: MockWindow) {
        let mut windows = self.windows.lock().unwrap();
        windows.insert(hwnd, window);
    }

    pub fn get(&self, hwnd: WindowHandle) -> Option<MockWindow> {
        self.windows.lock().unwrap().get(&hwnd).cloned()
    }

    fn with<T: Default>(&self, hwnd: WindowHandle, f: impl FnOnce(&MockWindow) -> T) -> T {
        self.windows.lock().unwrap().get(&hwnd).map(f).unwrap_or_default()
    }
}

impl WindowOps for MockWindows {
    fn top_level_windows(&self) -> Vec<WindowHandle> {
        let windows = self.windows.lock().unwrap();
        windows
            .iter()
            .filter(|(_, w)| w.style & WS_CHILD == 0)
            .map(|(h, _)| *h)
            .collect()
    }

    fn window_process_id(&self, hwnd: WindowHandle) -> u32 {
        self.with(hwnd, |w| w.pid)
    }

    fn current_process_id(&self) -> u32 {
        self.pid
    }

    fn is_visible(&self, hwnd: WindowHandle) -> bool {
        self.with(hwnd, |w| w.visible)
    }

    fn parent(&self, hwnd: WindowHandle) -> WindowHandle {
        self.with(hwnd, |w| w.parent)
    }

    fn root_ancestor(&self, hwnd: WindowHandle) -> WindowHandle {
        if self.ancestor_lookup_broken || self.get(hwnd).is_none() {
            return WindowHandle::NULL;
        }
        let mut current = hwnd;
        for _ in 0..crate::handle::MAX_ANCESTOR_DEPTH {
            let parent = self.parent(current);
            if parent.is_null() || parent == self.desktop {
                return current;
            }
            current = parent;
        }
        WindowHandle::NULL
    }

    fn desktop_window(&self) -> WindowHandle {
        self.desktop
    }

    fn style(&self, hwnd: WindowHandle) -> u32 {
        self.with(hwnd, |w| w.style)
    }

    fn ex_style(&self, hwnd: WindowHandle) -> u32 {
        self.with(hwnd, |w| w.ex_style)
    }

    fn set_ex_style(&self, hwnd: WindowHandle, ex_style: u32) -> Result<()> {
        let mut windows = self.windows.lock().unwrap();
        let window = windows
            .get_mut(&hwnd)
            .ok_or_else(|| anyhow::anyhow!("No mock window {}", hwnd))?;
        window.ex_style = ex_style;
        Ok(())
    }

    fn title_len(&self, hwnd: WindowHandle) -> usize {
        self.with(hwnd, |w| w.title.encode_utf16().count())
    }

    fn display_affinity(&self, hwnd: WindowHandle) -> Result<DisplayAffinity> {
        self.get(hwnd)
            .map(|w| w.affinity)
            .ok_or_else(|| anyhow::anyhow!("No mock window {}", hwnd))
    }

    fn set_display_affinity(&self, hwnd: WindowHandle, affinity: DisplayAffinity) -> Result<()> {
        let mut windows = self.windows.lock().unwrap();
        let window = windows
            .get_mut(&hwnd)
            .ok_or_else(|| anyhow::anyhow!("No mock window {}", hwnd))?;
        // The OS refuses to change the affinity of a window owned by another process.
        if window.pid != self.pid {
            anyhow::bail!("Access denied: {} belongs to process {}", hwnd, window.pid);
        }
        window.affinity = affinity;
        self.affinity_calls.lock().unwrap().push((hwnd, affinity));
        Ok(())
    }
}
