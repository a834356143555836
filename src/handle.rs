//! # Handle Resolution
//!
//! The harness only knows the native identifier of one of its own controls. Capture exclusion
//! is applied to top-level windows, so that identifier has to be walked up to its root.
//!
//! ## Strategies
//!
//! 1.  **Ancestor lookup**: a single `GetAncestor(GA_ROOT)` style query.
//! 2.  **Parent walk**: repeated `GetParent` style queries until no parent remains.
//!
//! If both come back empty there is no usable handle and the caller must keep the
//! capture-exclusion controls disabled.

use std::fmt;

use log::{debug, warn};

use crate::invariants::{Invariant, assert_invariant};
use crate::system::{WS_CHILD, WindowOps};

/// Upper bound on the parent walk. Real window trees are a handful of levels deep.
pub const MAX_ANCESTOR_DEPTH: usize = 256;

/// An opaque, pointer-sized platform window identifier. Zero is the null handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct WindowHandle(pub isize);

impl WindowHandle {
    pub const NULL: WindowHandle = WindowHandle(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Returns `None` for the null handle.
    pub fn non_null(self) -> Option<WindowHandle> {
        if self.is_null() { None } else { Some(self) }
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0 as usize)
    }
}

#[cfg(windows)]
impl From<windows::Win32::Foundation::HWND> for WindowHandle {
    fn from(hwnd: windows::Win32::Foundation::HWND) -> Self {
        WindowHandle(hwnd.0 as isize)
    }
}

#[cfg(windows)]
impl From<WindowHandle> for windows::Win32::Foundation::HWND {
    fn from(handle: WindowHandle) -> Self {
        windows::Win32::Foundation::HWND(handle.0 as *mut std::ffi::c_void)
    }
}

/// Resolves the top-level window that owns `child`.
///
/// # Returns
/// * `Some(handle)` - The root of the parent chain. A window without a parent resolves to itself.
/// * `None` - Both strategies failed (null input, or a parent chain deeper than [`MAX_ANCESTOR_DEPTH`]).
pub fn resolve_top_level(ops: &impl WindowOps, child: WindowHandle) -> Option<WindowHandle> {
    if child.is_null() {
        return None;
    }

    let resolved = match ops.root_ancestor(child).non_null() {
        Some(root) => Some(root),
        None => {
            debug!("Ancestor lookup for {} returned null, walking parents", child);
            walk_parents(ops, child)
        }
    };

    if let Some(top) = resolved {
        assert_invariant(
            ops.style(top) & WS_CHILD == 0,
            Invariant::ResolvedHandleIsTopLevel,
        );
    }
    resolved
}

fn walk_parents(ops: &impl WindowOps, child: WindowHandle) -> Option<WindowHandle> {
    let mut current = child;
    for _ in 0..MAX_ANCESTOR_DEPTH {
        match ops.parent(current).non_null() {
            Some(parent) => current = parent,
            None => return Some(current),
        }
    }
    warn!("Parent chain of {} exceeds {} levels, giving up", child, MAX_ANCESTOR_DEPTH);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{MockWindow, MockWindows};
    use proptest::prelude::*;

    fn chain(depth: usize) -> (MockWindows, WindowHandle, WindowHandle) {
        let windows = MockWindows::new(1);
        let root = WindowHandle(0x100);
        windows.insert(root, MockWindow::app(1, "Root"));
        let mut leaf = root;
        for i in 0..depth {
            let next = WindowHandle(0x200 + i as isize);
            windows.insert(next, MockWindow::control(leaf));
            leaf = next;
        }
        (windows, root, leaf)
    }

    #[test]
    fn test_display_is_uppercase_hex() {
        assert_eq!(WindowHandle(0x1a2b).to_string(), "0x1A2B");
        assert_eq!(WindowHandle::NULL.to_string(), "0x0");
    }

    #[test]
    fn test_unparented_window_resolves_to_itself() {
        let (windows, root, _) = chain(0);
        assert_eq!(resolve_top_level(&windows, root), Some(root));
    }

    #[test]
    fn test_null_child_has_no_top_level() {
        let (windows, _, _) = chain(2);
        assert_eq!(resolve_top_level(&windows, WindowHandle::NULL), None);
    }

    #[test]
    fn test_fallback_walk_used_when_ancestor_lookup_fails() {
        let (mut windows, root, leaf) = chain(3);
        windows.ancestor_lookup_broken = true;
        assert_eq!(resolve_top_level(&windows, leaf), Some(root));
    }

    #[test]
    fn test_cyclic_parent_chain_yields_nothing() {
        let mut windows = MockWindows::new(1);
        windows.ancestor_lookup_broken = true;
        let a = WindowHandle(0x10);
        let b = WindowHandle(0x20);
        windows.insert(a, MockWindow::control(b));
        windows.insert(b, MockWindow::control(a));
        assert_eq!(resolve_top_level(&windows, a), None);
    }

    proptest! {
        #[test]
        fn test_both_strategies_agree_on_root(depth in 0usize..40, broken in any::<bool>()) {
            let (mut windows, root, leaf) = chain(depth);
            windows.ancestor_lookup_broken = broken;
            prop_assert_eq!(resolve_top_level(&windows, leaf), Some(root));
        }
    }

    #[test]
    fn test_resolution_checks_top_level_invariant() {
        let (windows, _, leaf) = chain(2);
        resolve_top_level(&windows, leaf);
        crate::invariants::contract_test("handle resolution", &[Invariant::ResolvedHandleIsTopLevel]);
    }
}
