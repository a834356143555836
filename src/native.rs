//! Binding a capture-exclusion module with `LoadLibraryW` / `GetProcAddress`.

use std::ffi::c_void;
use std::path::{Path, PathBuf};

use log::debug;
use windows::Win32::Foundation::{FreeLibrary, HMODULE, HWND};
use windows::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};
use windows::core::{BOOL, HSTRING, PCSTR};

use crate::errors::{InvokeError, LoadError};
use crate::handle::WindowHandle;
use crate::loader::{
    CaptureExclusion, HIDE_ALL_WINDOWS, ModuleLoader, SET_WINDOW_VISIBILITY, SHOW_ALL_WINDOWS,
};

type HideAllWindowsFn = unsafe extern "system" fn();
type ShowAllWindowsFn = unsafe extern "system" fn();
type SetWindowVisibilityFn = unsafe extern "system" fn(HWND, BOOL) -> BOOL;

/// A loaded module with all entry points resolved.
///
/// The library is never freed: the bound function pointers stay valid for the life of the
/// process.
#[derive(Debug)]
pub struct NativeModule {
    path: PathBuf,
    module: HMODULE,
    hide_all: HideAllWindowsFn,
    show_all: ShowAllWindowsFn,
    set_window: SetWindowVisibilityFn,
}

impl NativeModule {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn raw_module(&self) -> HMODULE {
        self.module
    }
}

impl CaptureExclusion for NativeModule {
    fn hide_all_windows(&self) -> Result<(), InvokeError> {
        unsafe { (self.hide_all)() };
        Ok(())
    }

    fn show_all_windows(&self) -> Result<(), InvokeError> {
        unsafe { (self.show_all)() };
        Ok(())
    }

    fn set_window_visibility(&self, hwnd: WindowHandle, hide: bool) -> Result<bool, InvokeError> {
        if hwnd.is_null() {
            return Err(InvokeError::NullHandle);
        }
        let accepted = unsafe { (self.set_window)(hwnd.into(), hide.into()) };
        Ok(accepted.as_bool())
    }
}

/// Production [`ModuleLoader`].
pub struct Win32Loader;

impl Win32Loader {
    fn symbol(module: HMODULE, path: &Path, name: &'static str) -> Result<*const c_void, LoadError> {
        let cname = format!("{}\0", name);
        unsafe { GetProcAddress(module, PCSTR(cname.as_ptr())) }
            .map(|func| func as *const c_void)
            .ok_or_else(|| LoadError::MissingSymbol {
                path: path.to_path_buf(),
                symbol: name,
            })
    }

    fn bind(module: HMODULE, path: &Path) -> Result<NativeModule, LoadError> {
        let hide_all = Self::symbol(module, path, HIDE_ALL_WINDOWS)?;
        let show_all = Self::symbol(module, path, SHOW_ALL_WINDOWS)?;
        let set_window = Self::symbol(module, path, SET_WINDOW_VISIBILITY)?;

        // Signatures are the module's published ABI; the names were just resolved.
        unsafe {
            Ok(NativeModule {
                path: path.to_path_buf(),
                module,
                hide_all: std::mem::transmute::<*const c_void, HideAllWindowsFn>(hide_all),
                show_all: std::mem::transmute::<*const c_void, ShowAllWindowsFn>(show_all),
                set_window: std::mem::transmute::<*const c_void, SetWindowVisibilityFn>(set_window),
            })
        }
    }
}

impl ModuleLoader for Win32Loader {
    type Module = NativeModule;

    fn load(&self, path: &Path) -> Result<NativeModule, LoadError> {
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let module = unsafe { LoadLibraryW(&HSTRING::from(absolute.as_os_str())) }.map_err(|e| {
            LoadError::Open {
                path: absolute.clone(),
                reason: e.message(),
            }
        })?;

        match Self::bind(module, &absolute) {
            Ok(native) => Ok(native),
            Err(e) => {
                debug!("Releasing {:?} after failed bind", absolute);
                unsafe {
                    let _ = FreeLibrary(module);
                }
                Err(e)
            }
        }
    }
}
