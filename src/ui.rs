//! # Test Window
//!
//! A plain Win32 window: a handful of `STATIC` labels and one push button, all mirroring
//! [`Harness`]. The window runs on the thread that calls [`run`]; its state lives in a
//! thread-local and every foreign call happens synchronously inside the message loop.
//!
//! Message boxes and some Win32 calls pump messages while we are still inside a handler. Those
//! re-entrant messages find the state already borrowed and fall through to `DefWindowProcW`.

use std::cell::RefCell;
use std::ffi::c_void;

use anyhow::{Context, Result, bail};
use log::{debug, error, info};
use windows::Win32::Foundation::{GetLastError, HINSTANCE, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::Graphics::Gdi::{COLOR_WINDOW, DEFAULT_GUI_FONT, GetStockObject, HBRUSH, UpdateWindow};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::*;
use windows::core::{HSTRING, PCWSTR, w};

use crate::errors::HarnessError;
use crate::handle::WindowHandle;
use crate::harness::{HEADING, Harness, INFO_TEXT, WINDOW_TITLE};
use crate::native::NativeModule;
use crate::system::Win32Windows;

const CLASS_NAME: PCWSTR = w!("WindowHiderHarness");
const WC_STATIC: PCWSTR = w!("STATIC");
const WC_BUTTON: PCWSTR = w!("BUTTON");
const SS_CENTER: WINDOW_STYLE = WINDOW_STYLE(0x0000_0001);
const BN_CLICKED: usize = 0;

const ID_TOGGLE: u16 = 1001;
const RESOLVE_TIMER: usize = 1;
// Give the window a moment on screen before asking for its ancestor.
const RESOLVE_DELAY_MS: u32 = 100;

const WINDOW_WIDTH: i32 = 450;
const WINDOW_HEIGHT: i32 = 400;
const MARGIN: i32 = 10;
const CONTENT_WIDTH: i32 = WINDOW_WIDTH - 4 * MARGIN;
const BUTTON_WIDTH: i32 = 240;
const BUTTON_HEIGHT: i32 = 48;

/// Controls whose text changes at runtime.
struct Controls {
    handle: HWND,
    status: HWND,
    toggle: HWND,
    result: HWND,
    module: HWND,
}

struct WindowState {
    harness: Harness<NativeModule>,
    instance: HINSTANCE,
    controls: Option<Controls>,
}

thread_local! {
    static STATE: RefCell<Option<WindowState>> = const { RefCell::new(None) };
}

/// Runs `f` on the window state, unless it is missing or already borrowed further up the stack.
fn with_state<T>(f: impl FnOnce(&mut WindowState) -> T) -> Option<T> {
    STATE.with(|cell| {
        let mut guard = cell.try_borrow_mut().ok()?;
        guard.as_mut().map(f)
    })
}

/// Creates the test window and pumps messages until it is closed.
pub fn run(harness: Harness<NativeModule>) -> Result<()> {
    unsafe {
        let instance: HINSTANCE = GetModuleHandleW(None).context("GetModuleHandleW failed")?.into();

        let wc = WNDCLASSEXW {
            cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
            style: CS_HREDRAW | CS_VREDRAW,
            lpfnWndProc: Some(wndproc),
            hInstance: instance,
            hCursor: LoadCursorW(None, IDC_ARROW)?,
            hbrBackground: HBRUSH((COLOR_WINDOW.0 + 1) as *mut c_void),
            lpszClassName: CLASS_NAME,
            ..Default::default()
        };
        if RegisterClassExW(&wc) == 0 {
            bail!("RegisterClassExW failed: {:?}", GetLastError());
        }

        STATE.with(|cell| {
            *cell.borrow_mut() = Some(WindowState {
                harness,
                instance,
                controls: None,
            })
        });

        let hwnd = CreateWindowExW(
            WINDOW_EX_STYLE(0),
            CLASS_NAME,
            &HSTRING::from(WINDOW_TITLE),
            WS_OVERLAPPED | WS_CAPTION | WS_SYSMENU | WS_MINIMIZEBOX,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            WINDOW_WIDTH,
            WINDOW_HEIGHT,
            None,
            None,
            Some(instance),
            None,
        )
        .context("CreateWindowExW failed")?;
        info!("Test window created: {}", WindowHandle::from(hwnd));

        let _ = ShowWindow(hwnd, SW_SHOW);
        let _ = UpdateWindow(hwnd);
        SetTimer(Some(hwnd), RESOLVE_TIMER, RESOLVE_DELAY_MS, None);

        let mut msg = MSG::default();
        // GetMessageW returns -1 on error, 0 on WM_QUIT.
        while GetMessageW(&mut msg, None, 0, 0).0 > 0 {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }

    STATE.with(|cell| cell.borrow_mut().take());
    Ok(())
}

unsafe extern "system" fn wndproc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    match msg {
        WM_CREATE => match with_state(|state| create_controls(hwnd, state)) {
            Some(Err(e)) => {
                error!("Failed to create controls: {:#}", e);
                LRESULT(-1)
            }
            _ => LRESULT(0),
        },

        WM_TIMER if wparam.0 == RESOLVE_TIMER => {
            unsafe {
                let _ = KillTimer(Some(hwnd), RESOLVE_TIMER);
            }
            with_state(|state| {
                if let Some(toggle) = state.controls.as_ref().map(|c| c.toggle) {
                    state.harness.resolve_handle(&Win32Windows, toggle.into());
                }
                refresh(state);
            });
            LRESULT(0)
        }

        WM_COMMAND if (wparam.0 & 0xFFFF) as u16 == ID_TOGGLE && (wparam.0 >> 16) & 0xFFFF == BN_CLICKED => {
            let outcome = with_state(|state| {
                let outcome = state.harness.on_toggle();
                refresh(state);
                outcome
            });
            // The borrow is released before the dialog starts pumping messages.
            if let Some(Err(e)) = outcome {
                show_error(hwnd, &e);
            }
            LRESULT(0)
        }

        WM_DESTROY => {
            unsafe { PostQuitMessage(0) };
            LRESULT(0)
        }

        _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
    }
}

fn create_controls(parent: HWND, state: &mut WindowState) -> Result<()> {
    let instance = state.instance;
    let label = |text: &str, y: i32, height: i32| -> Result<HWND> {
        create_child(parent, instance, WC_STATIC, text, SS_CENTER, MARGIN, y, CONTENT_WIDTH, height, 0)
    };

    label(HEADING, 15, 28)?;
    let handle = label(&state.harness.handle_line(), 55, 20)?;
    let status = label(state.harness.status_line(), 85, 24)?;
    label(INFO_TEXT, 120, 40)?;
    let toggle = create_child(
        parent,
        instance,
        WC_BUTTON,
        state.harness.button_label(),
        WS_TABSTOP,
        (WINDOW_WIDTH - BUTTON_WIDTH) / 2 - MARGIN,
        175,
        BUTTON_WIDTH,
        BUTTON_HEIGHT,
        ID_TOGGLE,
    )?;
    let result = label(state.harness.result_line(), 240, 20)?;
    let module = label(state.harness.module_line(), 320, 20)?;

    state.controls = Some(Controls {
        handle,
        status,
        toggle,
        result,
        module,
    });
    refresh(state);
    debug!("Controls created");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn create_child(
    parent: HWND,
    instance: HINSTANCE,
    class: PCWSTR,
    text: &str,
    style: WINDOW_STYLE,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    id: u16,
) -> Result<HWND> {
    unsafe {
        let hwnd = CreateWindowExW(
            WINDOW_EX_STYLE(0),
            class,
            &HSTRING::from(text),
            WS_CHILD | WS_VISIBLE | style,
            x,
            y,
            width,
            height,
            Some(parent),
            Some(HMENU(id as usize as *mut c_void)),
            Some(instance),
            None,
        )?;
        let font = GetStockObject(DEFAULT_GUI_FONT);
        SendMessageW(hwnd, WM_SETFONT, Some(WPARAM(font.0 as usize)), Some(LPARAM(1)));
        Ok(hwnd)
    }
}

/// Copies the harness strings into the controls and enables/disables the toggle.
fn refresh(state: &WindowState) {
    let Some(controls) = &state.controls else {
        return;
    };
    let harness = &state.harness;

    set_text(controls.handle, &harness.handle_line());
    set_text(controls.status, harness.status_line());
    set_text(controls.toggle, harness.button_label());
    set_text(controls.result, harness.result_line());
    set_text(controls.module, harness.module_line());
    unsafe {
        let _ = EnableWindow(controls.toggle, harness.toggle_enabled());
    }
}

fn set_text(hwnd: HWND, text: &str) {
    if let Err(e) = unsafe { SetWindowTextW(hwnd, &HSTRING::from(text)) } {
        debug!("SetWindowTextW failed on {}: {}", WindowHandle::from(hwnd), e);
    }
}

fn show_error(owner: HWND, err: &HarnessError) {
    error!("{}", err);
    unsafe {
        let _ = MessageBoxW(Some(owner), &HSTRING::from(err.to_string()), w!("Error"), MB_OK | MB_ICONERROR);
    }
}
