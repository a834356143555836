//! # Build Script
//!
//! Embeds the Windows Application Manifest (`app.manifest`) into the harness executable.
//!
//! The manifest controls:
//! - DPI Awareness (so the test window is not bitmap-stretched on high DPI displays).
//! - Common Controls v6 (themed push button instead of the Windows 95 look).
//! - UAC behavior (`asInvoker`: capture exclusion never needs elevation).

fn main() {
    // embed-resource only links the resource into binaries, so the cdylib stays untouched.
    // We ignore the result because if it fails, the app still builds, just without the manifest.
    let _ = embed_resource::compile("app.manifest", embed_resource::NONE);
}
