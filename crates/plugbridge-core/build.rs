//! Build script for plugbridge-core
//!
//! This script checks requirements before compilation:
//! - Minimum Rust version (`raw-dylib` linking, `offset_of!` = Rust 1.77.0+)
//! - Target support (the host only exists for Windows x86 / x86_64)
//!
//! ## Requirements
//!
//! - **Rust**: 1.77.0 or newer
//! - **Windows**: x86 (x32dbg) or x86_64 (x64dbg)
//! - **Other targets**: build for tests and tooling only, no native host

use std::env;

fn main()
{
    println!("cargo:rerun-if-changed=build.rs");

    // raw-dylib with import_name_type needs 1.71.0, offset_of! in the layout checks 1.77.0
    if let Ok(rustc_version) = rustc_version::version() {
        let min_rust_version = rustc_version::Version::new(1, 77, 0);

        if rustc_version < min_rust_version {
            panic!(
                "plugbridge-core requires Rust {} or newer, found {}",
                min_rust_version, rustc_version
            );
        }
    } else {
        println!("cargo:warning=could not verify Rust version");
    }

    check_target();
}

fn check_target()
{
    let os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let arch = env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();

    if os != "windows" {
        // Cargo sets these for the target, not the host running this script
        println!("cargo:warning=plugbridge-core: no native host on {os}; only the host-independent parts are built");
        return;
    }

    if arch != "x86" && arch != "x86_64" {
        println!("cargo:warning=plugbridge-core: the debugger host does not exist for windows/{arch}");
    }
}
