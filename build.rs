//! Build script - places the nRF52840 linker script where the linker can
//! find it and, for the firmware image only, adds the link arguments that
//! `cortex-m-rt` and `defmt` expect.

use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));

    fs::copy("memory.x", out_dir.join("memory.x")).expect("memory.x must sit next to Cargo.toml");
    println!("cargo:rustc-link-search={}", out_dir.display());

    // Host test builds share this script; only the firmware binary links
    // against the Cortex-M runtime.
    if env::var_os("CARGO_FEATURE_EMBEDDED").is_some() {
        println!("cargo:rustc-link-arg-bins=--nmagic");
        println!("cargo:rustc-link-arg-bins=-Tlink.x");
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    }

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}
