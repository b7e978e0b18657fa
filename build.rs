//! This build script copies the `memory.x` file from the crate root into a directory where
//! the linker can always find it at build time, and bakes the build time into the firmware
//! as the initial wall clock.

use std::{env, fs::File, io::Write, path::PathBuf};

fn main() {
    // Put memory layout in the output directory and ensure it's on the linker search path.
    let out = &PathBuf::from(env::var_os("OUT_DIR").unwrap());
    File::create(out.join("memory.x"))
        .unwrap()
        .write_all(include_bytes!("memory.x"))
        .unwrap();
    println!("cargo:rustc-link-search={}", out.display());

    // Only the ARM firmware binary needs the cortex-m-rt and defmt linker scripts,
    // host builds of the library and its tests must not see them.
    let firmware = env::var_os("CARGO_FEATURE_FIRMWARE").is_some();
    let arm = env::var("CARGO_CFG_TARGET_ARCH").map_or(false, |arch| arch == "arm");
    if firmware && arm {
        println!("cargo:rustc-link-arg-bins=--nmagic");
        println!("cargo:rustc-link-arg-bins=-Tlink.x");
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    }

    // create rs file with current UTC time
    File::create(out.join("utc.rs"))
        .unwrap()
        .write_fmt(format_args!(
            "const UTC_EPOCH: i64 = {:?};",
            chrono::Utc::now().timestamp()
        ))
        .unwrap();

    // Without `rerun-if-changed` this reruns on every build, keeping `UTC_EPOCH` current.
}
