//! Build script for logue-host-core.
//!
//! Compiles the C unit under `tests/fixtures/units` into shared libraries so
//! the loader can be tested against real `dlopen` handles. Linux only; when no
//! C compiler is available the fixtures are skipped and the tests that need
//! them return early.

use std::path::{Path, PathBuf};
use std::process::Command;

const SOURCE: &str = "tests/fixtures/units/passthrough.c";

/// Output file and extra defines for each fixture unit.
const VARIANTS: &[(&str, &[&str])] = &[
    ("passthrough.drmlgunit", &[]),
    ("no_init.drmlgunit", &["FIXTURE_NO_INIT"]),
    ("no_render.drmlgunit", &["FIXTURE_NO_RENDER"]),
    ("metered.drmlgunit", &["FIXTURE_PERF_MON"]),
];

fn main() {
    println!("cargo:rerun-if-changed={SOURCE}");
    println!("cargo:rerun-if-changed=build.rs");

    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("linux") {
        return;
    }
    let Some(out_dir) = std::env::var_os("OUT_DIR").map(PathBuf::from) else {
        return;
    };
    let dir = out_dir.join("units");
    if let Err(e) = std::fs::create_dir_all(&dir) {
        println!("cargo:warning=fixture units skipped: {e}");
        return;
    }

    for (name, defines) in VARIANTS {
        if let Err(e) = compile_unit(&dir.join(name), defines) {
            println!("cargo:warning=fixture units skipped: {e}");
            return;
        }
    }
    println!("cargo:rustc-env=LOGUE_FIXTURE_UNIT_DIR={}", dir.display());
}

fn compile_unit(output: &Path, defines: &[&str]) -> Result<(), String> {
    let compiler = cc::Build::new()
        .cargo_metadata(false)
        .try_get_compiler()
        .map_err(|e| e.to_string())?;
    let mut cmd: Command = compiler.to_command();
    cmd.args(["-std=c11", "-shared", "-fPIC", "-fvisibility=hidden", "-o"])
        .arg(output)
        .arg(SOURCE);
    for define in defines {
        cmd.arg(format!("-D{define}"));
    }
    let status = cmd.status().map_err(|e| e.to_string())?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("compiling {} failed ({status})", output.display()))
    }
}
