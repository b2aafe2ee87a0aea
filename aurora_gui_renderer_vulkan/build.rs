//! Compiles the GUI shaders to SPIR-V at build time.
//!
//! Uses glslc from the Vulkan SDK when available. Without an SDK the build
//! still succeeds (the core crate's unit tests need no shaders); creating a
//! pipeline at runtime then reports the missing .spv files.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

const SHADERS: &[&str] = &["gui.vert", "gui.frag"];

fn find_glslc() -> Option<PathBuf> {
    if let Ok(sdk) = env::var("VULKAN_SDK") {
        for candidate in [
            Path::new(&sdk).join("bin").join("glslc"),
            Path::new(&sdk).join("Bin").join("glslc.exe"),
        ] {
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }
    // Fall back to glslc on PATH.
    let name = if cfg!(windows) { "glslc.exe" } else { "glslc" };
    if Command::new(name).arg("--version").output().is_ok() {
        return Some(PathBuf::from(name));
    }
    None
}

fn main() {
    println!("cargo:rerun-if-changed=shaders");
    println!("cargo:rerun-if-env-changed=VULKAN_SDK");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let Some(glslc) = find_glslc() else {
        println!("cargo:warning=glslc not found; GUI shaders will not be compiled");
        return;
    };

    for shader in SHADERS {
        let source = Path::new("shaders").join(shader);
        let output = out_dir.join(format!("{}.spv", shader));

        let status = Command::new(&glslc)
            .arg(&source)
            .arg("-o")
            .arg(&output)
            .status()
            .unwrap_or_else(|e| panic!("failed to run glslc: {}", e));

        if !status.success() {
            panic!("glslc failed on {}", source.display());
        }
    }
}
