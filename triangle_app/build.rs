// Build script: compiles the GLSL shaders in resources/shaders to SPIR-V
// under the workspace target/shaders directory.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

const SHADER_EXTENSIONS: [&str; 2] = ["vert", "frag"];

fn is_stale(source: &Path, output: &Path) -> bool {
    let modified = |path: &Path| std::fs::metadata(path).and_then(|meta| meta.modified()).ok();
    match (modified(source), modified(output)) {
        (Some(src), Some(dst)) => src > dst,
        _ => true,
    }
}

fn compile_shader(glslc: &Path, source: &Path, target_dir: &Path) -> bool {
    let Some(file_name) = source.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    // triangle.vert -> triangle.vert.spv, so stages sharing a stem do not collide
    let output = target_dir.join(format!("{file_name}.spv"));

    if !is_stale(source, &output) {
        eprintln!("info: Shader {file_name} is up to date");
        return false;
    }

    match Command::new(glslc).arg(source).arg("-o").arg(&output).status() {
        Ok(status) if status.success() => {
            eprintln!("info: Compiled {file_name} -> {}", output.display());
            true
        }
        Ok(status) => panic!("glslc failed for {file_name} with exit code {}", status.code().unwrap_or(-1)),
        Err(e) => panic!("Failed to run glslc for {file_name}: {e}"),
    }
}

fn main() {
    println!("cargo:rerun-if-changed=resources/shaders");
    println!("cargo:rerun-if-env-changed=VULKAN_SDK");
    println!("cargo:rerun-if-env-changed=SKIP_SHADERS");

    if env::var_os("SKIP_SHADERS").is_some() {
        eprintln!("info: Skipping shader compilation (SKIP_SHADERS set)");
        return;
    }

    let Ok(vulkan_sdk) = env::var("VULKAN_SDK") else {
        println!("cargo:warning=VULKAN_SDK not set, shader compilation skipped");
        return;
    };

    let glslc = if cfg!(target_os = "windows") {
        PathBuf::from(&vulkan_sdk).join("Bin").join("glslc.exe")
    } else {
        PathBuf::from(&vulkan_sdk).join("bin").join("glslc")
    };

    if !glslc.exists() {
        panic!("Shader compiler not found at {}", glslc.display());
    }

    let shader_dir = PathBuf::from("resources/shaders");
    let target_dir = PathBuf::from("../target/shaders");
    if let Err(e) = std::fs::create_dir_all(&target_dir) {
        println!("cargo:warning=Failed to create {}: {e}", target_dir.display());
        return;
    }

    let entries = match std::fs::read_dir(&shader_dir) {
        Ok(entries) => entries,
        Err(e) => {
            println!("cargo:warning=No shader directory at {}: {e}", shader_dir.display());
            return;
        }
    };

    let compiled = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| SHADER_EXTENSIONS.contains(&ext))
        })
        .filter(|path| compile_shader(&glslc, path, &target_dir))
        .count();

    eprintln!("info: {compiled} shader(s) compiled");
}
