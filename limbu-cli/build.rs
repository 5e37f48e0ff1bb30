use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Short commit id of the workspace, with a `-dirty` suffix for local edits.
fn describe(workspace: &Path) -> Option<String> {
    let out = Command::new("git")
        .arg("-C")
        .arg(workspace)
        .args(["describe", "--always", "--dirty", "--abbrev=8"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let text = String::from_utf8(out.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_owned())
}

fn main() {
    let crate_dir = PathBuf::from(env::var_os("CARGO_MANIFEST_DIR").unwrap_or_else(|| ".".into()));
    let workspace = crate_dir.parent().unwrap_or(&crate_dir).to_path_buf();

    let build_id = env::var("LIMBU_BUILD_SHA")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| describe(&workspace))
        .unwrap_or_else(|| "unknown".to_owned());

    println!("cargo:rustc-env=LIMBU_BUILD_SHA={build_id}");
    println!("cargo:rerun-if-env-changed=LIMBU_BUILD_SHA");
    let head = workspace.join(".git").join("HEAD");
    if head.exists() {
        println!("cargo:rerun-if-changed={}", head.display());
    }
}
