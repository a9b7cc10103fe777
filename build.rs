use std::env;
use std::process::Command;

fn git(args: &[&str]) -> Option<String> {
    let out = Command::new("git").args(args).output().ok()?;
    if !out.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&out.stdout).trim().to_string())
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Version stamp: short commit hash, "-dirty" when the tree has local edits.
    let hash = git(&["rev-parse", "--short=8", "HEAD"]).unwrap_or_else(|| "unknown".into());
    let dirty = git(&["status", "--porcelain"]).map(|s| !s.is_empty()).unwrap_or(false);
    println!(
        "cargo:rustc-env=BUILD_VERSION={}{}",
        hash,
        if dirty { "-dirty" } else { "" }
    );

    // Only link tdjson when the "tdjson" feature is enabled
    if env::var("CARGO_FEATURE_TDJSON").is_err() {
        return;
    }

    if let Ok(dir) = env::var("TDJSON_LIB_DIR") {
        println!("cargo:rustc-link-search=native={}", dir);
    }
    println!("cargo:rustc-link-search=native=/usr/local/lib");
    println!("cargo:rustc-link-search=native=/usr/lib");
    println!("cargo:rustc-link-lib=dylib=tdjson");
}
