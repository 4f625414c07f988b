use std::env;
use std::process::Command;

/// Trimmed stdout of a successful `git` invocation.
fn git(args: &[&str]) -> Option<String> {
    let out = Command::new("git").args(args).output().ok()?;
    if !out.status.success() {
        return None;
    }
    let text = String::from_utf8(out.stdout).ok()?;
    Some(text.trim().to_owned())
}

fn commit() -> String {
    // source tarballs have no .git; packagers pass the commit in
    if let Ok(commit) = env::var("BOOKCHECK_BUILD_COMMIT") {
        return commit;
    }
    let Some(hash) = git(&["rev-parse", "--short=7", "HEAD"]) else {
        return "unknown".into();
    };
    match git(&["status", "--porcelain", "--untracked-files=no"]) {
        Some(changes) if !changes.is_empty() => format!("{hash}-dirty"),
        _ => hash,
    }
}

fn main() {
    for path in ["../../.git/HEAD", "../../.git/refs/heads", "../../.git/index"] {
        println!("cargo:rerun-if-changed={path}");
    }
    println!("cargo:rerun-if-env-changed=BOOKCHECK_BUILD_COMMIT");

    println!("cargo:rustc-env=GIT_COMMIT_HASH={}", commit());
    println!(
        "cargo:rustc-env=TARGET={}",
        env::var("TARGET").as_deref().unwrap_or("unknown")
    );
}
