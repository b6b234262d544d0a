use std::process::Command;

/// Run a git subcommand and return its trimmed stdout, if it succeeded
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn main() {
    let commit_count = git(&["rev-list", "--count", "HEAD"])
        .and_then(|count| count.parse::<u32>().ok())
        .unwrap_or(0);
    let dirty = git(&["status", "--porcelain"]).is_some_and(|status| !status.is_empty());

    // 0.1.<commits>[+dirty]
    let suffix = if dirty { "+dirty" } else { "" };
    println!("cargo:rustc-env=CHAINER_VERSION=0.1.{commit_count}{suffix}");

    for path in [".git/HEAD", ".git/refs/", ".git/index"] {
        println!("cargo:rerun-if-changed={path}");
    }
}
