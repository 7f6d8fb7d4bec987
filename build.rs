use std::process::Command;

fn capture(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn main() {
    let commit = capture("git", &["rev-parse", "--short", "HEAD"]);
    // Commit date when building from a checkout, wall clock otherwise.
    let date = capture("git", &["show", "-s", "--format=%cs", "HEAD"])
        .or_else(|| capture("date", &["+%Y-%m-%d"]));
    let rustc = capture("rustc", &["--version"]).and_then(|line| {
        line.strip_prefix("rustc ")
            .and_then(|rest| rest.split_whitespace().next())
            .map(str::to_string)
    });

    println!(
        "cargo:rustc-env=SEXTANT_COMMIT_SHA={}",
        commit.as_deref().unwrap_or("unknown")
    );
    println!(
        "cargo:rustc-env=SEXTANT_BUILD_DATE={}",
        date.as_deref().unwrap_or("unknown")
    );
    println!(
        "cargo:rustc-env=SEXTANT_RUSTC_VERSION={}",
        rustc.as_deref().unwrap_or("unknown")
    );

    println!("cargo:rerun-if-changed=.git/HEAD");
}
