//! Build identity reported by `--version`.

/// Version line with the commit, date and toolchain the build script stamped in
pub fn version() -> String {
    format!(
        "sextant {} ({} {}) rustc {}",
        env!("CARGO_PKG_VERSION"),
        option_env!("SEXTANT_COMMIT_SHA").unwrap_or("unknown"),
        option_env!("SEXTANT_BUILD_DATE").unwrap_or("unknown"),
        option_env!("SEXTANT_RUSTC_VERSION").unwrap_or("unknown"),
    )
}
