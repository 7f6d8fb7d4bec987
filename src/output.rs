//! Machine-readable envelopes printed on stdout
//!
//! Everything human-oriented goes to stderr; stdout carries exactly one
//! JSON document per invocation so callers can pipe it.

use std::time::Duration;

use serde::Serialize;

use crate::store::IndexCounts;

/// Success envelope for `sync`
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub success: bool,
    pub stats: IndexCounts,
    pub duration: f64,
}

impl SyncReport {
    /// Duration rounds to two decimals so the line stays stable in logs
    pub fn new(stats: IndexCounts, duration: Duration) -> Self {
        Self {
            success: true,
            stats,
            duration: round2(duration.as_secs_f64()),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
