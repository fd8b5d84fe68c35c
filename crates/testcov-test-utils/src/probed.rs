//! A small instrumented function for coverage tests

use testcov_tracer::{branch, probe, Probe};

pub const SOURCE_FILE: &str = file!();
pub const SOURCE: &str = include_str!("probed.rs");

/// Sign of `n`; only the taken arm is recorded
pub fn sign(n: i64, probe: &Probe) -> &'static str {
    probe!(probe);
    if n < 0 {
        branch!(probe, 0);
        "negative"
    } else {
        branch!(probe, 1);
        probe!(probe);
        "non-negative"
    }
}
