//! Bundled fixture suite
//!
//! An instrumented event listener dispatcher and the tests that exercise
//! it. The `testcov` binary runs this suite.

pub mod listeners;
mod suite;

pub use suite::suite;

use testcov_tracer::Tracer;

/// Make the dispatcher's probe sites known to `tracer`
pub fn register_sources(tracer: &Tracer) -> usize {
    tracer.register_source(listeners::SOURCE_FILE, listeners::SOURCE)
}
