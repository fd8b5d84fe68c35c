//! testcov Tracer
//!
//! Observes code execution during a test run and persists what it saw.
//!
//! # Core Concepts
//!
//! - [`Tracer`] / [`Probe`]: concurrent hit counting, fed by [`probe!`] and [`branch!`]
//! - [`CoverageRecord`]: site -> hit count, additive merge
//! - [`TraceSession`]: scoped enable/flush that persists on every exit path
//! - [`CoverageStore`]: atomic, checksummed data file at a configured path
//!
//! # Example
//!
//! ```rust,ignore
//! use testcov_tracer::{CoverageStore, TraceSession, Tracer};
//!
//! let tracer = Tracer::new();
//! tracer.register_source(file!(), include_str!("lib.rs"));
//!
//! let session = TraceSession::start(tracer, CoverageStore::new(".testcov.json"));
//! run_tests(session.probe()).await;
//! let record = session.finish()?;
//! ```

#![warn(unreachable_pub)]

mod record;
mod session;
mod sites;
mod store;
mod tracer;

pub use record::{CoverageRecord, FileRecord};
pub use session::TraceSession;
pub use sites::scan_probe_sites;
pub use store::{checksum, combine, load_file, write_file, CoverageStore, DataFile, FORMAT_VERSION};
pub use tracer::{Probe, Tracer};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
