//! testcov Core
//!
//! Vocabulary shared by every stage of the harness pipeline:
//! - [`Location`] and [`Site`]: where a test lives, where a probe fires
//! - [`TestStatus`] and [`TestResult`]: outcome of one executed test case
//! - [`RunParameters`]: runtime parameters forwarded to tests (e.g. a token)
//! - [`HarnessError`], [`TestFault`]: the error taxonomy
//! - [`HarnessConfig`]: TOML-backed configuration for runner, coverage and badge
//!
//! # Example
//!
//! ```rust,ignore
//! use testcov_core::{HarnessConfig, RunParameters};
//!
//! let config = HarnessConfig::load_or_default(Some("testcov.toml".as_ref()))?;
//! let params = RunParameters::new().with_token("secret");
//! assert_eq!(params.token(), Some("secret"));
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    BadgeConfig, ConfigError, CoverageConfig, HarnessConfig, MissingParameterPolicy, RunnerConfig,
    Thresholds, TierColors, DEFAULT_CONFIG_FILE, DEFAULT_DATA_FILE,
};
pub use error::{HarnessError, TestFault};
pub use types::{Location, RunParameters, Site, TestResult, TestStatus, TOKEN_PARAM};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
