//! testcov Badge
//!
//! Renders a coverage percentage as a flat SVG badge coloured by tier.
//!
//! # Example
//!
//! ```rust,ignore
//! use testcov_badge::render;
//!
//! let badge = render(&summary, &config.badge);
//! badge.write(Path::new("coverage.svg"))?;
//! ```

#![warn(unreachable_pub)]

mod svg;
mod tier;

pub use svg::{render, render_percent, Badge};
pub use tier::Tier;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
