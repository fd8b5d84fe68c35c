//! Flat shields-style SVG rendering
//!
//! Output depends only on the percentage and the badge configuration:
//! no timestamps, no ids, no randomness.

use crate::tier::Tier;
use std::fmt::Write as _;
use std::path::Path;
use testcov_core::{BadgeConfig, HarnessError};
use testcov_report::{display_percent, rounded_percent, CoverageSummary};

const HEIGHT: u32 = 20;
const PADDING: u32 = 10;
const LABEL_FILL: &str = "#555";
const FONT: &str = "DejaVu Sans,Verdana,Geneva,sans-serif";

/// A rendered badge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    /// SVG document
    pub svg: String,
    /// Colour tier of the percentage
    pub tier: Tier,
    /// Left-hand text
    pub label: String,
    /// Right-hand text, e.g. `87%`
    pub message: String,
}

impl Badge {
    /// Write the SVG to `path`
    ///
    /// # Errors
    /// Returns `HarnessError::Badge` if the file cannot be written.
    pub fn write(&self, path: &Path) -> Result<(), HarnessError> {
        std::fs::write(path, &self.svg).map_err(|source| HarnessError::Badge {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), tier = %self.tier, message = %self.message, "badge written");
        Ok(())
    }
}

/// Render a badge for a summary's total percentage
#[must_use]
pub fn render(summary: &CoverageSummary, config: &BadgeConfig) -> Badge {
    render_percent(summary.percent(), config)
}

/// Render a badge for a percentage
///
/// The tier is chosen from the whole percentage the badge shows, so the
/// colour always agrees with the text against the thresholds.
#[must_use]
pub fn render_percent(percent: f64, config: &BadgeConfig) -> Badge {
    let tier = Tier::for_percent(rounded_percent(percent), &config.thresholds);
    let message = display_percent(percent);
    let color = tier.color(&config.colors);

    let label_width = text_width(&config.label) + PADDING;
    let message_width = text_width(&message) + PADDING;
    let width = label_width + message_width;
    let label_x = f64::from(label_width) / 2.0;
    let message_x = f64::from(label_width) + f64::from(message_width) / 2.0;

    let label = escape(&config.label);
    let shown = escape(&message);
    let color = escape(color);

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{HEIGHT}" role="img" aria-label="{label}: {shown}">"#
    );
    let _ = writeln!(svg, r#"  <title>{label}: {shown}</title>"#);
    svg.push_str("  <linearGradient id=\"s\" x2=\"0\" y2=\"100%\">\n");
    svg.push_str("    <stop offset=\"0\" stop-color=\"#bbb\" stop-opacity=\".1\"/>\n");
    svg.push_str("    <stop offset=\"1\" stop-opacity=\".1\"/>\n");
    svg.push_str("  </linearGradient>\n");
    let _ = writeln!(
        svg,
        r##"  <mask id="r"><rect width="{width}" height="{HEIGHT}" rx="3" fill="#fff"/></mask>"##
    );
    svg.push_str("  <g mask=\"url(#r)\">\n");
    let _ = writeln!(
        svg,
        r#"    <rect width="{label_width}" height="{HEIGHT}" fill="{LABEL_FILL}"/>"#
    );
    let _ = writeln!(
        svg,
        r#"    <rect x="{label_width}" width="{message_width}" height="{HEIGHT}" fill="{color}"/>"#
    );
    let _ = writeln!(
        svg,
        r#"    <rect width="{width}" height="{HEIGHT}" fill="url(#s)"/>"#
    );
    svg.push_str("  </g>\n");
    let _ = writeln!(
        svg,
        r##"  <g fill="#fff" text-anchor="middle" font-family="{FONT}" font-size="11">"##
    );
    for (x, text) in [(label_x, &label), (message_x, &shown)] {
        let _ = writeln!(
            svg,
            r##"    <text x="{x:.1}" y="15" fill="#010101" fill-opacity=".3">{text}</text>"##
        );
        let _ = writeln!(svg, r#"    <text x="{x:.1}" y="14">{text}</text>"#);
    }
    svg.push_str("  </g>\n");
    svg.push_str("</svg>\n");

    Badge {
        svg,
        tier,
        label: config.label.clone(),
        message,
    }
}

/// Approximate rendered width of `text` in 11px Verdana
fn text_width(text: &str) -> u32 {
    text.chars()
        .map(|c| match c {
            'i' | 'j' | 'l' | '\'' | '.' | ',' | ':' | ';' | '!' | '|' => 3,
            'f' | 'r' | 't' | 'I' | ' ' | '(' | ')' | '-' | '/' => 4,
            'm' | 'w' | 'M' | 'W' | '%' | '@' => 10,
            c if c.is_ascii_uppercase() => 8,
            _ => 7,
        })
        .sum()
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use testcov_core::Site;
    use testcov_report::report;
    use testcov_tracer::CoverageRecord;

    #[test]
    fn zero_percent_is_low() {
        let badge = render_percent(0.0, &BadgeConfig::default());
        assert_eq!(badge.tier, Tier::Low);
        assert_eq!(badge.message, "0%");
        assert!(badge.svg.contains(r##"fill="#e05d44""##));
    }

    #[test]
    fn full_coverage_is_high() {
        let badge = render_percent(100.0, &BadgeConfig::default());
        assert_eq!(badge.tier, Tier::High);
        assert!(badge.svg.contains(r##"fill="#4c1""##));
        assert!(badge.svg.contains(">100%</text>"));
    }

    #[test]
    fn tier_agrees_with_shown_percentage() {
        let config = BadgeConfig::default();

        let badge = render_percent(59.6, &config);
        assert_eq!((badge.message.as_str(), badge.tier), ("60%", Tier::Medium));
        assert!(badge.svg.contains(r##"fill="#dfb317""##));

        let badge = render_percent(59.4, &config);
        assert_eq!((badge.message.as_str(), badge.tier), ("59%", Tier::Low));

        let badge = render_percent(80.4, &config);
        assert_eq!((badge.message.as_str(), badge.tier), ("80%", Tier::Medium));
    }

    #[test]
    fn empty_summary_renders_full() {
        let badge = render(&report(&[]), &BadgeConfig::default());
        assert_eq!(badge.message, "100%");
    }

    #[test]
    fn rendering_is_byte_identical() {
        let mut rec = CoverageRecord::new();
        rec.record("a.rs", Site::line(1), 1);
        rec.record("a.rs", Site::line(2), 0);
        rec.record("a.rs", Site::line(3), 1);
        let summary = report(&[rec]);

        let config = BadgeConfig::default();
        assert_eq!(render(&summary, &config).svg, render(&summary, &config).svg);
        assert_eq!(render(&summary, &config).tier, Tier::Medium);
    }

    #[test]
    fn label_is_escaped() {
        let config = BadgeConfig {
            label: "a<b & \"c\"".to_string(),
            ..BadgeConfig::default()
        };
        let badge = render_percent(50.0, &config);
        assert!(badge.svg.contains("a&lt;b &amp; &quot;c&quot;"));
        assert!(!badge.svg.contains("a<b"));
        assert_eq!(badge.label, "a<b & \"c\"");
    }

    #[test]
    fn width_grows_with_label() {
        let short = render_percent(50.0, &BadgeConfig::default());
        let long = render_percent(
            50.0,
            &BadgeConfig {
                label: "line coverage".to_string(),
                ..BadgeConfig::default()
            },
        );
        assert_eq!(text_width("coverage"), 53);
        assert!(short.svg.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg" width="97""#));
        assert!(long.svg.len() > short.svg.len());
    }

    #[test]
    fn write_and_failure() {
        let dir = tempfile::tempdir().unwrap();
        let badge = render_percent(75.0, &BadgeConfig::default());

        let path = dir.path().join("coverage.svg");
        badge.write(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), badge.svg);

        let err = badge
            .write(&dir.path().join("missing").join("coverage.svg"))
            .unwrap_err();
        assert!(matches!(err, HarnessError::Badge { .. }));
    }
}
