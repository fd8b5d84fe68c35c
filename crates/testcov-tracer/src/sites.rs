//! Probe site discovery
//!
//! Finds the executable sites of a source text by parsing it and walking
//! its probe macro invocations, so that a probe that never fires still
//! shows up as an uncovered site instead of being absent from the report.
//! Comments and string literals never yield sites.
//!
//! Branch arms are only discoverable when the arm is an integer literal,
//! e.g. `branch!(probe, 1)`.

use testcov_core::Site;
use tree_sitter::{Node, Parser};

const LINE_MACRO: &str = "probe";
const BRANCH_MACRO: &str = "branch";

/// Scan a Rust source text for probe sites
///
/// Lines are 1-based and belong to the outermost macro invocation, which
/// is the line `line!()` reports inside nested macros. Returns no sites if
/// the parser cannot be initialised.
#[must_use]
pub fn scan_probe_sites(source: &str) -> Vec<Site> {
    let mut parser = Parser::new();
    if let Err(err) = parser.set_language(&tree_sitter_rust::LANGUAGE.into()) {
        tracing::warn!(error = %err, "rust grammar unavailable, no probe sites scanned");
        return Vec::new();
    }
    let Some(tree) = parser.parse(source, None) else {
        tracing::warn!("source could not be parsed, no probe sites scanned");
        return Vec::new();
    };

    let text = source.as_bytes();
    let mut sites = Vec::new();
    let mut stack = vec![tree.root_node()];
    while let Some(node) = stack.pop() {
        if node.kind() == "macro_invocation" {
            let line = line_of(node);
            if let Some(site) = invocation_site(node, text, line) {
                sites.push(site);
            }
            // Everything below is a flat token tree
            if let Some(tokens) = token_tree(node) {
                nested_sites(tokens, text, line, &mut sites);
            }
            continue;
        }
        let mut cursor = node.walk();
        stack.extend(node.children(&mut cursor));
    }

    sites.sort();
    sites.dedup();
    sites
}

fn line_of(node: Node<'_>) -> u32 {
    u32::try_from(node.start_position().row + 1).unwrap_or(u32::MAX)
}

fn token_tree(invocation: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = invocation.walk();
    let tree = invocation
        .children(&mut cursor)
        .find(|child| child.kind() == "token_tree");
    tree
}

/// Site of a parsed `probe!`/`branch!` invocation
fn invocation_site(invocation: Node<'_>, text: &[u8], line: u32) -> Option<Site> {
    let path = invocation.child_by_field_name("macro")?.utf8_text(text).ok()?;
    let name = path.rsplit("::").next()?.trim();
    site_for(name, token_tree(invocation)?, text, line)
}

/// Probe invocations inside another macro's arguments, seen as
/// `ident ! (tokens)` sequences
fn nested_sites(tokens: Node<'_>, text: &[u8], line: u32, sites: &mut Vec<Site>) {
    let mut cursor = tokens.walk();
    let children: Vec<Node<'_>> = tokens.children(&mut cursor).collect();

    for window in children.windows(3) {
        let [ident, bang, args] = window else { continue };
        if ident.kind() == "identifier" && is_punct(*bang, text, "!") && args.kind() == "token_tree" {
            if let Some(site) = ident
                .utf8_text(text)
                .ok()
                .and_then(|name| site_for(name, *args, text, line))
            {
                sites.push(site);
            }
        }
    }
    for child in children.iter().filter(|c| c.kind() == "token_tree") {
        nested_sites(*child, text, line, sites);
    }
}

/// Punctuation inside token trees is matched by text, not node kind
fn is_punct(node: Node<'_>, text: &[u8], punct: &str) -> bool {
    node.utf8_text(text).is_ok_and(|t| t == punct)
}

fn site_for(name: &str, args: Node<'_>, text: &[u8], line: u32) -> Option<Site> {
    match name {
        LINE_MACRO => Some(Site::line(line)),
        BRANCH_MACRO => branch_arm(args, text).map(|arm| Site::branch(line, arm)),
        _ => None,
    }
}

/// Last argument of a `branch!(probe, N)` token tree, if it is a literal
fn branch_arm(args: Node<'_>, text: &[u8]) -> Option<u32> {
    let mut cursor = args.walk();
    let children: Vec<Node<'_>> = args.children(&mut cursor).collect();
    // Drop the delimiters and an optional trailing comma
    let inner = children.get(1..children.len().checked_sub(1)?)?;
    let inner = match inner.split_last() {
        Some((last, rest)) if is_punct(*last, text, ",") => rest,
        _ => inner,
    };

    let (arm, rest) = inner.split_last()?;
    if arm.kind() != "integer_literal" || !is_punct(*rest.last()?, text, ",") {
        return None;
    }
    arm.utf8_text(text)
        .ok()?
        .trim_end_matches("u32")
        .replace('_', "")
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_line_probes() {
        let source = "fn a(p: &Probe) {\n    probe!(p);\n    let x = 1;\n    probe!(p);\n}\n";
        assert_eq!(scan_probe_sites(source), vec![Site::line(2), Site::line(4)]);
    }

    #[test]
    fn finds_branch_arms() {
        let source = "fn a(p: &Probe, ok: bool) {\n    if ok {\n        branch!(p, 0);\n    } else {\n        branch!(p, 1);\n    }\n}\n";
        assert_eq!(
            scan_probe_sites(source),
            vec![Site::branch(3, 0), Site::branch(5, 1)]
        );
    }

    #[test]
    fn ignores_comments() {
        let source = "// probe!(p) is how sites are declared\n/// branch!(p, 0)\nfn a(p: &Probe) {\n    probe!(p); // probe!(p)\n    /* disabled: probe!(p); */\n}\n";
        assert_eq!(scan_probe_sites(source), vec![Site::line(4)]);
    }

    #[test]
    fn ignores_string_literals() {
        let source = "fn a(p: &Probe) {\n    probe!(p);\n    let msg = \"call probe!(p) first\";\n    let raw = r#\"branch!(p, 1)\"#;\n}\n";
        assert_eq!(scan_probe_sites(source), vec![Site::line(2)]);
    }

    #[test]
    fn wrapped_branch_arm_is_found() {
        let source = "fn a(&self) {\n    branch!(\n        self.some_long_probe_field_name,\n        1\n    );\n}\n";
        assert_eq!(scan_probe_sites(source), vec![Site::branch(2, 1)]);
    }

    #[test]
    fn qualified_macro_paths_count() {
        let source = "fn a(ctx: &Ctx) {\n    testcov_tracer::probe!(ctx.probe());\n}\n";
        assert_eq!(scan_probe_sites(source), vec![Site::line(2)]);
    }

    #[test]
    fn nested_parens_in_probe_argument() {
        let source = "fn a(ctx: &Ctx) {\n    branch!(ctx.probe(), 1);\n}\n";
        assert_eq!(scan_probe_sites(source), vec![Site::branch(2, 1)]);
    }

    #[test]
    fn non_literal_arm_is_skipped() {
        let source = "fn a(p: &Probe, arm_index: u32) {\n    branch!(p, arm_index);\n}\n";
        assert!(scan_probe_sites(source).is_empty());
    }

    #[test]
    fn probes_inside_other_macros_take_the_outer_line() {
        let source = "async fn a(p: &Probe) {\n    tokio::join!(\n        async { probe!(p); },\n        async { branch!(p, 0); },\n    );\n}\n";
        assert_eq!(
            scan_probe_sites(source),
            vec![Site::line(2), Site::branch(2, 0)]
        );
    }

    #[test]
    fn other_macros_are_not_sites() {
        let source = "fn a() {\n    println!(\"probe\");\n    let s = include_str!(\"x.rs\");\n}\n";
        assert!(scan_probe_sites(source).is_empty());
    }
}
