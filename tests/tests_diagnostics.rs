//! Recovery behavior: every anomaly produces a diagnostic, never an abort.

use cppdoc::model::DocSegment;
use cppdoc::{DiagnosticKind, LineIndex, Severity};
use rstest::rstest;

fn doc_links(source: &str, symbol: &str) -> Vec<String> {
    let document = cppdoc::parse_unit("links.h", source);
    let symbol = document.root.symbol(symbol).unwrap();
    symbol
        .doc
        .as_ref()
        .unwrap()
        .entries
        .iter()
        .flat_map(|e| e.body.iter())
        .filter_map(|s| match s {
            DocSegment::Link(url) => Some(url.clone()),
            _ => None,
        })
        .collect()
}

#[rstest]
#[case("http://dot.com.", "http://dot.com")]
#[case("http://comma.com,", "http://comma.com")]
#[case("http://exclamationmark.com!", "http://exclamationmark.com")]
#[case("http://questionmark.com?", "http://questionmark.com")]
#[case("http://colon.com:", "http://colon.com")]
#[case("http://semicolon.com;", "http://semicolon.com")]
#[case("http://backslash.com/", "http://backslash.com/")]
fn test_autolink_trailing_punctuation(#[case] written: &str, #[case] linked: &str) {
    let source = format!("/// See {written} for details.\nvoid f();\n");
    let links = doc_links(&source, "f");
    assert_eq!(links, vec![linked.to_string()]);
}

#[test]
fn test_unmatched_open_brace_recovers() {
    let document = cppdoc::parse_unit("broken.h", "namespace a {\nvoid f();\n");
    let diagnostics: Vec<_> = document
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::ScopeImbalance)
        .collect();
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].severity.is_error());
    // The open scope was closed at end of input and kept its contents.
    let ns = document.root.namespace("a").unwrap();
    assert!(ns.symbol("f").is_some());
}

#[test]
fn test_stray_close_brace_is_skipped() {
    let document = cppdoc::parse_unit("broken.h", "}\nint x;\n");
    assert!(document
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::ScopeImbalance));
    assert!(document.root.symbol("x").is_some());
}

#[test]
fn test_unterminated_comment_keeps_prefix() {
    let document = cppdoc::parse_unit("broken.h", "void ok();\n/* never closed\nvoid lost();\n");
    assert!(document.root.symbol("ok").is_some());
    assert!(document.root.symbol("lost").is_none());
    let lex: Vec<_> = document
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::Lex)
        .collect();
    assert_eq!(lex.len(), 1);
    assert_eq!(lex[0].severity, Severity::Error);
}

#[test]
fn test_unparsable_declaration_is_diagnosed_not_dropped_silently() {
    let document = cppdoc::parse_unit("broken.h", "&& &;\nvoid fine();\n");
    assert!(document
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::SignatureParse));
    assert!(document.root.symbol("fine").is_some());
}

#[test]
fn test_diagnostic_lines_agree_with_line_index() {
    let source = "int a;\n#error \"boom\"\nint b;\n";
    let document = cppdoc::parse_unit("lines.h", source);
    let index = LineIndex::new(source);
    let diagnostic = document
        .diagnostics
        .iter()
        .find(|d| d.kind == DiagnosticKind::PreprocessorError)
        .unwrap();
    assert_eq!(diagnostic.line, 1);
    assert_eq!(index.line_col(diagnostic.range.start()).line, diagnostic.line);
}
