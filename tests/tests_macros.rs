//! Macro and preprocessor handling over the define fixture.

use std::path::PathBuf;

use cppdoc::model::SymbolKind;
use cppdoc::{DiagnosticKind, Document, Severity};

fn parse_define_fixture() -> Document {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/define.hpp");
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("read {}: {e}", path.display()));
    cppdoc::parse_unit("define.hpp", &text)
}

#[test]
fn test_error_directive_is_recorded_not_fatal() {
    let document = parse_define_fixture();
    let errors: Vec<_> = document
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::PreprocessorError)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].severity, Severity::Warning);
    assert!(errors[0].message.contains("Unable to determine compiler"));

    // Declarations after the #error are still captured.
    assert!(document.root.symbol("REGISTER_MESSAGE_TYPE").is_some());
}

#[test]
fn test_no_hard_errors_in_fixture() {
    let document = parse_define_fixture();
    assert!(document.diagnostics.iter().all(|d| !d.severity.is_error()));
}

#[test]
fn test_register_message_type_macro() {
    let document = parse_define_fixture();
    let symbol = document.root.symbol("REGISTER_MESSAGE_TYPE").unwrap();
    let decl = match &symbol.kind {
        SymbolKind::Macro(m) => m,
        other => panic!("expected macro, got {other:?}"),
    };
    let params: Vec<_> = decl
        .parameters
        .as_ref()
        .unwrap()
        .iter()
        .map(|p| p.as_str())
        .collect();
    assert_eq!(params, vec!["MSG", "TYPE"]);
    assert_eq!(
        decl.body.as_deref(),
        Some("do_some(MSG, TYPE); seriously(); crazy_stuff(MSG, TYPE);")
    );

    let doc = symbol.doc.as_ref().unwrap();
    let targets: Vec<_> = doc.params().filter_map(|p| p.target.as_deref()).collect();
    assert_eq!(targets, vec!["MSG", "TYPE"]);
    assert!(doc.entries[0]
        .body_text()
        .contains("Users must call this macro"));
}

#[test]
fn test_object_and_bare_macros() {
    let document = parse_define_fixture();

    let version = document.root.symbol("VERSION").unwrap();
    match &version.kind {
        SymbolKind::Macro(m) => {
            assert_eq!(m.parameters, None);
            assert_eq!(m.body.as_deref(), Some("\"1.0.0\""));
        }
        other => panic!("VERSION is not a macro: {other:?}"),
    }
    // The /** */ block comment above VERSION carries a @brief.
    let brief = version.doc.as_ref().unwrap().brief().unwrap();
    assert!(brief.body_text().starts_with("The version as a string"));

    match &document.root.symbol("TEST").unwrap().kind {
        SymbolKind::Macro(m) => assert_eq!(m.body.as_deref(), Some("0")),
        other => panic!("TEST is not a macro: {other:?}"),
    }
    match &document.root.symbol("NOVALUE").unwrap().kind {
        SymbolKind::Macro(m) => assert_eq!(m.body, None),
        other => panic!("NOVALUE is not a macro: {other:?}"),
    }
}

#[test]
fn test_repeated_defines_in_conditional_branches() {
    // Conditional blocks are scope-transparent, so PLATFORM_X86 shows up
    // three times with ordinal-disambiguated keys.
    let document = parse_define_fixture();
    let keys: Vec<_> = document
        .root
        .symbols_named("PLATFORM_X86")
        .map(|s| s.id.as_str())
        .collect();
    assert_eq!(keys, vec!["PLATFORM_X86", "PLATFORM_X86#2", "PLATFORM_X86#3"]);
    assert_eq!(
        document
            .diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::DuplicateName)
            .count(),
        2
    );
}
