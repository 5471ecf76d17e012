//! Documentation-extraction core for C++ headers.
//!
//! Reads C++ header source text and produces a structured, addressable
//! model of every declaration together with its documentation comment,
//! resolving identity for overloads, template specializations, and nested
//! scopes. No preprocessing, no include resolution, no full C++ grammar:
//! just enough syntactic understanding to separate and name declarations.
//!
//! # Module structure
//!
//! ```text
//! cppdoc
//! ├── base          shared primitives (line index, text ranges)
//! ├── diagnostics   recoverable anomaly recording
//! ├── parser
//! │   ├── lexer     logos tokenizer, doc-comment classification
//! │   ├── comment   doc-comment tag parsing, literal blocks, autolinks
//! │   ├── scanner   scope-aware declaration delimiting
//! │   └── signature declaration-span normalization
//! └── model
//!     ├── doc       structured comment blocks
//!     └── builder   tree folding, identity keys, copydoc resolution
//! ```
//!
//! # Example
//!
//! ```
//! let document = cppdoc::parse_unit(
//!     "coffee.h",
//!     "namespace coffee {\n/// @brief Brews.\nvoid brew();\n}\n",
//! );
//! let ns = document.root.namespace("coffee").unwrap();
//! assert_eq!(ns.symbol("brew").unwrap().id, "coffee::brew");
//! ```

pub mod base;
pub mod diagnostics;
pub mod model;
pub mod parser;

use rayon::prelude::*;
use smol_str::SmolStr;
use text_size::TextRange;
use tracing::debug;

use crate::diagnostics::DiagnosticSink;
use crate::model::builder;

pub use crate::base::{LineCol, LineIndex};
pub use crate::diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use crate::model::{Document, Member, Project, Scope, Symbol, SymbolKind, Visibility};

/// Parse one header text into its immutable document model, resolving
/// `@copydoc` references within the unit.
pub fn parse_unit(unit: impl Into<SmolStr>, text: &str) -> Document {
    let mut document = build_document(unit.into(), text);
    builder::resolve_copydocs(std::slice::from_mut(&mut document));
    document
}

/// Parse several independent units in parallel, then resolve `@copydoc`
/// references across all of them in a single read-only pass.
pub fn parse_project(units: &[(&str, &str)]) -> Project {
    let mut documents: Vec<Document> = units
        .par_iter()
        .map(|(unit, text)| build_document(SmolStr::new(unit), text))
        .collect();
    builder::resolve_copydocs(&mut documents);
    Project { documents }
}

/// The per-unit pipeline: tokenize, scan, build. Purely sequential, no
/// suspension points, no I/O.
fn build_document(unit: SmolStr, text: &str) -> Document {
    let mut sink = DiagnosticSink::new(unit.clone());
    let (tokens, lex_error) = parser::tokenize(text);
    if let Some(error) = lex_error {
        // Fatal for the rest of this stream only; the token prefix is
        // still scanned.
        sink.error(
            DiagnosticKind::Lex,
            error.line,
            TextRange::empty(error.offset),
            error.to_string(),
        );
    }
    let events = parser::scan(&tokens, &mut sink);
    debug!(
        unit = %unit,
        tokens = tokens.len(),
        events = events.len(),
        "scanned unit"
    );
    let root = builder::build(&tokens, events, &mut sink);
    Document {
        unit,
        root,
        diagnostics: sink.into_vec(),
    }
}
