//! Tokenizing and declaration scanning for C++ header sources.
//!
//! The pipeline is layered: [`lexer`] produces tokens, [`comment`] folds
//! documentation comments into structured blocks, [`scanner`] walks the
//! token stream emitting declaration events, and [`signature`] normalizes
//! each declaration span into its structured form. None of the layers
//! executes or expands anything; preprocessor lines pass through as opaque
//! tokens.

pub mod comment;
pub mod lexer;
pub mod scanner;
pub mod signature;

pub use lexer::{tokenize, LexError, Lexer, Token, TokenKind};
pub use scanner::{scan, Decl, DeclKind, ScanEvent};
