//! Logos-based tokenizer for C++ header sources.
//!
//! The tokenizer is deliberately permissive: it never fatally rejects
//! exotic syntax. Unknown bytes degrade to single-character tokens, and the
//! only fatal condition is an unterminated block comment or string/char
//! literal at end of input, surfaced as [`LexError`] for the remainder of
//! that one stream.

use logos::Logos;
use text_size::{TextRange, TextSize};
use thiserror::Error;

/// A token with its kind, text, byte offset, and 0-indexed source line.
/// Immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub offset: TextSize,
    pub line: u32,
}

impl Token<'_> {
    pub fn range(&self) -> TextRange {
        TextRange::at(self.offset, TextSize::of(self.text))
    }

    /// Whitespace and non-documentation comments.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }

    pub fn is_doc_comment(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::DocLineComment | TokenKind::DocBlockComment
        )
    }
}

/// Reason a token stream ended early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Error)]
pub enum LexErrorKind {
    #[default]
    #[error("unrecognized input")]
    Unrecognized,
    #[error("unterminated block comment")]
    UnterminatedComment,
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated character literal")]
    UnterminatedChar,
}

/// Fatal lexer failure; fatal only for the remainder of this one stream,
/// never for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{kind} at line {}", line + 1)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub offset: TextSize,
    pub line: u32,
}

/// Lexer wrapping the logos-generated tokenizer, tracking line numbers.
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, RawToken>,
    line: u32,
    failed: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: RawToken::lexer(input),
            line: 0,
            failed: false,
        }
    }

    /// Restart lexing at an absolute byte offset into `input`.
    pub fn starting_at(input: &'a str, offset: TextSize) -> Self {
        let at = usize::from(offset);
        let mut lexer = Self::new(&input[at..]);
        lexer.line = input[..at].bytes().filter(|&b| b == b'\n').count() as u32;
        lexer
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let raw = self.inner.next()?;
        let text = self.inner.slice();
        let offset = TextSize::new(self.inner.span().start as u32);
        let line = self.line;
        self.line += text.bytes().filter(|&b| b == b'\n').count() as u32;

        match raw {
            Ok(token) => Some(Ok(Token {
                kind: classify(token, text),
                text,
                offset,
                line,
            })),
            Err(kind) => {
                self.failed = true;
                Some(Err(LexError { kind, offset, line }))
            }
        }
    }
}

/// Tokenize a whole input. On a fatal lex error the tokens produced so far
/// are still returned so downstream stages can scan the prefix.
pub fn tokenize(input: &str) -> (Vec<Token<'_>>, Option<LexError>) {
    let mut tokens = Vec::new();
    for item in Lexer::new(input) {
        match item {
            Ok(token) => tokens.push(token),
            Err(err) => return (tokens, Some(err)),
        }
    }
    (tokens, None)
}

/// Doc-comment variants are distinguished from plain comments by prefix:
/// `///` and `/**` (but not the empty `/**/`).
fn classify(raw: RawToken, text: &str) -> TokenKind {
    match raw {
        RawToken::LineComment if text.starts_with("///") => TokenKind::DocLineComment,
        RawToken::BlockComment if text.starts_with("/**") && text.len() > 4 => {
            TokenKind::DocBlockComment
        }
        _ => raw.into(),
    }
}

fn lex_block_comment(lex: &mut logos::Lexer<RawToken>) -> Result<(), LexErrorKind> {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            Ok(())
        }
        None => {
            lex.bump(lex.remainder().len());
            Err(LexErrorKind::UnterminatedComment)
        }
    }
}

fn lex_quoted(
    lex: &mut logos::Lexer<RawToken>,
    quote: u8,
    err: LexErrorKind,
) -> Result<(), LexErrorKind> {
    let bytes = lex.remainder().as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => break,
            b if b == quote => {
                lex.bump(i + 1);
                return Ok(());
            }
            _ => i += 1,
        }
    }
    lex.bump(i.min(bytes.len()));
    Err(err)
}

fn lex_string(lex: &mut logos::Lexer<RawToken>) -> Result<(), LexErrorKind> {
    lex_quoted(lex, b'"', LexErrorKind::UnterminatedString)
}

fn lex_char(lex: &mut logos::Lexer<RawToken>) -> Result<(), LexErrorKind> {
    lex_quoted(lex, b'\'', LexErrorKind::UnterminatedChar)
}

/// Consume a preprocessor line as one opaque token, honoring line
/// continuation via a trailing backslash. The terminating newline is left
/// in the stream.
fn lex_preprocessor(lex: &mut logos::Lexer<RawToken>) {
    let rest = lex.remainder();
    let mut consumed = 0;
    loop {
        match rest[consumed..].find('\n') {
            None => {
                consumed = rest.len();
                break;
            }
            Some(i) => {
                let line = rest[consumed..consumed + i].trim_end();
                if line.ends_with('\\') {
                    consumed += i + 1;
                } else {
                    consumed += i;
                    break;
                }
            }
        }
    }
    lex.bump(consumed);
}

/// Logos token enum - maps to TokenKind.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(error = LexErrorKind)]
enum RawToken {
    // =========================================================================
    // TRIVIA AND OPAQUE RUNS
    // =========================================================================
    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    #[regex(r"//[^\n]*")]
    LineComment,

    #[token("/*", lex_block_comment)]
    BlockComment,

    #[token("#", lex_preprocessor)]
    Preprocessor,

    // =========================================================================
    // LITERALS
    // =========================================================================
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    #[regex(r"[0-9][0-9a-zA-Z_.]*")]
    Number,

    #[token("\"", lex_string)]
    Str,

    #[token("'", lex_char)]
    CharLit,

    // =========================================================================
    // MULTI-CHARACTER PUNCTUATION (must come before single-char)
    // =========================================================================
    #[token("::")]
    ColonColon,

    #[token("->")]
    Arrow,

    #[token("<<")]
    Shl,

    #[token(">>")]
    Shr,

    #[token("&&")]
    AmpAmp,

    #[token("...")]
    Ellipsis,

    // =========================================================================
    // SINGLE-CHARACTER PUNCTUATION
    // =========================================================================
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token("=")]
    Eq,
    #[token("*")]
    Star,
    #[token("&")]
    Amp,
    #[token("~")]
    Tilde,
    #[token(".")]
    Dot,

    // Anything else degrades to a single-character token.
    #[regex(r".", priority = 0)]
    Unknown,

    // =========================================================================
    // KEYWORDS (only the ones declaration scanning cares about; all other
    // C++ keywords stay plain identifiers)
    // =========================================================================
    #[token("namespace")]
    NamespaceKw,
    #[token("class")]
    ClassKw,
    #[token("struct")]
    StructKw,
    #[token("enum")]
    EnumKw,
    #[token("template")]
    TemplateKw,
    #[token("typename")]
    TypenameKw,
    #[token("using")]
    UsingKw,
    #[token("typedef")]
    TypedefKw,
    #[token("inline")]
    InlineKw,
    #[token("const")]
    ConstKw,
    #[token("virtual")]
    VirtualKw,
    #[token("static")]
    StaticKw,
    #[token("constexpr")]
    ConstexprKw,
    #[token("explicit")]
    ExplicitKw,
    #[token("noexcept")]
    NoexceptKw,
    #[token("operator")]
    OperatorKw,
    #[token("auto")]
    AutoKw,
    #[token("public")]
    PublicKw,
    #[token("protected")]
    ProtectedKw,
    #[token("private")]
    PrivateKw,
}

/// The public token kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Whitespace,
    LineComment,
    BlockComment,
    DocLineComment,
    DocBlockComment,
    Preprocessor,
    Ident,
    Number,
    Str,
    CharLit,
    ColonColon,
    Arrow,
    Shl,
    Shr,
    AmpAmp,
    Ellipsis,
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Lt,
    Gt,
    Semicolon,
    Colon,
    Comma,
    Eq,
    Star,
    Amp,
    Tilde,
    Dot,
    Unknown,
    NamespaceKw,
    ClassKw,
    StructKw,
    EnumKw,
    TemplateKw,
    TypenameKw,
    UsingKw,
    TypedefKw,
    InlineKw,
    ConstKw,
    VirtualKw,
    StaticKw,
    ConstexprKw,
    ExplicitKw,
    NoexceptKw,
    OperatorKw,
    AutoKw,
    PublicKw,
    ProtectedKw,
    PrivateKw,
}

impl From<RawToken> for TokenKind {
    fn from(raw: RawToken) -> Self {
        use RawToken::*;
        match raw {
            Whitespace => TokenKind::Whitespace,
            LineComment => TokenKind::LineComment,
            BlockComment => TokenKind::BlockComment,
            Preprocessor => TokenKind::Preprocessor,
            Ident => TokenKind::Ident,
            Number => TokenKind::Number,
            Str => TokenKind::Str,
            CharLit => TokenKind::CharLit,
            ColonColon => TokenKind::ColonColon,
            Arrow => TokenKind::Arrow,
            Shl => TokenKind::Shl,
            Shr => TokenKind::Shr,
            AmpAmp => TokenKind::AmpAmp,
            Ellipsis => TokenKind::Ellipsis,
            LBrace => TokenKind::LBrace,
            RBrace => TokenKind::RBrace,
            LParen => TokenKind::LParen,
            RParen => TokenKind::RParen,
            LBracket => TokenKind::LBracket,
            RBracket => TokenKind::RBracket,
            Lt => TokenKind::Lt,
            Gt => TokenKind::Gt,
            Semicolon => TokenKind::Semicolon,
            Colon => TokenKind::Colon,
            Comma => TokenKind::Comma,
            Eq => TokenKind::Eq,
            Star => TokenKind::Star,
            Amp => TokenKind::Amp,
            Tilde => TokenKind::Tilde,
            Dot => TokenKind::Dot,
            Unknown => TokenKind::Unknown,
            NamespaceKw => TokenKind::NamespaceKw,
            ClassKw => TokenKind::ClassKw,
            StructKw => TokenKind::StructKw,
            EnumKw => TokenKind::EnumKw,
            TemplateKw => TokenKind::TemplateKw,
            TypenameKw => TokenKind::TypenameKw,
            UsingKw => TokenKind::UsingKw,
            TypedefKw => TokenKind::TypedefKw,
            InlineKw => TokenKind::InlineKw,
            ConstKw => TokenKind::ConstKw,
            VirtualKw => TokenKind::VirtualKw,
            StaticKw => TokenKind::StaticKw,
            ConstexprKw => TokenKind::ConstexprKw,
            ExplicitKw => TokenKind::ExplicitKw,
            NoexceptKw => TokenKind::NoexceptKw,
            OperatorKw => TokenKind::OperatorKw,
            AutoKw => TokenKind::AutoKw,
            PublicKw => TokenKind::PublicKw,
            ProtectedKw => TokenKind::ProtectedKw,
            PrivateKw => TokenKind::PrivateKw,
        }
    }
}
