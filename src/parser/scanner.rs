//! Scope-aware declaration scanning.
//!
//! Consumes the token stream and emits an ordered event sequence
//! delimiting declarations: namespace/class/enum opens, visibility labels,
//! enum members, function/alias declaration spans, macros, and closing
//! braces. Brace and paren depth are tracked directly; angle-bracket depth
//! is tracked separately because `<`/`>` are also comparison operators: a
//! `<` directly following an identifier (or `template`) in declaration
//! context opens a template-argument context, and a `>>` token closes two
//! levels at once.
//!
//! Conditional-compilation blocks are scope-transparent: their contents are
//! scanned normally. An `#error` line records a diagnostic and never stops
//! the scan.

use std::ops::Range;

use smol_str::SmolStr;
use text_size::TextRange;

use super::comment;
use super::lexer::{Token, TokenKind};
use crate::diagnostics::{DiagnosticKind, DiagnosticSink};
use crate::model::{CommentBlock, Visibility};

/// One scanned item, in source order.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// A documentation comment, to be paired by the model builder.
    Doc(CommentBlock),
    /// `namespace name {` / `inline namespace v1_0_0 {` / `namespace {`.
    NamespaceOpen {
        name: SmolStr,
        is_inline: bool,
        line: u32,
    },
    /// A class/struct header followed by a body; members follow until the
    /// matching [`ScanEvent::ScopeClose`].
    ClassOpen { decl: Decl },
    /// An enum header followed by a body of [`ScanEvent::EnumMember`]s.
    EnumOpen { decl: Decl },
    EnumMember { decl: Decl },
    /// A single declaration span: function-like, alias-like, field, or a
    /// bodiless class/enum forward declaration.
    Declaration { decl: Decl },
    /// A `#define`, possibly spanning continuation lines.
    Macro { decl: Decl },
    /// `public:` / `protected:` / `private:` inside a class body.
    VisibilityLabel { visibility: Visibility, line: u32 },
    /// A closing brace (real or synthesized at end of input).
    ScopeClose { line: u32 },
}

/// A raw declaration span with a coarse kind guess.
#[derive(Debug, Clone)]
pub struct Decl {
    pub kind: DeclKind,
    /// Token range into the scanned slice, trivia included.
    pub tokens: Range<usize>,
    pub range: TextRange,
    pub line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    ClassStruct { has_body: bool },
    Enum { has_body: bool },
    FunctionLike,
    AliasLike,
    EnumMember,
    Macro,
}

/// The kind of scope the scanner is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ctx {
    Top,
    Namespace,
    Class,
}

/// Scan a token slice into an event sequence. Recoverable anomalies go to
/// the sink; the scan itself never fails.
pub fn scan(tokens: &[Token<'_>], sink: &mut DiagnosticSink) -> Vec<ScanEvent> {
    let mut scanner = Scanner {
        tokens,
        pos: 0,
        events: Vec::new(),
        sink,
    };
    scanner.scan_items(Ctx::Top);
    scanner.events
}

struct Scanner<'a, 's> {
    tokens: &'a [Token<'a>],
    pos: usize,
    events: Vec<ScanEvent>,
    sink: &'s mut DiagnosticSink,
}

impl Scanner<'_, '_> {
    // =========================================================================
    // Token inspection
    // =========================================================================

    fn current(&self) -> Option<&Token<'_>> {
        self.tokens.get(self.pos)
    }

    fn current_kind(&self) -> Option<TokenKind> {
        self.current().map(|t| t.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current_kind() == Some(kind)
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn skip_trivia(&mut self) {
        while self.current().is_some_and(|t| t.is_trivia()) {
            self.bump();
        }
    }

    /// Kind of the next non-trivia token after the current one.
    fn next_significant(&self) -> Option<TokenKind> {
        self.tokens[self.pos + 1..]
            .iter()
            .find(|t| !t.is_trivia())
            .map(|t| t.kind)
    }

    /// Kind of the last non-trivia token before `index`.
    fn prev_significant(&self, index: usize) -> Option<TokenKind> {
        self.tokens[..index]
            .iter()
            .rev()
            .find(|t| !t.is_trivia())
            .map(|t| t.kind)
    }

    fn line_at(&self, index: usize) -> u32 {
        self.tokens.get(index).map(|t| t.line).unwrap_or_else(|| {
            self.tokens.last().map(|t| t.line).unwrap_or(0)
        })
    }

    fn make_decl(&self, kind: DeclKind, tokens: Range<usize>) -> Decl {
        let range = match (self.tokens.get(tokens.start), self.tokens.get(tokens.end.saturating_sub(1))) {
            (Some(first), Some(last)) => TextRange::new(first.offset, last.range().end()),
            _ => TextRange::empty(text_size::TextSize::new(0)),
        };
        let line = self
            .tokens
            .get(tokens.clone())
            .and_then(|slice| slice.iter().find(|t| !t.is_trivia()))
            .map(|t| t.line)
            .unwrap_or(0);
        Decl {
            kind,
            tokens,
            range,
            line,
        }
    }

    // =========================================================================
    // Item loop
    // =========================================================================

    fn scan_items(&mut self, ctx: Ctx) {
        loop {
            self.skip_trivia();
            let Some(token) = self.current() else {
                if ctx != Ctx::Top {
                    let line = self.line_at(self.pos);
                    self.sink.error(
                        DiagnosticKind::ScopeImbalance,
                        line,
                        TextRange::empty(
                            self.tokens.last().map(|t| t.range().end()).unwrap_or_default(),
                        ),
                        "unmatched '{' at end of input; closing open scope",
                    );
                    self.events.push(ScanEvent::ScopeClose { line });
                }
                return;
            };

            match token.kind {
                TokenKind::DocLineComment | TokenKind::DocBlockComment => {
                    let (block, next) = comment::collect(self.tokens, self.pos);
                    self.pos = next;
                    self.events.push(ScanEvent::Doc(block));
                }
                TokenKind::Preprocessor => self.scan_preprocessor(),
                // A stray `;` is an empty declaration, not a parse failure.
                TokenKind::Semicolon => self.bump(),
                TokenKind::RBrace => {
                    let line = token.line;
                    if ctx == Ctx::Top {
                        self.sink.error(
                            DiagnosticKind::ScopeImbalance,
                            line,
                            token.range(),
                            "unmatched '}'",
                        );
                        self.bump();
                    } else {
                        self.bump();
                        self.skip_trivia();
                        self.eat(TokenKind::Semicolon);
                        self.events.push(ScanEvent::ScopeClose { line });
                        return;
                    }
                }
                TokenKind::PublicKw | TokenKind::ProtectedKw | TokenKind::PrivateKw
                    if ctx == Ctx::Class && self.next_significant() == Some(TokenKind::Colon) =>
                {
                    let visibility = match token.kind {
                        TokenKind::PublicKw => Visibility::Public,
                        TokenKind::ProtectedKw => Visibility::Protected,
                        _ => Visibility::Private,
                    };
                    let line = token.line;
                    self.bump();
                    self.skip_trivia();
                    self.bump(); // ':'
                    self.events.push(ScanEvent::VisibilityLabel { visibility, line });
                }
                _ => self.scan_declaration(),
            }
        }
    }

    // =========================================================================
    // Preprocessor lines
    // =========================================================================

    fn scan_preprocessor(&mut self) {
        let token = self.tokens[self.pos];
        let directive = token.text[1..].trim_start();
        if directive.starts_with("define") {
            let decl = self.make_decl(DeclKind::Macro, self.pos..self.pos + 1);
            self.events.push(ScanEvent::Macro { decl });
        } else if directive.starts_with("error") {
            // Recorded only; the scan continues past it.
            let message = directive["error".len()..].trim();
            self.sink.warning(
                DiagnosticKind::PreprocessorError,
                token.line,
                token.range(),
                format!("#error {message}"),
            );
        }
        // #if/#elif/#else/#endif/#include/... are scope-transparent.
        self.bump();
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn scan_declaration(&mut self) {
        let start = self.pos;

        // `inline namespace` / `namespace`
        if self.at(TokenKind::InlineKw) && self.next_significant() == Some(TokenKind::NamespaceKw) {
            self.bump();
            self.skip_trivia();
        }
        if self.at(TokenKind::NamespaceKw) {
            self.scan_namespace(start);
            return;
        }

        // Optional template parameter list prefix.
        if self.at(TokenKind::TemplateKw) && self.next_significant() == Some(TokenKind::Lt) {
            self.bump();
            self.skip_trivia();
            self.consume_angles();
            self.skip_trivia();
        }

        match self.current_kind() {
            Some(TokenKind::ClassKw | TokenKind::StructKw) => self.scan_class_or_struct(start),
            Some(TokenKind::EnumKw) => self.scan_enum(start),
            Some(TokenKind::UsingKw | TokenKind::TypedefKw) => {
                let end = self.consume_until_semi_or_body();
                let decl = self.make_decl(DeclKind::AliasLike, start..end);
                self.events.push(ScanEvent::Declaration { decl });
            }
            Some(_) => {
                let end = self.consume_until_semi_or_body();
                let decl = self.make_decl(DeclKind::FunctionLike, start..end);
                self.events.push(ScanEvent::Declaration { decl });
            }
            None => {
                // Lone template prefix at end of input.
                let decl = self.make_decl(DeclKind::FunctionLike, start..self.pos);
                self.events.push(ScanEvent::Declaration { decl });
            }
        }
    }

    fn scan_namespace(&mut self, start: usize) {
        let is_inline = self.tokens[start].kind == TokenKind::InlineKw;
        let line = self.tokens[start].line;
        self.bump(); // namespace
        self.skip_trivia();

        let mut name = String::new();
        while let Some(kind) = self.current_kind() {
            match kind {
                TokenKind::Ident | TokenKind::ColonColon => {
                    name.push_str(self.tokens[self.pos].text);
                    self.bump();
                }
                TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment => {
                    self.bump()
                }
                _ => break,
            }
        }

        if self.eat(TokenKind::LBrace) {
            self.events.push(ScanEvent::NamespaceOpen {
                name: SmolStr::new(name),
                is_inline,
                line,
            });
            self.scan_items(Ctx::Namespace);
        } else {
            // Namespace alias (`namespace a = b;`) or malformed input:
            // capture it as an alias-like declaration span.
            let end = self.consume_until_semi_or_body();
            let decl = self.make_decl(DeclKind::AliasLike, start..end);
            self.events.push(ScanEvent::Declaration { decl });
        }
    }

    fn scan_class_or_struct(&mut self, start: usize) {
        self.bump(); // class / struct
        loop {
            match self.current_kind() {
                Some(TokenKind::Lt)
                    if matches!(
                        self.prev_significant(self.pos),
                        Some(TokenKind::Ident | TokenKind::Gt)
                    ) =>
                {
                    self.consume_angles();
                }
                Some(TokenKind::LBrace) => {
                    let decl =
                        self.make_decl(DeclKind::ClassStruct { has_body: true }, start..self.pos);
                    self.bump();
                    self.events.push(ScanEvent::ClassOpen { decl });
                    self.scan_items(Ctx::Class);
                    return;
                }
                Some(TokenKind::Semicolon) => {
                    let decl =
                        self.make_decl(DeclKind::ClassStruct { has_body: false }, start..self.pos);
                    self.bump();
                    self.events.push(ScanEvent::Declaration { decl });
                    return;
                }
                Some(_) => self.bump(),
                None => {
                    let decl =
                        self.make_decl(DeclKind::ClassStruct { has_body: false }, start..self.pos);
                    self.events.push(ScanEvent::Declaration { decl });
                    return;
                }
            }
        }
    }

    fn scan_enum(&mut self, start: usize) {
        self.bump(); // enum
        loop {
            match self.current_kind() {
                Some(TokenKind::LBrace) => {
                    let decl = self.make_decl(DeclKind::Enum { has_body: true }, start..self.pos);
                    self.bump();
                    self.events.push(ScanEvent::EnumOpen { decl });
                    self.scan_enum_body();
                    return;
                }
                Some(TokenKind::Semicolon) => {
                    let decl = self.make_decl(DeclKind::Enum { has_body: false }, start..self.pos);
                    self.bump();
                    self.events.push(ScanEvent::Declaration { decl });
                    return;
                }
                Some(_) => self.bump(),
                None => {
                    let decl = self.make_decl(DeclKind::Enum { has_body: false }, start..self.pos);
                    self.events.push(ScanEvent::Declaration { decl });
                    return;
                }
            }
        }
    }

    fn scan_enum_body(&mut self) {
        loop {
            self.skip_trivia();
            match self.current_kind() {
                None => {
                    let line = self.line_at(self.pos);
                    self.sink.error(
                        DiagnosticKind::ScopeImbalance,
                        line,
                        TextRange::empty(
                            self.tokens.last().map(|t| t.range().end()).unwrap_or_default(),
                        ),
                        "unterminated enum body",
                    );
                    self.events.push(ScanEvent::ScopeClose { line });
                    return;
                }
                Some(TokenKind::DocLineComment | TokenKind::DocBlockComment) => {
                    let (block, next) = comment::collect(self.tokens, self.pos);
                    self.pos = next;
                    self.events.push(ScanEvent::Doc(block));
                }
                Some(TokenKind::RBrace) => {
                    let line = self.tokens[self.pos].line;
                    self.bump();
                    self.skip_trivia();
                    self.eat(TokenKind::Semicolon);
                    self.events.push(ScanEvent::ScopeClose { line });
                    return;
                }
                Some(TokenKind::Comma) => self.bump(),
                Some(_) => {
                    let start = self.pos;
                    let mut paren = 0i32;
                    while let Some(kind) = self.current_kind() {
                        match kind {
                            TokenKind::LParen => paren += 1,
                            TokenKind::RParen => paren -= 1,
                            TokenKind::Comma | TokenKind::RBrace if paren <= 0 => break,
                            _ => {}
                        }
                        self.bump();
                    }
                    let decl = self.make_decl(DeclKind::EnumMember, start..self.pos);
                    self.events.push(ScanEvent::EnumMember { decl });
                }
            }
        }
    }

    // =========================================================================
    // Balanced consumption
    // =========================================================================

    /// Consume a declaration up to its terminating `;` (exclusive of the
    /// semicolon) or its `{` body (which is skipped). Returns the exclusive
    /// token end of the declaration span.
    fn consume_until_semi_or_body(&mut self) -> usize {
        let mut paren = 0i32;
        let mut bracket = 0i32;
        loop {
            match self.current_kind() {
                None => return self.pos,
                Some(TokenKind::Semicolon) if paren <= 0 && bracket <= 0 => {
                    let end = self.pos;
                    self.bump();
                    return end;
                }
                Some(TokenKind::LParen) => {
                    paren += 1;
                    self.bump();
                }
                Some(TokenKind::RParen) => {
                    paren -= 1;
                    self.bump();
                }
                Some(TokenKind::LBracket) => {
                    bracket += 1;
                    self.bump();
                }
                Some(TokenKind::RBracket) => {
                    bracket -= 1;
                    self.bump();
                }
                Some(TokenKind::LBrace) if paren <= 0 && bracket <= 0 => {
                    if self.prev_significant(self.pos) == Some(TokenKind::Eq) {
                        // Brace initializer: part of the declaration.
                        self.skip_balanced_braces();
                    } else {
                        // Function body: the declaration ends here.
                        let end = self.pos;
                        self.skip_balanced_braces();
                        self.skip_trivia();
                        self.eat(TokenKind::Semicolon);
                        return end;
                    }
                }
                Some(TokenKind::LBrace) => {
                    // Brace inside parens (lambda default argument etc.).
                    self.skip_balanced_braces();
                }
                Some(TokenKind::RBrace) => {
                    // The enclosing scope is closing; this declaration is
                    // missing its ';'. Leave the brace for the item loop.
                    return self.pos;
                }
                Some(_) => self.bump(),
            }
        }
    }

    fn skip_balanced_braces(&mut self) {
        let open = self.pos;
        let mut depth = 0i32;
        while let Some(kind) = self.current_kind() {
            match kind {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        self.bump();
                        return;
                    }
                }
                _ => {}
            }
            self.bump();
        }
        let token = self.tokens[open];
        self.sink.error(
            DiagnosticKind::ScopeImbalance,
            token.line,
            token.range(),
            "unmatched '{' in body",
        );
    }

    /// Consume a balanced `<...>` run, honoring `>>` closing two levels.
    fn consume_angles(&mut self) {
        let open = self.pos;
        let mut depth = 0i32;
        while let Some(kind) = self.current_kind() {
            match kind {
                TokenKind::Lt => depth += 1,
                TokenKind::Shl => depth += 2,
                TokenKind::Gt => depth -= 1,
                TokenKind::Shr => depth -= 2,
                _ => {}
            }
            self.bump();
            if depth <= 0 {
                return;
            }
        }
        let token = self.tokens[open];
        self.sink.error(
            DiagnosticKind::ScopeImbalance,
            token.line,
            token.range(),
            "unmatched '<' in template parameter list",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::tokenize;

    fn scan_source(source: &str) -> (Vec<ScanEvent>, DiagnosticSink) {
        let (tokens, err) = tokenize(source);
        assert!(err.is_none());
        let mut sink = DiagnosticSink::new("test.h");
        let events = scan(&tokens, &mut sink);
        (events, sink)
    }

    fn kinds(events: &[ScanEvent]) -> Vec<&'static str> {
        events
            .iter()
            .map(|e| match e {
                ScanEvent::Doc(_) => "doc",
                ScanEvent::NamespaceOpen { .. } => "namespace",
                ScanEvent::ClassOpen { .. } => "class",
                ScanEvent::EnumOpen { .. } => "enum",
                ScanEvent::EnumMember { .. } => "enum-member",
                ScanEvent::Declaration { .. } => "decl",
                ScanEvent::Macro { .. } => "macro",
                ScanEvent::VisibilityLabel { .. } => "visibility",
                ScanEvent::ScopeClose { .. } => "close",
            })
            .collect()
    }

    #[test]
    fn test_scan_namespace_and_function() {
        let (events, sink) = scan_source("namespace coffee {\nvoid print(double a, int* b);\n}\n");
        assert!(sink.is_empty());
        assert_eq!(kinds(&events), vec!["namespace", "decl", "close"]);
    }

    #[test]
    fn test_scan_inline_namespace() {
        let (events, _) = scan_source("inline namespace v1_0_0 { }\n");
        match &events[0] {
            ScanEvent::NamespaceOpen { name, is_inline, .. } => {
                assert_eq!(name.as_str(), "v1_0_0");
                assert!(is_inline);
            }
            other => panic!("expected namespace open, got {other:?}"),
        }
    }

    #[test]
    fn test_scan_anonymous_namespace() {
        let (events, _) = scan_source("namespace { int x; }\n");
        match &events[0] {
            ScanEvent::NamespaceOpen { name, .. } => assert_eq!(name.as_str(), ""),
            other => panic!("expected namespace open, got {other:?}"),
        }
    }

    #[test]
    fn test_scan_class_with_visibility() {
        let (events, _) = scan_source(
            "class machine {\npublic:\n  machine();\nprivate:\n  void help_brew();\n};\n",
        );
        assert_eq!(
            kinds(&events),
            vec!["class", "visibility", "decl", "visibility", "decl", "close"]
        );
    }

    #[test]
    fn test_scan_function_body_is_skipped() {
        let (events, sink) = scan_source(
            "template <class T>\nvoid f(const T& value)\n{\n    if (x) { y(); }\n}\nint g();\n",
        );
        assert!(sink.is_empty());
        assert_eq!(kinds(&events), vec!["decl", "decl"]);
    }

    #[test]
    fn test_scan_enum_members() {
        let (events, _) = scan_source(
            "enum class mug_size {\n/// The Short version\nShort = 8,\nTall,\nGrande\n};\n",
        );
        assert_eq!(
            kinds(&events),
            vec!["enum", "doc", "enum-member", "enum-member", "enum-member", "close"]
        );
    }

    #[test]
    fn test_scan_template_specialization_header() {
        let (events, _) = scan_source("template <>\nstruct cup<tea, 5>\n{\n};\n");
        assert_eq!(kinds(&events), vec!["class", "close"]);
    }

    #[test]
    fn test_scan_error_directive_does_not_abort() {
        let source = "#if defined(A)\n#define X 1\n#else\n#error \"nope\"\n#endif\nint x;\n";
        let (events, sink) = scan_source(source);
        assert_eq!(kinds(&events), vec!["macro", "decl"]);
        let diags: Vec<_> = sink.iter().collect();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::PreprocessorError);
        assert!(!diags[0].severity.is_error());
    }

    #[test]
    fn test_scan_unmatched_brace_recovers() {
        let (events, sink) = scan_source("namespace a {\nint x;\n");
        assert_eq!(kinds(&events), vec!["namespace", "decl", "close"]);
        assert!(sink.iter().any(|d| d.kind == DiagnosticKind::ScopeImbalance));
    }

    #[test]
    fn test_scan_stray_semicolon_is_not_a_declaration() {
        let (events, sink) = scan_source("namespace a {\n;\nvoid f();\n;\n}\n;;\n");
        assert!(sink.is_empty());
        assert_eq!(kinds(&events), vec!["namespace", "decl", "close"]);
    }

    #[test]
    fn test_scan_angle_depth_with_shift_close() {
        let (events, sink) =
            scan_source("template <class T = vector<vector<int>>>\nclass deep {\n};\n");
        assert!(sink.is_empty());
        assert_eq!(kinds(&events), vec!["class", "close"]);
    }

    #[test]
    fn test_scan_doc_comment_pairing_order() {
        let (events, _) = scan_source("/// Constructor\nmachine();\n");
        assert_eq!(kinds(&events), vec!["doc", "decl"]);
    }
}
