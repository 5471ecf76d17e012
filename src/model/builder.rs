//! Building the symbol model from the scanner's event stream.
//!
//! Three passes per unit: fold the events into a scope tree (pairing each
//! declaration with its nearest preceding documentation comment and the
//! active visibility section), then assign identity keys, and finally,
//! once every unit is built, resolve `@copydoc` references against a flat
//! index.
//!
//! Identity keys are deterministic. Within one scope symbols are grouped by
//! kind and name; a singleton keys as `scope::name`, while groups sharing a
//! name are disambiguated by specialization arguments (class templates),
//! normalized parameter types plus cv-qualifier (functions), and finally a
//! declaration-order ordinal. Keys are whitespace-free so re-renderings of
//! the same signature always agree.

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use text_size::TextRange;
use tracing::debug;

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::parser::lexer::Token;
use crate::parser::scanner::{Decl, DeclKind, ScanEvent};
use crate::parser::signature::{self, Declarator};

use super::{
    ClassDecl, CommentBlock, Document, EnumDecl, Member, Scope, ScopeKind, Symbol, SymbolKind,
    TemplateParameterList, Visibility,
};

/// Fold scan events into the unit's root scope and assign identity keys.
pub fn build(tokens: &[Token<'_>], events: Vec<ScanEvent>, sink: &mut DiagnosticSink) -> Scope {
    let mut builder = Builder {
        tokens,
        sink,
        stack: vec![Frame::root()],
        pending_enum: None,
    };
    for event in events {
        builder.event(event);
    }
    let mut root = builder.finish();
    assign_ids(&mut root, "", sink);
    root
}

// =============================================================================
// Tree folding
// =============================================================================

struct Frame {
    scope: Scope,
    kind: FrameKind,
    visibility: Visibility,
    pending_doc: Option<CommentBlock>,
}

enum FrameKind {
    Root,
    Namespace,
    Class(PendingClass),
    /// A class whose header failed to parse; members are dropped after the
    /// diagnostic was recorded.
    Discard,
}

struct PendingClass {
    name: SmolStr,
    is_struct: bool,
    template_params: Option<TemplateParameterList>,
    specialization_args: Option<Vec<String>>,
    doc: Option<CommentBlock>,
    range: TextRange,
    line: u32,
    visibility: Visibility,
}

struct PendingEnum {
    name: SmolStr,
    decl: EnumDecl,
    doc: Option<CommentBlock>,
    member_doc: Option<CommentBlock>,
    range: TextRange,
    line: u32,
    visibility: Visibility,
}

impl Frame {
    fn root() -> Self {
        Self {
            scope: Scope::new(ScopeKind::Global, ""),
            kind: FrameKind::Root,
            visibility: Visibility::Public,
            pending_doc: None,
        }
    }
}

struct Builder<'a, 's> {
    tokens: &'a [Token<'a>],
    sink: &'s mut DiagnosticSink,
    stack: Vec<Frame>,
    pending_enum: Option<PendingEnum>,
}

impl<'a> Builder<'a, '_> {
    fn top(&mut self) -> &mut Frame {
        self.stack.last_mut().expect("frame stack never empties")
    }

    /// The slice outlives `&self` so diagnostics can be recorded while a
    /// declaration's tokens are still in hand.
    fn decl_tokens(&self, decl: &Decl) -> &'a [Token<'a>] {
        &self.tokens[decl.tokens.clone()]
    }

    fn signature_error(&mut self, decl: &Decl, error: impl std::fmt::Display) {
        self.sink.error(
            DiagnosticKind::SignatureParse,
            decl.line,
            decl.range,
            error.to_string(),
        );
    }

    fn push_symbol(&mut self, name: SmolStr, kind: SymbolKind, decl: &Decl) {
        let frame = self.top();
        let doc = frame.pending_doc.take();
        let visibility = frame.visibility;
        frame.scope.members.push(Member::Symbol(Symbol {
            name,
            id: String::new(),
            kind,
            doc,
            range: decl.range,
            line: decl.line,
            visibility,
        }));
    }

    fn event(&mut self, event: ScanEvent) {
        match event {
            ScanEvent::Doc(block) => match &mut self.pending_enum {
                Some(pending) => pending.member_doc = Some(block),
                None => self.top().pending_doc = Some(block),
            },
            ScanEvent::NamespaceOpen {
                name, is_inline, ..
            } => {
                // Namespaces carry no documentation of their own.
                self.top().pending_doc = None;
                self.stack.push(Frame {
                    scope: Scope::new(ScopeKind::Namespace { is_inline }, name),
                    kind: FrameKind::Namespace,
                    visibility: Visibility::Public,
                    pending_doc: None,
                });
            }
            ScanEvent::VisibilityLabel { visibility, .. } => {
                self.top().visibility = visibility;
            }
            ScanEvent::ClassOpen { decl } => self.class_open(&decl),
            ScanEvent::EnumOpen { decl } => self.enum_open(&decl),
            ScanEvent::EnumMember { decl } => self.enum_member(&decl),
            ScanEvent::Declaration { decl } => self.declaration(&decl),
            ScanEvent::Macro { decl } => self.macro_define(&decl),
            ScanEvent::ScopeClose { .. } => self.scope_close(),
        }
    }

    fn class_open(&mut self, decl: &Decl) {
        match signature::parse_class_header(self.decl_tokens(decl)) {
            Ok(parsed) => {
                let frame = self.top();
                let pending = PendingClass {
                    name: parsed.name,
                    is_struct: parsed.is_struct,
                    template_params: parsed.template_params,
                    specialization_args: parsed.specialization_args,
                    doc: frame.pending_doc.take(),
                    range: decl.range,
                    line: decl.line,
                    visibility: frame.visibility,
                };
                let scope_kind = if pending.is_struct {
                    ScopeKind::Struct
                } else {
                    ScopeKind::Class
                };
                let default_visibility = if pending.is_struct {
                    Visibility::Public
                } else {
                    Visibility::Private
                };
                self.stack.push(Frame {
                    scope: Scope::new(scope_kind, pending.name.clone()),
                    kind: FrameKind::Class(pending),
                    visibility: default_visibility,
                    pending_doc: None,
                });
            }
            Err(error) => {
                self.signature_error(decl, error);
                self.top().pending_doc = None;
                self.stack.push(Frame {
                    scope: Scope::new(ScopeKind::Class, ""),
                    kind: FrameKind::Discard,
                    visibility: Visibility::Private,
                    pending_doc: None,
                });
            }
        }
    }

    fn enum_open(&mut self, decl: &Decl) {
        match signature::parse_enum_header(self.decl_tokens(decl)) {
            Ok(parsed) => {
                let doc = self.top().pending_doc.take();
                let visibility = self.top().visibility;
                self.pending_enum = Some(PendingEnum {
                    name: parsed.name,
                    decl: EnumDecl {
                        is_scoped: parsed.is_scoped,
                        underlying_type: parsed.underlying_type,
                        members: Vec::new(),
                    },
                    doc,
                    member_doc: None,
                    range: decl.range,
                    line: decl.line,
                    visibility,
                });
            }
            Err(error) => {
                self.signature_error(decl, error);
                self.top().pending_doc = None;
                self.pending_enum = Some(PendingEnum {
                    name: SmolStr::default(),
                    decl: EnumDecl {
                        is_scoped: false,
                        underlying_type: None,
                        members: Vec::new(),
                    },
                    doc: None,
                    member_doc: None,
                    range: decl.range,
                    line: decl.line,
                    visibility: Visibility::Public,
                });
            }
        }
    }

    fn enum_member(&mut self, decl: &Decl) {
        match signature::parse_enum_member(self.decl_tokens(decl)) {
            Ok(mut member) => {
                if let Some(pending) = &mut self.pending_enum {
                    member.doc = pending.member_doc.take();
                    pending.decl.members.push(member);
                }
            }
            Err(error) => self.signature_error(decl, error),
        }
    }

    fn declaration(&mut self, decl: &Decl) {
        let toks = self.decl_tokens(decl);
        match decl.kind {
            DeclKind::FunctionLike => match signature::parse_function_or_field(toks) {
                Ok(Declarator::Function { name, sig }) => {
                    self.push_symbol(name, SymbolKind::Function(sig), decl)
                }
                Ok(Declarator::Field { name, field }) => {
                    self.push_symbol(name, SymbolKind::Field(field), decl)
                }
                Err(error) => {
                    self.signature_error(decl, &error);
                    // Keep a degraded symbol when a name is recoverable;
                    // consumers must tolerate empty parameter lists.
                    if let Some((name, sig)) = signature::recover_function(toks) {
                        self.push_symbol(name, SymbolKind::Function(sig), decl);
                    }
                }
            },
            DeclKind::AliasLike => match signature::parse_alias(toks) {
                Ok(parsed) => {
                    self.push_symbol(parsed.name, SymbolKind::TypeAlias(parsed.alias), decl)
                }
                Err(error) => self.signature_error(decl, error),
            },
            DeclKind::ClassStruct { has_body } => match signature::parse_class_header(toks) {
                Ok(parsed) => {
                    let scope_kind = if parsed.is_struct {
                        ScopeKind::Struct
                    } else {
                        ScopeKind::Class
                    };
                    let class = ClassDecl {
                        is_struct: parsed.is_struct,
                        template_params: parsed.template_params,
                        specialization_args: parsed.specialization_args,
                        scope: Scope::new(scope_kind, parsed.name.clone()),
                        has_body,
                    };
                    self.push_symbol(parsed.name, SymbolKind::ClassOrStruct(class), decl);
                }
                Err(error) => self.signature_error(decl, error),
            },
            DeclKind::Enum { .. } => match signature::parse_enum_header(toks) {
                Ok(parsed) => {
                    let decl_body = EnumDecl {
                        is_scoped: parsed.is_scoped,
                        underlying_type: parsed.underlying_type,
                        members: Vec::new(),
                    };
                    self.push_symbol(parsed.name, SymbolKind::Enum(decl_body), decl);
                }
                Err(error) => self.signature_error(decl, error),
            },
            DeclKind::EnumMember | DeclKind::Macro => {
                debug!(kind = ?decl.kind, "declaration event with out-of-place kind");
            }
        }
    }

    fn macro_define(&mut self, decl: &Decl) {
        let text = self.tokens[decl.tokens.start].text;
        match signature::parse_macro(text) {
            Ok(parsed) => self.push_symbol(parsed.name, SymbolKind::Macro(parsed.decl), decl),
            Err(error) => self.signature_error(decl, error),
        }
    }

    fn scope_close(&mut self) {
        if let Some(pending) = self.pending_enum.take() {
            let frame = self.top();
            frame.scope.members.push(Member::Symbol(Symbol {
                name: pending.name,
                id: String::new(),
                kind: SymbolKind::Enum(pending.decl),
                doc: pending.doc,
                range: pending.range,
                line: pending.line,
                visibility: pending.visibility,
            }));
            return;
        }
        if self.stack.len() <= 1 {
            return;
        }
        let frame = self.stack.pop().expect("stack checked non-empty");
        let parent = self.top();
        match frame.kind {
            FrameKind::Namespace => parent.scope.members.push(Member::Namespace(frame.scope)),
            FrameKind::Class(pending) => {
                let class = ClassDecl {
                    is_struct: pending.is_struct,
                    template_params: pending.template_params,
                    specialization_args: pending.specialization_args,
                    scope: frame.scope,
                    has_body: true,
                };
                parent.scope.members.push(Member::Symbol(Symbol {
                    name: pending.name,
                    id: String::new(),
                    kind: SymbolKind::ClassOrStruct(class),
                    doc: pending.doc,
                    range: pending.range,
                    line: pending.line,
                    visibility: pending.visibility,
                }));
            }
            FrameKind::Discard | FrameKind::Root => {}
        }
    }

    fn finish(mut self) -> Scope {
        // The scanner synthesizes closes for every open scope, so anything
        // left here is already covered by a ScopeImbalance diagnostic.
        while self.stack.len() > 1 || self.pending_enum.is_some() {
            self.scope_close();
        }
        self.stack.pop().map(|f| f.scope).expect("root frame")
    }
}

// =============================================================================
// Identity keys
// =============================================================================

/// Grouping tag: functions and class templates may share a name, the rest
/// may not.
fn group_tag(kind: &SymbolKind) -> u8 {
    match kind {
        SymbolKind::Function(_) => 0,
        SymbolKind::TypeAlias(_) => 1,
        SymbolKind::Enum(_) => 2,
        SymbolKind::Field(_) => 3,
        SymbolKind::ClassOrStruct(_) => 4,
        SymbolKind::Macro(_) => 5,
    }
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn join_path(path: &str, name: &str) -> String {
    if path.is_empty() || name.is_empty() {
        format!("{path}{name}")
    } else {
        format!("{path}::{name}")
    }
}

fn assign_ids(scope: &mut Scope, path: &str, sink: &mut DiagnosticSink) {
    let mut groups: FxHashMap<(u8, SmolStr), usize> = FxHashMap::default();
    for symbol in scope.symbols() {
        *groups
            .entry((group_tag(&symbol.kind), symbol.name.clone()))
            .or_insert(0) += 1;
    }

    let mut seen: FxHashMap<String, u32> = FxHashMap::default();
    for member in &mut scope.members {
        match member {
            Member::Namespace(ns) => {
                let child_path = join_path(path, &ns.name);
                assign_ids(ns, &child_path, sink);
            }
            Member::Symbol(symbol) => {
                let shared = groups[&(group_tag(&symbol.kind), symbol.name.clone())] > 1;
                let mut key = join_path(path, &symbol.name);
                if shared {
                    match &symbol.kind {
                        SymbolKind::ClassOrStruct(class) => {
                            let args = class
                                .specialization_args
                                .as_ref()
                                .map(|args| args.join(","))
                                .or_else(|| {
                                    class.template_params.as_ref().map(|p| p.render_names())
                                });
                            if let Some(args) = args {
                                key = format!("{key}<{args}>");
                            }
                        }
                        SymbolKind::Function(sig) => {
                            let types: Vec<&str> =
                                sig.parameters.iter().map(|p| p.type_text.as_str()).collect();
                            key = format!("{key}({})", types.join(","));
                            if sig.qualifiers.is_const {
                                key.push_str("const");
                            }
                        }
                        _ => {}
                    }
                }
                let mut key = strip_whitespace(&key);

                // Residual collision: identical signatures or a
                // non-overloadable kind sharing a name.
                let ordinal = seen.entry(key.clone()).or_insert(0);
                *ordinal += 1;
                if *ordinal > 1 {
                    if !symbol.kind.is_overloadable() {
                        sink.warning(
                            DiagnosticKind::DuplicateName,
                            symbol.line,
                            symbol.range,
                            format!(
                                "{} `{}` redeclares an existing name in this scope",
                                symbol.kind.display(),
                                symbol.name
                            ),
                        );
                    }
                    key = format!("{key}#{ordinal}");
                }
                symbol.id = key;

                if let SymbolKind::ClassOrStruct(class) = &mut symbol.kind {
                    let child_path = symbol.id.clone();
                    assign_ids(&mut class.scope, &child_path, sink);
                }
            }
        }
    }
}

// =============================================================================
// Copydoc resolution
// =============================================================================

struct IndexEntry {
    unit: usize,
    id: String,
    /// Whitespace-free strings this symbol answers to: bare name, qualified
    /// path, inline/anonymous-namespace-collapsed path, full identity key.
    names: Vec<String>,
    doc: Option<CommentBlock>,
    pending: Option<String>,
    line: u32,
    range: TextRange,
}

/// Resolve `@copydoc` references across all built documents. Runs after
/// every unit's tree exists; failures become [`UnresolvedCopydoc`]
/// diagnostics on the referencing unit and leave the symbol undocumented.
///
/// [`UnresolvedCopydoc`]: DiagnosticKind::UnresolvedCopydoc
pub fn resolve_copydocs(documents: &mut [Document]) {
    let mut entries = Vec::new();
    for (unit, document) in documents.iter().enumerate() {
        index_scope(&document.root, "", "", unit, &mut entries);
    }
    debug!(symbols = entries.len(), "resolving copydoc references");

    let mut resolved: FxHashMap<(usize, String), Option<CommentBlock>> = FxHashMap::default();
    let mut failures: Vec<(usize, Diagnostic)> = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        let Some(target) = &entry.pending else {
            continue;
        };
        match follow(&entries, i, target) {
            Ok(block) => {
                resolved.insert((entry.unit, entry.id.clone()), Some(block));
            }
            Err(reason) => {
                resolved.insert((entry.unit, entry.id.clone()), None);
                failures.push((
                    entry.unit,
                    Diagnostic::warning(
                        DiagnosticKind::UnresolvedCopydoc,
                        entry.line,
                        entry.range,
                        format!("@copydoc {target}: {reason}"),
                    ),
                ));
            }
        }
    }

    for (unit, document) in documents.iter_mut().enumerate() {
        apply_resolutions(&mut document.root, unit, &resolved);
    }
    for (unit, diagnostic) in failures {
        documents[unit].diagnostics.push(diagnostic);
    }
}

fn index_scope(
    scope: &Scope,
    full: &str,
    collapsed: &str,
    unit: usize,
    out: &mut Vec<IndexEntry>,
) {
    for member in &scope.members {
        match member {
            Member::Namespace(ns) => {
                let child_full = join_path(full, &ns.name);
                // Inline and anonymous namespace members are addressable
                // at the enclosing level too.
                let child_collapsed = match ns.kind {
                    ScopeKind::Namespace { is_inline: true } => collapsed.to_owned(),
                    _ if ns.name.is_empty() => collapsed.to_owned(),
                    _ => join_path(collapsed, &ns.name),
                };
                index_scope(ns, &child_full, &child_collapsed, unit, out);
            }
            Member::Symbol(symbol) => {
                let mut names = vec![
                    symbol.name.to_string(),
                    join_path(full, &symbol.name),
                    join_path(collapsed, &symbol.name),
                    symbol.id.clone(),
                ];
                names = names.into_iter().map(|n| strip_whitespace(&n)).collect();
                names.dedup();
                let pending = symbol
                    .doc
                    .as_ref()
                    .filter(|d| d.is_pending_copydoc())
                    .and_then(|d| d.copydoc_target())
                    .map(str::to_owned);
                out.push(IndexEntry {
                    unit,
                    id: symbol.id.clone(),
                    names,
                    doc: symbol.doc.clone(),
                    pending,
                    line: symbol.line,
                    range: symbol.range,
                });
                match &symbol.kind {
                    SymbolKind::ClassOrStruct(class) => {
                        // Members key off the owning symbol's identity so that
                        // specializations keep their members distinct.
                        index_scope(&class.scope, &symbol.id, &symbol.id, unit, out);
                    }
                    SymbolKind::Enum(decl) => {
                        // Enum members are addressable under every path the
                        // enum itself answers to.
                        for member in &decl.members {
                            let qualified =
                                |base: &str| strip_whitespace(&format!("{base}::{}", member.name));
                            let mut names = vec![
                                member.name.to_string(),
                                qualified(&symbol.name),
                                qualified(&join_path(full, &symbol.name)),
                                qualified(&join_path(collapsed, &symbol.name)),
                                qualified(&symbol.id),
                            ];
                            names.dedup();
                            let pending = member
                                .doc
                                .as_ref()
                                .filter(|d| d.is_pending_copydoc())
                                .and_then(|d| d.copydoc_target())
                                .map(str::to_owned);
                            let (line, range) = member
                                .doc
                                .as_ref()
                                .map(|d| (d.line, d.range))
                                .unwrap_or((symbol.line, symbol.range));
                            out.push(IndexEntry {
                                unit,
                                id: format!("{}::{}", symbol.id, member.name),
                                names,
                                doc: member.doc.clone(),
                                pending,
                                line,
                                range,
                            });
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Follow a copydoc chain to a concrete comment block. The requesting
/// symbol and every symbol already visited are excluded from candidate
/// sets, which both breaks cycles and lets `@copydoc name` on one overload
/// reach its sibling.
fn follow(
    entries: &[IndexEntry],
    requester: usize,
    target: &str,
) -> Result<CommentBlock, String> {
    let mut visited: FxHashSet<usize> = FxHashSet::default();
    visited.insert(requester);
    let mut target = strip_whitespace(target);

    loop {
        // A partially qualified target (`water_tank::fill`) matches any
        // candidate path ending in it at a scope boundary.
        let suffix = format!("::{target}");
        let candidates: Vec<usize> = entries
            .iter()
            .enumerate()
            .filter(|(i, e)| {
                !visited.contains(i)
                    && e.doc.is_some()
                    && e.names.iter().any(|n| n == &target || n.ends_with(&suffix))
            })
            .map(|(i, _)| i)
            .collect();
        let next = match candidates.as_slice() {
            [single] => *single,
            [] => return Err("no documented symbol matches the reference".to_owned()),
            _ => {
                return Err(format!(
                    "reference is ambiguous ({} candidates)",
                    candidates.len()
                ))
            }
        };
        visited.insert(next);
        match &entries[next].pending {
            Some(chained) => target = strip_whitespace(chained),
            None => {
                return Ok(entries[next]
                    .doc
                    .clone()
                    .expect("candidates are filtered to documented symbols"))
            }
        }
    }
}

fn apply_resolutions(
    scope: &mut Scope,
    unit: usize,
    resolved: &FxHashMap<(usize, String), Option<CommentBlock>>,
) {
    for member in &mut scope.members {
        match member {
            Member::Namespace(ns) => apply_resolutions(ns, unit, resolved),
            Member::Symbol(symbol) => {
                if symbol.doc.as_ref().is_some_and(|d| d.is_pending_copydoc()) {
                    if let Some(outcome) = resolved.get(&(unit, symbol.id.clone())) {
                        symbol.doc = outcome.clone();
                    }
                }
                match &mut symbol.kind {
                    SymbolKind::ClassOrStruct(class) => {
                        apply_resolutions(&mut class.scope, unit, resolved);
                    }
                    SymbolKind::Enum(decl) => {
                        let owner = symbol.id.clone();
                        for member in &mut decl.members {
                            if member.doc.as_ref().is_some_and(|d| d.is_pending_copydoc()) {
                                let key = (unit, format!("{owner}::{}", member.name));
                                if let Some(outcome) = resolved.get(&key) {
                                    member.doc = outcome.clone();
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{scan, tokenize};

    fn model(source: &str) -> (Scope, DiagnosticSink) {
        let (tokens, err) = tokenize(source);
        assert!(err.is_none(), "lex error in test source: {err:?}");
        let mut sink = DiagnosticSink::new("test.h");
        let events = scan(&tokens, &mut sink);
        let root = build(&tokens, events, &mut sink);
        (root, sink)
    }

    fn document(source: &str) -> Document {
        let (root, sink) = model(source);
        Document {
            unit: SmolStr::new("test.h"),
            root,
            diagnostics: sink.into_vec(),
        }
    }

    fn ids(scope: &Scope) -> Vec<&str> {
        scope.symbols().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_build_pairs_nearest_preceding_comment() {
        let (root, _) = model("/// Stale.\n\n/// Brews the coffee.\nvoid brew();\nvoid pour();\n");
        let brew = root.symbol("brew").unwrap();
        let brief = brew.doc.as_ref().unwrap();
        assert_eq!(brief.entries[0].body_text(), "Brews the coffee.");
        // The undocumented neighbor stays undocumented.
        assert!(root.symbol("pour").unwrap().doc.is_none());
    }

    #[test]
    fn test_build_visibility_sections() {
        let (root, _) = model(
            "class machine {\n  void hidden();\npublic:\n  void brew();\nprotected:\n  int m_cups;\n};\n",
        );
        let class = match &root.symbol("machine").unwrap().kind {
            SymbolKind::ClassOrStruct(c) => c,
            other => panic!("expected class, got {other:?}"),
        };
        let visibility: Vec<_> = class.scope.symbols().map(|s| s.visibility).collect();
        assert_eq!(
            visibility,
            vec![Visibility::Private, Visibility::Public, Visibility::Protected]
        );
    }

    #[test]
    fn test_struct_members_default_public() {
        let (root, _) = model("struct config {\n  int size;\n};\n");
        let class = match &root.symbol("config").unwrap().kind {
            SymbolKind::ClassOrStruct(c) => c,
            other => panic!("expected struct, got {other:?}"),
        };
        assert_eq!(class.scope.symbol("size").unwrap().visibility, Visibility::Public);
    }

    #[test]
    fn test_identity_singleton_is_scope_qualified() {
        let (root, _) = model("namespace coffee {\nclass machine {\npublic:\n  void brew();\n};\n}\n");
        let machine = root.namespace("coffee").unwrap().symbol("machine").unwrap();
        assert_eq!(machine.id, "coffee::machine");
        let class = match &machine.kind {
            SymbolKind::ClassOrStruct(c) => c,
            other => panic!("expected class, got {other:?}"),
        };
        assert_eq!(class.scope.symbol("brew").unwrap().id, "coffee::machine::brew");
    }

    #[test]
    fn test_identity_overloads_are_distinct() {
        let (root, sink) = model(
            "class machine {\npublic:\n  void set_number_cups(uint32_t cups);\n  void set_number_cups(std::string cups);\n};\n",
        );
        assert!(sink.is_empty());
        let class = match &root.symbol("machine").unwrap().kind {
            SymbolKind::ClassOrStruct(c) => c,
            other => panic!("expected class, got {other:?}"),
        };
        assert_eq!(
            ids(&class.scope),
            vec![
                "machine::set_number_cups(uint32_t)",
                "machine::set_number_cups(std::string)",
            ]
        );
    }

    #[test]
    fn test_identity_const_overload_is_distinct() {
        let (root, _) = model(
            "struct tank {\n  water& level();\n  const water& level() const;\n};\n",
        );
        let class = match &root.symbol("tank").unwrap().kind {
            SymbolKind::ClassOrStruct(c) => c,
            other => panic!("expected struct, got {other:?}"),
        };
        assert_eq!(ids(&class.scope), vec!["tank::level()", "tank::level()const"]);
    }

    #[test]
    fn test_identity_specializations_are_separate_symbols() {
        let (root, sink) = model(
            "template <class T, uint32_t Liter>\nstruct cup {\n  T m_liquid;\n};\n\
             template <uint32_t Liter>\nstruct cup<tea, Liter> {\n};\n\
             template <>\nstruct cup<tea, 5> {\n  tea m_liquid;\n};\n",
        );
        assert!(sink.is_empty());
        assert_eq!(
            ids(&root),
            vec!["cup<T,Liter>", "cup<tea,Liter>", "cup<tea,5>"]
        );
        // Members inherit the owning symbol's identity path.
        let specialized = root
            .symbols()
            .find(|s| s.id == "cup<tea,5>")
            .unwrap();
        let class = match &specialized.kind {
            SymbolKind::ClassOrStruct(c) => c,
            other => panic!("expected struct, got {other:?}"),
        };
        assert_eq!(class.scope.symbol("m_liquid").unwrap().id, "cup<tea,5>::m_liquid");
    }

    #[test]
    fn test_unbalanced_signature_keeps_degraded_symbol() {
        let (root, sink) = model("void broken(int;\n");
        assert!(sink.iter().any(|d| d.kind == DiagnosticKind::SignatureParse));
        let symbol = root.symbol("broken").unwrap();
        match &symbol.kind {
            SymbolKind::Function(sig) => {
                assert_eq!(sig.return_type, "void");
                assert!(sig.parameters.is_empty());
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn test_identity_redeclaration_gets_ordinal() {
        let (root, sink) = model("typedef int my_t;\ntypedef long my_t;\n");
        assert_eq!(ids(&root), vec!["my_t", "my_t#2"]);
        assert!(sink.iter().any(|d| d.kind == DiagnosticKind::DuplicateName));
    }

    #[test]
    fn test_copydoc_resolves_to_sibling_overload() {
        let mut documents = vec![document(
            "class machine {\npublic:\n  /// @brief Set the number of cups.\n  void set_number_cups(uint32_t cups);\n  /// @copydoc set_number_cups\n  void set_number_cups(std::string cups);\n};\n",
        )];
        resolve_copydocs(&mut documents);
        let class = match &documents[0].root.symbol("machine").unwrap().kind {
            SymbolKind::ClassOrStruct(c) => c,
            other => panic!("expected class, got {other:?}"),
        };
        let copied: Vec<_> = class
            .scope
            .symbols()
            .map(|s| s.doc.as_ref().unwrap().brief().unwrap().body_text())
            .collect();
        assert_eq!(copied[0], copied[1]);
        assert!(documents[0].diagnostics.is_empty());
    }

    #[test]
    fn test_copydoc_ambiguous_reference_is_flagged() {
        let mut documents = vec![document(
            "/// First.\nvoid target(int a);\n/// Second.\nvoid target(double a);\n/// @copydoc target\nvoid other();\n",
        )];
        resolve_copydocs(&mut documents);
        assert!(documents[0].root.symbol("other").unwrap().doc.is_none());
        assert!(documents[0]
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::UnresolvedCopydoc));
    }

    #[test]
    fn test_copydoc_qualified_reference() {
        let mut documents = vec![document(
            "namespace coffee {\n/// Measures water.\nclass water_tank {\npublic:\n  /// Fills the tank.\n  void fill();\n};\n}\n/// @copydoc water_tank::fill\nvoid refill();\n",
        )];
        resolve_copydocs(&mut documents);
        let doc = documents[0].root.symbol("refill").unwrap().doc.as_ref().unwrap();
        assert_eq!(doc.entries[0].body_text(), "Fills the tank.");
    }

    #[test]
    fn test_copydoc_cycle_is_rejected() {
        let mut documents = vec![document(
            "/// @copydoc b\nvoid a();\n/// @copydoc a\nvoid b();\n",
        )];
        resolve_copydocs(&mut documents);
        assert!(documents[0].root.symbol("a").unwrap().doc.is_none());
        assert!(documents[0].root.symbol("b").unwrap().doc.is_none());
        assert_eq!(
            documents[0]
                .diagnostics
                .iter()
                .filter(|d| d.kind == DiagnosticKind::UnresolvedCopydoc)
                .count(),
            2
        );
    }

    #[test]
    fn test_copydoc_reaches_into_inline_namespace() {
        let mut documents = vec![document(
            "namespace project {\ninline namespace v1_0_0 {\n/// Current version string.\nconst char* version();\n}\n}\n/// @copydoc project::version\nconst char* describe();\n",
        )];
        resolve_copydocs(&mut documents);
        let doc = documents[0].root.symbol("describe").unwrap().doc.as_ref().unwrap();
        assert_eq!(doc.entries[0].body_text(), "Current version string.");
    }

    #[test]
    fn test_copydoc_across_units() {
        let mut documents = vec![
            document("/// Shared brief.\nvoid util();\n"),
            document("/// @copydoc util\nvoid wrapper();\n"),
        ];
        resolve_copydocs(&mut documents);
        let doc = documents[1].root.symbol("wrapper").unwrap().doc.as_ref().unwrap();
        assert_eq!(doc.entries[0].body_text(), "Shared brief.");
    }

    #[test]
    fn test_copydoc_from_enum_member() {
        let mut documents = vec![document(
            "enum class mug_size {\n/// The Tall version.\nTall,\nGrande\n};\n/// @copydoc mug_size::Tall\nvoid tall();\n",
        )];
        resolve_copydocs(&mut documents);
        let doc = documents[0].root.symbol("tall").unwrap().doc.as_ref().unwrap();
        assert_eq!(doc.entries[0].body_text(), "The Tall version.");
        assert!(documents[0].diagnostics.is_empty());
    }

    #[test]
    fn test_copydoc_on_enum_member() {
        let mut documents = vec![document(
            "/// An eight ounce mug.\nvoid short_mug();\nenum class mug_size {\n/// @copydoc short_mug\nShort = 8,\nTall\n};\n",
        )];
        resolve_copydocs(&mut documents);
        let decl = match &documents[0].root.symbol("mug_size").unwrap().kind {
            SymbolKind::Enum(e) => e,
            other => panic!("expected enum, got {other:?}"),
        };
        let doc = decl.members[0].doc.as_ref().unwrap();
        assert_eq!(doc.entries[0].body_text(), "An eight ounce mug.");
        assert!(documents[0].diagnostics.is_empty());
    }

    #[test]
    fn test_macro_symbol_with_comment() {
        let (root, _) = model("/// Registers a message type.\n#define REGISTER_MESSAGE_TYPE(MSG, TYPE) registrar<TYPE>(MSG)\n");
        let symbol = root.symbol("REGISTER_MESSAGE_TYPE").unwrap();
        assert!(symbol.doc.is_some());
        match &symbol.kind {
            SymbolKind::Macro(m) => {
                assert_eq!(m.parameters.as_ref().unwrap().len(), 2);
            }
            other => panic!("expected macro, got {other:?}"),
        }
    }

    #[test]
    fn test_forward_declaration_is_bodiless() {
        let (root, _) = model("class machine;\n");
        match &root.symbol("machine").unwrap().kind {
            SymbolKind::ClassOrStruct(c) => assert!(!c.has_body),
            other => panic!("expected class, got {other:?}"),
        }
    }
}
