//! The symbol model: an immutable tree of scopes and symbols.
//!
//! One [`Document`] is built per input unit in a single pass and never
//! mutated afterwards; external consumers (renderers) only read it.
//! Symbols are a tagged union ([`SymbolKind`]) so consumers can match
//! exhaustively, and every symbol carries a unique identity key that
//! disambiguates overloads and specializations.

pub mod builder;
mod doc;

pub use doc::{CommentBlock, DocEntry, DocSegment, DocTag};

use smol_str::SmolStr;
use text_size::TextRange;

use crate::diagnostics::Diagnostic;

/// The forest built from several input units, plus merged cross-unit
/// copydoc resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub documents: Vec<Document>,
}

impl Project {
    /// All diagnostics across units, in unit order.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.documents.iter().flat_map(|d| d.diagnostics.iter())
    }
}

/// The immutable model of one input unit (one header's text).
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Path or logical unit name, used in diagnostics.
    pub unit: SmolStr,
    pub root: Scope,
    pub diagnostics: Vec<Diagnostic>,
}

/// The kind of a lexical container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Global,
    Namespace {
        is_inline: bool,
    },
    Class,
    Struct,
}

/// A lexical container owning child declarations in declaration order.
///
/// Order matters: it is the tie-breaker for nearest-preceding-comment
/// association and for stable overload numbering.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    pub kind: ScopeKind,
    /// Empty for the global scope and for anonymous namespaces.
    pub name: SmolStr,
    pub members: Vec<Member>,
}

impl Scope {
    pub fn new(kind: ScopeKind, name: impl Into<SmolStr>) -> Self {
        Self {
            kind,
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Iterate over the symbols declared directly in this scope.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.members.iter().filter_map(|m| match m {
            Member::Symbol(s) => Some(s),
            Member::Namespace(_) => None,
        })
    }

    /// Iterate over directly nested namespaces.
    pub fn namespaces(&self) -> impl Iterator<Item = &Scope> {
        self.members.iter().filter_map(|m| match m {
            Member::Namespace(ns) => Some(ns),
            Member::Symbol(_) => None,
        })
    }

    /// First symbol with the given name, in declaration order.
    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols().find(|s| s.name == name)
    }

    /// All symbols sharing the given name (overloads, specializations).
    pub fn symbols_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Symbol> {
        self.symbols().filter(move |s| s.name == name)
    }

    /// First directly nested namespace with the given name.
    pub fn namespace(&self, name: &str) -> Option<&Scope> {
        self.namespaces().find(|ns| ns.name == name)
    }
}

/// A child of a scope, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Namespace(Scope),
    Symbol(Symbol),
}

/// Member visibility inside class-like scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Private => "private",
        }
    }
}

/// One documented declaration, addressable by its identity key.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: SmolStr,
    /// Deterministic, collision-free identity key. Stable for the lifetime
    /// of the run once assigned.
    pub id: String,
    pub kind: SymbolKind,
    pub doc: Option<CommentBlock>,
    pub range: TextRange,
    /// 0-indexed line of the declaration.
    pub line: u32,
    /// The visibility section active at the declaration point. Always
    /// `Public` outside class-like scopes.
    pub visibility: Visibility,
}

/// Discriminated symbol payload.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    Function(FunctionSig),
    TypeAlias(TypeAlias),
    Enum(EnumDecl),
    Field(FieldDecl),
    ClassOrStruct(ClassDecl),
    Macro(MacroDecl),
}

impl SymbolKind {
    pub fn display(&self) -> &'static str {
        match self {
            Self::Function(_) => "function",
            Self::TypeAlias(_) => "type alias",
            Self::Enum(_) => "enum",
            Self::Field(_) => "field",
            Self::ClassOrStruct(c) if c.is_struct => "struct",
            Self::ClassOrStruct(_) => "class",
            Self::Macro(_) => "macro",
        }
    }

    /// Whether several symbols of this kind may legally share a name
    /// within one scope (overloads, template specializations).
    pub fn is_overloadable(&self) -> bool {
        matches!(self, Self::Function(_) | Self::ClassOrStruct(_))
    }
}

/// A function or member function signature.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FunctionSig {
    /// Normalized return type text; empty for constructors/destructors.
    pub return_type: String,
    pub parameters: Vec<Parameter>,
    pub qualifiers: Qualifiers,
    pub template_params: Option<TemplateParameterList>,
}

/// One function parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Normalized type text, including array-of-N and function-pointer
    /// shapes.
    pub type_text: String,
    pub name: Option<SmolStr>,
    /// Raw default value text, never evaluated.
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Qualifiers {
    pub is_const: bool,
    pub is_virtual: bool,
    pub is_static: bool,
}

/// A `using` alias or `typedef`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeAlias {
    pub alias_kind: AliasKind,
    /// Normalized text of the aliased type.
    pub aliased: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AliasKind {
    Using,
    Typedef,
    FunctionPointerTypedef,
    ArrayTypedef,
}

/// An `enum` or `enum class` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub is_scoped: bool,
    pub underlying_type: Option<String>,
    /// Members in declaration order.
    pub members: Vec<EnumMember>,
}

/// One enum member. Members without an explicit value carry `None`;
/// implicit increment-from-previous values are a consumer concern.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub name: SmolStr,
    /// The literal value text, exactly as written.
    pub value: Option<String>,
    pub doc: Option<CommentBlock>,
}

/// A data member or namespace-scope variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub type_text: String,
    pub default_value: Option<String>,
    pub is_static: bool,
}

/// A class or struct declaration, including templates and their
/// specializations. Specializations are distinct symbols sharing the base
/// name; they are never merged with the primary template.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub is_struct: bool,
    pub template_params: Option<TemplateParameterList>,
    /// Rendered argument list for explicit/partial specializations
    /// (e.g. `["tea", "5"]` for `cup<tea, 5>`).
    pub specialization_args: Option<Vec<String>>,
    /// The member scope. Empty for forward declarations.
    pub scope: Scope,
    pub has_body: bool,
}

/// A preprocessor `#define`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDecl {
    /// Parameter names for function-like macros, `None` for object-like.
    pub parameters: Option<Vec<SmolStr>>,
    /// Whitespace-collapsed body text, `None` for a bare `#define NAME`.
    pub body: Option<String>,
}

/// An ordered template parameter list. Empty for a full specialization
/// (`template <>`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TemplateParameterList {
    pub params: Vec<TemplateParameter>,
}

impl TemplateParameterList {
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// The parameter names joined by `,`, used to render a primary
    /// template's identity suffix (`cup<T,Liter>`).
    pub fn render_names(&self) -> String {
        let names: Vec<&str> = self
            .params
            .iter()
            .map(|p| match p {
                TemplateParameter::Type { name, .. } => name.as_str(),
                TemplateParameter::NonType { name, .. } => name.as_str(),
                TemplateParameter::TemplateTemplate { name, .. } => name.as_str(),
            })
            .collect();
        names.join(",")
    }
}

/// One template parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateParameter {
    /// `class T`, `typename U = T`, `typename... Args`
    Type {
        name: SmolStr,
        default: Option<String>,
        is_pack: bool,
    },
    /// `uint32_t BeanSize = 100`, `int... Sizes`
    NonType {
        type_text: String,
        name: SmolStr,
        default: Option<String>,
        is_pack: bool,
    },
    /// `template <class> class H`
    TemplateTemplate {
        params: TemplateParameterList,
        name: SmolStr,
        default: Option<String>,
    },
}
