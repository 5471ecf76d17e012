//! Signature normalization: turning raw declaration token spans into
//! structured, canonically rendered signatures.
//!
//! Rendering is deterministic so that two declarations that differ only in
//! whitespace produce identical text. Angle-bracket depth is tracked when
//! looking for top-level commas and parens, so `std::function<void(int)>`
//! never splits mid-template-argument.
//!
//! All parsers here are total over their error type: a span the grammar
//! subset cannot express produces a [`SignatureError`] which the model
//! builder turns into a diagnostic, never a panic.

use smol_str::SmolStr;
use thiserror::Error;

use super::lexer::{Token, TokenKind};
use crate::model::{
    AliasKind, EnumMember, FieldDecl, FunctionSig, MacroDecl, Parameter, Qualifiers,
    TemplateParameter, TemplateParameterList, TypeAlias,
};

/// A declaration span the signature grammar could not interpret.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SignatureError(pub String);

fn err(message: impl Into<String>) -> SignatureError {
    SignatureError(message.into())
}

/// A parsed function-like or field-like declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Declarator {
    Function { name: SmolStr, sig: FunctionSig },
    Field { name: SmolStr, field: FieldDecl },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedClass {
    pub name: SmolStr,
    pub is_struct: bool,
    pub template_params: Option<TemplateParameterList>,
    pub specialization_args: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEnum {
    pub name: SmolStr,
    pub is_scoped: bool,
    pub underlying_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAlias {
    pub name: SmolStr,
    pub alias: TypeAlias,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMacro {
    pub name: SmolStr,
    pub decl: MacroDecl,
}

/// Type names that never double as parameter names. Used to keep the
/// trailing identifier of `unsigned int` from being read as a name.
const BUILTIN_TYPES: &[&str] = &[
    "void", "int", "char", "bool", "double", "float", "long", "short", "signed", "unsigned",
    "auto",
];

// =============================================================================
// Rendering
// =============================================================================

/// Render significant tokens to canonical signature text.
pub fn render(tokens: &[Token<'_>]) -> String {
    let mut out = String::new();
    let mut prev: Option<TokenKind> = None;
    for token in tokens {
        if token.is_trivia() || token.is_doc_comment() {
            continue;
        }
        if let Some(prev) = prev {
            if space_between(prev, token.kind) {
                out.push(' ');
            }
        }
        out.push_str(token.text);
        prev = Some(token.kind);
    }
    out
}

fn space_between(prev: TokenKind, next: TokenKind) -> bool {
    use TokenKind::*;
    let no_space_after = matches!(prev, ColonColon | LParen | LBracket | Lt | Tilde | Dot);
    let no_space_before = matches!(
        next,
        Comma | RParen | RBracket | Semicolon | Gt | Shr | Star | Amp | AmpAmp | ColonColon
            | LBracket | LParen | Lt | Dot | Ellipsis
    );
    !(no_space_after || no_space_before)
}

/// Significant tokens of a declaration span: trivia, doc comments, and the
/// terminating semicolon carry no signature content.
fn significant<'a>(tokens: &[Token<'a>]) -> Vec<Token<'a>> {
    tokens
        .iter()
        .copied()
        .filter(|t| {
            !t.is_trivia()
                && !t.is_doc_comment()
                && !matches!(t.kind, TokenKind::Preprocessor | TokenKind::Semicolon)
        })
        .collect()
}

// =============================================================================
// Depth-aware navigation
// =============================================================================

/// Index of the paren matching the opener at `open`.
fn matching_paren(toks: &[Token<'_>], open: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (i, t) in toks.iter().enumerate().skip(open) {
        match t.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// First `(` at angle and bracket depth zero. A `<` opens template depth
/// only when it directly follows something a template name can end with.
fn top_level_lparen(toks: &[Token<'_>]) -> Option<usize> {
    let mut angle = 0i32;
    let mut bracket = 0i32;
    let mut prev: Option<TokenKind> = None;
    for (i, t) in toks.iter().enumerate() {
        match t.kind {
            TokenKind::Lt if matches!(prev, Some(TokenKind::Ident | TokenKind::Gt | TokenKind::Shr)) => {
                angle += 1
            }
            TokenKind::Gt if angle > 0 => angle -= 1,
            TokenKind::Shr if angle > 0 => angle = (angle - 2).max(0),
            TokenKind::LBracket => bracket += 1,
            TokenKind::RBracket => bracket -= 1,
            TokenKind::LParen if angle == 0 && bracket == 0 => return Some(i),
            _ => {}
        }
        prev = Some(t.kind);
    }
    None
}

/// Split on commas at depth zero (parens, brackets, and angles).
fn split_top_commas<'a, 't>(toks: &'t [Token<'a>]) -> Vec<&'t [Token<'a>]> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut paren = 0i32;
    let mut bracket = 0i32;
    let mut angle = 0i32;
    for (i, t) in toks.iter().enumerate() {
        match t.kind {
            TokenKind::LParen => paren += 1,
            TokenKind::RParen => paren -= 1,
            TokenKind::LBracket => bracket += 1,
            TokenKind::RBracket => bracket -= 1,
            TokenKind::Lt => angle += 1,
            TokenKind::Gt if angle > 0 => angle -= 1,
            TokenKind::Shr if angle > 0 => angle = (angle - 2).max(0),
            TokenKind::Comma if paren == 0 && bracket == 0 && angle == 0 => {
                parts.push(&toks[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < toks.len() || !parts.is_empty() {
        parts.push(&toks[start..]);
    }
    parts
}

/// First `=` at depth zero, splitting a declaration from its initializer.
fn top_level_eq(toks: &[Token<'_>]) -> Option<usize> {
    let mut paren = 0i32;
    let mut bracket = 0i32;
    let mut angle = 0i32;
    let mut prev: Option<TokenKind> = None;
    for (i, t) in toks.iter().enumerate() {
        match t.kind {
            TokenKind::LParen => paren += 1,
            TokenKind::RParen => paren -= 1,
            TokenKind::LBracket => bracket += 1,
            TokenKind::RBracket => bracket -= 1,
            TokenKind::Lt if matches!(prev, Some(TokenKind::Ident | TokenKind::Gt | TokenKind::Shr)) => {
                angle += 1
            }
            TokenKind::Gt if angle > 0 => angle -= 1,
            TokenKind::Shr if angle > 0 => angle = (angle - 2).max(0),
            TokenKind::Eq if paren == 0 && bracket == 0 && angle == 0 => return Some(i),
            _ => {}
        }
        prev = Some(t.kind);
    }
    None
}

// =============================================================================
// Template parameter lists
// =============================================================================

/// Strip and parse a leading `template <...>` prefix, returning the parsed
/// list and the remaining tokens. `template <>` yields an empty list.
fn take_template_prefix<'a, 't>(
    toks: &'t [Token<'a>],
) -> Result<(Option<TemplateParameterList>, &'t [Token<'a>]), SignatureError> {
    if toks.first().map(|t| t.kind) != Some(TokenKind::TemplateKw)
        || toks.get(1).map(|t| t.kind) != Some(TokenKind::Lt)
    {
        return Ok((None, toks));
    }
    let mut depth = 0i32;
    for (i, t) in toks.iter().enumerate().skip(1) {
        match t.kind {
            TokenKind::Lt => depth += 1,
            TokenKind::Shl => depth += 2,
            TokenKind::Gt => depth -= 1,
            TokenKind::Shr => depth -= 2,
            _ => {}
        }
        if depth <= 0 {
            let mut inner = toks[2..i].to_vec();
            if t.kind == TokenKind::Shr && depth == 0 {
                // `>>` closed the list and the last nested template
                // argument at once; restore the nested close.
                inner.push(Token {
                    kind: TokenKind::Gt,
                    text: ">",
                    offset: t.offset,
                    line: t.line,
                });
            }
            let list = parse_template_params(&inner)?;
            return Ok((Some(list), &toks[i + 1..]));
        }
    }
    Err(err("unterminated template parameter list"))
}

/// Parse the tokens between the `<` `>` of a template parameter list.
/// Accepts raw lexer output; trivia is filtered here.
pub fn parse_template_params(
    toks: &[Token<'_>],
) -> Result<TemplateParameterList, SignatureError> {
    let toks = significant(toks);
    let mut params = Vec::new();
    if toks.is_empty() {
        return Ok(TemplateParameterList { params });
    }
    for part in split_top_commas(&toks) {
        if part.is_empty() {
            return Err(err("empty template parameter"));
        }
        params.push(parse_template_param(part)?);
    }
    Ok(TemplateParameterList { params })
}

fn parse_template_param(toks: &[Token<'_>]) -> Result<TemplateParameter, SignatureError> {
    let (left, default) = match top_level_eq(toks) {
        Some(eq) => (&toks[..eq], Some(render(&toks[eq + 1..]))),
        None => (toks, None),
    };

    match left.first().map(|t| t.kind) {
        // template <class> class H
        Some(TokenKind::TemplateKw) => {
            let (inner, rest) = take_template_prefix(left)?;
            let inner = inner.ok_or_else(|| err("malformed template-template parameter"))?;
            let name = rest
                .iter()
                .rev()
                .find(|t| t.kind == TokenKind::Ident)
                .map(|t| SmolStr::new(t.text))
                .unwrap_or_default();
            Ok(TemplateParameter::TemplateTemplate {
                params: inner,
                name,
                default,
            })
        }
        // class T / typename... Args / class S = our_type<int>
        Some(TokenKind::ClassKw | TokenKind::TypenameKw) => {
            let is_pack = left.iter().any(|t| t.kind == TokenKind::Ellipsis);
            let name = left[1..]
                .iter()
                .find(|t| t.kind == TokenKind::Ident)
                .map(|t| SmolStr::new(t.text))
                .unwrap_or_default();
            Ok(TemplateParameter::Type {
                name,
                default,
                is_pack,
            })
        }
        // uint32_t BeanSize = 100 / int... Sizes
        Some(_) => {
            let is_pack = left.iter().any(|t| t.kind == TokenKind::Ellipsis);
            let name_idx = left
                .iter()
                .rposition(|t| t.kind == TokenKind::Ident)
                .ok_or_else(|| err("non-type template parameter without a name"))?;
            let (type_toks, name) = if name_idx == 0 {
                (left, SmolStr::default())
            } else {
                (&left[..name_idx], SmolStr::new(left[name_idx].text))
            };
            let type_text = render(
                &type_toks
                    .iter()
                    .copied()
                    .filter(|t| t.kind != TokenKind::Ellipsis)
                    .collect::<Vec<_>>(),
            );
            Ok(TemplateParameter::NonType {
                type_text,
                name,
                default,
                is_pack,
            })
        }
        None => Err(err("empty template parameter")),
    }
}

// =============================================================================
// Declarators
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclaratorShape {
    Plain,
    FunctionPointer,
    Array,
}

/// Split a type-plus-declarator span into rendered type text, the declared
/// name (when present), and the declarator shape.
///
/// Handles the three shapes the grammar subset admits:
/// `const uint8_t array[100]`, `void (*c_callback)(int times, int)`,
/// and plain `const heat& h`.
fn split_declarator(
    toks: &[Token<'_>],
) -> Result<(String, Option<SmolStr>, DeclaratorShape), SignatureError> {
    if toks.is_empty() {
        return Err(err("empty declarator"));
    }

    // Function pointer: `(`-group whose first token is `*`. The name sits
    // at the core of the declarator, possibly behind further nested groups
    // as in `int (*(*x)(double))[3]`.
    if let Some(open) = top_level_lparen(toks) {
        if toks.get(open + 1).map(|t| t.kind) == Some(TokenKind::Star) {
            let close = matching_paren(toks, open)
                .ok_or_else(|| err("unbalanced parens in function pointer declarator"))?;
            let name_idx = declarator_core(toks, open, close);
            let name = name_idx.map(|i| SmolStr::new(toks[i].text));
            // Render the declarator group with the name removed so the
            // type text stays anonymous.
            let group: Vec<Token<'_>> = toks[open..=close]
                .iter()
                .enumerate()
                .filter(|(i, _)| name_idx != Some(open + i))
                .map(|(_, t)| *t)
                .collect();
            let type_text = format!(
                "{} {}{}",
                render(&toks[..open]),
                render(&group),
                render(&toks[close + 1..])
            );
            return Ok((type_text, name, DeclaratorShape::FunctionPointer));
        }
    }

    // Array: trailing `[...]` groups, name directly before the first `[`.
    if toks.last().map(|t| t.kind) == Some(TokenKind::RBracket) {
        let open = toks
            .iter()
            .position(|t| t.kind == TokenKind::LBracket)
            .ok_or_else(|| err("unbalanced brackets in array declarator"))?;
        let name_idx = open.checked_sub(1).filter(|&i| {
            toks[i].kind == TokenKind::Ident && i > 0 && !BUILTIN_TYPES.contains(&toks[i].text)
        });
        let (base_end, name) = match name_idx {
            Some(i) => (i, Some(SmolStr::new(toks[i].text))),
            None => (open, None),
        };
        let type_text = format!("{}{}", render(&toks[..base_end]), render(&toks[open..]));
        return Ok((type_text, name, DeclaratorShape::Array));
    }

    // Plain: the last identifier is the name when it plausibly follows a
    // complete type.
    let has_name = toks.len() >= 2
        && toks.last().is_some_and(|t| {
            t.kind == TokenKind::Ident && !BUILTIN_TYPES.contains(&t.text)
        })
        && matches!(
            toks[toks.len() - 2].kind,
            TokenKind::Ident
                | TokenKind::ConstKw
                | TokenKind::Star
                | TokenKind::Amp
                | TokenKind::AmpAmp
                | TokenKind::Gt
                | TokenKind::Shr
        );
    if has_name {
        let name = SmolStr::new(toks[toks.len() - 1].text);
        Ok((
            render(&toks[..toks.len() - 1]),
            Some(name),
            DeclaratorShape::Plain,
        ))
    } else {
        Ok((render(toks), None, DeclaratorShape::Plain))
    }
}

/// Index of the declared name inside a `(*...)` declarator group between
/// `open` and `close`, descending through nested groups: in
/// `(*(*x)(double))` the core is `x`.
fn declarator_core(toks: &[Token<'_>], open: usize, close: usize) -> Option<usize> {
    let mut i = open + 1;
    while i < close && matches!(toks[i].kind, TokenKind::Star | TokenKind::ConstKw) {
        i += 1;
    }
    if i >= close {
        return None;
    }
    match toks[i].kind {
        TokenKind::Ident => Some(i),
        TokenKind::LParen => {
            let inner_close = matching_paren(toks, i)?;
            declarator_core(toks, i, inner_close)
        }
        _ => None,
    }
}

// =============================================================================
// Functions and fields
// =============================================================================

/// Parse a declaration span that is either a function signature or a data
/// member / variable.
pub fn parse_function_or_field(tokens: &[Token<'_>]) -> Result<Declarator, SignatureError> {
    let toks = significant(tokens);
    let (template_params, rest) = take_template_prefix(&toks)?;

    let mut qualifiers = Qualifiers::default();
    let mut body = rest;
    loop {
        match body.first() {
            Some(t) if t.kind == TokenKind::VirtualKw => qualifiers.is_virtual = true,
            Some(t) if t.kind == TokenKind::StaticKw => qualifiers.is_static = true,
            Some(t)
                if matches!(
                    t.kind,
                    TokenKind::InlineKw | TokenKind::ConstexprKw | TokenKind::ExplicitKw
                ) || (t.kind == TokenKind::Ident && t.text == "friend") => {}
            _ => break,
        }
        body = &body[1..];
    }
    if body.is_empty() {
        return Err(err("declaration has no declarator"));
    }

    let lparen = top_level_lparen(body);
    let is_function_pointer = lparen
        .is_some_and(|open| body.get(open + 1).map(|t| t.kind) == Some(TokenKind::Star));

    match lparen {
        Some(open) if !is_function_pointer => {
            parse_function(body, open, qualifiers, template_params)
        }
        _ => parse_field(body, qualifiers),
    }
}

/// Last-resort recovery for a span whose parens could not be balanced:
/// keep the declaration under the identifier preceding the first `(`, with
/// an empty parameter list. Returns `None` when no name can be found, in
/// which case the diagnostic alone represents the declaration.
pub fn recover_function(tokens: &[Token<'_>]) -> Option<(SmolStr, FunctionSig)> {
    let toks = significant(tokens);
    let open = toks.iter().position(|t| t.kind == TokenKind::LParen)?;
    let name_idx = toks[..open].iter().rposition(|t| t.kind == TokenKind::Ident)?;
    let name = SmolStr::new(toks[name_idx].text);
    Some((
        name,
        FunctionSig {
            return_type: render(&toks[..name_idx]),
            ..FunctionSig::default()
        },
    ))
}

fn parse_function(
    body: &[Token<'_>],
    open: usize,
    mut qualifiers: Qualifiers,
    template_params: Option<TemplateParameterList>,
) -> Result<Declarator, SignatureError> {
    let close =
        matching_paren(body, open).ok_or_else(|| err("unbalanced parens in function signature"))?;
    let prefix = &body[..open];
    let suffix = &body[close + 1..];

    // Name: `operator` spellings, destructors, then the plain identifier.
    let (name, return_toks): (SmolStr, &[Token<'_>]) =
        if let Some(op) = prefix.iter().position(|t| t.kind == TokenKind::OperatorKw) {
            let spelled: String = prefix[op..].iter().map(|t| t.text).collect();
            (SmolStr::new(spelled), &prefix[..op])
        } else {
            match prefix {
                [] => return Err(err("function signature without a name")),
                [.., tilde, name]
                    if tilde.kind == TokenKind::Tilde && name.kind == TokenKind::Ident =>
                {
                    (
                        SmolStr::new(format!("~{}", name.text)),
                        &prefix[..prefix.len() - 2],
                    )
                }
                [.., name] if name.kind == TokenKind::Ident => {
                    (SmolStr::new(name.text), &prefix[..prefix.len() - 1])
                }
                _ => return Err(err("function signature without a name")),
            }
        };

    let mut return_type = render(return_toks);
    let mut parameters = parse_parameters(&body[open + 1..close])?;
    if parameters.len() == 1
        && parameters[0].type_text == "void"
        && parameters[0].name.is_none()
    {
        parameters.clear();
    }

    // Suffix: cv-qualifier, trailing return type, pure/defaulted markers.
    let mut i = 0;
    while i < suffix.len() {
        match suffix[i].kind {
            TokenKind::ConstKw => qualifiers.is_const = true,
            TokenKind::Arrow => {
                return_type = render(&suffix[i + 1..]);
                break;
            }
            TokenKind::Eq => break, // `= 0`, `= default`, `= delete`
            _ => {}                 // noexcept, override, final
        }
        i += 1;
    }

    Ok(Declarator::Function {
        name,
        sig: FunctionSig {
            return_type,
            parameters,
            qualifiers,
            template_params,
        },
    })
}

fn parse_parameters(toks: &[Token<'_>]) -> Result<Vec<Parameter>, SignatureError> {
    let mut parameters = Vec::new();
    if toks.is_empty() {
        return Ok(parameters);
    }
    for part in split_top_commas(toks) {
        if part.is_empty() {
            return Err(err("empty parameter"));
        }
        if part.len() == 1 && part[0].kind == TokenKind::Ellipsis {
            parameters.push(Parameter {
                type_text: "...".to_owned(),
                name: None,
                default_value: None,
            });
            continue;
        }
        let (left, default_value) = match top_level_eq(part) {
            Some(eq) => (&part[..eq], Some(render(&part[eq + 1..]))),
            None => (part, None),
        };
        let (type_text, name, _) = split_declarator(left)?;
        parameters.push(Parameter {
            type_text,
            name,
            default_value,
        });
    }
    Ok(parameters)
}

fn parse_field(
    body: &[Token<'_>],
    qualifiers: Qualifiers,
) -> Result<Declarator, SignatureError> {
    let (left, default_value) = match top_level_eq(body) {
        Some(eq) => (&body[..eq], Some(render(&body[eq + 1..]))),
        None => (body, None),
    };
    let (type_text, name, _) = split_declarator(left)?;
    let name = name.ok_or_else(|| err("field declaration without a name"))?;
    Ok(Declarator::Field {
        name,
        field: FieldDecl {
            type_text,
            default_value,
            is_static: qualifiers.is_static,
        },
    })
}

// =============================================================================
// Classes, enums, aliases
// =============================================================================

/// Parse a class/struct header span (everything before the `{` or `;`).
pub fn parse_class_header(tokens: &[Token<'_>]) -> Result<ParsedClass, SignatureError> {
    let toks = significant(tokens);
    let (template_params, rest) = take_template_prefix(&toks)?;

    let is_struct = match rest.first().map(|t| t.kind) {
        Some(TokenKind::StructKw) => true,
        Some(TokenKind::ClassKw) => false,
        _ => return Err(err("expected `class` or `struct`")),
    };
    let name = match rest.get(1) {
        Some(t) if t.kind == TokenKind::Ident => SmolStr::new(t.text),
        _ => return Err(err("class declaration without a name")),
    };

    // Explicit or partial specialization: `cup<tea, 5>`.
    let specialization_args = if rest.get(2).map(|t| t.kind) == Some(TokenKind::Lt) {
        let mut depth = 0i32;
        let mut close = None;
        for (i, t) in rest.iter().enumerate().skip(2) {
            match t.kind {
                TokenKind::Lt => depth += 1,
                TokenKind::Shl => depth += 2,
                TokenKind::Gt => depth -= 1,
                TokenKind::Shr => depth -= 2,
                _ => {}
            }
            if depth <= 0 {
                close = Some(i);
                break;
            }
        }
        let close = close.ok_or_else(|| err("unterminated specialization argument list"))?;
        let args = split_top_commas(&rest[3..close])
            .into_iter()
            .map(render)
            .collect();
        Some(args)
    } else {
        None
    };
    // The base clause, when present, follows here; it carries no identity.

    Ok(ParsedClass {
        name,
        is_struct,
        template_params,
        specialization_args,
    })
}

/// Parse an enum header span (everything before the `{` or `;`).
pub fn parse_enum_header(tokens: &[Token<'_>]) -> Result<ParsedEnum, SignatureError> {
    let toks = significant(tokens);
    let mut rest = toks.as_slice();
    if rest.first().map(|t| t.kind) != Some(TokenKind::EnumKw) {
        return Err(err("expected `enum`"));
    }
    rest = &rest[1..];
    let is_scoped = matches!(
        rest.first().map(|t| t.kind),
        Some(TokenKind::ClassKw | TokenKind::StructKw)
    );
    if is_scoped {
        rest = &rest[1..];
    }
    let name = match rest.first() {
        Some(t) if t.kind == TokenKind::Ident => {
            let name = SmolStr::new(t.text);
            rest = &rest[1..];
            name
        }
        _ => SmolStr::default(),
    };
    let underlying_type = match rest.first().map(|t| t.kind) {
        Some(TokenKind::Colon) => Some(render(&rest[1..])),
        _ => None,
    };
    Ok(ParsedEnum {
        name,
        is_scoped,
        underlying_type,
    })
}

/// Parse one enum member span: `Name` or `Name = <value>`. Explicit values
/// are recorded verbatim; implicit ones stay unset.
pub fn parse_enum_member(tokens: &[Token<'_>]) -> Result<EnumMember, SignatureError> {
    let toks = significant(tokens);
    let name = match toks.first() {
        Some(t) if t.kind == TokenKind::Ident => SmolStr::new(t.text),
        _ => return Err(err("enum member without a name")),
    };
    let value = match toks.get(1).map(|t| t.kind) {
        Some(TokenKind::Eq) => Some(render(&toks[2..])),
        Some(_) => return Err(err("malformed enum member")),
        None => None,
    };
    Ok(EnumMember {
        name,
        value,
        doc: None,
    })
}

/// Parse a `using` alias or `typedef`, classifying function-pointer and
/// array typedefs by declarator shape.
pub fn parse_alias(tokens: &[Token<'_>]) -> Result<ParsedAlias, SignatureError> {
    let toks = significant(tokens);
    let (_, rest) = take_template_prefix(&toks)?;

    match rest.first().map(|t| t.kind) {
        Some(TokenKind::UsingKw) => {
            let name = match rest.get(1) {
                Some(t) if t.kind == TokenKind::Ident => SmolStr::new(t.text),
                _ => return Err(err("`using` alias without a name")),
            };
            if rest.get(2).map(|t| t.kind) != Some(TokenKind::Eq) {
                return Err(err("`using` declaration is not an alias"));
            }
            Ok(ParsedAlias {
                name,
                alias: TypeAlias {
                    alias_kind: AliasKind::Using,
                    aliased: render(&rest[3..]),
                },
            })
        }
        Some(TokenKind::TypedefKw) => {
            let (aliased, name, shape) = split_declarator(&rest[1..])?;
            let name = name.ok_or_else(|| err("typedef without a name"))?;
            let alias_kind = match shape {
                DeclaratorShape::Plain => AliasKind::Typedef,
                DeclaratorShape::FunctionPointer => AliasKind::FunctionPointerTypedef,
                DeclaratorShape::Array => AliasKind::ArrayTypedef,
            };
            Ok(ParsedAlias {
                name,
                alias: TypeAlias { alias_kind, aliased },
            })
        }
        _ => Err(err("expected `using` or `typedef`")),
    }
}

// =============================================================================
// Macros
// =============================================================================

/// Parse the raw text of a `#define` line (continuations included).
pub fn parse_macro(text: &str) -> Result<ParsedMacro, SignatureError> {
    let rest = text
        .strip_prefix('#')
        .map(str::trim_start)
        .and_then(|r| r.strip_prefix("define"))
        .ok_or_else(|| err("not a #define directive"))?;
    let rest = rest.trim_start_matches(['\\', ' ', '\t', '\r', '\n']);

    let name_len = rest
        .find(|c: char| !c.is_alphanumeric() && c != '_')
        .unwrap_or(rest.len());
    if name_len == 0 {
        return Err(err("#define without a name"));
    }
    let name = SmolStr::new(&rest[..name_len]);
    let after_name = &rest[name_len..];

    // Function-like only when the paren hugs the name.
    let (parameters, body_text) = if let Some(paren_rest) = after_name.strip_prefix('(') {
        let close = paren_rest
            .find(')')
            .ok_or_else(|| err("unterminated macro parameter list"))?;
        let params: Vec<SmolStr> = paren_rest[..close]
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(SmolStr::new)
            .collect();
        (Some(params), &paren_rest[close + 1..])
    } else {
        (None, after_name)
    };

    // Join continuation lines and collapse whitespace runs.
    let body: String = body_text
        .split('\n')
        .map(|line| line.trim_end_matches('\\'))
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");
    let body = (!body.is_empty()).then_some(body);

    Ok(ParsedMacro {
        name,
        decl: MacroDecl { parameters, body },
    })
}
