//! Documentation comment collection and tag classification.
//!
//! Pulls `///` runs and `/** */` blocks out of the token stream and parses
//! their bodies into tagged entries. Body lines indented by four or more
//! columns (or inside a ``` fence) are literal: they are recorded as opaque
//! text and excluded from all further structural interpretation, so code
//! embedded in comments can never reach the declaration scanner.

use smol_str::SmolStr;
use text_size::TextRange;

use super::lexer::{Token, TokenKind};
use crate::model::{CommentBlock, DocEntry, DocSegment, DocTag};

/// Punctuation excluded from the end of an auto-linked URL. A trailing `/`
/// is deliberately absent: it is part of the URL path.
const LINK_TRAILERS: &[char] = &['.', ',', '!', '?', ':', ';'];

/// Collect the documentation comment starting at `tokens[start]`.
///
/// A `///` run spanning adjacent lines forms one block; a `/** */` block is
/// one token. Returns the parsed block and the index of the first token
/// after it.
pub fn collect(tokens: &[Token<'_>], start: usize) -> (CommentBlock, usize) {
    let first = &tokens[start];
    debug_assert!(first.is_doc_comment());

    let mut lines = Vec::new();
    let mut end = start + 1;
    let mut last = first;

    match first.kind {
        TokenKind::DocBlockComment => {
            strip_block_comment(first.text, &mut lines);
        }
        _ => {
            lines.push(strip_line_comment(first.text));
            // Continue the run over directly adjacent `///` lines.
            let mut pos = start + 1;
            let mut prev_line = first.line;
            while pos < tokens.len() {
                let tok = &tokens[pos];
                match tok.kind {
                    TokenKind::Whitespace => pos += 1,
                    TokenKind::DocLineComment if tok.line == prev_line + 1 => {
                        lines.push(strip_line_comment(tok.text));
                        prev_line = tok.line;
                        last = tok;
                        end = pos + 1;
                        pos += 1;
                    }
                    _ => break,
                }
            }
        }
    }

    let block = CommentBlock {
        entries: parse_entries(&lines),
        range: TextRange::new(first.offset, last.range().end()),
        line: first.line,
        end_line: last.line + last.text.matches('\n').count() as u32,
    };
    (block, end)
}

/// Strip `///` and at most one following space.
fn strip_line_comment(text: &str) -> String {
    let body = text.trim_start_matches('/');
    body.strip_prefix(' ').unwrap_or(body).to_string()
}

/// Strip `/** ... */` delimiters and per-line ` * ` decoration.
fn strip_block_comment(text: &str, lines: &mut Vec<String>) {
    let inner = text
        .strip_prefix("/**")
        .unwrap_or(text)
        .strip_suffix("*/")
        .unwrap_or(text);
    for (i, raw) in inner.split('\n').enumerate() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        let stripped = match line.trim_start().strip_prefix('*') {
            Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
            None if i == 0 => line.strip_prefix(' ').unwrap_or(line),
            None => line,
        };
        lines.push(stripped.to_string());
    }
    // Drop the blank first/last lines produced by the delimiters.
    if lines.first().is_some_and(|l| l.trim().is_empty()) {
        lines.remove(0);
    }
    if lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
}

/// One classified body line, before segment grouping.
struct RawLine {
    text: String,
    literal: bool,
}

fn parse_entries(lines: &[String]) -> Vec<DocEntry> {
    let mut entries = Vec::new();
    let mut current: Option<(DocTag, Option<SmolStr>, Vec<RawLine>)> = None;
    let mut in_fence = false;

    for line in lines {
        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();

        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            push_line(&mut current, RawLine {
                text: line.clone(),
                literal: true,
            });
            continue;
        }

        let literal = in_fence || (indent >= 4 && !trimmed.is_empty());

        // A blank line ends the brief; what follows is detail prose in its
        // own plain entry. Other tags absorb paragraph breaks, so literal
        // examples after a blank line stay attached to their @return/@param.
        if !literal && trimmed.is_empty() && matches!(current, Some((DocTag::Brief, _, _))) {
            if let Some(open) = current.take() {
                entries.push(finish_entry(open));
            }
            continue;
        }

        if !literal && trimmed.starts_with('@') {
            if let Some(entry) = split_tag_line(trimmed) {
                if let Some(open) = current.take() {
                    entries.push(finish_entry(open));
                }
                current = Some(entry);
                continue;
            }
            // Unknown @tag: fall through and keep the line as prose.
        }

        push_line(&mut current, RawLine {
            text: if literal {
                line.clone()
            } else {
                trimmed.trim_end().to_string()
            },
            literal,
        });
    }

    if let Some(open) = current.take() {
        entries.push(finish_entry(open));
    }
    entries
}

fn push_line(current: &mut Option<(DocTag, Option<SmolStr>, Vec<RawLine>)>, line: RawLine) {
    match current {
        Some((_, _, body)) => body.push(line),
        None => *current = Some((DocTag::Plain, None, vec![line])),
    }
}

/// Split a `@tag ...` line into a fresh entry, or `None` for unknown tags.
fn split_tag_line(trimmed: &str) -> Option<(DocTag, Option<SmolStr>, Vec<RawLine>)> {
    let rest = &trimmed[1..];
    let word_end = rest
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    let (word, after) = rest.split_at(word_end);
    let after = after.trim_start();

    let make_body = |text: &str| -> Vec<RawLine> {
        if text.is_empty() {
            Vec::new()
        } else {
            vec![RawLine {
                text: text.trim_end().to_string(),
                literal: false,
            }]
        }
    };

    match word {
        "brief" => Some((DocTag::Brief, None, make_body(after))),
        "return" | "returns" => Some((DocTag::Return, None, make_body(after))),
        "param" | "tparam" => {
            let tag = if word == "param" {
                DocTag::Param
            } else {
                DocTag::TParam
            };
            let name_end = after
                .find(char::is_whitespace)
                .unwrap_or(after.len());
            let (name, body) = after.split_at(name_end);
            let target = (!name.is_empty()).then(|| SmolStr::new(name));
            Some((tag, target, make_body(body.trim_start())))
        }
        "copydoc" => {
            let target = after.trim();
            Some((
                DocTag::Copydoc,
                (!target.is_empty()).then(|| SmolStr::new(target)),
                Vec::new(),
            ))
        }
        _ => None,
    }
}

/// Group an entry's raw lines into segments: runs of literal lines become
/// opaque `Literal` segments, prose runs are auto-linked.
fn finish_entry((tag, target, body): (DocTag, Option<SmolStr>, Vec<RawLine>)) -> DocEntry {
    let mut segments = Vec::new();
    let mut run: Vec<&str> = Vec::new();
    let mut run_literal = false;

    let mut flush = |run: &mut Vec<&str>, literal: bool, segments: &mut Vec<DocSegment>| {
        // Trim blank lines at the run edges.
        while run.first().is_some_and(|l| l.trim().is_empty()) {
            run.remove(0);
        }
        while run.last().is_some_and(|l| l.trim().is_empty()) {
            run.pop();
        }
        if run.is_empty() {
            return;
        }
        let text = run.join("\n");
        if literal {
            segments.push(DocSegment::Literal(text));
        } else {
            autolink(&text, segments);
        }
        run.clear();
    };

    for line in &body {
        if line.literal != run_literal {
            flush(&mut run, run_literal, &mut segments);
            run_literal = line.literal;
        }
        run.push(&line.text);
    }
    flush(&mut run, run_literal, &mut segments);

    DocEntry {
        tag,
        target,
        body: segments,
    }
}

/// Split prose into text and link segments. A link starts at `http://` or
/// `https://` on a word boundary and runs to the next whitespace; the
/// trailing punctuation in [`LINK_TRAILERS`] is excluded and retained as
/// plain text.
fn autolink(text: &str, segments: &mut Vec<DocSegment>) {
    let mut rest = text;
    let mut plain = String::new();

    while let Some(found) = find_link_start(rest) {
        let (before, from) = rest.split_at(found);
        plain.push_str(before);

        let url_end = from
            .find(char::is_whitespace)
            .unwrap_or(from.len());
        let (mut url, after) = from.split_at(url_end);
        let mut trailer_start = url.len();
        while let Some(last) = url.chars().last() {
            if LINK_TRAILERS.contains(&last) {
                url = &url[..url.len() - last.len_utf8()];
                trailer_start -= last.len_utf8();
            } else {
                break;
            }
        }

        if !plain.is_empty() {
            segments.push(DocSegment::Text(std::mem::take(&mut plain)));
        }
        segments.push(DocSegment::Link(url.to_string()));
        plain.push_str(&from[trailer_start..url_end]);
        rest = after;
    }

    plain.push_str(rest);
    if !plain.is_empty() {
        segments.push(DocSegment::Text(plain));
    }
}

fn find_link_start(text: &str) -> Option<usize> {
    for (i, _) in text.match_indices("http") {
        let candidate = &text[i..];
        if !(candidate.starts_with("http://") || candidate.starts_with("https://")) {
            continue;
        }
        let boundary = text[..i]
            .chars()
            .last()
            .is_none_or(|c| c.is_whitespace() || c == '(');
        if boundary {
            return Some(i);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::tokenize;

    fn parse(source: &str) -> CommentBlock {
        let (tokens, err) = tokenize(source);
        assert!(err.is_none());
        let start = tokens.iter().position(|t| t.is_doc_comment()).unwrap();
        collect(&tokens, start).0
    }

    #[test]
    fn test_brief_and_params() {
        let block = parse(
            "/// @brief Set the number of cups to brew.\n\
             ///\n\
             /// Check the water tank first.\n\
             /// @param cups The number of cups\n",
        );
        let brief = block.brief().unwrap();
        assert_eq!(brief.body_text(), "Set the number of cups to brew.");
        // The paragraph after the blank line is detail, not brief.
        assert!(block.entries.iter().any(
            |e| e.tag == DocTag::Plain && e.body_text() == "Check the water tank first."
        ));
        let param = block.params().next().unwrap();
        assert_eq!(param.target.as_deref(), Some("cups"));
        assert_eq!(param.body_text(), "The number of cups");
    }

    #[test]
    fn test_block_comment_decoration() {
        let block = parse(
            "/**\n * @brief The version as a string\n *\n * More detail.\n */",
        );
        assert_eq!(block.brief().unwrap().body_text(), "The version as a string");
        assert!(block.entries.iter().any(
            |e| e.tag == DocTag::Plain && e.body_text() == "More detail."
        ));
    }

    #[test]
    fn test_indented_lines_are_literal() {
        let block = parse(
            "/// @brief The version\n\
             ///\n\
             /// Example:\n\
             ///\n\
             ///     std::cout << \"The version\";\n\
             ///     std::cout << version();\n\
             ///\n\
             /// Prose resumes.\n",
        );
        assert_eq!(block.brief().unwrap().body_text(), "The version");
        let detail = &block.entries[1];
        assert_eq!(detail.tag, DocTag::Plain);
        let literal: Vec<_> = detail.body.iter().filter(|s| s.is_literal()).collect();
        assert_eq!(literal.len(), 1);
        assert!(literal[0].as_text().contains("std::cout << \"The version\";"));
        assert!(detail.body.iter().any(
            |s| matches!(s, DocSegment::Text(t) if t.contains("Prose resumes."))
        ));
    }

    #[test]
    fn test_return_absorbs_paragraph_breaks() {
        let block = parse(
            "/// @return The current heat.\n\
             ///\n\
             ///     for (auto c : cups)\n\
             ///         c.refill();\n\
             ///\n\
             /// And then some text\n",
        );
        let ret = block.returns().unwrap();
        assert!(ret.body.iter().any(|s| s.is_literal()));
        assert!(ret.body.iter().any(
            |s| matches!(s, DocSegment::Text(t) if t.contains("And then some text"))
        ));
    }

    #[test]
    fn test_fenced_block_is_literal() {
        let block = parse(
            "/// Before\n/// ```\n/// int x = 1;\n/// ```\n/// After\n",
        );
        let entry = &block.entries[0];
        assert!(entry
            .body
            .iter()
            .any(|s| s.is_literal() && s.as_text().contains("int x = 1;")));
    }

    #[test]
    fn test_copydoc_pending() {
        let block = parse("/// @copydoc set_number_cups\n");
        assert_eq!(block.copydoc_target(), Some("set_number_cups"));
        assert!(block.is_pending_copydoc());
    }

    #[test]
    fn test_autolink_excludes_trailing_punctuation() {
        for (source, expected) in [
            ("http://dot.com.", "http://dot.com"),
            ("http://comma.com,", "http://comma.com"),
            ("http://exclamationmark.com!", "http://exclamationmark.com"),
            ("http://questionmark.com?", "http://questionmark.com"),
            ("http://colon.com:", "http://colon.com"),
            ("http://semicolon.com;", "http://semicolon.com"),
        ] {
            let mut segments = Vec::new();
            autolink(source, &mut segments);
            assert_eq!(
                segments[0],
                DocSegment::Link(expected.to_string()),
                "for {source}"
            );
            // The punctuation stays behind as plain text.
            assert!(matches!(&segments[1], DocSegment::Text(t) if t.len() == 1));
        }
    }

    #[test]
    fn test_autolink_keeps_trailing_slash() {
        let mut segments = Vec::new();
        autolink("see http://backslash.com/ nothing happens", &mut segments);
        assert_eq!(
            segments[1],
            DocSegment::Link("http://backslash.com/".to_string())
        );
    }

    #[test]
    fn test_line_run_grouping() {
        let (tokens, _) = tokenize("/// one\n/// two\nint x;\n/// separate\n");
        let (block, next) = collect(&tokens, 0);
        assert_eq!(block.entries[0].body_text(), "one\ntwo");
        // The run stops before the declaration.
        assert!(tokens[next..].iter().any(|t| t.text == "int"));
    }

    #[test]
    fn test_blank_line_separates_runs() {
        let (tokens, _) = tokenize("/// first\n\n/// second\n");
        let (block, next) = collect(&tokens, 0);
        assert_eq!(block.entries[0].body_text(), "first");
        assert!(tokens[next..].iter().any(|t| t.is_doc_comment()));
    }

    #[test]
    fn test_return_tag() {
        let block = parse("/// @return `true` if the water tank is full\n");
        assert_eq!(
            block.returns().unwrap().body_text(),
            "`true` if the water tank is full"
        );
    }
}
