//! Template lexer (tokenizer).
//!
//! [`tokenize`] converts raw template source text into a stream of
//! [`Token`]s: text literals, variable markers (`{{ }}`), block tags
//! (`{% %}`), and comments (`{# #}`). It also applies the whitespace policy:
//! a newline directly after a block tag or comment is dropped, and spaces or
//! tabs between the start of a line and a block tag are dropped.
//!
//! Inside `{{ }}` and `{% %}`, a closer that appears in a quoted string
//! does not end the marker, so `{{ '}}' }}` renders `}}`.
//!
//! [`tokenize_expression`] splits the inside of a marker into
//! [`ExprToken`]s for the expression parser. Integer literals are unsigned
//! and must fit in an `i64`, so the most negative integer cannot be written
//! directly; `-9223372036854775807 - 1` produces it.

use cogkit_core::error::{RenderError, SourceLocation};

/// The kind of a markup token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// A literal text segment.
    Text(String),
    /// A variable marker: `{{ expression }}`.
    Variable {
        /// The trimmed expression text.
        expr: String,
        /// Byte offset of `expr` in the source.
        expr_offset: usize,
    },
    /// A block tag: `{% tag args %}`.
    Block {
        /// The statement keyword (`if`, `endif`, ...).
        tag: String,
        /// Everything after the keyword, trimmed.
        args: String,
        /// Byte offset of `args` in the source.
        args_offset: usize,
    },
    /// A comment: `{# comment text #}`.
    Comment,
}

/// A markup token with the byte span of the whole marker in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// What the token is.
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
}

#[derive(Debug, Clone, Copy)]
enum TagType {
    Variable, // {{
    Block,    // {%
    Comment,  // {#
}

impl TagType {
    const fn closer(self) -> &'static str {
        match self {
            Self::Variable => "}}",
            Self::Block => "%}",
            Self::Comment => "#}",
        }
    }

    const fn description(self) -> &'static str {
        match self {
            Self::Variable => "variable",
            Self::Block => "block tag",
            Self::Comment => "comment",
        }
    }

    /// Expressions may contain string literals; comments are free text.
    const fn has_strings(self) -> bool {
        matches!(self, Self::Variable | Self::Block)
    }

    /// Block tags and comments take part in the whitespace policy.
    const fn is_statement_like(self) -> bool {
        matches!(self, Self::Block | Self::Comment)
    }
}

/// Finds `closer` in `text`, skipping quoted strings when `skip_strings` is set.
///
/// A quote left open falls back to the first `closer`, so the expression
/// tokenizer can report the unterminated string.
fn find_closer(text: &str, closer: &str, skip_strings: bool) -> Option<usize> {
    if !skip_strings {
        return text.find(closer);
    }
    let bytes = text.as_bytes();
    let mut quote = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(_) if b == b'\\' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if bytes[i..].starts_with(closer.as_bytes()) => return Some(i),
            None if b == b'\'' || b == b'"' => quote = Some(b),
            None => {}
        }
        i += 1;
    }
    if quote.is_some() {
        text.find(closer)
    } else {
        None
    }
}

/// Tokenizes a template source string into a sequence of [`Token`]s.
///
/// # Errors
///
/// Returns a syntax error if a marker is opened but never closed.
pub fn tokenize(source: &str) -> Result<Vec<Token>, RenderError> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut trim_newline = false;

    while pos < source.len() {
        let Some((rel, tag_type)) = find_next_open(&source[pos..]) else {
            push_text(&mut tokens, source, pos, source.len(), trim_newline);
            break;
        };

        let open = pos + rel;
        let text_end = if tag_type.is_statement_like() {
            line_indent_start(source, pos, open)
        } else {
            open
        };
        push_text(&mut tokens, source, pos, text_end, trim_newline);

        let content_start = open + 2;
        let closer = tag_type.closer();
        let Some(rel_end) = find_closer(&source[content_start..], closer, tag_type.has_strings())
        else {
            return Err(RenderError::syntax(
                format!("Unclosed {}: expected '{closer}'", tag_type.description()),
                SourceLocation::from_offset(source, open, snippet(&source[open..])),
            ));
        };
        let content_end = content_start + rel_end;
        let end = content_end + closer.len();
        let raw = &source[content_start..content_end];
        let lead = raw.len() - raw.trim_start().len();
        let content = raw.trim();
        let content_offset = content_start + lead;

        let kind = match tag_type {
            TagType::Variable => TokenKind::Variable {
                expr: content.to_string(),
                expr_offset: content_offset,
            },
            TagType::Block => parse_block_content(content, content_offset),
            TagType::Comment => TokenKind::Comment,
        };
        tokens.push(Token {
            kind,
            start: open,
            end,
        });

        trim_newline = tag_type.is_statement_like();
        pos = end;
    }

    Ok(tokens)
}

/// Finds the next template tag opening in the source.
fn find_next_open(s: &str) -> Option<(usize, TagType)> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'{' {
            match bytes[i + 1] {
                b'{' => return Some((i, TagType::Variable)),
                b'%' => return Some((i, TagType::Block)),
                b'#' => return Some((i, TagType::Comment)),
                _ => {}
            }
        }
        i += 1;
    }
    None
}

/// Returns where the text before a block tag at `open` should end.
///
/// If only spaces and tabs separate the tag from the start of its line, the
/// text ends at the start of that indentation; otherwise it ends at `open`.
fn line_indent_start(source: &str, floor: usize, open: usize) -> usize {
    let bytes = source.as_bytes();
    let mut i = open;
    while i > floor && matches!(bytes[i - 1], b' ' | b'\t') {
        i -= 1;
    }
    if i == 0 || bytes[i - 1] == b'\n' {
        i
    } else {
        open
    }
}

fn push_text(tokens: &mut Vec<Token>, source: &str, start: usize, end: usize, trim_newline: bool) {
    let mut start = start;
    if trim_newline {
        let text = &source[start..end];
        if text.starts_with("\r\n") {
            start += 2;
        } else if text.starts_with('\n') {
            start += 1;
        }
    }
    if start < end {
        tokens.push(Token {
            kind: TokenKind::Text(source[start..end].to_string()),
            start,
            end,
        });
    }
}

/// Splits the content inside `{% ... %}` into the tag keyword and its arguments.
fn parse_block_content(content: &str, offset: usize) -> TokenKind {
    let tag_len = content
        .find(|c: char| c.is_whitespace())
        .unwrap_or(content.len());
    let rest = &content[tag_len..];
    let args = rest.trim_start();
    TokenKind::Block {
        tag: content[..tag_len].to_string(),
        args: args.to_string(),
        args_offset: offset + tag_len + (rest.len() - args.len()),
    }
}

/// Returns a short, single-line excerpt of `s` for error messages.
pub(crate) fn snippet(s: &str) -> String {
    const MAX_CHARS: usize = 40;
    let line = s.lines().next().unwrap_or("");
    if line.chars().count() > MAX_CHARS {
        let cut: String = line.chars().take(MAX_CHARS).collect();
        format!("{cut}...")
    } else {
        line.to_string()
    }
}

// ── Expression tokens ───────────────────────────────────────────────

/// The kind of an expression token.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprTokenKind {
    /// An identifier or keyword (`user`, `and`, `true`).
    Name(String),
    /// A string literal with escapes resolved.
    Str(String),
    /// An integer literal.
    Int(i64),
    /// A float literal.
    Float(f64),
    /// An operator or punctuation.
    Op(&'static str),
}

/// An expression token with its byte span in the template source.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprToken {
    /// What the token is.
    pub kind: ExprTokenKind,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
}

const TWO_CHAR_OPS: [&str; 5] = ["==", "!=", "<=", ">=", "//"];
const ONE_CHAR_OPS: [&str; 16] = [
    "<", ">", "+", "-", "*", "/", "%", "~", "|", ".", ",", "(", ")", "[", "]", "=",
];

/// Tokenizes the expression text found at `source[start..end]`.
///
/// Offsets in the returned tokens are absolute positions in `source`, so
/// errors can point at the right line and column of the template.
///
/// # Errors
///
/// Returns a syntax error for unterminated strings, malformed numbers, and
/// characters that are not part of the expression language.
pub fn tokenize_expression(
    source: &str,
    start: usize,
    end: usize,
) -> Result<Vec<ExprToken>, RenderError> {
    let text = &source[start..end];
    let mut tokens: Vec<ExprToken> = Vec::new();
    let mut chars = text.char_indices().peekable();

    let error = |offset: usize, message: String| {
        RenderError::syntax(
            message,
            SourceLocation::from_offset(source, start + offset, snippet(&text[offset..])),
        )
    };

    while let Some(&(i, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        let kind = if ch.is_ascii_alphabetic() || ch == '_' {
            let mut j = i;
            while let Some(&(k, c)) = chars.peek() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    j = k + c.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            push(&mut tokens, ExprTokenKind::Name(text[i..j].to_string()), start + i, start + j);
            continue;
        } else if ch.is_ascii_digit() {
            // After a dot only an integer may follow, so `items.0.1` stays
            // two lookups instead of one float.
            let after_dot = matches!(tokens.last(), Some(t) if t.kind == ExprTokenKind::Op("."));
            let mut j = i;
            let mut seen_dot = false;
            while let Some(&(k, c)) = chars.peek() {
                if c.is_ascii_digit() || c == '_' {
                    j = k + 1;
                    chars.next();
                } else if c == '.' && !seen_dot && !after_dot {
                    let next_is_digit = text[k + 1..].starts_with(|d: char| d.is_ascii_digit());
                    if !next_is_digit {
                        break;
                    }
                    seen_dot = true;
                    j = k + 1;
                    chars.next();
                } else {
                    break;
                }
            }
            let literal = text[i..j].replace('_', "");
            let kind = if seen_dot {
                literal
                    .parse::<f64>()
                    .map(ExprTokenKind::Float)
                    .map_err(|_| error(i, format!("Invalid number '{}'", &text[i..j])))?
            } else {
                literal
                    .parse::<i64>()
                    .map(ExprTokenKind::Int)
                    .map_err(|_| {
                        error(i, format!("Integer literal '{}' is too large", &text[i..j]))
                    })?
            };
            push(&mut tokens, kind, start + i, start + j);
            continue;
        } else if ch == '"' || ch == '\'' {
            chars.next();
            let mut value = String::new();
            let mut closed_at = None;
            while let Some((k, c)) = chars.next() {
                match c {
                    '\\' => match chars.next() {
                        Some((_, 'n')) => value.push('\n'),
                        Some((_, 't')) => value.push('\t'),
                        Some((_, 'r')) => value.push('\r'),
                        Some((_, other)) => value.push(other),
                        None => break,
                    },
                    c if c == ch => {
                        closed_at = Some(k + 1);
                        break;
                    }
                    c => value.push(c),
                }
            }
            let Some(j) = closed_at else {
                return Err(error(i, "Unterminated string literal".to_string()));
            };
            push(&mut tokens, ExprTokenKind::Str(value), start + i, start + j);
            continue;
        } else if let Some(op) = TWO_CHAR_OPS.iter().find(|op| text[i..].starts_with(**op)) {
            chars.next();
            chars.next();
            ExprTokenKind::Op(*op)
        } else if let Some(op) = ONE_CHAR_OPS.iter().find(|op| text[i..].starts_with(**op)) {
            chars.next();
            ExprTokenKind::Op(*op)
        } else {
            return Err(error(i, format!("Unexpected character '{ch}'")));
        };

        let len = match &kind {
            ExprTokenKind::Op(op) => op.len(),
            _ => ch.len_utf8(),
        };
        push(&mut tokens, kind, start + i, start + i + len);
    }

    Ok(tokens)
}

fn push(tokens: &mut Vec<ExprToken>, kind: ExprTokenKind, start: usize, end: usize) {
    tokens.push(ExprToken { kind, start, end });
}
