//! Variable reference substitution and list splitting for command
//! arguments.

use std::fmt;

use crate::context::Context;
use crate::token::{Token, TokenKind};

/// Classifies a resolver error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveErrorKind {
    /// `${`, `$ENV{` or `$CACHE{` without a closing `}`.
    UnterminatedReference { remainder: String },
}

impl fmt::Display for ResolveErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedReference { remainder } => {
                write!(
                    f,
                    "variable reference without terminating '}}': {remainder:?}"
                )
            }
        }
    }
}

/// Error produced while resolving arguments.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {line}, column {column}")]
pub struct ResolveError {
    pub kind: ResolveErrorKind,
    pub line: usize,
    pub column: usize,
}

/// Substitute variable references in `tokens` and split unquoted
/// arguments into list elements.
///
/// Quoted tokens stay a single token. Unquoted tokens yield one token
/// per non-empty element of the substituted value, separated by
/// unescaped `;`, with `\;` unescaped to `;`. Other tokens pass
/// through unchanged. Every produced token keeps the location of the
/// token it came from.
///
/// # Errors
///
/// Returns `ResolveError` if a variable reference is not terminated.
pub fn resolve(ctx: &Context, tokens: &[Token]) -> Result<Vec<Token>, ResolveError> {
    let mut result = Vec::with_capacity(tokens.len());
    for token in tokens {
        match token.kind {
            TokenKind::Raw => {
                let value = expand_token(ctx, token)?;
                result.extend(split_list(&value).into_iter().map(|v| token.with_value(v)));
            }
            TokenKind::Quoted => {
                let value = expand_token(ctx, token)?;
                result.push(token.with_value(value));
            }
            _ => result.push(token.clone()),
        }
    }
    Ok(result)
}

fn expand_token(ctx: &Context, token: &Token) -> Result<String, ResolveError> {
    expand(ctx, &token.value).map_err(|begin| ResolveError {
        kind: ResolveErrorKind::UnterminatedReference {
            remainder: token.value[begin..].to_string(),
        },
        line: token.line,
        column: token.column,
    })
}

/// Substitute variable references in `text` and decode escapes.
///
/// `\;` is kept escaped so that a later list split can tell it apart
/// from a separator. Undefined variables expand to the empty string.
///
/// # Errors
///
/// Returns the byte offset of an unterminated reference.
pub fn expand(ctx: &Context, text: &str) -> Result<String, usize> {
    Expander { ctx, text }.scan()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VarSource {
    Var,
    Env,
    Cache,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece<'s> {
    Escape(char),
    Semicolon,
    VarBegin(VarSource),
    VarEnd,
    Literal(&'s str),
}

/// Next piece of `text` at `pos` and the offset just past it.
fn next_piece(text: &str, pos: usize) -> Option<(Piece<'_>, usize)> {
    let rest = &text[pos..];
    let first = rest.chars().next()?;
    let piece = match first {
        '\\' => match rest[1..].chars().next() {
            Some(c) => (Piece::Escape(c), pos + 1 + c.len_utf8()),
            None => (Piece::Literal("\\"), pos + 1),
        },
        ';' => (Piece::Semicolon, pos + 1),
        '}' => (Piece::VarEnd, pos + 1),
        '$' => var_begin(rest).map_or((Piece::Literal("$"), pos + 1), |(source, len)| {
            (Piece::VarBegin(source), pos + len)
        }),
        _ => {
            let len = rest
                .find(['\\', ';', '$', '}'])
                .unwrap_or(rest.len());
            (Piece::Literal(&rest[..len]), pos + len)
        }
    };
    Some(piece)
}

/// Recognize `${`, `$ENV{` or `$CACHE{` at the start of `rest`.
fn var_begin(rest: &str) -> Option<(VarSource, usize)> {
    let name_len = rest[1..]
        .bytes()
        .take_while(u8::is_ascii_alphabetic)
        .count();
    if rest.as_bytes().get(1 + name_len) != Some(&b'{') {
        return None;
    }
    let source = match &rest[1..=name_len] {
        "" => VarSource::Var,
        "ENV" => VarSource::Env,
        "CACHE" => VarSource::Cache,
        _ => return None,
    };
    Some((source, name_len + 2))
}

/// A reference whose name is still being collected.
struct OpenRef {
    source: VarSource,
    begin: usize,
    /// Text expanded before the reference began.
    outer: String,
}

struct Expander<'c, 's> {
    ctx: &'c Context,
    text: &'s str,
}

impl Expander<'_, '_> {
    /// Expand the whole text. Open references are kept on a stack, so
    /// `${A_${B}}` looks up `B` first. On error returns the offset of the
    /// innermost reference left open.
    fn scan(&self) -> Result<String, usize> {
        let mut open: Vec<OpenRef> = Vec::new();
        let mut result = String::new();
        let mut pos = 0;
        while let Some((piece, end)) = next_piece(self.text, pos) {
            match piece {
                Piece::VarBegin(source) => open.push(OpenRef {
                    source,
                    begin: pos,
                    outer: std::mem::take(&mut result),
                }),
                Piece::VarEnd => match open.pop() {
                    Some(var) => {
                        let name = std::mem::replace(&mut result, var.outer);
                        result.push_str(self.lookup(var.source, &name));
                    }
                    None => result.push('}'),
                },
                Piece::Semicolon => result.push(';'),
                Piece::Escape(c) => match c {
                    'r' => result.push('\r'),
                    'n' => result.push('\n'),
                    't' => result.push('\t'),
                    ';' => result.push_str("\\;"),
                    other => result.push(other),
                },
                Piece::Literal(text) => result.push_str(text),
            }
            pos = end;
        }
        match open.last() {
            Some(var) => Err(var.begin),
            None => Ok(result),
        }
    }

    fn lookup(&self, source: VarSource, name: &str) -> &str {
        let value = match source {
            VarSource::Var => self.ctx.get_var(name),
            VarSource::Env => self.ctx.get_env(name),
            VarSource::Cache => self.ctx.get_cache(name),
        };
        value.unwrap_or_else(|| {
            log::trace!("{source:?} variable {name:?} is not set, expanding to empty");
            ""
        })
    }
}

/// Split a value on unescaped `;`, dropping empty elements and
/// unescaping `\;`.
#[must_use]
pub fn split_list(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(';') => current.push(';'),
                Some(next) => {
                    current.push('\\');
                    current.push(next);
                }
                None => current.push('\\'),
            },
            ';' => {
                if !current.is_empty() {
                    items.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        items.push(current);
    }
    items
}
