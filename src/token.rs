/// Half-open byte range into the scanned source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Span running from the start of `self` to the end of `other`.
    #[must_use]
    pub const fn to(self, other: Self) -> Self {
        Self {
            start: self.start,
            end: other.end,
        }
    }

    #[must_use]
    pub const fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Source text covered by this span, or `""` if it is out of range.
    #[must_use]
    pub fn slice(self, source: &str) -> &str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

/// Token kinds produced by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Unquoted argument; subject to expansion and list splitting.
    Raw,
    /// Double-quoted argument (`"..."`).
    Quoted,
    /// Bracket argument (`[==[...]==]`).
    Bracketed,
    /// Line comment (`# ...`) or bracket comment (`#[[...]]`).
    ///
    /// A line comment's value is the text after `#` up to the line
    /// break. When the break is `\r\n` the span still covers the `\r`,
    /// so the span is one byte longer than `#` plus the value.
    Comment,
    /// Opening parenthesis `(`.
    LParen,
    /// Closing parenthesis `)`.
    RParen,
    /// Argument separator `;`.
    Semicolon,
    /// Opening bracket whose closing bracket never appears.
    UnmatchedBracket,
    /// Trailing input that no token pattern matches.
    Unparseable,
}

/// A single token with its decoded value and source location.
///
/// `line` and `column` are 1-based; `column` counts characters from
/// the start of the token's line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub span: Span,
    pub line: usize,
    pub column: usize,
}

impl Token {
    /// Decoded value, or `None` for an unparseable region.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self.kind {
            TokenKind::Unparseable => None,
            _ => Some(&self.value),
        }
    }

    /// Copy of this token carrying a different value but the same
    /// kind and location.
    #[must_use]
    pub fn with_value(&self, value: impl Into<String>) -> Self {
        Self {
            kind: self.kind,
            value: value.into(),
            span: self.span,
            line: self.line,
            column: self.column,
        }
    }

    /// Whether the value contains an unescaped `$`, i.e. a variable
    /// reference that has not been substituted yet.
    #[must_use]
    pub fn has_var_ref(&self) -> bool {
        let mut chars = self.value.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    chars.next();
                }
                '$' => return true,
                _ => {}
            }
        }
        false
    }

    /// Whether this is an unquoted token with exactly the given value.
    #[must_use]
    pub fn is_raw(&self, value: &str) -> bool {
        self.kind == TokenKind::Raw && self.value == value
    }
}

/// Whether `s` matches `[A-Za-z_][A-Za-z0-9_]*`.
#[must_use]
pub fn is_identifier(s: &str) -> bool {
    let mut bytes = s.bytes();
    bytes
        .next()
        .is_some_and(|b| b.is_ascii_alphabetic() || b == b'_')
        && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(value: &str) -> Token {
        Token {
            kind: TokenKind::Raw,
            value: value.to_string(),
            span: Span::new(0, value.len()),
            line: 1,
            column: 1,
        }
    }

    #[test]
    fn var_ref_detection() {
        assert!(raw("${A}").has_var_ref());
        assert!(raw("x$ENV{HOME}").has_var_ref());
        assert!(raw(r"\\${A}").has_var_ref());
        assert!(!raw(r"\${A}").has_var_ref());
        assert!(!raw("plain").has_var_ref());
    }

    #[test]
    fn identifiers() {
        assert!(is_identifier("add_executable"));
        assert!(is_identifier("_x1"));
        assert!(is_identifier("a"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier("foo-bar"));
    }

    #[test]
    fn with_value_keeps_location() {
        let token = raw("${A}");
        let copy = token.with_value("one");
        assert_eq!(copy.value, "one");
        assert_eq!(copy.span, token.span);
        assert_eq!(copy.kind, TokenKind::Raw);
    }

    #[test]
    fn span_helpers() {
        let span = Span::new(2, 5).to(Span::new(7, 9));
        assert_eq!(span, Span::new(2, 9));
        assert_eq!(span.len(), 7);
        assert_eq!(Span::new(0, 3).slice("foo(bar)"), "foo");
        assert_eq!(Span::new(4, 40).slice("foo"), "");
    }
}
