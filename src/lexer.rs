use crate::token::{Span, Token, TokenKind};

/// Scan CMake source text into a lazy sequence of tokens.
///
/// Whitespace is skipped. Scanning never fails: input that matches no
/// token pattern ends the sequence with a single
/// [`TokenKind::Unparseable`] token spanning to end of input.
#[must_use]
pub fn scan(input: &str) -> Scanner<'_> {
    Scanner::new(input)
}

/// Iterator over the tokens of a source string. Created by [`scan`].
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    source: &'a str,
    input: &'a [u8],
    pos: usize,
    line: usize,
    line_start: usize,
    counted: usize,
    done: bool,
}

impl<'a> Scanner<'a> {
    fn new(source: &'a str) -> Self {
        let input = source.as_bytes();
        let start = if input.starts_with(&[0xEF, 0xBB, 0xBF]) {
            3
        } else {
            0
        };
        Self {
            source,
            input,
            pos: start,
            line: 1,
            line_start: start,
            counted: start,
            done: false,
        }
    }

    /// The text being scanned.
    #[must_use]
    pub const fn source(&self) -> &'a str {
        self.source
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.source[self.pos..].chars().next() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    /// Move the line counter forward over every line break before `to`.
    fn advance_lines(&mut self, to: usize) {
        for (i, &b) in self.input[self.counted..to].iter().enumerate() {
            if b == b'\n' {
                self.line += 1;
                self.line_start = self.counted + i + 1;
            }
        }
        self.counted = to;
    }

    fn make_token(&mut self, kind: TokenKind, value: String, start: usize, end: usize) -> Token {
        self.advance_lines(start);
        let column = self.source[self.line_start..start].chars().count() + 1;
        self.pos = end;
        Token {
            kind,
            value,
            span: Span::new(start, end),
            line: self.line,
            column,
        }
    }

    fn unparseable(&mut self, start: usize) -> Token {
        self.done = true;
        let end = self.input.len();
        self.make_token(TokenKind::Unparseable, String::new(), start, end)
    }

    fn read_quoted(&mut self, start: usize) -> Option<Token> {
        let mut pos = start + 1;
        loop {
            match self.input.get(pos)? {
                b'\\' => {
                    if pos + 1 >= self.input.len() {
                        return None;
                    }
                    pos += 2;
                }
                b'"' => break,
                _ => pos += 1,
            }
        }
        let value = strip_line_continuations(&self.source[start + 1..pos]);
        Some(self.make_token(TokenKind::Quoted, value, start, pos + 1))
    }

    /// Bracket argument starting at `open`, which must point at `[`.
    /// Returns the decoded content and the end offset.
    fn read_bracket(&self, open: usize) -> Option<(String, usize)> {
        let (fill, content_start) = bracket_open(self.input, open)?;
        let close = find_bracket_close(self.input, content_start, fill)?;
        let content = &self.source[content_start..close];
        let content = content
            .strip_prefix("\r\n")
            .or_else(|| content.strip_prefix('\n'))
            .unwrap_or(content);
        Some((content.to_string(), close + fill + 2))
    }

    fn read_hash(&mut self, start: usize) -> Token {
        if bracket_open(self.input, start + 1).is_some() {
            if let Some((value, end)) = self.read_bracket(start + 1) {
                return self.make_token(TokenKind::Comment, value, start, end);
            }
            let end = self.raw_end(start + 1);
            let value = self.source[start..end].to_string();
            return self.make_token(TokenKind::UnmatchedBracket, value, start, end);
        }

        let end = self.input[start..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(self.input.len(), |offset| start + offset);
        let text = &self.source[start + 1..end];
        let value = text.strip_suffix('\r').unwrap_or(text).to_string();
        self.make_token(TokenKind::Comment, value, start, end)
    }

    /// End offset of the unquoted chunk beginning at `start`.
    fn raw_end(&self, start: usize) -> usize {
        let mut pos = start;
        while let Some(&b) = self.input.get(pos) {
            match b {
                b'\\' => {
                    if pos + 1 >= self.input.len() {
                        break;
                    }
                    pos += 2;
                }
                b' ' | b'\t' | b'\r' | b'\n' | b'(' | b')' | b'"' | b'#' | b';' => break,
                _ => pos += 1,
            }
        }
        pos
    }

    fn read_raw(&mut self, start: usize) -> Token {
        let end = self.raw_end(start);
        if end == start {
            return self.unparseable(start);
        }
        let value = self.source[start..end].to_string();
        let kind = if bracket_open(self.input, start).is_some() {
            TokenKind::UnmatchedBracket
        } else {
            TokenKind::Raw
        };
        self.make_token(kind, value, start, end)
    }
}

impl Iterator for Scanner<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.done {
            return None;
        }
        self.skip_whitespace();
        if self.pos >= self.input.len() {
            self.done = true;
            return None;
        }

        let start = self.pos;
        let token = match self.input[start] {
            b'(' => self.make_token(TokenKind::LParen, "(".to_string(), start, start + 1),
            b')' => self.make_token(TokenKind::RParen, ")".to_string(), start, start + 1),
            b';' => self.make_token(TokenKind::Semicolon, ";".to_string(), start, start + 1),
            b'"' => match self.read_quoted(start) {
                Some(token) => token,
                None => self.unparseable(start),
            },
            b'#' => self.read_hash(start),
            b'[' => match self.read_bracket(start) {
                Some((value, end)) => self.make_token(TokenKind::Bracketed, value, start, end),
                None => self.read_raw(start),
            },
            _ => self.read_raw(start),
        };
        Some(token)
    }
}

impl std::iter::FusedIterator for Scanner<'_> {}

/// If `pos` starts `[`, `=`*, `[`, return the fill length and the offset
/// just past the opening bracket.
fn bracket_open(input: &[u8], pos: usize) -> Option<(usize, usize)> {
    if input.get(pos) != Some(&b'[') {
        return None;
    }
    let fill = input[pos + 1..].iter().take_while(|&&b| b == b'=').count();
    let inner = pos + 1 + fill;
    (input.get(inner) == Some(&b'[')).then_some((fill, inner + 1))
}

/// Offset of the first `]`, `=`*fill, `]` at or after `from`.
fn find_bracket_close(input: &[u8], from: usize, fill: usize) -> Option<usize> {
    let mut pos = from;
    while pos + fill + 1 < input.len() {
        if input[pos] == b']'
            && input[pos + 1..=pos + fill].iter().all(|&b| b == b'=')
            && input[pos + fill + 1] == b']'
        {
            return Some(pos);
        }
        pos += 1;
    }
    None
}

/// Delete backslash-newline pairs from the body of a quoted argument.
fn strip_line_continuations(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut rest = inner;
    while let Some(idx) = rest.find('\\') {
        out.push_str(&rest[..idx]);
        let after = &rest[idx + 1..];
        if let Some(tail) = after
            .strip_prefix("\r\n")
            .or_else(|| after.strip_prefix('\n'))
        {
            rest = tail;
            continue;
        }
        out.push('\\');
        let mut chars = after.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    out.push_str(rest);
    out
}
