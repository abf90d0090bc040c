use std::fmt;
use std::iter::FusedIterator;

use crate::ast::{AstNode, Command, Comment, Location};
use crate::lexer::{Scanner, scan};
use crate::token::{Span, Token, TokenKind, is_identifier};

/// Classifies a parser error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Bracket argument or comment without its closing bracket.
    UnmatchedBracket,
    /// A token other than a bare word where a command must start.
    ExpectedCommandName,
    /// Command name that is not `[A-Za-z_][A-Za-z0-9_]*`.
    InvalidCommandName,
    /// Expected `(` after a command name, found something else or EOF.
    ExpectedOpenParen { found: Option<String> },
    /// End of input before the `)` closing an argument list.
    ExpectedCloseParen,
    /// Input that cannot be tokenized.
    Unparseable,
    /// `break()` or `continue()` with arguments.
    UnexpectedArguments,
    /// Malformed `function` or `macro` signature.
    InvalidSignature { reason: String },
    /// End of input before the command closing a block.
    MissingTerminator { expected: Vec<String> },
    /// Blocks nested deeper than `limit` levels.
    NestingTooDeep { limit: usize },
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnmatchedBracket => write!(f, "unmatched opening bracket"),
            Self::ExpectedCommandName => write!(f, "expected command name"),
            Self::InvalidCommandName => write!(f, "invalid command name identifier"),
            Self::ExpectedOpenParen { found: None } => {
                write!(f, "expected '(' and got unexpected end of file")
            }
            Self::ExpectedOpenParen { found: Some(t) } => {
                write!(f, "expected '(', got '{t}'")
            }
            Self::ExpectedCloseParen => {
                write!(f, "expected ')' and got unexpected end of file")
            }
            Self::Unparseable => write!(f, "unparseable input"),
            Self::UnexpectedArguments => {
                write!(f, "builtin command accepts no arguments")
            }
            Self::InvalidSignature { reason } => write!(f, "{reason}"),
            Self::MissingTerminator { expected } => {
                let names: Vec<_> = expected.iter().map(|e| format!("'{e}()'")).collect();
                write!(f, "no {} for command", names.join(" nor "))
            }
            Self::NestingTooDeep { limit } => {
                write!(f, "blocks nested deeper than {limit} levels")
            }
        }
    }
}

/// Error produced during parsing.
///
/// `text` is the first line of the offending source text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {line}, column {column}: {text:?}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line: usize,
    pub column: usize,
    pub span: Span,
    pub text: String,
}

impl ParseError {
    pub(crate) fn at(kind: ParseErrorKind, location: &Location, source: &str) -> Self {
        let text = location.span.slice(source).lines().next().unwrap_or("");
        Self {
            kind,
            line: location.line,
            column: location.column,
            span: location.span,
            text: text.to_string(),
        }
    }

    fn at_token(kind: ParseErrorKind, token: &Token, source: &str) -> Self {
        Self::at(kind, &token_location(token), source)
    }
}

/// Options shared by [`parse_flat`] and [`crate::parse_tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseOptions {
    /// Omit comment nodes from the output.
    pub skip_comments: bool,
}

impl ParseOptions {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            skip_comments: false,
        }
    }

    #[must_use]
    pub const fn skip_comments(mut self, skip: bool) -> Self {
        self.skip_comments = skip;
        self
    }
}

/// Parse source text into a lazy sequence of [`AstNode::Comment`] and
/// [`AstNode::Command`] nodes.
///
/// The sequence ends after the first `Err`.
#[must_use]
pub fn parse_flat(input: &str, options: ParseOptions) -> FlatParser<'_> {
    FlatParser {
        source: input,
        tokens: scan(input),
        options,
        failed: false,
    }
}

/// Iterator over flat command nodes. Created by [`parse_flat`].
#[derive(Debug, Clone)]
pub struct FlatParser<'a> {
    source: &'a str,
    tokens: Scanner<'a>,
    options: ParseOptions,
    failed: bool,
}

impl<'a> FlatParser<'a> {
    /// The text being parsed.
    #[must_use]
    pub const fn source(&self) -> &'a str {
        self.source
    }

    fn error(&self, kind: ParseErrorKind, token: &Token) -> ParseError {
        ParseError::at_token(kind, token, self.source)
    }

    fn parse_next(&mut self) -> Option<Result<AstNode, ParseError>> {
        loop {
            let token = self.tokens.next()?;
            match token.kind {
                TokenKind::Comment => {
                    if self.options.skip_comments {
                        continue;
                    }
                    return Some(Ok(AstNode::Comment(Comment {
                        location: token_location(&token),
                        text: token.value,
                    })));
                }
                TokenKind::UnmatchedBracket => {
                    return Some(Err(self.error(ParseErrorKind::UnmatchedBracket, &token)));
                }
                TokenKind::Unparseable => {
                    return Some(Err(self.error(ParseErrorKind::Unparseable, &token)));
                }
                TokenKind::Raw => return Some(self.parse_command(token)),
                _ => {
                    return Some(Err(self.error(ParseErrorKind::ExpectedCommandName, &token)));
                }
            }
        }
    }

    fn parse_command(&mut self, name: Token) -> Result<AstNode, ParseError> {
        if !is_identifier(&name.value) {
            return Err(self.error(ParseErrorKind::InvalidCommandName, &name));
        }
        match self.tokens.next() {
            Some(t) if t.kind == TokenKind::LParen => {}
            Some(t) if t.kind == TokenKind::Unparseable => {
                return Err(self.error(ParseErrorKind::Unparseable, &t));
            }
            Some(t) if t.kind == TokenKind::UnmatchedBracket => {
                return Err(self.error(ParseErrorKind::UnmatchedBracket, &t));
            }
            Some(t) => {
                let found = t.text().map(str::to_string);
                return Err(self.error(ParseErrorKind::ExpectedOpenParen { found }, &t));
            }
            None => {
                return Err(self.error(ParseErrorKind::ExpectedOpenParen { found: None }, &name));
            }
        }
        let (args, rparen) = self.collect_args(&name)?;
        let location = Location::through(&token_location(&name), rparen.span);
        log::trace!(
            "command {}() with {} argument token(s) at line {}",
            name.value,
            args.len(),
            location.line
        );
        Ok(AstNode::Command(Command {
            location,
            identifier: name.value,
            args,
        }))
    }

    /// Collect argument tokens up to the `)` matching the one already
    /// consumed. Nested parentheses are kept; separators and comments
    /// are dropped.
    fn collect_args(&mut self, name: &Token) -> Result<(Vec<Token>, Token), ParseError> {
        let mut args = Vec::new();
        let mut depth = 0usize;
        while let Some(token) = self.tokens.next() {
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen if depth == 0 => return Ok((args, token)),
                TokenKind::RParen => depth -= 1,
                TokenKind::Semicolon | TokenKind::Comment => continue,
                TokenKind::UnmatchedBracket => {
                    return Err(self.error(ParseErrorKind::UnmatchedBracket, &token));
                }
                TokenKind::Unparseable => {
                    return Err(self.error(ParseErrorKind::Unparseable, &token));
                }
                TokenKind::Raw | TokenKind::Quoted | TokenKind::Bracketed => {}
            }
            args.push(token);
        }
        Err(self.error(ParseErrorKind::ExpectedCloseParen, name))
    }
}

impl Iterator for FlatParser<'_> {
    type Item = Result<AstNode, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.parse_next();
        if matches!(item, Some(Err(_))) {
            self.failed = true;
        }
        item
    }
}

impl FusedIterator for FlatParser<'_> {}

const fn token_location(token: &Token) -> Location {
    Location {
        line: token.line,
        column: token.column,
        span: token.span,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(input: &str) -> Result<Vec<AstNode>, ParseError> {
        parse_flat(input, ParseOptions::default()).collect()
    }

    fn command(node: &AstNode) -> &Command {
        node.as_command().expect("expected a command")
    }

    #[test]
    fn simple_command() {
        let nodes = parse_all("project(demo LANGUAGES C)").expect("parse failed");
        assert_eq!(nodes.len(), 1);
        let cmd = command(&nodes[0]);
        assert_eq!(cmd.identifier, "project");
        assert_eq!(cmd.args.len(), 3);
        assert_eq!(cmd.location.span, Span::new(0, 25));
    }

    #[test]
    fn nested_parentheses_kept() {
        let nodes = parse_all("if(NOT (A AND B))").expect("parse failed");
        let values: Vec<_> = command(&nodes[0])
            .args
            .iter()
            .map(|t| t.value.as_str())
            .collect();
        assert_eq!(values, vec!["NOT", "(", "A", "AND", "B", ")"]);
    }

    #[test]
    fn semicolons_dropped() {
        let nodes = parse_all("set(L a;b ; c)").expect("parse failed");
        let cmd = command(&nodes[0]);
        assert!(cmd.args.iter().all(|t| t.kind != TokenKind::Semicolon));
        assert_eq!(cmd.args.len(), 4);
    }

    #[test]
    fn comments_and_skip() {
        let input = "# top\nmessage(hi) # trailing\n";
        assert_eq!(parse_all(input).expect("parse failed").len(), 3);
        let skipped: Vec<_> = parse_flat(input, ParseOptions::new().skip_comments(true))
            .collect::<Result<_, _>>()
            .expect("parse failed");
        assert_eq!(skipped.len(), 1);
    }

    #[test]
    fn comment_inside_arguments() {
        let nodes = parse_all("set(A # why\n  B)").expect("parse failed");
        assert_eq!(command(&nodes[0]).args.len(), 2);
    }

    #[test]
    fn missing_open_paren() {
        let err = parse_all("message hi").unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::ExpectedOpenParen {
                found: Some("hi".to_string())
            }
        );
        assert_eq!(err.column, 9);
    }

    #[test]
    fn missing_close_paren_points_at_command() {
        let err = parse_all("a()\nmessage(hi").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::ExpectedCloseParen);
        assert_eq!((err.line, err.column), (2, 1));
        assert_eq!(err.text, "message");
    }

    #[test]
    fn invalid_name() {
        let err = parse_all("1abc()").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidCommandName);
        let err = parse_all("\"x\"()").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::ExpectedCommandName);
    }

    #[test]
    fn unparseable_reported_as_such() {
        let err = parse_all("a()\n\"open").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Unparseable);
        let err = parse_all("foo \"open").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Unparseable);
        assert_eq!(err.column, 5);
    }

    #[test]
    fn unmatched_bracket_is_fatal() {
        let err = parse_all("#[==[unterminated").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnmatchedBracket);
        let err = parse_all("set(x [[open)").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnmatchedBracket);
    }

    #[test]
    fn iterator_stops_after_error() {
        let mut parser = parse_flat("a()\n)\nb()", ParseOptions::default());
        assert!(matches!(parser.next(), Some(Ok(_))));
        assert!(matches!(parser.next(), Some(Err(_))));
        assert!(parser.next().is_none());
    }

    #[test]
    fn error_display() {
        let err = parse_all("foo bar").unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected '(', got 'bar' at line 1, column 5: \"bar\""
        );
    }
}
