#![allow(dead_code)]

use cmake_parser_rs::{
    AstNode, Command, ParseOptions, Span, Token, TokenKind, parse_flat, parse_str, scan,
};

/// Build a token of the given kind; location is irrelevant to callers.
pub fn token(kind: TokenKind, value: &str) -> Token {
    Token {
        kind,
        value: value.to_string(),
        span: Span::new(0, value.len()),
        line: 1,
        column: 1,
    }
}

pub fn raw(value: &str) -> Token {
    token(TokenKind::Raw, value)
}

pub fn quoted(value: &str) -> Token {
    token(TokenKind::Quoted, value)
}

pub fn lparen() -> Token {
    token(TokenKind::LParen, "(")
}

pub fn rparen() -> Token {
    token(TokenKind::RParen, ")")
}

pub fn values(tokens: &[Token]) -> Vec<&str> {
    tokens.iter().map(|t| t.value.as_str()).collect()
}

pub fn kinds(input: &str) -> Vec<TokenKind> {
    scan(input).map(|t| t.kind).collect()
}

/// Parse input into a tree, panicking on error.
pub fn tree(input: &str) -> Vec<AstNode> {
    parse_str(input).unwrap_or_else(|e| panic!("parse failed: {e}\n--- input ---\n{input}"))
}

/// Flat commands of input, panicking on error.
pub fn commands(input: &str) -> Vec<Command> {
    parse_flat(input, ParseOptions::new().skip_comments(true))
        .map(|node| match node {
            Ok(AstNode::Command(cmd)) => cmd,
            Ok(other) => panic!("unexpected node {other:?}"),
            Err(e) => panic!("parse failed: {e}\n--- input ---\n{input}"),
        })
        .collect()
}

/// Argument tokens of `if(<condition>)`.
pub fn condition(condition: &str) -> Vec<Token> {
    let source = format!("if({condition})");
    commands(&source).remove(0).args
}

/// Bracket construct with delimiters rebuilt from the number of bytes
/// the scanner dropped around `value`.
fn bracketed(value: &str, dropped: usize) -> String {
    let newline = dropped % 2 == 1;
    let fill = "=".repeat((dropped - 4 - usize::from(newline)) / 2);
    let lead = if newline { "\n" } else { "" };
    format!("[{fill}[{lead}{value}]{fill}]")
}

/// Source form of a token: its value with quotes, brackets or the
/// comment marker put back.
pub fn render(token: &Token) -> String {
    let dropped = token.span.len() - token.value.len();
    match token.kind {
        TokenKind::Quoted => format!("\"{}\"", token.value),
        TokenKind::Bracketed => bracketed(&token.value, dropped),
        TokenKind::Comment if dropped == 1 => format!("#{}", token.value),
        // CRLF line comment: the span keeps the `\r`.
        TokenKind::Comment if dropped == 2 => format!("#{}\r", token.value),
        TokenKind::Comment => format!("#{}", bracketed(&token.value, dropped - 1)),
        _ => token.value.clone(),
    }
}

/// Rebuild `source` from its tokens, copying the whitespace between
/// token spans.
pub fn reconstruct(source: &str) -> String {
    let mut out = String::new();
    let mut pos = 0;
    for token in scan(source) {
        out.push_str(&source[pos..token.span.start]);
        out.push_str(&render(&token));
        pos = token.span.end;
    }
    out.push_str(&source[pos..]);
    out
}
