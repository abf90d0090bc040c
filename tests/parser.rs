//! Flat command parsing and parse errors.

mod common;

use cmake_parser_rs::{AstNode, ParseErrorKind, ParseOptions, TokenKind, parse_flat};
use common::{commands, values};

fn first_error(input: &str) -> cmake_parser_rs::ParseError {
    parse_flat(input, ParseOptions::default())
        .find_map(Result::err)
        .unwrap_or_else(|| panic!("expected a parse error for {input:?}"))
}

// -----------------------------------------------------------
// Commands.
// -----------------------------------------------------------

#[test]
fn parse_command_span_covers_invocation() {
    let source = "  add_executable(app main.c)  ";
    let cmds = commands(source);
    assert_eq!(cmds.len(), 1);
    let cmd = &cmds[0];
    assert_eq!(cmd.identifier, "add_executable");
    assert_eq!(cmd.location.span.slice(source), "add_executable(app main.c)");
    assert_eq!((cmd.location.line, cmd.location.column), (1, 3));
    assert_eq!(values(&cmd.args), vec!["app", "main.c"]);
}

#[test]
fn parse_multiline_arguments() {
    let source = "target_link_libraries(app\n  PRIVATE\n  \"m\"\n  [[dl]]\n)\n";
    let cmd = commands(source).remove(0);
    assert_eq!(values(&cmd.args), vec!["app", "PRIVATE", "m", "dl"]);
    assert_eq!(
        cmd.args.iter().map(|t| t.kind).collect::<Vec<_>>(),
        vec![
            TokenKind::Raw,
            TokenKind::Raw,
            TokenKind::Quoted,
            TokenKind::Bracketed
        ]
    );
    assert!(cmd.location.span.slice(source).ends_with("\n)"));
}

#[test]
fn parse_keeps_identifier_case() {
    let cmd = commands("Add_Library(x)").remove(0);
    assert_eq!(cmd.identifier, "Add_Library");
}

#[test]
fn parse_space_before_paren() {
    let cmd = commands("message (hello)").remove(0);
    assert_eq!(values(&cmd.args), vec!["hello"]);
}

#[test]
fn parse_empty_argument_list() {
    let cmds = commands("a()b()\nc( )");
    let names: Vec<_> = cmds.iter().map(|c| c.identifier.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert!(cmds.iter().all(|c| c.args.is_empty()));
}

#[test]
fn parse_nested_parentheses_preserved() {
    let cmd = commands("if((A OR B) AND C)").remove(0);
    assert_eq!(values(&cmd.args), vec!["(", "A", "OR", "B", ")", "AND", "C"]);
    assert_eq!(cmd.args[0].kind, TokenKind::LParen);
    assert_eq!(cmd.args[4].kind, TokenKind::RParen);
}

#[test]
fn parse_drops_semicolons() {
    let cmd = commands("set(L a;b ; c)").remove(0);
    assert_eq!(values(&cmd.args), vec!["L", "a", "b", "c"]);
}

#[test]
fn parse_drops_comments_inside_arguments() {
    let cmd = commands("set(A # first\n  1 #[[second]] 2)").remove(0);
    assert_eq!(values(&cmd.args), vec!["A", "1", "2"]);
}

// -----------------------------------------------------------
// Comments.
// -----------------------------------------------------------

#[test]
fn parse_comments_become_nodes() {
    let nodes: Vec<_> = parse_flat("# a\nfoo()\n#[[b]]\n", ParseOptions::new())
        .collect::<Result<_, _>>()
        .expect("parse");
    assert_eq!(nodes.len(), 3);
    assert!(matches!(&nodes[0], AstNode::Comment(c) if c.text == " a"));
    assert!(matches!(&nodes[2], AstNode::Comment(c) if c.text == "b" && c.location.line == 3));
}

#[test]
fn parse_skip_comments() {
    let nodes: Vec<_> = parse_flat("# a\nfoo()\n# b", ParseOptions::new().skip_comments(true))
        .collect::<Result<_, _>>()
        .expect("parse");
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].keyword(), Some("foo"));
}

// -----------------------------------------------------------
// Errors.
// -----------------------------------------------------------

#[test]
fn error_quoted_command_name() {
    let err = first_error("\"quoted\"()");
    assert_eq!(err.kind, ParseErrorKind::ExpectedCommandName);
}

#[test]
fn error_stray_close_paren() {
    let err = first_error("foo(a) )");
    assert_eq!(err.kind, ParseErrorKind::ExpectedCommandName);
    assert_eq!(err.column, 8);
}

#[test]
fn error_invalid_identifier() {
    let err = first_error("1abc(x)");
    assert_eq!(err.kind, ParseErrorKind::InvalidCommandName);
    assert_eq!(err.text, "1abc");
}

#[test]
fn error_missing_open_paren() {
    let err = first_error("foo bar()");
    assert_eq!(
        err.kind,
        ParseErrorKind::ExpectedOpenParen {
            found: Some("bar".to_string())
        }
    );
    assert_eq!(err.to_string(), "expected '(', got 'bar' at line 1, column 5: \"bar\"");
}

#[test]
fn error_missing_open_paren_at_eof() {
    let err = first_error("foo()\nbar");
    assert_eq!(err.kind, ParseErrorKind::ExpectedOpenParen { found: None });
    assert_eq!((err.line, err.column), (2, 1));
}

#[test]
fn error_missing_close_paren_reports_command() {
    let err = first_error("project(demo)\n\nadd_library(core\n  a.c\n  b.c\n");
    assert_eq!(err.kind, ParseErrorKind::ExpectedCloseParen);
    assert_eq!((err.line, err.column), (3, 1));
    assert_eq!(err.text, "add_library");
}

#[test]
fn error_unmatched_bracket_at_top_level() {
    let err = first_error("#[==[unterminated");
    assert_eq!(err.kind, ParseErrorKind::UnmatchedBracket);
}

#[test]
fn error_unmatched_bracket_in_arguments() {
    let err = first_error("set(x [[open)\n");
    assert_eq!(err.kind, ParseErrorKind::UnmatchedBracket);
    assert_eq!(err.column, 7);
}

#[test]
fn error_unparseable_in_arguments() {
    let err = first_error("message(\"unterminated\n)\n");
    assert_eq!(err.kind, ParseErrorKind::Unparseable);
    assert_eq!(err.text, "\"unterminated");
}

#[test]
fn error_unparseable_in_command_position() {
    let err = first_error("ok()\n\"unterminated\n");
    assert_eq!(err.kind, ParseErrorKind::Unparseable);
    assert_eq!((err.line, err.column), (2, 1));

    let err = first_error("message \"unterminated\n");
    assert_eq!(err.kind, ParseErrorKind::Unparseable);
    assert_eq!(err.column, 9);
    assert_eq!(err.to_string(), "unparseable input at line 1, column 9: \"\\\"unterminated\"");
}

#[test]
fn error_unmatched_bracket_after_command_name() {
    let err = first_error("message [[open");
    assert_eq!(err.kind, ParseErrorKind::UnmatchedBracket);
    assert_eq!(err.column, 9);
}

#[test]
fn error_display_names_location() {
    let err = first_error("a()\nb(");
    assert_eq!(
        err.to_string(),
        "expected ')' and got unexpected end of file at line 2, column 1: \"b\""
    );
}

#[test]
fn parser_stops_after_error() {
    let mut parser = parse_flat("ok()\nbad(\n", ParseOptions::default());
    assert!(parser.next().expect("first").is_ok());
    assert!(parser.next().expect("second").is_err());
    assert!(parser.next().is_none());
}
