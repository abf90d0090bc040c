//! Scanner, parser, and condition evaluator for the CMake language.
//!
//! Turns listfile text into tokens, flat command invocations, or a
//! tree of nested blocks, without executing anything. Two small
//! evaluators complete the front end: variable reference resolution
//! with CMake's list semantics, and `if()` condition evaluation.
//!
//! # Quick start
//!
//! ## Parse a listfile into a tree
//!
//! ```
//! use cmake_parser_rs::{AstNode, parse_str};
//!
//! let input = "if(WIN32)\n  add_definitions(-DWIN)\nelse()\n  message(other)\nendif()\n";
//! let nodes = parse_str(input).unwrap();
//! assert!(matches!(&nodes[0], AstNode::If(node) if node.if_false.is_some()));
//! ```
//!
//! ## Resolve arguments and evaluate a condition
//!
//! ```
//! use cmake_parser_rs::{Context, ParseOptions, evaluate_condition, parse_flat};
//!
//! let node = parse_flat("if(${V} VERSION_GREATER 3.10)", ParseOptions::default())
//!     .next()
//!     .unwrap()
//!     .unwrap();
//! let ctx = Context::new().var("V", "3.22.1");
//! let args = &node.as_command().unwrap().args;
//! assert!(evaluate_condition(&ctx, args).unwrap());
//! ```

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod ast;
pub mod context;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod resolve;
pub mod token;
pub mod tree;

pub use ast::{AstNode, Block, CallSignature, Command, Comment, Expr, If, Location, Return};
pub use context::Context;
pub use eval::{ExprError, ExprErrorKind, MAX_EXPR_DEPTH, evaluate};
pub use lexer::{Scanner, scan};
pub use parser::{FlatParser, ParseError, ParseErrorKind, ParseOptions, parse_flat};
pub use resolve::{ResolveError, ResolveErrorKind, resolve};
pub use token::{Span, Token, TokenKind, is_identifier};
pub use tree::{MAX_BLOCK_DEPTH, TreeParser, parse_tree};

/// Unified error type covering every stage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A parser error.
    #[error("{0}")]
    Parse(#[from] ParseError),
    /// A variable resolution error.
    #[error("{0}")]
    Resolve(#[from] ResolveError),
    /// A condition evaluation error.
    #[error("{0}")]
    Expr(#[from] ExprError),
}

/// Parse a listfile into its complete tree in one step.
pub fn parse_str(input: &str) -> Result<Vec<AstNode>, ParseError> {
    parse_tree(input, ParseOptions::default()).collect()
}

/// Resolve the tokens of a condition against `ctx` and evaluate it.
pub fn evaluate_condition(ctx: &Context, tokens: &[Token]) -> Result<bool, Error> {
    let resolved = resolve(ctx, tokens)?;
    Ok(evaluate(ctx, &resolved)?)
}
