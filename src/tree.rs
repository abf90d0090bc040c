//! Folds the flat command stream into nested block structures.
//!
//! Block boundaries are found by matching keyword pairs: a block
//! collects elements until it meets its own terminator command, so
//! nested blocks of the same kind are consumed as part of the body
//! before the outer terminator is reached.

use std::iter::FusedIterator;

use crate::ast::{AstNode, Block, CallSignature, Command, Expr, If, Location, Return};
use crate::parser::{FlatParser, ParseError, ParseErrorKind, ParseOptions, parse_flat};
use crate::token::{Token, TokenKind, is_identifier};

/// Deepest block nesting [`parse_tree`] accepts. Each `elseif()`
/// counts as one more level, since it folds into a nested `If`.
pub const MAX_BLOCK_DEPTH: usize = 100;

/// Parse source text into a lazy sequence of structured AST nodes.
///
/// The sequence ends after the first `Err`.
#[must_use]
pub fn parse_tree(input: &str, options: ParseOptions) -> TreeParser<'_> {
    TreeParser {
        flat: parse_flat(input, options),
        depth: 0,
        failed: false,
    }
}

/// Iterator over top-level AST nodes. Created by [`parse_tree`].
#[derive(Debug, Clone)]
pub struct TreeParser<'a> {
    flat: FlatParser<'a>,
    depth: usize,
    failed: bool,
}

type Handler = fn(&mut TreeParser<'_>, Command) -> Result<AstNode, ParseError>;

/// Commands with structure, keyed by lower-case identifier.
const BUILTINS: &[(&str, Handler)] = &[
    ("block", parse_scope_block),
    ("macro", parse_macro),
    ("function", parse_function),
    ("foreach", parse_foreach),
    ("while", parse_while),
    ("if", parse_if_command),
    ("break", parse_break),
    ("continue", parse_continue),
    ("return", parse_return),
];

fn handler_for(identifier: &str) -> Option<Handler> {
    BUILTINS
        .iter()
        .find(|(name, _)| identifier.eq_ignore_ascii_case(name))
        .map(|&(_, handler)| handler)
}

impl TreeParser<'_> {
    fn error(&self, kind: ParseErrorKind, location: &Location) -> ParseError {
        ParseError::at(kind, location, self.flat.source())
    }

    /// Run `f` one block level deeper, failing at `opener` once the
    /// nesting limit is reached.
    fn nested<T>(
        &mut self,
        opener: &Location,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_BLOCK_DEPTH {
            return Err(self.error(
                ParseErrorKind::NestingTooDeep {
                    limit: MAX_BLOCK_DEPTH,
                },
                opener,
            ));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn next_element(&mut self) -> Option<Result<AstNode, ParseError>> {
        let node = match self.flat.next()? {
            Ok(node) => node,
            Err(e) => return Some(Err(e)),
        };
        Some(self.transform(node))
    }

    fn transform(&mut self, node: AstNode) -> Result<AstNode, ParseError> {
        match node {
            AstNode::Command(cmd) => match handler_for(&cmd.identifier) {
                Some(handler) => handler(self, cmd),
                None => Ok(AstNode::Command(cmd)),
            },
            other => Ok(other),
        }
    }

    /// Collect elements until a command named in `until` appears at this
    /// nesting level. Returns the body and the terminating command.
    fn collect_until(
        &mut self,
        opener: &Command,
        until: &[&str],
    ) -> Result<(Vec<AstNode>, Command), ParseError> {
        let mut body = Vec::new();
        while let Some(node) = self.flat.next() {
            match node? {
                AstNode::Command(cmd)
                    if until.iter().any(|u| cmd.identifier.eq_ignore_ascii_case(u)) =>
                {
                    return Ok((body, cmd));
                }
                node => body.push(self.transform(node)?),
            }
        }
        let expected = until.iter().map(|u| (*u).to_string()).collect();
        Err(self.error(
            ParseErrorKind::MissingTerminator { expected },
            &opener.location,
        ))
    }

    fn parse_block(
        &mut self,
        cmd: Command,
        interpret: fn(&[Token]) -> Result<Expr, String>,
        make: fn(Block) -> AstNode,
    ) -> Result<AstNode, ParseError> {
        let args = interpret(&cmd.args)
            .map_err(|reason| self.error(ParseErrorKind::InvalidSignature { reason }, &cmd.location))?;
        let terminator = format!("end{}", cmd.identifier.to_ascii_lowercase());
        let (body, end) =
            self.nested(&cmd.location, |p| p.collect_until(&cmd, &[terminator.as_str()]))?;
        log::debug!(
            "folded {}() block with {} element(s) at line {}",
            cmd.identifier,
            body.len(),
            cmd.location.line
        );
        Ok(make(Block {
            location: Location::through(&cmd.location, end.location.span),
            args,
            body,
        }))
    }

    fn parse_if(&mut self, cmd: Command) -> Result<If, ParseError> {
        let args = parse_condition(&cmd.args);
        let (if_true, end) = self.collect_until(&cmd, &["else", "elseif", "endif"])?;

        if end.identifier.eq_ignore_ascii_case("elseif") {
            let span_end = if_true
                .last()
                .map_or(cmd.location.span, |last| last.location().span);
            let location = end.location;
            let nested = self.nested(&location, |p| p.parse_if(end))?;
            return Ok(If {
                location: Location::through(&cmd.location, span_end),
                args,
                if_true,
                if_false: Some(vec![AstNode::If(nested)]),
            });
        }

        let (if_false, end) = if end.identifier.eq_ignore_ascii_case("else") {
            let (if_false, end) = self.collect_until(&cmd, &["endif"])?;
            (Some(if_false), end)
        } else {
            (None, end)
        };
        Ok(If {
            location: Location::through(&cmd.location, end.location.span),
            args,
            if_true,
            if_false,
        })
    }

    fn no_args(&self, cmd: &Command) -> Result<Location, ParseError> {
        if cmd.args.is_empty() {
            Ok(cmd.location)
        } else {
            Err(self.error(ParseErrorKind::UnexpectedArguments, &cmd.location))
        }
    }
}

fn parse_scope_block(p: &mut TreeParser<'_>, cmd: Command) -> Result<AstNode, ParseError> {
    p.parse_block(cmd, unparsed, AstNode::Block)
}

fn parse_macro(p: &mut TreeParser<'_>, cmd: Command) -> Result<AstNode, ParseError> {
    p.parse_block(cmd, parse_call_signature, AstNode::Macro)
}

fn parse_function(p: &mut TreeParser<'_>, cmd: Command) -> Result<AstNode, ParseError> {
    p.parse_block(cmd, parse_call_signature, AstNode::Function)
}

fn parse_foreach(p: &mut TreeParser<'_>, cmd: Command) -> Result<AstNode, ParseError> {
    p.parse_block(cmd, unparsed, AstNode::ForEach)
}

fn parse_while(p: &mut TreeParser<'_>, cmd: Command) -> Result<AstNode, ParseError> {
    p.parse_block(cmd, |tokens| Ok(parse_condition(tokens)), AstNode::While)
}

fn parse_if_command(p: &mut TreeParser<'_>, cmd: Command) -> Result<AstNode, ParseError> {
    let location = cmd.location;
    p.nested(&location, |p| p.parse_if(cmd)).map(AstNode::If)
}

fn parse_break(p: &mut TreeParser<'_>, cmd: Command) -> Result<AstNode, ParseError> {
    p.no_args(&cmd).map(AstNode::Break)
}

fn parse_continue(p: &mut TreeParser<'_>, cmd: Command) -> Result<AstNode, ParseError> {
    p.no_args(&cmd).map(AstNode::Continue)
}

fn parse_return(_: &mut TreeParser<'_>, cmd: Command) -> Result<AstNode, ParseError> {
    Ok(AstNode::Return(Return {
        location: cmd.location,
        args: cmd.args,
    }))
}

#[allow(clippy::unnecessary_wraps)]
fn unparsed(tokens: &[Token]) -> Result<Expr, String> {
    Ok(Expr::Unparsed(tokens.to_vec()))
}

fn has_unresolved_ref(tokens: &[Token]) -> bool {
    tokens
        .iter()
        .any(|t| matches!(t.kind, TokenKind::Raw | TokenKind::Quoted) && t.has_var_ref())
}

/// Interpret the arguments of `function()` or `macro()` as a name
/// followed by parameter names.
///
/// Arguments that still reference variables are left unparsed.
///
/// # Errors
///
/// Returns a reason string if the list is empty or contains a token
/// that is not an identifier.
pub fn parse_call_signature(tokens: &[Token]) -> Result<Expr, String> {
    let Some((name, params)) = tokens.split_first() else {
        return Err("argument list must not be empty".to_string());
    };
    if has_unresolved_ref(tokens) {
        return Ok(Expr::Unparsed(tokens.to_vec()));
    }
    if let Some(bad) = tokens.iter().find(|t| !is_identifier(&t.value)) {
        return Err(format!(
            "argument list has invalid identifier '{}'",
            bad.value
        ));
    }
    Ok(Expr::CallSignature(CallSignature {
        name: name.value.to_ascii_lowercase(),
        params: params.iter().map(|t| t.value.clone()).collect(),
    }))
}

/// Interpret the arguments of `if()`, `elseif()` or `while()`.
#[must_use]
pub fn parse_condition(tokens: &[Token]) -> Expr {
    if has_unresolved_ref(tokens) {
        Expr::Unparsed(tokens.to_vec())
    } else {
        Expr::Condition(tokens.to_vec())
    }
}

impl Iterator for TreeParser<'_> {
    type Item = Result<AstNode, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.next_element();
        if matches!(item, Some(Err(_))) {
            self.failed = true;
        }
        item
    }
}

impl FusedIterator for TreeParser<'_> {}
