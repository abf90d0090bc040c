//! Evaluation of `if()` and `while()` conditions.
//!
//! Input must already be resolved (see [`crate::resolve`]). Operators
//! are recognized by exact, upper-case value of unquoted tokens.
//! `AND`, `OR` and `NOT` are handled by precedence climbing over an
//! operand stack; unary predicates and binary comparisons consume
//! their arguments as soon as they are met.

use std::cmp::Ordering;
use std::fmt;

use crate::context::Context;
use crate::resolve::split_list;
use crate::token::{Token, TokenKind};

/// Classifies an expression error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprErrorKind {
    /// Binary operator without a left-hand operand.
    MissingOperand { operator: String },
    /// Operator without its right-hand operand or argument.
    MissingArgument { operator: String },
    UnbalancedParentheses,
    /// Operands left over without an operator joining them.
    Malformed,
    /// The injected existence check failed.
    ExistsCheck { path: String, message: String },
    InvalidRegex { pattern: String, message: String },
    /// Parentheses or `NOT` nested deeper than `limit` levels.
    NestingTooDeep { limit: usize },
}

impl fmt::Display for ExprErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingOperand { operator } => {
                write!(f, "missing operand before '{operator}'")
            }
            Self::MissingArgument { operator } => {
                write!(f, "missing argument after '{operator}'")
            }
            Self::UnbalancedParentheses => write!(f, "unbalanced parentheses"),
            Self::Malformed => write!(f, "malformed expression"),
            Self::ExistsCheck { path, message } => {
                write!(f, "cannot check whether '{path}' exists: {message}")
            }
            Self::InvalidRegex { pattern, message } => {
                write!(f, "invalid regular expression '{pattern}': {message}")
            }
            Self::NestingTooDeep { limit } => {
                write!(f, "expression nested deeper than {limit} levels")
            }
        }
    }
}

/// Error produced while evaluating a condition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {line}, column {column}")]
pub struct ExprError {
    pub kind: ExprErrorKind,
    pub line: usize,
    pub column: usize,
}

impl ExprError {
    const fn at(kind: ExprErrorKind, token: &Token) -> Self {
        Self {
            kind,
            line: token.line,
            column: token.column,
        }
    }
}

/// Deepest nesting of parentheses and `NOT` that [`evaluate`] accepts.
pub const MAX_EXPR_DEPTH: usize = 100;

/// Evaluate a resolved condition.
///
/// An empty condition is false. `AND` and `OR` always evaluate both
/// sides. Failed numeric or version coercions make a comparison false
/// rather than an error.
///
/// # Errors
///
/// Returns `ExprError` on missing operands or arguments, unbalanced
/// parentheses, leftover operands, a failing existence check, an
/// invalid `MATCHES` pattern, or nesting beyond [`MAX_EXPR_DEPTH`].
pub fn evaluate(ctx: &Context, tokens: &[Token]) -> Result<bool, ExprError> {
    let mut evaluator = Evaluator {
        ctx,
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = evaluator.expression(1)?;
    if let Some(extra) = evaluator.peek() {
        return Err(ExprError::at(ExprErrorKind::UnbalancedParentheses, extra));
    }
    Ok(value.unwrap_or(false))
}

#[derive(Debug, Clone, Copy)]
enum Operand<'t> {
    Token(&'t Token),
    /// Already reduced value and the token that produced it.
    Value(bool, &'t Token),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnaryOp {
    Defined,
    Exists,
    Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Equal,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl Comparison {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "EQUAL" => Self::Equal,
            "LESS" => Self::Less,
            "LESS_EQUAL" => Self::LessEqual,
            "GREATER" => Self::Greater,
            "GREATER_EQUAL" => Self::GreaterEqual,
            _ => return None,
        })
    }

    const fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Equal => ordering.is_eq(),
            Self::Less => ordering.is_lt(),
            Self::LessEqual => ordering.is_le(),
            Self::Greater => ordering.is_gt(),
            Self::GreaterEqual => ordering.is_ge(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Numeric(Comparison),
    String(Comparison),
    Version(Comparison),
    PathEqual,
    Matches,
    InList,
}

fn unary_operator(name: &str) -> Option<UnaryOp> {
    match name {
        "DEFINED" => Some(UnaryOp::Defined),
        "EXISTS" => Some(UnaryOp::Exists),
        "COMMAND" => Some(UnaryOp::Command),
        _ => None,
    }
}

fn binary_operator(name: &str) -> Option<BinaryOp> {
    if let Some(cmp) = Comparison::parse(name) {
        return Some(BinaryOp::Numeric(cmp));
    }
    if let Some(rest) = name.strip_prefix("STR") {
        return Comparison::parse(rest).map(BinaryOp::String);
    }
    if let Some(rest) = name.strip_prefix("VERSION_") {
        return Comparison::parse(rest).map(BinaryOp::Version);
    }
    match name {
        "PATH_EQUAL" => Some(BinaryOp::PathEqual),
        "MATCHES" => Some(BinaryOp::Matches),
        "IN_LIST" => Some(BinaryOp::InList),
        _ => None,
    }
}

/// Binding strength of the climbable operators.
fn precedence_of(name: &str) -> Option<u8> {
    match name {
        "AND" | "OR" => Some(1),
        "NOT" => Some(2),
        _ => None,
    }
}

struct Evaluator<'c, 't> {
    ctx: &'c Context,
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
}

impl<'t> Evaluator<'_, 't> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    /// Run `f` one level deeper, failing at `opener` once the nesting
    /// limit is reached.
    fn nested<T>(
        &mut self,
        opener: &Token,
        f: impl FnOnce(&mut Self) -> Result<T, ExprError>,
    ) -> Result<T, ExprError> {
        if self.depth >= MAX_EXPR_DEPTH {
            return Err(ExprError::at(
                ExprErrorKind::NestingTooDeep {
                    limit: MAX_EXPR_DEPTH,
                },
                opener,
            ));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Evaluate operands and operators binding at least as tightly as
    /// `precedence`, stopping before an unmatched `)`. `None` means no
    /// operand was found.
    fn expression(&mut self, precedence: u8) -> Result<Option<bool>, ExprError> {
        let mut stack: Vec<Operand<'t>> = Vec::new();
        while let Some(token) = self.peek() {
            if token.kind == TokenKind::RParen {
                break;
            }
            self.pos += 1;
            self.step(token, &mut stack)?;

            if let Some(next) = self.peek() {
                if next.kind == TokenKind::Raw
                    && precedence_of(&next.value).unwrap_or(precedence) < precedence
                {
                    break;
                }
            }
        }
        match stack.as_slice() {
            [] => Ok(None),
            [operand] => Ok(Some(self.truthy(*operand))),
            [_, extra, ..] => Err(ExprError::at(ExprErrorKind::Malformed, origin(*extra))),
        }
    }

    /// Operand of `operator`, which must be present.
    fn operand(&mut self, precedence: u8, operator: &Token) -> Result<bool, ExprError> {
        self.nested(operator, |e| e.expression(precedence))?
            .ok_or_else(|| {
                ExprError::at(
                    ExprErrorKind::MissingArgument {
                        operator: operator.value.clone(),
                    },
                    operator,
                )
            })
    }

    /// Literal argument following `operator`.
    fn argument(&mut self, operator: &Token) -> Result<&'t Token, ExprError> {
        match self.peek() {
            Some(t) if matches!(t.kind, TokenKind::Raw | TokenKind::Quoted | TokenKind::Bracketed) => {
                self.pos += 1;
                Ok(t)
            }
            _ => Err(ExprError::at(
                ExprErrorKind::MissingArgument {
                    operator: operator.value.clone(),
                },
                operator,
            )),
        }
    }

    fn step(&mut self, token: &'t Token, stack: &mut Vec<Operand<'t>>) -> Result<(), ExprError> {
        if token.kind == TokenKind::LParen {
            let value = self
                .nested(token, |e| e.expression(1))?
                .ok_or_else(|| ExprError::at(ExprErrorKind::Malformed, token))?;
            match self.advance() {
                Some(t) if t.kind == TokenKind::RParen => {}
                _ => return Err(ExprError::at(ExprErrorKind::UnbalancedParentheses, token)),
            }
            stack.push(Operand::Value(value, token));
            return Ok(());
        }
        if token.kind != TokenKind::Raw {
            stack.push(Operand::Token(token));
            return Ok(());
        }

        let name = token.value.as_str();
        if name == "NOT" {
            let value = self.operand(2, token)?;
            stack.push(Operand::Value(!value, token));
        } else if name == "AND" || name == "OR" {
            let lhs = stack.pop().ok_or_else(|| missing_operand(token))?;
            let lhs = self.truthy(lhs);
            let rhs = self.operand(2, token)?;
            let value = if name == "AND" { lhs && rhs } else { lhs || rhs };
            stack.push(Operand::Value(value, token));
        } else if let Some(op) = unary_operator(name) {
            let arg = self.argument(token)?;
            let value = self.unary(op, arg)?;
            stack.push(Operand::Value(value, token));
        } else if let Some(op) = binary_operator(name) {
            let lhs = match stack.pop() {
                Some(Operand::Token(lhs)) => lhs,
                Some(Operand::Value(_, origin)) => {
                    return Err(ExprError::at(ExprErrorKind::Malformed, origin));
                }
                None => return Err(missing_operand(token)),
            };
            let rhs = self.argument(token)?;
            let value = self.binary(op, lhs, rhs)?;
            stack.push(Operand::Value(value, token));
        } else {
            stack.push(Operand::Token(token));
        }
        Ok(())
    }

    fn unary(&self, op: UnaryOp, arg: &Token) -> Result<bool, ExprError> {
        let name = arg.value.as_str();
        Ok(match op {
            UnaryOp::Defined => {
                if let Some(var) = braced(name, "ENV") {
                    self.ctx.get_env(var).is_some()
                } else if let Some(var) = braced(name, "CACHE") {
                    self.ctx.get_cache(var).is_some()
                } else {
                    self.ctx.get_var(name).is_some()
                }
            }
            UnaryOp::Exists => self.ctx.check_exists(name).map_err(|e| {
                log::debug!("line {}: existence check for {name:?} failed: {e}", arg.line);
                ExprError::at(
                    ExprErrorKind::ExistsCheck {
                        path: name.to_string(),
                        message: e.to_string(),
                    },
                    arg,
                )
            })?,
            UnaryOp::Command => self.ctx.is_command(name),
        })
    }

    fn binary(&self, op: BinaryOp, lhs: &Token, rhs: &Token) -> Result<bool, ExprError> {
        let left = self.operand_text(lhs);
        let value = match op {
            BinaryOp::Numeric(cmp) => {
                let right = self.operand_text(rhs);
                match (to_integer(left), to_integer(right)) {
                    (Some(l), Some(r)) => cmp.holds(l.cmp(&r)),
                    _ => {
                        log::debug!(
                            "line {}: cannot compare {left:?} and {right:?} as integers, \
                             condition is false",
                            lhs.line
                        );
                        false
                    }
                }
            }
            BinaryOp::String(cmp) => cmp.holds(left.cmp(self.operand_text(rhs))),
            BinaryOp::Version(cmp) => {
                cmp.holds(to_version(left).cmp(&to_version(self.operand_text(rhs))))
            }
            BinaryOp::PathEqual => {
                normalize_path(left) == normalize_path(self.operand_text(rhs))
            }
            BinaryOp::Matches => {
                let re = regex::Regex::new(&rhs.value).map_err(|e| {
                    ExprError::at(
                        ExprErrorKind::InvalidRegex {
                            pattern: rhs.value.clone(),
                            message: e.to_string(),
                        },
                        rhs,
                    )
                })?;
                re.is_match(left)
            }
            BinaryOp::InList => {
                let list = self.ctx.get_var(&rhs.value).unwrap_or("");
                split_list(list).iter().any(|item| item == left)
            }
        };
        Ok(value)
    }

    /// Value of a comparison operand: a bound variable's value for an
    /// unquoted variable name, the literal text otherwise.
    fn operand_text<'a>(&'a self, token: &'a Token) -> &'a str {
        if token.kind == TokenKind::Raw {
            if let Some(value) = self.ctx.get_var(&token.value) {
                return value;
            }
        }
        &token.value
    }

    fn truthy(&self, operand: Operand<'_>) -> bool {
        match operand {
            Operand::Value(value, _) => value,
            Operand::Token(token) if token.kind == TokenKind::Raw => {
                constant(&token.value).unwrap_or_else(|| {
                    let value = self.ctx.get_var(&token.value).unwrap_or("");
                    constant(value).unwrap_or(true)
                })
            }
            Operand::Token(token) => constant(&token.value).unwrap_or(false),
        }
    }
}

const fn origin<'t>(operand: Operand<'t>) -> &'t Token {
    match operand {
        Operand::Token(token) | Operand::Value(_, token) => token,
    }
}

fn missing_operand(operator: &Token) -> ExprError {
    ExprError::at(
        ExprErrorKind::MissingOperand {
            operator: operator.value.clone(),
        },
        operator,
    )
}

/// `NAME` from `PREFIX{NAME}`.
fn braced<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    text.strip_prefix(prefix)?.strip_prefix('{')?.strip_suffix('}')
}

/// Truth value of a constant, or `None` if `value` is not one.
#[must_use]
pub fn constant(value: &str) -> Option<bool> {
    if let Some(n) = to_number(value) {
        return Some(n != 0.0);
    }
    let upper = value.to_ascii_uppercase();
    match upper.as_str() {
        "ON" | "YES" | "TRUE" | "Y" => Some(true),
        "" | "OFF" | "NO" | "FALSE" | "N" | "IGNORE" | "NOTFOUND" => Some(false),
        _ if upper.ends_with("-NOTFOUND") => Some(false),
        _ => None,
    }
}

fn to_number(value: &str) -> Option<f64> {
    let numeric = !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'+' | b'-' | b'e' | b'E'));
    if numeric { value.parse().ok() } else { None }
}

fn to_integer(value: &str) -> Option<i64> {
    value.trim().parse().ok()
}

/// First four dot-separated components; missing or non-numeric
/// components are zero.
fn to_version(value: &str) -> [u64; 4] {
    let mut parts = [0; 4];
    for (slot, part) in parts.iter_mut().zip(value.split('.')) {
        *slot = part.parse().unwrap_or(0);
    }
    parts
}

/// Collapse each run of `/` or `\` into a single `/`.
fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut in_separator = false;
    for c in path.chars() {
        let separator = c == '/' || c == '\\';
        if !separator {
            out.push(c);
        } else if !in_separator {
            out.push('/');
        }
        in_separator = separator;
    }
    out
}
