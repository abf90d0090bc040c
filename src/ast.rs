use crate::token::{Span, Token};

/// Source location shared by every AST node.
///
/// `span` covers the whole construct, including the terminating
/// command of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub span: Span,
}

impl Location {
    /// Location starting at `start` and extended to the end of `end`.
    #[must_use]
    pub const fn through(start: &Self, end: Span) -> Self {
        Self {
            line: start.line,
            column: start.column,
            span: start.span.to(end),
        }
    }
}

/// Parsed element of a CMake listfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstNode {
    Comment(Comment),
    /// Any command invocation without special structure.
    Command(Command),
    Macro(Block),
    Function(Block),
    /// `block() ... endblock()` variable scope.
    Block(Block),
    ForEach(Block),
    While(Block),
    If(If),
    Break(Location),
    Continue(Location),
    Return(Return),
}

impl AstNode {
    #[must_use]
    pub const fn location(&self) -> &Location {
        match self {
            Self::Comment(c) => &c.location,
            Self::Command(c) => &c.location,
            Self::Macro(b) | Self::Function(b) | Self::Block(b) | Self::ForEach(b) | Self::While(b) => {
                &b.location
            }
            Self::If(i) => &i.location,
            Self::Break(l) | Self::Continue(l) => l,
            Self::Return(r) => &r.location,
        }
    }

    /// Lower-case keyword that introduces this node, or the command
    /// identifier for generic commands. `None` for comments.
    #[must_use]
    pub fn keyword(&self) -> Option<&str> {
        Some(match self {
            Self::Comment(_) => return None,
            Self::Command(c) => &c.identifier,
            Self::Macro(_) => "macro",
            Self::Function(_) => "function",
            Self::Block(_) => "block",
            Self::ForEach(_) => "foreach",
            Self::While(_) => "while",
            Self::If(_) => "if",
            Self::Break(_) => "break",
            Self::Continue(_) => "continue",
            Self::Return(_) => "return",
        })
    }

    #[must_use]
    pub const fn as_command(&self) -> Option<&Command> {
        match self {
            Self::Command(c) => Some(c),
            _ => None,
        }
    }
}

/// Line or bracket comment; `text` excludes the leading `#`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub location: Location,
    pub text: String,
}

/// Generic command invocation `identifier(args...)`.
///
/// Variable expansion can split or drop arguments, so `args` holds
/// tokens rather than final argument values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub location: Location,
    pub identifier: String,
    pub args: Vec<Token>,
}

/// A `keyword(args) ... endkeyword()` construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub location: Location,
    pub args: Expr,
    pub body: Vec<AstNode>,
}

/// Conditional. An `elseif` chain is folded into a single nested `If`
/// as the only element of `if_false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct If {
    pub location: Location,
    pub args: Expr,
    pub if_true: Vec<AstNode>,
    pub if_false: Option<Vec<AstNode>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Return {
    pub location: Location,
    pub args: Vec<Token>,
}

/// Interpreted argument list of a block command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Arguments left as tokens, either because the block kind has no
    /// dedicated interpretation or because they still reference
    /// variables.
    Unparsed(Vec<Token>),
    /// Condition of `if`, `elseif` or `while` free of variable
    /// references.
    Condition(Vec<Token>),
    /// Signature of a `function` or `macro` definition.
    CallSignature(CallSignature),
}

impl Expr {
    /// Tokens of an unparsed argument list or condition.
    #[must_use]
    pub fn tokens(&self) -> Option<&[Token]> {
        match self {
            Self::Unparsed(tokens) | Self::Condition(tokens) => Some(tokens),
            Self::CallSignature(_) => None,
        }
    }
}

/// `name param...` of a function or macro; `name` is lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallSignature {
    pub name: String,
    pub params: Vec<String>,
}

impl CallSignature {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn param(mut self, name: &str) -> Self {
        self.params.push(name.to_string());
        self
    }
}
