//! AST node types

use serde::{Deserialize, Serialize};

/// One raw argument as written in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arg {
    pub text: String,
    /// `"..."` arguments expand but never split on semicolons.
    pub quoted: bool,
    /// `[[...]]` arguments are literal: no expansion, no splitting.
    pub bracket: bool,
    pub line: usize,
}

impl Arg {
    #[must_use]
    pub fn unquoted(text: impl Into<String>, line: usize) -> Self {
        Self {
            text: text.into(),
            quoted: false,
            bracket: false,
            line,
        }
    }

    #[must_use]
    pub fn quoted(text: impl Into<String>, line: usize) -> Self {
        Self {
            text: text.into(),
            quoted: true,
            bracket: false,
            line,
        }
    }
}

/// A plain command invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandNode {
    pub name: String,
    pub args: Vec<Arg>,
    pub line: usize,
}

/// One `if`/`elseif` arm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IfBranch {
    pub condition: Vec<Arg>,
    pub line: usize,
    pub body: Vec<Node>,
}

/// A full `if` chain including the optional `else` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IfNode {
    pub branches: Vec<IfBranch>,
    pub else_body: Vec<Node>,
    pub line: usize,
}

/// `foreach(...)`; the header arguments stay raw because `IN LISTS` /
/// `RANGE` / `ZIP_LISTS` forms are resolved at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForEachNode {
    pub args: Vec<Arg>,
    pub body: Vec<Node>,
    pub line: usize,
}

/// `while(...)`; the condition is re-resolved every iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhileNode {
    pub condition: Vec<Arg>,
    pub body: Vec<Node>,
    pub line: usize,
}

/// `function()` or `macro()` definition. `args[0]` is the command name,
/// the rest are parameter names; the body is kept as an AST slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCommandDefNode {
    pub args: Vec<Arg>,
    pub body: Vec<Node>,
    pub line: usize,
}

/// One parsed script element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    Command(CommandNode),
    If(IfNode),
    ForEach(ForEachNode),
    While(WhileNode),
    FunctionDef(UserCommandDefNode),
    MacroDef(UserCommandDefNode),
}

impl Node {
    /// Source line the node starts on.
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            Self::Command(c) => c.line,
            Self::If(n) => n.line,
            Self::ForEach(n) => n.line,
            Self::While(n) => n.line,
            Self::FunctionDef(n) | Self::MacroDef(n) => n.line,
        }
    }
}

/// An ordered sequence of nodes from one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptFile {
    pub path: String,
    pub nodes: Vec<Node>,
}
