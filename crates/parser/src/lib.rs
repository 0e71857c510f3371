#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! CMake-language parser for cmeval
//!
//! Turns `CMakeLists.txt` text into the AST the evaluator consumes. Two
//! stages:
//!
//! 1. [`lexer`] — raw command invocations: name, line, argument list with
//!    quoting/bracket information preserved. Handles line and bracket
//!    comments, quoted arguments with escapes and line continuations,
//!    bracket arguments, and parenthesized argument groups (`if()`
//!    conditions keep `(` / `)` as individual tokens).
//! 2. [`parser`] — pairs flow keywords (`if`/`elseif`/`else`/`endif`,
//!    `foreach`, `while`, `function`, `macro`) into structured nodes.
//!    `block`/`endblock` stay plain commands: the evaluator's flow
//!    controller matches them at run time so an unbalanced `endblock` is a
//!    diagnostic, not a parse failure.
//!
//! Variable expansion does not happen here; the evaluator's argument
//! resolver owns `${}`/`$ENV{}`/`$CACHE{}` semantics.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{
    Arg, CommandNode, ForEachNode, IfBranch, IfNode, Node, ScriptFile, UserCommandDefNode,
    WhileNode,
};
pub use parser::parse_script;
