//! Parser error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ParseError {
    #[error("unterminated quoted argument at {file}:{line}")]
    UnterminatedQuote { file: String, line: usize },

    #[error("unterminated bracket argument at {file}:{line}")]
    UnterminatedBracket { file: String, line: usize },

    #[error("expected '(' after command '{command}' at {file}:{line}")]
    MissingOpenParen {
        command: String,
        file: String,
        line: usize,
    },

    #[error("unbalanced parentheses in '{command}' at {file}:{line}")]
    UnbalancedParens {
        command: String,
        file: String,
        line: usize,
    },

    #[error("'{end}' at {file}:{line} without matching '{start}'")]
    UnmatchedBlockEnd {
        start: String,
        end: String,
        file: String,
        line: usize,
    },

    #[error("'{start}' at {file}:{line} is never closed (expected '{end}')")]
    UnclosedBlock {
        start: String,
        end: String,
        file: String,
        line: usize,
    },

    #[error("invalid command name '{name}' at {file}:{line}")]
    InvalidCommandName {
        name: String,
        file: String,
        line: usize,
    },
}
