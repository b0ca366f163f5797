use thiserror::Error;

use crate::frontend::token::{Token, TokenKind};

pub const EXPECT_EXPRESSION: &str = "Expect expression.";
pub const EXPECT_CLOSING_PAREN: &str = "Expect ')' after expression.";
pub const EXPECT_END_OF_INPUT: &str = "Expected EoF token!";
pub const TOO_MANY_CONSTANTS: &str = "Too many constants in one chunk.";
pub const NESTED_TOO_DEEPLY: &str = "Expression nested too deeply.";
pub const INVALID_NUMBER: &str = "Invalid number literal.";

/// Where in the source a diagnostic points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorLocation {
    /// At a concrete lexeme.
    Lexeme(String),
    /// At the end of input.
    End,
    /// Scanner errors carry their message as the lexeme, so there is nothing
    /// to point at.
    Unlocated,
}

impl ErrorLocation {
    pub fn of(token: &Token<'_>) -> Self {
        match token.kind {
            TokenKind::EndOfInput => ErrorLocation::End,
            TokenKind::Error => ErrorLocation::Unlocated,
            _ => ErrorLocation::Lexeme(token.lexeme.to_string()),
        }
    }
}

impl std::fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorLocation::Lexeme(lexeme) => write!(f, " at '{}'", lexeme),
            ErrorLocation::End => write!(f, " at end"),
            ErrorLocation::Unlocated => Ok(()),
        }
    }
}

/// One reported compile diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[line {line}] Error{location}: {message}")]
pub struct CompileError {
    pub line: usize,
    pub location: ErrorLocation,
    pub message: String,
}

impl CompileError {
    pub fn at(token: &Token<'_>, message: impl Into<String>) -> Self {
        CompileError {
            line: token.line,
            location: ErrorLocation::of(token),
            message: message.into(),
        }
    }
}

/// The outcome of a failed compile.
///
/// Panic-mode suppression means only the first error of a pass is kept, so
/// in practice this holds exactly one diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render(.diagnostics))]
pub struct CompileErrors {
    pub diagnostics: Vec<CompileError>,
}

impl CompileErrors {
    pub fn first(&self) -> Option<&CompileError> {
        self.diagnostics.first()
    }
}

fn render(diagnostics: &[CompileError]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
