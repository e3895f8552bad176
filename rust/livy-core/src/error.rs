//! Unified error type for the interpreter.
//!
//! Every failure in the lexer, parser, evaluator, or a primitive surfaces as
//! one of these variants. Errors are never recovered mid-expression; they
//! propagate to the top of the current top-level expression, where the shell
//! prints a diagnostic and continues.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The lexer could not consume input at `pos` (byte offset).
    #[error("syntax error at byte {pos}: {message}")]
    Syntax { message: String, pos: usize },

    /// The token stream did not match any production.
    #[error("parse error at byte {pos}: expected {expected}, found {found}")]
    Parse {
        expected: String,
        found: String,
        pos: usize,
    },

    /// Variable or operator name not found.
    #[error("name error: {0}")]
    Name(String),

    /// Value of the wrong variant for the operation.
    #[error("type error: {0}")]
    Type(String),

    /// Shapes incompatible: rank mismatch, axis out of range, non-conformable
    /// dyadic arguments, reshape of empty to non-empty.
    #[error("shape error: {0}")]
    Shape(String),

    /// Scalar value outside the operation's domain.
    #[error("domain error: {0}")]
    Domain(String),

    /// Numeric overflow of an integer conversion, or a complex result where a
    /// real number was required.
    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    /// Raised by BREAK/CONTINUE outside a loop, or by the host shell.
    #[error("user error: {0}")]
    User(String),
}

impl Error {
    /// Stable kind name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Syntax { .. } => "SyntaxError",
            Error::Parse { .. } => "ParseError",
            Error::Name(_) => "NameError",
            Error::Type(_) => "TypeError",
            Error::Shape(_) => "ShapeError",
            Error::Domain(_) => "DomainError",
            Error::Arithmetic(_) => "ArithmeticError",
            Error::User(_) => "UserError",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(
            Error::Syntax {
                message: "x".into(),
                pos: 0
            }
            .kind(),
            "SyntaxError"
        );
        assert_eq!(Error::Name("A".into()).kind(), "NameError");
        assert_eq!(Error::Shape("bad".into()).kind(), "ShapeError");
    }

    #[test]
    fn display_includes_position() {
        let e = Error::Parse {
            expected: "']'".into(),
            found: "end of input".into(),
            pos: 7,
        };
        let s = e.to_string();
        assert!(s.contains("byte 7"));
        assert!(s.contains("']'"));
    }
}
