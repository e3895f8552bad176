//! Token types produced by the lexer.

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::EnumString;

/// Control-flow and definition keywords. Recognised case-insensitively, so
/// both `DEF` and `def` lex as [`Keyword::Def`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, strum::Display,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Keyword {
    Def,
    If,
    Then,
    Elif,
    Else,
    Fi,
    While,
    Do,
    Done,
    Break,
    Continue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenKind {
    /// End-of-input marker; always the final token.
    End,
    /// A real literal, possibly signed: `3`, `-1.5`, `2e10`.
    Number(f64),
    /// A complex literal `re±j·im`: `3+j4`, `-j2`.
    Complex(f64, f64),
    /// A name starting with an uppercase letter or underscore.
    Variable(String),
    /// A symbolic operator or a lowercase-initial identifier.
    Operator(String),
    /// `op/` — reduce adornment.
    Reduce(String),
    /// `op\` — scan adornment.
    Scan(String),
    /// `op~` — each adornment.
    Each(String),
    /// `op1.op2` — inner product.
    Inner(String, String),
    /// `..op` — outer product.
    Outer(String),
    Open,
    Close,
    OpenBracket,
    CloseBracket,
    OpenBrace,
    CloseBrace,
    /// Statement terminator: `;` or newline.
    Semi,
    /// Double-quoted string literal (unescaped contents).
    Str(String),
    Keyword(Keyword),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::End => write!(f, "end of input"),
            TokenKind::Number(x) => write!(f, "number {x}"),
            TokenKind::Complex(re, im) => write!(f, "complex {re}+j{im}"),
            TokenKind::Variable(s) => write!(f, "variable {s}"),
            TokenKind::Operator(s) => write!(f, "operator {s}"),
            TokenKind::Reduce(s) => write!(f, "reduce {s}/"),
            TokenKind::Scan(s) => write!(f, "scan {s}\\"),
            TokenKind::Each(s) => write!(f, "each {s}~"),
            TokenKind::Inner(a, b) => write!(f, "inner product {a}.{b}"),
            TokenKind::Outer(s) => write!(f, "outer product ..{s}"),
            TokenKind::Open => write!(f, "'('"),
            TokenKind::Close => write!(f, "')'"),
            TokenKind::OpenBracket => write!(f, "'['"),
            TokenKind::CloseBracket => write!(f, "']'"),
            TokenKind::OpenBrace => write!(f, "'{{'"),
            TokenKind::CloseBrace => write!(f, "'}}'"),
            TokenKind::Semi => write!(f, "';'"),
            TokenKind::Str(s) => write!(f, "string {s:?}"),
            TokenKind::Keyword(k) => write!(f, "keyword {k}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token's first character in the source line.
    pub pos: usize,
}

impl Token {
    pub fn new(kind: TokenKind, pos: usize) -> Token {
        Token { kind, pos }
    }
}
