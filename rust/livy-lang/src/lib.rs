//! Front end for the Livy array language: tokens, lexer, AST, and the
//! right-to-left recursive-descent parser.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod tokens;

pub use ast::{AssignTarget, DefNode, Expr, OpSpec};
pub use lexer::{tokenize, LexError};
pub use parser::{parse_line, ParseError};
pub use tokens::{Keyword, Token, TokenKind};
