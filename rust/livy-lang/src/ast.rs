//! Abstract syntax tree for the array language.
//!
//! A parsed line is a sequence of expressions separated by statement
//! terminators. Operator applications keep their axis expression on the
//! operator itself, since `op[axis]` binds the axis to the operator and not
//! to the operand that follows.

use std::rc::Rc;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// The operator position of a monadic or dyadic application: a plain name or
/// an operator-combinator adornment carrying the inner operator name(s).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OpSpec {
    Plain(String),
    Reduce(String),
    Scan(String),
    Each(String),
    Inner(String, String),
    Outer(String),
}

impl OpSpec {
    pub fn name(&self) -> String {
        match self {
            OpSpec::Plain(op) => op.clone(),
            OpSpec::Reduce(op) => format!("{op}/"),
            OpSpec::Scan(op) => format!("{op}\\"),
            OpSpec::Each(op) => format!("{op}~"),
            OpSpec::Inner(a, b) => format!("{a}.{b}"),
            OpSpec::Outer(op) => format!("..{op}"),
        }
    }
}

/// Assignment targets: a variable, or a subscripted variable whose selected
/// cells are overwritten in a copy of the old array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AssignTarget {
    Variable(String),
    Subscript {
        name: String,
        subs: Vec<Option<Expr>>,
    },
}

/// A user-operator definition:
/// `DEF [Lhs] name [[Axis]] Rhs [; Local]* { body }`.
/// Presence of `lhs` makes the operator dyadic. `locals` lists every name
/// saved and restored around a call, formals included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefNode {
    pub name: String,
    pub lhs: Option<String>,
    pub axis: Option<String>,
    pub rhs: String,
    pub locals: Vec<String>,
    pub body: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Number(Complex64),
    /// A string literal; evaluation is delegated to the context's string
    /// handler hook.
    Str(String),
    Variable(String),
    Monad {
        op: OpSpec,
        axis: Option<Box<Expr>>,
        b: Box<Expr>,
        pos: usize,
    },
    Dyad {
        a: Box<Expr>,
        op: OpSpec,
        axis: Option<Box<Expr>>,
        b: Box<Expr>,
        pos: usize,
    },
    Assign {
        target: AssignTarget,
        value: Box<Expr>,
    },
    /// Adjacent atoms form a vector literal: `1 2 3`.
    List(Vec<Expr>),
    /// Statements separated by `;` or newline; evaluates to the last value.
    Seq(Vec<Expr>),
    Subscript {
        array: Box<Expr>,
        /// One entry per axis; `None` selects the entire axis.
        subs: Vec<Option<Expr>>,
    },
    If {
        cond: Box<Expr>,
        then_seq: Box<Expr>,
        else_seq: Option<Box<Expr>>,
    },
    While {
        guard: Box<Expr>,
        body: Box<Expr>,
    },
    Break,
    Continue,
    Def(Rc<DefNode>),
}

impl Expr {
    pub fn number(x: f64) -> Expr {
        Expr::Number(Complex64::new(x, 0.0))
    }
}
