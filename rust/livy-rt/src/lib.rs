//! Runtime for the Livy array language: the primitive catalogues, the
//! operator combinators that synthesise new primitives from them, the AST
//! evaluator, and the per-session [`Context`].

pub mod context;
pub mod dyadic;
pub mod eval;
pub mod monadic;
pub mod operators;

pub use context::{Context, DyadicFn, MonadicFn, StringHandler, DEFAULT_AXIS};
pub use eval::{eval, eval_value, run_line, Flow};
