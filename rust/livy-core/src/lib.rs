//! Core data model for the Livy array language: the tagged value universe,
//! shape/stride arithmetic, number formatting, and the unified error type.

pub mod error;
pub mod format;
pub mod shape;
pub mod value;

pub use error::{Error, Result};
pub use format::NumberFormat;
pub use value::{Array, Boxed, Value};
