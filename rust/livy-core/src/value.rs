//! The tagged value universe.
//!
//! A value is a scalar (complex number, character, or box) or an
//! n-dimensional array of values over a row-major flat buffer plus a shape
//! vector. Values are immutable once constructed; the array payload sits
//! behind `Rc` so clones are cheap and a mutating operation (subscripted
//! assignment) copies the buffer explicitly instead of writing in place.

use std::cmp::Ordering;
use std::rc::Rc;

use num_complex::Complex64;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::format::NumberFormat;
use crate::shape;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// A single codepoint scalar.
    Char(char),
    /// A complex scalar. Real numbers are numbers whose imaginary part is
    /// exactly zero.
    Num(Complex64),
    /// An n-dimensional array. `data.len() == product(shape)` always holds.
    Arr(Rc<Array>),
    /// An opaque holder, treated as a scalar for rank purposes.
    Boxed(Rc<Boxed>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Array {
    pub data: Vec<Value>,
    pub shape: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Boxed {
    Value(Value),
    Text(String),
}

impl Array {
    /// Build an array, checking the cell-count invariant.
    pub fn new(data: Vec<Value>, shape: Vec<usize>) -> Result<Array> {
        if data.len() != shape::product(&shape) {
            return Err(Error::Shape(format!(
                "array of {} cells cannot have shape {:?}",
                data.len(),
                shape
            )));
        }
        Ok(Array { data, shape })
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }
}

impl From<Array> for Value {
    fn from(a: Array) -> Value {
        Value::Arr(Rc::new(a))
    }
}

impl Value {
    // ── Constructors ────────────────────────────────────────────────────

    pub fn num(x: f64) -> Value {
        Value::Num(Complex64::new(x, 0.0))
    }

    pub fn int(n: i64) -> Value {
        Value::num(n as f64)
    }

    pub fn from_bool(b: bool) -> Value {
        Value::num(if b { 1.0 } else { 0.0 })
    }

    pub fn zero() -> Value {
        Value::Num(Complex64::zero())
    }

    /// Build an array value. Callers are responsible for the cell-count
    /// invariant; use [`Array::new`] when the inputs are untrusted.
    pub fn array(data: Vec<Value>, shape: Vec<usize>) -> Value {
        debug_assert_eq!(data.len(), shape::product(&shape));
        Value::Arr(Rc::new(Array { data, shape }))
    }

    pub fn vector(data: Vec<Value>) -> Value {
        let n = data.len();
        Value::array(data, vec![n])
    }

    pub fn empty_vector() -> Value {
        Value::array(vec![], vec![0])
    }

    pub fn boxed(v: Value) -> Value {
        Value::Boxed(Rc::new(Boxed::Value(v)))
    }

    pub fn boxed_text(s: impl Into<String>) -> Value {
        Value::Boxed(Rc::new(Boxed::Text(s.into())))
    }

    // ── Shape queries ───────────────────────────────────────────────────

    pub fn shape(&self) -> &[usize] {
        match self {
            Value::Arr(a) => &a.shape,
            _ => &[],
        }
    }

    /// Number of axes; scalars have rank 0.
    pub fn rank(&self) -> usize {
        self.shape().len()
    }

    /// Number of cells in the ravel.
    pub fn size(&self) -> usize {
        match self {
            Value::Arr(a) => a.data.len(),
            _ => 1,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Arr(a) => Some(a),
            _ => None,
        }
    }

    /// Row-major cell sequence. A scalar ravels to a single-cell vector.
    pub fn ravel(&self) -> Vec<Value> {
        match self {
            Value::Arr(a) => a.data.clone(),
            _ => vec![self.clone()],
        }
    }

    // ── Scalar accessors ────────────────────────────────────────────────

    /// Unwrap to a scalar, looking through singleton arrays of any rank.
    /// Returns `None` when the value holds more than one cell.
    pub fn as_scalar(&self) -> Option<Value> {
        match self {
            Value::Arr(a) => {
                if a.data.len() == 1 {
                    a.data[0].as_scalar()
                } else {
                    None
                }
            }
            _ => Some(self.clone()),
        }
    }

    pub fn as_complex(&self) -> Result<Complex64> {
        match self.as_scalar() {
            Some(Value::Num(c)) => Ok(c),
            Some(other) => Err(Error::Type(format!(
                "expected a number, got {other}"
            ))),
            None => Err(Error::Type(format!(
                "expected a scalar number, got an array of {} cells",
                self.size()
            ))),
        }
    }

    pub fn as_float(&self) -> Result<f64> {
        let c = self.as_complex()?;
        if c.im != 0.0 {
            return Err(Error::Arithmetic(format!(
                "number has an imaginary part, cannot be used as a real: {}",
                NumberFormat::default().complex(c)
            )));
        }
        Ok(c.re)
    }

    pub fn as_int(&self) -> Result<i64> {
        let x = self.as_float()?;
        if !x.is_finite() {
            return Err(Error::Arithmetic(format!("not a finite integer: {x}")));
        }
        if x.fract() != 0.0 {
            return Err(Error::Domain(format!("not an integer: {x}")));
        }
        if x < i64::MIN as f64 || x > i64::MAX as f64 {
            return Err(Error::Arithmetic(format!("integer out of range: {x}")));
        }
        Ok(x as i64)
    }

    /// Boolean cells must be exactly 0 or 1.
    pub fn as_bool(&self) -> Result<bool> {
        match self.as_float()? {
            x if x == 0.0 => Ok(false),
            x if x == 1.0 => Ok(true),
            x => Err(Error::Domain(format!("cannot use {x} as a boolean"))),
        }
    }

    /// Ravel as integers: a scalar becomes a one-element vector.
    pub fn int_vector(&self) -> Result<Vec<i64>> {
        self.ravel().iter().map(|v| v.as_int()).collect()
    }

    /// Ravel as non-negative dimensions.
    pub fn dim_vector(&self) -> Result<Vec<usize>> {
        self.int_vector()?
            .into_iter()
            .map(|n| {
                usize::try_from(n)
                    .map_err(|_| Error::Domain(format!("dimension must be non-negative: {n}")))
            })
            .collect()
    }

    /// Ravel as scalars, unwrapping singleton cells.
    pub fn scalar_vector(&self) -> Result<Vec<Value>> {
        self.ravel()
            .iter()
            .enumerate()
            .map(|(i, v)| {
                v.as_scalar()
                    .ok_or_else(|| Error::Type(format!("cell {i} is not a scalar: {v}")))
            })
            .collect()
    }

    // ── Ordering ────────────────────────────────────────────────────────

    fn variant_order(&self) -> u8 {
        match self {
            Value::Char(_) => 1,
            Value::Num(_) => 2,
            Value::Arr(_) => 3,
            Value::Boxed(_) => 4,
        }
    }

    /// Total order over all values: by variant tag first, then within the
    /// variant. Numbers compare by real part then imaginary part; arrays by
    /// rank, then shape, then cells lexicographically; boxes by identity.
    pub fn compare(&self, other: &Value) -> Ordering {
        let tag = self.variant_order().cmp(&other.variant_order());
        if tag != Ordering::Equal {
            return tag;
        }
        match (self, other) {
            (Value::Char(a), Value::Char(b)) => a.cmp(b),
            (Value::Num(a), Value::Num(b)) => a
                .re
                .total_cmp(&b.re)
                .then_with(|| a.im.total_cmp(&b.im)),
            (Value::Arr(a), Value::Arr(b)) => a
                .rank()
                .cmp(&b.rank())
                .then_with(|| a.shape.cmp(&b.shape))
                .then_with(|| {
                    for (x, y) in a.data.iter().zip(b.data.iter()) {
                        let c = x.compare(y);
                        if c != Ordering::Equal {
                            return c;
                        }
                    }
                    Ordering::Equal
                }),
            (Value::Boxed(a), Value::Boxed(b)) => {
                (Rc::as_ptr(a) as usize).cmp(&(Rc::as_ptr(b) as usize))
            }
            _ => unreachable!("variant tags already compared"),
        }
    }

    // ── Printing ────────────────────────────────────────────────────────

    /// Compact single-line form, used in diagnostics and for cells nested
    /// inside a pretty-printed array.
    fn atom(&self, fmt: &NumberFormat) -> String {
        match self {
            Value::Char(ch) => format!("'{ch}'"),
            Value::Num(c) => fmt.complex(*c),
            Value::Arr(a) => {
                let mut out = String::from("[");
                for (i, d) in a.shape.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    out.push_str(&d.to_string());
                }
                out.push_str("]{");
                for (i, v) in a.data.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    out.push_str(&v.atom(fmt));
                }
                out.push('}');
                out
            }
            Value::Boxed(b) => match b.as_ref() {
                Boxed::Value(v) => format!("(box {})", v.atom(fmt)),
                Boxed::Text(s) => format!("(box {s:?})"),
            },
        }
    }

    /// Multi-line form for the shell. Rank-1 arrays print their cells on one
    /// line; higher ranks column-align cells by the last axis and print one
    /// row per line, with blank lines between rank-3 slabs.
    pub fn pretty(&self, fmt: &NumberFormat) -> String {
        let arr = match self {
            Value::Arr(a) => a,
            _ => return self.atom(fmt),
        };
        match arr.rank() {
            0 => arr.data[0].atom(fmt),
            1 => {
                let cells: Vec<String> = arr.data.iter().map(|v| v.atom(fmt)).collect();
                cells.join(" ")
            }
            _ => {
                let mut cells: Vec<String> = arr.data.iter().map(|v| v.atom(fmt)).collect();
                let last = arr.shape[arr.rank() - 1];
                // Pad each column (cells congruent modulo the last axis) to
                // the widest entry in that column.
                for j in 0..last {
                    let mut w = 0;
                    for i in (j..cells.len()).step_by(last) {
                        w = w.max(cells[i].len());
                    }
                    for i in (j..cells.len()).step_by(last) {
                        let pad = w - cells[i].len();
                        if pad > 0 {
                            cells[i] = format!("{}{}", " ".repeat(pad), cells[i]);
                        }
                    }
                }
                let mut out = String::new();
                pretty_slab(&arr.shape, &cells, &mut out);
                out.trim_end_matches('\n').to_string()
            }
        }
    }
}

fn pretty_slab(dims: &[usize], cells: &[String], out: &mut String) {
    if dims.len() <= 1 {
        out.push_str(&cells.join(" "));
        out.push('\n');
        return;
    }
    let stride = shape::product(&dims[1..]);
    for i in 0..dims[0] {
        pretty_slab(&dims[1..], &cells[i * stride..(i + 1) * stride], out);
        if dims.len() > 2 {
            out.push('\n');
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.atom(&NumberFormat::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num_vec(xs: &[f64]) -> Value {
        Value::vector(xs.iter().map(|&x| Value::num(x)).collect())
    }

    #[test]
    fn array_invariant_is_checked() {
        assert!(Array::new(vec![Value::num(1.0)], vec![2]).is_err());
        assert!(Array::new(vec![], vec![0, 3]).is_ok());
        assert!(Array::new(vec![Value::num(1.0)], vec![]).is_ok());
    }

    #[test]
    fn scalar_unwraps_through_singleton_arrays() {
        let nested = Value::array(vec![Value::vector(vec![Value::num(7.0)])], vec![1]);
        assert_eq!(nested.as_scalar(), Some(Value::num(7.0)));
        assert_eq!(num_vec(&[1.0, 2.0]).as_scalar(), None);
    }

    #[test]
    fn as_int_rejects_fractions_and_complex() {
        assert_eq!(Value::num(3.0).as_int().unwrap(), 3);
        assert!(matches!(Value::num(3.5).as_int(), Err(Error::Domain(_))));
        assert!(matches!(
            Value::Num(Complex64::new(1.0, 2.0)).as_int(),
            Err(Error::Arithmetic(_))
        ));
    }

    #[test]
    fn as_bool_wants_exactly_zero_or_one() {
        assert!(!Value::num(0.0).as_bool().unwrap());
        assert!(Value::num(1.0).as_bool().unwrap());
        assert!(matches!(Value::num(2.0).as_bool(), Err(Error::Domain(_))));
    }

    #[test]
    fn compare_orders_by_variant_then_contents() {
        let a = Value::num(1.0);
        let b = Value::num(2.0);
        assert_eq!(a.compare(&b), Ordering::Less);
        assert_eq!(Value::Char('a').compare(&a), Ordering::Less);
        assert_eq!(a.compare(&num_vec(&[0.0])), Ordering::Less);
        let v1 = num_vec(&[1.0, 2.0]);
        let v2 = num_vec(&[1.0, 3.0]);
        assert_eq!(v1.compare(&v2), Ordering::Less);
    }

    #[test]
    fn dim_vector_rejects_negatives() {
        assert_eq!(num_vec(&[2.0, 3.0]).dim_vector().unwrap(), vec![2, 3]);
        assert!(num_vec(&[-1.0]).dim_vector().is_err());
    }

    #[test]
    fn pretty_rank_one_is_a_single_line() {
        let v = num_vec(&[0.0, 1.0, 2.0]);
        assert_eq!(v.pretty(&NumberFormat::default()), "0 1 2");
    }

    #[test]
    fn pretty_rank_two_aligns_columns() {
        let v = Value::array(
            vec![
                Value::num(1.0),
                Value::num(20.0),
                Value::num(300.0),
                Value::num(4.0),
            ],
            vec![2, 2],
        );
        assert_eq!(v.pretty(&NumberFormat::default()), "  1 20\n300  4");
    }

    #[test]
    fn pretty_rank_three_separates_slabs() {
        let v = Value::array((0..8).map(Value::int).collect(), vec![2, 2, 2]);
        assert_eq!(v.pretty(&NumberFormat::default()), "0 1\n2 3\n\n4 5\n6 7");
    }
}
