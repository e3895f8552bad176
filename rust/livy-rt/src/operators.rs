//! Operator combinators: reduce, scan, each, inner product, outer product.
//!
//! Each combinator takes primitive function(s) out of the context's tables
//! and synthesises a new primitive with the same signature, so user-defined
//! operators compose with combinators exactly like built-ins.
//!
//! Reductions fold right-to-left, `a op (b op (c op d))`, matching APL
//! tradition; scan applies the same fold to every prefix, which is quadratic
//! along the axis for non-associative operators.

use std::rc::Rc;

use livy_core::shape::{normalize_axis, product, stride_after};
use livy_core::{Error, Result, Value};

use crate::context::{DyadicFn, MonadicFn, DEFAULT_AXIS};

/// Identity element used when reducing an empty axis. Operators without a
/// known identity fall back to 0.
pub fn identity_of(op: &str) -> Value {
    match op {
        "*" | "div" | "**" | "and" | "==" | "<=" | ">=" => Value::num(1.0),
        _ => Value::num(0.0),
    }
}

/// `op/` and `op\`: fold (or prefix-fold) along an axis. Reduce removes the
/// axis from the shape, and a rank-1 reduce yields a scalar; scan keeps the
/// input shape.
pub fn reduce_or_scan(f: DyadicFn, identity: Value, scan: bool) -> MonadicFn {
    Rc::new(move |ctx, b, axis| {
        let arr = b.as_array().ok_or_else(|| {
            Error::Type(format!("reduce/scan wants an array argument, got {b}"))
        })?;
        let rank = arr.rank();
        if rank == 0 {
            return Err(Error::Shape("cannot reduce a rank-0 array".into()));
        }
        let ax = normalize_axis(axis, rank)?;
        let dims = &arr.shape;
        let n = dims[ax];
        let inner = stride_after(dims, ax);
        let outer = product(&dims[..ax]);
        let data = &arr.data;

        if scan {
            let mut out = vec![Value::zero(); data.len()];
            for o in 0..outer {
                for i in 0..inner {
                    let base = o * n * inner + i;
                    for k in 0..n {
                        let mut acc = data[base + k * inner].clone();
                        for j in (0..k).rev() {
                            acc = f(ctx, &data[base + j * inner], &acc, DEFAULT_AXIS)?;
                        }
                        out[base + k * inner] = acc;
                    }
                }
            }
            return Ok(Value::array(out, dims.clone()));
        }

        let mut out = Vec::with_capacity(outer * inner);
        for o in 0..outer {
            for i in 0..inner {
                let base = o * n * inner + i;
                let acc = if n == 0 {
                    identity.clone()
                } else {
                    let mut acc = data[base + (n - 1) * inner].clone();
                    for j in (0..n - 1).rev() {
                        acc = f(ctx, &data[base + j * inner], &acc, DEFAULT_AXIS)?;
                    }
                    acc
                };
                out.push(acc);
            }
        }
        let mut out_dims = dims.clone();
        out_dims.remove(ax);
        if out_dims.is_empty() {
            Ok(out.pop().expect("rank-1 reduce has one cell"))
        } else {
            Ok(Value::array(out, out_dims))
        }
    })
}

/// `op~` on one argument: apply cell-wise, keeping the shape.
pub fn each_monadic(f: MonadicFn) -> MonadicFn {
    Rc::new(move |ctx, b, axis| match b.as_array() {
        Some(arr) => {
            let mut out = Vec::with_capacity(arr.data.len());
            for cell in &arr.data {
                out.push(f(ctx, cell, axis)?);
            }
            Ok(Value::array(out, arr.shape.clone()))
        }
        None => f(ctx, b, axis),
    })
}

/// `op~` on two arguments: cell-wise over matching shapes, with scalar
/// broadcast on either side.
pub fn each_dyadic(f: DyadicFn) -> DyadicFn {
    Rc::new(move |ctx, a, b, axis| {
        if axis != DEFAULT_AXIS {
            return Err(Error::Domain("each does not accept an axis".into()));
        }
        match (a.as_array(), b.as_array()) {
            (Some(x), Some(y)) => {
                if x.shape == y.shape {
                    let mut out = Vec::with_capacity(x.data.len());
                    for (ca, cb) in x.data.iter().zip(y.data.iter()) {
                        out.push(f(ctx, ca, cb, DEFAULT_AXIS)?);
                    }
                    return Ok(Value::array(out, x.shape.clone()));
                }
                if y.data.len() == 1 {
                    return map_left(ctx, &f, x, &y.data[0]);
                }
                if x.data.len() == 1 {
                    return map_right(ctx, &f, &x.data[0], y);
                }
                Err(Error::Shape(format!(
                    "each wants matching shapes, got {:?} and {:?}",
                    x.shape, y.shape
                )))
            }
            (Some(x), None) => map_left(ctx, &f, x, b),
            (None, Some(y)) => map_right(ctx, &f, a, y),
            (None, None) => f(ctx, a, b, DEFAULT_AXIS),
        }
    })
}

fn map_left(
    ctx: &mut crate::Context,
    f: &DyadicFn,
    x: &livy_core::Array,
    b: &Value,
) -> Result<Value> {
    let mut out = Vec::with_capacity(x.data.len());
    for cell in &x.data {
        out.push(f(ctx, cell, b, DEFAULT_AXIS)?);
    }
    Ok(Value::array(out, x.shape.clone()))
}

fn map_right(
    ctx: &mut crate::Context,
    f: &DyadicFn,
    a: &Value,
    y: &livy_core::Array,
) -> Result<Value> {
    let mut out = Vec::with_capacity(y.data.len());
    for cell in &y.data {
        out.push(f(ctx, a, cell, DEFAULT_AXIS)?);
    }
    Ok(Value::array(out, y.shape.clone()))
}

/// `A op1.op2 B`: generalised matrix product. The last axis of A must match
/// the first axis of B; each output cell reduces the pairwise `op2` row/
/// column products under `op1`, right-to-left.
pub fn inner_product(f1: DyadicFn, f2: DyadicFn) -> DyadicFn {
    Rc::new(move |ctx, a, b, _axis| {
        let x = a.as_array().ok_or_else(|| {
            Error::Type(format!("inner product wants an array on the left, got {a}"))
        })?;
        let y = b.as_array().ok_or_else(|| {
            Error::Type(format!("inner product wants an array on the right, got {b}"))
        })?;
        if x.rank() < 1 || y.rank() < 1 {
            return Err(Error::Shape("inner product wants rank >= 1 on both sides".into()));
        }
        let k = x.shape[x.rank() - 1];
        if k != y.shape[0] {
            return Err(Error::Shape(format!(
                "inner product axis mismatch: left shape {:?}, right shape {:?}",
                x.shape, y.shape
            )));
        }
        if k == 0 {
            return Err(Error::Shape("inner product along an empty axis".into()));
        }
        let rows = product(&x.shape[..x.rank() - 1]);
        let cols = product(&y.shape[1..]);
        let mut out_dims: Vec<usize> = x.shape[..x.rank() - 1].to_vec();
        out_dims.extend_from_slice(&y.shape[1..]);

        let mut out = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                let mut acc = f2(
                    ctx,
                    &x.data[r * k + (k - 1)],
                    &y.data[(k - 1) * cols + c],
                    DEFAULT_AXIS,
                )?;
                for j in (0..k - 1).rev() {
                    let t = f2(ctx, &x.data[r * k + j], &y.data[j * cols + c], DEFAULT_AXIS)?;
                    acc = f1(ctx, &t, &acc, DEFAULT_AXIS)?;
                }
                out.push(acc);
            }
        }
        if out_dims.is_empty() {
            Ok(out.pop().expect("rank-1 by rank-1 product has one cell"))
        } else {
            Ok(Value::array(out, out_dims))
        }
    })
}

/// `A ..op B`: ravel both sides and combine every pair, producing shape
/// `[|A|, |B|]`.
pub fn outer_product(f: DyadicFn) -> DyadicFn {
    Rc::new(move |ctx, a, b, _axis| {
        let aa = a.scalar_vector()?;
        let bb = b.scalar_vector()?;
        let mut out = Vec::with_capacity(aa.len() * bb.len());
        for ca in &aa {
            for cb in &bb {
                out.push(f(ctx, ca, cb, DEFAULT_AXIS)?);
            }
        }
        Ok(Value::array(out, vec![aa.len(), bb.len()]))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

    fn num_vec(xs: &[f64]) -> Value {
        Value::vector(xs.iter().map(|&x| Value::num(x)).collect())
    }

    fn ints(v: &Value) -> Vec<i64> {
        v.ravel().iter().map(|x| x.as_int().unwrap()).collect()
    }

    fn iota_arr(dims: &[usize]) -> Value {
        let n = product(dims);
        Value::array((0..n as i64).map(Value::int).collect(), dims.to_vec())
    }

    fn reduce_with(op: &str, v: Value, axis: i64) -> Result<Value> {
        let mut c = Context::new();
        let f = c.dyadic(op).unwrap();
        let r = reduce_or_scan(f, identity_of(op), false);
        r(&mut c, &v, axis)
    }

    fn scan_with(op: &str, v: Value) -> Result<Value> {
        let mut c = Context::new();
        let f = c.dyadic(op).unwrap();
        let r = reduce_or_scan(f, identity_of(op), true);
        r(&mut c, &v, DEFAULT_AXIS)
    }

    #[test]
    fn sum_reduce_of_a_vector_is_a_scalar() {
        let r = reduce_with("+", iota_arr(&[5]), DEFAULT_AXIS).unwrap();
        assert_eq!(r, Value::num(10.0));
        assert_eq!(r.rank(), 0);
    }

    #[test]
    fn reduce_folds_right_to_left() {
        // -/ 1 2 3 is 1 - (2 - 3) = 2.
        let r = reduce_with("-", num_vec(&[1.0, 2.0, 3.0]), DEFAULT_AXIS).unwrap();
        assert_eq!(r, Value::num(2.0));
    }

    #[test]
    fn empty_axis_reduces_to_the_identity() {
        assert_eq!(reduce_with("+", num_vec(&[]), DEFAULT_AXIS).unwrap(), Value::num(0.0));
        assert_eq!(reduce_with("*", num_vec(&[]), DEFAULT_AXIS).unwrap(), Value::num(1.0));
        // Unknown operators fall back to 0.
        assert_eq!(
            reduce_with("mod", num_vec(&[]), DEFAULT_AXIS).unwrap(),
            Value::num(0.0)
        );
    }

    #[test]
    fn reduce_along_the_first_axis_drops_it() {
        let r = reduce_with("+", iota_arr(&[3, 3, 3]), 0).unwrap();
        assert_eq!(r.shape(), &[3, 3]);
        assert_eq!(ints(&r), vec![27, 30, 33, 36, 39, 42, 45, 48, 51]);
    }

    #[test]
    fn reduce_along_the_last_axis() {
        let r = reduce_with("+", iota_arr(&[2, 3]), DEFAULT_AXIS).unwrap();
        assert_eq!(r.shape(), &[2]);
        assert_eq!(ints(&r), vec![3, 12]);
    }

    #[test]
    fn scan_keeps_the_shape_and_folds_prefixes() {
        let r = scan_with("+", num_vec(&[1.0, 2.0, 3.0])).unwrap();
        assert_eq!(ints(&r), vec![1, 3, 6]);
        // Each prefix folds right-to-left: -\ 1 2 3 is 1, 1-2, 1-(2-3).
        let r = scan_with("-", num_vec(&[1.0, 2.0, 3.0])).unwrap();
        assert_eq!(
            r.ravel().iter().map(|v| v.as_float().unwrap()).collect::<Vec<_>>(),
            vec![1.0, -1.0, 2.0]
        );
    }

    #[test]
    fn each_lifts_over_cells() {
        let mut c = Context::new();
        let f = each_monadic(c.monadic("iota").unwrap());
        let r = f(&mut c, &num_vec(&[1.0, 2.0]), DEFAULT_AXIS).unwrap();
        // Result is a vector of nested vectors.
        assert_eq!(r.shape(), &[2]);
        assert_eq!(r.ravel()[1].shape(), &[2]);
    }

    #[test]
    fn dyadic_each_broadcasts_scalars() {
        let mut c = Context::new();
        let f = each_dyadic(c.dyadic("+").unwrap());
        let r = f(&mut c, &num_vec(&[1.0, 2.0]), &Value::num(10.0), DEFAULT_AXIS).unwrap();
        assert_eq!(ints(&r), vec![11, 12]);
        assert!(f(&mut c, &num_vec(&[1.0]), &num_vec(&[1.0, 2.0, 3.0]), 0).is_err());
    }

    #[test]
    fn outer_product_of_iota_with_equality_is_the_identity_matrix() {
        let mut c = Context::new();
        let f = outer_product(c.dyadic("==").unwrap());
        let r = f(&mut c, &iota_arr(&[3]), &iota_arr(&[3]), DEFAULT_AXIS).unwrap();
        assert_eq!(r.shape(), &[3, 3]);
        assert_eq!(ints(&r), vec![1, 0, 0, 0, 1, 0, 0, 0, 1]);
    }

    #[test]
    fn inner_product_is_matrix_multiplication() {
        let mut c = Context::new();
        let f = inner_product(c.dyadic("+").unwrap(), c.dyadic("*").unwrap());
        let m = iota_arr(&[2, 2]); // 0 1 / 2 3
        let r = f(&mut c, &m, &m, DEFAULT_AXIS).unwrap();
        assert_eq!(r.shape(), &[2, 2]);
        assert_eq!(ints(&r), vec![2, 3, 6, 11]);
    }

    #[test]
    fn vector_inner_product_is_a_scalar() {
        let mut c = Context::new();
        let f = inner_product(c.dyadic("+").unwrap(), c.dyadic("*").unwrap());
        let r = f(
            &mut c,
            &num_vec(&[1.0, 2.0, 3.0]),
            &num_vec(&[4.0, 5.0, 6.0]),
            DEFAULT_AXIS,
        )
        .unwrap();
        assert_eq!(r, Value::num(32.0));
    }

    #[test]
    fn inner_product_checks_the_shared_axis() {
        let mut c = Context::new();
        let f = inner_product(c.dyadic("+").unwrap(), c.dyadic("*").unwrap());
        assert!(f(
            &mut c,
            &num_vec(&[1.0, 2.0]),
            &num_vec(&[1.0, 2.0, 3.0]),
            DEFAULT_AXIS
        )
        .is_err());
    }
}
