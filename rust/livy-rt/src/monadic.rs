//! The monadic primitive catalogue.
//!
//! Scalar math primitives are written once over complex (or real) scalars
//! and lifted cell-wise over arrays, so `sin A` has the shape of `A`. The
//! structural primitives (iota, rho, ravel, rot, transpose, up, down, box)
//! are shape-aware and live here as named functions.

use std::collections::HashMap;
use std::rc::Rc;

use num_complex::Complex64;

use livy_core::shape::{normalize_axis, product, stride_after};
use livy_core::{Boxed, Error, Result, Value};

use crate::context::{Context, MonadicFn};
use crate::dyadic::transpose_spec;

pub fn standard_monadics() -> HashMap<String, MonadicFn> {
    let mut m: HashMap<String, MonadicFn> = HashMap::new();
    let mut put = |name: &str, f: MonadicFn| {
        m.insert(name.to_string(), f);
    };

    // Structural primitives.
    put("iota", Rc::new(|ctx, b, ax| iota_k(ctx, b, ax, 0)));
    put("i", Rc::new(|ctx, b, ax| iota_k(ctx, b, ax, 0)));
    put("iota1", Rc::new(|ctx, b, ax| iota_k(ctx, b, ax, 1)));
    put("i1", Rc::new(|ctx, b, ax| iota_k(ctx, b, ax, 1)));
    put("rho", Rc::new(monadic_rho));
    put("p", Rc::new(monadic_rho));
    put(",", Rc::new(monadic_ravel));
    put("rot", Rc::new(monadic_rot));
    put("transpose", Rc::new(monadic_transpose));
    put("up", Rc::new(|ctx, b, ax| grade(ctx, b, ax, false)));
    put("down", Rc::new(|ctx, b, ax| grade(ctx, b, ax, true)));
    put("box", Rc::new(monadic_box));
    put("b", Rc::new(monadic_box));
    put("unbox", Rc::new(monadic_unbox));
    put("u", Rc::new(monadic_unbox));

    // Complex-scalar math, lifted cell-wise.
    put("+", cx(|b| b));
    put("-", cx(|b| -b));
    put("neg", cx(|b| -b));
    put("j", cx(|b| Complex64::new(0.0, 1.0) * b));
    put("real", cx(|b| Complex64::new(b.re, 0.0)));
    put("imag", cx(|b| Complex64::new(b.im, 0.0)));
    put("conjugate", cx(|b| b.conj()));
    put("abs", cx(|b| Complex64::new(b.norm(), 0.0)));
    put("phase", cx(|b| Complex64::new(b.arg(), 0.0)));
    put("double", cx(|b| b + b));
    put("square", cx(|b| b * b));
    put("sqrt", cx(|b| b.sqrt()));
    put("cbrt", cx(|b| {
        if b.im == 0.0 {
            Complex64::new(b.re.cbrt(), 0.0)
        } else {
            b.cbrt()
        }
    }));
    put("div", cx(|b| b.inv()));
    put("exp", cx(|b| b.exp()));
    put("log", cx(|b| b.ln()));
    put("log10", cx(|b| b.ln().unscale(std::f64::consts::LN_10)));
    put("sin", cx(|b| b.sin()));
    put("cos", cx(|b| b.cos()));
    put("tan", cx(|b| b.tan()));
    put("asin", cx(|b| b.asin()));
    put("acos", cx(|b| b.acos()));
    put("atan", cx(|b| b.atan()));
    put("sinh", cx(|b| b.sinh()));
    put("cosh", cx(|b| b.cosh()));
    put("tanh", cx(|b| b.tanh()));
    put("asinh", cx(|b| b.asinh()));
    put("acosh", cx(|b| b.acosh()));
    put("atanh", cx(|b| b.atanh()));
    put("round", cx(|b| Complex64::new(b.re.round(), b.im.round())));
    put("isInf", cx(|b| bool_cx(b.is_infinite())));
    put("isNaN", cx(|b| bool_cx(b.is_nan())));

    // Real-scalar math, lifted cell-wise.
    put("floor", float(f64::floor));
    put("ceil", float(f64::ceil));
    put("exp2", float(f64::exp2));
    put("log2", float(f64::log2));

    m.insert(
        "rect".to_string(),
        lift(Rc::new(|_, b, _| {
            let theta = b.as_float()?;
            Ok(Value::Num(Complex64::from_polar(1.0, theta)))
        })),
    );
    m.insert(
        "sgn".to_string(),
        lift(Rc::new(|_, b, _| {
            let x = b.as_float()?;
            if x.is_nan() {
                return Err(Error::Domain("cannot take the sign of NaN".into()));
            }
            Ok(Value::num(if x < 0.0 {
                -1.0
            } else if x > 0.0 {
                1.0
            } else {
                0.0
            }))
        })),
    );
    m.insert(
        "not".to_string(),
        lift(Rc::new(|_, b, _| Ok(Value::from_bool(!b.as_bool()?)))),
    );

    m
}

fn bool_cx(b: bool) -> Complex64 {
    Complex64::new(if b { 1.0 } else { 0.0 }, 0.0)
}

/// Lift a scalar primitive cell-wise over arrays: the result has the
/// argument's shape, and every cell must reduce to a scalar.
pub fn lift(f: MonadicFn) -> MonadicFn {
    Rc::new(move |ctx, b, axis| match b {
        Value::Arr(arr) => {
            let mut out = Vec::with_capacity(arr.data.len());
            for (i, cell) in arr.data.iter().enumerate() {
                let scalar = cell
                    .as_scalar()
                    .ok_or_else(|| Error::Type(format!("cell {i} is not a scalar: {cell}")))?;
                out.push(f(ctx, &scalar, axis)?);
            }
            Ok(Value::array(out, arr.shape.clone()))
        }
        _ => {
            let scalar = b
                .as_scalar()
                .ok_or_else(|| Error::Type(format!("not a scalar: {b}")))?;
            f(ctx, &scalar, axis)
        }
    })
}

fn cx(f: impl Fn(Complex64) -> Complex64 + 'static) -> MonadicFn {
    lift(Rc::new(move |_, b, _| Ok(Value::Num(f(b.as_complex()?)))))
}

fn float(f: impl Fn(f64) -> f64 + 'static) -> MonadicFn {
    lift(Rc::new(move |_, b, _| Ok(Value::num(f(b.as_float()?)))))
}

/// `iota n` counts `k, k+1, …, k+n-1` — zero-origin for `iota`, one-origin
/// for `iota1`.
fn iota_k(_ctx: &mut Context, b: &Value, _axis: i64, k: i64) -> Result<Value> {
    let n = b.as_int()?;
    if n < 0 {
        return Err(Error::Domain(format!("iota wants a non-negative count: {n}")));
    }
    Ok(Value::vector((0..n).map(|i| Value::int(i + k)).collect()))
}

/// The shape of `B` as a rank-1 array; a scalar has an empty shape vector.
fn monadic_rho(_ctx: &mut Context, b: &Value, _axis: i64) -> Result<Value> {
    Ok(Value::vector(
        b.shape().iter().map(|&d| Value::int(d as i64)).collect(),
    ))
}

fn monadic_ravel(_ctx: &mut Context, b: &Value, _axis: i64) -> Result<Value> {
    Ok(Value::vector(b.ravel()))
}

/// Reverse along the chosen axis (default last). Scalars are unchanged.
fn monadic_rot(_ctx: &mut Context, b: &Value, axis: i64) -> Result<Value> {
    let Some(arr) = b.as_array() else {
        return Ok(b.clone());
    };
    let rank = arr.rank();
    if rank == 0 {
        return Ok(b.clone());
    }
    let ax = normalize_axis(axis, rank)?;
    let dims = &arr.shape;
    let n = dims[ax];
    let inner = stride_after(dims, ax);
    let outer = product(&dims[..ax]);
    let mut out = Vec::with_capacity(arr.data.len());
    for o in 0..outer {
        for j in 0..n {
            for i in 0..inner {
                out.push(arr.data[o * n * inner + (n - 1 - j) * inner + i].clone());
            }
        }
    }
    Ok(Value::array(out, dims.clone()))
}

/// Swap the chosen axis (default last) with its predecessor, expressed as a
/// dyadic transpose with the corresponding permutation.
fn monadic_transpose(_ctx: &mut Context, b: &Value, axis: i64) -> Result<Value> {
    let arr = b
        .as_array()
        .ok_or_else(|| Error::Type(format!("transpose wants an array, got {b}")))?;
    let rank = arr.rank();
    if rank < 2 {
        return Err(Error::Shape(format!(
            "transpose wants rank >= 2, got shape {:?}",
            arr.shape
        )));
    }
    let ax = normalize_axis(axis, rank)?;
    let prev = (ax + rank - 1) % rank;
    let mut spec: Vec<usize> = (0..rank).collect();
    spec.swap(ax, prev);
    transpose_spec(&spec, arr)
}

/// Indices that would sort a rank-1 array ascending (`up`) or descending
/// (`down`). The sort is stable, so equal cells keep their input order.
fn grade(_ctx: &mut Context, b: &Value, _axis: i64, reverse: bool) -> Result<Value> {
    let name = if reverse { "down" } else { "up" };
    let arr = b
        .as_array()
        .ok_or_else(|| Error::Type(format!("{name} wants an array, got {b}")))?;
    if arr.rank() != 1 {
        return Err(Error::Shape(format!(
            "{name} wants rank 1, got shape {:?}",
            arr.shape
        )));
    }
    let mut idx: Vec<usize> = (0..arr.data.len()).collect();
    idx.sort_by(|&i, &j| arr.data[i].compare(&arr.data[j]));
    let cells: Vec<Value> = if reverse {
        idx.into_iter().rev().map(|i| Value::int(i as i64)).collect()
    } else {
        idx.into_iter().map(|i| Value::int(i as i64)).collect()
    };
    Ok(Value::vector(cells))
}

fn monadic_box(_ctx: &mut Context, b: &Value, _axis: i64) -> Result<Value> {
    Ok(Value::boxed(b.clone()))
}

fn monadic_unbox(_ctx: &mut Context, b: &Value, _axis: i64) -> Result<Value> {
    match b {
        Value::Boxed(x) => match x.as_ref() {
            Boxed::Value(v) => Ok(v.clone()),
            Boxed::Text(s) => Err(Error::Type(format!(
                "box holds text {s:?}, not a language value"
            ))),
        },
        other => Err(Error::Type(format!("unbox wants a box, got {other}"))),
    }
}
