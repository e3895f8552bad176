//! The dyadic primitive catalogue.
//!
//! Scalar-lifted dyadics follow the conformability rule: identical shapes go
//! cell-wise, a scalar on either side broadcasts, anything else is a shape
//! error. The structural primitives (reshape, rotate, take, drop, catenate,
//! laminate, compress, expand, transpose, member) each derive an output
//! shape and walk the input buffer(s) through the shared stride helpers.

use std::collections::HashMap;
use std::rc::Rc;

use num_complex::Complex64;

use livy_core::shape::{mod_positive, normalize_axis, offset, product, stride_after, unravel};
use livy_core::{Array, Error, Result, Value};

use crate::context::{Context, DyadicFn, DEFAULT_AXIS};

pub fn standard_dyadics() -> HashMap<String, DyadicFn> {
    let mut m: HashMap<String, DyadicFn> = HashMap::new();
    let mut put = |name: &str, f: DyadicFn| {
        m.insert(name.to_string(), f);
    };

    // Structural primitives.
    put("rho", Rc::new(dyadic_rho));
    put("p", Rc::new(dyadic_rho));
    put("rot", Rc::new(dyadic_rot));
    put("take", Rc::new(|c, a, b, ax| take_or_drop(c, a, b, ax, false)));
    put("drop", Rc::new(|c, a, b, ax| take_or_drop(c, a, b, ax, true)));
    put(",", Rc::new(dyadic_catenate));
    put("laminate", Rc::new(dyadic_laminate));
    put("/", Rc::new(|c, a, b, ax| compress_or_expand(c, a, b, ax, true)));
    put("\\", Rc::new(|c, a, b, ax| compress_or_expand(c, a, b, ax, false)));
    put("transpose", Rc::new(dyadic_transpose));
    put("member", Rc::new(dyadic_member));
    put("e", Rc::new(dyadic_member));

    // Complex arithmetic, lifted cell-wise with scalar broadcast.
    put("+", cx2(|a, b| a + b));
    put("-", cx2(|a, b| a - b));
    put("*", cx2(|a, b| a * b));
    put("div", cx2(|a, b| a / b));
    put("**", cx2(cx_pow));
    put("j", cx2(|a, b| a + Complex64::new(0.0, 1.0) * b));

    // Real arithmetic.
    put("mod", float2(|a, b| a % b));
    put("remainder", float2(|a, b| a - b * (a / b).round_ties_even()));
    put("atan", float2(f64::atan2));
    put("hypot", float2(f64::hypot));
    put("copysign", float2(f64::copysign));
    put("min", float2(f64::min));
    put("max", float2(f64::max));
    put(
        "rect",
        lift2(Rc::new(|_, a, b, _| {
            Ok(Value::Num(Complex64::from_polar(a.as_float()?, b.as_float()?)))
        })),
    );

    // Comparisons and boolean connectives.
    put("==", cx2_bool(|a, b| a == b));
    put("!=", cx2_bool(|a, b| a != b));
    put("<", float2_bool(|a, b| a < b));
    put(">", float2_bool(|a, b| a > b));
    put("<=", float2_bool(|a, b| a <= b));
    put(">=", float2_bool(|a, b| a >= b));
    put("and", bool2(|a, b| a && b));
    put("or", bool2(|a, b| a || b));
    put("xor", bool2(|a, b| a != b));

    m
}

/// Complex power with the conventional special cases for a zero base, so
/// `0 ** 0` is 1 rather than NaN.
fn cx_pow(a: Complex64, b: Complex64) -> Complex64 {
    if a == Complex64::new(0.0, 0.0) {
        return if b == Complex64::new(0.0, 0.0) {
            Complex64::new(1.0, 0.0)
        } else if b.re > 0.0 {
            Complex64::new(0.0, 0.0)
        } else {
            Complex64::new(f64::INFINITY, 0.0)
        };
    }
    a.powc(b)
}

// ── Scalar lifting ──────────────────────────────────────────────────────

/// Lift a scalar dyadic over arrays. Identical shapes combine cell-wise; a
/// scalar (or singleton) on either side broadcasts to the other's shape.
pub fn lift2(f: DyadicFn) -> DyadicFn {
    Rc::new(move |ctx, a, b, axis| {
        if let (Some(x), Some(y)) = (a.as_array(), b.as_array()) {
            if x.shape == y.shape {
                let mut out = Vec::with_capacity(x.data.len());
                for (i, (ca, cb)) in x.data.iter().zip(y.data.iter()).enumerate() {
                    let sa = scalar_cell(ca, i, "left")?;
                    let sb = scalar_cell(cb, i, "right")?;
                    out.push(f(ctx, &sa, &sb, axis)?);
                }
                return Ok(Value::array(out, x.shape.clone()));
            }
        }
        match (a.as_array(), b.as_scalar()) {
            (Some(x), Some(sb)) => {
                let mut out = Vec::with_capacity(x.data.len());
                for (i, ca) in x.data.iter().enumerate() {
                    let sa = scalar_cell(ca, i, "left")?;
                    out.push(f(ctx, &sa, &sb, axis)?);
                }
                return Ok(Value::array(out, x.shape.clone()));
            }
            _ => {}
        }
        let sa = a.as_scalar().ok_or_else(|| {
            Error::Shape(format!(
                "non-conformable shapes {:?} and {:?}",
                a.shape(),
                b.shape()
            ))
        })?;
        if let Some(y) = b.as_array() {
            let mut out = Vec::with_capacity(y.data.len());
            for (i, cb) in y.data.iter().enumerate() {
                let sb = scalar_cell(cb, i, "right")?;
                out.push(f(ctx, &sa, &sb, axis)?);
            }
            return Ok(Value::array(out, y.shape.clone()));
        }
        let sb = b
            .as_scalar()
            .ok_or_else(|| Error::Type(format!("right argument is not a scalar: {b}")))?;
        f(ctx, &sa, &sb, axis)
    })
}

fn scalar_cell(v: &Value, i: usize, side: &str) -> Result<Value> {
    v.as_scalar()
        .ok_or_else(|| Error::Type(format!("{side} cell {i} is not a scalar: {v}")))
}

fn cx2(f: impl Fn(Complex64, Complex64) -> Complex64 + 'static) -> DyadicFn {
    lift2(Rc::new(move |_, a, b, _| {
        Ok(Value::Num(f(a.as_complex()?, b.as_complex()?)))
    }))
}

fn float2(f: impl Fn(f64, f64) -> f64 + 'static) -> DyadicFn {
    lift2(Rc::new(move |_, a, b, _| {
        Ok(Value::num(f(a.as_float()?, b.as_float()?)))
    }))
}

fn cx2_bool(f: impl Fn(Complex64, Complex64) -> bool + 'static) -> DyadicFn {
    lift2(Rc::new(move |_, a, b, _| {
        Ok(Value::from_bool(f(a.as_complex()?, b.as_complex()?)))
    }))
}

fn float2_bool(f: impl Fn(f64, f64) -> bool + 'static) -> DyadicFn {
    lift2(Rc::new(move |_, a, b, _| {
        Ok(Value::from_bool(f(a.as_float()?, b.as_float()?)))
    }))
}

fn bool2(f: impl Fn(bool, bool) -> bool + 'static) -> DyadicFn {
    lift2(Rc::new(move |_, a, b, _| {
        Ok(Value::from_bool(f(a.as_bool()?, b.as_bool()?)))
    }))
}

// ── Reshape ─────────────────────────────────────────────────────────────

/// `A rho B`: fill the new shape by cycling through B's ravel. An empty
/// shape vector yields the first cell of B.
fn dyadic_rho(_ctx: &mut Context, a: &Value, b: &Value, _axis: i64) -> Result<Value> {
    let spec = a.dim_vector()?;
    let src = b.ravel();
    let n = product(&spec);
    if n > 0 && src.is_empty() {
        return Err(Error::Shape(format!(
            "cannot reshape an empty array to shape {spec:?}"
        )));
    }
    if spec.is_empty() {
        return src
            .first()
            .cloned()
            .ok_or_else(|| Error::Shape("cannot take the first cell of an empty array".into()));
    }
    let out = (0..n).map(|i| src[i % src.len()].clone()).collect();
    Ok(Value::array(out, spec))
}

// ── Rotate ──────────────────────────────────────────────────────────────

/// `A rot[axis] B`: cyclic rotation along the axis. A scalar A rotates every
/// slice by the same amount; an array A of rank `rank(B)-1` (shape of B with
/// the axis removed) rotates each slice independently. The cell at axis
/// position `j` of the output comes from position `(j + k) mod n` of the
/// input.
fn dyadic_rot(_ctx: &mut Context, a: &Value, b: &Value, axis: i64) -> Result<Value> {
    let arr = b
        .as_array()
        .ok_or_else(|| Error::Type(format!("rot wants an array on the right, got {b}")))?;
    let rank = arr.rank();
    if rank == 0 {
        return Ok(b.clone());
    }
    let ax = normalize_axis(axis, rank)?;
    let dims = &arr.shape;
    let n = dims[ax];

    let spec_dims: Vec<usize> = dims
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != ax)
        .map(|(_, &d)| d)
        .collect();
    let amounts: Vec<i64> = match a.as_array() {
        Some(am) => {
            if am.shape != spec_dims {
                return Err(Error::Shape(format!(
                    "rot wants the left shape {:?} to be the right shape {:?} without axis {ax}",
                    am.shape, dims
                )));
            }
            a.int_vector()?
        }
        None => vec![a.as_int()?; product(&spec_dims)],
    };

    let mut out = Vec::with_capacity(arr.data.len());
    let mut idx = vec![0usize; rank];
    let mut spec_idx = vec![0usize; spec_dims.len()];
    for flat in 0..arr.data.len() {
        unravel(flat, dims, &mut idx);
        let mut s = 0;
        for (i, &v) in idx.iter().enumerate() {
            if i != ax {
                spec_idx[s] = v;
                s += 1;
            }
        }
        let k = amounts[offset(&spec_idx, &spec_dims)];
        idx[ax] = mod_positive(idx[ax] as i64 + k, n)?;
        out.push(arr.data[offset(&idx, dims)].clone());
    }
    Ok(Value::array(out, dims.clone()))
}

// ── Take and drop ───────────────────────────────────────────────────────

/// `A take B` / `A drop B`. A gives one signed count per axis: positive
/// works from the front, negative from the back. Take may over-reach an
/// axis, padding with numeric zero; drop past the axis length is an error.
fn take_or_drop(
    _ctx: &mut Context,
    a: &Value,
    b: &Value,
    axis: i64,
    dropping: bool,
) -> Result<Value> {
    let name = if dropping { "drop" } else { "take" };
    if axis != DEFAULT_AXIS {
        return Err(Error::Domain(format!("{name} does not accept an axis")));
    }
    let spec = a.int_vector()?;
    let arr = b
        .as_array()
        .ok_or_else(|| Error::Type(format!("{name} wants an array on the right, got {b}")))?;
    let dims = &arr.shape;
    if spec.len() != dims.len() {
        return Err(Error::Shape(format!(
            "{name} wants one count per axis: got {} counts for shape {dims:?}",
            spec.len()
        )));
    }

    let rank = dims.len();
    let mut pre = vec![0usize; rank];
    let mut kept = vec![0usize; rank];
    let mut start = vec![0usize; rank];
    let mut out_dims = vec![0usize; rank];
    for i in 0..rank {
        let sz = dims[i];
        let mut k = spec[i].unsigned_abs() as usize;
        let mut post = 0usize;
        if k > sz {
            if dropping {
                return Err(Error::Shape(format!(
                    "drop count {} exceeds axis {i} of length {sz}",
                    spec[i]
                )));
            }
            if spec[i] > 0 {
                post = k - sz;
            } else {
                pre[i] = k - sz;
            }
            k = sz;
        }
        if dropping {
            k = sz - k;
        }
        kept[i] = k;
        out_dims[i] = pre[i] + k + post;
        // Negative take and positive drop both consume from the back.
        start[i] = if dropping != (spec[i] < 0) { sz - k } else { 0 };
    }

    let total = product(&out_dims);
    let mut out = Vec::with_capacity(total);
    let mut idx = vec![0usize; rank];
    let mut src = vec![0usize; rank];
    'cells: for flat in 0..total {
        unravel(flat, &out_dims, &mut idx);
        for i in 0..rank {
            if idx[i] < pre[i] || idx[i] >= pre[i] + kept[i] {
                out.push(Value::zero());
                continue 'cells;
            }
            src[i] = idx[i] - pre[i] + start[i];
        }
        out.push(arr.data[offset(&src, dims)].clone());
    }
    Ok(Value::array(out, out_dims))
}

// ── Catenate and laminate ───────────────────────────────────────────────

/// `A ,[axis] B`: join along an existing axis (default last). A scalar side
/// is promoted to the other side's shape with the catenation axis set to 1;
/// two scalars join into a 2-vector.
fn dyadic_catenate(_ctx: &mut Context, a: &Value, b: &Value, axis: i64) -> Result<Value> {
    let promoted_a;
    let promoted_b;
    let (a_arr, b_arr): (&Array, &Array) = match (a.as_array(), b.as_array()) {
        (None, None) => return Ok(Value::vector(vec![a.clone(), b.clone()])),
        (Some(x), Some(y)) => (x, y),
        (Some(x), None) => {
            promoted_b = promote_for_catenate(b, &x.shape, axis)?;
            (x, &promoted_b)
        }
        (None, Some(y)) => {
            promoted_a = promote_for_catenate(a, &y.shape, axis)?;
            (&promoted_a, y)
        }
    };

    let rank = a_arr.rank();
    if rank != b_arr.rank() {
        return Err(Error::Shape(format!(
            "catenate wants equal ranks: {:?} vs {:?}",
            a_arr.shape, b_arr.shape
        )));
    }
    let ax = normalize_axis(axis, rank)?;
    let mut out_dims = Vec::with_capacity(rank);
    for i in 0..rank {
        if i == ax {
            out_dims.push(a_arr.shape[i] + b_arr.shape[i]);
        } else {
            if a_arr.shape[i] != b_arr.shape[i] {
                return Err(Error::Shape(format!(
                    "catenate on axis {ax} wants matching shapes elsewhere: {:?} vs {:?}",
                    a_arr.shape, b_arr.shape
                )));
            }
            out_dims.push(a_arr.shape[i]);
        }
    }

    let mut out = vec![Value::zero(); product(&out_dims)];
    let mut idx = vec![0usize; rank];
    for flat in 0..a_arr.data.len() {
        unravel(flat, &a_arr.shape, &mut idx);
        out[offset(&idx, &out_dims)] = a_arr.data[flat].clone();
    }
    for flat in 0..b_arr.data.len() {
        unravel(flat, &b_arr.shape, &mut idx);
        idx[ax] += a_arr.shape[ax];
        out[offset(&idx, &out_dims)] = b_arr.data[flat].clone();
    }
    Ok(Value::array(out, out_dims))
}

fn promote_for_catenate(scalar: &Value, other_dims: &[usize], axis: i64) -> Result<Array> {
    let ax = normalize_axis(axis, other_dims.len())?;
    let mut dims = other_dims.to_vec();
    dims[ax] = 1;
    let n = product(&dims);
    Array::new(vec![scalar.clone(); n], dims)
}

/// `A laminate[axis] B`: join along a new axis of length 2 inserted at any
/// position from 0 to rank inclusive. Both sides must have identical shape.
fn dyadic_laminate(_ctx: &mut Context, a: &Value, b: &Value, axis: i64) -> Result<Value> {
    let x = a
        .as_array()
        .ok_or_else(|| Error::Type(format!("laminate wants an array on the left, got {a}")))?;
    let y = b
        .as_array()
        .ok_or_else(|| Error::Type(format!("laminate wants an array on the right, got {b}")))?;
    if x.shape != y.shape {
        return Err(Error::Shape(format!(
            "laminate wants identical shapes: {:?} vs {:?}",
            x.shape, y.shape
        )));
    }
    let rank = x.rank();
    // The new axis may sit at any of rank+1 positions; -1 means after the
    // current last axis.
    let ax = normalize_axis(axis, rank + 1)?;
    let mut out_dims = x.shape.clone();
    out_dims.insert(ax, 2);

    let mut out = vec![Value::zero(); product(&out_dims)];
    let mut idx = vec![0usize; rank];
    for flat in 0..x.data.len() {
        unravel(flat, &x.shape, &mut idx);
        let mut out_idx = idx.clone();
        out_idx.insert(ax, 0);
        out[offset(&out_idx, &out_dims)] = x.data[flat].clone();
        out_idx[ax] = 1;
        out[offset(&out_idx, &out_dims)] = y.data[flat].clone();
    }
    Ok(Value::array(out, out_dims))
}

// ── Compress and expand ─────────────────────────────────────────────────

/// `A / B` (compress) keeps the positions of B's axis where A is 1; the
/// left length must match the axis. `A \ B` (expand) inserts zero-cells
/// where A is 0, and the number of 1s must match the axis length.
fn compress_or_expand(
    _ctx: &mut Context,
    a: &Value,
    b: &Value,
    axis: i64,
    compressing: bool,
) -> Result<Value> {
    let name = if compressing { "compress" } else { "expand" };
    let arr = b
        .as_array()
        .ok_or_else(|| Error::Type(format!("{name} wants an array on the right, got {b}")))?;
    let rank = arr.rank();
    if rank == 0 {
        return Err(Error::Shape(format!("{name} wants rank >= 1")));
    }
    let ax = normalize_axis(axis, rank)?;
    let axis_len = arr.shape[ax];
    let spec = a.int_vector()?;

    // Map each output position along the axis to its source position, or to
    // None for an inserted zero-cell.
    let mut map: Vec<Option<usize>> = Vec::with_capacity(spec.len());
    let mut src_pos = 0usize;
    for &s in &spec {
        match s {
            0 => {
                if compressing {
                    src_pos += 1;
                } else {
                    map.push(None);
                }
            }
            1 => {
                if src_pos == axis_len {
                    return Err(Error::Shape(format!(
                        "{name} left argument {spec:?} is too wide for axis length {axis_len}"
                    )));
                }
                map.push(Some(src_pos));
                src_pos += 1;
            }
            other => {
                return Err(Error::Domain(format!(
                    "{name} wants a boolean left argument, found {other}"
                )));
            }
        }
    }
    if src_pos != axis_len {
        return Err(Error::Shape(if compressing {
            format!("compress left length {} does not match axis length {axis_len}", spec.len())
        } else {
            format!("expand wants exactly {axis_len} ones, got {src_pos}")
        }));
    }

    let mut out_dims = arr.shape.clone();
    out_dims[ax] = map.len();
    let total = product(&out_dims);
    let mut out = Vec::with_capacity(total);
    let mut idx = vec![0usize; rank];
    for flat in 0..total {
        unravel(flat, &out_dims, &mut idx);
        match map[idx[ax]] {
            None => out.push(Value::zero()),
            Some(sp) => {
                let mut src = idx.clone();
                src[ax] = sp;
                out.push(arr.data[offset(&src, &arr.shape)].clone());
            }
        }
    }
    Ok(Value::array(out, out_dims))
}

// ── Transpose ───────────────────────────────────────────────────────────

/// `A transpose B`: `A[k]` names the destination axis of source axis `k`.
/// Repeated destinations extract a generalised diagonal: the output stride
/// for that axis is the sum of the contributing input strides, and its
/// length the shortest contributing axis.
fn dyadic_transpose(_ctx: &mut Context, a: &Value, b: &Value, _axis: i64) -> Result<Value> {
    let arr = b
        .as_array()
        .ok_or_else(|| Error::Type(format!("transpose wants an array on the right, got {b}")))?;
    let rank = arr.rank();
    let raw = a.int_vector()?;
    if raw.len() != rank {
        return Err(Error::Shape(format!(
            "transpose wants the left length {} to match rank {rank}",
            raw.len()
        )));
    }
    if rank == 0 {
        return Ok(b.clone());
    }
    let mut spec = Vec::with_capacity(rank);
    for &e in &raw {
        spec.push(mod_positive(e, rank)?);
    }
    transpose_spec(&spec, arr)
}

pub(crate) fn transpose_spec(spec: &[usize], arr: &Array) -> Result<Value> {
    let in_dims = &arr.shape;
    let out_rank = spec.iter().max().map_or(0, |&m| m + 1);
    let mut out_dims = vec![usize::MAX; out_rank];
    let mut stride = vec![0usize; out_rank];
    for (i, &e) in spec.iter().enumerate() {
        out_dims[e] = out_dims[e].min(in_dims[i]);
        stride[e] += stride_after(in_dims, i);
    }
    if out_dims.contains(&usize::MAX) {
        return Err(Error::Domain(format!(
            "transpose left argument {spec:?} does not name every result axis"
        )));
    }

    let total = product(&out_dims);
    let mut out = Vec::with_capacity(total);
    let mut idx = vec![0usize; out_rank];
    for flat in 0..total {
        unravel(flat, &out_dims, &mut idx);
        let mut in_off = 0;
        for (e, &v) in idx.iter().enumerate() {
            in_off += v * stride[e];
        }
        out.push(arr.data[in_off].clone());
    }
    Ok(Value::array(out, out_dims))
}

// ── Membership ──────────────────────────────────────────────────────────

/// `A member B`: for each scalar of A, whether it occurs among B's scalars.
/// B's ravel is sorted once and each A cell binary-searched.
fn dyadic_member(_ctx: &mut Context, a: &Value, b: &Value, _axis: i64) -> Result<Value> {
    let mut haystack: Vec<f64> = b
        .ravel()
        .iter()
        .map(|v| v.as_float())
        .collect::<Result<_>>()?;
    haystack.sort_by(f64::total_cmp);

    let found = |x: f64| -> bool {
        match haystack.binary_search_by(|p| p.total_cmp(&x)) {
            Ok(_) => true,
            // total_cmp distinguishes -0.0 from 0.0; check the insertion
            // point's neighbours with plain equality.
            Err(i) => {
                (i < haystack.len() && haystack[i] == x) || (i > 0 && haystack[i - 1] == x)
            }
        }
    };

    match a.as_array() {
        Some(arr) => {
            let mut out = Vec::with_capacity(arr.data.len());
            for cell in &arr.data {
                out.push(Value::from_bool(found(cell.as_float()?)));
            }
            Ok(Value::array(out, arr.shape.clone()))
        }
        None => Ok(Value::from_bool(found(a.as_float()?))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, a: Value, b: Value) -> Result<Value> {
        call_axis(name, a, b, DEFAULT_AXIS)
    }

    fn call_axis(name: &str, a: Value, b: Value, axis: i64) -> Result<Value> {
        let mut c = Context::new();
        let f = c.dyadic(name).unwrap();
        f(&mut c, &a, &b, axis)
    }

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

    #[test]
    fn addition_broadcasts_scalars() {
        assert_eq!(
            call("+", Value::num(3.0), num_vec(&[0.0, 1.0, 2.0, 3.0])).unwrap(),
            num_vec(&[3.0, 4.0, 5.0, 6.0])
        );
        assert_eq!(
            call("+", num_vec(&[1.0, 2.0]), num_vec(&[10.0, 20.0])).unwrap(),
            num_vec(&[11.0, 22.0])
        );
    }

    #[test]
    fn mismatched_shapes_are_a_shape_error() {
        assert!(matches!(
            call("+", num_vec(&[1.0, 2.0]), num_vec(&[1.0, 2.0, 3.0])),
            Err(Error::Shape(_))
        ));
    }

    #[test]
    fn zero_to_the_zero_is_one() {
        assert_eq!(
            call("**", Value::num(0.0), Value::num(0.0)).unwrap(),
            Value::num(1.0)
        );
        assert_eq!(
            call("**", Value::num(2.0), Value::num(10.0))
                .unwrap()
                .as_float()
                .unwrap()
                .round(),
            1024.0
        );
    }

    #[test]
    fn boolean_connectives_reject_non_booleans() {
        assert_eq!(
            call("and", Value::num(1.0), Value::num(0.0)).unwrap(),
            Value::num(0.0)
        );
        assert!(matches!(
            call("and", Value::num(2.0), Value::num(1.0)),
            Err(Error::Domain(_))
        ));
    }

    #[test]
    fn reshape_cycles_the_ravel() {
        let r = call("rho", num_vec(&[3.0, 3.0]), iota_arr(&[4])).unwrap();
        assert_eq!(r.shape(), &[3, 3]);
        assert_eq!(ints(&r), vec![0, 1, 2, 3, 0, 1, 2, 3, 0]);
    }

    #[test]
    fn reshape_of_empty_source_is_an_error() {
        assert!(matches!(
            call("rho", num_vec(&[2.0]), Value::empty_vector()),
            Err(Error::Shape(_))
        ));
        // A zero-cell target from an empty source is fine.
        let r = call("rho", num_vec(&[0.0]), Value::empty_vector()).unwrap();
        assert_eq!(r.shape(), &[0]);
    }

    #[test]
    fn reshape_with_empty_spec_takes_the_first_cell() {
        assert_eq!(
            call("rho", Value::empty_vector(), iota_arr(&[4])).unwrap(),
            Value::int(0)
        );
    }

    #[test]
    fn rotate_shifts_cyclically() {
        assert_eq!(
            ints(&call("rot", Value::num(1.0), iota_arr(&[3])).unwrap()),
            vec![1, 2, 0]
        );
        assert_eq!(
            ints(&call("rot", Value::num(-1.0), iota_arr(&[3])).unwrap()),
            vec![2, 0, 1]
        );
    }

    #[test]
    fn rotate_with_per_slice_amounts() {
        // Shape [2,3], rotate rows by 0 and 1 respectively.
        let r = call("rot", num_vec(&[0.0, 1.0]), iota_arr(&[2, 3])).unwrap();
        assert_eq!(ints(&r), vec![0, 1, 2, 4, 5, 3]);
        // Wrong spec shape.
        assert!(matches!(
            call("rot", num_vec(&[0.0, 1.0, 2.0]), iota_arr(&[2, 3])),
            Err(Error::Shape(_))
        ));
    }

    #[test]
    fn double_rotation_composes() {
        let v = iota_arr(&[5]);
        let once = call("rot", Value::num(2.0), call("rot", Value::num(2.0), v.clone()).unwrap())
            .unwrap();
        let twice = call("rot", Value::num(4.0), v).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn take_keeps_and_pads() {
        assert_eq!(
            ints(&call("take", num_vec(&[2.0]), iota_arr(&[5])).unwrap()),
            vec![0, 1]
        );
        assert_eq!(
            ints(&call("take", num_vec(&[-2.0]), iota_arr(&[5])).unwrap()),
            vec![3, 4]
        );
        // Over-reach pads with zeros: at the back for positive counts, at
        // the front for negative ones.
        assert_eq!(
            ints(&call("take", num_vec(&[7.0]), iota_arr(&[5])).unwrap()),
            vec![0, 1, 2, 3, 4, 0, 0]
        );
        assert_eq!(
            ints(&call("take", num_vec(&[-7.0]), iota_arr(&[5])).unwrap()),
            vec![0, 0, 0, 1, 2, 3, 4]
        );
    }

    #[test]
    fn drop_clamps_and_errors_on_overreach() {
        assert_eq!(
            ints(&call("drop", num_vec(&[2.0]), iota_arr(&[5])).unwrap()),
            vec![2, 3, 4]
        );
        assert_eq!(
            ints(&call("drop", num_vec(&[-2.0]), iota_arr(&[5])).unwrap()),
            vec![0, 1, 2]
        );
        assert!(matches!(
            call("drop", num_vec(&[6.0]), iota_arr(&[5])),
            Err(Error::Shape(_))
        ));
    }

    #[test]
    fn take_on_a_matrix() {
        let r = call("take", num_vec(&[1.0, 2.0]), iota_arr(&[3, 3])).unwrap();
        assert_eq!(r.shape(), &[1, 2]);
        assert_eq!(ints(&r), vec![0, 1]);
    }

    #[test]
    fn catenate_joins_on_the_last_axis() {
        let r = call(",", iota_arr(&[2, 2]), iota_arr(&[2, 2])).unwrap();
        assert_eq!(r.shape(), &[2, 4]);
        assert_eq!(ints(&r), vec![0, 1, 0, 1, 2, 3, 2, 3]);
    }

    #[test]
    fn catenate_on_axis_zero() {
        let r = call_axis(",", iota_arr(&[2, 2]), iota_arr(&[2, 2]), 0).unwrap();
        assert_eq!(r.shape(), &[4, 2]);
        assert_eq!(ints(&r), vec![0, 1, 2, 3, 0, 1, 2, 3]);
    }

    #[test]
    fn catenate_promotes_scalars() {
        assert_eq!(
            ints(&call(",", Value::num(9.0), iota_arr(&[3])).unwrap()),
            vec![9, 0, 1, 2]
        );
        assert_eq!(
            ints(&call(",", Value::num(1.0), Value::num(2.0)).unwrap()),
            vec![1, 2]
        );
        let m = call(",", iota_arr(&[2, 2]), Value::num(7.0)).unwrap();
        assert_eq!(m.shape(), &[2, 3]);
        assert_eq!(ints(&m), vec![0, 1, 7, 2, 3, 7]);
    }

    #[test]
    fn laminate_introduces_a_length_two_axis() {
        let a = iota_arr(&[3]);
        let b = call("+", Value::num(10.0), iota_arr(&[3])).unwrap();
        let front = call_axis("laminate", a.clone(), b.clone(), 0).unwrap();
        assert_eq!(front.shape(), &[2, 3]);
        assert_eq!(ints(&front), vec![0, 1, 2, 10, 11, 12]);
        let back = call_axis("laminate", a, b, 1).unwrap();
        assert_eq!(back.shape(), &[3, 2]);
        assert_eq!(ints(&back), vec![0, 10, 1, 11, 2, 12]);
    }

    #[test]
    fn compress_selects_marked_positions() {
        let r = call("/", num_vec(&[1.0, 0.0, 1.0, 0.0, 1.0]), iota_arr(&[5])).unwrap();
        assert_eq!(ints(&r), vec![0, 2, 4]);
        assert!(matches!(
            call("/", num_vec(&[1.0, 0.0]), iota_arr(&[5])),
            Err(Error::Shape(_))
        ));
        assert!(matches!(
            call("/", num_vec(&[1.0, 2.0, 1.0, 1.0, 1.0]), iota_arr(&[5])),
            Err(Error::Domain(_))
        ));
    }

    #[test]
    fn expand_inserts_zero_cells() {
        let r = call("\\", num_vec(&[1.0, 0.0, 1.0, 0.0, 1.0]), iota_arr(&[3])).unwrap();
        assert_eq!(ints(&r), vec![0, 0, 1, 0, 2]);
        assert!(matches!(
            call("\\", num_vec(&[1.0, 0.0]), iota_arr(&[3])),
            Err(Error::Shape(_))
        ));
    }

    #[test]
    fn compress_on_an_earlier_axis() {
        let r = call_axis("/", num_vec(&[0.0, 1.0, 0.0]), iota_arr(&[3, 2]), 0).unwrap();
        assert_eq!(r.shape(), &[1, 2]);
        assert_eq!(ints(&r), vec![2, 3]);
    }

    #[test]
    fn transpose_permutes_axes() {
        let r = call("transpose", num_vec(&[1.0, 0.0]), iota_arr(&[2, 3])).unwrap();
        assert_eq!(r.shape(), &[3, 2]);
        assert_eq!(ints(&r), vec![0, 3, 1, 4, 2, 5]);
    }

    #[test]
    fn transpose_twice_with_a_swap_is_identity() {
        let m = iota_arr(&[2, 3]);
        let once = call("transpose", num_vec(&[1.0, 0.0]), m.clone()).unwrap();
        let twice = call("transpose", num_vec(&[1.0, 0.0]), once).unwrap();
        assert_eq!(twice, m);
    }

    #[test]
    fn repeated_transpose_entries_take_the_diagonal() {
        let r = call("transpose", num_vec(&[0.0, 0.0]), iota_arr(&[3, 3])).unwrap();
        assert_eq!(r.shape(), &[3]);
        assert_eq!(ints(&r), vec![0, 4, 8]);
    }

    #[test]
    fn member_finds_scalars() {
        let r = call(
            "member",
            num_vec(&[1.0, 5.0, 9.0]),
            num_vec(&[9.0, 2.0, 1.0]),
        )
        .unwrap();
        assert_eq!(ints(&r), vec![1, 0, 1]);
        assert_eq!(
            call("member", Value::num(2.0), num_vec(&[9.0, 2.0, 1.0])).unwrap(),
            Value::num(1.0)
        );
    }

    #[test]
    fn min_and_max_are_cellwise() {
        assert_eq!(
            ints(&call("min", num_vec(&[1.0, 5.0]), num_vec(&[3.0, 2.0])).unwrap()),
            vec![1, 2]
        );
        assert_eq!(
            ints(&call("max", num_vec(&[1.0, 5.0]), num_vec(&[3.0, 2.0])).unwrap()),
            vec![3, 5]
        );
    }

    #[test]
    fn mod_follows_the_dividend_sign() {
        assert_eq!(
            call("mod", Value::num(7.0), Value::num(3.0)).unwrap(),
            Value::num(1.0)
        );
        assert_eq!(
            call("mod", Value::num(-7.0), Value::num(3.0)).unwrap(),
            Value::num(-1.0)
        );
    }
}
