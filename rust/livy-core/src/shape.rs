//! Shape and stride arithmetic shared by every array primitive.
//!
//! Arrays store their cells in row-major order (last axis fastest), so the
//! stride of axis `i` is the product of the dimensions after it. All helpers
//! here operate on plain `&[usize]` shape slices.

use crate::error::{Error, Result};

/// Product of all dimensions. The empty product is 1, so a rank-0 shape has
/// exactly one cell.
pub fn product(dims: &[usize]) -> usize {
    dims.iter().product()
}

/// Row-major stride table: `strides(dims)[i]` is the flat-buffer distance
/// between successive cells along axis `i`.
pub fn strides(dims: &[usize]) -> Vec<usize> {
    if dims.is_empty() {
        return vec![];
    }
    let mut out = vec![1usize; dims.len()];
    for i in (0..dims.len() - 1).rev() {
        out[i] = out[i + 1] * dims[i + 1];
    }
    out
}

/// Stride of axis `i`: the product of `dims[i+1..]`.
pub fn stride_after(dims: &[usize], i: usize) -> usize {
    product(&dims[i + 1..])
}

/// Ravel offset of a multi-index.
pub fn offset(index: &[usize], dims: &[usize]) -> usize {
    debug_assert_eq!(index.len(), dims.len());
    let mut off = 0;
    let mut stride = 1;
    for i in (0..dims.len()).rev() {
        off += index[i] * stride;
        stride *= dims[i];
    }
    off
}

/// Decompose a flat ravel position into a multi-index, writing into `index`.
pub fn unravel(mut flat: usize, dims: &[usize], index: &mut [usize]) {
    debug_assert_eq!(index.len(), dims.len());
    for i in (0..dims.len()).rev() {
        if dims[i] > 0 {
            index[i] = flat % dims[i];
            flat /= dims[i];
        } else {
            index[i] = 0;
        }
    }
}

/// Remainder forced non-negative, used whenever an axis index wraps
/// (rotate, transpose).
pub fn mod_positive(n: i64, m: usize) -> Result<usize> {
    if m == 0 {
        return Err(Error::Domain("modulus must be positive".into()));
    }
    let m = m as i64;
    Ok((((n % m) + m) % m) as usize)
}

/// Resolve an axis argument against a rank. The sentinel `-1` (an absent
/// axis) selects the last axis; other negative values wrap once from the
/// end. Anything out of range is a shape error.
pub fn normalize_axis(axis: i64, rank: usize) -> Result<usize> {
    let r = rank as i64;
    let ax = if axis < 0 { axis + r } else { axis };
    if ax < 0 || ax >= r {
        return Err(Error::Shape(format!(
            "axis {axis} out of range for rank {rank}"
        )));
    }
    Ok(ax as usize)
}
