//! AST evaluator.
//!
//! Evaluation returns a `Flow`, a sum over a produced value and the loop
//! control escapes, so BREAK and CONTINUE travel as ordinary results rather
//! than through unwinding. `WHILE` pattern-matches on the flow; an escape
//! that reaches anywhere else is a user error. This keeps user-operator
//! frame restoration a straight-line concern: the save/restore bracket in
//! [`call_user_op`] runs on every exit path, errors included.
//!
//! Within a dyadic application the right side evaluates first, then the
//! axis, then the left side, matching the language's right-to-left reading.

use std::rc::Rc;

use livy_core::shape::{offset, product, unravel};
use livy_core::{Error, Result, Value};
use livy_lang::{parse_line, tokenize, AssignTarget, DefNode, Expr, OpSpec};

use crate::context::{Context, DyadicFn, MonadicFn, DEFAULT_AXIS};
use crate::operators;

/// Cap on user-operator nesting, to surface runaway recursion as an error
/// instead of exhausting the host stack.
const MAX_CALL_DEPTH: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Value(Value),
    Break,
    Continue,
}

/// Lex, parse, and evaluate one source line, yielding the final value.
pub fn run_line(ctx: &mut Context, source: &str) -> Result<Value> {
    let tokens = tokenize(source)?;
    let ast = parse_line(&tokens)?;
    eval_value(ctx, &ast)
}

/// Evaluate to a value; a BREAK or CONTINUE escaping every loop is an error.
pub fn eval_value(ctx: &mut Context, expr: &Expr) -> Result<Value> {
    match eval(ctx, expr)? {
        Flow::Value(v) => Ok(v),
        Flow::Break => Err(Error::User("BREAK outside of a loop".into())),
        Flow::Continue => Err(Error::User("CONTINUE outside of a loop".into())),
    }
}

pub fn eval(ctx: &mut Context, expr: &Expr) -> Result<Flow> {
    match expr {
        Expr::Number(c) => Ok(Flow::Value(Value::Num(*c))),
        Expr::Str(s) => {
            let handler = ctx.string_handler.clone().ok_or_else(|| {
                Error::Type("no string handler installed; string literals are not supported".into())
            })?;
            Ok(Flow::Value(handler(ctx, s)?))
        }
        Expr::Variable(name) => {
            let v = ctx
                .globals
                .get(name)
                .cloned()
                .ok_or_else(|| Error::Name(format!("no such variable: {name}")))?;
            Ok(Flow::Value(v))
        }
        Expr::List(items) => {
            let mut cells = Vec::with_capacity(items.len());
            for item in items {
                cells.push(eval_value(ctx, item)?);
            }
            Ok(Flow::Value(Value::vector(cells)))
        }
        Expr::Seq(items) => {
            let mut last = Value::empty_vector();
            for item in items {
                match eval(ctx, item)? {
                    Flow::Value(v) => last = v,
                    escape => return Ok(escape),
                }
            }
            Ok(Flow::Value(last))
        }
        Expr::Monad { op, axis, b, .. } => {
            let f = resolve_monadic(ctx, op)?;
            let bv = eval_value(ctx, b)?;
            let ax = eval_axis(ctx, axis)?;
            Ok(Flow::Value(f(ctx, &bv, ax)?))
        }
        Expr::Dyad { a, op, axis, b, .. } => {
            let f = resolve_dyadic(ctx, op)?;
            let bv = eval_value(ctx, b)?;
            let ax = eval_axis(ctx, axis)?;
            let av = eval_value(ctx, a)?;
            Ok(Flow::Value(f(ctx, &av, &bv, ax)?))
        }
        Expr::Assign { target, value } => {
            let v = eval_value(ctx, value)?;
            match target {
                AssignTarget::Variable(name) => {
                    ctx.globals.insert(name.clone(), v.clone());
                }
                AssignTarget::Subscript { name, subs } => {
                    assign_subscript(ctx, name, subs, &v)?;
                }
            }
            Ok(Flow::Value(v))
        }
        Expr::Subscript { array, subs } => {
            let base = eval_value(ctx, array)?;
            Ok(Flow::Value(eval_subscript(ctx, &base, subs)?))
        }
        Expr::If {
            cond,
            then_seq,
            else_seq,
        } => {
            if eval_value(ctx, cond)?.as_bool()? {
                eval(ctx, then_seq)
            } else {
                match else_seq {
                    Some(seq) => eval(ctx, seq),
                    None => Ok(Flow::Value(Value::empty_vector())),
                }
            }
        }
        Expr::While { guard, body } => {
            let mut collected = Vec::new();
            while eval_value(ctx, guard)?.as_bool()? {
                match eval(ctx, body)? {
                    Flow::Value(v) => collected.push(v),
                    Flow::Break => break,
                    Flow::Continue => continue,
                }
            }
            Ok(Flow::Value(Value::vector(collected)))
        }
        Expr::Break => Ok(Flow::Break),
        Expr::Continue => Ok(Flow::Continue),
        Expr::Def(def) => {
            install_user_op(ctx, def);
            Ok(Flow::Value(Value::boxed_text("def")))
        }
    }
}

fn eval_axis(ctx: &mut Context, axis: &Option<Box<Expr>>) -> Result<i64> {
    match axis {
        Some(expr) => eval_value(ctx, expr)?.as_int(),
        None => Ok(DEFAULT_AXIS),
    }
}

// ── Operator resolution ─────────────────────────────────────────────────

/// Resolve the operator position of a monadic application. Combinator
/// tokens synthesise their derived primitive at call time, so they pick up
/// user-defined operators installed after parse.
fn resolve_monadic(ctx: &Context, op: &OpSpec) -> Result<MonadicFn> {
    match op {
        OpSpec::Plain(name) => ctx.monadic(name),
        OpSpec::Reduce(inner) => Ok(operators::reduce_or_scan(
            ctx.dyadic(inner)?,
            operators::identity_of(inner),
            false,
        )),
        OpSpec::Scan(inner) => Ok(operators::reduce_or_scan(
            ctx.dyadic(inner)?,
            operators::identity_of(inner),
            true,
        )),
        OpSpec::Each(inner) => Ok(operators::each_monadic(ctx.monadic(inner)?)),
        OpSpec::Inner(_, _) | OpSpec::Outer(_) => Err(Error::Type(format!(
            "{} needs a left argument",
            op.name()
        ))),
    }
}

fn resolve_dyadic(ctx: &Context, op: &OpSpec) -> Result<DyadicFn> {
    match op {
        OpSpec::Plain(name) => ctx.dyadic(name),
        OpSpec::Each(inner) => Ok(operators::each_dyadic(ctx.dyadic(inner)?)),
        OpSpec::Inner(op1, op2) => Ok(operators::inner_product(
            ctx.dyadic(op1)?,
            ctx.dyadic(op2)?,
        )),
        OpSpec::Outer(inner) => Ok(operators::outer_product(ctx.dyadic(inner)?)),
        OpSpec::Reduce(_) | OpSpec::Scan(_) => Err(Error::Type(format!(
            "{} takes no left argument",
            op.name()
        ))),
    }
}

// ── Subscripting ────────────────────────────────────────────────────────

/// Evaluate the per-axis index lists: an absent subscript selects the whole
/// axis, and every index must fall inside its axis.
fn subscript_lists(
    ctx: &mut Context,
    dims: &[usize],
    subs: &[Option<Expr>],
) -> Result<Vec<Vec<usize>>> {
    if subs.len() != dims.len() {
        return Err(Error::Shape(format!(
            "{} subscripts do not match rank {}",
            subs.len(),
            dims.len()
        )));
    }
    let mut lists = Vec::with_capacity(subs.len());
    for (i, sub) in subs.iter().enumerate() {
        match sub {
            None => lists.push((0..dims[i]).collect()),
            Some(expr) => {
                let picked = eval_value(ctx, expr)?.int_vector()?;
                let mut axis_list = Vec::with_capacity(picked.len());
                for s in picked {
                    if s < 0 || s as usize >= dims[i] {
                        return Err(Error::Domain(format!(
                            "subscript {s} out of range for axis {i} of length {}",
                            dims[i]
                        )));
                    }
                    axis_list.push(s as usize);
                }
                lists.push(axis_list);
            }
        }
    }
    Ok(lists)
}

fn eval_subscript(ctx: &mut Context, base: &Value, subs: &[Option<Expr>]) -> Result<Value> {
    let arr = base
        .as_array()
        .ok_or_else(|| Error::Type(format!("cannot subscript a non-array: {base}")))?;
    let lists = subscript_lists(ctx, &arr.shape, subs)?;
    let out_dims: Vec<usize> = lists.iter().map(|l| l.len()).collect();
    let total = product(&out_dims);
    let mut out = Vec::with_capacity(total);
    let mut idx = vec![0usize; out_dims.len()];
    let mut src = vec![0usize; out_dims.len()];
    for flat in 0..total {
        unravel(flat, &out_dims, &mut idx);
        for (i, &v) in idx.iter().enumerate() {
            src[i] = lists[i][v];
        }
        out.push(arr.data[offset(&src, &arr.shape)].clone());
    }
    Ok(Value::array(out, out_dims))
}

/// Subscripted assignment scatter-writes into a fresh copy of the array's
/// buffer, so any other name still bound to the old value is untouched.
fn assign_subscript(
    ctx: &mut Context,
    name: &str,
    subs: &[Option<Expr>],
    value: &Value,
) -> Result<()> {
    let old = ctx
        .globals
        .get(name)
        .cloned()
        .ok_or_else(|| Error::Name(format!("no such variable: {name}")))?;
    let arr = old
        .as_array()
        .ok_or_else(|| Error::Type(format!("cannot subscript-assign a non-array: {name}")))?;
    let lists = subscript_lists(ctx, &arr.shape, subs)?;
    let sel_dims: Vec<usize> = lists.iter().map(|l| l.len()).collect();
    let selected = product(&sel_dims);

    let cells: Vec<Value> = match value.as_scalar() {
        Some(scalar) => vec![scalar; selected],
        None => {
            let ravel = value.ravel();
            if ravel.len() != selected {
                return Err(Error::Shape(format!(
                    "cannot scatter {} cells into {selected} selected positions",
                    ravel.len()
                )));
            }
            ravel
        }
    };

    let mut data = arr.data.clone();
    let mut idx = vec![0usize; sel_dims.len()];
    let mut dst = vec![0usize; sel_dims.len()];
    for (flat, cell) in cells.into_iter().enumerate() {
        unravel(flat, &sel_dims, &mut idx);
        for (i, &v) in idx.iter().enumerate() {
            dst[i] = lists[i][v];
        }
        data[offset(&dst, &arr.shape)] = cell;
    }
    let shape = arr.shape.clone();
    ctx.globals.insert(name.to_string(), Value::array(data, shape));
    Ok(())
}

// ── User-defined operators ──────────────────────────────────────────────

fn install_user_op(ctx: &mut Context, def: &Rc<DefNode>) {
    if def.lhs.is_some() {
        let d = def.clone();
        let f: DyadicFn = Rc::new(move |ctx, a, b, axis| call_user_op(ctx, &d, Some(a), b, axis));
        ctx.dyadics.insert(def.name.clone(), f);
    } else {
        let d = def.clone();
        let f: MonadicFn = Rc::new(move |ctx, b, axis| call_user_op(ctx, &d, None, b, axis));
        ctx.monadics.insert(def.name.clone(), f);
    }
}

/// Invoke a user-defined operator. All formals and declared locals have
/// their prior global bindings saved on entry and restored on exit —
/// including error exits — with previously-unbound names deleted again.
fn call_user_op(
    ctx: &mut Context,
    def: &Rc<DefNode>,
    a: Option<&Value>,
    b: &Value,
    axis: i64,
) -> Result<Value> {
    if ctx.call_stack.len() >= MAX_CALL_DEPTH {
        return Err(Error::User(format!(
            "call depth exceeded in operator {}",
            def.name
        )));
    }

    let mut saved: Vec<(String, Option<Value>)> = Vec::with_capacity(def.locals.len());
    for local in &def.locals {
        saved.push((
            local.clone(),
            ctx.globals.insert(local.clone(), Value::zero()),
        ));
    }
    ctx.call_stack.push(def.name.clone());

    if let (Some(lhs), Some(av)) = (&def.lhs, a) {
        ctx.globals.insert(lhs.clone(), av.clone());
    }
    if let Some(axis_name) = &def.axis {
        ctx.globals.insert(axis_name.clone(), Value::int(axis));
    }
    ctx.globals.insert(def.rhs.clone(), b.clone());

    let result = match eval(ctx, &def.body) {
        Ok(Flow::Value(v)) => Ok(v),
        Ok(Flow::Break) => Err(Error::User("BREAK outside of a loop".into())),
        Ok(Flow::Continue) => Err(Error::User("CONTINUE outside of a loop".into())),
        Err(e) => Err(e),
    };

    ctx.call_stack.pop();
    for (name, old) in saved.into_iter().rev() {
        match old {
            Some(v) => {
                ctx.globals.insert(name, v);
            }
            None => {
                ctx.globals.remove(&name);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(ctx: &mut Context, src: &str) -> Result<Value> {
        run_line(ctx, src)
    }

    fn ints(v: &Value) -> Vec<i64> {
        v.ravel().iter().map(|x| x.as_int().unwrap()).collect()
    }

    #[test]
    fn rhs_evaluates_before_lhs() {
        // N is assigned in the right operand, then read by the left one.
        let mut c = Context::new();
        let v = run(&mut c, "N + (N = 3)").unwrap();
        assert_eq!(v, Value::num(6.0));
    }

    #[test]
    fn unknown_names_are_name_errors() {
        let mut c = Context::new();
        assert!(matches!(run(&mut c, "Missing"), Err(Error::Name(_))));
        assert!(matches!(run(&mut c, "frobnicate 3"), Err(Error::Name(_))));
    }

    #[test]
    fn conditional_takes_the_marked_branch() {
        let mut c = Context::new();
        assert_eq!(run(&mut c, "if 1 then 10 else 20 fi").unwrap(), Value::num(10.0));
        assert_eq!(run(&mut c, "if 0 then 10 else 20 fi").unwrap(), Value::num(20.0));
        assert!(matches!(
            run(&mut c, "if 2 then 10 else 20 fi"),
            Err(Error::Domain(_))
        ));
    }

    #[test]
    fn while_collects_body_values() {
        let mut c = Context::new();
        let v = run(&mut c, "N = 0; while N < 3 do N = N + 1 done").unwrap();
        assert_eq!(ints(&v), vec![1, 2, 3]);
    }

    #[test]
    fn break_and_continue_control_the_loop() {
        let mut c = Context::new();
        let v = run(
            &mut c,
            "N = 0; while N < 5 do N = N + 1; if N == 3 then break else N fi done",
        )
        .unwrap();
        assert_eq!(ints(&v), vec![1, 2]);
        assert!(matches!(run(&mut c, "break"), Err(Error::User(_))));
    }

    #[test]
    fn string_literals_need_a_handler() {
        let mut c = Context::new();
        assert!(matches!(run(&mut c, "\"hi\""), Err(Error::Type(_))));
        c.string_handler = Some(Rc::new(|_, s| Ok(Value::boxed_text(s))));
        let v = run(&mut c, "\"hi\"").unwrap();
        assert_eq!(v, Value::boxed_text("hi"));
    }

    #[test]
    fn subscript_reads_select_cells() {
        let mut c = Context::new();
        run(&mut c, "A = 3 3 rho iota 10").unwrap();
        let v = run(&mut c, "A[1;1]").unwrap();
        assert_eq!(ints(&v), vec![4]);
        let row = run(&mut c, "A[1;]").unwrap();
        assert_eq!(row.shape(), &[1, 3]);
        assert_eq!(ints(&row), vec![3, 4, 5]);
        assert!(matches!(run(&mut c, "A[3;0]"), Err(Error::Domain(_))));
        assert!(matches!(run(&mut c, "A[1]"), Err(Error::Shape(_))));
    }

    #[test]
    fn user_operator_locals_are_restored_after_errors() {
        let mut c = Context::new();
        run(&mut c, "T = 42").unwrap();
        run(&mut c, "def boom B; T { T = 7; Missing }").unwrap();
        assert!(matches!(run(&mut c, "boom 1"), Err(Error::Name(_))));
        // The shadowed global came back, and the formal is gone.
        assert_eq!(run(&mut c, "T").unwrap(), Value::num(42.0));
        assert!(matches!(run(&mut c, "B"), Err(Error::Name(_))));
    }

    #[test]
    fn runaway_recursion_is_reported() {
        let mut c = Context::new();
        run(&mut c, "def loop B { loop B }").unwrap();
        assert!(matches!(run(&mut c, "loop 1"), Err(Error::User(_))));
    }
}
