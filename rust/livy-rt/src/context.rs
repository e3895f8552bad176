//! Per-session interpreter state.
//!
//! The standard primitive catalogues are plain constructor functions; each
//! context clones them at construction, so a user-defined operator installed
//! in one session never leaks into another.

use std::collections::HashMap;
use std::rc::Rc;

use num_complex::Complex64;

use livy_core::{Error, NumberFormat, Result, Value};

use crate::dyadic::standard_dyadics;
use crate::monadic::standard_monadics;

/// Axis sentinel meaning "the last axis".
pub const DEFAULT_AXIS: i64 = -1;

pub type MonadicFn = Rc<dyn Fn(&mut Context, &Value, i64) -> Result<Value>>;
pub type DyadicFn = Rc<dyn Fn(&mut Context, &Value, &Value, i64) -> Result<Value>>;

/// Hook converting a string literal into a value at evaluation time. When no
/// handler is installed, string literals are a type error.
pub type StringHandler = Rc<dyn Fn(&mut Context, &str) -> Result<Value>>;

pub struct Context {
    pub globals: HashMap<String, Value>,
    pub monadics: HashMap<String, MonadicFn>,
    pub dyadics: HashMap<String, DyadicFn>,
    pub format: NumberFormat,
    pub string_handler: Option<StringHandler>,
    /// Names of the user-defined operators currently being evaluated,
    /// innermost last.
    pub(crate) call_stack: Vec<String>,
}

impl Context {
    pub fn new() -> Context {
        let mut globals = HashMap::new();
        globals.insert("Pi".to_string(), Value::num(std::f64::consts::PI));
        globals.insert("Tau".to_string(), Value::num(2.0 * std::f64::consts::PI));
        globals.insert("E".to_string(), Value::num(std::f64::consts::E));
        globals.insert("Phi".to_string(), Value::num((1.0 + 5.0_f64.sqrt()) / 2.0));
        globals.insert("J".to_string(), Value::Num(Complex64::new(0.0, 1.0)));
        Context {
            globals,
            monadics: standard_monadics(),
            dyadics: standard_dyadics(),
            format: NumberFormat::default(),
            string_handler: None,
            call_stack: Vec::new(),
        }
    }

    pub fn monadic(&self, name: &str) -> Result<MonadicFn> {
        self.monadics
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Name(format!("no such monadic operator: {name}")))
    }

    pub fn dyadic(&self, name: &str) -> Result<DyadicFn> {
        self.dyadics
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Name(format!("no such dyadic operator: {name}")))
    }

    /// Handle a `)`-command from the shell: `v` lists globals (skipping `_`
    /// names), `m` and `d` list operator names. Returns the text to print.
    pub fn command(&self, cmd: &str) -> String {
        match cmd.chars().next() {
            Some('v') => {
                let mut names: Vec<&String> = self
                    .globals
                    .keys()
                    .filter(|k| !k.starts_with('_'))
                    .collect();
                names.sort();
                let width = names.iter().map(|n| n.len()).max().unwrap_or(0);
                let mut out = String::new();
                for name in names {
                    let value = &self.globals[name];
                    out.push_str(&format!("{name:>width$} : {value}\n"));
                }
                out
            }
            Some('m') => Self::name_listing(self.monadics.keys()),
            Some('d') => Self::name_listing(self.dyadics.keys()),
            _ => "Commands:  )v[ars]  )m[onadics]  )d[yadics]\n".to_string(),
        }
    }

    fn name_listing<'a>(keys: impl Iterator<Item = &'a String>) -> String {
        let mut names: Vec<&String> = keys.collect();
        names.sort();
        let mut out = names
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        out.push('\n');
        out
    }
}

impl Default for Context {
    fn default() -> Context {
        Context::new()
    }
}
