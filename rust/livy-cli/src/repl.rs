//! The read-eval-print loop.
//!
//! Interactive sessions go through rustyline with tab completion over
//! operator names and a persistent history file; piped input falls back to
//! a plain line reader so the shell works in scripts and tests. Results are
//! stored back into the session as `_0`, `_1`, … with `_` aliasing the most
//! recent one.

use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;

use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Editor, Helper};

use livy_core::{Result, Value};
use livy_lang::{parse_line, tokenize};
use livy_rt::{eval_value, Context};

use crate::Cli;

/// Longest printed form of an offending value in a diagnostic.
const DIAGNOSTIC_LIMIT: usize = 200;

pub fn run(cli: &Cli) -> i32 {
    let mut ctx = Context::new();
    if std::io::stdin().is_terminal() {
        run_interactive(cli, &mut ctx)
    } else {
        run_piped(cli, &mut ctx)
    }
}

fn run_interactive(cli: &Cli, ctx: &mut Context) -> i32 {
    let history_path = match history_path(cli) {
        Ok(p) => p,
        Err(msg) => {
            eprintln!("livy: {msg}");
            return 1;
        }
    };

    let mut rl: Editor<OperatorCompleter, DefaultHistory> = match Editor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("livy: cannot initialise line editor: {e}");
            return 1;
        }
    };
    rl.set_helper(Some(OperatorCompleter::from_context(ctx)));

    if history_path.exists() {
        if let Err(e) = rl.load_history(&history_path) {
            eprintln!("livy: cannot read history {}: {e}", history_path.display());
            return 1;
        }
    }

    if !cli.quiet {
        eprintln!("livy {}", env!("CARGO_PKG_VERSION"));
    }

    let mut counter = 0usize;
    let code = loop {
        match rl.readline(&cli.prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);
                if let Some(code) = handle_line(cli, ctx, line, &mut counter) {
                    break code;
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break 0,
            Err(e) => {
                eprintln!("livy: {e}");
                break 1;
            }
        }
    };

    if let Err(e) = rl.save_history(&history_path) {
        eprintln!(
            "livy: cannot write history {}: {e}",
            history_path.display()
        );
    }
    code
}

fn run_piped(cli: &Cli, ctx: &mut Context) -> i32 {
    let stdin = std::io::stdin();
    let mut counter = 0usize;
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("livy: {e}");
                return 1;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(code) = handle_line(cli, ctx, line, &mut counter) {
            return code;
        }
    }
    0
}

/// Process one input line. Returns `Some(exit_code)` to stop the session.
fn handle_line(cli: &Cli, ctx: &mut Context, line: &str, counter: &mut usize) -> Option<i32> {
    if let Some(cmd) = line.strip_prefix(')') {
        eprint!("{}", ctx.command(cmd.trim()));
        return None;
    }
    match eval_source(ctx, line, cli.verbose) {
        Ok(value) => {
            let name = format!("_{counter}");
            ctx.globals.insert(name.clone(), value.clone());
            ctx.globals.insert("_".to_string(), value.clone());
            *counter += 1;
            let rendered = value.pretty(&ctx.format);
            if cli.raw {
                println!("{rendered}");
            } else {
                println!("{name} = {rendered}");
            }
            let _ = std::io::stdout().flush();
            None
        }
        Err(e) => {
            eprintln!("ERROR: {}: {}", e.kind(), truncate(&e.to_string()));
            if cli.crash {
                Some(1)
            } else {
                None
            }
        }
    }
}

fn eval_source(ctx: &mut Context, source: &str, verbose: bool) -> Result<Value> {
    let tokens = tokenize(source)?;
    if verbose {
        eprintln!("tokens: {tokens:?}");
    }
    let ast = parse_line(&tokens)?;
    if verbose {
        eprintln!("ast: {ast:?}");
    }
    eval_value(ctx, &ast)
}

fn truncate(s: &str) -> String {
    if s.len() <= DIAGNOSTIC_LIMIT {
        return s.to_string();
    }
    let mut end = DIAGNOSTIC_LIMIT;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}

fn history_path(cli: &Cli) -> std::result::Result<PathBuf, String> {
    if let Some(path) = &cli.history {
        return Ok(path.clone());
    }
    dirs::home_dir()
        .map(|home| home.join(".livy-apl.history"))
        .ok_or_else(|| "cannot determine the home directory for the history file".to_string())
}

// ── Tab completion ──────────────────────────────────────────────────────

/// Completes operator names and keywords at the cursor.
struct OperatorCompleter {
    names: Vec<String>,
}

impl OperatorCompleter {
    fn from_context(ctx: &Context) -> OperatorCompleter {
        let mut names: Vec<String> = ctx
            .monadics
            .keys()
            .chain(ctx.dyadics.keys())
            .filter(|n| n.chars().all(|c| c.is_ascii_alphanumeric()))
            .cloned()
            .collect();
        for kw in [
            "def", "if", "then", "elif", "else", "fi", "while", "do", "done", "break",
            "continue",
        ] {
            names.push(kw.to_string());
        }
        names.sort();
        names.dedup();
        OperatorCompleter { names }
    }
}

impl Completer for OperatorCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = line[..pos]
            .rfind(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .map(|i| i + 1)
            .unwrap_or(0);
        let word = &line[start..pos];
        if word.is_empty() {
            return Ok((start, Vec::new()));
        }
        let candidates = self
            .names
            .iter()
            .filter(|n| n.starts_with(word))
            .map(|n| Pair {
                display: n.clone(),
                replacement: n.clone(),
            })
            .collect();
        Ok((start, candidates))
    }
}

impl Hinter for OperatorCompleter {
    type Hint = String;
}

impl Highlighter for OperatorCompleter {}

impl Validator for OperatorCompleter {}

impl Helper for OperatorCompleter {}
