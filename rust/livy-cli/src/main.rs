//! Interactive shell for the Livy array language.

mod repl;

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "livy",
    version,
    about = "An APL-style array language and interactive interpreter",
    after_help = "\
Examples:
  livy                              Start an interactive session
  echo '3 3 rho iota 10' | livy     Evaluate a piped expression
  livy --raw -q                     Bare results only, no banner

Inside a session, lines starting with ')' are shell commands:
  )v   list global variables        )m   list monadic operators
  )d   list dyadic operators
"
)]
pub struct Cli {
    /// Interpreter prompt
    #[arg(short = 'p', long, default_value = "      ")]
    pub prompt: String,

    /// Suppress the banner and informational messages
    #[arg(short, long)]
    pub quiet: bool,

    /// Print token and AST debugging to stderr
    #[arg(long)]
    pub verbose: bool,

    /// Print bare results without the `_N =` prefix
    #[arg(long)]
    pub raw: bool,

    /// Abort the process on the first evaluation error
    #[arg(long)]
    pub crash: bool,

    /// History file path (default: $HOME/.livy-apl.history)
    #[arg(long)]
    pub history: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    std::process::exit(repl::run(&cli));
}
