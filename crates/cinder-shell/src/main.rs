//! `cinder`: read chunks, evaluate them against one session, print results.

mod repl;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use cinder_compiler::{EvalError, Evaluator, EvaluatorSettings};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::repl::{Repl, Step};

#[derive(Parser)]
#[command(name = "cinder")]
#[command(about = "Interactive Cinder evaluator", long_about = None)]
struct Cli {
    /// JSON settings file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Evaluate a chunk and exit; may be repeated
    #[arg(short, long = "eval", value_name = "CHUNK")]
    eval: Vec<String>,

    /// Do not print prompts
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("CINDER_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => EvaluatorSettings::from_path(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => EvaluatorSettings::default(),
    };
    debug!(config = ?cli.config, chunks = cli.eval.len(), "starting shell");
    let mut repl = Repl::new(Evaluator::new(settings));

    if cli.eval.is_empty() {
        interactive(&mut repl, cli.quiet)
    } else {
        batch(&mut repl, &cli.eval)
    }
}

fn interactive(repl: &mut Repl, quiet: bool) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();
    loop {
        if !quiet {
            write!(stdout, "{}", repl.prompt())?;
            stdout.flush()?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("reading standard input")?;
        match repl.feed_line(&line) {
            Step::Quit => return Ok(()),
            step => show(&mut stdout, step)?,
        }
    }
    if let Some(rest) = repl.take_pending() {
        eprintln!("discarding incomplete input:\n{}", rest.trim_end());
    }
    Ok(())
}

fn batch(repl: &mut Repl, chunks: &[String]) -> anyhow::Result<()> {
    let mut stdout = io::stdout();
    for chunk in chunks {
        match repl.feed_chunk(chunk) {
            Ok(Step::Failed(e)) => {
                report(&e);
                bail!("evaluation failed");
            }
            Ok(step) => show(&mut stdout, step)?,
            Err(message) => bail!(message),
        }
    }
    Ok(())
}

fn show(out: &mut impl Write, step: Step) -> io::Result<()> {
    match step {
        Step::Value(Some(display)) => writeln!(out, "{display}"),
        Step::Listing(lines) => {
            for line in lines {
                writeln!(out, "{line}")?;
            }
            Ok(())
        }
        Step::Failed(e) => {
            report(&e);
            Ok(())
        }
        Step::More | Step::Value(None) | Step::Quit => Ok(()),
    }
}

fn report(err: &EvalError) {
    match err {
        // Diagnostics were already written by the evaluator.
        EvalError::Syntax(_) | EvalError::Resolution(_) => {}
        other => eprintln!("{other}"),
    }
}
