//! Line accumulation and meta commands on top of [`Evaluator`].

use cinder_compiler::{EvalError, Evaluation, Evaluator};

/// What the shell should do after a line was fed.
#[derive(Debug)]
pub enum Step {
    /// The chunk is incomplete; read another line.
    More,
    /// The chunk ran. `None` when it produced no value.
    Value(Option<String>),
    /// Output of a meta command.
    Listing(Vec<String>),
    Failed(EvalError),
    Quit,
}

pub struct Repl {
    evaluator: Evaluator,
    pending: String,
}

impl Repl {
    pub fn new(evaluator: Evaluator) -> Self {
        Self {
            evaluator,
            pending: String::new(),
        }
    }

    pub fn prompt(&self) -> &'static str {
        if self.pending.is_empty() {
            "> "
        } else {
            "... "
        }
    }

    /// Feed one input line.
    pub fn feed_line(&mut self, line: &str) -> Step {
        if self.pending.is_empty() {
            if let Some(command) = line.trim().strip_prefix('#') {
                return self.meta(command.trim());
            }
        }
        self.pending.push_str(line);
        self.pending.push('\n');
        self.submit()
    }

    /// Evaluate `chunk` on its own. Incomplete input is an error here.
    pub fn feed_chunk(&mut self, chunk: &str) -> Result<Step, String> {
        self.pending.clear();
        match self.evaluator.evaluate(chunk) {
            Ok(Evaluation::Partial) => Err(format!("incomplete input: {chunk}")),
            Ok(Evaluation::Completed(value)) => Ok(Step::Value(value.map(|v| v.display()))),
            Err(e) => Ok(Step::Failed(e)),
        }
    }

    /// Text still waiting for more input, if any.
    pub fn take_pending(&mut self) -> Option<String> {
        if self.pending.trim().is_empty() {
            self.pending.clear();
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }

    fn submit(&mut self) -> Step {
        match self.evaluator.evaluate(&self.pending) {
            Ok(Evaluation::Partial) => Step::More,
            Ok(Evaluation::Completed(value)) => {
                self.pending.clear();
                Step::Value(value.map(|v| v.display()))
            }
            Err(e) => {
                self.pending.clear();
                Step::Failed(e)
            }
        }
    }

    fn meta(&self, command: &str) -> Step {
        let lines = match command {
            "vars" => self
                .evaluator
                .declared_variables()
                .into_iter()
                .map(|var| match var.display {
                    Ok(display) => format!("{} {} = {display}", var.type_name, var.name),
                    Err(reason) => format!("{} {} {reason}", var.type_name, var.name),
                })
                .collect(),
            "usings" => self.evaluator.active_usings(),
            "types" => self.evaluator.declared_types(),
            "quit" | "exit" => return Step::Quit,
            "help" => HELP.lines().map(str::to_string).collect(),
            other => vec![format!("unknown command '#{other}', try #help")],
        };
        Step::Listing(lines)
    }
}

const HELP: &str = "\
#vars    list persistent variables
#usings  list active using-directives
#types   list declared types
#quit    leave the shell";
