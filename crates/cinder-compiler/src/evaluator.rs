//! The evaluation facade: compile a chunk under the session lock, then run
//! it on the executor with the lock released.

use std::sync::Arc;
use std::time::Duration;

use cinder_eval::{
    stderr_handler, stdout_handler, ExecError, Executor, ExecutorConfig, Fault, SharedPrintHandler,
    Value,
};
use cinder_types::{CompileErrors, SourceFile};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::compile::{CompileOutcome, ParseMode, Session, SpeculativeCompiler};
use crate::disambiguate::classify;
use crate::image::{CommitSet, Entity, UsingEntry, UsingTarget};
use crate::settings::EvaluatorSettings;
use crate::unit::CompiledUnit;

// ══════════════════════════════════════════════════════════════════════════════
// Outcomes
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// The chunk is incomplete; resubmit it with more text.
    Partial,
    /// The unit ran. `None` means it executed statements with no result.
    Completed(Option<Value>),
}

#[derive(Debug)]
pub enum Compilation {
    Partial,
    Unit(CompiledUnit),
}

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("syntax error: {0}")]
    Syntax(CompileErrors),
    #[error("compilation failed: {0}")]
    Resolution(CompileErrors),
    #[error("execution interrupted")]
    Interrupted,
    #[error(transparent)]
    UserFault(Fault),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ExecError> for EvalError {
    fn from(err: ExecError) -> Self {
        match err {
            ExecError::Fault(fault) => EvalError::UserFault(fault),
            ExecError::Interrupted => EvalError::Interrupted,
            ExecError::Internal(msg) => EvalError::Internal(msg),
        }
    }
}

/// A persistent top-level variable as seen from outside.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableInfo {
    pub name: String,
    pub type_name: String,
    /// Display form of the current value, or why it could not be read.
    pub display: Result<String, String>,
}

// ══════════════════════════════════════════════════════════════════════════════
// Evaluator
// ══════════════════════════════════════════════════════════════════════════════

pub struct Evaluator {
    settings: EvaluatorSettings,
    session: Mutex<Session>,
    executor: Executor,
    print: SharedPrintHandler,
    messages: SharedPrintHandler,
}

impl Evaluator {
    /// Program output to stdout, diagnostics to stderr.
    pub fn new(settings: EvaluatorSettings) -> Self {
        Self::with_handlers(settings, stdout_handler(), stderr_handler())
    }

    pub fn with_handlers(
        settings: EvaluatorSettings,
        print: SharedPrintHandler,
        messages: SharedPrintHandler,
    ) -> Self {
        let executor = Executor::new(ExecutorConfig {
            stack_size: settings.executor_stack_size,
            thread_name: settings.executor_thread_name.clone(),
            max_call_depth: settings.max_call_depth,
        });
        let mut session = Session::new();
        apply_default_usings(&mut session, &settings.default_usings);
        Self {
            settings,
            session: Mutex::new(session),
            executor,
            print,
            messages,
        }
    }

    /// Compile and run one chunk.
    #[tracing::instrument(skip_all, fields(len = text.len()))]
    pub fn evaluate(&self, text: &str) -> Result<Evaluation, EvalError> {
        match self.compile(text)? {
            Compilation::Partial => Ok(Evaluation::Partial),
            Compilation::Unit(unit) => self.run(&unit).map(Evaluation::Completed),
        }
    }

    /// Compile one chunk and commit it to the session without running it.
    ///
    /// The chunk is parsed silently first; it is parsed again with
    /// diagnostics only when it is not merely incomplete.
    #[tracing::instrument(skip_all, fields(len = text.len()))]
    pub fn compile(&self, text: &str) -> Result<Compilation, EvalError> {
        let source = SourceFile::new(self.settings.file_name.as_str(), text);
        let classification = classify(&source);

        let mut session = self.session.lock();
        let mut compiler = SpeculativeCompiler::new(&mut session, &self.messages);
        let outcome = match compiler.compile(&source, classification, ParseMode::Silent) {
            CompileOutcome::Syntax(_) => {
                compiler.compile(&source, classification, ParseMode::ReportErrors)
            }
            other => other,
        };

        match outcome {
            CompileOutcome::Unit(unit) => Ok(Compilation::Unit(unit)),
            CompileOutcome::Partial => Ok(Compilation::Partial),
            CompileOutcome::Syntax(errors) => Err(EvalError::Syntax(errors)),
            CompileOutcome::Resolution(errors) => Err(EvalError::Resolution(errors)),
        }
    }

    /// Run a compiled unit. Units may be run any number of times.
    pub fn run(&self, unit: &CompiledUnit) -> Result<Option<Value>, EvalError> {
        debug!(unit = unit.name(), fingerprint = unit.fingerprint(), "running");
        let result = self
            .executor
            .execute(Arc::clone(unit.code()), Arc::clone(&self.print));
        result.map_err(EvalError::from)
    }

    /// Cancel the running unit, if any.
    pub fn interrupt(&self) -> bool {
        self.executor.interrupt()
    }

    pub fn is_executing(&self) -> bool {
        self.executor.is_executing()
    }

    /// Persistent variables in first-declaration order.
    pub fn declared_variables(&self) -> Vec<VariableInfo> {
        let timeout = Duration::from_millis(self.settings.snapshot_timeout_ms);
        let session = self.session.lock();
        session
            .registry
            .iter()
            .map(|(name, field)| VariableInfo {
                name: name.to_string(),
                type_name: field.ty().to_string(),
                display: field
                    .handle
                    .try_get(timeout)
                    .map(|value| value.display())
                    .ok_or_else(|| "<value unavailable while code is running>".to_string()),
            })
            .collect()
    }

    /// Active using-directives as source text, e.g. `using System;`.
    pub fn active_usings(&self) -> Vec<String> {
        self.session.lock().image.active_usings()
    }

    /// Full names of declared types in declaration order.
    pub fn declared_types(&self) -> Vec<String> {
        self.session.lock().image.declared_types()
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(EvaluatorSettings::default())
    }
}

fn apply_default_usings(session: &mut Session, namespaces: &[String]) {
    let mut usings = Vec::new();
    for name in namespaces {
        let path: Vec<String> = name.split('.').map(str::to_string).collect();
        match session.image.lookup(&path) {
            Some(Entity::Namespace(path)) => usings.push(UsingEntry {
                alias: None,
                target: UsingTarget::Namespace(path),
                target_name: name.clone(),
            }),
            _ => warn!(namespace = %name, "default using is not a namespace, skipped"),
        }
    }
    session.image.commit(CommitSet {
        usings,
        types: Vec::new(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_usings_skip_unknown_namespaces() {
        let settings = EvaluatorSettings {
            default_usings: vec!["System".into(), "Nope".into()],
            ..EvaluatorSettings::default()
        };
        let evaluator = Evaluator::with_handlers(
            settings,
            cinder_eval::silent_handler(),
            cinder_eval::silent_handler(),
        );
        assert_eq!(evaluator.active_usings(), vec!["using System;".to_string()]);
    }

    #[test]
    fn exec_errors_map_onto_eval_errors() {
        assert!(matches!(
            EvalError::from(ExecError::Interrupted),
            EvalError::Interrupted
        ));
        assert!(matches!(
            EvalError::from(ExecError::Fault(Fault::DivideByZero)),
            EvalError::UserFault(Fault::DivideByZero)
        ));
    }
}
