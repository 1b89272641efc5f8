//! Runs bound code on a dedicated thread.
//!
//! Each execution gets a freshly spawned, named OS thread with a
//! configured stack size; the caller blocks on `join`. Interruption is
//! cooperative through a [`CancelToken`] the interpreter polls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::code::Code;
use crate::error::{ExecError, ExecResult};
use crate::interp::Interpreter;
use crate::print::SharedPrintHandler;
use crate::value::Value;

/// Cooperative cancellation flag shared with a running interpreter.
#[derive(Debug, Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub stack_size: usize,
    pub thread_name: String,
    pub max_call_depth: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            stack_size: 256 * 1024 * 1024,
            thread_name: "cinder-exec".into(),
            max_call_depth: 1000,
        }
    }
}

pub struct Executor {
    config: ExecutorConfig,
    in_flight: AtomicBool,
    /// Token of the run in flight, if any.
    current: Mutex<Option<Arc<CancelToken>>>,
    /// Serializes executions.
    run_lock: Mutex<()>,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config,
            in_flight: AtomicBool::new(false),
            current: Mutex::new(None),
            run_lock: Mutex::new(()),
        }
    }

    /// Run `code` to completion on the executor thread.
    ///
    /// `Ok(None)` means the unit produced no value; `Ok(Some(Value::Null))`
    /// is an expression that evaluated to null.
    pub fn execute(&self, code: Arc<Code>, print: SharedPrintHandler) -> ExecResult<Option<Value>> {
        let _serial = self.run_lock.lock();
        let token = Arc::new(CancelToken::new());
        *self.current.lock() = Some(Arc::clone(&token));
        self.in_flight.store(true, Ordering::SeqCst);

        let result = self.spawn_and_join(code, print, token);

        self.in_flight.store(false, Ordering::SeqCst);
        *self.current.lock() = None;
        result
    }

    fn spawn_and_join(
        &self,
        code: Arc<Code>,
        print: SharedPrintHandler,
        token: Arc<CancelToken>,
    ) -> ExecResult<Option<Value>> {
        let max_depth = self.config.max_call_depth;
        let spawned = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .stack_size(self.config.stack_size)
            .spawn(move || Interpreter::new(&print, &token, max_depth).run(&code));

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "failed to spawn executor thread");
                return Err(ExecError::Internal(format!("cannot spawn executor thread: {e}")));
            }
        };

        match handle.join() {
            Ok(result) => {
                if let Err(ExecError::Interrupted) = &result {
                    debug!("execution unwound after interrupt");
                }
                result
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(panic = %message, "executor thread panicked");
                Err(ExecError::Internal(format!("executor thread panicked: {message}")))
            }
        }
    }

    /// Request cancellation of the in-flight run.
    ///
    /// Returns `false` when nothing is executing.
    pub fn interrupt(&self) -> bool {
        match self.current.lock().as_ref() {
            Some(token) => {
                warn!("interrupt requested");
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_executing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(ExecutorConfig::default())
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
