//! Cinder interactive evaluation core.
//!
//! Accepts successive chunks of source text, classifies each one, compiles
//! it speculatively against the accumulated program image, commits it on
//! success and runs it on the executor. A failed or incomplete chunk
//! leaves the session exactly as it was.
//!
//! ```no_run
//! use cinder_compiler::{Evaluation, Evaluator, EvaluatorSettings};
//!
//! let evaluator = Evaluator::new(EvaluatorSettings::default());
//! evaluator.evaluate("int z = 5;").unwrap();
//! let result = evaluator.evaluate("z * 2").unwrap();
//! assert!(matches!(result, Evaluation::Completed(Some(_))));
//! ```

pub mod binder;
pub mod compile;
pub mod disambiguate;
pub mod evaluator;
pub mod image;
pub mod registry;
pub mod scope;
pub mod settings;
mod stdlib;
pub mod undo;
pub mod unit;

pub use binder::{BindOutput, Binder, PendingField};
pub use compile::{CompileOutcome, ParseMode, Session, SpeculativeCompiler};
pub use disambiguate::{classify, Classification};
pub use evaluator::{Compilation, EvalError, Evaluation, Evaluator, VariableInfo};
pub use image::{CommitSet, ContainerPath, DeclareError, Entity, ProgramImage, UsingEntry, UsingTarget};
pub use registry::{FieldRegistry, RegisteredField};
pub use settings::{EvaluatorSettings, SettingsError};
pub use undo::{UndoEntry, UndoLog};
pub use unit::{CompiledUnit, UnitKind};
