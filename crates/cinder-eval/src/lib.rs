//! Cinder runtime.
//!
//! Holds everything compiled code needs at run time: [`Value`]s, type and
//! member metadata shared with the compiler, the bound code tree, the
//! tree-walking [`Interpreter`] and the [`Executor`] that runs a unit on
//! its own thread with cooperative cancellation.

pub mod code;
pub mod error;
pub mod executor;
pub mod interp;
pub mod meta;
pub mod print;
pub mod value;

pub use code::{ArithOp, BinaryOp, BoundExpr, BoundStmt, CmpOp, Code, Intrinsic, NumKind, Place};
pub use error::{ExecError, ExecResult, Fault};
pub use executor::{CancelToken, Executor, ExecutorConfig};
pub use interp::Interpreter;
pub use meta::{
    FieldHandle, FieldSlot, InstanceField, MethodBody, MethodInfo, NativeContext, NativeFn,
    StaticField, Type, TypeInfo, TypeMembers,
};
pub use print::{
    buffer_handler, silent_handler, stderr_handler, stdout_handler, BufferPrintHandler,
    PrintHandlerImpl, SharedPrintHandler,
};
pub use value::{Object, ObjectRef, Value};
