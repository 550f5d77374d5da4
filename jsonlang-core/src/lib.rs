//! Jsonlang Core - Evaluator pipeline (pure logic, no IO)
//!
//! Contains lexer, parser, desugarer, static analyzer, lazy virtual machine,
//! standard library, and the JSON / source formatters.
//! Imports and native functions are resolved through host-supplied callbacks;
//! this crate never touches the file system or the terminal.
//!
//! Configuration is passed explicitly via parameters, not via global state.

pub mod compiler;
pub mod formatter;
pub mod kit;
pub mod runtime;

// Re-export common types
pub use compiler::StaticError;
pub use runtime::value::Value;
pub use runtime::vm::{ExtValue, Vm, VmOptions};
pub use runtime::{
    EvalError, ImportCallback, ImportedFile, NativeRegistry, NoImports, RuntimeError,
    RuntimeErrorKind, TraceFrame,
};

// Re-export config types from jsonlang-config
pub use jsonlang_config::{EvalConfig, FmtConfig, LimitConfig, ManifestConfig, OutputMode, Phase};
