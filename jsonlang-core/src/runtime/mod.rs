//! Jsonlang 运行时 (Runtime 层)
//!
//! 惰性求值虚拟机。
//!
//! - `Value` / 对象层模型
//! - thunk 与环境帧 arena
//! - VM 执行逻辑、运算符、输出
//! - 标准库
//! - 宿主扩展点（导入回调、原生函数）

// ==================== 核心类型 ====================

pub mod error;
pub mod heap;
pub mod value;

// ==================== 执行 ====================

/// 标准库
pub mod stdlib;

/// VM 实现（包含执行逻辑）
pub mod vm;

// ==================== 宿主扩展点 ====================

pub mod import;
pub mod native;

pub use error::{EvalError, EvalResult, FrameName, RuntimeError, RuntimeErrorKind, TraceFrame};
pub use import::{ImportCallback, ImportedFile, NoImports};
pub use native::{NativeCallback, NativeFunction, NativeRegistry};
pub use value::{ObjectValue, Value};
pub use vm::{ExtValue, Vm, VmOptions};
