//! Jsonlang - A lazy, JSON-superset configuration language
//!
//! Every JSON document is a valid Jsonlang program. On top of JSON the language
//! adds comments, local bindings, functions, object inheritance with `self` and
//! `super`, comprehensions, imports and a standard library. A program evaluates
//! to a value that is manifested as JSON text.
//!
//! # Architecture
//!
//! ```text
//! jsonlang-config  - Pure configuration data
//! jsonlang-log     - Explicit structured logger
//! jsonlang-core    - Lexer, parser, desugarer, analyzer, lazy VM, formatters (no IO)
//! jsonlang-api     - Evaluation entry points, RunConfig, JsonlangError
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use jsonlang::{evaluate, MemoryImporter, NativeRegistry, RunConfig};
//!
//! let importer = MemoryImporter::new().with("base.jsonlang", "{ replicas: 1 }");
//! let out = evaluate(
//!     "main.jsonlang",
//!     "(import 'base.jsonlang') { replicas: super.replicas + 2 }",
//!     &RunConfig::default(),
//!     &importer,
//!     &NativeRegistry::new(),
//! )?;
//! assert_eq!(out, "{\n   \"replicas\": 3\n}\n");
//! ```

pub use jsonlang_api::*;

// 日志系统
pub use jsonlang_log::{Level, LogConfig, LogRingBuffer, Logger};

/// 创建带日志的运行配置
///
/// 返回的 ring buffer（如果配置了）保存最近的日志记录，可用于诊断。
pub fn run_config_with_logging(
    log: LogConfig,
) -> (RunConfig, Option<std::sync::Arc<LogRingBuffer>>) {
    let (logger, ring) = log.init();
    (RunConfig::default().with_logger(logger), ring)
}
