//! Jsonlang API - Evaluation orchestration layer
//!
//! Provides the embedding interface, including:
//! - Evaluation entry points for each output mode
//! - Configuration abstraction (RunConfig)
//! - Unified error handling (JsonlangError)
//!
//! Evaluation runs on a dedicated thread whose stack size comes from
//! `LimitConfig::eval_thread_stack_bytes`, so deep (but bounded) recursion
//! in user programs never exhausts the caller's stack.

use jsonlang_core::{Vm, VmOptions};
use jsonlang_log::{debug, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;

// Re-export config
pub mod config;
pub use config::{default_config, RunConfig};

// Re-export config types from jsonlang_config
pub use jsonlang_config::{
    EvalConfig, FmtConfig, LimitConfig, ManifestConfig, OutputMode, Phase, StringStyle,
};

// Re-export error and types
pub mod error;
pub mod importer;
pub mod types;
pub use error::{ErrorReport, JsonlangError, RuntimeError, StaticError, TraceEntry};
pub use importer::MemoryImporter;
pub use types::EvalOutput;

// Re-export core types
pub use jsonlang_config;
pub use jsonlang_core::runtime::NativeCallback;
pub use jsonlang_core::{
    ExtValue, ImportCallback, ImportedFile, NativeRegistry, NoImports, RuntimeErrorKind, TraceFrame, Value,
};

/// Evaluate a program into a single JSON document
///
/// Honors `string_output` from the manifest configuration.
pub fn evaluate(
    name: &str,
    text: &str,
    config: &RunConfig,
    importer: &dyn ImportCallback,
    natives: &NativeRegistry,
) -> Result<String, JsonlangError> {
    run_pipeline(name, text, config, importer, natives, |vm, value| {
        vm.manifest_regular(value, &config.eval.manifest)
    })
}

/// Evaluate a program whose value is an object of file name -> document
pub fn evaluate_multi(
    name: &str,
    text: &str,
    config: &RunConfig,
    importer: &dyn ImportCallback,
    natives: &NativeRegistry,
) -> Result<BTreeMap<String, String>, JsonlangError> {
    run_pipeline(name, text, config, importer, natives, |vm, value| {
        vm.manifest_multi(value, &config.eval.manifest)
    })
}

/// Evaluate a program whose value is an array of documents
pub fn evaluate_stream(
    name: &str,
    text: &str,
    config: &RunConfig,
    importer: &dyn ImportCallback,
    natives: &NativeRegistry,
) -> Result<Vec<String>, JsonlangError> {
    run_pipeline(name, text, config, importer, natives, |vm, value| {
        vm.manifest_stream(value, &config.eval.manifest)
    })
}

/// Evaluate using the output mode selected in the configuration
pub fn evaluate_with_mode(
    name: &str,
    text: &str,
    config: &RunConfig,
    importer: &dyn ImportCallback,
    natives: &NativeRegistry,
) -> Result<EvalOutput, JsonlangError> {
    match config.eval.manifest.mode {
        OutputMode::Regular => evaluate(name, text, config, importer, natives).map(EvalOutput::Regular),
        OutputMode::Multi => evaluate_multi(name, text, config, importer, natives).map(EvalOutput::Multi),
        OutputMode::Stream => evaluate_stream(name, text, config, importer, natives).map(EvalOutput::Stream),
    }
}

/// Re-print source with normalised layout
///
/// Runs on the same sized thread as evaluation, so deeply nested input is
/// bounded by the parser's nesting limit rather than the caller's stack.
pub fn format_snippet(name: &str, text: &str, config: &FmtConfig) -> Result<String, JsonlangError> {
    let defaults = default_config();
    on_eval_thread(defaults.eval.limits.eval_thread_stack_bytes, || {
        Ok(jsonlang_core::formatter::format_source(name, text, config, &defaults.logger)?)
    })
}

/// Quick evaluation with the default config, no imports and no natives
pub fn quick_evaluate(text: &str) -> Result<String, JsonlangError> {
    evaluate("<snippet>", text, default_config(), &NoImports, &NativeRegistry::new())
}

/// 在专用线程上编译、求值并输出
fn run_pipeline<T: Send>(
    name: &str,
    text: &str,
    config: &RunConfig,
    importer: &dyn ImportCallback,
    natives: &NativeRegistry,
    manifest: impl FnOnce(&Vm<'_>, &Value) -> Result<T, RuntimeError> + Send,
) -> Result<T, JsonlangError> {
    info!(config.logger, "Starting evaluation of {}", name);
    let stack_bytes = config.eval.limits.eval_thread_stack_bytes;
    debug!(config.logger, "Spawning evaluation thread, stack={} bytes", stack_bytes);

    let result = on_eval_thread(stack_bytes, || {
        let vm = Vm::new(vm_options(config, importer, natives));
        let value = vm.evaluate(name, text)?;
        Ok(manifest(&vm, &value)?)
    });

    match &result {
        Ok(_) => info!(config.logger, "Evaluation of {} completed", name),
        Err(e) => warn!(config.logger, "Evaluation of {} failed: {}", name, e.message()),
    }
    result
}

/// 在指定栈大小的线程上运行 `f`，线程内的 panic 原样传回
fn on_eval_thread<T: Send>(
    stack_bytes: usize,
    f: impl FnOnce() -> Result<T, JsonlangError> + Send,
) -> Result<T, JsonlangError> {
    std::thread::scope(|s| {
        let handle = std::thread::Builder::new()
            .name("jsonlang-eval".to_string())
            .stack_size(stack_bytes)
            .spawn_scoped(s, f)
            .map_err(|e| JsonlangError::Host(format!("Failed to spawn evaluation thread: {e}")))?;
        handle
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
    })
}

fn vm_options<'a>(
    config: &RunConfig,
    importer: &'a dyn ImportCallback,
    natives: &'a NativeRegistry,
) -> VmOptions<'a> {
    let mut options = VmOptions::new(importer, natives);
    options.limits = config.eval.limits.clone();
    options.ext_vars = config.ext_vars.clone();
    options.tlas = config.tlas.clone();
    options.logger = Arc::clone(&config.logger);
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonlang_log::LogConfig;
    use serde_json::json;

    fn natives() -> NativeRegistry {
        NativeRegistry::new().with("concat", &["a", "b"], |args| {
            match (args[0].as_str(), args[1].as_str()) {
                (Some(a), Some(b)) => Ok(json!(format!("{a}{b}"))),
                _ => Err("concat expects strings".to_string()),
            }
        })
    }

    #[test]
    fn test_quick_evaluate() {
        let result = quick_evaluate("{ a: 1 + 2 }");
        assert!(result.is_ok(), "Evaluation failed: {:?}", result.err());
        assert_eq!(result.unwrap(), "{\n   \"a\": 3\n}\n");
    }

    #[test]
    fn test_evaluate_with_imports_and_natives() {
        let importer = MemoryImporter::new().with("lib/util.jsonlang", "{ greet(x): std.native('concat')('hi ', x) }");
        let result = evaluate(
            "main.jsonlang",
            "(import 'lib/util.jsonlang').greet('there')",
            &RunConfig::default(),
            &importer,
            &natives(),
        );
        assert_eq!(result, Ok("\"hi there\"\n".to_string()));
    }

    #[test]
    fn test_evaluate_ext_vars_and_tlas() {
        let config = RunConfig::default()
            .with_ext_str("env", "prod")
            .with_tla_code("n", "2 * 21");
        let result = evaluate(
            "main.jsonlang",
            "function(n) { env: std.extVar('env'), n: n }",
            &config,
            &NoImports,
            &NativeRegistry::new(),
        );
        assert!(result.is_ok(), "Evaluation failed: {:?}", result.err());
        let value: serde_json::Value = serde_json::from_str(&result.unwrap()).unwrap();
        assert_eq!(value, json!({"env": "prod", "n": 42}));
    }

    #[test]
    fn test_evaluate_with_mode() {
        let mut config = RunConfig::default();
        config.eval.manifest.mode = OutputMode::Stream;
        let out = evaluate_with_mode("main.jsonlang", "[1, 2]", &config, &NoImports, &NativeRegistry::new());
        assert_eq!(out, Ok(EvalOutput::Stream(vec!["1\n".to_string(), "2\n".to_string()])));

        config.eval.manifest.mode = OutputMode::Multi;
        let out = evaluate_with_mode("main.jsonlang", "{ 'a.json': 1 }", &config, &NoImports, &NativeRegistry::new());
        let out = out.expect("multi output");
        assert_eq!(out.document_count(), 1);
        assert_eq!(out.as_regular(), None);
    }

    #[test]
    fn test_static_error_surface() {
        let err = quick_evaluate("{ a: }").unwrap_err();
        assert_eq!(err.kind_tag(), "static");
        assert_eq!(err.phase(), Phase::Parser);
    }

    #[test]
    fn test_runtime_error_surface() {
        let err = quick_evaluate("local f(x) = error 'bad ' + x; f('arg')").unwrap_err();
        assert_eq!(err.kind_tag(), "user_error");
        assert_eq!(err.message(), "bad arg");
        assert!(err.render(20).starts_with("RUNTIME ERROR: bad arg\n\t<snippet>:1:"));
    }

    #[test]
    fn test_small_eval_thread_still_bounded() {
        let mut config = RunConfig::default();
        config.eval.limits.max_stack = 50;
        let err = evaluate(
            "main.jsonlang",
            "local f(n) = if n == 0 then 0 else 1 + f(n - 1); f(1000)",
            &config,
            &NoImports,
            &NativeRegistry::new(),
        )
        .unwrap_err();
        assert_eq!(err.kind_tag(), "stack_overflow");
    }

    #[test]
    fn test_format_snippet() {
        let out = format_snippet("main.jsonlang", "{a:1,b:[1,2]}", &FmtConfig::default());
        assert_eq!(out, Ok("{\n  a: 1,\n  b: [1, 2],\n}\n".to_string()));
        assert!(format_snippet("main.jsonlang", "{a:", &FmtConfig::default()).is_err());
    }

    #[test]
    fn test_format_snippet_deep_nesting() {
        let depth = 1000;
        let src = format!("{}1{}", "[".repeat(depth), "]".repeat(depth));
        let out = format_snippet("main.jsonlang", &src, &FmtConfig::default());
        assert!(out.is_ok(), "Format failed: {:?}", out.err());
        assert_eq!(out.unwrap().matches('[').count(), depth);

        let err = format_snippet("main.jsonlang", &format!("{}1", "(".repeat(100_000)), &FmtConfig::default())
            .unwrap_err();
        assert_eq!(err.kind_tag(), "static");
        assert_eq!(err.phase(), Phase::Parser);
    }

    #[test]
    fn test_pipeline_logging() {
        let (logger, ring) = LogConfig::test().init();
        let ring = ring.expect("test config has a ring buffer");
        let config = RunConfig::default().with_logger(logger);
        let result = evaluate("main.jsonlang", "error 'x'", &config, &NoImports, &NativeRegistry::new());
        assert!(result.is_err());
        assert!(ring.contains("Starting evaluation of main.jsonlang"), "{}", ring.dump());
        assert!(ring.contains("Evaluation of main.jsonlang failed: x"), "{}", ring.dump());
    }
}
