//! 宿主扩展点测试
//!
//! 导入回调、原生函数、外部变量、顶层参数、输出模式与日志

mod common;
use common::{eval_with, on_big_stack, parse_output, MapImporter};
use jsonlang_core::{
    EvalError, ExtValue, ManifestConfig, NativeRegistry, NoImports, RuntimeError,
    RuntimeErrorKind, Value, Vm, VmOptions,
};
use jsonlang_log::LogConfig;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn runtime_error(result: Result<String, EvalError>) -> RuntimeError {
    match result {
        Err(EvalError::Runtime(err)) => err,
        other => panic!("Expected runtime error, got {other:?}"),
    }
}

fn json_ok(result: Result<String, EvalError>) -> serde_json::Value {
    assert!(result.is_ok(), "Evaluation failed: {:?}", result.err());
    parse_output(&result.unwrap())
}

/// `tick()` 每次调用返回递增的计数
fn tick_registry(counter: &Arc<AtomicUsize>) -> NativeRegistry {
    let counter = Arc::clone(counter);
    NativeRegistry::new().with("tick", &[], move |_| {
        Ok(json!(counter.fetch_add(1, Ordering::SeqCst) + 1))
    })
}

fn string_natives() -> NativeRegistry {
    NativeRegistry::new()
        .with("concat", &["a", "b"], |args| match (&args[0], &args[1]) {
            (serde_json::Value::String(a), serde_json::Value::String(b)) => {
                Ok(json!(format!("{a}{b}")))
            }
            _ => Err("concat expects strings".to_string()),
        })
        .with("echo", &["v"], |args| Ok(args[0].clone()))
}

// ===== 导入 =====

#[test]
fn test_import_relative_to_importer() {
    let importer = MapImporter::new(&[
        ("lib/a.jsonlang", "{ b: import 'b.jsonlang', file: std.thisFile }"),
        ("lib/b.jsonlang", "{ helper(x): x * 2 }.helper(21)"),
    ]);
    let out = eval_with(&importer, &NativeRegistry::new(), "import 'lib/a.jsonlang'", |_| {});
    assert_eq!(json_ok(out), json!({"b": 42, "file": "lib/a.jsonlang"}));
}

#[test]
fn test_import_evaluated_once_per_canonical_path() {
    let counter = Arc::new(AtomicUsize::new(0));
    let natives = tick_registry(&counter);
    let importer = MapImporter::new(&[
        ("lib/a.jsonlang", "{ c: import 'c.jsonlang' }"),
        ("lib/c.jsonlang", "std.native('tick')()"),
    ]);
    let src = "[import 'lib/c.jsonlang', (import 'lib/a.jsonlang').c, import 'lib/c.jsonlang']";
    let out = eval_with(&importer, &natives, src, |_| {});
    assert_eq!(json_ok(out), json!([1, 1, 1]));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    // (目录, 路径) 不同的两次解析；同一 (目录, 路径) 走缓存
    assert_eq!(importer.calls(), 2);
}

#[test]
fn test_imported_objects_are_identical() {
    let importer = MapImporter::new(&[("o.jsonlang", "{ a: [1, 2] }")]);
    let out = eval_with(&importer, &NativeRegistry::new(), "(import 'o.jsonlang') == (import 'o.jsonlang')", |_| {});
    assert_eq!(json_ok(out), json!(true));
}

#[test]
fn test_importstr() {
    let importer = MapImporter::new(&[("data.txt", "hello\n")]);
    let out = eval_with(&importer, &NativeRegistry::new(), "importstr 'data.txt'", |_| {});
    assert_eq!(json_ok(out), json!("hello\n"));
}

#[test]
fn test_import_not_found() {
    let err = runtime_error(eval_with(&NoImports, &NativeRegistry::new(), "import 'nope.jsonlang'", |_| {}));
    assert_eq!(err.kind, RuntimeErrorKind::ImportNotFound);
    assert_eq!(err.message, "Couldn't open import \"nope.jsonlang\": not found");
}

#[test]
fn test_import_callback_failure() {
    let importer = MapImporter::new(&[]);
    let err = runtime_error(eval_with(&importer, &NativeRegistry::new(), "import 'dir/'", |_| {}));
    assert_eq!(err.kind, RuntimeErrorKind::ImportFailed);
    assert_eq!(err.message, "Couldn't open import \"dir/\": is a directory");
}

#[test]
fn test_import_static_error() {
    let importer = MapImporter::new(&[("bad.jsonlang", "{a: ")]);
    let err = runtime_error(eval_with(&importer, &NativeRegistry::new(), "import 'bad.jsonlang'", |_| {}));
    assert_eq!(err.kind, RuntimeErrorKind::Static);
    assert_eq!(&*err.trace[0].span.file, "bad.jsonlang");
}

#[test]
fn test_error_inside_import_is_located_in_imported_file() {
    let importer = MapImporter::new(&[("lib/bad.jsonlang", "\nerror 'bad'")]);
    let err = runtime_error(eval_with(&importer, &NativeRegistry::new(), "import 'lib/bad.jsonlang'", |_| {}));
    assert_eq!(err.kind, RuntimeErrorKind::UserError);
    assert_eq!(&*err.trace[0].span.file, "lib/bad.jsonlang");
    assert_eq!(err.trace[0].span.line(), 2);
    assert_eq!(err.trace[0].name, "import <lib/bad.jsonlang>");
}

// ===== 原生函数 =====

#[test]
fn test_native_concat() {
    let natives = string_natives();
    let out = eval_with(&NoImports, &natives, "std.native('concat')('foo', 'bar')", |_| {});
    assert_eq!(json_ok(out), json!("foobar"));
    let out = eval_with(&NoImports, &natives, "std.native('concat')(b='bar', a='foo')", |_| {});
    assert_eq!(json_ok(out), json!("foobar"));
}

#[test]
fn test_native_arguments_are_forced() {
    let natives = string_natives();
    let out = eval_with(&NoImports, &natives, "std.native('echo')({x: 1 + 1, h:: 3, l: [self.x]})", |_| {});
    assert_eq!(json_ok(out), json!({"x": 2, "l": [2]}));
}

#[test]
fn test_native_failure() {
    let natives = string_natives();
    let err = runtime_error(eval_with(&NoImports, &natives, "std.native('concat')(1, 2)", |_| {}));
    assert_eq!(
        err.kind,
        RuntimeErrorKind::NativeFailure {
            name: "concat".to_string()
        }
    );
    assert_eq!(err.message, "concat expects strings");
}

#[test]
fn test_native_lookup_and_arity_errors() {
    let natives = string_natives();
    let err = runtime_error(eval_with(&NoImports, &natives, "std.native('nope')", |_| {}));
    assert_eq!(err.message, "Unrecognized native function name: nope");
    let err = runtime_error(eval_with(&NoImports, &natives, "std.native('concat')('a')", |_| {}));
    assert_eq!(err.message, "Function parameter b not bound in call.");
    let err = runtime_error(eval_with(&NoImports, &natives, "std.native('echo')(function(x) x)", |_| {}));
    assert_eq!(err.kind, RuntimeErrorKind::Manifest);
}

#[test]
fn test_native_is_a_function_value() {
    let natives = string_natives();
    let out = eval_with(&NoImports, &natives, "std.length(std.native('concat'))", |_| {});
    assert_eq!(json_ok(out), json!(2));
}

// ===== 外部变量与顶层参数 =====

#[test]
fn test_ext_vars() {
    let src = "{ env: std.extVar('env'), n: std.extVar('cfg').replicas }";
    let out = eval_with(&NoImports, &NativeRegistry::new(), src, |options| {
        options.ext_vars.insert("env".to_string(), ExtValue::Str("prod".to_string()));
        options
            .ext_vars
            .insert("cfg".to_string(), ExtValue::Code("{ replicas: 2 + 1 }".to_string()));
    });
    assert_eq!(json_ok(out), json!({"env": "prod", "n": 3}));

    let err = runtime_error(eval_with(&NoImports, &NativeRegistry::new(), "std.extVar('missing')", |_| {}));
    assert_eq!(err.message, "Undefined external variable: missing");
}

#[test]
fn test_ext_code_evaluated_once() {
    let counter = Arc::new(AtomicUsize::new(0));
    let natives = tick_registry(&counter);
    let out = eval_with(&NoImports, &natives, "[std.extVar('t'), std.extVar('t')]", |options| {
        options
            .ext_vars
            .insert("t".to_string(), ExtValue::Code("std.native('tick')()".to_string()));
    });
    assert_eq!(json_ok(out), json!([1, 1]));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_top_level_arguments() {
    let src = "function(name, count=1) { name: name, count: count }";
    let out = eval_with(&NoImports, &NativeRegistry::new(), src, |options| {
        options.tlas.insert("name".to_string(), ExtValue::Str("x".to_string()));
        options.tlas.insert("count".to_string(), ExtValue::Code("2 + 3".to_string()));
    });
    assert_eq!(json_ok(out), json!({"name": "x", "count": 5}));

    let out = eval_with(&NoImports, &NativeRegistry::new(), "function(name='d') name", |_| {});
    assert_eq!(json_ok(out), json!("d"));

    // 结果不是函数时忽略顶层参数
    let out = eval_with(&NoImports, &NativeRegistry::new(), "1", |options| {
        options.tlas.insert("x".to_string(), ExtValue::Str("y".to_string()));
    });
    assert_eq!(json_ok(out), json!(1));
}

#[test]
fn test_stack_limit_is_configurable() {
    let src = "local f(n) = if n == 0 then 0 else 1 + f(n - 1); f(50)";
    let out = eval_with(&NoImports, &NativeRegistry::new(), src, |options| {
        options.limits.max_stack = 20;
    });
    let err = runtime_error(out);
    assert_eq!(err.kind, RuntimeErrorKind::StackOverflow);
}

// ===== 输出模式 =====

fn with_value<R: Send>(src: &str, f: impl FnOnce(&Vm<'_>, &Value) -> R + Send) -> R {
    let natives = NativeRegistry::new();
    on_big_stack(|| {
        let vm = Vm::new(VmOptions::new(&NoImports, &natives));
        let value = vm.evaluate("main.jsonlang", src).expect("evaluation succeeds");
        f(&vm, &value)
    })
}

#[test]
fn test_multi_mode() {
    let files = with_value("{ 'a.json': { x: 1 }, 'b.json': [1], h:: 0 }", |vm, value| {
        vm.manifest_multi(value, &ManifestConfig::default())
    })
    .expect("multi output");
    assert_eq!(files.len(), 2);
    assert_eq!(files["a.json"], "{\n   \"x\": 1\n}\n");
    assert_eq!(files["b.json"], "[\n   1\n]\n");

    let err = with_value("[1]", |vm, value| vm.manifest_multi(value, &ManifestConfig::default()))
        .unwrap_err();
    assert!(err.message.starts_with("Multi mode: top-level object was a array"));
}

#[test]
fn test_stream_mode() {
    let docs = with_value("[1, 'a', { k: true }]", |vm, value| {
        vm.manifest_stream(value, &ManifestConfig::default())
    })
    .expect("stream output");
    assert_eq!(docs, ["1\n", "\"a\"\n", "{\n   \"k\": true\n}\n"]);

    let err = with_value("{}", |vm, value| vm.manifest_stream(value, &ManifestConfig::default()))
        .unwrap_err();
    assert_eq!(err.kind, RuntimeErrorKind::Manifest);
}

#[test]
fn test_string_output() {
    let config = ManifestConfig {
        string_output: true,
        ..ManifestConfig::default()
    };
    let out = with_value("'raw\\ntext'", |vm, value| vm.manifest_regular(value, &config));
    assert_eq!(out.expect("string output"), "raw\ntext\n");

    let err = with_value("1", |vm, value| vm.manifest_regular(value, &config)).unwrap_err();
    assert_eq!(err.message, "Expected string result, got: number");
}

#[test]
fn test_indent_config() {
    let config = ManifestConfig {
        indent: 2,
        ..ManifestConfig::default()
    };
    let out = with_value("{ a: [1] }", |vm, value| vm.manifest_regular(value, &config));
    assert_eq!(out.expect("output"), "{\n  \"a\": [\n    1\n  ]\n}\n");
}

// ===== 日志 =====

#[test]
fn test_pipeline_logs_to_ring_buffer() {
    let (logger, ring) = LogConfig::test().init();
    let ring = ring.expect("test config has a ring buffer");
    let importer = MapImporter::new(&[("x.jsonlang", "1")]);
    let out = eval_with(&importer, &NativeRegistry::new(), "import 'x.jsonlang'", |options| {
        options.logger = logger;
    });
    assert_eq!(json_ok(out), json!(1));
    assert!(ring.contains("Evaluating main.jsonlang"), "{}", ring.dump());
    assert!(ring.contains("Imported x.jsonlang"), "{}", ring.dump());
}
