//! 测试辅助工具
//!
//! 求值在大栈线程上进行：深递归测试需要远超默认 2MB 的宿主栈。

#![allow(dead_code)]

use jsonlang_core::{
    EvalError, ImportCallback, ImportedFile, ManifestConfig, NativeRegistry, NoImports,
    RuntimeError, Vm, VmOptions,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const STACK_BYTES: usize = 256 * 1024 * 1024;

/// 在大栈线程上运行，测试线程中的 panic 原样传回
pub fn on_big_stack<R: Send>(f: impl FnOnce() -> R + Send) -> R {
    std::thread::scope(|s| {
        let handle = std::thread::Builder::new()
            .stack_size(STACK_BYTES)
            .spawn_scoped(s, f)
            .expect("failed to spawn evaluation thread");
        handle
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
    })
}

/// 完整流程：编译 + 求值 + 输出单个 JSON 文档
pub fn eval_with(
    importer: &dyn ImportCallback,
    natives: &NativeRegistry,
    src: &str,
    configure: impl FnOnce(&mut VmOptions<'_>) + Send,
) -> Result<String, EvalError> {
    on_big_stack(|| {
        let mut options = VmOptions::new(importer, natives);
        configure(&mut options);
        let vm = Vm::new(options);
        let value = vm.evaluate("main.jsonlang", src)?;
        Ok(vm.manifest_regular(&value, &ManifestConfig::default())?)
    })
}

pub fn run(src: &str) -> Result<String, EvalError> {
    eval_with(&NoImports, &NativeRegistry::new(), src, |_| {})
}

/// 求值成功并解析输出
pub fn eval_json(src: &str) -> serde_json::Value {
    let out = run(src);
    assert!(out.is_ok(), "Evaluation failed for {src:?}: {:?}", out.err());
    parse_output(&out.unwrap())
}

pub fn parse_output(out: &str) -> serde_json::Value {
    assert!(out.ends_with('\n'), "Output not newline-terminated: {out:?}");
    serde_json::from_str(out).expect("output is valid JSON")
}

/// 期望运行时错误
pub fn eval_err(src: &str) -> RuntimeError {
    match run(src) {
        Err(EvalError::Runtime(err)) => err,
        other => panic!("Expected runtime error for {src:?}, got {other:?}"),
    }
}

/// 内存中的导入表，记录回调被调用的次数
#[derive(Default)]
pub struct MapImporter {
    files: HashMap<String, String>,
    calls: AtomicUsize,
}

impl MapImporter {
    pub fn new(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(path, content)| (path.to_string(), content.to_string()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImportCallback for MapImporter {
    fn import(&self, dir: &str, path: &str) -> Result<Option<ImportedFile>, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if path.ends_with('/') {
            return Err("is a directory".to_string());
        }
        let canonical = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("{dir}{path}")
        };
        Ok(self
            .files
            .get(&canonical)
            .map(|content| ImportedFile::new(canonical.clone(), content.clone())))
    }
}
