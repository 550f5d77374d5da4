//! 测试辅助工具
//!
//! 提供端到端测试的辅助函数

#![allow(dead_code)]

use jsonlang::{evaluate, JsonlangError, MemoryImporter, NativeRegistry, RunConfig};
use serde_json::json;

/// 以给定导入器、原生函数和配置求值 main.jsonlang
pub fn eval_full(
    src: &str,
    config: &RunConfig,
    importer: &MemoryImporter,
    natives: &NativeRegistry,
) -> Result<String, JsonlangError> {
    evaluate("main.jsonlang", src, config, importer, natives)
}

/// 默认配置、无导入、无原生函数
pub fn eval(src: &str) -> Result<String, JsonlangError> {
    eval_full(src, &RunConfig::default(), &MemoryImporter::new(), &NativeRegistry::new())
}

/// 期望成功，返回解析后的 JSON
pub fn eval_ok(src: &str) -> serde_json::Value {
    let out = eval(src);
    assert!(out.is_ok(), "Evaluation failed for {src:?}: {:?}", out.err());
    parse(&out.unwrap())
}

/// 期望失败
pub fn eval_err(src: &str) -> JsonlangError {
    match eval(src) {
        Err(err) => err,
        Ok(out) => panic!("Expected error for {src:?}, got {out:?}"),
    }
}

pub fn parse(out: &str) -> serde_json::Value {
    assert!(out.ends_with('\n'), "Output not newline-terminated: {out:?}");
    serde_json::from_str(out).expect("output is valid JSON")
}

/// 常用原生函数：字符串拼接、失败回调
pub fn test_natives() -> NativeRegistry {
    NativeRegistry::new()
        .with("concat", &["a", "b"], |args| {
            match (args[0].as_str(), args[1].as_str()) {
                (Some(a), Some(b)) => Ok(json!(format!("{a}{b}"))),
                _ => Err("concat expects strings".to_string()),
            }
        })
        .with("fail", &[], |_| Err("host said no".to_string()))
}
