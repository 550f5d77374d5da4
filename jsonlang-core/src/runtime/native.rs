//! 宿主原生函数注册表
//!
//! 原生函数是严格的：参数在跨越边界前被完全求值并转换为 `serde_json::Value`。

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// 宿主函数：按声明顺序接收参数
pub type NativeCallback =
    Arc<dyn Fn(&[serde_json::Value]) -> Result<serde_json::Value, String> + Send + Sync>;

#[derive(Clone)]
pub struct NativeFunction {
    pub params: Vec<String>,
    pub callback: NativeCallback,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// 名称 -> 原生函数
#[derive(Debug, Clone, Default)]
pub struct NativeRegistry {
    functions: BTreeMap<String, NativeFunction>,
}

impl NativeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册（同名覆盖）
    pub fn register<F>(&mut self, name: impl Into<String>, params: &[&str], callback: F)
    where
        F: Fn(&[serde_json::Value]) -> Result<serde_json::Value, String> + Send + Sync + 'static,
    {
        self.functions.insert(
            name.into(),
            NativeFunction {
                params: params.iter().map(|p| p.to_string()).collect(),
                callback: Arc::new(callback),
            },
        );
    }

    /// 链式注册
    pub fn with<F>(mut self, name: impl Into<String>, params: &[&str], callback: F) -> Self
    where
        F: Fn(&[serde_json::Value]) -> Result<serde_json::Value, String> + Send + Sync + 'static,
    {
        self.register(name, params, callback);
        self
    }

    pub fn get(&self, name: &str) -> Option<&NativeFunction> {
        self.functions.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
