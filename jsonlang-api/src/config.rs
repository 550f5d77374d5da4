//! API 层配置
//!
//! RunConfig = 求值配置 + logger + 外部变量 + 顶层参数

use jsonlang_config::EvalConfig;
use jsonlang_core::ExtValue;
use jsonlang_log::Logger;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Evaluation configuration
#[derive(Clone)]
pub struct RunConfig {
    /// Limits, output and formatter options
    pub eval: EvalConfig,
    /// Logger (noop by default)
    pub logger: Arc<Logger>,
    /// `std.extVar` bindings
    pub ext_vars: BTreeMap<String, ExtValue>,
    /// Top-level arguments, applied when the program is a function
    pub tlas: BTreeMap<String, ExtValue>,
}

impl RunConfig {
    pub fn new(eval: EvalConfig) -> Self {
        Self {
            eval,
            ..Self::default()
        }
    }

    /// 从 JSON 读取求值配置，缺省字段取默认值
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(EvalConfig::from_json(text)?))
    }

    pub fn with_logger(mut self, logger: Arc<Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_ext_str(mut self, name: &str, value: &str) -> Self {
        self.ext_vars
            .insert(name.to_string(), ExtValue::Str(value.to_string()));
        self
    }

    pub fn with_ext_code(mut self, name: &str, code: &str) -> Self {
        self.ext_vars
            .insert(name.to_string(), ExtValue::Code(code.to_string()));
        self
    }

    pub fn with_tla_str(mut self, name: &str, value: &str) -> Self {
        self.tlas
            .insert(name.to_string(), ExtValue::Str(value.to_string()));
        self
    }

    pub fn with_tla_code(mut self, name: &str, code: &str) -> Self {
        self.tlas
            .insert(name.to_string(), ExtValue::Code(code.to_string()));
        self
    }
}

impl std::fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunConfig")
            .field("eval", &self.eval)
            .field("ext_vars", &self.ext_vars)
            .field("tlas", &self.tlas)
            .finish()
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            eval: EvalConfig::default(),
            logger: Logger::noop(),
            ext_vars: BTreeMap::new(),
            tlas: BTreeMap::new(),
        }
    }
}

// 便捷入口共用的默认配置
static DEFAULT_CONFIG: Lazy<RunConfig> = Lazy::new(RunConfig::default);

/// Shared default configuration
pub fn default_config() -> &'static RunConfig {
    &DEFAULT_CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonlang_config::OutputMode;

    #[test]
    fn test_default_run_config() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.eval.limits.max_stack, 500);
        assert_eq!(cfg.eval.limits.max_trace, 20);
        assert_eq!(cfg.eval.manifest.indent, 3);
        assert!(cfg.ext_vars.is_empty());
        assert!(cfg.tlas.is_empty());
    }

    #[test]
    fn test_run_config_builders() {
        let cfg = RunConfig::default()
            .with_ext_str("env", "prod")
            .with_ext_code("n", "1 + 1")
            .with_tla_str("name", "x");
        assert_eq!(cfg.ext_vars["env"], ExtValue::Str("prod".to_string()));
        assert_eq!(cfg.ext_vars["n"], ExtValue::Code("1 + 1".to_string()));
        assert_eq!(cfg.tlas["name"], ExtValue::Str("x".to_string()));
    }

    #[test]
    fn test_run_config_from_json() {
        let cfg = RunConfig::from_json(r#"{"limits": {"max_stack": 50}, "manifest": {"mode": "stream"}}"#);
        assert!(cfg.is_ok(), "Config failed: {:?}", cfg.err());
        let cfg = cfg.unwrap();
        assert_eq!(cfg.eval.limits.max_stack, 50);
        assert_eq!(cfg.eval.limits.max_trace, 20);
        assert_eq!(cfg.eval.manifest.mode, OutputMode::Stream);

        assert!(RunConfig::from_json("{").is_err());
    }

    #[test]
    fn test_run_config_debug_skips_logger() {
        let debug_str = format!("{:?}", RunConfig::default());
        assert!(debug_str.contains("eval"));
        assert!(debug_str.contains("ext_vars"));
        assert!(!debug_str.contains("logger"));
    }

    #[test]
    fn test_default_config_is_shared() {
        assert!(std::ptr::eq(default_config(), default_config()));
    }
}
