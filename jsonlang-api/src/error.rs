//! API 错误类型
//!
//! 提供统一的错误类型、经典文本报告和结构化错误报告。

use jsonlang_config::Phase;
use jsonlang_core::{EvalError, RuntimeErrorKind, TraceFrame};
use serde::Serialize;
use thiserror::Error;

/// 编译期错误（词法 / 语法 / 作用域）
pub use jsonlang_core::StaticError;

/// 求值期错误（带调用栈）
pub use jsonlang_core::RuntimeError;

/// Jsonlang 错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JsonlangError {
    /// 求值开始之前的错误
    #[error("{0}")]
    Static(#[from] StaticError),

    /// 求值或输出期间的错误
    #[error("{0}")]
    Runtime(#[from] RuntimeError),

    /// 宿主环境错误（如无法启动求值线程）
    #[error("Host error: {0}")]
    Host(String),
}

impl From<EvalError> for JsonlangError {
    fn from(err: EvalError) -> Self {
        match err {
            EvalError::Static(e) => JsonlangError::Static(e),
            EvalError::Runtime(e) => JsonlangError::Runtime(e),
        }
    }
}

impl JsonlangError {
    /// 机器可读的错误类别
    pub fn kind_tag(&self) -> &'static str {
        match self {
            JsonlangError::Static(_) => "static",
            JsonlangError::Runtime(e) => e.kind.tag(),
            JsonlangError::Host(_) => "host",
        }
    }

    /// 不带位置的错误消息
    pub fn message(&self) -> String {
        match self {
            JsonlangError::Static(e) => e.message(),
            JsonlangError::Runtime(e) => e.message.clone(),
            JsonlangError::Host(msg) => msg.clone(),
        }
    }

    /// 调用栈，最内层在前；非运行时错误为空
    pub fn trace(&self) -> &[TraceFrame] {
        match self {
            JsonlangError::Runtime(e) => &e.trace,
            _ => &[],
        }
    }

    /// 获取错误行号（如果有）
    pub fn line(&self) -> Option<usize> {
        match self {
            JsonlangError::Static(e) => Some(e.span().line()),
            JsonlangError::Runtime(e) => e.span().map(|span| span.line()),
            JsonlangError::Host(_) => None,
        }
    }

    /// 获取错误列号（如果有）
    pub fn column(&self) -> Option<usize> {
        match self {
            JsonlangError::Static(e) => Some(e.span().column()),
            JsonlangError::Runtime(e) => e.span().map(|span| span.column()),
            JsonlangError::Host(_) => None,
        }
    }

    /// 获取错误阶段
    pub fn phase(&self) -> Phase {
        match self {
            JsonlangError::Static(e) => e.phase(),
            JsonlangError::Runtime(e) if e.kind == RuntimeErrorKind::Manifest => Phase::Manifest,
            _ => Phase::Vm,
        }
    }

    /// 经典文本报告
    ///
    /// 运行时错误每帧一行 `\t<位置>\t<名称>`；帧数超过 `max_trace` 时保留
    /// 开头 `max_trace / 2` 帧和结尾其余帧，中间以一行 `\t...` 代替。
    /// `max_trace` 为 0 时不省略。
    pub fn render(&self, max_trace: usize) -> String {
        match self {
            JsonlangError::Static(e) => format!("STATIC ERROR: {}: {}\n", e.span(), e.message()),
            JsonlangError::Host(msg) => format!("RUNTIME ERROR: {msg}\n"),
            JsonlangError::Runtime(e) => {
                let mut out = format!("RUNTIME ERROR: {}\n", e.message);
                let frames = &e.trace;
                let elide = max_trace > 0 && frames.len() > max_trace;
                let head = if elide { max_trace / 2 } else { frames.len() };
                let tail_start = if elide {
                    frames.len() - (max_trace - head)
                } else {
                    frames.len()
                };
                for frame in &frames[..head] {
                    push_frame(&mut out, frame);
                }
                if elide {
                    out.push_str("\t...\n");
                    for frame in &frames[tail_start..] {
                        push_frame(&mut out, frame);
                    }
                }
                out
            }
        }
    }

    /// 转换为结构化错误报告
    ///
    /// 适用于 Web API、编辑器插件等需要结构化数据的场景。
    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            phase: self.phase().as_str(),
            kind: self.kind_tag().to_string(),
            message: self.message(),
            line: self.line(),
            column: self.column(),
            trace: self
                .trace()
                .iter()
                .map(|frame| TraceEntry {
                    location: frame.span.to_string(),
                    name: frame.name.clone(),
                })
                .collect(),
        }
    }
}

fn push_frame(out: &mut String, frame: &TraceFrame) {
    if frame.name.is_empty() {
        out.push_str(&format!("\t{}\n", frame.span));
    } else {
        out.push_str(&format!("\t{}\t{}\n", frame.span, frame.name));
    }
}

/// 结构化错误报告
///
/// 上层应用（CLI、Web、编辑器）可以根据自己的需求格式化。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    /// 错误阶段: lexer, parser, analyzer, vm, manifest
    pub phase: &'static str,
    /// 错误类型（可用于程序化处理）
    pub kind: String,
    /// 人类可读的错误消息
    pub message: String,
    /// 错误行号（1-based，如果有）
    pub line: Option<usize>,
    /// 错误列号（1-based，如果有）
    pub column: Option<usize>,
    /// 调用栈，最内层在前
    pub trace: Vec<TraceEntry>,
}

/// 调用栈中的一行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEntry {
    pub location: String,
    pub name: String,
}

impl std::fmt::Display for ErrorReport {
    /// 默认的 CLI 友好格式
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(col)) => {
                write!(f, "[{}:{}] {} error: {}", line, col, self.phase, self.message)
            }
            _ => write!(f, "[{}] {} error: {}", self.phase, self.phase, self.message),
        }
    }
}

impl ErrorReport {
    /// 转换为 JSON 格式（Web API 使用）
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// 简洁格式（适合终端）
    pub fn to_short(&self) -> String {
        format!("{}: {}", self.phase, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonlang_core::compiler::parse_source;
    use jsonlang_core::kit::lexer::{SourcePosition, SourceSpan};
    use jsonlang_log::Logger;
    use std::sync::Arc;

    fn static_error(src: &str) -> JsonlangError {
        match parse_source("main.jsonlang", src, &Logger::noop()) {
            Err(e) => JsonlangError::from(e),
            Ok(expr) => panic!("Expected static error, parsed {expr:?}"),
        }
    }

    fn frame(line: usize, name: &str) -> TraceFrame {
        TraceFrame {
            span: SourceSpan::at(Arc::from("main.jsonlang"), SourcePosition::new(line, 1, 0)),
            name: name.to_string(),
        }
    }

    fn runtime_error(frames: usize) -> JsonlangError {
        let trace = (1..=frames).map(|i| frame(i, &format!("function <f{i}>"))).collect();
        JsonlangError::Runtime(RuntimeError::new(RuntimeErrorKind::UserError, "boom", trace))
    }

    #[test]
    fn test_static_error_accessors() {
        let err = static_error("{a: }");
        assert_eq!(err.kind_tag(), "static");
        assert_eq!(err.phase(), Phase::Parser);
        assert_eq!(err.line(), Some(1));
        assert!(err.column().is_some());
        assert!(err.trace().is_empty());
        assert!(err.render(20).starts_with("STATIC ERROR: main.jsonlang:1:"));
    }

    #[test]
    fn test_runtime_error_accessors() {
        let err = runtime_error(2);
        assert_eq!(err.kind_tag(), "user_error");
        assert_eq!(err.message(), "boom");
        assert_eq!(err.phase(), Phase::Vm);
        assert_eq!(err.line(), Some(1));
        assert_eq!(err.column(), Some(1));
        assert_eq!(err.trace().len(), 2);
    }

    #[test]
    fn test_render_full_trace() {
        let out = runtime_error(2).render(20);
        assert_eq!(
            out,
            "RUNTIME ERROR: boom\n\tmain.jsonlang:1:1\tfunction <f1>\n\tmain.jsonlang:2:1\tfunction <f2>\n"
        );
    }

    #[test]
    fn test_render_elides_middle() {
        let out = runtime_error(10).render(4);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "RUNTIME ERROR: boom");
        assert!(lines[1].ends_with("function <f1>"));
        assert!(lines[2].ends_with("function <f2>"));
        assert_eq!(lines[3], "\t...");
        assert!(lines[4].ends_with("function <f9>"));
        assert!(lines[5].ends_with("function <f10>"));

        // 0 表示不省略
        assert_eq!(runtime_error(10).render(0).lines().count(), 11);
    }

    #[test]
    fn test_render_odd_limit_keeps_more_at_bottom() {
        let out = runtime_error(10).render(3);
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[1].ends_with("function <f1>"));
        assert_eq!(lines[2], "\t...");
        assert!(lines[3].ends_with("function <f9>"));
        assert!(lines[4].ends_with("function <f10>"));
    }

    #[test]
    fn test_render_unnamed_frame() {
        let err = JsonlangError::Runtime(RuntimeError::new(
            RuntimeErrorKind::Evaluation,
            "x",
            vec![frame(3, "")],
        ));
        assert_eq!(err.render(20), "RUNTIME ERROR: x\n\tmain.jsonlang:3:1\n");
    }

    #[test]
    fn test_manifest_phase() {
        let err = JsonlangError::Runtime(RuntimeError::new(RuntimeErrorKind::Manifest, "m", Vec::new()));
        assert_eq!(err.phase(), Phase::Manifest);
        assert_eq!(err.line(), None);
    }

    #[test]
    fn test_error_report() {
        let report = runtime_error(1).to_report();
        assert_eq!(report.phase, "vm");
        assert_eq!(report.kind, "user_error");
        assert_eq!(report.to_string(), "[1:1] vm error: boom");
        assert_eq!(report.to_short(), "vm: boom");
        assert_eq!(report.trace[0].location, "main.jsonlang:1:1");

        let json = report.to_json();
        assert!(json.is_ok(), "Serialize failed: {:?}", json.err());
        let value: serde_json::Value = serde_json::from_str(&json.unwrap()).unwrap();
        assert_eq!(value["kind"], "user_error");
        assert_eq!(value["line"], 1);
        assert_eq!(value["trace"][0]["name"], "function <f1>");
    }

    #[test]
    fn test_host_error_report() {
        let report = JsonlangError::Host("no thread".to_string()).to_report();
        assert_eq!(report.to_string(), "[vm] vm error: no thread");
        assert!(report.trace.is_empty());
    }
}
