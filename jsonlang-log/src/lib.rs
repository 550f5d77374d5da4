//! jsonlang-log - 结构化日志系统
//!
//! 为 Jsonlang 求值管线设计的日志系统，特点：
//! - **显式传递**：无全局 logger，组件通过 `Arc<Logger>` 持有
//! - **非阻塞**：环形缓冲区满了覆盖旧数据
//! - **可断言**：测试中用 [`LogRingBuffer`] 收集记录
//!
//! # 快速开始
//!
//! ```
//! use jsonlang_log::{debug, LogConfig};
//!
//! let (logger, ring) = LogConfig::test().init();
//! debug!(logger, "evaluating {}", "main.jsonlang");
//! assert!(ring.unwrap().contains("main.jsonlang"));
//! ```

mod config;
mod logger;
mod macros;
mod record;
mod ring_buffer;
mod span;

pub use config::{LogConfig, OutputConfig};
pub use logger::{LogSink, Logger, SpanGuard};
pub use record::{Level, Record};
pub use ring_buffer::{LogRingBuffer, RingBufferStats};
pub use span::{Span, SpanId};

#[cfg(feature = "file")]
pub use logger::FileSink;
#[cfg(feature = "stderr")]
pub use logger::StderrSink;
#[cfg(feature = "stdout")]
pub use logger::StdoutSink;

/// 日志结果类型
pub type Result<T> = std::result::Result<T, Error>;

/// 日志系统错误类型
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unknown log level: {0}")]
    UnknownLevel(String),
}

/// 解析日志级别，失败时给出错误而不是默认值
pub fn parse_level(text: &str) -> Result<Level> {
    Level::parse(text).ok_or_else(|| Error::UnknownLevel(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("info").unwrap(), Level::Info);
        let err = parse_level("verbose").unwrap_err();
        assert_eq!(err.to_string(), "Unknown log level: verbose");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("IO error"));
    }
}
