//! 日志配置
//!
//! 一键组装 logger 与输出目标。

use crate::{Level, LogRingBuffer, Logger};
use std::sync::Arc;

/// 日志输出目标配置
#[derive(Clone, Debug, PartialEq)]
pub enum OutputConfig {
    #[cfg(feature = "stdout")]
    Stdout,
    #[cfg(feature = "stderr")]
    Stderr,
    /// 输出到文件（路径）
    #[cfg(feature = "file")]
    File(String),
    /// 输出到环形缓冲区（容量）
    RingBuffer(usize),
}

/// 日志配置
///
/// ```
/// use jsonlang_log::{LogConfig, Level};
///
/// let (logger, ring) = LogConfig::new(Level::Debug).with_ring_buffer(1000).init();
/// assert!(ring.is_some());
/// assert!(logger.is_enabled(Level::Debug));
/// ```
#[derive(Clone, Debug)]
pub struct LogConfig {
    pub level: Level,
    pub outputs: Vec<OutputConfig>,
}

impl LogConfig {
    pub fn new(level: Level) -> Self {
        LogConfig {
            level,
            outputs: Vec::new(),
        }
    }

    /// 开发环境：Debug 级别，stderr + 10000 条环形缓冲区
    #[cfg(feature = "stderr")]
    pub fn dev() -> Self {
        LogConfig {
            level: Level::Debug,
            outputs: vec![OutputConfig::Stderr, OutputConfig::RingBuffer(10000)],
        }
    }

    /// 生产环境：Warn 级别，stderr + 1000 条环形缓冲区
    #[cfg(feature = "stderr")]
    pub fn production() -> Self {
        LogConfig {
            level: Level::Warn,
            outputs: vec![OutputConfig::Stderr, OutputConfig::RingBuffer(1000)],
        }
    }

    /// 测试环境：Trace 级别，仅环形缓冲区，方便断言
    pub fn test() -> Self {
        LogConfig {
            level: Level::Trace,
            outputs: vec![OutputConfig::RingBuffer(4096)],
        }
    }

    #[cfg(feature = "stdout")]
    pub fn with_stdout(mut self) -> Self {
        if !self.outputs.contains(&OutputConfig::Stdout) {
            self.outputs.push(OutputConfig::Stdout);
        }
        self
    }

    #[cfg(feature = "stderr")]
    pub fn with_stderr(mut self) -> Self {
        if !self.outputs.contains(&OutputConfig::Stderr) {
            self.outputs.push(OutputConfig::Stderr);
        }
        self
    }

    #[cfg(feature = "file")]
    pub fn with_file(mut self, path: impl Into<String>) -> Self {
        self.outputs.push(OutputConfig::File(path.into()));
        self
    }

    pub fn with_ring_buffer(mut self, capacity: usize) -> Self {
        self.outputs.push(OutputConfig::RingBuffer(capacity));
        self
    }

    /// 初始化日志器
    ///
    /// 配置了环形缓冲区时一并返回（最后一个生效）。
    /// 文件无法打开时返回错误，而不是静默丢弃该输出。
    pub fn try_init(self) -> crate::Result<(Arc<Logger>, Option<Arc<LogRingBuffer>>)> {
        self.build(true)
    }

    /// 同 [`Self::try_init`]，但跳过无法打开的文件输出
    pub fn init(self) -> (Arc<Logger>, Option<Arc<LogRingBuffer>>) {
        let level = self.level;
        self.build(false)
            .unwrap_or_else(|_| (Logger::new(level), None))
    }

    fn build(self, strict: bool) -> crate::Result<(Arc<Logger>, Option<Arc<LogRingBuffer>>)> {
        let logger = Logger::new(self.level);
        let mut ring_buffer = None;

        for output in self.outputs {
            match output {
                #[cfg(feature = "stdout")]
                OutputConfig::Stdout => logger.add_sink(crate::StdoutSink),
                #[cfg(feature = "stderr")]
                OutputConfig::Stderr => logger.add_sink(crate::StderrSink),
                #[cfg(feature = "file")]
                OutputConfig::File(path) => match crate::FileSink::new(&path) {
                    Ok(sink) => logger.add_sink(sink),
                    Err(e) if strict => return Err(e.into()),
                    Err(_) => {}
                },
                OutputConfig::RingBuffer(capacity) => {
                    let ring = LogRingBuffer::new(capacity);
                    ring_buffer = Some(Arc::clone(&ring));
                    logger.add_sink(ring);
                }
            }
        }

        Ok((logger, ring_buffer))
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new(Level::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer_config() {
        let (logger, ring) = LogConfig::new(Level::Info).with_ring_buffer(10).init();
        let ring = ring.unwrap();
        crate::info!(logger, "hello {}", "ring");
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.capacity(), 10);
    }

    #[test]
    fn test_test_config_captures_trace() {
        let (logger, ring) = LogConfig::test().init();
        crate::trace!(logger, "fine grained");
        assert!(ring.unwrap().contains("fine grained"));
    }

    #[test]
    fn test_no_outputs() {
        let (logger, ring) = LogConfig::default().init();
        assert!(ring.is_none());
        assert_eq!(logger.level(), Level::Info);
    }

    #[cfg(feature = "stderr")]
    #[test]
    fn test_stderr_not_duplicated() {
        let cfg = LogConfig::new(Level::Warn).with_stderr().with_stderr();
        assert_eq!(cfg.outputs.len(), 1);
    }

    #[cfg(feature = "file")]
    #[test]
    fn test_try_init_reports_bad_file() {
        let cfg = LogConfig::new(Level::Warn).with_file("/nonexistent-dir/jsonlang/log.txt");
        assert!(cfg.clone().try_init().is_err());
        let (logger, _) = cfg.init();
        assert_eq!(logger.level(), Level::Warn);
    }
}
