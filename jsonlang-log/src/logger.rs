//! 日志器实现

use crate::record::{Level, Record};
use crate::span::{Span, SpanId};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

/// 日志输出目标
pub trait LogSink: Send + Sync {
    fn write(&self, record: &Record);
}

/// 日志器：级别 + 输出目标 + span 栈
///
/// 没有全局实例，使用方显式持有 `Arc<Logger>`。
pub struct Logger {
    level: AtomicU8,
    sinks: Mutex<Vec<Box<dyn LogSink>>>,
    span_stack: Mutex<Vec<Span>>,
    next_span_id: AtomicU64,
}

impl Logger {
    pub fn new(level: Level) -> Arc<Self> {
        Arc::new(Logger {
            level: AtomicU8::new(level as u8),
            sinks: Mutex::new(Vec::new()),
            span_stack: Mutex::new(Vec::new()),
            next_span_id: AtomicU64::new(1),
        })
    }

    /// 添加输出目标（构建期链式调用）
    pub fn with_sink<S: LogSink + 'static>(self: Arc<Self>, sink: S) -> Arc<Self> {
        self.add_sink(sink);
        self
    }

    pub fn add_sink<S: LogSink + 'static>(&self, sink: S) {
        if let Ok(mut sinks) = self.sinks.lock() {
            sinks.push(Box::new(sink));
        }
    }

    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed)).unwrap_or(Level::Info)
    }

    pub fn is_enabled(&self, level: Level) -> bool {
        level >= self.level()
    }

    /// 写入一条日志；宏已经做过级别检查，这里再检查一次以便直接调用
    #[inline(never)]
    pub fn log(&self, level: Level, target: &'static str, message: impl Into<String>) {
        if !self.is_enabled(level) {
            return;
        }

        let mut record = Record::new(level, target, message);
        if let Some(span) = self.span_stack.lock().ok().and_then(|s| s.last().cloned()) {
            record = record.with_span(span.id.0);
        }

        if let Ok(sinks) = self.sinks.lock() {
            for sink in sinks.iter() {
                sink.write(&record);
            }
        }
    }

    /// 进入一个新的 span，守卫析构时自动退出
    pub fn enter_span(self: &Arc<Self>, name: &'static str) -> SpanGuard {
        let id = SpanId(self.next_span_id.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut stack) = self.span_stack.lock() {
            stack.push(Span::new(id, name));
        }
        SpanGuard {
            logger: Arc::clone(self),
        }
    }

    pub fn span_depth(&self) -> usize {
        self.span_stack.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// 静默日志器：Error 级别且没有任何 sink
    pub fn noop() -> Arc<Self> {
        Self::new(Level::Error)
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level())
            .field("span_depth", &self.span_depth())
            .finish()
    }
}

/// Span 守卫
pub struct SpanGuard {
    logger: Arc<Logger>,
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        if let Ok(mut stack) = self.logger.span_stack.lock() {
            stack.pop();
        }
    }
}

// 链式日志器：一个 logger 可以作为另一个 logger 的 sink
impl LogSink for Arc<Logger> {
    fn write(&self, record: &Record) {
        self.log(record.level, record.target, record.message.clone());
    }
}

/// 标准输出 sink
#[cfg(feature = "stdout")]
pub struct StdoutSink;

#[cfg(feature = "stdout")]
impl LogSink for StdoutSink {
    fn write(&self, record: &Record) {
        println!("{}", record.format());
    }
}

/// 标准错误 sink
#[cfg(feature = "stderr")]
pub struct StderrSink;

#[cfg(feature = "stderr")]
impl LogSink for StderrSink {
    fn write(&self, record: &Record) {
        eprintln!("{}", record.format());
    }
}

/// 文件 sink（追加模式）
#[cfg(feature = "file")]
pub struct FileSink {
    file: Mutex<std::fs::File>,
}

#[cfg(feature = "file")]
impl FileSink {
    pub fn new(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(FileSink {
            file: Mutex::new(file),
        })
    }
}

#[cfg(feature = "file")]
impl LogSink for FileSink {
    fn write(&self, record: &Record) {
        use std::io::Write;
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{}", record.format());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogRingBuffer;

    #[test]
    fn test_logger_creation() {
        let logger = Logger::new(Level::Debug);
        assert_eq!(logger.level(), Level::Debug);
        assert!(logger.is_enabled(Level::Debug));
        assert!(!logger.is_enabled(Level::Trace));
    }

    #[test]
    fn test_level_change() {
        let logger = Logger::new(Level::Info);
        assert!(!logger.is_enabled(Level::Debug));
        logger.set_level(Level::Debug);
        assert!(logger.is_enabled(Level::Debug));
    }

    #[test]
    fn test_span_guard_nesting() {
        let logger = Logger::new(Level::Debug);
        {
            let outer = logger.enter_span("evaluate");
            assert_eq!(logger.span_depth(), 1);
            {
                let inner = logger.enter_span("import");
                assert_eq!(logger.span_depth(), 2);
                drop(inner);
            }
            assert_eq!(logger.span_depth(), 1);
            drop(outer);
        }
        assert_eq!(logger.span_depth(), 0);
    }

    #[test]
    fn test_log_disabled_level() {
        let ring = LogRingBuffer::new(16);
        let logger = Logger::new(Level::Warn).with_sink(ring.clone());
        logger.log(Level::Debug, "test", "hidden");
        assert_eq!(ring.len(), 0);
        logger.log(Level::Warn, "test", "shown");
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn test_record_carries_innermost_span() {
        let ring = LogRingBuffer::new(16);
        let logger = Logger::new(Level::Debug).with_sink(ring.clone());
        logger.log(Level::Info, "test", "outside");
        {
            let guard = logger.enter_span("import");
            logger.log(Level::Info, "test", "inside");
            drop(guard);
        }
        let records = ring.dump_records();
        assert_eq!(records[0].span_id, None);
        assert!(records[1].span_id.is_some());
    }

    #[test]
    fn test_chained_logger() {
        let ring = LogRingBuffer::new(16);
        let inner = Logger::new(Level::Debug).with_sink(ring.clone());
        let outer = Logger::new(Level::Debug).with_sink(inner);
        outer.log(Level::Info, "chain", "forwarded");
        assert_eq!(ring.dump_records()[0].message, "forwarded");
    }

    #[cfg(feature = "file")]
    #[test]
    fn test_file_sink_appends() {
        let path = std::env::temp_dir().join(format!("jsonlang_log_{}.tmp", std::process::id()));
        {
            let sink = FileSink::new(&path).unwrap();
            sink.write(&Record::new(Level::Error, "test", "first line"));
        }
        {
            let sink = FileSink::new(&path).unwrap();
            sink.write(&Record::new(Level::Info, "test", "second line"));
        }
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("first line"));
        assert!(content.contains("second line"));
        assert!(content.contains("ERROR"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_noop_logger_discards() {
        let logger = Logger::noop();
        assert!(!logger.is_enabled(Level::Warn));
        logger.log(Level::Error, "test", "nowhere to go");
    }
}
