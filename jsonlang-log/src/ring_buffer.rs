//! 日志专用环形缓冲区

use crate::logger::LogSink;
use crate::record::Record;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// 环形缓冲区统计信息
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RingBufferStats {
    pub record_count: usize,
    /// 因缓冲区满而丢弃的记录数
    pub dropped_count: usize,
    pub capacity: usize,
}

/// 日志环形缓冲区
///
/// 满了之后新记录覆盖最旧的记录（FIFO）。
pub struct LogRingBuffer {
    inner: Mutex<VecDeque<Record>>,
    capacity: usize,
    dropped: AtomicUsize,
}

impl LogRingBuffer {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(LogRingBuffer {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            dropped: AtomicUsize::new(0),
        })
    }

    fn push(&self, record: Record) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if self.capacity == 0 {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        if inner.len() >= self.capacity {
            inner.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        inner.push_back(record);
    }

    /// 当前所有记录（按时间顺序）
    pub fn dump_records(&self) -> Vec<Record> {
        self.inner
            .lock()
            .map(|inner| inner.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 转储为多行文本
    pub fn dump(&self) -> String {
        self.dump_records()
            .iter()
            .map(Record::format)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// 是否有某条消息包含给定文本
    pub fn contains(&self, needle: &str) -> bool {
        self.dump_records().iter().any(|r| r.message.contains(needle))
    }

    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.clear();
        }
        self.dropped.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> RingBufferStats {
        RingBufferStats {
            record_count: self.len(),
            dropped_count: self.dropped_count(),
            capacity: self.capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn dropped_count(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl LogSink for LogRingBuffer {
    fn write(&self, record: &Record) {
        self.push(record.clone());
    }
}

impl LogSink for Arc<LogRingBuffer> {
    fn write(&self, record: &Record) {
        self.push(record.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Level;

    #[test]
    fn test_basic_operations() {
        let buffer = LogRingBuffer::new(3);
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 3);

        buffer.push(Record::new(Level::Info, "test", "msg1"));
        buffer.push(Record::new(Level::Info, "test", "msg2"));
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.dropped_count(), 0);
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let buffer = LogRingBuffer::new(3);
        for i in 0..5 {
            buffer.push(Record::new(Level::Info, "test", format!("msg{i}")));
        }
        let records = buffer.dump_records();
        let messages: Vec<_> = records.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, ["msg2", "msg3", "msg4"]);
        assert_eq!(buffer.stats().dropped_count, 2);
    }

    #[test]
    fn test_zero_capacity_drops_everything() {
        let buffer = LogRingBuffer::new(0);
        buffer.push(Record::new(Level::Info, "test", "gone"));
        assert!(buffer.is_empty());
        assert_eq!(buffer.dropped_count(), 1);
    }

    #[test]
    fn test_dump_and_contains() {
        let buffer = LogRingBuffer::new(8);
        buffer.write(&Record::new(Level::Debug, "jsonlang::vm", "import cache hit"));
        buffer.write(&Record::new(Level::Warn, "jsonlang::vm", "stack limit"));
        assert!(buffer.contains("cache hit"));
        assert!(!buffer.contains("missing"));
        let text = buffer.dump();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("WARN jsonlang::vm: stack limit"));
    }

    #[test]
    fn test_clear_resets_stats() {
        let buffer = LogRingBuffer::new(1);
        buffer.push(Record::new(Level::Info, "test", "a"));
        buffer.push(Record::new(Level::Info, "test", "b"));
        buffer.clear();
        assert_eq!(buffer.stats(), RingBufferStats { record_count: 0, dropped_count: 0, capacity: 1 });
    }
}
