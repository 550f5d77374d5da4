//! 日志宏

/// 记录 Trace 级别日志
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)*) => {
        $crate::log!($logger, $crate::Level::Trace, $($arg)*)
    };
}

/// 记录 Debug 级别日志
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)*) => {
        $crate::log!($logger, $crate::Level::Debug, $($arg)*)
    };
}

/// 记录 Info 级别日志
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)*) => {
        $crate::log!($logger, $crate::Level::Info, $($arg)*)
    };
}

/// 记录 Warn 级别日志
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)*) => {
        $crate::log!($logger, $crate::Level::Warn, $($arg)*)
    };
}

/// 记录 Error 级别日志
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)*) => {
        $crate::log!($logger, $crate::Level::Error, $($arg)*)
    };
}

/// 通用日志宏：先检查级别，启用时才格式化消息
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)*) => {{
        if $logger.is_enabled($level) {
            let message = ::std::format!($($arg)*);
            $logger.log($level, ::std::module_path!(), message);
        }
    }};
}

#[cfg(test)]
mod tests {
    use crate::{Level, LogRingBuffer, Logger};

    #[test]
    fn test_trace_macro() {
        let ring = LogRingBuffer::new(100);
        let logger = Logger::new(Level::Trace).with_sink(ring.clone());

        trace!(logger, "test trace");
        trace!(logger, "formatted {}", "value");

        let records = ring.dump_records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.level == Level::Trace));
        assert_eq!(records[1].message, "formatted value");
    }

    #[test]
    fn test_macro_target_is_module_path() {
        let ring = LogRingBuffer::new(10);
        let logger = Logger::new(Level::Debug).with_sink(ring.clone());
        debug!(logger, "x = {}", 1);
        assert_eq!(ring.dump_records()[0].target, module_path!());
    }

    #[test]
    fn test_disabled_macro_skips_formatting() {
        let ring = LogRingBuffer::new(10);
        let logger = Logger::new(Level::Error).with_sink(ring.clone());
        let mut evaluated = false;
        info!(logger, "{}", {
            evaluated = true;
            "side effect"
        });
        assert!(!evaluated);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_all_levels() {
        let ring = LogRingBuffer::new(10);
        let logger = Logger::new(Level::Trace).with_sink(ring.clone());
        trace!(logger, "t");
        debug!(logger, "d");
        info!(logger, "i");
        warn!(logger, "w");
        error!(logger, "e");
        let levels: Vec<_> = ring.dump_records().iter().map(|r| r.level).collect();
        assert_eq!(
            levels,
            [Level::Trace, Level::Debug, Level::Info, Level::Warn, Level::Error]
        );
    }
}
