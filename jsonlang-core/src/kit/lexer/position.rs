//! 源代码位置追踪
//!
//! - line/column: 人类可读的错误显示（1-based，列按 Unicode 码点计数）
//! - byte_offset: 切片与跳转（0-based，UTF-8）

use std::fmt;
use std::sync::Arc;

/// 源代码位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct SourcePosition {
    /// 行号，1-based
    pub line: usize,
    /// 列号，1-based，Unicode码点计数
    pub column: usize,
    /// 字节偏移，0-based
    pub byte_offset: usize,
}

impl SourcePosition {
    pub fn new(line: usize, column: usize, byte_offset: usize) -> Self {
        Self {
            line,
            column,
            byte_offset,
        }
    }

    /// 文件起始位置
    pub fn start() -> Self {
        Self::new(1, 1, 0)
    }

    /// 前进一个字符
    pub fn advance(&mut self, c: char) {
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.byte_offset += c.len_utf8();
    }
}

/// 源代码区间（Span）
///
/// `end` 指向区间最后一个字符之后的位置。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpan {
    /// 文件名（导入单元为规范路径）
    pub file: Arc<str>,
    pub start: SourcePosition,
    pub end: SourcePosition,
}

impl SourceSpan {
    pub fn new(file: Arc<str>, start: SourcePosition, end: SourcePosition) -> Self {
        Self { file, start, end }
    }

    /// 单点区间
    pub fn at(file: Arc<str>, pos: SourcePosition) -> Self {
        Self {
            file,
            start: pos,
            end: pos,
        }
    }

    /// 合并两个区间：从 self 的起点到 other 的终点
    pub fn to(&self, other: &SourceSpan) -> Self {
        Self {
            file: Arc::clone(&self.file),
            start: self.start,
            end: other.end,
        }
    }

    pub fn line(&self) -> usize {
        self.start.line
    }

    pub fn column(&self) -> usize {
        self.start.column
    }
}

impl fmt::Display for SourceSpan {
    /// `file:line:col`、`file:line:c1-c2` 或 `file:(l1:c1)-(l2:c2)`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.file)?;
        if self.start.line == self.end.line {
            if self.end.column <= self.start.column + 1 {
                write!(f, "{}:{}", self.start.line, self.start.column)
            } else {
                write!(
                    f,
                    "{}:{}-{}",
                    self.start.line, self.start.column, self.end.column
                )
            }
        } else {
            write!(
                f,
                "({}:{})-({}:{})",
                self.start.line, self.start.column, self.end.line, self.end.column
            )
        }
    }
}
