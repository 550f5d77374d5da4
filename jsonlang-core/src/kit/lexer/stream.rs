//! 字符流抽象
//!
//! 将源文本转换为 Unicode 字符流，支持位置追踪、预读和切片。

use super::position::SourcePosition;

/// 字符流
pub struct CharStream<'a> {
    text: &'a str,
    /// 预解码的字符表（下标即码点序号）
    chars: Vec<char>,
    index: usize,
    position: SourcePosition,
}

impl<'a> CharStream<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.chars().collect(),
            index: 0,
            position: SourcePosition::start(),
        }
    }

    /// 获取当前位置
    pub fn position(&self) -> SourcePosition {
        self.position
    }

    /// 是否已到达末尾
    pub fn is_eof(&self) -> bool {
        self.index >= self.chars.len()
    }

    /// 预读第 n 个字符（不消费）
    pub fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).copied()
    }

    /// 读取并消费一个字符
    pub fn advance(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        self.index += 1;
        self.position.advance(c);
        Some(c)
    }

    /// 检查当前字符是否匹配（不消费）
    pub fn check(&self, expected: char) -> bool {
        self.peek(0) == Some(expected)
    }

    /// 当前字符匹配时消费
    pub fn match_char(&mut self, expected: char) -> bool {
        if self.check(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// 检查接下来的字符是否为给定前缀
    pub fn starts_with(&self, prefix: &str) -> bool {
        prefix
            .chars()
            .enumerate()
            .all(|(i, c)| self.peek(i) == Some(c))
    }

    /// 按字节区间截取原文
    pub fn slice(&self, start: SourcePosition, end: SourcePosition) -> &'a str {
        &self.text[start.byte_offset..end.byte_offset]
    }
}
