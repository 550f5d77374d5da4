//! Scanner trait 定义
//!
//! 词法扫描器需实现此 trait，由 [`super::Lexer`] 驱动。

use super::error::LexerError;
use super::position::{SourcePosition, SourceSpan};
use super::stream::CharStream;

/// 词法扫描器 trait
pub trait Scanner {
    /// Token 类型
    type TokenKind: Clone + PartialEq + std::fmt::Debug;

    /// 扫描下一个 token
    ///
    /// 这是核心方法，驱动字符流并生成 token
    fn next_token(&mut self, stream: &mut CharStream<'_>) -> ScanResult<Token<Self::TokenKind>>;
}

/// Token 结构
#[derive(Debug, Clone, PartialEq)]
pub struct Token<K> {
    pub kind: K,
    pub span: SourceSpan,
    /// 文本：标识符/数字为原文，字符串为解码后的内容
    pub text: Option<String>,
}

impl<K> Token<K> {
    /// 创建新 token（不保存文本）
    pub fn new(kind: K, span: SourceSpan) -> Self {
        Self {
            kind,
            span,
            text: None,
        }
    }

    /// 创建新 token（保存文本）
    pub fn with_text(kind: K, span: SourceSpan, text: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            text: Some(text.into()),
        }
    }

    /// 获取 token 的起始位置
    pub fn start(&self) -> SourcePosition {
        self.span.start
    }

    /// 获取 token 的结束位置
    pub fn end(&self) -> SourcePosition {
        self.span.end
    }

    /// token 文本，没有时为空串
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// 扫描结果
#[derive(Debug, Clone, PartialEq)]
pub enum ScanResult<T> {
    /// 成功扫描到 token
    Token(T),
    /// 流已结束
    Eof,
    /// 扫描错误
    Error(LexerError),
}

impl<T> ScanResult<T> {
    /// 将 token 类型映射为另一种类型
    pub fn map_kind<U, F>(self, f: F) -> ScanResult<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            ScanResult::Token(t) => ScanResult::Token(f(t)),
            ScanResult::Eof => ScanResult::Eof,
            ScanResult::Error(e) => ScanResult::Error(e),
        }
    }
}

/// 标识符起始字符
pub fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// 标识符延续字符
pub fn is_identifier_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// 整个字符串是否是合法标识符（格式化器用来决定字段名是否要加引号）
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if is_identifier_start(c) => chars.all(is_identifier_continue),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    enum TestToken {
        Plus,
        Number,
    }

    fn span() -> SourceSpan {
        SourceSpan::at(Arc::from("t"), SourcePosition::start())
    }

    #[test]
    fn test_token_new() {
        let token = Token::new(TestToken::Plus, span());
        assert_eq!(token.kind, TestToken::Plus);
        assert!(token.text.is_none());
        assert_eq!(token.text(), "");
    }

    #[test]
    fn test_token_with_text() {
        let token = Token::with_text(TestToken::Number, span(), "42");
        assert_eq!(token.text(), "42");
    }

    #[test]
    fn test_scan_result_map() {
        let result: ScanResult<i32> = ScanResult::Token(42);
        let mapped = result.map_kind(|n| n.to_string());
        assert!(matches!(mapped, ScanResult::Token(s) if s == "42"));
    }

    #[test]
    fn test_identifier_helpers() {
        assert!(is_identifier_start('a'));
        assert!(is_identifier_start('_'));
        assert!(!is_identifier_start('1'));
        assert!(is_identifier_continue('1'));
        assert!(!is_identifier_continue('+'));
        assert!(is_identifier("foo_1"));
        assert!(!is_identifier("1foo"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier(""));
    }
}
