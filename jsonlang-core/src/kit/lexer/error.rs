//! Lexer 错误类型
//!
//! 提供结构化的词法错误信息，包含错误类型、位置和详细消息。

use super::position::SourceSpan;

/// 错误类型
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// 非法字符
    InvalidChar(char),
    /// 未终止的字符串
    UnterminatedString,
    /// 未终止的文本块 `|||`
    UnterminatedTextBlock,
    /// 文本块格式错误（缺少换行或缩进）
    MalformedTextBlock(&'static str),
    /// 未终止的块注释
    UnterminatedComment,
    /// 非法转义序列
    InvalidEscape(String),
    /// `\u` 后不足四位十六进制数字
    TruncatedUnicodeEscape,
    /// 落单的 UTF-16 代理项
    UnpairedSurrogate(String),
    /// 数字格式错误
    InvalidNumber(String),
}

/// 词法错误
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{span}: {message}")]
pub struct LexerError {
    pub kind: ErrorKind,
    pub span: SourceSpan,
    pub message: String,
}

impl LexerError {
    /// 在指定区间创建错误
    pub fn at(kind: ErrorKind, span: SourceSpan) -> Self {
        let message = Self::format_message(&kind);
        Self {
            kind,
            span,
            message,
        }
    }

    /// 获取行号（1-based）
    pub fn line(&self) -> usize {
        self.span.start.line
    }

    /// 获取列号（1-based）
    pub fn column(&self) -> usize {
        self.span.start.column
    }

    fn format_message(kind: &ErrorKind) -> String {
        match kind {
            ErrorKind::InvalidChar(ch) => format!("Could not lex the character '{ch}'"),
            ErrorKind::UnterminatedString => "Unterminated string".to_string(),
            ErrorKind::UnterminatedTextBlock => "Unexpected EOF in text block".to_string(),
            ErrorKind::MalformedTextBlock(reason) => format!("Text block {reason}"),
            ErrorKind::UnterminatedComment => "Multi-line comment has no terminating */.".to_string(),
            ErrorKind::InvalidEscape(seq) => format!("Unknown escape sequence in string literal: '{seq}'"),
            ErrorKind::TruncatedUnicodeEscape => {
                "Truncated unicode escape sequence in string literal".to_string()
            }
            ErrorKind::UnpairedSurrogate(seq) => format!("Unpaired surrogate in string literal: '{seq}'"),
            ErrorKind::InvalidNumber(reason) => format!("Couldn't lex number, {reason}"),
        }
    }
}
