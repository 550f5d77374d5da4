//! Lexer 主入口
//!
//! 驱动 [`JsonlangScanner`]，一次性产出完整的 token 序列（末尾带 `Eof`）。
//!
//! # 示例
//!
//! ```
//! use jsonlang_core::kit::lexer::Lexer;
//! use jsonlang_core::compiler::lexer::token_kind::TokenKind;
//!
//! let tokens = Lexer::new().tokenize("main.jsonlang", "{ a: 1 }").unwrap();
//! assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
//! ```

use super::error::LexerError;
use super::jsonlang::JsonlangScanner;
use super::position::SourceSpan;
use super::scanner::{ScanResult, Scanner, Token};
use super::stream::CharStream;
use crate::compiler::lexer::token_kind::TokenKind;
use jsonlang_log::{debug, trace, warn, Logger};
use std::sync::Arc;

/// Lexer
///
/// 使用显式 logger（结构化接口优于环境依赖）
pub struct Lexer {
    logger: Arc<Logger>,
}

impl Lexer {
    /// 创建新的 Lexer（使用 noop logger）
    ///
    /// 如需自定义日志，请使用 [`Self::with_logger`]
    pub fn new() -> Self {
        Self::with_logger(Logger::noop())
    }

    /// 创建新的 Lexer（带显式 logger）
    pub fn with_logger(logger: Arc<Logger>) -> Self {
        trace!(logger, "Creating new Lexer");
        Self { logger }
    }

    /// 将整段源文本切分为 token，遇到第一个错误即停止
    pub fn tokenize(&self, file: &str, text: &str) -> Result<Vec<Token<TokenKind>>, LexerError> {
        let file: Arc<str> = Arc::from(file);
        let mut scanner = JsonlangScanner::new(Arc::clone(&file));
        let mut stream = CharStream::new(text);
        let mut tokens = Vec::new();

        loop {
            match scanner.next_token(&mut stream) {
                ScanResult::Token(token) => {
                    trace!(
                        self.logger,
                        "Produced token: kind={:?}, line={}, column={}",
                        token.kind,
                        token.span.start.line,
                        token.span.start.column
                    );
                    tokens.push(token);
                }
                ScanResult::Eof => {
                    let end = SourceSpan::at(file, stream.position());
                    tokens.push(Token::new(TokenKind::Eof, end));
                    debug!(self.logger, "Lexed {} tokens", tokens.len());
                    return Ok(tokens);
                }
                ScanResult::Error(e) => {
                    warn!(self.logger, "Lex error encountered: {}", e);
                    return Err(e);
                }
            }
        }
    }
}

impl Default for Lexer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kit::lexer::ErrorKind;
    use jsonlang_log::{Level, LogRingBuffer};

    fn lex_kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new()
            .tokenize("test", input)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            lex_kinds("local x = 1; x"),
            vec![
                TokenKind::Local,
                TokenKind::Identifier,
                TokenKind::Equal,
                TokenKind::Number,
                TokenKind::Semicolon,
                TokenKind::Identifier,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_empty_input_yields_eof() {
        assert_eq!(lex_kinds("  // nothing\n"), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_position_tracking() {
        let tokens = Lexer::new().tokenize("f.jsonlang", "a;\nb;").unwrap();
        assert_eq!(tokens[0].span.start.line, 1);
        assert_eq!(tokens[2].span.start.line, 2);
        assert_eq!(&*tokens[2].span.file, "f.jsonlang");
    }

    #[test]
    fn test_error_stops_lexing() {
        let err = Lexer::new().tokenize("test", "1 +\n 'abc").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnterminatedString);
        assert_eq!(err.line(), 2);
        assert_eq!(err.column(), 2);
    }

    #[test]
    fn test_lexer_logs_content() {
        let ring = LogRingBuffer::new(100);
        let logger = Logger::new(Level::Trace).with_sink(ring.clone());

        let lexer = Lexer::with_logger(logger);
        assert!(ring.contains("Creating new Lexer"), "Should log Lexer creation");

        ring.clear();
        lexer.tokenize("test", "null").unwrap();
        assert!(ring.contains("Produced token"), "Should log produced tokens");
        assert!(ring.contains("Lexed 2 tokens"));

        ring.clear();
        let _ = lexer.tokenize("test", "\"open");
        let records = ring.dump_records();
        assert!(records.iter().any(|r| r.level == Level::Warn && r.message.contains("Lex error")));
    }
}
