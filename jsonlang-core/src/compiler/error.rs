use super::analyzer::AnalysisError;
use super::parser::ParserError;
use crate::kit::lexer::{LexerError, SourceSpan};

/// 编译期错误：任何求值发生之前失败
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StaticError {
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error(transparent)]
    Parser(#[from] ParserError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl StaticError {
    pub fn span(&self) -> &SourceSpan {
        match self {
            StaticError::Lexer(e) => &e.span,
            StaticError::Parser(e) => &e.span,
            StaticError::Analysis(e) => &e.span,
        }
    }

    /// 不带位置的错误消息
    pub fn message(&self) -> String {
        match self {
            StaticError::Lexer(e) => e.message.clone(),
            StaticError::Parser(e) => e.kind.to_string(),
            StaticError::Analysis(e) => e.kind.to_string(),
        }
    }

    pub fn phase(&self) -> jsonlang_config::Phase {
        match self {
            StaticError::Lexer(_) => jsonlang_config::Phase::Lexer,
            StaticError::Parser(_) => jsonlang_config::Phase::Parser,
            StaticError::Analysis(_) => jsonlang_config::Phase::Analyzer,
        }
    }
}
