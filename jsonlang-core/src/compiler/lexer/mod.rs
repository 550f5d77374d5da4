//! 词法分析（token 定义；扫描器位于 `kit::lexer`）

pub mod token_kind;

pub use token_kind::TokenKind;
