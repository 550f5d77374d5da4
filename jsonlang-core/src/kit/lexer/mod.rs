//! Jsonlang Lexer
//!
//! 设计目标：
//! - O(n)复杂度，无动态分发
//! - 统一 Scanner trait
//! - 精准位置追踪（行、列、字节偏移）

pub mod error;
pub mod jsonlang;
pub mod lexer;
pub mod position;
pub mod scanner;
pub mod stream;

pub use error::{ErrorKind, LexerError};
pub use jsonlang::JsonlangScanner;
pub use lexer::Lexer;
pub use position::{SourcePosition, SourceSpan};
pub use scanner::{ScanResult, Scanner, Token};
pub use stream::CharStream;
