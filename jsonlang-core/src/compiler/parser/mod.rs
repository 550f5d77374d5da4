//! 语法分析

pub mod ast;
pub mod error;
pub mod parser;
mod utils;

pub use ast::{Expr, ExprKind, ExprNode};
pub use error::{ParseResult, ParserError, ParserErrorKind};
pub use parser::Parser;
pub use utils::op_precedence;
