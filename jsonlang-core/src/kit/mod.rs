//! 与语言无关的基础工具

pub mod lexer;
pub mod strings;
