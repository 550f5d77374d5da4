//! 编译管线：源码 -> token -> Raw AST -> Core AST -> 已解析槽位的 Core AST

pub mod analyzer;
pub mod desugar;
pub mod error;
pub mod lexer;
pub mod parser;

pub use analyzer::{AnalysisError, AnalysisErrorKind};
pub use desugar::core::{Core, CoreExpr, CoreKind};
pub use error::StaticError;

use crate::kit::lexer::Lexer;
use jsonlang_log::{debug, Logger};
use parser::{Expr, Parser};
use std::sync::Arc;

/// 词法 + 语法分析，得到保留语法糖的 Raw AST（源码格式化器使用）
pub fn parse_source(file: &str, text: &str, logger: &Arc<Logger>) -> Result<Expr, StaticError> {
    let tokens = Lexer::with_logger(Arc::clone(logger)).tokenize(file, text)?;
    let ast = Parser::with_logger(tokens, Arc::clone(logger)).parse()?;
    Ok(ast)
}

/// 编译一个单元（主文件、导入文件、extVar / TLA 代码）
pub fn compile(file: &str, text: &str, logger: &Arc<Logger>) -> Result<CoreExpr, StaticError> {
    debug!(logger, "Compiling {}", file);
    let ast = parse_source(file, text, logger)?;
    let core = desugar::desugar(&ast);
    debug!(logger, "Desugared {}", file);
    analyzer::analyze(&core)?;
    debug!(logger, "Analyzed {}", file);
    Ok(core)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_ok() {
        let r = compile("main", "local x = { a: 1 }; x.a + 1", &Logger::noop());
        assert!(r.is_ok(), "Compile failed: {:?}", r.err());
    }

    #[test]
    fn test_compile_reports_each_phase() {
        let logger = Logger::noop();
        let lex = compile("main", "\"open", &logger).unwrap_err();
        assert!(matches!(lex, StaticError::Lexer(_)));
        let parse = compile("main", "[1,", &logger).unwrap_err();
        assert!(matches!(parse, StaticError::Parser(_)));
        let analysis = compile("main", "y", &logger).unwrap_err();
        assert!(matches!(analysis, StaticError::Analysis(_)));
        assert_eq!(analysis.message(), "Unknown variable: y");
        assert_eq!(analysis.phase(), jsonlang_config::Phase::Analyzer);
    }
}
