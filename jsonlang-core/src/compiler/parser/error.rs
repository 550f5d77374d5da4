use crate::kit::lexer::SourceSpan;

/// 语法错误，包含位置信息
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{span}: {kind}")]
pub struct ParserError {
    /// 错误类型
    pub kind: ParserErrorKind,
    /// 错误发生的位置
    pub span: SourceSpan,
}

/// 语法错误类型
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParserErrorKind {
    /// 意外的token
    #[error("Expected {} but got {found}", .expected.join(" or "))]
    UnexpectedToken {
        found: String,
        expected: Vec<String>,
    },
    /// 期望表达式
    #[error("Unexpected: {0} while parsing terminal")]
    ExpectedExpression(String),
    /// 无效的数字格式
    #[error("Invalid number format: '{0}'")]
    InvalidNumberFormat(String),
    /// 重复的函数参数
    #[error("Duplicate function parameter: {0}")]
    DuplicateParameter(String),
    /// 同一个 local 中重复绑定
    #[error("Duplicate local var: {0}")]
    DuplicateLocal(String),
    /// 对象字面量中重复的常量字段名
    #[error("Duplicate field: {0}")]
    DuplicateField(String),
    /// 命名参数之后出现位置参数
    #[error("Positional argument after a named argument is not allowed")]
    PositionalAfterNamed,
    /// 对象推导式格式错误
    #[error("Object comprehension {0}")]
    MalformedComprehension(&'static str),
    /// `import` 后只能跟字符串字面量
    #[error("Computed imports are not allowed")]
    ComputedImport,
    /// `super` 只能用于 `super.f`、`super[e]` 和 `e in super`
    #[error("Expected . or [ after super")]
    BareSuper,
    /// 嵌套层数超过上限
    #[error("Exceeded maximum nesting depth of {0}")]
    TooDeep(usize),
}

/// 结果类型别名
pub type ParseResult<T> = Result<T, ParserError>;

impl ParserError {
    /// 在指定区间创建错误
    pub fn at(kind: ParserErrorKind, span: SourceSpan) -> Self {
        Self { kind, span }
    }

    /// 获取行号
    pub fn line(&self) -> usize {
        self.span.start.line
    }

    /// 获取列号
    pub fn column(&self) -> usize {
        self.span.start.column
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kit::lexer::SourcePosition;
    use std::sync::Arc;

    fn span() -> SourceSpan {
        SourceSpan::new(
            Arc::from("p.jsonlang"),
            SourcePosition::new(2, 4, 10),
            SourcePosition::new(2, 5, 11),
        )
    }

    #[test]
    fn test_error_display_unexpected_token() {
        let err = ParserError::at(
            ParserErrorKind::UnexpectedToken {
                found: "}".to_string(),
                expected: vec![")".to_string(), ",".to_string()],
            },
            span(),
        );
        assert_eq!(err.to_string(), "p.jsonlang:2:4: Expected ) or , but got }");
        assert_eq!(err.line(), 2);
        assert_eq!(err.column(), 4);
    }

    #[test]
    fn test_error_display_duplicate_parameter() {
        let err = ParserError::at(ParserErrorKind::DuplicateParameter("x".to_string()), span());
        assert!(err.to_string().ends_with("Duplicate function parameter: x"));
    }
}
