//! 运行时错误

use crate::compiler::StaticError;
use crate::kit::lexer::SourceSpan;
use std::fmt;
use std::rc::Rc;

/// 运行时错误类别
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// 强制求值一个正在求值中的 thunk
    CircularReference,
    /// 超过 `max_stack`
    StackOverflow,
    /// 操作数类型不符
    TypeMismatch,
    /// 用户代码 `error`
    UserError,
    /// `assert` 失败
    AssertionFailed,
    /// 宿主原生函数返回错误
    NativeFailure { name: String },
    ImportNotFound,
    /// 导入回调自身报错
    ImportFailed,
    /// 导入单元或 ext 代码中的语法 / 作用域错误
    Static,
    /// 值无法输出为 JSON
    Manifest,
    /// 其余求值错误（越界、字段不存在、除零……）
    Evaluation,
}

impl RuntimeErrorKind {
    pub fn tag(&self) -> &'static str {
        match self {
            RuntimeErrorKind::CircularReference => "circular_reference",
            RuntimeErrorKind::StackOverflow => "stack_overflow",
            RuntimeErrorKind::TypeMismatch => "type_mismatch",
            RuntimeErrorKind::UserError => "user_error",
            RuntimeErrorKind::AssertionFailed => "assertion_failed",
            RuntimeErrorKind::NativeFailure { .. } => "native_failure",
            RuntimeErrorKind::ImportNotFound => "import_not_found",
            RuntimeErrorKind::ImportFailed => "import_failed",
            RuntimeErrorKind::Static => "static",
            RuntimeErrorKind::Manifest => "manifest",
            RuntimeErrorKind::Evaluation => "evaluation",
        }
    }
}

/// 调用栈中的一行：位置 + 所在函数 / thunk 的描述
#[derive(Debug, Clone, PartialEq)]
pub struct TraceFrame {
    pub span: SourceSpan,
    pub name: String,
}

impl fmt::Display for TraceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.span)
        } else {
            write!(f, "{}\t{}", self.span, self.name)
        }
    }
}

/// 栈帧的描述，渲染为 trace 中的第二列
#[derive(Debug, Clone, PartialEq)]
pub enum FrameName {
    Function(Option<Rc<str>>),
    Builtin(&'static str),
    Thunk(Rc<str>),
    Field(Rc<str>),
    Import(Rc<str>),
    Object,
    Array,
}

impl fmt::Display for FrameName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameName::Function(Some(name)) => write!(f, "function <{name}>"),
            FrameName::Function(None) => f.write_str("function <anonymous>"),
            FrameName::Builtin(name) => write!(f, "builtin function <{name}>"),
            FrameName::Thunk(name) => write!(f, "thunk <{name}>"),
            FrameName::Field(name) => write!(f, "field <{name}>"),
            FrameName::Import(path) => write!(f, "import <{path}>"),
            FrameName::Object => f.write_str("object <anonymous>"),
            FrameName::Array => f.write_str("array <anonymous>"),
        }
    }
}

/// 求值期错误，`trace[0]` 为最内层（出错位置）
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub message: String,
    pub trace: Vec<TraceFrame>,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, message: impl Into<String>, trace: Vec<TraceFrame>) -> Self {
        Self {
            kind,
            message: message.into(),
            trace,
        }
    }

    /// 最内层位置
    pub fn span(&self) -> Option<&SourceSpan> {
        self.trace.first().map(|frame| &frame.span)
    }
}

/// 一次求值可能产生的全部错误
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error(transparent)]
    Static(#[from] StaticError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub type EvalResult<T> = Result<T, RuntimeError>;
