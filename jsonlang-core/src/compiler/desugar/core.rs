//! 核心语法树（Core AST）
//!
//! 脱糖后的精简节点集。节点以 `Rc` 共享（对象的 local 会被复制进每个字段体），
//! 变量的槽位由静态分析阶段原地写入。

use crate::compiler::parser::ast::{BinaryOp, UnaryOp, Visibility};
use crate::kit::lexer::SourceSpan;
use std::cell::Cell;
use std::rc::Rc;

pub type CoreExpr = Rc<Core>;

#[derive(Debug)]
pub struct Core {
    pub kind: CoreKind,
    pub span: SourceSpan,
}

impl Core {
    pub fn new(kind: CoreKind, span: SourceSpan) -> CoreExpr {
        Rc::new(Self { kind, span })
    }
}

/// 词法槽位：向外 `depth` 层环境帧中的第 `index` 个绑定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub depth: usize,
    pub index: usize,
}

/// 变量引用
#[derive(Debug)]
pub struct Var {
    pub name: Rc<str>,
    pub slot: Cell<Option<Slot>>,
}

impl Var {
    pub fn new(name: impl Into<Rc<str>>) -> Self {
        Self {
            name: name.into(),
            slot: Cell::new(None),
        }
    }
}

#[derive(Debug)]
pub struct CoreField {
    /// 在对象外层作用域求值；结果为 null 时跳过该字段
    pub name: CoreExpr,
    pub visibility: Visibility,
    pub body: CoreExpr,
}

#[derive(Debug)]
pub struct CoreParam {
    pub name: Rc<str>,
    /// 在被调函数的参数帧中求值
    pub default: Option<CoreExpr>,
}

#[derive(Debug)]
pub struct CoreBind {
    pub name: Rc<str>,
    pub body: CoreExpr,
}

#[derive(Debug)]
pub enum CoreKind {
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Var(Var),
    SelfRef,
    /// `super[e]`
    SuperIndex(CoreExpr),
    /// `e in super`
    InSuper(CoreExpr),
    Array(Vec<CoreExpr>),
    Object {
        asserts: Vec<CoreExpr>,
        fields: Vec<CoreField>,
    },
    /// 每个元素开一帧（仅一个槽位 `var`），`name` 不带 self，`value` 带 self
    ObjectComp {
        var: Rc<str>,
        name: CoreExpr,
        value: CoreExpr,
        array: CoreExpr,
    },
    Index {
        target: CoreExpr,
        index: CoreExpr,
    },
    Apply {
        target: CoreExpr,
        positional: Vec<CoreExpr>,
        named: Vec<(Rc<str>, CoreExpr)>,
        tailstrict: bool,
    },
    /// `%` 与 `in` 已被脱糖为 std 调用
    Binary {
        op: BinaryOp,
        left: CoreExpr,
        right: CoreExpr,
    },
    Unary {
        op: UnaryOp,
        operand: CoreExpr,
    },
    /// 一组互相可见的绑定，共享一帧
    Local {
        binds: Rc<[CoreBind]>,
        body: CoreExpr,
    },
    If {
        cond: CoreExpr,
        then_branch: CoreExpr,
        else_branch: CoreExpr,
    },
    Function {
        params: Rc<[CoreParam]>,
        body: CoreExpr,
    },
    /// `assertion` 区分 `assert` 失败与用户 `error`
    Error {
        message: CoreExpr,
        assertion: bool,
    },
    Import(Rc<str>),
    ImportStr(Rc<str>),
}

impl CoreKind {
    /// 调试与日志用的节点名
    pub fn name(&self) -> &'static str {
        match self {
            CoreKind::Null => "null",
            CoreKind::Bool(_) => "bool",
            CoreKind::Number(_) => "number",
            CoreKind::Str(_) => "string",
            CoreKind::Var(_) => "var",
            CoreKind::SelfRef => "self",
            CoreKind::SuperIndex(_) => "super index",
            CoreKind::InSuper(_) => "in super",
            CoreKind::Array(_) => "array",
            CoreKind::Object { .. } => "object",
            CoreKind::ObjectComp { .. } => "object comprehension",
            CoreKind::Index { .. } => "index",
            CoreKind::Apply { .. } => "apply",
            CoreKind::Binary { .. } => "binary",
            CoreKind::Unary { .. } => "unary",
            CoreKind::Local { .. } => "local",
            CoreKind::If { .. } => "if",
            CoreKind::Function { .. } => "function",
            CoreKind::Error { .. } => "error",
            CoreKind::Import(_) => "import",
            CoreKind::ImportStr(_) => "importstr",
        }
    }
}
