//! 原始语法树（Raw AST）
//!
//! 解析器的直接产物，保留全部语法糖，供脱糖器和源码格式化器使用。
//! 每个节点都携带源码区间。

use crate::kit::lexer::SourceSpan;

pub type Expr = Box<ExprNode>;

/// 带区间的表达式节点
#[derive(Debug, Clone, PartialEq)]
pub struct ExprNode {
    pub kind: ExprKind,
    pub span: SourceSpan,
}

impl ExprNode {
    pub fn new(kind: ExprKind, span: SourceSpan) -> Expr {
        Box::new(Self { kind, span })
    }

    /// 直接子表达式（含参数默认值、对象成员和推导式子句）
    pub fn children(&self) -> Vec<&ExprNode> {
        let mut out: Vec<&ExprNode> = Vec::new();
        match &self.kind {
            ExprKind::Null
            | ExprKind::True
            | ExprKind::False
            | ExprKind::SelfRef
            | ExprKind::Dollar
            | ExprKind::Number { .. }
            | ExprKind::Str { .. }
            | ExprKind::Var(_)
            | ExprKind::SuperField(_)
            | ExprKind::Import(_)
            | ExprKind::ImportStr(_) => {}
            ExprKind::Array(items) => out.extend(items.iter().map(|e| &**e)),
            ExprKind::ArrayComp { body, specs } => {
                out.push(body);
                push_specs(&mut out, specs);
            }
            ExprKind::Object(members) => push_members(&mut out, members),
            ExprKind::ObjectComp { members, specs } => {
                push_members(&mut out, members);
                push_specs(&mut out, specs);
            }
            ExprKind::Field { target, .. } => out.push(target),
            ExprKind::Index { target, index } => out.extend([&**target, &**index]),
            ExprKind::Slice {
                target,
                start,
                end,
                step,
            } => {
                out.push(target);
                out.extend([start, end, step].into_iter().flatten().map(|e| &**e));
            }
            ExprKind::SuperIndex(e) | ExprKind::InSuper(e) | ExprKind::Error(e) | ExprKind::Parens(e) => {
                out.push(e)
            }
            ExprKind::Apply { target, args, .. } => {
                out.push(target);
                out.extend(args.positional.iter().map(|e| &**e));
                out.extend(args.named.iter().map(|(_, e)| &**e));
            }
            ExprKind::ApplyBrace { left, right } | ExprKind::Binary { left, right, .. } => {
                out.extend([&**left, &**right])
            }
            ExprKind::Unary { operand, .. } => out.push(operand),
            ExprKind::Local { binds, body } => {
                for bind in binds {
                    push_bind(&mut out, bind);
                }
                out.push(body);
            }
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                out.extend([&**cond, &**then_branch]);
                out.extend(else_branch.as_deref());
            }
            ExprKind::Function { params, body } => {
                push_params(&mut out, params);
                out.push(body);
            }
            ExprKind::Assert { cond, message, rest } => {
                out.push(cond);
                out.extend(message.as_deref());
                out.push(rest);
            }
        }
        out
    }
}

fn push_params<'a>(out: &mut Vec<&'a ExprNode>, params: &'a [Param]) {
    out.extend(params.iter().filter_map(|p| p.default.as_deref()));
}

fn push_bind<'a>(out: &mut Vec<&'a ExprNode>, bind: &'a Bind) {
    if let Some(params) = &bind.params {
        push_params(out, params);
    }
    out.push(&bind.body);
}

fn push_specs<'a>(out: &mut Vec<&'a ExprNode>, specs: &'a [CompSpec]) {
    for spec in specs {
        match spec {
            CompSpec::For { expr, .. } | CompSpec::If(expr) => out.push(expr),
        }
    }
}

fn push_members<'a>(out: &mut Vec<&'a ExprNode>, members: &'a [Member]) {
    for member in members {
        match member {
            Member::Local(bind) => push_bind(out, bind),
            Member::Assert { cond, message } => {
                out.push(cond);
                out.extend(message.as_deref());
            }
            Member::Field(field) => {
                if let FieldName::Computed(name) = &field.name {
                    out.push(name);
                }
                if let Some(params) = &field.params {
                    push_params(out, params);
                }
                out.push(&field.body);
            }
        }
    }
}

/// 字符串字面量的书写形式（格式化器用）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringForm {
    Double,
    Single,
    Block,
    VerbatimDouble,
    VerbatimSingle,
}

/// 表达式种类
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Null,
    True,
    False,
    SelfRef,
    /// `$`：最外层对象
    Dollar,
    /// 数字字面量，保留原文
    Number { value: f64, text: String },
    Str { value: String, form: StringForm },
    Var(String),
    Array(Vec<Expr>),
    ArrayComp { body: Expr, specs: Vec<CompSpec> },
    Object(Vec<Member>),
    /// `{ [k]: v for x in arr }`：成员中恰好一个字段，其余为 local
    ObjectComp { members: Vec<Member>, specs: Vec<CompSpec> },
    /// `a.b`
    Field { target: Expr, name: String },
    /// `a[b]`
    Index { target: Expr, index: Expr },
    /// `a[b:e:s]`
    Slice {
        target: Expr,
        start: Option<Expr>,
        end: Option<Expr>,
        step: Option<Expr>,
    },
    SuperField(String),
    SuperIndex(Expr),
    /// `e in super`
    InSuper(Expr),
    Apply {
        target: Expr,
        args: Args,
        tailstrict: bool,
    },
    /// `a { ... }`，等价于 `a + { ... }`
    ApplyBrace { left: Expr, right: Expr },
    Binary { op: BinaryOp, left: Expr, right: Expr },
    Unary { op: UnaryOp, operand: Expr },
    Local { binds: Vec<Bind>, body: Expr },
    If {
        cond: Expr,
        then_branch: Expr,
        else_branch: Option<Expr>,
    },
    Function { params: Vec<Param>, body: Expr },
    Assert {
        cond: Expr,
        message: Option<Expr>,
        rest: Expr,
    },
    Error(Expr),
    Import(String),
    ImportStr(String),
    Parens(Expr),
}

/// 调用参数
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Args {
    pub positional: Vec<Expr>,
    pub named: Vec<(String, Expr)>,
}

/// 函数参数（可带默认值）
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
}

/// `local` 绑定；`local f(x) = ...` 的参数放在 `params`
#[derive(Debug, Clone, PartialEq)]
pub struct Bind {
    pub name: String,
    pub params: Option<Vec<Param>>,
    pub body: Expr,
    pub span: SourceSpan,
}

/// 对象成员
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Local(Bind),
    Assert { cond: Expr, message: Option<Expr> },
    Field(Field),
}

/// 字段可见性：`:` 继承，`::` 隐藏，`:::` 强制可见
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Inherit,
    Hidden,
    Visible,
}

impl Visibility {
    pub fn colons(self) -> &'static str {
        match self {
            Visibility::Inherit => ":",
            Visibility::Hidden => "::",
            Visibility::Visible => ":::",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldName {
    /// 裸标识符
    Id(String),
    Str { value: String, form: StringForm },
    /// `[expr]`
    Computed(Expr),
}

/// 对象字段
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: FieldName,
    /// `+:` 继承拼接语法糖
    pub plus: bool,
    pub visibility: Visibility,
    /// 方法语法糖 `f(x): body`
    pub params: Option<Vec<Param>>,
    pub body: Expr,
    pub span: SourceSpan,
}

/// 推导式子句
#[derive(Debug, Clone, PartialEq)]
pub enum CompSpec {
    For { var: String, expr: Expr },
    If(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    ShiftLeft,
    ShiftRight,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Eq,
    NotEq,
    In,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
            BinaryOp::Less => "<",
            BinaryOp::LessEq => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEq => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::In => "in",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
        }
    }
}
