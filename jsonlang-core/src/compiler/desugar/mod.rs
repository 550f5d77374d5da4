//! 脱糖：Raw AST -> Core AST
//!
//! 纯函数、不会失败。改写规则：
//! - `a.b` -> `a["b"]`，`super.b` -> `super["b"]`，`a { .. }` -> `a + { .. }`
//! - `a % b` -> `$std.mod(a, b)`，`a in b` -> `$std.objectHasAll(b, a)`
//! - 切片 -> `$std.slice(a, b, e, s)`，推导式 -> `$std.flatMap(..)` 链
//! - `f +: e` -> `f: if "f" in super then super["f"] + e else e`
//! - 对象 local 与 `$` 复制进每个字段体和断言
//! - `assert c : m; e` -> `if c then e else error m`
//!
//! `$std` 由根作用域提供，用户代码无法遮蔽。

pub mod core;

use self::core::{Core, CoreBind, CoreExpr, CoreField, CoreKind, CoreParam, Var};
use super::parser::ast::{
    BinaryOp, Bind, CompSpec, Expr, ExprKind, ExprNode, Field, FieldName, Member, Param,
};
use crate::kit::lexer::SourceSpan;
use std::rc::Rc;

/// 用户可见的标准库名
pub const STD: &str = "std";
/// 脱糖插入的标准库引用
pub const STD_INTERNAL: &str = "$std";
/// 最外层对象
pub const DOLLAR: &str = "$";
/// 多重 `for` 对象推导式的元组变量
const COMP_VAR: &str = "$comp";

const DEFAULT_ASSERT_MESSAGE: &str = "Assertion failed.";
const DEFAULT_OBJECT_ASSERT_MESSAGE: &str = "Object assertion failed.";

/// 把一棵 Raw AST 脱糖为 Core AST
pub fn desugar(expr: &ExprNode) -> CoreExpr {
    Desugarer::default().expr(expr)
}

#[derive(Default)]
struct Desugarer {
    /// 当前所在的对象嵌套深度，0 表示不在任何对象体内
    object_depth: usize,
}

fn str_lit(value: &str, span: &SourceSpan) -> CoreExpr {
    Core::new(CoreKind::Str(Rc::from(value)), span.clone())
}

fn var(name: &str, span: &SourceSpan) -> CoreExpr {
    Core::new(CoreKind::Var(Var::new(name)), span.clone())
}

impl Desugarer {
    fn expr(&mut self, e: &ExprNode) -> CoreExpr {
        let span = e.span.clone();
        let kind = match &e.kind {
            ExprKind::Null => CoreKind::Null,
            ExprKind::True => CoreKind::Bool(true),
            ExprKind::False => CoreKind::Bool(false),
            ExprKind::SelfRef => CoreKind::SelfRef,
            ExprKind::Dollar => CoreKind::Var(Var::new(DOLLAR)),
            ExprKind::Number { value, .. } => CoreKind::Number(*value),
            ExprKind::Str { value, .. } => CoreKind::Str(Rc::from(value.as_str())),
            ExprKind::Var(name) => CoreKind::Var(Var::new(name.as_str())),
            ExprKind::Array(items) => CoreKind::Array(self.exprs(items)),
            ExprKind::ArrayComp { body, specs } => {
                let inner = Core::new(CoreKind::Array(vec![self.expr(body)]), span.clone());
                return self.comprehension(specs, inner, &span);
            }
            ExprKind::Object(members) => return self.object(members, &span),
            ExprKind::ObjectComp { members, specs } => {
                return self.object_comprehension(members, specs, &span)
            }
            ExprKind::Field { target, name } => CoreKind::Index {
                target: self.expr(target),
                index: str_lit(name, &span),
            },
            ExprKind::Index { target, index } => CoreKind::Index {
                target: self.expr(target),
                index: self.expr(index),
            },
            ExprKind::Slice {
                target,
                start,
                end,
                step,
            } => {
                let args = vec![
                    self.expr(target),
                    self.opt_expr(start.as_deref(), &span),
                    self.opt_expr(end.as_deref(), &span),
                    self.opt_expr(step.as_deref(), &span),
                ];
                return std_call("slice", args, &span);
            }
            ExprKind::SuperField(name) => CoreKind::SuperIndex(str_lit(name, &span)),
            ExprKind::SuperIndex(index) => CoreKind::SuperIndex(self.expr(index)),
            ExprKind::InSuper(name) => CoreKind::InSuper(self.expr(name)),
            ExprKind::Apply {
                target,
                args,
                tailstrict,
            } => CoreKind::Apply {
                target: self.expr(target),
                positional: self.exprs(&args.positional),
                named: args
                    .named
                    .iter()
                    .map(|(name, value)| (Rc::from(name.as_str()), self.expr(value)))
                    .collect(),
                tailstrict: *tailstrict,
            },
            ExprKind::ApplyBrace { left, right } => CoreKind::Binary {
                op: BinaryOp::Add,
                left: self.expr(left),
                right: self.expr(right),
            },
            ExprKind::Binary { op, left, right } => match op {
                BinaryOp::Mod => {
                    let args = vec![self.expr(left), self.expr(right)];
                    return std_call("mod", args, &span);
                }
                BinaryOp::In => {
                    let args = vec![self.expr(right), self.expr(left)];
                    return std_call("objectHasAll", args, &span);
                }
                _ => CoreKind::Binary {
                    op: *op,
                    left: self.expr(left),
                    right: self.expr(right),
                },
            },
            ExprKind::Unary { op, operand } => CoreKind::Unary {
                op: *op,
                operand: self.expr(operand),
            },
            ExprKind::Local { binds, body } => CoreKind::Local {
                binds: binds.iter().map(|b| self.bind(b)).collect::<Vec<_>>().into(),
                body: self.expr(body),
            },
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => CoreKind::If {
                cond: self.expr(cond),
                then_branch: self.expr(then_branch),
                else_branch: self.opt_expr(else_branch.as_deref(), &span),
            },
            ExprKind::Function { params, body } => self.function(params, body),
            ExprKind::Assert {
                cond,
                message,
                rest,
            } => {
                let message = match message {
                    Some(m) => self.expr(m),
                    None => str_lit(DEFAULT_ASSERT_MESSAGE, &span),
                };
                CoreKind::If {
                    cond: self.expr(cond),
                    then_branch: self.expr(rest),
                    else_branch: Core::new(
                        CoreKind::Error {
                            message,
                            assertion: true,
                        },
                        span.clone(),
                    ),
                }
            }
            ExprKind::Error(message) => CoreKind::Error {
                message: self.expr(message),
                assertion: false,
            },
            ExprKind::Import(path) => CoreKind::Import(Rc::from(path.as_str())),
            ExprKind::ImportStr(path) => CoreKind::ImportStr(Rc::from(path.as_str())),
            ExprKind::Parens(inner) => return self.expr(inner),
        };
        Core::new(kind, span)
    }

    fn exprs(&mut self, items: &[Expr]) -> Vec<CoreExpr> {
        items.iter().map(|item| self.expr(item)).collect()
    }

    /// 缺省部分补 null
    fn opt_expr(&mut self, e: Option<&ExprNode>, span: &SourceSpan) -> CoreExpr {
        match e {
            Some(e) => self.expr(e),
            None => Core::new(CoreKind::Null, span.clone()),
        }
    }

    fn function(&mut self, params: &[Param], body: &ExprNode) -> CoreKind {
        let params: Vec<CoreParam> = params
            .iter()
            .map(|p| CoreParam {
                name: Rc::from(p.name.as_str()),
                default: p.default.as_ref().map(|d| self.expr(d)),
            })
            .collect();
        CoreKind::Function {
            params: params.into(),
            body: self.expr(body),
        }
    }

    fn bind(&mut self, bind: &Bind) -> CoreBind {
        let body = match &bind.params {
            Some(params) => Core::new(self.function(params, &bind.body), bind.span.clone()),
            None => self.expr(&bind.body),
        };
        CoreBind {
            name: Rc::from(bind.name.as_str()),
            body,
        }
    }

    /// 从内向外折叠推导式子句
    fn comprehension(&mut self, specs: &[CompSpec], inner: CoreExpr, span: &SourceSpan) -> CoreExpr {
        let mut acc = inner;
        for spec in specs.iter().rev() {
            acc = match spec {
                CompSpec::If(cond) => Core::new(
                    CoreKind::If {
                        cond: self.expr(cond),
                        then_branch: acc,
                        else_branch: Core::new(CoreKind::Array(Vec::new()), span.clone()),
                    },
                    span.clone(),
                ),
                CompSpec::For { var, expr } => {
                    let func = Core::new(
                        CoreKind::Function {
                            params: vec![CoreParam {
                                name: Rc::from(var.as_str()),
                                default: None,
                            }]
                            .into(),
                            body: acc,
                        },
                        span.clone(),
                    );
                    let array = self.expr(expr);
                    std_call("flatMap", vec![func, array], span)
                }
            };
        }
        acc
    }

    fn field_name(&mut self, name: &FieldName, span: &SourceSpan) -> CoreExpr {
        match name {
            FieldName::Id(id) => str_lit(id, span),
            FieldName::Str { value, .. } => str_lit(value, span),
            FieldName::Computed(e) => self.expr(e),
        }
    }

    /// 对象体内共享的一帧：`$`（仅最外层对象）加上对象 local
    fn object_binds(&mut self, members: &[Member], outermost: bool, span: &SourceSpan) -> Rc<[CoreBind]> {
        let mut binds = Vec::new();
        if outermost {
            binds.push(CoreBind {
                name: Rc::from(DOLLAR),
                body: Core::new(CoreKind::SelfRef, span.clone()),
            });
        }
        for member in members {
            if let Member::Local(bind) = member {
                binds.push(self.bind(bind));
            }
        }
        binds.into()
    }

    fn field_body(&mut self, field: &Field) -> CoreExpr {
        match &field.params {
            Some(params) => Core::new(self.function(params, &field.body), field.span.clone()),
            None => self.expr(&field.body),
        }
    }

    fn object(&mut self, members: &[Member], span: &SourceSpan) -> CoreExpr {
        let outermost = self.object_depth == 0;

        // 字段名在对象外层作用域求值
        let names: Vec<Option<CoreExpr>> = members
            .iter()
            .map(|m| match m {
                Member::Field(f) => Some(self.field_name(&f.name, &f.span)),
                _ => None,
            })
            .collect();

        self.object_depth += 1;
        let binds = self.object_binds(members, outermost, span);

        let mut asserts = Vec::new();
        let mut fields = Vec::new();
        for (member, name) in members.iter().zip(names) {
            match member {
                Member::Local(_) => {}
                Member::Assert { cond, message } => {
                    let message = match message {
                        Some(m) => self.expr(m),
                        None => str_lit(DEFAULT_OBJECT_ASSERT_MESSAGE, span),
                    };
                    let cond_span = cond.span.clone();
                    let check = Core::new(
                        CoreKind::If {
                            cond: self.expr(cond),
                            then_branch: Core::new(CoreKind::Null, cond_span.clone()),
                            else_branch: Core::new(
                                CoreKind::Error {
                                    message,
                                    assertion: true,
                                },
                                cond_span.clone(),
                            ),
                        },
                        cond_span,
                    );
                    asserts.push(wrap_locals(&binds, check));
                }
                Member::Field(field) => {
                    let Some(name) = name else { continue };
                    let mut body = self.field_body(field);
                    if field.plus {
                        body = self.plus_field(field, body);
                    }
                    fields.push(CoreField {
                        name,
                        visibility: field.visibility,
                        body: wrap_locals(&binds, body),
                    });
                }
            }
        }
        self.object_depth -= 1;

        Core::new(CoreKind::Object { asserts, fields }, span.clone())
    }

    /// `f +: e` -> `if "f" in super then super["f"] + e else e`
    fn plus_field(&mut self, field: &Field, body: CoreExpr) -> CoreExpr {
        let span = field.span.clone();
        let name = self.field_name(&field.name, &span);
        let inherited = Core::new(
            CoreKind::Binary {
                op: BinaryOp::Add,
                left: Core::new(CoreKind::SuperIndex(Rc::clone(&name)), span.clone()),
                right: Rc::clone(&body),
            },
            span.clone(),
        );
        Core::new(
            CoreKind::If {
                cond: Core::new(CoreKind::InSuper(name), span.clone()),
                then_branch: inherited,
                else_branch: body,
            },
            span,
        )
    }

    fn object_comprehension(
        &mut self,
        members: &[Member],
        specs: &[CompSpec],
        span: &SourceSpan,
    ) -> CoreExpr {
        let field = members.iter().find_map(|m| match m {
            Member::Field(f) => Some(f),
            _ => None,
        });
        let Some((field, FieldName::Computed(name_expr))) = field.map(|f| (f, &f.name)) else {
            // 解析器保证恰好一个计算字段
            return Core::new(
                CoreKind::Object {
                    asserts: Vec::new(),
                    fields: Vec::new(),
                },
                span.clone(),
            );
        };
        let outermost = self.object_depth == 0;

        if let [CompSpec::For { var: single, expr }] = specs {
            let array = self.expr(expr);
            let name = self.expr(name_expr);
            self.object_depth += 1;
            let binds = self.object_binds(members, outermost, span);
            let value = wrap_locals(&binds, self.expr(&field.body));
            self.object_depth -= 1;
            return Core::new(
                CoreKind::ObjectComp {
                    var: Rc::from(single.as_str()),
                    name,
                    value,
                    array,
                },
                span.clone(),
            );
        }

        // 多个子句：先生成 [[x, y, ..], ..]，再在每个元素帧里解包
        let vars: Vec<&str> = specs
            .iter()
            .filter_map(|s| match s {
                CompSpec::For { var, .. } => Some(var.as_str()),
                CompSpec::If(_) => None,
            })
            .collect();
        let tuple = Core::new(
            CoreKind::Array(vars.iter().map(|v| var(v, span)).collect()),
            span.clone(),
        );
        let inner = Core::new(CoreKind::Array(vec![tuple]), span.clone());
        let array = self.comprehension(specs, inner, span);

        let name = unpack(&vars, self.expr(name_expr), span);
        self.object_depth += 1;
        let binds = self.object_binds(members, outermost, span);
        let value = unpack(&vars, wrap_locals(&binds, self.expr(&field.body)), span);
        self.object_depth -= 1;

        Core::new(
            CoreKind::ObjectComp {
                var: Rc::from(COMP_VAR),
                name,
                value,
                array,
            },
            span.clone(),
        )
    }
}

/// `$std.<name>(args..)`
fn std_call(name: &str, args: Vec<CoreExpr>, span: &SourceSpan) -> CoreExpr {
    let target = Core::new(
        CoreKind::Index {
            target: var(STD_INTERNAL, span),
            index: str_lit(name, span),
        },
        span.clone(),
    );
    Core::new(
        CoreKind::Apply {
            target,
            positional: args,
            named: Vec::new(),
            tailstrict: false,
        },
        span.clone(),
    )
}

fn wrap_locals(binds: &Rc<[CoreBind]>, body: CoreExpr) -> CoreExpr {
    if binds.is_empty() {
        return body;
    }
    let span = body.span.clone();
    Core::new(
        CoreKind::Local {
            binds: Rc::clone(binds),
            body,
        },
        span,
    )
}

/// `local x = $comp[0], y = $comp[1]; body`
fn unpack(vars: &[&str], body: CoreExpr, span: &SourceSpan) -> CoreExpr {
    let binds: Vec<CoreBind> = vars
        .iter()
        .enumerate()
        .map(|(i, v)| CoreBind {
            name: Rc::from(*v),
            body: Core::new(
                CoreKind::Index {
                    target: var(COMP_VAR, span),
                    index: Core::new(CoreKind::Number(i as f64), span.clone()),
                },
                span.clone(),
            ),
        })
        .collect();
    Core::new(
        CoreKind::Local {
            binds: binds.into(),
            body,
        },
        span.clone(),
    )
}
