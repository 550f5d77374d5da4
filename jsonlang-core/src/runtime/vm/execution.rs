//! 表达式求值主循环

use super::Vm;
use crate::compiler::desugar::core::{CoreExpr, CoreField, CoreKind, Var};
use crate::compiler::parser::ast::BinaryOp;
use crate::kit::lexer::SourceSpan;
use crate::runtime::error::{EvalResult, FrameName, RuntimeErrorKind};
use crate::runtime::heap::{Deferred, ThunkId};
use crate::runtime::value::{FunctionValue, Layer, LayerField, ObjectValue, Scope, Value};
use std::collections::BTreeMap;
use std::rc::Rc;

impl<'a> Vm<'a> {
    pub(crate) fn eval(&self, expr: &CoreExpr, scope: &Scope) -> EvalResult<Value> {
        self.descend(&expr.span, || self.eval_inner(expr, scope))
    }

    fn eval_inner(&self, expr: &CoreExpr, scope: &Scope) -> EvalResult<Value> {
        let span = &expr.span;
        match &expr.kind {
            CoreKind::Null => Ok(Value::Null),
            CoreKind::Bool(b) => Ok(Value::Bool(*b)),
            CoreKind::Number(n) => self.number(*n, span),
            CoreKind::Str(s) => Ok(Value::Str(Rc::clone(s))),
            CoreKind::Var(var) => {
                let id = self.resolve(var, scope, span)?;
                self.force(id)
            }
            CoreKind::SelfRef => match &scope.this {
                Some(this) => Ok(Value::Object(this.object.clone())),
                None => Err(self.error(
                    RuntimeErrorKind::Evaluation,
                    "Can't use self outside of an object.",
                    span,
                )),
            },
            CoreKind::SuperIndex(index) => {
                let name = self.eval_field_name(index, scope)?;
                self.super_field(scope, &name, span)
            }
            CoreKind::InSuper(name) => {
                let name = self.eval_field_name(name, scope)?;
                Ok(Value::Bool(self.in_super(scope, &name)))
            }
            CoreKind::Array(items) => {
                let ids = items
                    .iter()
                    .map(|item| self.thunk(item, scope, || FrameName::Array))
                    .collect();
                Ok(Value::array(ids))
            }
            CoreKind::Object { asserts, fields } => self.build_object(asserts, fields, scope, span),
            CoreKind::ObjectComp {
                name, value, array, ..
            } => self.build_comprehension(name, value, array, scope, span),
            CoreKind::Index { target, index } => {
                let target = self.eval(target, scope)?;
                let index = self.eval(index, scope)?;
                self.index(&target, &index, span)
            }
            CoreKind::Apply {
                target,
                positional,
                named,
                tailstrict,
            } => self.eval_apply(target, positional, named, *tailstrict, scope, span),
            CoreKind::Binary {
                op: op @ (BinaryOp::And | BinaryOp::Or),
                left,
                right,
            } => self.eval_logical(*op, left, right, scope, span),
            CoreKind::Binary { op, left, right } => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                self.binary(*op, &left, &right, span)
            }
            CoreKind::Unary { op, operand } => {
                let operand = self.eval(operand, scope)?;
                self.unary(*op, &operand, span)
            }
            CoreKind::Local { binds, body } => {
                let env = self.heap.reserve_env(Some(scope.env));
                let inner = scope.with_env(env);
                let slots = binds
                    .iter()
                    .map(|bind| self.thunk(&bind.body, &inner, || FrameName::Thunk(Rc::clone(&bind.name))))
                    .collect();
                self.heap.set_slots(env, slots);
                self.eval(body, &inner)
            }
            CoreKind::If {
                cond,
                then_branch,
                else_branch,
            } => match self.eval(cond, scope)? {
                Value::Bool(true) => self.eval(then_branch, scope),
                Value::Bool(false) => self.eval(else_branch, scope),
                other => Err(self.error(
                    RuntimeErrorKind::TypeMismatch,
                    format!("Condition must be boolean, got {}.", other.type_name()),
                    &cond.span,
                )),
            },
            CoreKind::Function { params, body } => Ok(Value::Function(Rc::new(FunctionValue::Closure {
                params: Rc::clone(params),
                body: Rc::clone(body),
                scope: scope.clone(),
            }))),
            CoreKind::Error { message, assertion } => {
                let value = self.eval(message, scope)?;
                let message = match &value {
                    Value::Str(s) => s.to_string(),
                    other => self.to_string(other, span)?,
                };
                let kind = if *assertion {
                    RuntimeErrorKind::AssertionFailed
                } else {
                    RuntimeErrorKind::UserError
                };
                Err(self.error(kind, message, span))
            }
            CoreKind::Import(path) => self.import_value(path, span),
            CoreKind::ImportStr(path) => {
                let file = self.import_file(path, span)?;
                Ok(Value::string(file.content.as_str()))
            }
        }
    }

    fn resolve(&self, var: &Var, scope: &Scope, span: &SourceSpan) -> EvalResult<ThunkId> {
        var.slot
            .get()
            .and_then(|slot| self.heap.lookup(scope.env, slot))
            .ok_or_else(|| {
                self.error(
                    RuntimeErrorKind::Evaluation,
                    format!("Unknown variable: {}", var.name),
                    span,
                )
            })
    }

    /// 把表达式包装成 thunk；字面量直接求值，变量复用已有 thunk
    pub(crate) fn thunk(
        &self,
        expr: &CoreExpr,
        scope: &Scope,
        name: impl FnOnce() -> FrameName,
    ) -> ThunkId {
        let ready = match &expr.kind {
            CoreKind::Null => Some(Value::Null),
            CoreKind::Bool(b) => Some(Value::Bool(*b)),
            // 溢出的字面量（如 1e400）留到求值时报错
            CoreKind::Number(n) if n.is_finite() => Some(Value::Number(*n)),
            CoreKind::Str(s) => Some(Value::Str(Rc::clone(s))),
            CoreKind::Function { params, body } => Some(Value::Function(Rc::new(FunctionValue::Closure {
                params: Rc::clone(params),
                body: Rc::clone(body),
                scope: scope.clone(),
            }))),
            CoreKind::Var(var) => {
                // 槽位可能尚未填入（同一帧内的前向引用），此时退回延迟求值
                if let Some(id) = var.slot.get().and_then(|slot| self.heap.lookup(scope.env, slot)) {
                    return id;
                }
                None
            }
            _ => None,
        };
        match ready {
            Some(value) => self.heap.alloc_value(value),
            None => self.heap.alloc(Deferred::Expr {
                expr: Rc::clone(expr),
                scope: scope.clone(),
                name: name(),
            }),
        }
    }

    fn eval_logical(
        &self,
        op: BinaryOp,
        left: &CoreExpr,
        right: &CoreExpr,
        scope: &Scope,
        span: &SourceSpan,
    ) -> EvalResult<Value> {
        let expect_bool = |value: Value, this: &Self| match value {
            Value::Bool(b) => Ok(b),
            other => Err(this.error(
                RuntimeErrorKind::TypeMismatch,
                format!(
                    "Binary operator {} requires booleans, got {}.",
                    op.symbol(),
                    other.type_name()
                ),
                span,
            )),
        };
        let l = expect_bool(self.eval(left, scope)?, self)?;
        match (op, l) {
            (BinaryOp::And, false) => Ok(Value::Bool(false)),
            (BinaryOp::Or, true) => Ok(Value::Bool(true)),
            _ => Ok(Value::Bool(expect_bool(self.eval(right, scope)?, self)?)),
        }
    }

    /// 字段名求值：null 表示跳过
    fn eval_field_name(&self, expr: &CoreExpr, scope: &Scope) -> EvalResult<Rc<str>> {
        match self.eval(expr, scope)? {
            Value::Str(s) => Ok(s),
            other => Err(self.error(
                RuntimeErrorKind::TypeMismatch,
                format!("Field name must be string, got {}.", other.type_name()),
                &expr.span,
            )),
        }
    }

    fn object_field_name(&self, expr: &CoreExpr, scope: &Scope) -> EvalResult<Option<Rc<str>>> {
        match self.eval(expr, scope)? {
            Value::Null => Ok(None),
            Value::Str(s) => Ok(Some(s)),
            other => Err(self.error(
                RuntimeErrorKind::TypeMismatch,
                format!("Field name must be string, got {}.", other.type_name()),
                &expr.span,
            )),
        }
    }

    fn duplicate_field(&self, name: &str, span: &SourceSpan) -> crate::runtime::error::RuntimeError {
        self.error(
            RuntimeErrorKind::Evaluation,
            format!("Duplicate field name: \"{name}\""),
            span,
        )
    }

    fn build_object(
        &self,
        asserts: &[CoreExpr],
        fields: &[CoreField],
        scope: &Scope,
        span: &SourceSpan,
    ) -> EvalResult<Value> {
        let mut map = BTreeMap::new();
        for field in fields {
            let Some(name) = self.object_field_name(&field.name, scope)? else {
                continue;
            };
            if map.contains_key(&name) {
                return Err(self.duplicate_field(&name, &field.name.span));
            }
            map.insert(
                name,
                LayerField::Expr {
                    visibility: field.visibility,
                    body: Rc::clone(&field.body),
                },
            );
        }
        let layer = Layer::new(scope.env, map, asserts.to_vec());
        Ok(Value::Object(ObjectValue::new(vec![Rc::new(layer)], span.clone())))
    }

    fn build_comprehension(
        &self,
        name: &CoreExpr,
        value: &CoreExpr,
        array: &CoreExpr,
        scope: &Scope,
        span: &SourceSpan,
    ) -> EvalResult<Value> {
        let items = match self.eval(array, scope)? {
            Value::Array(items) => items,
            other => {
                return Err(self.error(
                    RuntimeErrorKind::TypeMismatch,
                    format!("Object comprehension needs an array, got {}.", other.type_name()),
                    &array.span,
                ))
            }
        };

        let mut map = BTreeMap::new();
        for item in items.iter() {
            let env = self.heap.new_env(Some(scope.env), vec![*item]);
            let elem = scope.with_env(env);
            let Some(field) = self.object_field_name(name, &elem)? else {
                continue;
            };
            if map.contains_key(&field) {
                return Err(self.duplicate_field(&field, &name.span));
            }
            map.insert(
                field,
                LayerField::Scoped {
                    body: Rc::clone(value),
                    env,
                },
            );
        }
        let layer = Layer::new(scope.env, map, Vec::new());
        Ok(Value::Object(ObjectValue::new(vec![Rc::new(layer)], span.clone())))
    }
}
