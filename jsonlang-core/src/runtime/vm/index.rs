//! 索引、字段查找、super 与对象断言

use super::Vm;
use crate::kit::lexer::SourceSpan;
use crate::kit::strings;
use crate::runtime::error::{EvalResult, FrameName, RuntimeErrorKind};
use crate::runtime::heap::{Deferred, ThunkId};
use crate::runtime::value::{AssertState, LayerField, ObjectValue, Scope, SelfBinding, Value};
use std::rc::Rc;

impl<'a> Vm<'a> {
    /// 从第 `offset` 层开始查找字段，返回该字段（相对于 `obj`）的 thunk
    pub(crate) fn object_field(&self, obj: &ObjectValue, offset: usize, name: &str) -> Option<ThunkId> {
        let i = obj.find_layer(offset, name)?;
        let layer = &obj.layers()[i];
        let (key, field) = layer.fields.get_key_value(name)?;

        let cache_key = (i, Rc::clone(key));
        if let Some(id) = obj.0.field_cache.borrow().get(&cache_key) {
            return Some(*id);
        }

        let this = Some(SelfBinding {
            object: obj.clone(),
            offset: i,
        });
        let id = match field {
            LayerField::Thunk { thunk, .. } => return Some(*thunk),
            LayerField::Expr { body, .. } => self.heap.alloc(Deferred::Expr {
                expr: Rc::clone(body),
                scope: Scope::new(layer.env, this),
                name: FrameName::Field(Rc::clone(key)),
            }),
            LayerField::Scoped { body, env } => self.heap.alloc(Deferred::Expr {
                expr: Rc::clone(body),
                scope: Scope::new(*env, this),
                name: FrameName::Field(Rc::clone(key)),
            }),
        };
        obj.0.field_cache.borrow_mut().insert(cache_key, id);
        Some(id)
    }

    /// `obj.name`（先检查对象断言）
    pub(crate) fn get_field(&self, obj: &ObjectValue, name: &str, span: &SourceSpan) -> EvalResult<Value> {
        self.ensure_asserts(obj, span)?;
        match self.object_field(obj, 0, name) {
            Some(id) => self.force(id),
            None => Err(self.error(
                RuntimeErrorKind::Evaluation,
                format!("Field does not exist: {name}"),
                span,
            )),
        }
    }

    /// `super.name` / `super[name]`
    pub(super) fn super_field(&self, scope: &Scope, name: &str, span: &SourceSpan) -> EvalResult<Value> {
        let Some(this) = &scope.this else {
            return Err(self.error(
                RuntimeErrorKind::Evaluation,
                "Can't use super outside of an object.",
                span,
            ));
        };
        let offset = this.offset + 1;
        if offset >= this.object.layers().len() {
            return Err(self.error(
                RuntimeErrorKind::Evaluation,
                "Attempt to use super when there is no super class.",
                span,
            ));
        }
        match self.object_field(&this.object, offset, name) {
            Some(id) => self.force(id),
            None => Err(self.error(
                RuntimeErrorKind::Evaluation,
                format!("Field does not exist: {name}"),
                span,
            )),
        }
    }

    /// `name in super`：没有 super 时为 false
    pub(super) fn in_super(&self, scope: &Scope, name: &str) -> bool {
        scope
            .this
            .as_ref()
            .is_some_and(|this| this.object.find_layer(this.offset + 1, name).is_some())
    }

    /// 每个对象的断言只检查一次；检查期间的递归访问直接放行
    pub(crate) fn ensure_asserts(&self, obj: &ObjectValue, span: &SourceSpan) -> EvalResult<()> {
        let data = &obj.0;
        if data.assert_state.get() != AssertState::Unchecked {
            return Ok(());
        }
        if data.layers.iter().all(|layer| layer.asserts.is_empty()) {
            data.assert_state.set(AssertState::Passed);
            return Ok(());
        }

        data.assert_state.set(AssertState::Checking);
        let _guard = self.enter(span, FrameName::Object)?;
        for (i, layer) in data.layers.iter().enumerate() {
            let scope = Scope::new(
                layer.env,
                Some(SelfBinding {
                    object: obj.clone(),
                    offset: i,
                }),
            );
            for assert in &layer.asserts {
                if let Err(err) = self.eval(assert, &scope) {
                    data.assert_state.set(AssertState::Unchecked);
                    return Err(err);
                }
            }
        }
        data.assert_state.set(AssertState::Passed);
        Ok(())
    }

    /// `target[index]`
    pub(crate) fn index(&self, target: &Value, index: &Value, span: &SourceSpan) -> EvalResult<Value> {
        match target {
            Value::Object(obj) => match index {
                Value::Str(name) => self.get_field(obj, name, span),
                other => Err(self.error(
                    RuntimeErrorKind::TypeMismatch,
                    format!("Object index must be string, got {}.", other.type_name()),
                    span,
                )),
            },
            Value::Array(items) => {
                let i = self.integer_index(index, "Array", span)?;
                match usize::try_from(i).ok().and_then(|i| items.get(i)) {
                    Some(id) => self.force(*id),
                    None => Err(self.error(
                        RuntimeErrorKind::Evaluation,
                        format!("Array bounds error: {} not within [0, {})", i, items.len()),
                        span,
                    )),
                }
            }
            Value::Str(s) => {
                let i = self.integer_index(index, "String", span)?;
                match usize::try_from(i).ok().and_then(|i| strings::char_at(s, i)) {
                    Some(c) => Ok(Value::string(c.to_string())),
                    None => Err(self.error(
                        RuntimeErrorKind::Evaluation,
                        format!(
                            "String bounds error: {} not within [0, {})",
                            i,
                            strings::char_len(s)
                        ),
                        span,
                    )),
                }
            }
            other => Err(self.error(
                RuntimeErrorKind::TypeMismatch,
                format!(
                    "Can only index objects, strings, and arrays, got {}.",
                    other.type_name()
                ),
                span,
            )),
        }
    }

    fn integer_index(&self, index: &Value, what: &str, span: &SourceSpan) -> EvalResult<i64> {
        let Value::Number(n) = index else {
            return Err(self.error(
                RuntimeErrorKind::TypeMismatch,
                format!("{what} index must be number, got {}.", index.type_name()),
                span,
            ));
        };
        if n.fract() != 0.0 || !n.is_finite() {
            return Err(self.error(
                RuntimeErrorKind::Evaluation,
                format!("{what} index must be an integer, got {n}"),
                span,
            ));
        }
        Ok(*n as i64)
    }
}
