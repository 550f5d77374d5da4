//! 深度相等与全序比较

use super::Vm;
use crate::kit::lexer::SourceSpan;
use crate::runtime::error::{EvalResult, FrameName, RuntimeErrorKind};
use crate::runtime::value::Value;
use std::cmp::Ordering;

impl<'a> Vm<'a> {
    /// `==`：跨类型为 false，函数不可比较
    pub(crate) fn equals(&self, left: &Value, right: &Value, span: &SourceSpan) -> EvalResult<bool> {
        match (left, right) {
            (Value::Null, Value::Null) => Ok(true),
            (Value::Bool(l), Value::Bool(r)) => Ok(l == r),
            (Value::Number(l), Value::Number(r)) => Ok(l == r),
            (Value::Str(l), Value::Str(r)) => Ok(l == r),
            (Value::Array(l), Value::Array(r)) => {
                if l.len() != r.len() {
                    return Ok(false);
                }
                let _guard = self.enter(span, FrameName::Array)?;
                for (a, b) in l.iter().zip(r.iter()) {
                    let a = self.force(*a)?;
                    let b = self.force(*b)?;
                    if !self.equals(&a, &b, span)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Value::Object(l), Value::Object(r)) => {
                let _guard = self.enter(span, FrameName::Object)?;
                self.ensure_asserts(l, span)?;
                self.ensure_asserts(r, span)?;
                let names = l.field_names(false);
                if names != r.field_names(false) {
                    return Ok(false);
                }
                for name in &names {
                    let a = self.get_field(l, name, span)?;
                    let b = self.get_field(r, name, span)?;
                    if !self.equals(&a, &b, span)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Value::Function(_), Value::Function(_)) => Err(self.error(
                RuntimeErrorKind::TypeMismatch,
                "Cannot test equality of functions",
                span,
            )),
            _ => Ok(false),
        }
    }

    /// `<` 等比较：数字、字符串、数组（字典序）
    pub(crate) fn compare(&self, left: &Value, right: &Value, span: &SourceSpan) -> EvalResult<Ordering> {
        match (left, right) {
            (Value::Number(l), Value::Number(r)) => Ok(l.partial_cmp(r).unwrap_or(Ordering::Equal)),
            (Value::Str(l), Value::Str(r)) => Ok(l.cmp(r)),
            (Value::Array(l), Value::Array(r)) => {
                let _guard = self.enter(span, FrameName::Array)?;
                for (a, b) in l.iter().zip(r.iter()) {
                    let a = self.force(*a)?;
                    let b = self.force(*b)?;
                    let ord = self.compare(&a, &b, span)?;
                    if ord != Ordering::Equal {
                        return Ok(ord);
                    }
                }
                Ok(l.len().cmp(&r.len()))
            }
            (l, r) if l.type_name() != r.type_name() => Err(self.error(
                RuntimeErrorKind::TypeMismatch,
                format!(
                    "Comparison requires matching types, got {} and {}.",
                    l.type_name(),
                    r.type_name()
                ),
                span,
            )),
            (l, _) => Err(self.error(
                RuntimeErrorKind::TypeMismatch,
                format!("Values of type {} are not comparable.", l.type_name()),
                span,
            )),
        }
    }
}
