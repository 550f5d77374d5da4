//! 二元 / 一元运算

use super::Vm;
use crate::compiler::parser::ast::{BinaryOp, UnaryOp};
use crate::kit::lexer::SourceSpan;
use crate::runtime::error::{EvalResult, RuntimeError, RuntimeErrorKind};
use crate::runtime::value::{ObjectValue, Value};
use std::cmp::Ordering;

impl<'a> Vm<'a> {
    pub(crate) fn binary(&self, op: BinaryOp, left: &Value, right: &Value, span: &SourceSpan) -> EvalResult<Value> {
        match op {
            BinaryOp::Add => self.add(left, right, span),
            BinaryOp::Eq => Ok(Value::Bool(self.equals(left, right, span)?)),
            BinaryOp::NotEq => Ok(Value::Bool(!self.equals(left, right, span)?)),
            BinaryOp::Less => Ok(Value::Bool(self.compare(left, right, span)? == Ordering::Less)),
            BinaryOp::LessEq => Ok(Value::Bool(self.compare(left, right, span)? != Ordering::Greater)),
            BinaryOp::Greater => Ok(Value::Bool(self.compare(left, right, span)? == Ordering::Greater)),
            BinaryOp::GreaterEq => Ok(Value::Bool(self.compare(left, right, span)? != Ordering::Less)),
            BinaryOp::And | BinaryOp::Or => match (left, right) {
                (Value::Bool(l), Value::Bool(r)) => Ok(Value::Bool(if op == BinaryOp::And {
                    *l && *r
                } else {
                    *l || *r
                })),
                _ => Err(self.operand_error(op, left, right, "booleans", span)),
            },
            _ => {
                let (Value::Number(l), Value::Number(r)) = (left, right) else {
                    return Err(self.operand_error(op, left, right, "numbers", span));
                };
                self.arithmetic(op, *l, *r, span)
            }
        }
    }

    fn operand_error(&self, op: BinaryOp, left: &Value, right: &Value, wanted: &str, span: &SourceSpan) -> RuntimeError {
        self.error(
            RuntimeErrorKind::TypeMismatch,
            format!(
                "Binary operator {} requires {}, got {} and {}.",
                op.symbol(),
                wanted,
                left.type_name(),
                right.type_name()
            ),
            span,
        )
    }

    fn add(&self, left: &Value, right: &Value, span: &SourceSpan) -> EvalResult<Value> {
        match (left, right) {
            (Value::Number(l), Value::Number(r)) => self.number(l + r, span),
            (Value::Str(l), Value::Str(r)) => Ok(Value::string(format!("{l}{r}"))),
            (Value::Str(l), r) => Ok(Value::string(format!("{l}{}", self.to_string(r, span)?))),
            (l, Value::Str(r)) => Ok(Value::string(format!("{}{r}", self.to_string(l, span)?))),
            (Value::Array(l), Value::Array(r)) => {
                Ok(Value::array(l.iter().chain(r.iter()).copied().collect()))
            }
            (Value::Object(l), Value::Object(r)) => Ok(Value::Object(ObjectValue::extend(l, r, span.clone()))),
            _ => Err(self.error(
                RuntimeErrorKind::TypeMismatch,
                format!(
                    "Binary operator + requires matching types, got {} and {}.",
                    left.type_name(),
                    right.type_name()
                ),
                span,
            )),
        }
    }

    fn arithmetic(&self, op: BinaryOp, l: f64, r: f64, span: &SourceSpan) -> EvalResult<Value> {
        match op {
            BinaryOp::Sub => self.number(l - r, span),
            BinaryOp::Mul => self.number(l * r, span),
            BinaryOp::Div => {
                if r == 0.0 {
                    return Err(self.error(RuntimeErrorKind::Evaluation, "Division by zero.", span));
                }
                self.number(l / r, span)
            }
            BinaryOp::Mod => {
                if r == 0.0 {
                    return Err(self.error(RuntimeErrorKind::Evaluation, "Division by zero.", span));
                }
                self.number(l % r, span)
            }
            BinaryOp::ShiftLeft | BinaryOp::ShiftRight => {
                let (l, r) = (self.int_operand(op.symbol(), l, span)?, self.int_operand(op.symbol(), r, span)?);
                if r < 0 {
                    return Err(self.error(RuntimeErrorKind::Evaluation, "Shift by negative exponent.", span));
                }
                let shift = (r % 64) as u32;
                let result = if op == BinaryOp::ShiftLeft {
                    l.wrapping_shl(shift)
                } else {
                    l.wrapping_shr(shift)
                };
                Ok(Value::Number(result as f64))
            }
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
                let (l, r) = (self.int_operand(op.symbol(), l, span)?, self.int_operand(op.symbol(), r, span)?);
                let result = match op {
                    BinaryOp::BitAnd => l & r,
                    BinaryOp::BitOr => l | r,
                    _ => l ^ r,
                };
                Ok(Value::Number(result as f64))
            }
            _ => Err(self.error(
                RuntimeErrorKind::Evaluation,
                format!("Unsupported binary operator {}", op.symbol()),
                span,
            )),
        }
    }

    /// 位运算的操作数：截断为 i64，超出范围时报错
    fn int_operand(&self, op: &str, n: f64, span: &SourceSpan) -> EvalResult<i64> {
        // 2^63
        const LIMIT: f64 = 9_223_372_036_854_775_808.0;
        if n.is_finite() && (-LIMIT..LIMIT).contains(&n) {
            Ok(n as i64)
        } else {
            Err(self.error(
                RuntimeErrorKind::Evaluation,
                format!("Operator {op} operand {n} is outside the 64-bit integer range."),
                span,
            ))
        }
    }

    /// 数值结果检查：NaN 与无穷都是错误
    pub(crate) fn number(&self, n: f64, span: &SourceSpan) -> EvalResult<Value> {
        if n.is_nan() {
            Err(self.error(RuntimeErrorKind::Evaluation, "Not a number", span))
        } else if n.is_infinite() {
            Err(self.error(RuntimeErrorKind::Evaluation, "Overflow", span))
        } else {
            Ok(Value::Number(n))
        }
    }

    pub(crate) fn unary(&self, op: UnaryOp, operand: &Value, span: &SourceSpan) -> EvalResult<Value> {
        match (op, operand) {
            (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(-n)),
            (UnaryOp::Plus, Value::Number(n)) => Ok(Value::Number(*n)),
            (UnaryOp::BitNot, Value::Number(n)) => Ok(Value::Number(!self.int_operand("~", *n, span)? as f64)),
            (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
            (op, other) => Err(self.error(
                RuntimeErrorKind::TypeMismatch,
                format!(
                    "Unary operator {} does not operate on type {}.",
                    op.symbol(),
                    other.type_name()
                ),
                span,
            )),
        }
    }
}
