//! 函数调用：参数绑定、闭包 / 内置 / 原生函数分派

use super::Vm;
use crate::compiler::desugar::core::{Core, CoreExpr, CoreKind};
use crate::runtime::error::{EvalResult, FrameName, RuntimeError, RuntimeErrorKind};
use crate::runtime::heap::ThunkId;
use crate::runtime::stdlib::BuiltinCall;
use crate::runtime::value::{FunctionValue, Scope, Value};
use crate::kit::lexer::SourceSpan;
use jsonlang_log::debug;
use std::rc::Rc;

/// 已包装成 thunk 的实参
#[derive(Debug, Default)]
pub(crate) struct CallArgs {
    pub positional: Vec<ThunkId>,
    pub named: Vec<(Rc<str>, ThunkId)>,
}

impl CallArgs {
    pub fn positional(args: Vec<ThunkId>) -> Self {
        Self {
            positional: args,
            named: Vec::new(),
        }
    }

    fn all(&self) -> impl Iterator<Item = ThunkId> + '_ {
        self.positional
            .iter()
            .copied()
            .chain(self.named.iter().map(|(_, id)| *id))
    }
}

/// 调用处用于 trace 的函数名：`f(..)` 或 `obj.f(..)`
fn callee_name(target: &Core) -> Option<Rc<str>> {
    match &target.kind {
        CoreKind::Var(var) => Some(Rc::clone(&var.name)),
        CoreKind::Index { index, .. } => match &index.kind {
            CoreKind::Str(name) => Some(Rc::clone(name)),
            _ => None,
        },
        _ => None,
    }
}

impl<'a> Vm<'a> {
    pub(super) fn eval_apply(
        &self,
        target: &CoreExpr,
        positional: &[CoreExpr],
        named: &[(Rc<str>, CoreExpr)],
        tailstrict: bool,
        scope: &Scope,
        span: &SourceSpan,
    ) -> EvalResult<Value> {
        let callee = self.eval(target, scope)?;
        let Value::Function(func) = callee else {
            return Err(self.error(
                RuntimeErrorKind::TypeMismatch,
                format!("Only functions can be called, got {}.", callee.type_name()),
                span,
            ));
        };

        let argument = || FrameName::Thunk(Rc::from("argument"));
        let args = CallArgs {
            positional: positional
                .iter()
                .map(|arg| self.thunk(arg, scope, argument))
                .collect(),
            named: named
                .iter()
                .map(|(name, arg)| (Rc::clone(name), self.thunk(arg, scope, argument)))
                .collect(),
        };
        if tailstrict {
            for id in args.all() {
                self.force(id)?;
            }
        }
        self.call(&func, args, span, callee_name(target))
    }

    /// 按参数名表绑定实参，返回每个形参对应的 thunk（未绑定为 None）
    fn bind_args(
        &self,
        names: &[&str],
        args: &CallArgs,
        span: &SourceSpan,
    ) -> EvalResult<Vec<Option<ThunkId>>> {
        if args.positional.len() > names.len() {
            return Err(self.error(
                RuntimeErrorKind::Evaluation,
                format!("Too many args, function has {} parameter(s)", names.len()),
                span,
            ));
        }
        let mut bound: Vec<Option<ThunkId>> = vec![None; names.len()];
        for (slot, id) in bound.iter_mut().zip(&args.positional) {
            *slot = Some(*id);
        }
        for (name, id) in &args.named {
            let Some(i) = names.iter().position(|n| *n == &**name) else {
                return Err(self.error(
                    RuntimeErrorKind::Evaluation,
                    format!("Function has no parameter {name}"),
                    span,
                ));
            };
            if bound[i].is_some() {
                return Err(self.error(
                    RuntimeErrorKind::Evaluation,
                    format!("Binding parameter a second time: {name}"),
                    span,
                ));
            }
            bound[i] = Some(*id);
        }
        Ok(bound)
    }

    fn unbound(&self, param: &str, span: &SourceSpan) -> RuntimeError {
        self.error(
            RuntimeErrorKind::Evaluation,
            format!("Function parameter {param} not bound in call."),
            span,
        )
    }

    /// 调用函数值；`name` 仅用于 trace
    pub(crate) fn call(
        &self,
        func: &Rc<FunctionValue>,
        args: CallArgs,
        span: &SourceSpan,
        name: Option<Rc<str>>,
    ) -> EvalResult<Value> {
        match &**func {
            FunctionValue::Closure {
                params,
                body,
                scope,
            } => {
                let names: Vec<&str> = params.iter().map(|p| &*p.name).collect();
                let bound = self.bind_args(&names, &args, span)?;

                // 默认值在被调函数的参数帧中求值，可以引用其他参数
                let env = self.heap.reserve_env(Some(scope.env));
                let inner = scope.with_env(env);
                let mut slots = Vec::with_capacity(params.len());
                for (param, arg) in params.iter().zip(bound) {
                    let id = match (arg, &param.default) {
                        (Some(id), _) => id,
                        (None, Some(default)) => {
                            self.thunk(default, &inner, || FrameName::Thunk(Rc::clone(&param.name)))
                        }
                        (None, None) => return Err(self.unbound(&param.name, span)),
                    };
                    slots.push(id);
                }
                self.heap.set_slots(env, slots);

                let _guard = self.enter(span, FrameName::Function(name))?;
                self.eval(body, &inner)
            }
            FunctionValue::Builtin(spec) => {
                let bound = self.bind_args(spec.params, &args, span)?;
                let mut ids = Vec::with_capacity(bound.len());
                for (i, arg) in bound.into_iter().enumerate() {
                    match arg {
                        Some(id) => ids.push(id),
                        None if i < spec.required => return Err(self.unbound(spec.params[i], span)),
                        None => ids.push(self.heap.alloc_value(Value::Null)),
                    }
                }
                let _guard = self.enter(span, FrameName::Builtin(spec.name))?;
                (spec.func)(&BuiltinCall::new(self, spec, &ids, span))
            }
            FunctionValue::Native { name, params } => {
                let names: Vec<&str> = params.iter().map(|p| &**p).collect();
                let bound = self.bind_args(&names, &args, span)?;
                let _guard = self.enter(span, FrameName::Function(Some(Rc::clone(name))))?;
                let mut values = Vec::with_capacity(bound.len());
                for (param, arg) in names.iter().zip(bound) {
                    let id = arg.ok_or_else(|| self.unbound(param, span))?;
                    let value = self.force(id)?;
                    values.push(self.manifest_json(&value, span)?);
                }
                self.call_native(name, &values, span)
            }
        }
    }

    fn call_native(
        &self,
        name: &str,
        args: &[serde_json::Value],
        span: &SourceSpan,
    ) -> EvalResult<Value> {
        let Some(native) = self.natives().get(name) else {
            return Err(self.error(
                RuntimeErrorKind::Evaluation,
                format!("Unrecognized native function name: {name}"),
                span,
            ));
        };
        debug!(self.logger, "Calling native function {} with {} argument(s)", name, args.len());
        match (native.callback)(args) {
            Ok(result) => Ok(self.from_json(&result)),
            Err(message) => Err(self.error(
                RuntimeErrorKind::NativeFailure {
                    name: name.to_string(),
                },
                message,
                span,
            )),
        }
    }
}
