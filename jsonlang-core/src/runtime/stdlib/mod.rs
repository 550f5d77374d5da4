//! 标准库实现
//!
//! `std` 的函数全部用 Rust 原生实现，扁平地挂在一个隐藏字段层上。
//! 除 `makeArray`、`map`、`mapWithKey` 的元素是惰性的以外，参数在使用时强制求值。

mod format;

pub(crate) use format::format_values;

use crate::compiler::parser::ast::Visibility;
use crate::formatter::json;
use crate::kit::lexer::SourceSpan;
use crate::kit::strings;
use crate::runtime::error::{EvalResult, RuntimeError, RuntimeErrorKind};
use crate::runtime::heap::{Deferred, EnvId, Heap, ThunkId};
use crate::runtime::value::{FunctionValue, Layer, LayerField, ObjectValue, Value};
use crate::runtime::vm::{CallArgs, Vm};
use once_cell::sync::Lazy;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

/// 内置函数指针类型
pub type BuiltinFn = fn(&BuiltinCall<'_, '_>) -> EvalResult<Value>;

/// 一个内置函数：名称、参数名和必需参数个数
pub struct BuiltinSpec {
    pub name: &'static str,
    pub params: &'static [&'static str],
    /// 前 `required` 个参数必须提供，其余缺省为 null
    pub required: usize,
    pub func: BuiltinFn,
}

impl fmt::Debug for BuiltinSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinSpec")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

const fn spec(
    name: &'static str,
    params: &'static [&'static str],
    required: usize,
    func: BuiltinFn,
) -> BuiltinSpec {
    BuiltinSpec {
        name,
        params,
        required,
        func,
    }
}

static BUILTINS: &[BuiltinSpec] = &[
    // ===== 类型与反射 =====
    spec("type", &["x"], 1, type_fn),
    spec("length", &["x"], 1, length_fn),
    spec("isString", &["v"], 1, is_string_fn),
    spec("isNumber", &["v"], 1, is_number_fn),
    spec("isBoolean", &["v"], 1, is_boolean_fn),
    spec("isObject", &["v"], 1, is_object_fn),
    spec("isArray", &["v"], 1, is_array_fn),
    spec("isFunction", &["v"], 1, is_function_fn),
    spec("equals", &["a", "b"], 2, equals_fn),
    spec("primitiveEquals", &["a", "b"], 2, primitive_equals_fn),
    spec("assertEqual", &["a", "b"], 2, assert_equal_fn),
    // ===== 数组 =====
    spec("makeArray", &["sz", "func"], 2, make_array_fn),
    spec("filter", &["func", "arr"], 2, filter_fn),
    spec("map", &["func", "arr"], 2, map_fn),
    spec("flatMap", &["func", "arr"], 2, flat_map_fn),
    spec("foldl", &["func", "arr", "init"], 3, foldl_fn),
    spec("foldr", &["func", "arr", "init"], 3, foldr_fn),
    spec("range", &["from", "to"], 2, range_fn),
    spec("join", &["sep", "arr"], 2, join_fn),
    spec("lines", &["arr"], 1, lines_fn),
    spec("count", &["arr", "x"], 2, count_fn),
    spec("reverse", &["arr"], 1, reverse_fn),
    spec("member", &["arr", "x"], 2, member_fn),
    spec("slice", &["indexable", "index", "end", "step"], 1, slice_fn),
    spec("sort", &["arr", "keyF"], 1, sort_fn),
    spec("uniq", &["arr", "keyF"], 1, uniq_fn),
    spec("set", &["arr", "keyF"], 1, set_fn),
    spec("setMember", &["x", "arr", "keyF"], 2, set_member_fn),
    spec("setUnion", &["a", "b", "keyF"], 2, set_union_fn),
    spec("setInter", &["a", "b", "keyF"], 2, set_inter_fn),
    spec("setDiff", &["a", "b", "keyF"], 2, set_diff_fn),
    // ===== 对象 =====
    spec("objectFields", &["o"], 1, object_fields_fn),
    spec("objectFieldsAll", &["o"], 1, object_fields_all_fn),
    spec("objectFieldsEx", &["obj", "hidden"], 2, object_fields_ex_fn),
    spec("objectHas", &["o", "f"], 2, object_has_fn),
    spec("objectHasAll", &["o", "f"], 2, object_has_all_fn),
    spec("objectHasEx", &["obj", "fname", "hidden"], 3, object_has_ex_fn),
    spec("mapWithKey", &["func", "obj"], 2, map_with_key_fn),
    // ===== 字符串 =====
    spec("toString", &["a"], 1, to_string_fn),
    spec("codepoint", &["str"], 1, codepoint_fn),
    spec("char", &["n"], 1, char_fn),
    spec("substr", &["str", "from", "len"], 3, substr_fn),
    spec("startsWith", &["a", "b"], 2, starts_with_fn),
    spec("endsWith", &["a", "b"], 2, ends_with_fn),
    spec("stringChars", &["str"], 1, string_chars_fn),
    spec("split", &["str", "c"], 2, split_fn),
    spec("splitLimit", &["str", "c", "maxsplits"], 3, split_limit_fn),
    spec("strReplace", &["str", "from", "to"], 3, str_replace_fn),
    spec("asciiUpper", &["str"], 1, ascii_upper_fn),
    spec("asciiLower", &["str"], 1, ascii_lower_fn),
    spec("format", &["str", "vals"], 2, format_fn),
    spec("escapeStringJson", &["str"], 1, escape_string_json_fn),
    spec("manifestJson", &["value"], 1, manifest_json_fn),
    // ===== 数学 =====
    spec("abs", &["n"], 1, abs_fn),
    spec("sign", &["n"], 1, sign_fn),
    spec("max", &["a", "b"], 2, max_fn),
    spec("min", &["a", "b"], 2, min_fn),
    spec("pow", &["x", "n"], 2, pow_fn),
    spec("exp", &["x"], 1, exp_fn),
    spec("log", &["x"], 1, log_fn),
    spec("floor", &["x"], 1, floor_fn),
    spec("ceil", &["x"], 1, ceil_fn),
    spec("sqrt", &["x"], 1, sqrt_fn),
    spec("sin", &["x"], 1, sin_fn),
    spec("cos", &["x"], 1, cos_fn),
    spec("tan", &["x"], 1, tan_fn),
    spec("asin", &["x"], 1, asin_fn),
    spec("acos", &["x"], 1, acos_fn),
    spec("atan", &["x"], 1, atan_fn),
    spec("mantissa", &["x"], 1, mantissa_fn),
    spec("exponent", &["x"], 1, exponent_fn),
    spec("modulo", &["a", "b"], 2, modulo_fn),
    spec("mod", &["a", "b"], 2, mod_fn),
    // ===== 宿主输入 =====
    spec("extVar", &["x"], 1, ext_var_fn),
    spec("native", &["name"], 1, native_fn),
];

static BUILTIN_INDEX: Lazy<HashMap<&'static str, &'static BuiltinSpec>> =
    Lazy::new(|| BUILTINS.iter().map(|spec| (spec.name, spec)).collect());

/// 按名称查找内置函数
pub fn builtin(name: &str) -> Option<&'static BuiltinSpec> {
    BUILTIN_INDEX.get(name).copied()
}

/// 全部内置函数名（按字母序）
pub fn builtin_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = BUILTINS.iter().map(|spec| spec.name).collect();
    names.sort_unstable();
    names
}

/// 构造 std 对象：每个内置函数是一个隐藏字段
pub fn std_object(heap: &Heap, env: EnvId, span: SourceSpan) -> ObjectValue {
    let fields = BUILTINS
        .iter()
        .map(|spec| {
            let thunk = heap.alloc_value(Value::Function(Rc::new(FunctionValue::Builtin(spec))));
            (
                Rc::from(spec.name),
                LayerField::Thunk {
                    visibility: Visibility::Hidden,
                    thunk,
                },
            )
        })
        .collect();
    ObjectValue::new(vec![Rc::new(Layer::new(env, fields, Vec::new()))], span)
}

// ===== 调用上下文 =====

/// 一次内置函数调用：已绑定的参数 thunk（缺省参数为 null）
pub struct BuiltinCall<'v, 'a> {
    vm: &'v Vm<'a>,
    spec: &'v BuiltinSpec,
    args: &'v [ThunkId],
    span: &'v SourceSpan,
}

impl<'v, 'a> BuiltinCall<'v, 'a> {
    pub(crate) fn new(vm: &'v Vm<'a>, spec: &'v BuiltinSpec, args: &'v [ThunkId], span: &'v SourceSpan) -> Self {
        Self { vm, spec, args, span }
    }

    pub fn vm(&self) -> &'v Vm<'a> {
        self.vm
    }

    pub fn span(&self) -> &SourceSpan {
        self.span
    }

    fn value(&self, i: usize) -> EvalResult<Value> {
        self.vm.force(self.args[i])
    }

    fn type_error(&self, i: usize, expected: &str, got: &Value) -> RuntimeError {
        self.vm.error(
            RuntimeErrorKind::TypeMismatch,
            format!(
                "Builtin function {} expected {} for parameter {}, got {}.",
                self.spec.name,
                expected,
                self.spec.params[i],
                got.type_name()
            ),
            self.span,
        )
    }

    fn fail(&self, message: impl Into<String>) -> RuntimeError {
        self.vm.error(RuntimeErrorKind::Evaluation, message, self.span)
    }

    fn number(&self, i: usize) -> EvalResult<f64> {
        match self.value(i)? {
            Value::Number(n) => Ok(n),
            other => Err(self.type_error(i, "number", &other)),
        }
    }

    /// 可精确表示的整数参数（|n| <= 2^53）
    fn int_arg(&self, i: usize) -> EvalResult<i64> {
        const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
        let n = self.number(i)?;
        if n.fract() != 0.0 || n.abs() > MAX_EXACT {
            return Err(self.fail(format!(
                "{}: {} must be an integer, got {}",
                self.spec.name, self.spec.params[i], n
            )));
        }
        Ok(n as i64)
    }

    /// 非负整数参数
    fn count_arg(&self, i: usize) -> EvalResult<usize> {
        let n = self.number(i)?;
        if n < 0.0 || n.fract() != 0.0 {
            return Err(self.fail(format!(
                "{}: {} must be a non-negative integer, got {}",
                self.spec.name, self.spec.params[i], n
            )));
        }
        Ok(n as usize)
    }

    fn string(&self, i: usize) -> EvalResult<Rc<str>> {
        match self.value(i)? {
            Value::Str(s) => Ok(s),
            other => Err(self.type_error(i, "string", &other)),
        }
    }

    fn boolean(&self, i: usize) -> EvalResult<bool> {
        match self.value(i)? {
            Value::Bool(b) => Ok(b),
            other => Err(self.type_error(i, "boolean", &other)),
        }
    }

    fn array(&self, i: usize) -> EvalResult<Rc<Vec<ThunkId>>> {
        match self.value(i)? {
            Value::Array(items) => Ok(items),
            other => Err(self.type_error(i, "array", &other)),
        }
    }

    fn object(&self, i: usize) -> EvalResult<ObjectValue> {
        match self.value(i)? {
            Value::Object(obj) => Ok(obj),
            other => Err(self.type_error(i, "object", &other)),
        }
    }

    fn function(&self, i: usize) -> EvalResult<Rc<FunctionValue>> {
        match self.value(i)? {
            Value::Function(func) => Ok(func),
            other => Err(self.type_error(i, "function", &other)),
        }
    }

    /// 可选的 keyF：null 表示恒等
    fn key_function(&self, i: usize) -> EvalResult<Option<Rc<FunctionValue>>> {
        match self.value(i)? {
            Value::Null => Ok(None),
            Value::Function(func) => Ok(Some(func)),
            other => Err(self.type_error(i, "function", &other)),
        }
    }

    fn alloc(&self, value: Value) -> ThunkId {
        self.vm.heap.alloc_value(value)
    }

    /// 立即调用
    fn call(&self, func: &Rc<FunctionValue>, args: Vec<ThunkId>) -> EvalResult<Value> {
        self.vm.call(func, CallArgs::positional(args), self.span, None)
    }

    /// 延迟调用，结果在首次读取时计算
    fn defer(&self, func: &Rc<FunctionValue>, args: Vec<ThunkId>) -> ThunkId {
        self.vm.heap.alloc(Deferred::Call {
            func: Rc::clone(func),
            args,
            span: self.span.clone(),
        })
    }

    fn checked(&self, n: f64) -> EvalResult<Value> {
        self.vm.number(n, self.span)
    }

    fn key(&self, key_fn: &Option<Rc<FunctionValue>>, id: ThunkId) -> EvalResult<Value> {
        match key_fn {
            Some(func) => self.call(func, vec![id]),
            None => self.vm.force(id),
        }
    }

    fn keyed(&self, items: &[ThunkId], key_fn: &Option<Rc<FunctionValue>>) -> EvalResult<Vec<(Value, ThunkId)>> {
        items.iter().map(|id| Ok((self.key(key_fn, *id)?, *id))).collect()
    }

    fn compare(&self, a: &Value, b: &Value) -> EvalResult<Ordering> {
        self.vm.compare(a, b, self.span)
    }

    fn equals(&self, a: &Value, b: &Value) -> EvalResult<bool> {
        self.vm.equals(a, b, self.span)
    }
}

/// 稳定归并排序，比较函数可能失败
fn merge_sort<T>(mut items: Vec<T>, cmp: &mut dyn FnMut(&T, &T) -> EvalResult<Ordering>) -> EvalResult<Vec<T>> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, cmp)?;
    let right = merge_sort(right, cmp)?;

    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_left = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => cmp(l, r)? != Ordering::Greater,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        out.extend(if take_left { left.next() } else { right.next() });
    }
    Ok(out)
}

fn char_array(call: &BuiltinCall<'_, '_>, s: &str) -> Vec<ThunkId> {
    s.chars().map(|c| call.alloc(Value::string(c.to_string()))).collect()
}

// ===== 类型与反射 =====

fn type_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    Ok(Value::string(call.value(0)?.type_name()))
}

fn length_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let n = match call.value(0)? {
        Value::Str(s) => strings::char_len(&s),
        Value::Array(items) => items.len(),
        Value::Object(obj) => obj.field_names(false).len(),
        Value::Function(func) => func.param_names().len(),
        other => return Err(call.type_error(0, "array, string, object or function", &other)),
    };
    Ok(Value::Number(n as f64))
}

fn is_string_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    Ok(Value::Bool(matches!(call.value(0)?, Value::Str(_))))
}

fn is_number_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    Ok(Value::Bool(matches!(call.value(0)?, Value::Number(_))))
}

fn is_boolean_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    Ok(Value::Bool(matches!(call.value(0)?, Value::Bool(_))))
}

fn is_object_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    Ok(Value::Bool(matches!(call.value(0)?, Value::Object(_))))
}

fn is_array_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    Ok(Value::Bool(matches!(call.value(0)?, Value::Array(_))))
}

fn is_function_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    Ok(Value::Bool(matches!(call.value(0)?, Value::Function(_))))
}

fn equals_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let (a, b) = (call.value(0)?, call.value(1)?);
    Ok(Value::Bool(call.equals(&a, &b)?))
}

fn primitive_equals_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let (a, b) = (call.value(0)?, call.value(1)?);
    if a.type_name() != b.type_name() {
        return Ok(Value::Bool(false));
    }
    match (&a, &b) {
        (Value::Null, Value::Null) => Ok(Value::Bool(true)),
        (Value::Bool(x), Value::Bool(y)) => Ok(Value::Bool(x == y)),
        (Value::Number(x), Value::Number(y)) => Ok(Value::Bool(x == y)),
        (Value::Str(x), Value::Str(y)) => Ok(Value::Bool(x == y)),
        _ => Err(call.fail(format!(
            "primitiveEquals operates on primitive types, got {}",
            a.type_name()
        ))),
    }
}

fn assert_equal_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let (a, b) = (call.value(0)?, call.value(1)?);
    if call.equals(&a, &b)? {
        return Ok(Value::Bool(true));
    }
    let render = |v: &Value| -> EvalResult<String> { Ok(json::compact(&call.vm.manifest_json(v, call.span)?)) };
    Err(call.vm.error(
        RuntimeErrorKind::AssertionFailed,
        format!("Assertion failed. {} != {}", render(&a)?, render(&b)?),
        call.span,
    ))
}

// ===== 数组 =====

fn make_array_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let size = call.count_arg(0)?;
    let func = call.function(1)?;
    let items = (0..size)
        .map(|i| {
            let index = call.alloc(Value::Number(i as f64));
            call.defer(&func, vec![index])
        })
        .collect();
    Ok(Value::array(items))
}

fn filter_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let func = call.function(0)?;
    let items = call.array(1)?;
    let mut kept = Vec::new();
    for id in items.iter() {
        match call.call(&func, vec![*id])? {
            Value::Bool(true) => kept.push(*id),
            Value::Bool(false) => {}
            other => {
                return Err(call.fail(format!(
                    "filter function must return boolean, got {}",
                    other.type_name()
                )))
            }
        }
    }
    Ok(Value::array(kept))
}

fn map_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let func = call.function(0)?;
    let items = match call.value(1)? {
        Value::Array(items) => items.to_vec(),
        Value::Str(s) => char_array(call, &s),
        other => return Err(call.type_error(1, "array or string", &other)),
    };
    Ok(Value::array(items.into_iter().map(|id| call.defer(&func, vec![id])).collect()))
}

fn flat_map_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let func = call.function(0)?;
    match call.value(1)? {
        Value::Array(items) => {
            let mut out = Vec::new();
            for id in items.iter() {
                match call.call(&func, vec![*id])? {
                    Value::Array(part) => out.extend(part.iter().copied()),
                    other => {
                        return Err(call.fail(format!(
                            "flatMap function must return an array, got {}",
                            other.type_name()
                        )))
                    }
                }
            }
            Ok(Value::array(out))
        }
        Value::Str(s) => {
            let mut out = String::new();
            for id in char_array(call, &s) {
                match call.call(&func, vec![id])? {
                    Value::Str(part) => out.push_str(&part),
                    other => {
                        return Err(call.fail(format!(
                            "flatMap function must return a string, got {}",
                            other.type_name()
                        )))
                    }
                }
            }
            Ok(Value::string(out))
        }
        other => Err(call.type_error(1, "array or string", &other)),
    }
}

fn foldl_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let func = call.function(0)?;
    let items = call.array(1)?;
    let mut acc = call.args[2];
    for id in items.iter() {
        let next = call.call(&func, vec![acc, *id])?;
        acc = call.alloc(next);
    }
    call.vm.force(acc)
}

fn foldr_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let func = call.function(0)?;
    let items = call.array(1)?;
    let mut acc = call.args[2];
    for id in items.iter().rev() {
        let next = call.call(&func, vec![*id, acc])?;
        acc = call.alloc(next);
    }
    call.vm.force(acc)
}

fn range_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let from = call.int_arg(0)?;
    let to = call.int_arg(1)?;
    let items = (from..=to).map(|i| call.alloc(Value::Number(i as f64))).collect();
    Ok(Value::array(items))
}

fn join_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let items = call.array(1)?;
    match call.value(0)? {
        Value::Str(sep) => {
            let mut parts = Vec::with_capacity(items.len());
            for id in items.iter() {
                match call.vm.force(*id)? {
                    Value::Null => {}
                    Value::Str(s) => parts.push(s),
                    other => {
                        return Err(call.fail(format!(
                            "join expected string but got {}",
                            other.type_name()
                        )))
                    }
                }
            }
            Ok(Value::string(parts.join(&*sep)))
        }
        Value::Array(sep) => {
            let mut out = Vec::new();
            let mut first = true;
            for id in items.iter() {
                match call.vm.force(*id)? {
                    Value::Null => {}
                    Value::Array(part) => {
                        if !first {
                            out.extend(sep.iter().copied());
                        }
                        first = false;
                        out.extend(part.iter().copied());
                    }
                    other => {
                        return Err(call.fail(format!(
                            "join expected array but got {}",
                            other.type_name()
                        )))
                    }
                }
            }
            Ok(Value::array(out))
        }
        other => Err(call.type_error(0, "string or array", &other)),
    }
}

fn lines_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let items = call.array(0)?;
    let mut out = String::new();
    for id in items.iter() {
        match call.vm.force(*id)? {
            Value::Null => {}
            Value::Str(s) => {
                out.push_str(&s);
                out.push('\n');
            }
            other => {
                return Err(call.fail(format!(
                    "lines expected string but got {}",
                    other.type_name()
                )))
            }
        }
    }
    Ok(Value::string(out))
}

fn count_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let items = call.array(0)?;
    let x = call.value(1)?;
    let mut n = 0;
    for id in items.iter() {
        if call.equals(&call.vm.force(*id)?, &x)? {
            n += 1;
        }
    }
    Ok(Value::Number(n as f64))
}

fn reverse_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    match call.value(0)? {
        Value::Array(items) => Ok(Value::array(items.iter().rev().copied().collect())),
        Value::Str(s) => Ok(Value::string(s.chars().rev().collect::<String>())),
        other => Err(call.type_error(0, "array or string", &other)),
    }
}

fn member_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    match call.value(0)? {
        Value::Array(items) => {
            let x = call.value(1)?;
            for id in items.iter() {
                if call.equals(&call.vm.force(*id)?, &x)? {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        Value::Str(s) => {
            let x = call.string(1)?;
            Ok(Value::Bool(s.contains(&*x)))
        }
        other => Err(call.type_error(0, "array or string", &other)),
    }
}

fn slice_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let target = call.value(0)?;
    let len = match &target {
        Value::Array(items) => items.len(),
        Value::Str(s) => strings::char_len(s),
        other => return Err(call.type_error(0, "array or string", other)),
    };
    let bound = |i: usize, default: usize| -> EvalResult<usize> {
        match call.value(i)? {
            Value::Null => Ok(default),
            Value::Number(n) if n >= 0.0 && n.fract() == 0.0 => Ok(n as usize),
            Value::Number(n) => Err(call.fail(format!(
                "Slice {} must be a non-negative integer, got {}",
                call.spec.params[i], n
            ))),
            other => Err(call.type_error(i, "number", &other)),
        }
    };
    let start = bound(1, 0)?;
    let end = bound(2, len)?.min(len);
    let step = bound(3, 1)?;
    if step == 0 {
        return Err(call.fail("Slice step must be positive, got 0"));
    }
    let indices = (start..end).step_by(step);
    match target {
        Value::Array(items) => Ok(Value::array(indices.map(|i| items[i]).collect())),
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            Ok(Value::string(indices.map(|i| chars[i]).collect::<String>()))
        }
        _ => Ok(Value::Null),
    }
}

fn sort_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let items = call.array(0)?;
    let key_fn = call.key_function(1)?;
    let sorted = sorted_keyed(call, &items, &key_fn)?;
    Ok(Value::array(sorted.into_iter().map(|(_, id)| id).collect()))
}

fn sorted_keyed(
    call: &BuiltinCall<'_, '_>,
    items: &[ThunkId],
    key_fn: &Option<Rc<FunctionValue>>,
) -> EvalResult<Vec<(Value, ThunkId)>> {
    let keyed = call.keyed(items, key_fn)?;
    merge_sort(keyed, &mut |a, b| call.compare(&a.0, &b.0))
}

/// 去掉相邻的重复元素（按 key 比较）
fn dedup_keyed(call: &BuiltinCall<'_, '_>, keyed: Vec<(Value, ThunkId)>) -> EvalResult<Vec<ThunkId>> {
    let mut out: Vec<ThunkId> = Vec::with_capacity(keyed.len());
    let mut last: Option<Value> = None;
    for (key, id) in keyed {
        if let Some(prev) = &last {
            if call.equals(prev, &key)? {
                continue;
            }
        }
        out.push(id);
        last = Some(key);
    }
    Ok(out)
}

fn uniq_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let items = call.array(0)?;
    let key_fn = call.key_function(1)?;
    let keyed = call.keyed(&items, &key_fn)?;
    Ok(Value::array(dedup_keyed(call, keyed)?))
}

fn set_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let items = call.array(0)?;
    let key_fn = call.key_function(1)?;
    let sorted = sorted_keyed(call, &items, &key_fn)?;
    Ok(Value::array(dedup_keyed(call, sorted)?))
}

fn set_member_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let items = call.array(1)?;
    let key_fn = call.key_function(2)?;
    let needle = call.key(&key_fn, call.args[0])?;
    for id in items.iter() {
        if call.equals(&call.key(&key_fn, *id)?, &needle)? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn set_union_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let a = call.array(0)?;
    let b = call.array(1)?;
    let key_fn = call.key_function(2)?;
    let all: Vec<ThunkId> = a.iter().chain(b.iter()).copied().collect();
    let sorted = sorted_keyed(call, &all, &key_fn)?;
    Ok(Value::array(dedup_keyed(call, sorted)?))
}

/// 两个有序集合的归并遍历：`keep_common` 为真时求交集，否则求差集
fn set_merge(call: &BuiltinCall<'_, '_>, keep_common: bool) -> EvalResult<Value> {
    let a = call.array(0)?;
    let b = call.array(1)?;
    let key_fn = call.key_function(2)?;
    let a = call.keyed(&a, &key_fn)?;
    let b = call.keyed(&b, &key_fn)?;

    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match call.compare(&a[i].0, &b[j].0)? {
            Ordering::Less => {
                if !keep_common {
                    out.push(a[i].1);
                }
                i += 1;
            }
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                if keep_common {
                    out.push(a[i].1);
                }
                i += 1;
                j += 1;
            }
        }
    }
    if !keep_common {
        out.extend(a[i..].iter().map(|(_, id)| *id));
    }
    Ok(Value::array(out))
}

fn set_inter_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    set_merge(call, true)
}

fn set_diff_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    set_merge(call, false)
}

// ===== 对象 =====

fn field_name_array(call: &BuiltinCall<'_, '_>, obj: &ObjectValue, include_hidden: bool) -> Value {
    let names = obj
        .field_names(include_hidden)
        .into_iter()
        .map(|name| call.alloc(Value::Str(name)))
        .collect();
    Value::array(names)
}

fn object_fields_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let obj = call.object(0)?;
    Ok(field_name_array(call, &obj, false))
}

fn object_fields_all_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let obj = call.object(0)?;
    Ok(field_name_array(call, &obj, true))
}

fn object_fields_ex_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let obj = call.object(0)?;
    let hidden = call.boolean(1)?;
    Ok(field_name_array(call, &obj, hidden))
}

fn has_field(obj: &ObjectValue, name: &str, include_hidden: bool) -> bool {
    obj.has_field(name) && (include_hidden || obj.is_visible(name))
}

fn object_has_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let obj = call.object(0)?;
    let name = call.string(1)?;
    Ok(Value::Bool(has_field(&obj, &name, false)))
}

fn object_has_all_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let obj = call.object(0)?;
    let name = call.string(1)?;
    Ok(Value::Bool(has_field(&obj, &name, true)))
}

fn object_has_ex_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let obj = call.object(0)?;
    let name = call.string(1)?;
    let hidden = call.boolean(2)?;
    Ok(Value::Bool(has_field(&obj, &name, hidden)))
}

fn map_with_key_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let func = call.function(0)?;
    let obj = call.object(1)?;
    call.vm.ensure_asserts(&obj, call.span)?;

    let mut fields = BTreeMap::new();
    for name in obj.field_names(false) {
        let Some(value) = call.vm.object_field(&obj, 0, &name) else {
            continue;
        };
        let key = call.alloc(Value::Str(Rc::clone(&name)));
        fields.insert(
            name,
            LayerField::Thunk {
                visibility: Visibility::Inherit,
                thunk: call.defer(&func, vec![key, value]),
            },
        );
    }
    let layer = Layer::new(call.vm.empty_env(), fields, Vec::new());
    Ok(Value::Object(ObjectValue::new(vec![Rc::new(layer)], call.span.clone())))
}

// ===== 字符串 =====

fn to_string_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let value = call.value(0)?;
    Ok(Value::string(call.vm.to_string(&value, call.span)?))
}

fn codepoint_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let s = call.string(0)?;
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Value::Number(c as u32 as f64)),
        _ => Err(call.fail(format!(
            "codepoint takes a string of length 1, got length {}",
            strings::char_len(&s)
        ))),
    }
}

fn char_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let n = call.number(0)?;
    let c = (n >= 0.0 && n.fract() == 0.0)
        .then(|| char::from_u32(n as u32))
        .flatten()
        .ok_or_else(|| call.fail(format!("Invalid unicode codepoint, got {n}")))?;
    Ok(Value::string(c.to_string()))
}

fn substr_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let s = call.string(0)?;
    let from = call.count_arg(1)?;
    let len = call.count_arg(2)?;
    Ok(Value::string(strings::substr(&s, from, len)))
}

fn starts_with_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let (a, b) = (call.string(0)?, call.string(1)?);
    Ok(Value::Bool(a.starts_with(&*b)))
}

fn ends_with_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let (a, b) = (call.string(0)?, call.string(1)?);
    Ok(Value::Bool(a.ends_with(&*b)))
}

fn string_chars_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let s = call.string(0)?;
    Ok(Value::array(char_array(call, &s)))
}

fn split_with(call: &BuiltinCall<'_, '_>, max_splits: Option<usize>) -> EvalResult<Value> {
    let s = call.string(0)?;
    let sep = call.string(1)?;
    if sep.is_empty() {
        return Err(call.fail("Cannot split by an empty string"));
    }
    let parts = strings::split_limit(&s, &sep, max_splits)
        .into_iter()
        .map(|part| call.alloc(Value::string(part)))
        .collect();
    Ok(Value::array(parts))
}

fn split_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    split_with(call, None)
}

fn split_limit_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let max = call.number(2)?;
    if max == -1.0 {
        return split_with(call, None);
    }
    split_with(call, Some(call.count_arg(2)?))
}

fn str_replace_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let s = call.string(0)?;
    let from = call.string(1)?;
    let to = call.string(2)?;
    if from.is_empty() {
        return Err(call.fail("'from' string must not be zero length."));
    }
    Ok(Value::string(s.replace(&*from, &to)))
}

fn ascii_upper_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    Ok(Value::string(call.string(0)?.to_ascii_uppercase()))
}

fn ascii_lower_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    Ok(Value::string(call.string(0)?.to_ascii_lowercase()))
}

fn format_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let fmt = call.string(0)?;
    let values = call.value(1)?;
    Ok(Value::string(format_values(call.vm, &fmt, &values, call.span)?))
}

fn escape_string_json_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let value = call.value(0)?;
    let s = call.vm.to_string(&value, call.span)?;
    Ok(Value::string(strings::escape_json(&s)))
}

fn manifest_json_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let value = call.value(0)?;
    let json = call.vm.manifest_json(&value, call.span)?;
    Ok(Value::string(json::render(&json, 4)))
}

// ===== 数学 =====

fn abs_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    Ok(Value::Number(call.number(0)?.abs()))
}

fn sign_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let n = call.number(0)?;
    let sign = if n > 0.0 {
        1.0
    } else if n < 0.0 {
        -1.0
    } else {
        0.0
    };
    Ok(Value::Number(sign))
}

fn max_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    Ok(Value::Number(call.number(0)?.max(call.number(1)?)))
}

fn min_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    Ok(Value::Number(call.number(0)?.min(call.number(1)?)))
}

fn pow_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    call.checked(call.number(0)?.powf(call.number(1)?))
}

fn exp_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    call.checked(call.number(0)?.exp())
}

fn log_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    call.checked(call.number(0)?.ln())
}

fn floor_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    Ok(Value::Number(call.number(0)?.floor()))
}

fn ceil_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    Ok(Value::Number(call.number(0)?.ceil()))
}

fn sqrt_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    call.checked(call.number(0)?.sqrt())
}

fn sin_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    call.checked(call.number(0)?.sin())
}

fn cos_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    call.checked(call.number(0)?.cos())
}

fn tan_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    call.checked(call.number(0)?.tan())
}

fn asin_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    call.checked(call.number(0)?.asin())
}

fn acos_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    call.checked(call.number(0)?.acos())
}

fn atan_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    call.checked(call.number(0)?.atan())
}

/// `x = m * 2^e`，`0.5 <= |m| < 1`
fn frexp(x: f64) -> (f64, i32) {
    if x == 0.0 || !x.is_finite() {
        return (x, 0);
    }
    let mut exp = x.abs().log2().floor() as i32 + 1;
    let mut mantissa = x / 2f64.powi(exp);
    // log2 的舍入误差
    if mantissa.abs() >= 1.0 {
        mantissa /= 2.0;
        exp += 1;
    } else if mantissa.abs() < 0.5 {
        mantissa *= 2.0;
        exp -= 1;
    }
    (mantissa, exp)
}

fn mantissa_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    Ok(Value::Number(frexp(call.number(0)?).0))
}

fn exponent_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    Ok(Value::Number(frexp(call.number(0)?).1 as f64))
}

fn modulo_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let (a, b) = (call.number(0)?, call.number(1)?);
    if b == 0.0 {
        return Err(call.fail("Division by zero."));
    }
    call.checked(a % b)
}

/// `a % b`：字符串左操作数表示格式化
fn mod_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    match (call.value(0)?, call.value(1)?) {
        (Value::Str(fmt), values) => Ok(Value::string(format_values(call.vm, &fmt, &values, call.span)?)),
        (Value::Number(_), Value::Number(_)) => modulo_fn(call),
        (a, b) => Err(call.vm.error(
            RuntimeErrorKind::TypeMismatch,
            format!(
                "Operator % cannot be used on types {} and {}.",
                a.type_name(),
                b.type_name()
            ),
            call.span,
        )),
    }
}

// ===== 宿主输入 =====

fn ext_var_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let name = call.string(0)?;
    call.vm.ext_var(&name, call.span)
}

fn native_fn(call: &BuiltinCall<'_, '_>) -> EvalResult<Value> {
    let name = call.string(0)?;
    let Some(native) = call.vm.natives().get(&name) else {
        return Err(call.fail(format!("Unrecognized native function name: {name}")));
    };
    let params = native.params.iter().map(|p| Rc::from(p.as_str())).collect();
    Ok(Value::Function(Rc::new(FunctionValue::Native { name, params })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let spec = builtin("foldl").expect("foldl registered");
        assert_eq!(spec.params, ["func", "arr", "init"]);
        assert_eq!(spec.required, 3);
        assert!(builtin("nope").is_none());
    }

    #[test]
    fn test_builtin_names_unique_and_sorted() {
        let names = builtin_names();
        let mut deduped = names.clone();
        deduped.dedup();
        assert_eq!(names, deduped);
        assert!(names.contains(&"mapWithKey"));
        assert!(names.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_required_never_exceeds_params() {
        for spec in BUILTINS {
            assert!(spec.required <= spec.params.len(), "{}", spec.name);
        }
    }

    #[test]
    fn test_frexp() {
        assert_eq!(frexp(8.0), (0.5, 4));
        assert_eq!(frexp(1.0), (0.5, 1));
        assert_eq!(frexp(-3.0), (-0.75, 2));
        assert_eq!(frexp(0.0), (0.0, 0));
        assert_eq!(frexp(0.1).1, -3);
    }

    #[test]
    fn test_merge_sort_is_stable() {
        let items = vec![(2, 'a'), (1, 'b'), (2, 'c'), (1, 'd')];
        let sorted = merge_sort(items, &mut |a, b| Ok(a.0.cmp(&b.0))).unwrap();
        assert_eq!(sorted, [(1, 'b'), (1, 'd'), (2, 'a'), (2, 'c')]);
    }
}
