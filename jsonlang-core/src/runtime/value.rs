//! 运行时值
//!
//! 数组和对象字段保存的是 thunk 句柄而不是值，读取时才强制求值。
//! 对象由若干层（layer）组成，`a + b` 把 b 的层放在 a 的层前面。

use super::heap::{EnvId, ThunkId};
use super::stdlib::BuiltinSpec;
use crate::compiler::desugar::core::{CoreExpr, CoreParam};
use crate::compiler::parser::ast::Visibility;
use crate::kit::lexer::SourceSpan;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Array(Rc<Vec<ThunkId>>),
    Object(ObjectValue),
    Function(Rc<FunctionValue>),
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn array(items: Vec<ThunkId>) -> Self {
        Value::Array(Rc::new(items))
    }

    /// `std.type` 的返回值，也用于错误消息
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }
}

/// `self` 绑定：最终对象 + 当前字段所在层
#[derive(Debug, Clone)]
pub struct SelfBinding {
    pub object: ObjectValue,
    /// `super` 从 `offset + 1` 层开始查找
    pub offset: usize,
}

/// 求值上下文：词法环境 + 可选的 self
#[derive(Debug, Clone)]
pub struct Scope {
    pub env: EnvId,
    pub this: Option<SelfBinding>,
}

impl Scope {
    pub fn new(env: EnvId, this: Option<SelfBinding>) -> Self {
        Self { env, this }
    }

    /// 同一 self，换一个环境
    pub fn with_env(&self, env: EnvId) -> Self {
        Self {
            env,
            this: self.this.clone(),
        }
    }
}

#[derive(Debug)]
pub enum FunctionValue {
    Closure {
        params: Rc<[CoreParam]>,
        body: CoreExpr,
        scope: Scope,
    },
    Builtin(&'static BuiltinSpec),
    /// 宿主注册的原生函数，参数名来自注册表
    Native { name: Rc<str>, params: Rc<[Rc<str>]> },
}

impl FunctionValue {
    pub fn param_names(&self) -> Vec<Rc<str>> {
        match self {
            FunctionValue::Closure { params, .. } => params.iter().map(|p| Rc::clone(&p.name)).collect(),
            FunctionValue::Builtin(spec) => spec.params.iter().map(|p| Rc::from(*p)).collect(),
            FunctionValue::Native { params, .. } => params.to_vec(),
        }
    }
}

/// 对象层中的字段
#[derive(Debug, Clone)]
pub enum LayerField {
    /// 对象字面量字段：在层环境中、以 self 绑定求值
    Expr { visibility: Visibility, body: CoreExpr },
    /// 推导式字段：每个字段有自己的元素帧
    Scoped { body: CoreExpr, env: EnvId },
    /// 已经与 self 无关的 thunk（std、mapWithKey 等）
    Thunk { visibility: Visibility, thunk: ThunkId },
}

impl LayerField {
    pub fn visibility(&self) -> Visibility {
        match self {
            LayerField::Expr { visibility, .. } | LayerField::Thunk { visibility, .. } => *visibility,
            LayerField::Scoped { .. } => Visibility::Inherit,
        }
    }
}

#[derive(Debug)]
pub struct Layer {
    pub env: EnvId,
    pub fields: BTreeMap<Rc<str>, LayerField>,
    pub asserts: Vec<CoreExpr>,
}

impl Layer {
    pub fn new(env: EnvId, fields: BTreeMap<Rc<str>, LayerField>, asserts: Vec<CoreExpr>) -> Self {
        Self {
            env,
            fields,
            asserts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssertState {
    Unchecked,
    Checking,
    Passed,
}

#[derive(Debug)]
pub struct ObjectData {
    /// 最前面是最后叠加（最“派生”）的层
    pub layers: Vec<Rc<Layer>>,
    /// 创建位置（输出和比较时的栈帧位置）
    pub span: SourceSpan,
    /// (层号, 字段名) -> 字段 thunk，保证每个字段体对同一对象只求值一次
    pub(crate) field_cache: RefCell<HashMap<(usize, Rc<str>), ThunkId>>,
    pub(crate) assert_state: Cell<AssertState>,
}

/// 对象值（共享所有权）
#[derive(Debug, Clone)]
pub struct ObjectValue(pub Rc<ObjectData>);

impl ObjectValue {
    pub fn new(layers: Vec<Rc<Layer>>, span: SourceSpan) -> Self {
        ObjectValue(Rc::new(ObjectData {
            layers,
            span,
            field_cache: RefCell::new(HashMap::new()),
            assert_state: Cell::new(AssertState::Unchecked),
        }))
    }

    /// `left + right`：右侧的层在前
    pub fn extend(left: &ObjectValue, right: &ObjectValue, span: SourceSpan) -> Self {
        let layers = right
            .layers()
            .iter()
            .chain(left.layers().iter())
            .cloned()
            .collect();
        Self::new(layers, span)
    }

    pub fn layers(&self) -> &[Rc<Layer>] {
        &self.0.layers
    }

    pub fn span(&self) -> &SourceSpan {
        &self.0.span
    }

    pub fn ptr_eq(&self, other: &ObjectValue) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// 从第 `offset` 层开始第一个含有该字段的层号
    pub fn find_layer(&self, offset: usize, name: &str) -> Option<usize> {
        self.layers()
            .iter()
            .enumerate()
            .skip(offset)
            .find(|(_, layer)| layer.fields.contains_key(name))
            .map(|(i, _)| i)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.find_layer(0, name).is_some()
    }

    /// 字段最终是否可见：由前往后第一个非 `:` 的声明决定，全部为 `:` 时可见
    pub fn is_visible(&self, name: &str) -> bool {
        for layer in self.layers() {
            if let Some(field) = layer.fields.get(name) {
                match field.visibility() {
                    Visibility::Inherit => continue,
                    Visibility::Hidden => return false,
                    Visibility::Visible => return true,
                }
            }
        }
        true
    }

    /// 排序后的字段名；`include_hidden` 为 false 时只含可见字段
    pub fn field_names(&self, include_hidden: bool) -> Vec<Rc<str>> {
        let mut names: Vec<Rc<str>> = Vec::new();
        for layer in self.layers() {
            names.extend(layer.fields.keys().cloned());
        }
        names.sort();
        names.dedup();
        if !include_hidden {
            names.retain(|name| self.is_visible(name));
        }
        names
    }
}
