//! 值的输出：强制求值整棵值树并转为 JSON

use super::Vm;
use crate::formatter::json;
use crate::kit::lexer::SourceSpan;
use crate::runtime::error::{EvalResult, FrameName, RuntimeErrorKind};
use crate::runtime::value::{Layer, LayerField, ObjectValue, Value};
use crate::compiler::parser::ast::Visibility;
use jsonlang_config::ManifestConfig;
use std::collections::BTreeMap;
use std::rc::Rc;

/// 能精确表示为整数的上界（2^53）
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

impl<'a> Vm<'a> {
    /// 完全强制求值并转为 JSON；对象字段按码点排序，隐藏字段省略
    pub(crate) fn manifest_json(&self, value: &Value, span: &SourceSpan) -> EvalResult<serde_json::Value> {
        match value {
            Value::Null => Ok(serde_json::Value::Null),
            Value::Bool(b) => Ok(serde_json::Value::Bool(*b)),
            Value::Number(n) => number_json(*n).ok_or_else(|| {
                let message = if n.is_nan() { "Not a number" } else { "Overflow" };
                self.error(RuntimeErrorKind::Evaluation, message, span)
            }),
            Value::Str(s) => Ok(serde_json::Value::String(s.to_string())),
            Value::Array(items) => {
                let _guard = self.enter(span, FrameName::Array)?;
                let mut out = Vec::with_capacity(items.len());
                for id in items.iter() {
                    let item = self.force(*id)?;
                    out.push(self.manifest_json(&item, span)?);
                }
                Ok(serde_json::Value::Array(out))
            }
            Value::Object(obj) => {
                let _guard = self.enter(obj.span(), FrameName::Object)?;
                self.ensure_asserts(obj, obj.span())?;
                let mut map = serde_json::Map::new();
                for name in obj.field_names(false) {
                    let field = self.get_field(obj, &name, obj.span())?;
                    map.insert(name.to_string(), self.manifest_json(&field, obj.span())?);
                }
                Ok(serde_json::Value::Object(map))
            }
            Value::Function(_) => Err(self.error(
                RuntimeErrorKind::Manifest,
                "Couldn't manifest function as JSON",
                span,
            )),
        }
    }

    /// `std.toString` 与字符串拼接：字符串原样，其余为紧凑 JSON
    pub(crate) fn to_string(&self, value: &Value, span: &SourceSpan) -> EvalResult<String> {
        match value {
            Value::Str(s) => Ok(s.to_string()),
            other => Ok(json::compact(&self.manifest_json(other, span)?)),
        }
    }

    /// 宿主 JSON 转回运行时值（原生函数的返回值）
    pub(crate) fn from_json(&self, value: &serde_json::Value) -> Value {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => Value::string(s.as_str()),
            serde_json::Value::Array(items) => Value::array(
                items
                    .iter()
                    .map(|item| self.heap.alloc_value(self.from_json(item)))
                    .collect(),
            ),
            serde_json::Value::Object(map) => {
                let fields = map
                    .iter()
                    .map(|(name, item)| {
                        let thunk = self.heap.alloc_value(self.from_json(item));
                        (
                            Rc::from(name.as_str()),
                            LayerField::Thunk {
                                visibility: Visibility::Inherit,
                                thunk,
                            },
                        )
                    })
                    .collect::<BTreeMap<_, _>>();
                let layer = Layer::new(self.empty_env, fields, Vec::new());
                Value::Object(ObjectValue::new(vec![Rc::new(layer)], self.root_span()))
            }
        }
    }

    fn document(&self, value: &Value, config: &ManifestConfig, span: &SourceSpan) -> EvalResult<String> {
        if config.string_output {
            return match value {
                Value::Str(s) => Ok(format!("{s}\n")),
                other => Err(self.error(
                    RuntimeErrorKind::Manifest,
                    format!("Expected string result, got: {}", other.type_name()),
                    span,
                )),
            };
        }
        let json = self.manifest_json(value, span)?;
        Ok(format!("{}\n", json::render(&json, config.indent)))
    }

    /// 单个文档
    pub fn manifest_regular(&self, value: &Value, config: &ManifestConfig) -> EvalResult<String> {
        self.document(value, config, &self.root_span())
    }

    /// 顶层对象：文件名 -> 文档
    pub fn manifest_multi(&self, value: &Value, config: &ManifestConfig) -> EvalResult<BTreeMap<String, String>> {
        let span = self.root_span();
        let Value::Object(obj) = value else {
            return Err(self.error(
                RuntimeErrorKind::Manifest,
                format!(
                    "Multi mode: top-level object was a {}, should be an object whose keys are filenames and values hold the JSON for that file.",
                    value.type_name()
                ),
                &span,
            ));
        };
        self.ensure_asserts(obj, &span)?;
        let mut files = BTreeMap::new();
        for name in obj.field_names(false) {
            let field = self.get_field(obj, &name, &span)?;
            files.insert(name.to_string(), self.document(&field, config, &span)?);
        }
        Ok(files)
    }

    /// 顶层数组：文档流
    pub fn manifest_stream(&self, value: &Value, config: &ManifestConfig) -> EvalResult<Vec<String>> {
        let span = self.root_span();
        let Value::Array(items) = value else {
            return Err(self.error(
                RuntimeErrorKind::Manifest,
                format!(
                    "Stream mode: top-level object was a {}, should be an array whose elements hold the JSON for each document in the stream.",
                    value.type_name()
                ),
                &span,
            ));
        };
        let mut docs = Vec::with_capacity(items.len());
        for id in items.iter() {
            let item = self.force(*id)?;
            docs.push(self.document(&item, config, &span)?);
        }
        Ok(docs)
    }
}

/// 2^53 以内的整数按整数输出；NaN 和无穷没有 JSON 表示
fn number_json(n: f64) -> Option<serde_json::Value> {
    if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER {
        Some(serde_json::Value::from(n as i64))
    } else {
        serde_json::Number::from_f64(n).map(serde_json::Value::Number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_json() {
        assert_eq!(number_json(3.0), Some(serde_json::json!(3)));
        assert_eq!(number_json(0.5), Some(serde_json::json!(0.5)));
        assert_eq!(number_json(1e300), Some(serde_json::json!(1e300)));
        assert_eq!(number_json(f64::INFINITY), None);
        assert_eq!(number_json(f64::NAN), None);
    }
}
