//! 规范 JSON 输出
//!
//! 字段按码点排序（`serde_json::Map` 默认即为有序表），空数组 / 空对象输出为 `[ ]` / `{ }`。

use crate::kit::strings::escape_json;
use serde_json::Value;

/// 2^53
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// 数字的文本形式：2^53 以内的整数不带小数部分，其余取最短往返表示
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER {
        return format!("{}", n as i64);
    }
    let abs = n.abs();
    if abs >= 1e17 || (abs != 0.0 && abs < 1e-5) {
        format!("{n:e}")
    } else {
        format!("{n}")
    }
}

fn number(n: &serde_json::Number) -> String {
    match n.as_i64() {
        Some(i) => i.to_string(),
        None => format_number(n.as_f64().unwrap_or(0.0)),
    }
}

/// 多行输出，每层缩进 `indent` 个空格
pub fn render(value: &Value, indent: usize) -> String {
    let mut out = String::new();
    write_pretty(&mut out, value, indent, 0);
    out
}

fn write_pretty(out: &mut String, value: &Value, indent: usize, level: usize) {
    let pad = |level: usize| " ".repeat(indent * level);
    match value {
        Value::Array(items) if items.is_empty() => out.push_str("[ ]"),
        Value::Array(items) => {
            out.push_str("[\n");
            for (i, item) in items.iter().enumerate() {
                out.push_str(&pad(level + 1));
                write_pretty(out, item, indent, level + 1);
                out.push_str(if i + 1 < items.len() { ",\n" } else { "\n" });
            }
            out.push_str(&pad(level));
            out.push(']');
        }
        Value::Object(map) if map.is_empty() => out.push_str("{ }"),
        Value::Object(map) => {
            out.push_str("{\n");
            for (i, (key, item)) in map.iter().enumerate() {
                out.push_str(&pad(level + 1));
                out.push_str(&escape_json(key));
                out.push_str(": ");
                write_pretty(out, item, indent, level + 1);
                out.push_str(if i + 1 < map.len() { ",\n" } else { "\n" });
            }
            out.push_str(&pad(level));
            out.push('}');
        }
        scalar => out.push_str(&compact(scalar)),
    }
}

/// 单行输出：`{"a": 1, "b": [1, 2]}`
pub fn compact(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number(n),
        Value::String(s) => escape_json(s),
        Value::Array(items) if items.is_empty() => "[ ]".to_string(),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(compact).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) if map.is_empty() => "{ }".to_string(),
        Value::Object(map) => {
            let fields: Vec<String> = map
                .iter()
                .map(|(key, item)| format!("{}: {}", escape_json(key), compact(item)))
                .collect();
            format!("{{{}}}", fields.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.1), "0.1");
        assert_eq!(format_number(1.5e300), "1.5e300");
        assert_eq!(format_number(2e-7), "2e-7");
    }

    #[test]
    fn test_render_pretty() {
        let value = json!({"b": [1, 2.5], "a": {}, "c": []});
        let expected = "{\n   \"a\": { },\n   \"b\": [\n      1,\n      2.5\n   ],\n   \"c\": [ ]\n}";
        assert_eq!(render(&value, 3), expected);
    }

    #[test]
    fn test_render_scalars() {
        assert_eq!(render(&json!("a\nb"), 3), "\"a\\nb\"");
        assert_eq!(render(&json!(null), 3), "null");
        assert_eq!(render(&json!([]), 3), "[ ]");
    }

    #[test]
    fn test_compact() {
        let value = json!({"a": 1, "b": [true, null], "c": "x"});
        assert_eq!(compact(&value), "{\"a\": 1, \"b\": [true, null], \"c\": \"x\"}");
    }
}
