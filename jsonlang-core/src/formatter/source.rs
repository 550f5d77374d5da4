//! 源码格式化：把 Raw AST 重新打印为规范化的源码
//!
//! 括号按原样保留（解析器保留了 `Parens` 节点），因此不需要按优先级补括号。
//! 注释和空行不在 AST 中，不会被保留。

use crate::compiler::lexer::TokenKind;
use crate::compiler::parser::ast::{
    Args, Bind, CompSpec, ExprKind, ExprNode, Field, FieldName, Member, Param, StringForm,
};
use crate::kit::lexer::scanner::is_identifier;
use jsonlang_config::{FmtConfig, StringStyle};

/// 单行对象 / 数组的最大宽度，超过则换行
const MAX_INLINE_WIDTH: usize = 80;

/// 打印整个表达式（末尾带换行）
pub fn format_expr(expr: &ExprNode, config: &FmtConfig) -> String {
    let printer = Printer { config };
    let mut out = printer.expr(expr, 0);
    out.push('\n');
    out
}

struct Printer<'c> {
    config: &'c FmtConfig,
}

/// 可以不加引号的字段名：合法标识符且不是关键字
fn is_bare_name(s: &str) -> bool {
    is_identifier(s) && TokenKind::keyword(s).is_none()
}

/// 带引号的字符串字面量
fn quote(s: &str, q: char) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push(q);
    for c in s.chars() {
        match c {
            c if c == q => {
                out.push('\\');
                out.push(c);
            }
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(q);
    out
}

impl Printer<'_> {
    fn pad(&self, level: usize) -> String {
        " ".repeat(self.config.indent * level)
    }

    fn string(&self, value: &str, form: StringForm, level: usize) -> String {
        match (self.config.string_style, form) {
            (_, StringForm::Block) => self.text_block(value, level),
            (StringStyle::Leave, StringForm::Single) => quote(value, '\''),
            (StringStyle::Leave, StringForm::VerbatimDouble) => format!("@\"{}\"", value.replace('"', "\"\"")),
            (StringStyle::Leave, StringForm::VerbatimSingle) => format!("@'{}'", value.replace('\'', "''")),
            (StringStyle::Single, _) => quote(value, '\''),
            _ => quote(value, '"'),
        }
    }

    /// `|||` 文本块；内容必须以换行结尾，且首行非空、不以空白开头（否则重新解析时缩进会变），
    /// 不满足时退回普通字符串
    fn text_block(&self, value: &str, level: usize) -> String {
        let body = match value.strip_suffix('\n') {
            Some(body) if !body.is_empty() && !body.starts_with(['\n', ' ', '\t']) => body,
            _ => return quote(value, '"'),
        };
        let inner = " ".repeat(self.config.indent.max(1) * (level + 1));
        let mut out = String::from("|||\n");
        for line in body.split('\n') {
            if !line.is_empty() {
                out.push_str(&inner);
                out.push_str(line);
            }
            out.push('\n');
        }
        out.push_str(&self.pad(level));
        out.push_str("|||");
        out
    }

    fn params(&self, params: &[Param], level: usize) -> String {
        let params: Vec<String> = params
            .iter()
            .map(|p| match &p.default {
                Some(default) => format!("{}={}", p.name, self.expr(default, level)),
                None => p.name.clone(),
            })
            .collect();
        format!("({})", params.join(", "))
    }

    fn args(&self, args: &Args, level: usize) -> String {
        let positional = args.positional.iter().map(|a| self.expr(a, level));
        let named = args
            .named
            .iter()
            .map(|(name, a)| format!("{}={}", name, self.expr(a, level)));
        positional.chain(named).collect::<Vec<_>>().join(", ")
    }

    fn bind(&self, bind: &Bind, level: usize) -> String {
        let params = bind
            .params
            .as_ref()
            .map(|p| self.params(p, level))
            .unwrap_or_default();
        format!("{}{} = {}", bind.name, params, self.expr(&bind.body, level))
    }

    fn specs(&self, specs: &[CompSpec], level: usize) -> String {
        specs
            .iter()
            .map(|spec| match spec {
                CompSpec::For { var, expr } => format!("for {} in {}", var, self.expr(expr, level)),
                CompSpec::If(cond) => format!("if {}", self.expr(cond, level)),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn field_name(&self, name: &FieldName, level: usize) -> String {
        match name {
            FieldName::Id(id) => id.clone(),
            FieldName::Str { value, .. } if self.config.pretty_field_names && is_bare_name(value) => value.clone(),
            FieldName::Str { value, form } => self.string(value, *form, level),
            FieldName::Computed(e) => format!("[{}]", self.expr(e, level)),
        }
    }

    fn field(&self, field: &Field, level: usize) -> String {
        let params = field
            .params
            .as_ref()
            .map(|p| self.params(p, level))
            .unwrap_or_default();
        format!(
            "{}{}{}{} {}",
            self.field_name(&field.name, level),
            params,
            if field.plus { "+" } else { "" },
            field.visibility.colons(),
            self.expr(&field.body, level)
        )
    }

    fn member(&self, member: &Member, level: usize) -> String {
        match member {
            Member::Local(bind) => format!("local {}", self.bind(bind, level)),
            Member::Assert { cond, message } => self.assert_head(cond, message.as_deref(), level),
            Member::Field(field) => self.field(field, level),
        }
    }

    fn assert_head(&self, cond: &ExprNode, message: Option<&ExprNode>, level: usize) -> String {
        match message {
            Some(m) => format!("assert {} : {}", self.expr(cond, level), self.expr(m, level)),
            None => format!("assert {}", self.expr(cond, level)),
        }
    }

    /// 不含换行的片段与缩进层级无关，按 `level + 1` 渲染的结果可直接用于单行形式
    fn inline_fits(parts: &[String]) -> bool {
        parts.iter().all(|p| !p.contains('\n'))
            && parts.iter().map(|p| p.len() + 2).sum::<usize>() <= MAX_INLINE_WIDTH
    }

    /// 每个成员一行
    fn block(&self, open: char, parts: &[String], close: char, level: usize) -> String {
        let mut out = format!("{open}\n");
        for part in parts {
            out.push_str(&self.pad(level + 1));
            out.push_str(part);
            out.push_str(",\n");
        }
        out.push_str(&self.pad(level));
        out.push(close);
        out
    }

    fn array(&self, items: &[Box<ExprNode>], level: usize) -> String {
        if items.is_empty() {
            return "[]".to_string();
        }
        let parts: Vec<String> = items.iter().map(|e| self.expr(e, level + 1)).collect();
        if Self::inline_fits(&parts) {
            let pad = if self.config.pad_arrays { " " } else { "" };
            return format!("[{pad}{}{pad}]", parts.join(", "));
        }
        self.block('[', &parts, ']', level)
    }

    /// 单个成员的对象在足够短时保持单行，其余每个成员一行
    fn object(&self, members: &[Member], level: usize) -> String {
        if members.is_empty() {
            return "{}".to_string();
        }
        let parts: Vec<String> = members.iter().map(|m| self.member(m, level + 1)).collect();
        if parts.len() == 1 && Self::inline_fits(&parts) {
            let pad = if self.config.pad_objects { " " } else { "" };
            return format!("{{{pad}{}{pad}}}", parts[0]);
        }
        self.block('{', &parts, '}', level)
    }

    fn expr(&self, expr: &ExprNode, level: usize) -> String {
        match &expr.kind {
            ExprKind::Null => "null".to_string(),
            ExprKind::True => "true".to_string(),
            ExprKind::False => "false".to_string(),
            ExprKind::SelfRef => "self".to_string(),
            ExprKind::Dollar => "$".to_string(),
            ExprKind::Number { text, .. } => text.clone(),
            ExprKind::Str { value, form } => self.string(value, *form, level),
            ExprKind::Var(name) => name.clone(),
            ExprKind::Array(items) => self.array(items, level),
            ExprKind::ArrayComp { body, specs } => {
                format!("[{} {}]", self.expr(body, level), self.specs(specs, level))
            }
            ExprKind::Object(members) => self.object(members, level),
            ExprKind::ObjectComp { members, specs } => {
                let pad = if self.config.pad_objects { " " } else { "" };
                let members: Vec<String> = members.iter().map(|m| self.member(m, level)).collect();
                format!("{{{pad}{} {}{pad}}}", members.join(", "), self.specs(specs, level))
            }
            ExprKind::Field { target, name } => format!("{}.{}", self.expr(target, level), name),
            ExprKind::Index { target, index } => {
                format!("{}[{}]", self.expr(target, level), self.expr(index, level))
            }
            ExprKind::Slice {
                target,
                start,
                end,
                step,
            } => {
                let part = |e: &Option<Box<ExprNode>>| e.as_ref().map(|e| self.expr(e, level)).unwrap_or_default();
                let mut out = format!("{}[{}:{}", self.expr(target, level), part(start), part(end));
                if step.is_some() {
                    out.push(':');
                    out.push_str(&part(step));
                }
                out.push(']');
                out
            }
            ExprKind::SuperField(name) => format!("super.{name}"),
            ExprKind::SuperIndex(index) => format!("super[{}]", self.expr(index, level)),
            ExprKind::InSuper(name) => format!("{} in super", self.expr(name, level)),
            ExprKind::Apply {
                target,
                args,
                tailstrict,
            } => format!(
                "{}({}){}",
                self.expr(target, level),
                self.args(args, level),
                if *tailstrict { " tailstrict" } else { "" }
            ),
            ExprKind::ApplyBrace { left, right } => {
                format!("{} {}", self.expr(left, level), self.expr(right, level))
            }
            ExprKind::Binary { op, left, right } => format!(
                "{} {} {}",
                self.expr(left, level),
                op.symbol(),
                self.expr(right, level)
            ),
            ExprKind::Unary { op, operand } => format!("{}{}", op.symbol(), self.expr(operand, level)),
            ExprKind::Local { binds, body } => {
                let binds: Vec<String> = binds.iter().map(|b| self.bind(b, level)).collect();
                format!(
                    "local {};\n{}{}",
                    binds.join(", "),
                    self.pad(level),
                    self.expr(body, level)
                )
            }
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let mut out = format!("if {} then {}", self.expr(cond, level), self.expr(then_branch, level));
                if let Some(else_branch) = else_branch {
                    out.push_str(" else ");
                    out.push_str(&self.expr(else_branch, level));
                }
                out
            }
            ExprKind::Function { params, body } => {
                format!("function{} {}", self.params(params, level), self.expr(body, level))
            }
            ExprKind::Assert { cond, message, rest } => format!(
                "{};\n{}{}",
                self.assert_head(cond, message.as_deref(), level),
                self.pad(level),
                self.expr(rest, level)
            ),
            ExprKind::Error(message) => format!("error {}", self.expr(message, level)),
            ExprKind::Import(path) => format!("import {}", self.string(path, StringForm::Double, level)),
            ExprKind::ImportStr(path) => format!("importstr {}", self.string(path, StringForm::Double, level)),
            ExprKind::Parens(inner) => format!("({})", self.expr(inner, level)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::parse_source;
    use jsonlang_log::Logger;

    fn fmt_with(src: &str, config: &FmtConfig) -> String {
        let ast = parse_source("test", src, &Logger::noop());
        assert!(ast.is_ok(), "parse failed: {:?}", ast.err());
        format_expr(&ast.unwrap(), config)
    }

    fn fmt(src: &str) -> String {
        fmt_with(src, &FmtConfig::default())
    }

    #[test]
    fn test_object_multiline() {
        assert_eq!(fmt("{a:1,'b':[1,2]}"), "{\n  a: 1,\n  b: [1, 2],\n}\n");
    }

    #[test]
    fn test_single_member_object_inline() {
        assert_eq!(fmt("{x::  'y'}"), "{ x:: \"y\" }\n");
    }

    #[test]
    fn test_keyword_field_names_stay_quoted() {
        assert_eq!(fmt("{'if': 1, 'a b': 2}"), "{\n  \"if\": 1,\n  \"a b\": 2,\n}\n");
    }

    #[test]
    fn test_local_and_function() {
        assert_eq!(
            fmt("local f(x, y=2) = x+y; f(1)"),
            "local f(x, y=2) = x + y;\nf(1)\n"
        );
    }

    #[test]
    fn test_single_quote_style() {
        let config = FmtConfig {
            string_style: StringStyle::Single,
            ..FmtConfig::default()
        };
        assert_eq!(fmt_with("\"it's\"", &config), "'it\\'s'\n");
    }

    #[test]
    fn test_pad_arrays() {
        let config = FmtConfig {
            pad_arrays: true,
            ..FmtConfig::default()
        };
        assert_eq!(fmt_with("[1,2]", &config), "[ 1, 2 ]\n");
    }

    #[test]
    fn test_slices_and_comprehensions() {
        assert_eq!(fmt("a[1:]"), "a[1:]\n");
        assert_eq!(fmt("a[::2]"), "a[::2]\n");
        assert_eq!(fmt("[x*2 for x in xs if x>1]"), "[x * 2 for x in xs if x > 1]\n");
    }

    #[test]
    fn test_text_block_reindented() {
        assert_eq!(fmt("|||\n    a\n     b\n|||"), "|||\n  a\n   b\n|||\n");
    }

    #[test]
    fn test_wide_nested_arrays_break_per_level() {
        let wide = format!("[[['{}']]]", "x".repeat(90));
        let expected = format!("[\n  [\n    [\n      \"{}\",\n    ],\n  ],\n]\n", "x".repeat(90));
        assert_eq!(fmt(&wide), expected);
    }

    #[test]
    fn test_deep_nesting_formats_in_linear_time() {
        let depth = 1000;
        let src = format!("{}1{}", "[".repeat(depth), "]".repeat(depth));
        let (once, twice) = std::thread::scope(|s| {
            std::thread::Builder::new()
                .stack_size(256 * 1024 * 1024)
                .spawn_scoped(s, || {
                    let once = fmt(&src);
                    let twice = fmt(&once);
                    (once, twice)
                })
                .expect("spawn formatter thread")
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
        });
        assert_eq!(once.matches('[').count(), depth);
        // 最内层 39 层放得进一行（宽 79），再往外逐层换行
        let innermost = format!("{}1{}", "[".repeat(39), "]".repeat(39));
        assert!(once.contains(&format!(" {innermost},\n")), "{once}");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_reformat_is_stable() {
        let once = fmt("local o = {a: {b: 1, c: [1, {d: 2}]}}; o.a + {e: true}");
        let twice = fmt(&once);
        assert_eq!(once, twice);
    }
}
