//! `std.format` / 字符串 `%`：printf 风格的格式化
//!
//! 支持 `%(key)`、标志 `#0- +`、宽度与精度（含 `*`），以及转换
//! `d i u o x X e E f F g G c s r %`。指数部分至少两位，`%g` 按 C 的规则选择形式。

use crate::runtime::vm::Vm;
use crate::formatter::json;
use crate::kit::lexer::SourceSpan;
use crate::runtime::error::{EvalResult, RuntimeErrorKind};
use crate::runtime::heap::ThunkId;
use crate::runtime::value::{ObjectValue, Value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Flags {
    alt: bool,
    zero: bool,
    left: bool,
    blank: bool,
    plus: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Width {
    Star,
    Fixed(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Code {
    key: Option<String>,
    flags: Flags,
    width: Option<Width>,
    precision: Option<Width>,
    conversion: char,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Code(Code),
}

fn parse(fmt: &str) -> Result<Vec<Piece>, String> {
    let chars: Vec<char> = fmt.chars().collect();
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut i = 0;
    let truncated = || "Truncated format code.".to_string();

    while i < chars.len() {
        if chars[i] != '%' {
            literal.push(chars[i]);
            i += 1;
            continue;
        }
        i += 1;

        let mut key = None;
        if chars.get(i) == Some(&'(') {
            let start = i + 1;
            let end = chars[start..]
                .iter()
                .position(|c| *c == ')')
                .map(|p| start + p)
                .ok_or_else(truncated)?;
            key = Some(chars[start..end].iter().collect());
            i = end + 1;
        }

        let mut flags = Flags::default();
        while let Some(c) = chars.get(i) {
            match c {
                '#' => flags.alt = true,
                '0' => flags.zero = true,
                '-' => flags.left = true,
                ' ' => flags.blank = true,
                '+' => flags.plus = true,
                _ => break,
            }
            i += 1;
        }

        let width = parse_width(&chars, &mut i);
        let mut precision = None;
        if chars.get(i) == Some(&'.') {
            i += 1;
            precision = Some(parse_width(&chars, &mut i).unwrap_or(Width::Fixed(0)));
        }

        // 长度修饰符没有意义，跳过
        while matches!(chars.get(i), Some('h' | 'l' | 'L')) {
            i += 1;
        }

        let conversion = *chars.get(i).ok_or_else(truncated)?;
        i += 1;
        if conversion == '%' && key.is_none() && width.is_none() && precision.is_none() {
            literal.push('%');
            continue;
        }
        if !"diuoxXeEfFgGcsr%".contains(conversion) {
            return Err(format!("Unrecognised conversion type: {conversion}"));
        }

        if !literal.is_empty() {
            pieces.push(Piece::Literal(std::mem::take(&mut literal)));
        }
        pieces.push(Piece::Code(Code {
            key,
            flags,
            width,
            precision,
            conversion,
        }));
    }
    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    Ok(pieces)
}

fn parse_width(chars: &[char], i: &mut usize) -> Option<Width> {
    if chars.get(*i) == Some(&'*') {
        *i += 1;
        return Some(Width::Star);
    }
    let start = *i;
    while chars.get(*i).is_some_and(|c| c.is_ascii_digit()) {
        *i += 1;
    }
    if *i == start {
        return None;
    }
    let digits: String = chars[start..*i].iter().collect();
    digits.parse().ok().map(Width::Fixed)
}

/// 值来源：位置参数列表或映射对象
enum Values<'v> {
    Positional(Vec<ThunkId>, usize),
    Mapping(&'v ObjectValue),
}

/// 格式化 `values`：数组为位置参数，对象为映射，其余视为单个参数
pub(crate) fn format_values(vm: &Vm<'_>, fmt: &str, values: &Value, span: &SourceSpan) -> EvalResult<String> {
    let fail = |msg: String| vm.error(RuntimeErrorKind::Evaluation, msg, span);
    let pieces = parse(fmt).map_err(fail)?;

    let mut source = match values {
        Value::Array(items) => Values::Positional(items.to_vec(), 0),
        Value::Object(obj) => Values::Mapping(obj),
        other => Values::Positional(vec![vm.heap.alloc_value(other.clone())], 0),
    };

    let mut out = String::new();
    for piece in pieces {
        let code = match piece {
            Piece::Literal(text) => {
                out.push_str(&text);
                continue;
            }
            Piece::Code(code) => code,
        };

        let next = |source: &mut Values<'_>| -> EvalResult<Value> {
            match source {
                Values::Positional(items, pos) => {
                    let Some(id) = items.get(*pos).copied() else {
                        return Err(fail(format!(
                            "Not enough values to format, got {}",
                            items.len()
                        )));
                    };
                    *pos += 1;
                    vm.force(id)
                }
                Values::Mapping(_) => Err(fail("Format required a mapping key.".to_string())),
            }
        };

        let star = |w: Option<Width>, source: &mut Values<'_>| -> EvalResult<Option<usize>> {
            match w {
                None => Ok(None),
                Some(Width::Fixed(n)) => Ok(Some(n)),
                Some(Width::Star) => match next(source)? {
                    Value::Number(n) if n >= 0.0 => Ok(Some(n as usize)),
                    other => Err(fail(format!(
                        "A * width or precision requires a non-negative number, got {}.",
                        other.type_name()
                    ))),
                },
            }
        };
        let width = star(code.width, &mut source)?.unwrap_or(0);
        let precision = star(code.precision, &mut source)?;

        let value = match &code.key {
            Some(key) => match &source {
                Values::Mapping(obj) => vm.get_field(obj, key, span)?,
                Values::Positional(..) => {
                    return Err(fail("Format required an object when using mapping keys.".to_string()))
                }
            },
            None if code.conversion == '%' => Value::Null,
            None => next(&mut source)?,
        };

        let text = render_code(vm, &code, &value, width, precision, span)?;
        out.push_str(&text);
    }

    if let Values::Positional(items, pos) = &source {
        if *pos < items.len() {
            return Err(fail(format!(
                "Too many values to format: {}, expected {}",
                items.len(),
                pos
            )));
        }
    }
    Ok(out)
}

fn render_code(
    vm: &Vm<'_>,
    code: &Code,
    value: &Value,
    width: usize,
    precision: Option<usize>,
    span: &SourceSpan,
) -> EvalResult<String> {
    let flags = code.flags;
    let type_error = |expected: &str| {
        vm.error(
            RuntimeErrorKind::TypeMismatch,
            format!(
                "Format required {} for %{}, got {}",
                expected,
                code.conversion,
                value.type_name()
            ),
            span,
        )
    };
    let number = || match value {
        Value::Number(n) => Ok(*n),
        _ => Err(type_error("number")),
    };

    let text = match code.conversion {
        '%' => pad("%".to_string(), width, flags.left),
        's' => {
            let s = vm.to_string(value, span)?;
            let s = match precision {
                Some(p) => s.chars().take(p).collect(),
                None => s,
            };
            pad(s, width, flags.left)
        }
        'r' => pad(json::compact(&vm.manifest_json(value, span)?), width, flags.left),
        'c' => {
            let c = match value {
                Value::Number(n) => char::from_u32(*n as u32)
                    .ok_or_else(|| vm.error(RuntimeErrorKind::Evaluation, format!("Invalid codepoint: {n}"), span))?,
                Value::Str(s) if s.chars().count() == 1 => s.chars().next().unwrap_or_default(),
                _ => return Err(type_error("number or single-character string")),
            };
            pad(c.to_string(), width, flags.left)
        }
        'd' | 'i' | 'u' => render_int(number()?, 10, false, "", flags, width, precision),
        'o' => render_int(number()?, 8, false, if flags.alt { "0" } else { "" }, flags, width, precision),
        'x' => render_int(number()?, 16, false, if flags.alt { "0x" } else { "" }, flags, width, precision),
        'X' => render_int(number()?, 16, true, if flags.alt { "0X" } else { "" }, flags, width, precision),
        'e' | 'E' => {
            let n = number()?;
            let body = render_exp(n.abs(), precision.unwrap_or(6), code.conversion == 'E', flags.alt);
            pad_number(n < 0.0, "", body, flags, width)
        }
        'f' | 'F' => {
            let n = number()?;
            let body = render_fixed(n.abs(), precision.unwrap_or(6), flags.alt);
            pad_number(n < 0.0, "", body, flags, width)
        }
        'g' | 'G' => {
            let n = number()?;
            let body = render_general(n.abs(), precision.unwrap_or(6), code.conversion == 'G', flags.alt);
            pad_number(n < 0.0, "", body, flags, width)
        }
        other => {
            return Err(vm.error(
                RuntimeErrorKind::Evaluation,
                format!("Unrecognised conversion type: {other}"),
                span,
            ))
        }
    };
    Ok(text)
}

fn pad(s: String, width: usize, left: bool) -> String {
    let len = s.chars().count();
    if len >= width {
        return s;
    }
    let fill = " ".repeat(width - len);
    if left {
        s + &fill
    } else {
        fill + &s
    }
}

/// 符号、前缀和补零 / 补空格
fn pad_number(negative: bool, prefix: &str, body: String, flags: Flags, width: usize) -> String {
    let sign = if negative {
        "-"
    } else if flags.plus {
        "+"
    } else if flags.blank {
        " "
    } else {
        ""
    };
    let used = sign.len() + prefix.len() + body.chars().count();
    if flags.zero && !flags.left && used < width {
        format!("{sign}{prefix}{}{body}", "0".repeat(width - used))
    } else {
        pad(format!("{sign}{prefix}{body}"), width, flags.left)
    }
}

fn render_int(
    n: f64,
    radix: u32,
    upper: bool,
    prefix: &str,
    flags: Flags,
    width: usize,
    precision: Option<usize>,
) -> String {
    let mut digits = int_digits(n.abs().trunc(), radix, upper);
    if let Some(min) = precision {
        if digits.len() < min {
            digits = "0".repeat(min - digits.len()) + &digits;
        }
    }
    pad_number(n <= -1.0, prefix, digits, flags, width)
}

/// 非负整数值的各进制数字；超出 u64 的值直接按浮点数逐位计算
fn int_digits(magnitude: f64, radix: u32, upper: bool) -> String {
    // 2^64
    const U64_LIMIT: f64 = 18_446_744_073_709_551_616.0;
    if magnitude < U64_LIMIT {
        let m = magnitude as u64;
        return match radix {
            8 => format!("{m:o}"),
            16 if upper => format!("{m:X}"),
            16 => format!("{m:x}"),
            _ => m.to_string(),
        };
    }
    if radix == 10 {
        return format!("{magnitude:.0}");
    }
    // 8 和 16 是 2 的幂，除法与取余都是精确的
    let radix_f = f64::from(radix);
    let mut rest = magnitude;
    let mut out = Vec::new();
    while rest >= 1.0 {
        let digit = (rest % radix_f) as u32;
        let c = char::from_digit(digit, radix).unwrap_or('0');
        out.push(if upper { c.to_ascii_uppercase() } else { c });
        rest = (rest / radix_f).trunc();
    }
    out.iter().rev().collect()
}

fn render_fixed(n: f64, precision: usize, alt: bool) -> String {
    let mut s = format!("{n:.precision$}");
    if precision == 0 && alt {
        s.push('.');
    }
    s
}

/// `1.500000e+03` 形式：指数带符号且至少两位
fn render_exp(n: f64, precision: usize, upper: bool, alt: bool) -> String {
    let raw = format!("{n:.precision$e}");
    let (mantissa, exp) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let mut mantissa = mantissa.to_string();
    if precision == 0 && alt {
        mantissa.push('.');
    }
    let e = if upper { 'E' } else { 'e' };
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}{e}{sign}{:02}", exp.abs())
}

fn render_general(n: f64, precision: usize, upper: bool, alt: bool) -> String {
    let p = precision.max(1);
    // 舍入后的指数决定使用哪种形式
    let rounded = format!("{:.*e}", p - 1, n);
    let exp: i64 = rounded
        .split_once('e')
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0);
    let s = if exp < -4 || exp >= p as i64 {
        render_exp(n, p - 1, upper, alt)
    } else {
        render_fixed(n, (p as i64 - 1 - exp) as usize, alt)
    };
    if alt {
        return s;
    }
    strip_trailing_zeros(&s)
}

fn strip_trailing_zeros(s: &str) -> String {
    let (mantissa, exp) = match s.find(['e', 'E']) {
        Some(pos) => s.split_at(pos),
        None => (s, ""),
    };
    if !mantissa.contains('.') {
        return s.to_string();
    }
    let mantissa = mantissa.trim_end_matches('0').trim_end_matches('.');
    format!("{mantissa}{exp}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literals_and_codes() {
        let pieces = parse("a %5.2f b %% c").unwrap();
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[0], Piece::Literal("a ".to_string()));
        let Piece::Code(code) = &pieces[1] else {
            panic!("expected code, got {:?}", pieces[1]);
        };
        assert_eq!(code.width, Some(Width::Fixed(5)));
        assert_eq!(code.precision, Some(Width::Fixed(2)));
        assert_eq!(code.conversion, 'f');
        assert_eq!(pieces[2], Piece::Literal(" b % c".to_string()));
    }

    #[test]
    fn test_parse_mapping_key_and_flags() {
        let pieces = parse("%(name)-08s").unwrap();
        let Piece::Code(code) = &pieces[0] else {
            panic!("expected code");
        };
        assert_eq!(code.key.as_deref(), Some("name"));
        assert!(code.flags.left && code.flags.zero);
        assert_eq!(code.width, Some(Width::Fixed(8)));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse("abc %").unwrap_err(), "Truncated format code.");
        assert_eq!(parse("%(x").unwrap_err(), "Truncated format code.");
        assert_eq!(parse("%y").unwrap_err(), "Unrecognised conversion type: y");
    }

    #[test]
    fn test_render_int() {
        let none = Flags::default();
        assert_eq!(render_int(42.0, 10, false, "", none, 5, None), "   42");
        assert_eq!(render_int(-42.9, 10, false, "", none, 0, None), "-42");
        let zero = Flags { zero: true, ..none };
        assert_eq!(render_int(-42.0, 10, false, "", zero, 6, None), "-00042");
        assert_eq!(render_int(255.0, 16, false, "0x", none, 0, None), "0xff");
        assert_eq!(render_int(255.0, 16, true, "", none, 0, None), "FF");
        assert_eq!(render_int(8.0, 8, false, "0", none, 0, None), "010");
        assert_eq!(render_int(7.0, 10, false, "", none, 0, Some(3)), "007");
        let plus = Flags { plus: true, ..none };
        assert_eq!(render_int(3.0, 10, false, "", plus, 0, None), "+3");
    }

    #[test]
    fn test_render_int_beyond_u64() {
        let none = Flags::default();
        assert_eq!(
            render_int(1e20, 10, false, "", none, 0, None),
            "100000000000000000000"
        );
        assert_eq!(render_int(-1e300, 10, false, "", none, 0, None).len(), 302);
        assert_eq!(render_int(2f64.powi(68), 16, false, "", none, 0, None), "100000000000000000");
        assert_eq!(render_int(2f64.powi(66), 8, false, "", none, 0, None), "10000000000000000000000");
        assert_eq!(render_int(15.0 * 2f64.powi(64), 16, true, "", none, 0, None), "F0000000000000000");
    }

    #[test]
    fn test_render_floats() {
        assert_eq!(render_fixed(3.14159, 2, false), "3.14");
        assert_eq!(render_fixed(3.0, 0, true), "3.");
        assert_eq!(render_exp(1500.0, 6, false, false), "1.500000e+03");
        assert_eq!(render_exp(0.00012, 2, true, false), "1.20E-04");
        assert_eq!(render_general(1500.0, 6, false, false), "1500");
        assert_eq!(render_general(0.00001234, 6, false, false), "1.234e-05");
        assert_eq!(render_general(1234567.0, 6, false, false), "1.23457e+06");
        assert_eq!(render_general(0.5, 6, false, false), "0.5");
    }

    #[test]
    fn test_pad_number_sign_flags() {
        let blank = Flags {
            blank: true,
            ..Flags::default()
        };
        assert_eq!(pad_number(false, "", "1.5".to_string(), blank, 0), " 1.5");
        let left = Flags {
            left: true,
            ..Flags::default()
        };
        assert_eq!(pad_number(true, "", "2".to_string(), left, 4), "-2  ");
    }
}
