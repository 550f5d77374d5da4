//! UTF-8 安全的字符串工具
//!
//! 语言层面的字符串按 Unicode 码点索引和计长，这里集中处理码点与字节的换算。

use std::fmt::Write;

/// 码点个数
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// 第 `index` 个码点
pub fn char_at(s: &str, index: usize) -> Option<char> {
    s.chars().nth(index)
}

/// 按码点截取 `[from, from + len)`，越界部分被截断
pub fn substr(s: &str, from: usize, len: usize) -> String {
    s.chars().skip(from).take(len).collect()
}

/// JSON 字符串转义（带两侧引号）
///
/// `"`、`\\` 和常见控制字符使用短转义，其余控制字符使用 `\u00XX`，
/// 非 ASCII 字符原样输出。
pub fn escape_json(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// 按分隔符切分，最多切 `max_splits` 次（`None` 表示不限）
pub fn split_limit(s: &str, sep: &str, max_splits: Option<usize>) -> Vec<String> {
    match max_splits {
        Some(n) => s.splitn(n + 1, sep).map(str::to_string).collect(),
        None => s.split(sep).map(str::to_string).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_len_counts_code_points() {
        assert_eq!(char_len("abc"), 3);
        assert_eq!(char_len("中文"), 2);
        assert_eq!(char_len("🎉"), 1);
    }

    #[test]
    fn test_char_at_and_substr() {
        assert_eq!(char_at("héllo", 1), Some('é'));
        assert_eq!(char_at("abc", 3), None);
        assert_eq!(substr("中文字符", 1, 2), "文字");
        assert_eq!(substr("abc", 2, 10), "c");
        assert_eq!(substr("abc", 5, 1), "");
    }

    #[test]
    fn test_escape_json() {
        assert_eq!(escape_json("plain"), "\"plain\"");
        assert_eq!(escape_json("a\"b\\c"), "\"a\\\"b\\\\c\"");
        assert_eq!(escape_json("\n\t\r\u{8}\u{c}"), "\"\\n\\t\\r\\b\\f\"");
        assert_eq!(escape_json("\u{1}"), "\"\\u0001\"");
        assert_eq!(escape_json("ünï"), "\"ünï\"");
    }

    #[test]
    fn test_split_limit() {
        assert_eq!(split_limit("a,b,c", ",", None), ["a", "b", "c"]);
        assert_eq!(split_limit("a,b,c", ",", Some(1)), ["a", "b,c"]);
        assert_eq!(split_limit("abc", ",", Some(3)), ["abc"]);
    }
}
