//! Jsonlang Token 类型定义

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // 关键字
    Assert,
    Else,
    Error,
    False,
    For,
    Function,
    If,
    Import,
    Importstr,
    In,
    Local,
    Null,
    SelfKw,
    Super,
    Tailstrict,
    Then,
    True,

    // 字面量
    Number,
    StringDouble,
    StringSingle,
    /// `|||` 文本块
    StringBlock,
    /// `@"..."`
    VerbatimStringDouble,
    /// `@'...'`
    VerbatimStringSingle,

    Identifier,

    // 分隔符
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    LeftParen,
    RightParen,
    Comma,
    Dot,
    Semicolon,
    Dollar,

    // 冒号系列（字段可见性）
    Colon,
    DoubleColon,
    TripleColon,

    // 运算符
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Equal,
    EqualEqual,
    BangEqual,
    Bang,
    Tilde,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    ShiftLeft,
    ShiftRight,
    AndAnd,
    OrOr,
    Ampersand,
    Pipe,
    Caret,

    /// 输入结束
    Eof,
}

/// 关键字表
pub const KEYWORDS: &[(&str, TokenKind)] = &[
    ("assert", TokenKind::Assert),
    ("else", TokenKind::Else),
    ("error", TokenKind::Error),
    ("false", TokenKind::False),
    ("for", TokenKind::For),
    ("function", TokenKind::Function),
    ("if", TokenKind::If),
    ("import", TokenKind::Import),
    ("importstr", TokenKind::Importstr),
    ("in", TokenKind::In),
    ("local", TokenKind::Local),
    ("null", TokenKind::Null),
    ("self", TokenKind::SelfKw),
    ("super", TokenKind::Super),
    ("tailstrict", TokenKind::Tailstrict),
    ("then", TokenKind::Then),
    ("true", TokenKind::True),
];

impl TokenKind {
    /// 查找关键字
    pub fn keyword(text: &str) -> Option<TokenKind> {
        KEYWORDS
            .iter()
            .find(|(kw, _)| *kw == text)
            .map(|(_, kind)| *kind)
    }

    /// 是否为字符串字面量
    pub fn is_string(self) -> bool {
        matches!(
            self,
            TokenKind::StringDouble
                | TokenKind::StringSingle
                | TokenKind::StringBlock
                | TokenKind::VerbatimStringDouble
                | TokenKind::VerbatimStringSingle
        )
    }

    /// 用于错误消息的符号
    pub fn symbol(self) -> &'static str {
        match self {
            TokenKind::Assert => "assert",
            TokenKind::Else => "else",
            TokenKind::Error => "error",
            TokenKind::False => "false",
            TokenKind::For => "for",
            TokenKind::Function => "function",
            TokenKind::If => "if",
            TokenKind::Import => "import",
            TokenKind::Importstr => "importstr",
            TokenKind::In => "in",
            TokenKind::Local => "local",
            TokenKind::Null => "null",
            TokenKind::SelfKw => "self",
            TokenKind::Super => "super",
            TokenKind::Tailstrict => "tailstrict",
            TokenKind::Then => "then",
            TokenKind::True => "true",
            TokenKind::Number => "NUMBER",
            TokenKind::StringDouble
            | TokenKind::StringSingle
            | TokenKind::StringBlock
            | TokenKind::VerbatimStringDouble
            | TokenKind::VerbatimStringSingle => "STRING",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::LeftBrace => "{",
            TokenKind::RightBrace => "}",
            TokenKind::LeftBracket => "[",
            TokenKind::RightBracket => "]",
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Semicolon => ";",
            TokenKind::Dollar => "$",
            TokenKind::Colon => ":",
            TokenKind::DoubleColon => "::",
            TokenKind::TripleColon => ":::",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Equal => "=",
            TokenKind::EqualEqual => "==",
            TokenKind::BangEqual => "!=",
            TokenKind::Bang => "!",
            TokenKind::Tilde => "~",
            TokenKind::Less => "<",
            TokenKind::LessEqual => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEqual => ">=",
            TokenKind::ShiftLeft => "<<",
            TokenKind::ShiftRight => ">>",
            TokenKind::AndAnd => "&&",
            TokenKind::OrOr => "||",
            TokenKind::Ampersand => "&",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
            TokenKind::Eof => "end of file",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
