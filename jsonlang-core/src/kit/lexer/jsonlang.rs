//! Jsonlang 语言 Scanner 实现
//!
//! 支持：
//! - 关键字、标识符、`$`
//! - 运算符（最长匹配）
//! - 数字、四种字符串（双引号、单引号、`|||` 文本块、`@` 逐字串）
//! - `//`、`#`、`/* */` 注释

use super::error::{ErrorKind, LexerError};
use super::position::{SourcePosition, SourceSpan};
use super::scanner::{is_identifier_continue, is_identifier_start, ScanResult, Scanner, Token};
use super::stream::CharStream;
use crate::compiler::lexer::token_kind::TokenKind;
use std::sync::Arc;

type Scan = ScanResult<Token<TokenKind>>;

/// Jsonlang 扫描器
pub struct JsonlangScanner {
    file: Arc<str>,
    /// 当前 token 的起始位置（用于构建 span）
    token_start: SourcePosition,
}

impl Scanner for JsonlangScanner {
    type TokenKind = TokenKind;

    fn next_token(&mut self, stream: &mut CharStream<'_>) -> Scan {
        if let Err(e) = self.skip_whitespace_and_comments(stream) {
            return ScanResult::Error(e);
        }

        self.token_start = stream.position();
        let Some(c) = stream.peek(0) else {
            return ScanResult::Eof;
        };

        match c {
            '{' => self.single(stream, TokenKind::LeftBrace),
            '}' => self.single(stream, TokenKind::RightBrace),
            '[' => self.single(stream, TokenKind::LeftBracket),
            ']' => self.single(stream, TokenKind::RightBracket),
            '(' => self.single(stream, TokenKind::LeftParen),
            ')' => self.single(stream, TokenKind::RightParen),
            ',' => self.single(stream, TokenKind::Comma),
            '.' => self.single(stream, TokenKind::Dot),
            ';' => self.single(stream, TokenKind::Semicolon),
            '$' => self.single(stream, TokenKind::Dollar),
            '+' => self.single(stream, TokenKind::Plus),
            '-' => self.single(stream, TokenKind::Minus),
            '*' => self.single(stream, TokenKind::Star),
            '/' => self.single(stream, TokenKind::Slash),
            '%' => self.single(stream, TokenKind::Percent),
            '~' => self.single(stream, TokenKind::Tilde),
            '^' => self.single(stream, TokenKind::Caret),
            ':' => self.operator(
                stream,
                &[
                    (":::", TokenKind::TripleColon),
                    ("::", TokenKind::DoubleColon),
                    (":", TokenKind::Colon),
                ],
            ),
            '=' => self.operator(stream, &[("==", TokenKind::EqualEqual), ("=", TokenKind::Equal)]),
            '!' => self.operator(stream, &[("!=", TokenKind::BangEqual), ("!", TokenKind::Bang)]),
            '<' => self.operator(
                stream,
                &[
                    ("<<", TokenKind::ShiftLeft),
                    ("<=", TokenKind::LessEqual),
                    ("<", TokenKind::Less),
                ],
            ),
            '>' => self.operator(
                stream,
                &[
                    (">>", TokenKind::ShiftRight),
                    (">=", TokenKind::GreaterEqual),
                    (">", TokenKind::Greater),
                ],
            ),
            '&' => self.operator(stream, &[("&&", TokenKind::AndAnd), ("&", TokenKind::Ampersand)]),
            '|' if stream.starts_with("|||") => self.scan_text_block(stream),
            '|' => self.operator(stream, &[("||", TokenKind::OrOr), ("|", TokenKind::Pipe)]),
            '"' => self.scan_string(stream, '"', TokenKind::StringDouble),
            '\'' => self.scan_string(stream, '\'', TokenKind::StringSingle),
            '@' => self.scan_verbatim(stream),
            '0'..='9' => self.scan_number(stream),
            c if is_identifier_start(c) => self.scan_identifier_or_keyword(stream),
            _ => {
                stream.advance();
                self.error(stream, ErrorKind::InvalidChar(c))
            }
        }
    }
}

impl JsonlangScanner {
    pub fn new(file: Arc<str>) -> Self {
        Self {
            file,
            token_start: SourcePosition::start(),
        }
    }

    fn span(&self, stream: &CharStream<'_>) -> SourceSpan {
        SourceSpan::new(Arc::clone(&self.file), self.token_start, stream.position())
    }

    fn error(&self, stream: &CharStream<'_>, kind: ErrorKind) -> Scan {
        ScanResult::Error(LexerError::at(kind, self.span(stream)))
    }

    fn single(&mut self, stream: &mut CharStream<'_>, kind: TokenKind) -> Scan {
        stream.advance();
        ScanResult::Token(Token::new(kind, self.span(stream)))
    }

    /// 多字符运算符：候选按长度降序排列，取第一个匹配（最长匹配）
    fn operator(&mut self, stream: &mut CharStream<'_>, candidates: &[(&str, TokenKind)]) -> Scan {
        for (text, kind) in candidates {
            if stream.starts_with(text) {
                for _ in 0..text.chars().count() {
                    stream.advance();
                }
                return ScanResult::Token(Token::new(*kind, self.span(stream)));
            }
        }
        // 候选表最后一项总是单字符，不会走到这里
        stream.advance();
        self.error(stream, ErrorKind::InvalidChar(candidates[0].0.chars().next().unwrap_or('?')))
    }

    /// 跳过空白符和注释
    fn skip_whitespace_and_comments(&mut self, stream: &mut CharStream<'_>) -> Result<(), LexerError> {
        loop {
            match stream.peek(0) {
                Some(' ' | '\t' | '\r' | '\n') => {
                    stream.advance();
                }
                Some('#') => self.skip_line(stream),
                Some('/') if stream.peek(1) == Some('/') => self.skip_line(stream),
                Some('/') if stream.peek(1) == Some('*') => {
                    let start = stream.position();
                    stream.advance();
                    stream.advance();
                    loop {
                        if stream.starts_with("*/") {
                            stream.advance();
                            stream.advance();
                            break;
                        }
                        if stream.advance().is_none() {
                            let span = SourceSpan::new(Arc::clone(&self.file), start, stream.position());
                            return Err(LexerError::at(ErrorKind::UnterminatedComment, span));
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn skip_line(&mut self, stream: &mut CharStream<'_>) {
        while let Some(c) = stream.advance() {
            if c == '\n' {
                break;
            }
        }
    }

    fn scan_identifier_or_keyword(&mut self, stream: &mut CharStream<'_>) -> Scan {
        while stream.peek(0).is_some_and(is_identifier_continue) {
            stream.advance();
        }
        let text = stream.slice(self.token_start, stream.position());
        let span = self.span(stream);
        match TokenKind::keyword(text) {
            Some(kind) => ScanResult::Token(Token::new(kind, span)),
            None => ScanResult::Token(Token::with_text(TokenKind::Identifier, span, text)),
        }
    }

    /// 数字：`digits ('.' digits)? ([eE] [+-]? digits)?`
    fn scan_number(&mut self, stream: &mut CharStream<'_>) -> Scan {
        self.eat_digits(stream);

        if stream.check('.') {
            stream.advance();
            if !stream.peek(0).is_some_and(|c| c.is_ascii_digit()) {
                return self.error(
                    stream,
                    ErrorKind::InvalidNumber("junk after decimal point".to_string()),
                );
            }
            self.eat_digits(stream);
        }

        if matches!(stream.peek(0), Some('e' | 'E')) {
            stream.advance();
            if matches!(stream.peek(0), Some('+' | '-')) {
                stream.advance();
            }
            if !stream.peek(0).is_some_and(|c| c.is_ascii_digit()) {
                return self.error(
                    stream,
                    ErrorKind::InvalidNumber("junk after exponent".to_string()),
                );
            }
            self.eat_digits(stream);
        }

        let text = stream.slice(self.token_start, stream.position());
        ScanResult::Token(Token::with_text(TokenKind::Number, self.span(stream), text))
    }

    fn eat_digits(&mut self, stream: &mut CharStream<'_>) {
        while stream.peek(0).is_some_and(|c| c.is_ascii_digit()) {
            stream.advance();
        }
    }

    /// 带转义的字符串
    fn scan_string(&mut self, stream: &mut CharStream<'_>, quote: char, kind: TokenKind) -> Scan {
        stream.advance(); // 消费起始引号
        let mut value = String::new();
        loop {
            let Some(c) = stream.advance() else {
                return self.error(stream, ErrorKind::UnterminatedString);
            };
            match c {
                c if c == quote => break,
                '\\' => match self.scan_escape(stream) {
                    Ok(decoded) => value.push(decoded),
                    Err(e) => return ScanResult::Error(e),
                },
                c => value.push(c),
            }
        }
        ScanResult::Token(Token::with_text(kind, self.span(stream), value))
    }

    fn scan_escape(&self, stream: &mut CharStream<'_>) -> Result<char, LexerError> {
        let escape_start = stream.position();
        let error_at = |stream: &CharStream<'_>, kind: ErrorKind| {
            let span = SourceSpan::new(Arc::clone(&self.file), escape_start, stream.position());
            LexerError::at(kind, span)
        };
        let invalid = |stream: &CharStream<'_>, seq: String| error_at(stream, ErrorKind::InvalidEscape(seq));
        let Some(c) = stream.advance() else {
            let span = self.span(stream);
            return Err(LexerError::at(ErrorKind::UnterminatedString, span));
        };
        match c {
            '"' => Ok('"'),
            '\'' => Ok('\''),
            '\\' => Ok('\\'),
            '/' => Ok('/'),
            'b' => Ok('\u{8}'),
            'f' => Ok('\u{c}'),
            'n' => Ok('\n'),
            'r' => Ok('\r'),
            't' => Ok('\t'),
            'u' => {
                let high = scan_hex4(stream).ok_or_else(|| error_at(stream, ErrorKind::TruncatedUnicodeEscape))?;
                if (0xD800..0xDC00).contains(&high) {
                    // 代理对：必须紧跟 \uDC00-\uDFFF
                    if !stream.starts_with("\\u") {
                        return Err(error_at(stream, ErrorKind::UnpairedSurrogate(format!("\\u{high:04x}"))));
                    }
                    stream.advance();
                    stream.advance();
                    let low = scan_hex4(stream).ok_or_else(|| error_at(stream, ErrorKind::TruncatedUnicodeEscape))?;
                    if !(0xDC00..0xE000).contains(&low) {
                        return Err(error_at(stream, ErrorKind::UnpairedSurrogate(format!("\\u{high:04x}"))));
                    }
                    let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                    char::from_u32(code).ok_or_else(|| invalid(stream, format!("\\u{high:04x}")))
                } else {
                    char::from_u32(high)
                        .ok_or_else(|| error_at(stream, ErrorKind::UnpairedSurrogate(format!("\\u{high:04x}"))))
                }
            }
            other => Err(invalid(stream, format!("\\{other}"))),
        }
    }

    /// `@"..."` / `@'...'`：无转义，重复引号表示引号本身
    fn scan_verbatim(&mut self, stream: &mut CharStream<'_>) -> Scan {
        stream.advance(); // '@'
        let (quote, kind) = match stream.peek(0) {
            Some('"') => ('"', TokenKind::VerbatimStringDouble),
            Some('\'') => ('\'', TokenKind::VerbatimStringSingle),
            _ => return self.error(stream, ErrorKind::InvalidChar('@')),
        };
        stream.advance();
        let mut value = String::new();
        loop {
            let Some(c) = stream.advance() else {
                return self.error(stream, ErrorKind::UnterminatedString);
            };
            if c == quote {
                if stream.check(quote) {
                    stream.advance();
                    value.push(quote);
                } else {
                    break;
                }
            } else {
                value.push(c);
            }
        }
        ScanResult::Token(Token::with_text(kind, self.span(stream), value))
    }

    /// `|||` 文本块
    ///
    /// 第一行非空行的前导空白决定缩进，之后每行去掉该缩进；
    /// 缩进更少的 `|||` 行结束文本块。
    fn scan_text_block(&mut self, stream: &mut CharStream<'_>) -> Scan {
        for _ in 0..3 {
            stream.advance();
        }
        while matches!(stream.peek(0), Some(' ' | '\t' | '\r')) {
            stream.advance();
        }
        if !stream.match_char('\n') {
            return self.error(stream, ErrorKind::MalformedTextBlock("requires new line after |||"));
        }

        let mut value = String::new();
        let mut indent: Option<String> = None;
        loop {
            if stream.is_eof() {
                return self.error(stream, ErrorKind::UnterminatedTextBlock);
            }
            if stream.match_char('\n') {
                value.push('\n');
                continue;
            }

            let prefix = match &indent {
                Some(prefix) => prefix.clone(),
                None => {
                    let mut ws = String::new();
                    while let Some(c @ (' ' | '\t')) = stream.peek(ws.chars().count()) {
                        ws.push(c);
                    }
                    if ws.is_empty() {
                        return self.error(
                            stream,
                            ErrorKind::MalformedTextBlock("first line must start with whitespace"),
                        );
                    }
                    indent = Some(ws.clone());
                    ws
                }
            };

            if stream.starts_with(&prefix) {
                for _ in 0..prefix.chars().count() {
                    stream.advance();
                }
                loop {
                    match stream.advance() {
                        Some('\n') => {
                            value.push('\n');
                            break;
                        }
                        Some(c) => value.push(c),
                        None => return self.error(stream, ErrorKind::UnterminatedTextBlock),
                    }
                }
            } else {
                while matches!(stream.peek(0), Some(' ' | '\t')) {
                    stream.advance();
                }
                if !stream.starts_with("|||") {
                    return self.error(
                        stream,
                        ErrorKind::MalformedTextBlock("not terminated with |||"),
                    );
                }
                for _ in 0..3 {
                    stream.advance();
                }
                break;
            }
        }
        ScanResult::Token(Token::with_text(TokenKind::StringBlock, self.span(stream), value))
    }
}

fn scan_hex4(stream: &mut CharStream<'_>) -> Option<u32> {
    let mut code = 0u32;
    for _ in 0..4 {
        let digit = stream.peek(0)?.to_digit(16)?;
        stream.advance();
        code = code * 16 + digit;
    }
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all(input: &str) -> Result<Vec<Token<TokenKind>>, LexerError> {
        let mut scanner = JsonlangScanner::new(Arc::from("test"));
        let mut stream = CharStream::new(input);
        let mut tokens = Vec::new();
        loop {
            match scanner.next_token(&mut stream) {
                ScanResult::Token(t) => tokens.push(t),
                ScanResult::Eof => return Ok(tokens),
                ScanResult::Error(e) => return Err(e),
            }
        }
    }

    fn kinds(input: &str) -> Vec<TokenKind> {
        scan_all(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_maximal_munch_operators() {
        use TokenKind::*;
        assert_eq!(
            kinds("::: :: : == != <= >= << >> && || < > = ! ~"),
            vec![
                TripleColon, DoubleColon, Colon, EqualEqual, BangEqual, LessEqual, GreaterEqual,
                ShiftLeft, ShiftRight, AndAnd, OrOr, Less, Greater, Equal, Bang, Tilde
            ]
        );
    }

    #[test]
    fn test_keywords_and_identifiers() {
        let tokens = scan_all("local x = self.y; $").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Local);
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].text(), "x");
        assert_eq!(tokens[3].kind, TokenKind::SelfKw);
        assert_eq!(tokens[7].kind, TokenKind::Dollar);
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("1 // line\n# hash\n/* block\n */ 2"),
            vec![TokenKind::Number, TokenKind::Number]
        );
    }

    #[test]
    fn test_unterminated_comment() {
        let err = scan_all("1 /* never closed").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnterminatedComment);
    }

    #[test]
    fn test_numbers() {
        let tokens = scan_all("0 12.5 1e3 2.5E-2").unwrap();
        let texts: Vec<_> = tokens.iter().map(|t| t.text()).collect();
        assert_eq!(texts, ["0", "12.5", "1e3", "2.5E-2"]);
        assert!(matches!(scan_all("1.").unwrap_err().kind, ErrorKind::InvalidNumber(_)));
        assert!(matches!(scan_all("1e+").unwrap_err().kind, ErrorKind::InvalidNumber(_)));
    }

    #[test]
    fn test_string_escapes() {
        let tokens = scan_all(r#""a\"b\\c\/\n\t\u00e9" 'it\'s'"#).unwrap();
        assert_eq!(tokens[0].text(), "a\"b\\c/\n\té");
        assert_eq!(tokens[1].kind, TokenKind::StringSingle);
        assert_eq!(tokens[1].text(), "it's");
    }

    #[test]
    fn test_surrogate_pair_escape() {
        let tokens = scan_all(r#""\ud83c\udf89""#).unwrap();
        assert_eq!(tokens[0].text(), "🎉");
    }

    #[test]
    fn test_unicode_escape_errors() {
        let err = scan_all(r#""\u12""#).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TruncatedUnicodeEscape);
        assert_eq!(err.message, "Truncated unicode escape sequence in string literal");

        let err = scan_all(r#""\uD800""#).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnpairedSurrogate("\\ud800".to_string()));
        assert_eq!(err.message, "Unpaired surrogate in string literal: '\\ud800'");

        let err = scan_all(r#""\ud800\u0041""#).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnpairedSurrogate(_)));

        let err = scan_all(r#""\udc00""#).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnpairedSurrogate("\\udc00".to_string()));
    }

    #[test]
    fn test_invalid_escape() {
        let err = scan_all(r#""bad \q""#).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidEscape("\\q".to_string()));
    }

    #[test]
    fn test_unterminated_string() {
        let err = scan_all("\"abc").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnterminatedString);
        assert_eq!(err.line(), 1);
        assert_eq!(err.column(), 1);
    }

    #[test]
    fn test_verbatim_string() {
        let tokens = scan_all(r#"@"C:\path ""quoted""""#).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::VerbatimStringDouble);
        assert_eq!(tokens[0].text(), r#"C:\path "quoted""#);
    }

    #[test]
    fn test_text_block() {
        let src = "|||\n  line one\n    indented\n\n  last\n|||";
        let tokens = scan_all(src).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::StringBlock);
        assert_eq!(tokens[0].text(), "line one\n  indented\n\nlast\n");
    }

    #[test]
    fn test_text_block_errors() {
        assert!(matches!(
            scan_all("||| x\n  a\n|||").unwrap_err().kind,
            ErrorKind::MalformedTextBlock(_)
        ));
        assert!(matches!(
            scan_all("|||\nno indent\n|||").unwrap_err().kind,
            ErrorKind::MalformedTextBlock(_)
        ));
        assert_eq!(
            scan_all("|||\n  open").unwrap_err().kind,
            ErrorKind::UnterminatedTextBlock
        );
    }

    #[test]
    fn test_invalid_char() {
        let err = scan_all("1 ` 2").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidChar('`'));
        assert_eq!(err.column(), 3);
    }

    #[test]
    fn test_token_spans() {
        let tokens = scan_all("a\n  bc").unwrap();
        assert_eq!(tokens[1].span.start.line, 2);
        assert_eq!(tokens[1].span.start.column, 3);
        assert_eq!(tokens[1].span.end.column, 5);
        assert_eq!(tokens[1].span.to_string(), "test:2:3-5");
    }
}
