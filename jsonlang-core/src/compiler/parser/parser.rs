use super::super::lexer::token_kind::TokenKind;
use super::ast::{
    Args, Bind, CompSpec, Expr, ExprKind, ExprNode, Field, FieldName, Member, Param, StringForm,
    UnaryOp, Visibility,
};
use super::error::{ParseResult, ParserError, ParserErrorKind};
use super::utils::{binary_op, get_precedence};
use crate::kit::lexer::{SourceSpan, Token};
use jsonlang_log::{debug, warn, Logger};
use std::collections::HashSet;
use std::sync::Arc;

/// 语法树的最大嵌套深度；后续各阶段都是递归遍历，超过时在解析阶段报错
pub const MAX_NESTING_DEPTH: usize = 4000;

/// 递归下降 + 优先级爬升解析器
///
/// 输入是 [`crate::kit::lexer::Lexer::tokenize`] 的产物（以 `Eof` 结尾）。
pub struct Parser {
    tokens: Vec<Token<TokenKind>>,
    pos: usize,
    /// 当前递归下降深度
    depth: usize,
    logger: Arc<Logger>,
}

impl Parser {
    pub fn new(tokens: Vec<Token<TokenKind>>) -> Self {
        Self::with_logger(tokens, Logger::noop())
    }

    pub fn with_logger(tokens: Vec<Token<TokenKind>>, logger: Arc<Logger>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            logger,
        }
    }

    /// 解析整个文件：一个表达式，后面只能是 EOF
    pub fn parse(&mut self) -> ParseResult<Expr> {
        let result = self.parse_expression(0).and_then(|expr| {
            self.expect(TokenKind::Eof)?;
            check_nesting(&expr)?;
            Ok(expr)
        });
        match &result {
            Ok(expr) => debug!(self.logger, "Parsed {}", expr.span),
            Err(e) => warn!(self.logger, "Parse error: {}", e),
        }
        result
    }

    // ==================== token 游标 ====================

    /// 当前 token（末尾的 Eof 永不越过）
    fn current(&self) -> &Token<TokenKind> {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn kind(&self) -> TokenKind {
        self.tokens
            .get(self.pos)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn peek_kind(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    /// 消费当前token并返回它
    fn consume(&mut self) -> Token<TokenKind> {
        let token = self.current().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    /// 检查当前token是否为指定类型
    fn check(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    /// 匹配并消费指定类型的token
    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.consume();
            true
        } else {
            false
        }
    }

    /// 当前token的文本表示
    fn current_token_text(&self) -> String {
        let token = self.current();
        match token.kind {
            TokenKind::Identifier => format!("IDENTIFIER \"{}\"", token.text()),
            TokenKind::Number => format!("NUMBER \"{}\"", token.text()),
            kind if kind.is_string() => format!("STRING \"{}\"", token.text()),
            kind => format!("\"{}\"", kind.symbol()),
        }
    }

    /// 创建带有当前位置的错误
    fn error_here(&self, kind: ParserErrorKind) -> ParserError {
        ParserError::at(kind, self.current().span.clone())
    }

    fn unexpected(&self, expected: &[&str]) -> ParserError {
        self.error_here(ParserErrorKind::UnexpectedToken {
            found: self.current_token_text(),
            expected: expected.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// 期望并消费指定类型的token，否则返回错误
    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token<TokenKind>> {
        if self.check(kind) {
            Ok(self.consume())
        } else {
            Err(self.unexpected(&[kind.symbol()]))
        }
    }

    /// 期望一个标识符，返回其名称和区间
    fn expect_identifier(&mut self) -> ParseResult<(String, SourceSpan)> {
        if self.check(TokenKind::Identifier) {
            let token = self.consume();
            Ok((token.text().to_string(), token.span))
        } else {
            Err(self.unexpected(&["IDENTIFIER"]))
        }
    }

    // ==================== 表达式 ====================

    /// 进入一层递归；超过 [`MAX_NESTING_DEPTH`] 时报错
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error_here(ParserErrorKind::TooDeep(MAX_NESTING_DEPTH)));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn parse_expression(&mut self, min_precedence: i32) -> ParseResult<Expr> {
        self.nested(|p| p.parse_binary(min_precedence))
    }

    /// 优先级爬升：解析优先级高于 `min_precedence` 的二元表达式
    fn parse_binary(&mut self, min_precedence: i32) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;

        loop {
            let kind = self.kind();
            let op_precedence = get_precedence(kind);
            // 优先级不足，停止解析
            if op_precedence <= min_precedence {
                break;
            }
            let Some(op) = binary_op(kind) else {
                break;
            };
            self.consume();

            // `e in super`
            if kind == TokenKind::In
                && self.check(TokenKind::Super)
                && !matches!(self.peek_kind(1), TokenKind::Dot | TokenKind::LeftBracket)
            {
                let sup = self.consume();
                let span = left.span.to(&sup.span);
                left = ExprNode::new(ExprKind::InSuper(left), span);
                continue;
            }

            // 全部左结合
            let right = self.parse_expression(op_precedence)?;
            let span = left.span.to(&right.span);
            left = ExprNode::new(ExprKind::Binary { op, left, right }, span);
        }

        Ok(left)
    }

    /// 解析一元表达式
    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.kind() {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            _ => None,
        };
        if let Some(op) = op {
            let token = self.consume();
            let operand = self.nested(Self::parse_unary)?;
            let span = token.span.to(&operand.span);
            return Ok(ExprNode::new(ExprKind::Unary { op, operand }, span));
        }

        match self.kind() {
            TokenKind::Local => self.parse_local(),
            TokenKind::If => self.parse_if(),
            TokenKind::Function => self.parse_function(),
            TokenKind::Assert => self.parse_assert(),
            TokenKind::Error => {
                let token = self.consume();
                let value = self.parse_expression(0)?;
                let span = token.span.to(&value.span);
                Ok(ExprNode::new(ExprKind::Error(value), span))
            }
            _ => {
                let primary = self.parse_primary()?;
                self.parse_postfix(primary)
            }
        }
    }

    /// 解析基础表达式
    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let kind = self.kind();
        let simple = match kind {
            TokenKind::Null => Some(ExprKind::Null),
            TokenKind::True => Some(ExprKind::True),
            TokenKind::False => Some(ExprKind::False),
            TokenKind::SelfKw => Some(ExprKind::SelfRef),
            TokenKind::Dollar => Some(ExprKind::Dollar),
            _ => None,
        };
        if let Some(simple) = simple {
            let token = self.consume();
            return Ok(ExprNode::new(simple, token.span));
        }

        match kind {
            TokenKind::Number => {
                let token = self.consume();
                let text = token.text().to_string();
                let value = text.parse::<f64>().map_err(|_| {
                    ParserError::at(ParserErrorKind::InvalidNumberFormat(text.clone()), token.span.clone())
                })?;
                Ok(ExprNode::new(ExprKind::Number { value, text }, token.span))
            }
            k if k.is_string() => {
                let token = self.consume();
                let form = string_form(token.kind);
                let value = token.text().to_string();
                Ok(ExprNode::new(ExprKind::Str { value, form }, token.span))
            }
            TokenKind::Identifier => {
                let (name, span) = self.expect_identifier()?;
                Ok(ExprNode::new(ExprKind::Var(name), span))
            }
            TokenKind::LeftBrace => self.parse_object(),
            TokenKind::LeftBracket => self.parse_array(),
            TokenKind::LeftParen => {
                let open = self.consume();
                let inner = self.parse_expression(0)?;
                let close = self.expect(TokenKind::RightParen)?;
                Ok(ExprNode::new(ExprKind::Parens(inner), open.span.to(&close.span)))
            }
            TokenKind::Super => self.parse_super(),
            TokenKind::Import | TokenKind::Importstr => {
                let token = self.consume();
                let target = self.current().clone();
                if !target.kind.is_string() || target.kind == TokenKind::StringBlock {
                    return Err(self.error_here(ParserErrorKind::ComputedImport));
                }
                self.consume();
                let path = target.text().to_string();
                let span = token.span.to(&target.span);
                let node = if kind == TokenKind::Import {
                    ExprKind::Import(path)
                } else {
                    ExprKind::ImportStr(path)
                };
                Ok(ExprNode::new(node, span))
            }
            _ => Err(self.error_here(ParserErrorKind::ExpectedExpression(
                self.current_token_text(),
            ))),
        }
    }

    /// `super.f` 或 `super[e]`
    fn parse_super(&mut self) -> ParseResult<Expr> {
        let token = self.consume();
        if self.match_token(TokenKind::Dot) {
            let (name, name_span) = self.expect_identifier()?;
            return Ok(ExprNode::new(ExprKind::SuperField(name), token.span.to(&name_span)));
        }
        if self.match_token(TokenKind::LeftBracket) {
            let index = self.parse_expression(0)?;
            let close = self.expect(TokenKind::RightBracket)?;
            return Ok(ExprNode::new(ExprKind::SuperIndex(index), token.span.to(&close.span)));
        }
        Err(ParserError::at(ParserErrorKind::BareSuper, token.span))
    }

    /// 解析后缀表达式（成员访问、索引、切片、调用、对象拼接）
    fn parse_postfix(&mut self, mut expr: Expr) -> ParseResult<Expr> {
        loop {
            match self.kind() {
                TokenKind::Dot => {
                    // 成员访问：a.b
                    self.consume();
                    let (name, name_span) = self.expect_identifier()?;
                    let span = expr.span.to(&name_span);
                    expr = ExprNode::new(ExprKind::Field { target: expr, name }, span);
                }
                TokenKind::LeftBracket => {
                    self.consume();
                    expr = self.parse_index_or_slice(expr)?;
                }
                TokenKind::LeftParen => {
                    // 函数调用：a(x, y=1) [tailstrict]
                    self.consume();
                    let args = self.parse_args()?;
                    let close = self.expect(TokenKind::RightParen)?;
                    let mut span = expr.span.to(&close.span);
                    let tailstrict = self.check(TokenKind::Tailstrict);
                    if tailstrict {
                        span = span.to(&self.consume().span);
                    }
                    expr = ExprNode::new(
                        ExprKind::Apply {
                            target: expr,
                            args,
                            tailstrict,
                        },
                        span,
                    );
                }
                TokenKind::LeftBrace => {
                    // a { ... }
                    let right = self.parse_object()?;
                    let span = expr.span.to(&right.span);
                    expr = ExprNode::new(ExprKind::ApplyBrace { left: expr, right }, span);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// `[` 之后：`a[i]`、`a[b:e]`、`a[b:e:s]`、`a[::s]`
    fn parse_index_or_slice(&mut self, target: Expr) -> ParseResult<Expr> {
        let start = if matches!(self.kind(), TokenKind::Colon | TokenKind::DoubleColon) {
            None
        } else {
            Some(self.parse_expression(0)?)
        };

        if self.check(TokenKind::RightBracket) {
            let Some(index) = start else {
                return Err(self.error_here(ParserErrorKind::ExpectedExpression(
                    self.current_token_text(),
                )));
            };
            let close = self.consume();
            let span = target.span.to(&close.span);
            return Ok(ExprNode::new(ExprKind::Index { target, index }, span));
        }

        let mut end = None;
        let mut step = None;
        if self.match_token(TokenKind::DoubleColon) {
            if !self.check(TokenKind::RightBracket) {
                step = Some(self.parse_expression(0)?);
            }
        } else if self.match_token(TokenKind::Colon) {
            if !matches!(self.kind(), TokenKind::Colon | TokenKind::RightBracket) {
                end = Some(self.parse_expression(0)?);
            }
            if self.match_token(TokenKind::Colon) && !self.check(TokenKind::RightBracket) {
                step = Some(self.parse_expression(0)?);
            }
        } else {
            return Err(self.unexpected(&["]", ":"]));
        }

        let close = self.expect(TokenKind::RightBracket)?;
        let span = target.span.to(&close.span);
        Ok(ExprNode::new(
            ExprKind::Slice {
                target,
                start,
                end,
                step,
            },
            span,
        ))
    }

    /// 调用参数：位置参数在前，命名参数 `name=expr` 在后
    fn parse_args(&mut self) -> ParseResult<Args> {
        let mut args = Args::default();
        while !self.check(TokenKind::RightParen) {
            if self.check(TokenKind::Identifier) && self.peek_kind(1) == TokenKind::Equal {
                let (name, _) = self.expect_identifier()?;
                self.consume(); // '='
                let value = self.parse_expression(0)?;
                args.named.push((name, value));
            } else {
                if !args.named.is_empty() {
                    return Err(self.error_here(ParserErrorKind::PositionalAfterNamed));
                }
                args.positional.push(self.parse_expression(0)?);
            }
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }
        Ok(args)
    }

    /// 形参列表 `(a, b=1)`，消费两侧括号
    fn parse_params(&mut self) -> ParseResult<Vec<Param>> {
        self.expect(TokenKind::LeftParen)?;
        let mut params: Vec<Param> = Vec::new();
        while !self.check(TokenKind::RightParen) {
            let (name, span) = self.expect_identifier()?;
            if params.iter().any(|p| p.name == name) {
                return Err(ParserError::at(ParserErrorKind::DuplicateParameter(name), span));
            }
            let default = if self.match_token(TokenKind::Equal) {
                Some(self.parse_expression(0)?)
            } else {
                None
            };
            params.push(Param { name, default });
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RightParen)?;
        Ok(params)
    }

    /// `x = e` 或 `f(a, b) = e`
    fn parse_bind(&mut self) -> ParseResult<Bind> {
        let (name, name_span) = self.expect_identifier()?;
        let params = if self.check(TokenKind::LeftParen) {
            Some(self.parse_params()?)
        } else {
            None
        };
        self.expect(TokenKind::Equal)?;
        let body = self.parse_expression(0)?;
        let span = name_span.to(&body.span);
        Ok(Bind {
            name,
            params,
            body,
            span,
        })
    }

    fn parse_local(&mut self) -> ParseResult<Expr> {
        let token = self.consume();
        let mut binds: Vec<Bind> = Vec::new();
        loop {
            let bind = self.parse_bind()?;
            if binds.iter().any(|b| b.name == bind.name) {
                return Err(ParserError::at(
                    ParserErrorKind::DuplicateLocal(bind.name),
                    bind.span,
                ));
            }
            binds.push(bind);
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Semicolon)?;
        let body = self.parse_expression(0)?;
        let span = token.span.to(&body.span);
        Ok(ExprNode::new(ExprKind::Local { binds, body }, span))
    }

    fn parse_if(&mut self) -> ParseResult<Expr> {
        let token = self.consume();
        let cond = self.parse_expression(0)?;
        self.expect(TokenKind::Then)?;
        let then_branch = self.parse_expression(0)?;
        let else_branch = if self.match_token(TokenKind::Else) {
            Some(self.parse_expression(0)?)
        } else {
            None
        };
        let end = else_branch.as_ref().unwrap_or(&then_branch).span.clone();
        Ok(ExprNode::new(
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            },
            token.span.to(&end),
        ))
    }

    fn parse_function(&mut self) -> ParseResult<Expr> {
        let token = self.consume();
        let params = self.parse_params()?;
        let body = self.parse_expression(0)?;
        let span = token.span.to(&body.span);
        Ok(ExprNode::new(ExprKind::Function { params, body }, span))
    }

    fn parse_assert(&mut self) -> ParseResult<Expr> {
        let token = self.consume();
        let cond = self.parse_expression(0)?;
        let message = if self.match_token(TokenKind::Colon) {
            Some(self.parse_expression(0)?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon)?;
        let rest = self.parse_expression(0)?;
        let span = token.span.to(&rest.span);
        Ok(ExprNode::new(
            ExprKind::Assert {
                cond,
                message,
                rest,
            },
            span,
        ))
    }

    // ==================== 数组 / 对象 ====================

    fn parse_array(&mut self) -> ParseResult<Expr> {
        let open = self.consume();
        if self.check(TokenKind::RightBracket) {
            let close = self.consume();
            return Ok(ExprNode::new(ExprKind::Array(Vec::new()), open.span.to(&close.span)));
        }

        let first = self.parse_expression(0)?;
        if self.check(TokenKind::For) {
            let specs = self.parse_comp_specs()?;
            let close = self.expect(TokenKind::RightBracket)?;
            return Ok(ExprNode::new(
                ExprKind::ArrayComp { body: first, specs },
                open.span.to(&close.span),
            ));
        }

        let mut elements = vec![first];
        while self.match_token(TokenKind::Comma) {
            if self.check(TokenKind::RightBracket) {
                break;
            }
            elements.push(self.parse_expression(0)?);
        }
        let close = self.expect(TokenKind::RightBracket)?;
        Ok(ExprNode::new(ExprKind::Array(elements), open.span.to(&close.span)))
    }

    /// `for x in e` 开头，之后任意个 `for` / `if`
    fn parse_comp_specs(&mut self) -> ParseResult<Vec<CompSpec>> {
        let mut specs = Vec::new();
        self.expect(TokenKind::For)?;
        loop {
            let (var, _) = self.expect_identifier()?;
            self.expect(TokenKind::In)?;
            let expr = self.parse_expression(0)?;
            specs.push(CompSpec::For { var, expr });
            while self.match_token(TokenKind::If) {
                specs.push(CompSpec::If(self.parse_expression(0)?));
            }
            if !self.match_token(TokenKind::For) {
                break;
            }
        }
        Ok(specs)
    }

    fn parse_object(&mut self) -> ParseResult<Expr> {
        let open = self.expect(TokenKind::LeftBrace)?;
        let mut members = Vec::new();

        loop {
            if self.check(TokenKind::RightBrace) {
                break;
            }
            if self.check(TokenKind::For) && !members.is_empty() {
                return self.finish_object_comprehension(open.span, members);
            }
            members.push(self.parse_member()?);
            if self.check(TokenKind::For) {
                return self.finish_object_comprehension(open.span, members);
            }
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }

        let close = self.expect(TokenKind::RightBrace)?;

        // 常量字段名不能重复
        let mut seen = HashSet::new();
        for member in &members {
            if let Member::Field(field) = member {
                let name = match &field.name {
                    FieldName::Id(name) => name,
                    FieldName::Str { value, .. } => value,
                    FieldName::Computed(_) => continue,
                };
                if !seen.insert(name.clone()) {
                    return Err(ParserError::at(
                        ParserErrorKind::DuplicateField(name.clone()),
                        field.span.clone(),
                    ));
                }
            }
        }

        Ok(ExprNode::new(ExprKind::Object(members), open.span.to(&close.span)))
    }

    fn finish_object_comprehension(
        &mut self,
        open: SourceSpan,
        members: Vec<Member>,
    ) -> ParseResult<Expr> {
        let specs = self.parse_comp_specs()?;
        let close = self.expect(TokenKind::RightBrace)?;
        let span = open.to(&close.span);

        let mut field_count = 0;
        for member in &members {
            match member {
                Member::Assert { .. } => {
                    return Err(ParserError::at(
                        ParserErrorKind::MalformedComprehension("cannot have asserts"),
                        span,
                    ))
                }
                Member::Field(field) => {
                    field_count += 1;
                    if !matches!(field.name, FieldName::Computed(_)) {
                        return Err(ParserError::at(
                            ParserErrorKind::MalformedComprehension("can only have [e] fields"),
                            field.span.clone(),
                        ));
                    }
                    if field.plus {
                        return Err(ParserError::at(
                            ParserErrorKind::MalformedComprehension("cannot have +: fields"),
                            field.span.clone(),
                        ));
                    }
                    if field.visibility != Visibility::Inherit {
                        return Err(ParserError::at(
                            ParserErrorKind::MalformedComprehension("cannot have hidden fields"),
                            field.span.clone(),
                        ));
                    }
                    if field.params.is_some() {
                        return Err(ParserError::at(
                            ParserErrorKind::MalformedComprehension("cannot have methods"),
                            field.span.clone(),
                        ));
                    }
                }
                Member::Local(_) => {}
            }
        }
        if field_count != 1 {
            return Err(ParserError::at(
                ParserErrorKind::MalformedComprehension("can only have one field"),
                span,
            ));
        }

        Ok(ExprNode::new(ExprKind::ObjectComp { members, specs }, span))
    }

    fn parse_member(&mut self) -> ParseResult<Member> {
        match self.kind() {
            TokenKind::Local => {
                self.consume();
                Ok(Member::Local(self.parse_bind()?))
            }
            TokenKind::Assert => {
                self.consume();
                let cond = self.parse_expression(0)?;
                let message = if self.match_token(TokenKind::Colon) {
                    Some(self.parse_expression(0)?)
                } else {
                    None
                };
                Ok(Member::Assert { cond, message })
            }
            _ => Ok(Member::Field(self.parse_field()?)),
        }
    }

    fn parse_field(&mut self) -> ParseResult<Field> {
        let start = self.current().span.clone();
        let name = match self.kind() {
            TokenKind::Identifier => FieldName::Id(self.expect_identifier()?.0),
            k if k.is_string() => {
                let token = self.consume();
                FieldName::Str {
                    value: token.text().to_string(),
                    form: string_form(token.kind),
                }
            }
            TokenKind::LeftBracket => {
                self.consume();
                let expr = self.parse_expression(0)?;
                self.expect(TokenKind::RightBracket)?;
                FieldName::Computed(expr)
            }
            _ => return Err(self.unexpected(&["field name"])),
        };

        let params = if self.check(TokenKind::LeftParen) {
            Some(self.parse_params()?)
        } else {
            None
        };
        let plus = self.match_token(TokenKind::Plus);
        let visibility = match self.kind() {
            TokenKind::Colon => Visibility::Inherit,
            TokenKind::DoubleColon => Visibility::Hidden,
            TokenKind::TripleColon => Visibility::Visible,
            _ => return Err(self.unexpected(&[":", "::", ":::"])),
        };
        self.consume();

        let body = self.parse_expression(0)?;
        let span = start.to(&body.span);
        Ok(Field {
            name,
            plus,
            visibility,
            params,
            body,
            span,
        })
    }
}

/// 检查整棵树的深度（左结合链和后缀链由循环构造，不经过递归计数）
fn check_nesting(root: &ExprNode) -> ParseResult<()> {
    let mut pending = vec![(root, 1usize)];
    while let Some((node, depth)) = pending.pop() {
        if depth > MAX_NESTING_DEPTH {
            return Err(ParserError::at(
                ParserErrorKind::TooDeep(MAX_NESTING_DEPTH),
                node.span.clone(),
            ));
        }
        pending.extend(node.children().into_iter().map(|child| (child, depth + 1)));
    }
    Ok(())
}

fn string_form(kind: TokenKind) -> StringForm {
    match kind {
        TokenKind::StringSingle => StringForm::Single,
        TokenKind::StringBlock => StringForm::Block,
        TokenKind::VerbatimStringDouble => StringForm::VerbatimDouble,
        TokenKind::VerbatimStringSingle => StringForm::VerbatimSingle,
        _ => StringForm::Double,
    }
}
