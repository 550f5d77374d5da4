use super::super::lexer::token_kind::TokenKind;
use super::ast::BinaryOp;

/// 二元运算符优先级（数值越大结合越紧），非二元运算符返回 0
///
/// 所有二元运算符均为左结合。
pub fn get_precedence(op: TokenKind) -> i32 {
    match op {
        TokenKind::OrOr => 10,
        TokenKind::AndAnd => 20,
        TokenKind::Pipe => 30,
        TokenKind::Caret => 40,
        TokenKind::Ampersand => 50,
        TokenKind::EqualEqual | TokenKind::BangEqual => 60,
        TokenKind::Less
        | TokenKind::LessEqual
        | TokenKind::Greater
        | TokenKind::GreaterEqual
        | TokenKind::In => 70,
        TokenKind::ShiftLeft | TokenKind::ShiftRight => 80,
        TokenKind::Plus | TokenKind::Minus => 90,
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => 100,
        _ => 0,
    }
}

/// token 对应的二元运算符
pub fn binary_op(op: TokenKind) -> Option<BinaryOp> {
    let op = match op {
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Mod,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::ShiftLeft => BinaryOp::ShiftLeft,
        TokenKind::ShiftRight => BinaryOp::ShiftRight,
        TokenKind::Less => BinaryOp::Less,
        TokenKind::LessEqual => BinaryOp::LessEq,
        TokenKind::Greater => BinaryOp::Greater,
        TokenKind::GreaterEqual => BinaryOp::GreaterEq,
        TokenKind::EqualEqual => BinaryOp::Eq,
        TokenKind::BangEqual => BinaryOp::NotEq,
        TokenKind::In => BinaryOp::In,
        TokenKind::Ampersand => BinaryOp::BitAnd,
        TokenKind::Caret => BinaryOp::BitXor,
        TokenKind::Pipe => BinaryOp::BitOr,
        TokenKind::AndAnd => BinaryOp::And,
        TokenKind::OrOr => BinaryOp::Or,
        _ => return None,
    };
    Some(op)
}

/// 二元运算符的优先级（格式化器决定是否加括号）
pub fn op_precedence(op: BinaryOp) -> i32 {
    let token = match op {
        BinaryOp::Mul => TokenKind::Star,
        BinaryOp::Div => TokenKind::Slash,
        BinaryOp::Mod => TokenKind::Percent,
        BinaryOp::Add => TokenKind::Plus,
        BinaryOp::Sub => TokenKind::Minus,
        BinaryOp::ShiftLeft => TokenKind::ShiftLeft,
        BinaryOp::ShiftRight => TokenKind::ShiftRight,
        BinaryOp::Less => TokenKind::Less,
        BinaryOp::LessEq => TokenKind::LessEqual,
        BinaryOp::Greater => TokenKind::Greater,
        BinaryOp::GreaterEq => TokenKind::GreaterEqual,
        BinaryOp::Eq => TokenKind::EqualEqual,
        BinaryOp::NotEq => TokenKind::BangEqual,
        BinaryOp::In => TokenKind::In,
        BinaryOp::BitAnd => TokenKind::Ampersand,
        BinaryOp::BitXor => TokenKind::Caret,
        BinaryOp::BitOr => TokenKind::Pipe,
        BinaryOp::And => TokenKind::AndAnd,
        BinaryOp::Or => TokenKind::OrOr,
    };
    get_precedence(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_order() {
        assert!(get_precedence(TokenKind::Star) > get_precedence(TokenKind::Plus));
        assert!(get_precedence(TokenKind::Plus) > get_precedence(TokenKind::ShiftLeft));
        assert!(get_precedence(TokenKind::In) > get_precedence(TokenKind::EqualEqual));
        assert!(get_precedence(TokenKind::Ampersand) > get_precedence(TokenKind::Caret));
        assert!(get_precedence(TokenKind::AndAnd) > get_precedence(TokenKind::OrOr));
        assert_eq!(get_precedence(TokenKind::Dot), 0);
    }

    #[test]
    fn test_binary_op_mapping_roundtrips_precedence() {
        assert_eq!(binary_op(TokenKind::Percent), Some(BinaryOp::Mod));
        assert_eq!(binary_op(TokenKind::Bang), None);
        assert_eq!(op_precedence(BinaryOp::Or), 10);
    }
}
