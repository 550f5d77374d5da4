//! 调用链 Span 定义

/// Span 唯一标识
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SpanId(pub u64);

/// 一次命名的嵌套区间（如一次 import 或一次求值阶段）
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Span {
    pub id: SpanId,
    pub name: &'static str,
}

impl Span {
    pub const fn new(id: SpanId, name: &'static str) -> Self {
        Self { id, name }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_creation() {
        let span = Span::new(SpanId(7), "import");
        assert_eq!(span.id, SpanId(7));
        assert_eq!(span.name, "import");
    }
}
