//! 静态分析
//!
//! 遍历 Core AST：把每个变量引用解析为 (depth, index) 槽位并原地写入，
//! 同时检查 `self` / `super` / `$` 只出现在对象内部。不求值任何东西。

use super::desugar::core::{Core, CoreKind, Slot};
use super::desugar::{DOLLAR, STD, STD_INTERNAL};
use crate::kit::lexer::SourceSpan;
use std::rc::Rc;

/// 静态分析错误
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{span}: {kind}")]
pub struct AnalysisError {
    pub kind: AnalysisErrorKind,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisErrorKind {
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),
    #[error("Can't use self outside of an object.")]
    SelfOutsideObject,
    #[error("Can't use super outside of an object.")]
    SuperOutsideObject,
    #[error("No top-level object found.")]
    NoTopLevelObject,
}

impl AnalysisError {
    pub fn at(kind: AnalysisErrorKind, span: SourceSpan) -> Self {
        Self { kind, span }
    }

    pub fn line(&self) -> usize {
        self.span.start.line
    }

    pub fn column(&self) -> usize {
        self.span.start.column
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// 根作用域帧中的绑定，顺序即槽位号
pub const ROOT_BINDINGS: [&str; 2] = [STD, STD_INTERNAL];

/// 分析一棵 Core AST（根作用域为 [`ROOT_BINDINGS`]）
pub fn analyze(expr: &Core) -> AnalysisResult<()> {
    let mut analyzer = Analyzer {
        frames: vec![ROOT_BINDINGS.iter().map(|name| Rc::from(*name)).collect()],
    };
    analyzer.visit(expr, false)
}

struct Analyzer {
    /// 由外到内的环境帧
    frames: Vec<Vec<Rc<str>>>,
}

impl Analyzer {
    fn resolve(&self, name: &str) -> Option<Slot> {
        self.frames.iter().rev().enumerate().find_map(|(depth, frame)| {
            // 同一帧内重名时取后者
            frame
                .iter()
                .rposition(|n| &**n == name)
                .map(|index| Slot { depth, index })
        })
    }

    fn with_frame<F>(&mut self, names: Vec<Rc<str>>, f: F) -> AnalysisResult<()>
    where
        F: FnOnce(&mut Self) -> AnalysisResult<()>,
    {
        self.frames.push(names);
        let result = f(self);
        self.frames.pop();
        result
    }

    /// `in_object` 表示当前位置可以使用 `self` / `super`
    fn visit(&mut self, expr: &Core, in_object: bool) -> AnalysisResult<()> {
        match &expr.kind {
            CoreKind::Null
            | CoreKind::Bool(_)
            | CoreKind::Number(_)
            | CoreKind::Str(_)
            | CoreKind::Import(_)
            | CoreKind::ImportStr(_) => Ok(()),
            CoreKind::Var(var) => match self.resolve(&var.name) {
                Some(slot) => {
                    var.slot.set(Some(slot));
                    Ok(())
                }
                None if &*var.name == DOLLAR => Err(AnalysisError::at(
                    AnalysisErrorKind::NoTopLevelObject,
                    expr.span.clone(),
                )),
                None => Err(AnalysisError::at(
                    AnalysisErrorKind::UnknownVariable(var.name.to_string()),
                    expr.span.clone(),
                )),
            },
            CoreKind::SelfRef => {
                if in_object {
                    Ok(())
                } else {
                    Err(AnalysisError::at(
                        AnalysisErrorKind::SelfOutsideObject,
                        expr.span.clone(),
                    ))
                }
            }
            CoreKind::SuperIndex(index) | CoreKind::InSuper(index) => {
                if !in_object {
                    return Err(AnalysisError::at(
                        AnalysisErrorKind::SuperOutsideObject,
                        expr.span.clone(),
                    ));
                }
                self.visit(index, in_object)
            }
            CoreKind::Array(items) => items.iter().try_for_each(|item| self.visit(item, in_object)),
            CoreKind::Object { asserts, fields } => {
                for field in fields {
                    self.visit(&field.name, in_object)?;
                }
                for assert in asserts {
                    self.visit(assert, true)?;
                }
                for field in fields {
                    self.visit(&field.body, true)?;
                }
                Ok(())
            }
            CoreKind::ObjectComp {
                var,
                name,
                value,
                array,
            } => {
                self.visit(array, in_object)?;
                self.with_frame(vec![Rc::clone(var)], |a| {
                    a.visit(name, in_object)?;
                    a.visit(value, true)
                })
            }
            CoreKind::Index { target, index } => {
                self.visit(target, in_object)?;
                self.visit(index, in_object)
            }
            CoreKind::Apply {
                target,
                positional,
                named,
                ..
            } => {
                self.visit(target, in_object)?;
                for arg in positional {
                    self.visit(arg, in_object)?;
                }
                for (_, arg) in named {
                    self.visit(arg, in_object)?;
                }
                Ok(())
            }
            CoreKind::Binary { left, right, .. } => {
                self.visit(left, in_object)?;
                self.visit(right, in_object)
            }
            CoreKind::Unary { operand, .. } => self.visit(operand, in_object),
            CoreKind::Local { binds, body } => {
                let names = binds.iter().map(|b| Rc::clone(&b.name)).collect();
                self.with_frame(names, |a| {
                    for bind in binds.iter() {
                        a.visit(&bind.body, in_object)?;
                    }
                    a.visit(body, in_object)
                })
            }
            CoreKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.visit(cond, in_object)?;
                self.visit(then_branch, in_object)?;
                self.visit(else_branch, in_object)
            }
            CoreKind::Function { params, body } => {
                let names = params.iter().map(|p| Rc::clone(&p.name)).collect();
                self.with_frame(names, |a| {
                    for param in params.iter() {
                        if let Some(default) = &param.default {
                            a.visit(default, in_object)?;
                        }
                    }
                    a.visit(body, in_object)
                })
            }
            CoreKind::Error { message, .. } => self.visit(message, in_object),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::desugar::core::CoreExpr;
    use crate::compiler::desugar::desugar;
    use crate::compiler::parser::Parser;
    use crate::kit::lexer::Lexer;

    fn analyze_code(code: &str) -> (CoreExpr, AnalysisResult<()>) {
        let tokens = Lexer::new().tokenize("test", code).expect("lex");
        let ast = Parser::new(tokens).parse().expect("parse");
        let core = desugar(&ast);
        let result = analyze(&core);
        (core, result)
    }

    fn error_kind(code: &str) -> AnalysisErrorKind {
        let (_, result) = analyze_code(code);
        result.expect_err("expected analysis error").kind
    }

    #[test]
    fn test_resolves_local_slots() {
        let (core, result) = analyze_code("local a = 1, b = 2; b");
        assert!(result.is_ok(), "Analysis failed: {:?}", result.err());
        let CoreKind::Local { body, .. } = &core.kind else {
            panic!("expected local");
        };
        let CoreKind::Var(var) = &body.kind else {
            panic!("expected var");
        };
        assert_eq!(var.slot.get(), Some(Slot { depth: 0, index: 1 }));
    }

    #[test]
    fn test_resolves_std_in_root_frame() {
        let (core, result) = analyze_code("local x = 1; std");
        assert!(result.is_ok());
        let CoreKind::Local { body, .. } = &core.kind else {
            panic!("expected local");
        };
        let CoreKind::Var(var) = &body.kind else {
            panic!("expected var");
        };
        assert_eq!(var.slot.get(), Some(Slot { depth: 1, index: 0 }));
    }

    #[test]
    fn test_recursive_local_sees_itself() {
        let (_, result) = analyze_code("local f(n) = if n == 0 then 0 else f(n - 1); f(3)");
        assert!(result.is_ok(), "Analysis failed: {:?}", result.err());
    }

    #[test]
    fn test_unknown_variable() {
        assert_eq!(
            error_kind("local a = 1; b"),
            AnalysisErrorKind::UnknownVariable("b".to_string())
        );
    }

    #[test]
    fn test_self_and_super_outside_object() {
        assert_eq!(error_kind("self.x"), AnalysisErrorKind::SelfOutsideObject);
        assert_eq!(error_kind("super.x"), AnalysisErrorKind::SuperOutsideObject);
        assert_eq!(error_kind("$"), AnalysisErrorKind::NoTopLevelObject);
    }

    #[test]
    fn test_self_allowed_in_methods_and_locals() {
        let (_, result) = analyze_code("{ local me = self, f(x): me.g + x + $.g, g: 1 }");
        assert!(result.is_ok(), "Analysis failed: {:?}", result.err());
    }

    #[test]
    fn test_field_names_use_outer_scope() {
        assert_eq!(error_kind("{ [self.x]: 1 }"), AnalysisErrorKind::SelfOutsideObject);
        assert_eq!(
            error_kind("{ local k = 'a', [k]: 1 }"),
            AnalysisErrorKind::UnknownVariable("k".to_string())
        );
    }

    #[test]
    fn test_comprehension_variables() {
        let (_, result) = analyze_code("{ [k]: v for k in ['a'] for v in [1] if v > 0 }");
        assert!(result.is_ok(), "Analysis failed: {:?}", result.err());
        let (_, result) = analyze_code("[x + y for x in [1] for y in [x]]");
        assert!(result.is_ok(), "Analysis failed: {:?}", result.err());
    }

    #[test]
    fn test_default_params_see_other_params() {
        let (_, result) = analyze_code("function(a, b = a + 1) a + b");
        assert!(result.is_ok(), "Analysis failed: {:?}", result.err());
    }

    #[test]
    fn test_error_location() {
        let (_, result) = analyze_code("\n\n   nope");
        let err = result.expect_err("expected error");
        assert_eq!((err.line(), err.column()), (3, 4));
        assert_eq!(err.to_string(), "test:3:4-8: Unknown variable: nope");
    }
}
