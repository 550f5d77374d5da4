//! Thunk 与环境帧的存储
//!
//! 一次求值内的所有 thunk 和环境帧都放在 arena 里，用下标互相引用，
//! 求值结束时整体释放。thunk 状态单向迁移：Pending -> Forcing -> Done / Failed。

use super::error::{EvalResult, FrameName, RuntimeError};
use super::value::{FunctionValue, Scope, Value};
use crate::compiler::desugar::core::{CoreExpr, Slot};
use crate::kit::lexer::SourceSpan;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThunkId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnvId(pub usize);

/// 尚未执行的计算
#[derive(Debug)]
pub enum Deferred {
    /// 在给定作用域中求值表达式
    Expr {
        expr: CoreExpr,
        scope: Scope,
        name: FrameName,
    },
    /// 延迟的函数调用（`std.map`、`std.makeArray` 等的元素）
    Call {
        func: Rc<FunctionValue>,
        args: Vec<ThunkId>,
        span: SourceSpan,
    },
    /// 一个独立编译单元（导入文件、extVar / TLA 代码）
    Unit { file: Rc<str>, text: Rc<str> },
}

#[derive(Debug)]
pub enum ThunkState {
    Pending(Deferred),
    Forcing,
    Done(Value),
    Failed(RuntimeError),
}

/// [`Heap::begin_force`] 的结果
#[derive(Debug)]
pub enum Forced {
    Value(Value),
    Error(RuntimeError),
    /// 调用方执行后必须调用 [`Heap::finish`]
    Run(Deferred),
    /// 该 thunk 正在求值中
    Cycle,
}

#[derive(Debug)]
pub struct EnvFrame {
    pub slots: Vec<ThunkId>,
    pub parent: Option<EnvId>,
}

#[derive(Debug, Default)]
pub struct Heap {
    thunks: RefCell<Vec<ThunkState>>,
    envs: RefCell<Vec<EnvFrame>>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&self, deferred: Deferred) -> ThunkId {
        self.push(ThunkState::Pending(deferred))
    }

    /// 已求值的 thunk
    pub fn alloc_value(&self, value: Value) -> ThunkId {
        self.push(ThunkState::Done(value))
    }

    fn push(&self, state: ThunkState) -> ThunkId {
        let mut thunks = self.thunks.borrow_mut();
        thunks.push(state);
        ThunkId(thunks.len() - 1)
    }

    pub fn begin_force(&self, id: ThunkId) -> Forced {
        let mut thunks = self.thunks.borrow_mut();
        let state = &mut thunks[id.0];
        match state {
            ThunkState::Done(value) => Forced::Value(value.clone()),
            ThunkState::Failed(err) => Forced::Error(err.clone()),
            ThunkState::Forcing => Forced::Cycle,
            ThunkState::Pending(_) => match std::mem::replace(state, ThunkState::Forcing) {
                ThunkState::Pending(deferred) => Forced::Run(deferred),
                _ => Forced::Cycle,
            },
        }
    }

    /// 记录结果（值或错误都会被缓存）
    pub fn finish(&self, id: ThunkId, result: &EvalResult<Value>) {
        let state = match result {
            Ok(value) => ThunkState::Done(value.clone()),
            Err(err) => ThunkState::Failed(err.clone()),
        };
        self.thunks.borrow_mut()[id.0] = state;
    }

    /// 已求值时返回其值，不触发求值
    pub fn peek(&self, id: ThunkId) -> Option<Value> {
        match &self.thunks.borrow()[id.0] {
            ThunkState::Done(value) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn thunk_count(&self) -> usize {
        self.thunks.borrow().len()
    }

    pub fn new_env(&self, parent: Option<EnvId>, slots: Vec<ThunkId>) -> EnvId {
        let mut envs = self.envs.borrow_mut();
        envs.push(EnvFrame { slots, parent });
        EnvId(envs.len() - 1)
    }

    /// 先分配空帧，槽位稍后填入（递归绑定需要在 thunk 中引用这一帧）
    pub fn reserve_env(&self, parent: Option<EnvId>) -> EnvId {
        self.new_env(parent, Vec::new())
    }

    pub fn set_slots(&self, env: EnvId, slots: Vec<ThunkId>) {
        self.envs.borrow_mut()[env.0].slots = slots;
    }

    pub fn lookup(&self, env: EnvId, slot: Slot) -> Option<ThunkId> {
        let envs = self.envs.borrow();
        let mut current = env;
        for _ in 0..slot.depth {
            current = envs.get(current.0)?.parent?;
        }
        envs.get(current.0)?.slots.get(slot.index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::error::RuntimeErrorKind;

    #[test]
    fn test_value_thunk_is_ready() {
        let heap = Heap::new();
        let id = heap.alloc_value(Value::Number(1.0));
        assert!(matches!(heap.begin_force(id), Forced::Value(Value::Number(n)) if n == 1.0));
        assert!(matches!(heap.peek(id), Some(Value::Number(_))));
    }

    #[test]
    fn test_pending_thunk_transitions_once() {
        let heap = Heap::new();
        let id = heap.alloc(Deferred::Unit {
            file: Rc::from("u"),
            text: Rc::from("1"),
        });
        assert!(matches!(heap.begin_force(id), Forced::Run(Deferred::Unit { .. })));
        // 求值中再次强制 -> 循环
        assert!(matches!(heap.begin_force(id), Forced::Cycle));
        heap.finish(id, &Ok(Value::Bool(true)));
        assert!(matches!(heap.begin_force(id), Forced::Value(Value::Bool(true))));
    }

    #[test]
    fn test_errors_are_memoized() {
        let heap = Heap::new();
        let id = heap.alloc(Deferred::Unit {
            file: Rc::from("u"),
            text: Rc::from("x"),
        });
        let _ = heap.begin_force(id);
        let err = RuntimeError::new(RuntimeErrorKind::UserError, "boom", Vec::new());
        heap.finish(id, &Err(err));
        assert!(matches!(heap.begin_force(id), Forced::Error(e) if e.message == "boom"));
    }

    #[test]
    fn test_env_lookup_walks_parents() {
        let heap = Heap::new();
        let a = heap.alloc_value(Value::Null);
        let b = heap.alloc_value(Value::Null);
        let root = heap.new_env(None, vec![a]);
        let child = heap.reserve_env(Some(root));
        heap.set_slots(child, vec![b]);
        assert_eq!(heap.lookup(child, Slot { depth: 0, index: 0 }), Some(b));
        assert_eq!(heap.lookup(child, Slot { depth: 1, index: 0 }), Some(a));
        assert_eq!(heap.lookup(child, Slot { depth: 2, index: 0 }), None);
        assert_eq!(heap.lookup(child, Slot { depth: 0, index: 3 }), None);
    }
}
