//! 惰性求值虚拟机
//!
//! 直接遍历已分析的 Core AST。局部绑定、函数参数、数组元素和对象字段都包装成
//! thunk，读取时才求值并缓存结果。调用栈深度由 `max_stack` 限制，
//! 表达式递归深度由求值线程的栈大小换算出的上限限制，超出时都返回
//! `StackOverflow` 错误而不是耗尽宿主线程栈。
//!
//! 一个 `Vm` 对应一次顶层求值：导入缓存、ext 代码缓存和整个 thunk arena
//! 都随它一起释放。

mod call;
mod compare;
mod execution;
mod index;
mod manifest;
mod operators;

pub(crate) use call::CallArgs;

use super::error::{EvalError, EvalResult, FrameName, RuntimeError, RuntimeErrorKind, TraceFrame};
use super::heap::{Deferred, EnvId, Forced, Heap, ThunkId};
use super::import::{dir_of, ImportCallback, ImportedFile};
use super::native::NativeRegistry;
use super::stdlib;
use super::value::{Layer, LayerField, ObjectValue, Scope, Value};
use crate::compiler::{self, StaticError};
use crate::compiler::parser::ast::Visibility;
use crate::kit::lexer::{SourcePosition, SourceSpan};
use jsonlang_config::LimitConfig;
use jsonlang_log::{debug, info, warn, Logger};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::sync::Arc;

/// 外部变量 / 顶层参数的取值
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtValue {
    /// 原样作为字符串
    Str(String),
    /// 作为代码编译求值
    Code(String),
}

/// 构造 [`Vm`] 所需的全部外部输入
pub struct VmOptions<'a> {
    pub limits: LimitConfig,
    pub importer: &'a dyn ImportCallback,
    pub natives: &'a NativeRegistry,
    pub ext_vars: BTreeMap<String, ExtValue>,
    pub tlas: BTreeMap<String, ExtValue>,
    pub logger: Arc<Logger>,
}

impl<'a> VmOptions<'a> {
    pub fn new(importer: &'a dyn ImportCallback, natives: &'a NativeRegistry) -> Self {
        Self {
            limits: LimitConfig::default(),
            importer,
            natives,
            ext_vars: BTreeMap::new(),
            tlas: BTreeMap::new(),
            logger: Logger::noop(),
        }
    }
}

/// 每层表达式递归预留的宿主栈字节数
const EVAL_LEVEL_STACK_BYTES: usize = 32 * 1024;

/// 调用栈中的一帧
#[derive(Debug)]
struct StackFrame {
    span: SourceSpan,
    name: FrameName,
}

/// 离开作用域时弹出栈帧
pub(crate) struct FrameGuard<'v> {
    stack: &'v RefCell<Vec<StackFrame>>,
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}

pub struct Vm<'a> {
    options: VmOptions<'a>,
    logger: Arc<Logger>,
    pub(crate) heap: Heap,
    stack: RefCell<Vec<StackFrame>>,
    /// 当前 `eval` 递归深度
    depth: Cell<usize>,
    max_depth: usize,
    /// 不含 `thisFile` 的 std 对象
    std_base: ObjectValue,
    /// 内置层使用的空环境
    empty_env: EnvId,
    /// (导入方目录, 字面路径) -> 文件内容
    import_files: RefCell<HashMap<(String, String), Rc<ImportedFile>>>,
    /// 规范路径 -> 导入值
    import_values: RefCell<HashMap<String, ThunkId>>,
    /// extVar 代码 -> thunk
    ext_thunks: RefCell<HashMap<String, ThunkId>>,
    /// 主文件根表达式的位置
    root_span: RefCell<Option<SourceSpan>>,
}

impl<'a> Vm<'a> {
    pub fn new(options: VmOptions<'a>) -> Self {
        let logger = Arc::clone(&options.logger);
        let heap = Heap::new();
        let empty_env = heap.new_env(None, Vec::new());
        let std_span = SourceSpan::at(Arc::from("<std>"), SourcePosition::start());
        let std_base = stdlib::std_object(&heap, empty_env, std_span);
        let max_depth = (options.limits.eval_thread_stack_bytes / EVAL_LEVEL_STACK_BYTES).max(1);
        debug!(
            logger,
            "Created VM, max_stack={}, max_depth={}",
            options.limits.max_stack,
            max_depth
        );
        Self {
            options,
            logger,
            heap,
            stack: RefCell::new(Vec::new()),
            depth: Cell::new(0),
            max_depth,
            std_base,
            empty_env,
            import_files: RefCell::new(HashMap::new()),
            import_values: RefCell::new(HashMap::new()),
            ext_thunks: RefCell::new(HashMap::new()),
            root_span: RefCell::new(None),
        }
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    pub(crate) fn natives(&self) -> &NativeRegistry {
        self.options.natives
    }

    pub(crate) fn empty_env(&self) -> EnvId {
        self.empty_env
    }

    // ==================== 入口 ====================

    /// 编译并求值主文件；结果是函数时用 TLA 调用它
    pub fn evaluate(&self, file: &str, text: &str) -> Result<Value, EvalError> {
        info!(self.logger, "Evaluating {}", file);
        let core = compiler::compile(file, text, &self.logger)?;
        *self.root_span.borrow_mut() = Some(core.span.clone());

        let scope = self.root_scope(file);
        let result = self
            .eval(&core, &scope)
            .and_then(|value| self.apply_tlas(value, &core.span));
        match result {
            Ok(value) => {
                debug!(
                    self.logger,
                    "Evaluated {} to {}, {} thunks allocated",
                    file,
                    value.type_name(),
                    self.heap.thunk_count()
                );
                Ok(value)
            }
            Err(err) => {
                warn!(self.logger, "Runtime error in {}: {}", file, err);
                Err(EvalError::Runtime(err))
            }
        }
    }

    fn apply_tlas(&self, value: Value, span: &SourceSpan) -> EvalResult<Value> {
        let Value::Function(func) = value else {
            return Ok(value);
        };
        let named = self
            .options
            .tlas
            .iter()
            .map(|(name, ext)| {
                debug!(self.logger, "Binding top-level argument {}", name);
                let thunk = match ext {
                    ExtValue::Str(s) => self.heap.alloc_value(Value::string(s.as_str())),
                    ExtValue::Code(code) => self.heap.alloc(Deferred::Unit {
                        file: Rc::from(format!("<tla:{name}>")),
                        text: Rc::from(code.as_str()),
                    }),
                };
                (Rc::from(name.as_str()), thunk)
            })
            .collect();
        let args = CallArgs {
            positional: Vec::new(),
            named,
        };
        self.call(&func, args, span, None)
    }

    /// 主文件位置，输出阶段的栈帧使用
    pub(crate) fn root_span(&self) -> SourceSpan {
        self.root_span
            .borrow()
            .clone()
            .unwrap_or_else(|| SourceSpan::at(Arc::from("<root>"), SourcePosition::start()))
    }

    /// 单元的根作用域：[std, $std]，std 带本单元的 `thisFile`
    fn root_scope(&self, file: &str) -> Scope {
        let this_file = self.heap.alloc_value(Value::string(file));
        let mut fields = BTreeMap::new();
        fields.insert(
            Rc::from("thisFile"),
            LayerField::Thunk {
                visibility: Visibility::Hidden,
                thunk: this_file,
            },
        );
        let layers = std::iter::once(Rc::new(Layer::new(self.empty_env, fields, Vec::new())))
            .chain(self.std_base.layers().iter().cloned())
            .collect();
        let std_object = ObjectValue::new(layers, self.std_base.span().clone());
        let std_thunk = self.heap.alloc_value(Value::Object(std_object));
        let env = self.heap.new_env(None, vec![std_thunk, std_thunk]);
        Scope::new(env, None)
    }

    /// 编译并求值一个独立单元（导入文件、ext 代码）
    fn eval_unit(&self, file: &str, text: &str) -> EvalResult<Value> {
        let core = compiler::compile(file, text, &self.logger).map_err(|e| self.static_error(&e))?;
        let scope = self.root_scope(file);
        self.eval(&core, &scope)
    }

    fn static_error(&self, err: &StaticError) -> RuntimeError {
        self.error(RuntimeErrorKind::Static, err.message(), err.span())
    }

    // ==================== 栈与错误 ====================

    /// 压入一帧；超过 `max_stack` 时报错
    pub(crate) fn enter(&self, span: &SourceSpan, name: FrameName) -> EvalResult<FrameGuard<'_>> {
        let depth = self.stack.borrow().len();
        if depth >= self.options.limits.max_stack {
            warn!(self.logger, "Stack limit {} hit at {}", self.options.limits.max_stack, span);
            return Err(self.error(
                RuntimeErrorKind::StackOverflow,
                "Max stack frames exceeded.",
                span,
            ));
        }
        self.stack.borrow_mut().push(StackFrame {
            span: span.clone(),
            name,
        });
        Ok(FrameGuard { stack: &self.stack })
    }

    /// 表达式递归加深一层；超过 `max_depth` 时报错
    pub(crate) fn descend<T>(&self, span: &SourceSpan, f: impl FnOnce() -> EvalResult<T>) -> EvalResult<T> {
        let depth = self.depth.get();
        if depth >= self.max_depth {
            warn!(self.logger, "Expression depth limit {} hit at {}", self.max_depth, span);
            return Err(self.error(
                RuntimeErrorKind::StackOverflow,
                "Max stack frames exceeded.",
                span,
            ));
        }
        self.depth.set(depth + 1);
        let result = f();
        self.depth.set(depth);
        result
    }

    /// 以当前调用栈构造错误；`span` 为出错位置
    pub(crate) fn error(
        &self,
        kind: RuntimeErrorKind,
        message: impl Into<String>,
        span: &SourceSpan,
    ) -> RuntimeError {
        let stack = self.stack.borrow();
        let name_at = |i: usize| stack.get(i).map(|f| f.name.to_string()).unwrap_or_default();

        let mut trace = Vec::with_capacity(stack.len() + 1);
        trace.push(TraceFrame {
            span: span.clone(),
            name: stack.len().checked_sub(1).map(&name_at).unwrap_or_default(),
        });
        for k in (0..stack.len()).rev() {
            trace.push(TraceFrame {
                span: stack[k].span.clone(),
                name: k.checked_sub(1).map(&name_at).unwrap_or_default(),
            });
        }
        RuntimeError::new(kind, message, trace)
    }

    /// 最内层栈帧的位置
    fn current_span(&self) -> SourceSpan {
        match self.stack.borrow().last() {
            Some(frame) => frame.span.clone(),
            None => self.root_span(),
        }
    }

    // ==================== thunk ====================

    pub(crate) fn force(&self, id: ThunkId) -> EvalResult<Value> {
        match self.heap.begin_force(id) {
            Forced::Value(value) => Ok(value),
            Forced::Error(err) => Err(err),
            Forced::Cycle => Err(self.error(
                RuntimeErrorKind::CircularReference,
                "Circular reference detected.",
                &self.current_span(),
            )),
            Forced::Run(deferred) => {
                let result = self.run_deferred(deferred);
                self.heap.finish(id, &result);
                result
            }
        }
    }

    fn run_deferred(&self, deferred: Deferred) -> EvalResult<Value> {
        match deferred {
            Deferred::Expr { expr, scope, name } => {
                let _guard = self.enter(&expr.span, name)?;
                self.eval(&expr, &scope)
            }
            Deferred::Call { func, args, span } => self.call(&func, CallArgs::positional(args), &span, None),
            Deferred::Unit { file, text } => self.eval_unit(&file, &text),
        }
    }

    // ==================== 外部输入 ====================

    /// `std.extVar(name)`
    pub(crate) fn ext_var(&self, name: &str, span: &SourceSpan) -> EvalResult<Value> {
        match self.options.ext_vars.get(name) {
            None => Err(self.error(
                RuntimeErrorKind::Evaluation,
                format!("Undefined external variable: {name}"),
                span,
            )),
            Some(ExtValue::Str(s)) => Ok(Value::string(s.as_str())),
            Some(ExtValue::Code(code)) => {
                let cached = self.ext_thunks.borrow().get(name).copied();
                let thunk = match cached {
                    Some(thunk) => thunk,
                    None => {
                        debug!(self.logger, "Compiling external variable {}", name);
                        let thunk = self.heap.alloc(Deferred::Unit {
                            file: Rc::from(format!("<extvar:{name}>")),
                            text: Rc::from(code.as_str()),
                        });
                        self.ext_thunks.borrow_mut().insert(name.to_string(), thunk);
                        thunk
                    }
                };
                self.force(thunk)
            }
        }
    }

    /// 通过回调读取导入文件（按导入方目录和字面路径缓存）
    pub(crate) fn import_file(&self, path: &str, span: &SourceSpan) -> EvalResult<Rc<ImportedFile>> {
        let dir = dir_of(&span.file).to_string();
        let key = (dir, path.to_string());
        if let Some(file) = self.import_files.borrow().get(&key) {
            debug!(self.logger, "Import cache hit: {}", path);
            return Ok(Rc::clone(file));
        }

        match self.options.importer.import(&key.0, path) {
            Ok(Some(file)) => {
                debug!(self.logger, "Imported {} as {}", path, file.canonical_path);
                let file = Rc::new(file);
                self.import_files.borrow_mut().insert(key, Rc::clone(&file));
                Ok(file)
            }
            Ok(None) => Err(self.error(
                RuntimeErrorKind::ImportNotFound,
                format!("Couldn't open import \"{path}\": not found"),
                span,
            )),
            Err(reason) => Err(self.error(
                RuntimeErrorKind::ImportFailed,
                format!("Couldn't open import \"{path}\": {reason}"),
                span,
            )),
        }
    }

    /// `import "path"`：每个规范路径只求值一次
    pub(crate) fn import_value(&self, path: &str, span: &SourceSpan) -> EvalResult<Value> {
        let file = self.import_file(path, span)?;
        let cached = self.import_values.borrow().get(&file.canonical_path).copied();
        let thunk = match cached {
            Some(thunk) => thunk,
            None => {
                let thunk = self.heap.alloc(Deferred::Unit {
                    file: Rc::from(file.canonical_path.as_str()),
                    text: Rc::from(file.content.as_str()),
                });
                self.import_values
                    .borrow_mut()
                    .insert(file.canonical_path.clone(), thunk);
                thunk
            }
        };
        let _guard = self.enter(span, FrameName::Import(Rc::from(file.canonical_path.as_str())))?;
        self.force(thunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::import::NoImports;

    fn with_vm<R>(f: impl FnOnce(&Vm<'_>) -> R) -> R {
        let natives = NativeRegistry::new();
        let vm = Vm::new(VmOptions::new(&NoImports, &natives));
        f(&vm)
    }

    #[test]
    fn test_error_trace_names_enclosing_frames() {
        with_vm(|vm| {
            let outer = SourceSpan::at(Arc::from("t"), SourcePosition::new(1, 1, 0));
            let inner = SourceSpan::at(Arc::from("t"), SourcePosition::new(2, 1, 0));
            let site = SourceSpan::at(Arc::from("t"), SourcePosition::new(3, 1, 0));
            let _a = vm.enter(&outer, FrameName::Function(Some(Rc::from("f")))).unwrap();
            let _b = vm.enter(&inner, FrameName::Thunk(Rc::from("x"))).unwrap();
            let err = vm.error(RuntimeErrorKind::UserError, "boom", &site);
            let names: Vec<&str> = err.trace.iter().map(|f| f.name.as_str()).collect();
            assert_eq!(names, ["thunk <x>", "function <f>", ""]);
            assert_eq!(err.trace[0].span.line(), 3);
            assert_eq!(err.trace[1].span.line(), 2);
        });
    }

    #[test]
    fn test_stack_limit() {
        let natives = NativeRegistry::new();
        let mut options = VmOptions::new(&NoImports, &natives);
        options.limits.max_stack = 2;
        let vm = Vm::new(options);
        let span = SourceSpan::at(Arc::from("t"), SourcePosition::start());
        let _a = vm.enter(&span, FrameName::Object).unwrap();
        let _b = vm.enter(&span, FrameName::Object).unwrap();
        let err = vm.enter(&span, FrameName::Object).err().expect("limit");
        assert_eq!(err.kind, RuntimeErrorKind::StackOverflow);
        assert_eq!(err.message, "Max stack frames exceeded.");
    }

    #[test]
    fn test_expression_depth_limit() {
        let natives = NativeRegistry::new();
        let mut options = VmOptions::new(&NoImports, &natives);
        options.limits.eval_thread_stack_bytes = 2 * EVAL_LEVEL_STACK_BYTES;
        let vm = Vm::new(options);
        let span = SourceSpan::at(Arc::from("t"), SourcePosition::start());
        let ok = vm.descend(&span, || vm.descend(&span, || Ok(1)));
        assert_eq!(ok, Ok(1));
        let err = vm
            .descend(&span, || vm.descend(&span, || vm.descend(&span, || Ok(1))))
            .unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::StackOverflow);
        assert_eq!(vm.depth.get(), 0);
    }

    #[test]
    fn test_guard_pops_frame() {
        with_vm(|vm| {
            let span = SourceSpan::at(Arc::from("t"), SourcePosition::start());
            {
                let _g = vm.enter(&span, FrameName::Array).unwrap();
                assert_eq!(vm.stack.borrow().len(), 1);
            }
            assert_eq!(vm.stack.borrow().len(), 0);
        });
    }
}
