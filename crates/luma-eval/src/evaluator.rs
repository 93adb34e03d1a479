//! Tree-walking evaluator for host-script ASTs.
//!
//! Evaluation is async so `await delay(ms)` suspends the task instead of
//! blocking a thread. Recursive entry points return boxed futures.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use luma_types::ast::*;

use crate::builtins::{self, global_constants, namespace_member, GLOBAL_BUILTINS};
use crate::env::Environment;
use crate::error::{EvalError, EvalResult};
use crate::host::HostContext;
use crate::value::{lock_array, ArrayRef, Value};

/// Maximum nesting of user function calls.
pub const MAX_CALL_DEPTH: usize = 64;

/// Loop back-edges between forced token checks and executor yields.
const YIELD_EVERY: u64 = 4096;

/// Largest index an element assignment may grow an array to.
const MAX_ARRAY_LEN: usize = 1 << 20;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// How a statement finished.
#[derive(Debug)]
enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// An assignable location.
enum Place {
    Variable(String),
    Element(ArrayRef, usize),
}

pub(crate) struct Interpreter {
    env: Environment,
    host: HostContext,
    back_edges: u64,
}

impl Interpreter {
    pub(crate) fn new(host: HostContext) -> Self {
        let mut env = Environment::new();
        for builtin in GLOBAL_BUILTINS {
            env.define_builtin(builtin.name(), Value::Builtin(*builtin));
        }
        for (name, value) in global_constants() {
            env.define_builtin(name, value);
        }
        Self {
            env,
            host,
            back_edges: 0,
        }
    }

    pub(crate) fn host(&self) -> &HostContext {
        &self.host
    }

    /// Look up a global binding by name.
    pub(crate) fn global(&self, name: &str) -> Option<&Value> {
        self.env.get(name)
    }

    /// Run the top-level statements once.
    pub(crate) async fn run_program(&mut self, program: &Program) -> EvalResult<()> {
        self.exec_stmts(&program.body).await.map(|_| ())
    }

    // ── Calls ─────────────────────────────────────────────────────────

    pub(crate) fn call_function(
        &mut self,
        decl: Arc<FunctionDecl>,
        args: Vec<Value>,
    ) -> BoxFuture<'_, EvalResult<Value>> {
        Box::pin(async move {
            if self.env.call_depth() >= MAX_CALL_DEPTH {
                return Err(EvalError::CallDepthExceeded(MAX_CALL_DEPTH));
            }
            self.env.push_frame();
            let result = self.run_body(&decl, args).await;
            self.env.pop_frame();
            match result? {
                Flow::Return(value) => Ok(value),
                _ => Ok(Value::Undefined),
            }
        })
    }

    async fn run_body(&mut self, decl: &FunctionDecl, args: Vec<Value>) -> EvalResult<Flow> {
        let mut args = args.into_iter();
        for param in &decl.params {
            self.env
                .declare(&param.name, args.next().unwrap_or_default(), None)?;
        }
        self.exec_stmts(&decl.body.stmts).await
    }

    async fn eval_call(&mut self, callee: &Expr, args: &[Expr], awaited: bool) -> EvalResult<Value> {
        let func = if let ExprKind::Member { object, property } = &callee.kind {
            let receiver = self.eval_expr(object).await?;
            if let Value::Array(items) = &receiver {
                let args = self.eval_args(args).await?;
                return array_method(items, &property.name, args);
            }
            member(&receiver, &property.name)?
        } else {
            self.eval_expr(callee).await?
        };
        let args = self.eval_args(args).await?;

        match func {
            Value::Builtin(builtin) => builtins::call(&self.host, builtin, args, awaited).await,
            Value::Function(decl) => self.call_function(decl, args).await,
            _ => Err(EvalError::NotAFunction(describe(callee))),
        }
    }

    async fn eval_args(&mut self, args: &[Expr]) -> EvalResult<Vec<Value>> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_expr(arg).await?);
        }
        Ok(values)
    }

    // ── Statements ────────────────────────────────────────────────────

    /// Hoist function declarations, then run `stmts` in the current scope.
    async fn exec_stmts(&mut self, stmts: &[Stmt]) -> EvalResult<Flow> {
        for stmt in stmts {
            if let Stmt::Function(decl) = stmt {
                self.env
                    .declare(&decl.name.name, Value::Function(Arc::clone(decl)), None)?;
            }
        }
        for stmt in stmts {
            match self.exec_stmt(stmt).await? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt<'a>(&'a mut self, stmt: &'a Stmt) -> BoxFuture<'a, EvalResult<Flow>> {
        Box::pin(async move {
            match stmt {
                Stmt::Var(decl) => {
                    self.exec_var(decl).await?;
                    Ok(Flow::Normal)
                }
                Stmt::Function(_) | Stmt::Empty(_) => Ok(Flow::Normal),
                Stmt::Expr(s) => {
                    self.eval_expr(&s.expr).await?;
                    Ok(Flow::Normal)
                }
                Stmt::If(s) => {
                    if self.eval_expr(&s.condition).await?.is_truthy() {
                        self.exec_stmt(&s.then_branch).await
                    } else if let Some(else_branch) = &s.else_branch {
                        self.exec_stmt(else_branch).await
                    } else {
                        Ok(Flow::Normal)
                    }
                }
                Stmt::For(s) => {
                    self.env.push_scope();
                    let result = self.exec_for(s).await;
                    self.env.pop_scope();
                    result
                }
                Stmt::While(s) => self.exec_while(s, false).await,
                Stmt::DoWhile(s) => self.exec_while(s, true).await,
                Stmt::Block(block) => {
                    self.env.push_scope();
                    let result = self.exec_stmts(&block.stmts).await;
                    self.env.pop_scope();
                    result
                }
                Stmt::Return(s) => {
                    let value = match &s.value {
                        Some(expr) => self.eval_expr(expr).await?,
                        None => Value::Undefined,
                    };
                    Ok(Flow::Return(value))
                }
                Stmt::Break(_) => Ok(Flow::Break),
                Stmt::Continue(_) => Ok(Flow::Continue),
            }
        })
    }

    async fn exec_var(&mut self, decl: &VarDecl) -> EvalResult<()> {
        for declarator in &decl.declarators {
            let value = match &declarator.init {
                Some(init) => self.eval_expr(init).await?,
                None => Value::Undefined,
            };
            self.env
                .declare(&declarator.name.name, value, Some(decl.kind))?;
        }
        Ok(())
    }

    async fn exec_for(&mut self, s: &ForStmt) -> EvalResult<Flow> {
        match &s.init {
            Some(ForInit::Var(decl)) => self.exec_var(decl).await?,
            Some(ForInit::Expr(expr)) => {
                self.eval_expr(expr).await?;
            }
            None => {}
        }
        loop {
            if let Some(condition) = &s.condition {
                if !self.eval_expr(condition).await?.is_truthy() {
                    break;
                }
            }
            match self.exec_stmt(&s.body).await? {
                Flow::Break => break,
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => {}
            }
            if let Some(update) = &s.update {
                self.eval_expr(update).await?;
            }
            self.back_edge().await?;
        }
        Ok(Flow::Normal)
    }

    async fn exec_while(&mut self, s: &WhileStmt, body_first: bool) -> EvalResult<Flow> {
        let mut skip_check = body_first;
        loop {
            if !skip_check && !self.eval_expr(&s.condition).await?.is_truthy() {
                break;
            }
            skip_check = false;
            match self.exec_stmt(&s.body).await? {
                Flow::Break => break,
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => {}
            }
            self.back_edge().await?;
        }
        Ok(Flow::Normal)
    }

    /// Every loop iteration passes here; a tight loop still observes stop.
    async fn back_edge(&mut self) -> EvalResult<()> {
        self.back_edges = self.back_edges.wrapping_add(1);
        if self.back_edges % YIELD_EVERY == 0 {
            self.host.token.ensure_live()?;
            tokio::task::yield_now().await;
            self.host.token.ensure_live()?;
        }
        Ok(())
    }

    // ── Expressions ───────────────────────────────────────────────────

    fn eval_expr<'a>(&'a mut self, expr: &'a Expr) -> BoxFuture<'a, EvalResult<Value>> {
        Box::pin(async move {
            match &expr.kind {
                ExprKind::Number(n) => Ok(Value::Number(*n)),
                ExprKind::Str(s) => Ok(Value::str(s.as_str())),
                ExprKind::Bool(b) => Ok(Value::Bool(*b)),
                ExprKind::Null => Ok(Value::Null),
                ExprKind::Undefined => Ok(Value::Undefined),
                ExprKind::Template(parts) => {
                    let mut out = String::new();
                    for part in parts {
                        match part {
                            TemplatePart::Literal(text) => out.push_str(text),
                            TemplatePart::Expr(inner) => {
                                let value = self.eval_expr(inner).await?;
                                out.push_str(&value.to_string());
                            }
                        }
                    }
                    Ok(Value::Str(out))
                }
                ExprKind::Identifier(name) => self
                    .env
                    .get(name)
                    .cloned()
                    .ok_or_else(|| EvalError::UndefinedVariable(name.clone())),
                ExprKind::Array(items) => Ok(Value::array(self.eval_args(items).await?)),
                ExprKind::Unary { op, operand } => {
                    let value = self.eval_expr(operand).await?;
                    Ok(match op {
                        UnaryOp::Neg => Value::Number(-value.to_number()),
                        UnaryOp::Plus => Value::Number(value.to_number()),
                        UnaryOp::Not => Value::Bool(!value.is_truthy()),
                        UnaryOp::BitNot => Value::Number(f64::from(!value.to_int32())),
                    })
                }
                ExprKind::Binary { left, op, right } => {
                    let l = self.eval_expr(left).await?;
                    let r = self.eval_expr(right).await?;
                    Ok(Value::binary(*op, &l, &r))
                }
                ExprKind::Logical { left, op, right } => {
                    let l = self.eval_expr(left).await?;
                    let short = match op {
                        LogicalOp::And => !l.is_truthy(),
                        LogicalOp::Or => l.is_truthy(),
                    };
                    if short {
                        Ok(l)
                    } else {
                        self.eval_expr(right).await
                    }
                }
                ExprKind::Assign { target, op, value } => {
                    let place = self.resolve_place(target).await?;
                    let new_value = match op.binary() {
                        None => self.eval_expr(value).await?,
                        Some(bin) => {
                            let current = self.read_place(&place)?;
                            let rhs = self.eval_expr(value).await?;
                            Value::binary(bin, &current, &rhs)
                        }
                    };
                    self.write_place(place, new_value.clone())?;
                    Ok(new_value)
                }
                ExprKind::Update { target, op, prefix } => {
                    let place = self.resolve_place(target).await?;
                    let old = self.read_place(&place)?.to_number();
                    let new = match op {
                        UpdateOp::Increment => old + 1.0,
                        UpdateOp::Decrement => old - 1.0,
                    };
                    self.write_place(place, Value::Number(new))?;
                    Ok(Value::Number(if *prefix { new } else { old }))
                }
                ExprKind::Conditional {
                    condition,
                    then_expr,
                    else_expr,
                } => {
                    if self.eval_expr(condition).await?.is_truthy() {
                        self.eval_expr(then_expr).await
                    } else {
                        self.eval_expr(else_expr).await
                    }
                }
                ExprKind::Call { callee, args } => self.eval_call(callee, args, false).await,
                ExprKind::Member { object, property } => {
                    let receiver = self.eval_expr(object).await?;
                    member(&receiver, &property.name)
                }
                ExprKind::Index { object, index } => {
                    let receiver = self.eval_expr(object).await?;
                    let key = self.eval_expr(index).await?;
                    index_value(&receiver, &key)
                }
                ExprKind::Await(inner) => match &inner.kind {
                    ExprKind::Call { callee, args } => self.eval_call(callee, args, true).await,
                    _ => self.eval_expr(inner).await,
                },
            }
        })
    }

    async fn resolve_place(&mut self, target: &Expr) -> EvalResult<Place> {
        match &target.kind {
            ExprKind::Identifier(name) => Ok(Place::Variable(name.clone())),
            ExprKind::Index { object, index } => {
                let receiver = self.eval_expr(object).await?;
                let key = self.eval_expr(index).await?;
                let Value::Array(items) = receiver else {
                    return Err(EvalError::TypeMismatch(format!(
                        "cannot assign to an index of {}",
                        receiver.type_name()
                    )));
                };
                match array_index(&key) {
                    Some(i) if i < MAX_ARRAY_LEN => Ok(Place::Element(items, i)),
                    _ => Err(EvalError::TypeMismatch(format!("invalid array index {key}"))),
                }
            }
            _ => Err(EvalError::TypeMismatch(
                "invalid assignment target".to_string(),
            )),
        }
    }

    fn read_place(&self, place: &Place) -> EvalResult<Value> {
        match place {
            Place::Variable(name) => self
                .env
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::UndefinedVariable(name.clone())),
            Place::Element(items, i) => Ok(lock_array(items).get(*i).cloned().unwrap_or_default()),
        }
    }

    fn write_place(&mut self, place: Place, value: Value) -> EvalResult<()> {
        match place {
            Place::Variable(name) => self.env.assign(&name, value),
            Place::Element(items, i) => {
                let mut items = lock_array(&items);
                if i >= items.len() {
                    items.resize(i + 1, Value::Undefined);
                }
                items[i] = value;
                Ok(())
            }
        }
    }
}

fn array_index(key: &Value) -> Option<usize> {
    let n = key.to_number();
    (n.is_finite() && n >= 0.0 && n.fract() == 0.0).then_some(n as usize)
}

fn member(receiver: &Value, property: &str) -> EvalResult<Value> {
    match receiver {
        Value::Array(items) if property == "length" => {
            Ok(Value::Number(lock_array(items).len() as f64))
        }
        Value::Str(s) if property == "length" => {
            Ok(Value::Number(s.encode_utf16().count() as f64))
        }
        Value::Namespace(ns) => Ok(namespace_member(*ns, property)),
        Value::Undefined | Value::Null => Err(EvalError::TypeMismatch(format!(
            "Cannot read properties of {receiver} (reading '{property}')"
        ))),
        _ => Ok(Value::Undefined),
    }
}

fn index_value(receiver: &Value, key: &Value) -> EvalResult<Value> {
    match receiver {
        Value::Array(items) => Ok(array_index(key)
            .and_then(|i| lock_array(items).get(i).cloned())
            .unwrap_or_default()),
        Value::Str(s) => Ok(array_index(key)
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::Str(c.to_string()))
            .unwrap_or_default()),
        Value::Undefined | Value::Null => Err(EvalError::TypeMismatch(format!(
            "Cannot read properties of {receiver} (reading '{key}')"
        ))),
        _ => Ok(Value::Undefined),
    }
}

fn array_method(items: &ArrayRef, name: &str, args: Vec<Value>) -> EvalResult<Value> {
    match name {
        "push" => {
            let mut items = lock_array(items);
            items.extend(args);
            Ok(Value::Number(items.len() as f64))
        }
        "pop" => Ok(lock_array(items).pop().unwrap_or_default()),
        "indexOf" => {
            let needle = args.into_iter().next().unwrap_or_default();
            let found = lock_array(items)
                .iter()
                .position(|item| item.strict_equals(&needle));
            Ok(Value::Number(found.map_or(-1.0, |i| i as f64)))
        }
        "join" => {
            let sep = match args.first() {
                None | Some(Value::Undefined) => ",".to_string(),
                Some(sep) => sep.to_string(),
            };
            let parts: Vec<String> = lock_array(items)
                .iter()
                .map(|item| match item {
                    Value::Undefined | Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect();
            Ok(Value::Str(parts.join(&sep)))
        }
        _ => Err(EvalError::NotAFunction(format!("array.{name}"))),
    }
}

/// Source-ish name of a callee for error messages.
fn describe(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Identifier(name) => name.clone(),
        ExprKind::Member { object, property } => format!("{}.{}", describe(object), property.name),
        _ => "expression".to_string(),
    }
}
