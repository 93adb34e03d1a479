//! Scoped variable environment for the evaluator.
//!
//! Globals live in one scope shared by every call, above a prelude holding
//! the builtins. Each function call gets its own frame of block scopes;
//! lookups search the current frame from the innermost block outward, then
//! the globals, then the prelude. Functions do not capture the locals of an
//! enclosing function.

use std::collections::HashMap;

use luma_types::ast::DeclKind;

use crate::error::{EvalError, EvalResult};
use crate::value::Value;

#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    is_const: bool,
}

#[derive(Debug, Clone, Default)]
struct Scope {
    bindings: HashMap<String, Binding>,
}

#[derive(Debug, Clone)]
pub struct Environment {
    prelude: Scope,
    globals: Scope,
    /// Block scopes of top-level code, above the globals.
    top: Vec<Scope>,
    /// One entry per active call, each a stack of block scopes.
    frames: Vec<Vec<Scope>>,
}

impl Environment {
    pub fn new() -> Self {
        Self {
            prelude: Scope::default(),
            globals: Scope::default(),
            top: Vec::new(),
            frames: Vec::new(),
        }
    }

    fn blocks(&self) -> &Vec<Scope> {
        self.frames.last().unwrap_or(&self.top)
    }

    fn blocks_mut(&mut self) -> &mut Vec<Scope> {
        match self.frames.last_mut() {
            Some(frame) => frame,
            None => &mut self.top,
        }
    }

    fn innermost_mut(&mut self) -> &mut Scope {
        let blocks = match self.frames.last_mut() {
            Some(frame) => frame,
            None => &mut self.top,
        };
        blocks.last_mut().unwrap_or(&mut self.globals)
    }

    /// Enter a function call: a fresh frame with one scope for parameters.
    pub fn push_frame(&mut self) {
        self.frames.push(vec![Scope::default()]);
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    pub fn push_scope(&mut self) {
        self.blocks_mut().push(Scope::default());
    }

    pub fn pop_scope(&mut self) {
        self.blocks_mut().pop();
    }

    /// Install a builtin or constant. Programs may shadow or reassign it.
    pub fn define_builtin(&mut self, name: &str, value: Value) {
        self.prelude.bindings.insert(
            name.to_string(),
            Binding {
                value,
                is_const: false,
            },
        );
    }

    /// Declare in the innermost scope. `let`/`const` reject a second
    /// declaration in the same scope; `var` and functions overwrite.
    pub fn declare(&mut self, name: &str, value: Value, kind: Option<DeclKind>) -> EvalResult<()> {
        let scope = self.innermost_mut();
        let strict = matches!(kind, Some(DeclKind::Let | DeclKind::Const));
        if strict && scope.bindings.contains_key(name) {
            return Err(EvalError::AlreadyDeclared(name.to_string()));
        }
        scope.bindings.insert(
            name.to_string(),
            Binding {
                value,
                is_const: kind == Some(DeclKind::Const),
            },
        );
        Ok(())
    }

    /// Look up a variable from the innermost scope outward.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.blocks()
            .iter()
            .rev()
            .chain([&self.globals, &self.prelude])
            .find_map(|scope| scope.bindings.get(name))
            .map(|b| &b.value)
    }

    /// Update the nearest binding of `name`.
    pub fn assign(&mut self, name: &str, value: Value) -> EvalResult<()> {
        let blocks = match self.frames.last_mut() {
            Some(frame) => frame,
            None => &mut self.top,
        };
        let binding = blocks
            .iter_mut()
            .rev()
            .chain([&mut self.globals, &mut self.prelude])
            .find_map(|scope| scope.bindings.get_mut(name))
            .ok_or_else(|| EvalError::UndefinedVariable(name.to_string()))?;
        if binding.is_const {
            return Err(EvalError::ConstAssignment(name.to_string()));
        }
        binding.value = value;
        Ok(())
    }

    pub fn call_depth(&self) -> usize {
        self.frames.len()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_scope_shadows_and_restores() {
        let mut env = Environment::new();
        env.declare("x", Value::Number(1.0), Some(DeclKind::Let)).unwrap();
        env.push_scope();
        env.declare("x", Value::Number(2.0), Some(DeclKind::Let)).unwrap();
        assert_eq!(env.get("x").map(Value::to_number), Some(2.0));
        env.pop_scope();
        assert_eq!(env.get("x").map(Value::to_number), Some(1.0));
    }

    #[test]
    fn test_frames_do_not_see_caller_locals() {
        let mut env = Environment::new();
        env.define_builtin("g", Value::Number(1.0));
        env.push_frame();
        env.declare("local", Value::Number(2.0), Some(DeclKind::Let)).unwrap();
        env.push_frame();
        assert!(env.get("local").is_none());
        assert!(env.get("g").is_some());
        env.pop_frame();
        assert!(env.get("local").is_some());
        env.pop_frame();
        assert_eq!(env.call_depth(), 0);
    }

    #[test]
    fn test_const_rejects_assignment() {
        let mut env = Environment::new();
        env.declare("c", Value::Number(1.0), Some(DeclKind::Const)).unwrap();
        assert_eq!(
            env.assign("c", Value::Number(2.0)),
            Err(EvalError::ConstAssignment("c".to_string()))
        );
    }

    #[test]
    fn test_let_redeclaration_rejected_var_allowed() {
        let mut env = Environment::new();
        env.declare("a", Value::Null, Some(DeclKind::Let)).unwrap();
        assert!(env.declare("a", Value::Null, Some(DeclKind::Let)).is_err());
        env.declare("v", Value::Null, Some(DeclKind::Var)).unwrap();
        env.declare("v", Value::Null, Some(DeclKind::Var)).unwrap();
    }

    #[test]
    fn test_top_level_let_shadows_builtin() {
        let mut env = Environment::new();
        env.define_builtin("print", Value::Null);
        env.declare("print", Value::Number(1.0), Some(DeclKind::Let)).unwrap();
        assert_eq!(env.get("print").map(Value::to_number), Some(1.0));
    }

    #[test]
    fn test_assign_undeclared_fails() {
        let mut env = Environment::new();
        assert_eq!(
            env.assign("nope", Value::Null),
            Err(EvalError::UndefinedVariable("nope".to_string()))
        );
    }

    #[test]
    fn test_assign_reaches_globals_from_frame() {
        let mut env = Environment::new();
        env.declare("count", Value::Number(0.0), Some(DeclKind::Let)).unwrap();
        env.push_frame();
        env.assign("count", Value::Number(5.0)).unwrap();
        env.pop_frame();
        assert_eq!(env.get("count").map(Value::to_number), Some(5.0));
    }
}
