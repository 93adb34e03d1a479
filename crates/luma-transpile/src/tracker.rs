//! Brace depth and function-context tracking.

use crate::ScanEvent;

/// One function body the transpiler is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionContext {
    /// Whether suspending calls may be rewritten in this body.
    pub is_suspendable: bool,
    /// Brace depth just inside the body's opening `{`.
    pub brace_depth_at_entry: usize,
}

/// Tracks code-mode brace depth and the stack of enclosing functions.
///
/// A declaration is registered with [`declare`](Self::declare); the next
/// opening brace becomes its body. A `;` before that brace (a prototype)
/// cancels it.
#[derive(Debug, Default, Clone)]
pub struct ContextTracker {
    depth: usize,
    stack: Vec<FunctionContext>,
    pending: Option<bool>,
}

impl ContextTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Enclosing function bodies, outermost first.
    pub fn contexts(&self) -> &[FunctionContext] {
        &self.stack
    }

    /// Register a function declaration whose body has not opened yet.
    pub fn declare(&mut self, suspendable: bool) {
        self.pending = Some(suspendable);
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn cancel_pending(&mut self) {
        self.pending = None;
    }

    /// Whether the innermost enclosing function may suspend.
    pub fn is_suspendable(&self) -> bool {
        self.stack.last().is_some_and(|ctx| ctx.is_suspendable)
    }

    pub fn observe(&mut self, event: ScanEvent) {
        match event {
            ScanEvent::OpenBrace => self.open_brace(),
            ScanEvent::InterpolationOpen => self.depth += 1,
            ScanEvent::CloseBrace | ScanEvent::InterpolationClose => self.close_brace(),
        }
    }

    fn open_brace(&mut self) {
        self.depth += 1;
        if let Some(is_suspendable) = self.pending.take() {
            self.stack.push(FunctionContext {
                is_suspendable,
                brace_depth_at_entry: self.depth,
            });
        }
    }

    fn close_brace(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        while self
            .stack
            .last()
            .is_some_and(|ctx| ctx.brace_depth_at_entry > self.depth)
        {
            self.stack.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_opens_on_next_brace() {
        let mut t = ContextTracker::new();
        t.declare(true);
        assert!(!t.is_suspendable());
        t.observe(ScanEvent::OpenBrace);
        assert!(t.is_suspendable());
        assert_eq!(t.contexts()[0].brace_depth_at_entry, 1);
        t.observe(ScanEvent::CloseBrace);
        assert!(!t.is_suspendable());
        assert_eq!(t.depth(), 0);
    }

    #[test]
    fn test_inner_blocks_keep_context() {
        let mut t = ContextTracker::new();
        t.declare(true);
        t.observe(ScanEvent::OpenBrace);
        t.observe(ScanEvent::OpenBrace);
        t.observe(ScanEvent::CloseBrace);
        assert!(t.is_suspendable());
    }

    #[test]
    fn test_nested_non_suspendable_shadows_outer() {
        let mut t = ContextTracker::new();
        t.declare(true);
        t.observe(ScanEvent::OpenBrace);
        t.declare(false);
        t.observe(ScanEvent::OpenBrace);
        assert!(!t.is_suspendable());
        t.observe(ScanEvent::CloseBrace);
        assert!(t.is_suspendable());
    }

    #[test]
    fn test_cancelled_declaration_does_not_bind() {
        let mut t = ContextTracker::new();
        t.declare(true);
        t.cancel_pending();
        t.observe(ScanEvent::OpenBrace);
        assert!(t.contexts().is_empty());
    }

    #[test]
    fn test_interpolation_braces_do_not_take_pending() {
        let mut t = ContextTracker::new();
        t.declare(false);
        t.observe(ScanEvent::InterpolationOpen);
        assert!(t.has_pending());
        assert_eq!(t.depth(), 1);
        t.observe(ScanEvent::InterpolationClose);
        assert_eq!(t.depth(), 0);
    }

    #[test]
    fn test_unbalanced_close_saturates() {
        let mut t = ContextTracker::new();
        t.observe(ScanEvent::CloseBrace);
        assert_eq!(t.depth(), 0);
    }
}
