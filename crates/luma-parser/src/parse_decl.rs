//! Program, function and variable declaration parsing.

use std::sync::Arc;

use luma_lexer::token::TokenKind;
use luma_types::ast::*;
use luma_types::ErrorCode;

use crate::parser::Parser;

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Program
    // ══════════════════════════════════════════════════════════════════════════

    pub(crate) fn parse_program(&mut self) -> Program {
        let start = self.current_span();
        let mut body = Vec::new();
        while !self.at_end() {
            if self.too_many_errors() {
                break;
            }
            if self.check_exact(&TokenKind::RBrace) {
                self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, "unmatched '}'");
                self.advance();
                continue;
            }
            self.parse_statement_into(&mut body);
        }
        let span = start.merge(self.previous_span());
        Program { body, span }
    }

    /// Parse one statement into `out`, recovering on failure.
    pub(crate) fn parse_statement_into(&mut self, out: &mut Vec<Stmt>) {
        let before = self.current_span().start;
        match self.parse_statement() {
            Some(stmt) => out.push(stmt),
            None => {
                self.synchronize();
                if self.current_span().start == before && !self.at_end() {
                    self.advance();
                }
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Functions
    // ══════════════════════════════════════════════════════════════════════════

    /// `[async] function name(a, b) { body }`
    pub(crate) fn parse_function_decl(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        let is_async = self.eat(&TokenKind::Async);
        self.expect(&TokenKind::Function)?;
        let name = self.expect_identifier()?;

        self.expect(&TokenKind::LParen)?;
        let mut params: Vec<Ident> = Vec::new();
        while !self.check_exact(&TokenKind::RParen) && !self.at_end() {
            let param = self.expect_identifier()?;
            if params.iter().any(|p| p.name == param.name) {
                self.error_at(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("duplicate parameter '{}'", param.name),
                    param.span,
                );
            }
            params.push(param);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;

        // Loops do not reach across a function boundary.
        let outer_loops = std::mem::replace(&mut self.loop_depth, 0);
        self.fn_stack.push(is_async);
        let body = self.parse_block();
        self.fn_stack.pop();
        self.loop_depth = outer_loops;
        let body = body?;

        let span = start.merge(self.previous_span());
        Some(Stmt::Function(Arc::new(FunctionDecl {
            name,
            params,
            body,
            is_async,
            span,
        })))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Variables
    // ══════════════════════════════════════════════════════════════════════════

    /// `let a = 1, b` / `const N = 3` / `var x`, without the trailing `;`.
    pub(crate) fn parse_var_decl(&mut self) -> Option<VarDecl> {
        let start = self.current_span();
        let kind = match self.advance().kind {
            TokenKind::Const => DeclKind::Const,
            TokenKind::Var => DeclKind::Var,
            _ => DeclKind::Let,
        };

        let mut declarators = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            let init = if self.eat(&TokenKind::Eq) {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            if kind == DeclKind::Const && init.is_none() {
                self.error_with_suggestion(
                    ErrorCode::MISSING_INITIALIZER,
                    format!("missing initializer in const declaration '{}'", name.name),
                    name.span,
                    format!("give it a value: const {} = ...", name.name),
                );
            }
            declarators.push(Declarator { name, init });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        let span = start.merge(self.previous_span());
        Some(VarDecl {
            kind,
            declarators,
            span,
        })
    }
}
