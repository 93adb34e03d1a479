//! Statement parsing.

use luma_lexer::token::TokenKind;
use luma_types::ast::*;
use luma_types::ErrorCode;

use crate::parser::{Parser, MAX_NESTING_DEPTH};

impl<'src> Parser<'src> {
    /// Parse a block of statements: `{ stmts... }`
    pub(crate) fn parse_block(&mut self) -> Option<Block> {
        let start = self.current_span();
        self.expect(&TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.check_exact(&TokenKind::RBrace) && !self.at_end() {
            if self.too_many_errors() {
                break;
            }
            self.parse_statement_into(&mut stmts);
        }
        self.expect(&TokenKind::RBrace)?;
        let span = start.merge(self.previous_span());
        Some(Block { stmts, span })
    }

    /// Parse a single statement.
    pub(crate) fn parse_statement(&mut self) -> Option<Stmt> {
        self.nesting += 1;
        if self.nesting > MAX_NESTING_DEPTH {
            self.error_at_current(
                ErrorCode::STRUCTURAL_LIMIT_EXCEEDED,
                format!("maximum statement nesting depth is {MAX_NESTING_DEPTH}"),
            );
            self.nesting -= 1;
            return None;
        }
        let stmt = self.parse_statement_inner();
        self.nesting -= 1;
        stmt
    }

    fn parse_statement_inner(&mut self) -> Option<Stmt> {
        match self.peek_kind() {
            TokenKind::Semicolon => {
                let span = self.advance().span;
                Some(Stmt::Empty(span))
            }
            TokenKind::LBrace => self.parse_block().map(Stmt::Block),
            TokenKind::Let | TokenKind::Const | TokenKind::Var => {
                let decl = self.parse_var_decl()?;
                self.eat_semicolon();
                Some(Stmt::Var(decl))
            }
            TokenKind::Function => self.parse_function_decl(),
            TokenKind::Async if self.look_ahead(1) == &TokenKind::Function => {
                self.parse_function_decl()
            }
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::While => self.parse_while_stmt(),
            TokenKind::Do => self.parse_do_while_stmt(),
            TokenKind::Return => self.parse_return_stmt(),
            TokenKind::Break | TokenKind::Continue => self.parse_jump_stmt(),
            _ => {
                let expr = self.parse_expression()?;
                let span = expr.span;
                self.eat_semicolon();
                Some(Stmt::Expr(ExprStmt { expr, span }))
            }
        }
    }

    /// `if (cond) stmt [else stmt]`
    fn parse_if_stmt(&mut self) -> Option<Stmt> {
        let start = self.advance().span;
        let condition = self.parse_paren_condition()?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        let span = start.merge(self.previous_span());
        Some(Stmt::If(IfStmt {
            condition,
            then_branch,
            else_branch,
            span,
        }))
    }

    /// `for (init; cond; update) stmt`
    fn parse_for_stmt(&mut self) -> Option<Stmt> {
        let start = self.advance().span;
        self.expect(&TokenKind::LParen)?;

        let init = match self.peek_kind() {
            TokenKind::Semicolon => None,
            TokenKind::Let | TokenKind::Const | TokenKind::Var => {
                Some(ForInit::Var(self.parse_var_decl()?))
            }
            _ => Some(ForInit::Expr(self.parse_expression()?)),
        };
        self.expect(&TokenKind::Semicolon)?;

        let condition = if self.check_exact(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon)?;

        let update = if self.check_exact(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::RParen)?;

        let body = Box::new(self.parse_loop_body()?);
        let span = start.merge(self.previous_span());
        Some(Stmt::For(ForStmt {
            init,
            condition,
            update,
            body,
            span,
        }))
    }

    /// `while (cond) stmt`
    fn parse_while_stmt(&mut self) -> Option<Stmt> {
        let start = self.advance().span;
        let condition = self.parse_paren_condition()?;
        let body = Box::new(self.parse_loop_body()?);
        let span = start.merge(self.previous_span());
        Some(Stmt::While(WhileStmt {
            condition,
            body,
            span,
        }))
    }

    /// `do stmt while (cond)`
    fn parse_do_while_stmt(&mut self) -> Option<Stmt> {
        let start = self.advance().span;
        let body = Box::new(self.parse_loop_body()?);
        self.expect(&TokenKind::While)?;
        let condition = self.parse_paren_condition()?;
        self.eat_semicolon();
        let span = start.merge(self.previous_span());
        Some(Stmt::DoWhile(WhileStmt {
            condition,
            body,
            span,
        }))
    }

    fn parse_loop_body(&mut self) -> Option<Stmt> {
        self.loop_depth += 1;
        let body = self.parse_statement();
        self.loop_depth -= 1;
        body
    }

    fn parse_paren_condition(&mut self) -> Option<Expr> {
        self.expect(&TokenKind::LParen)?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::RParen)?;
        Some(condition)
    }

    /// `return [expr]`
    fn parse_return_stmt(&mut self) -> Option<Stmt> {
        let start = self.advance().span;
        if !self.in_function() {
            self.error_at(
                ErrorCode::RETURN_OUTSIDE_FUNCTION,
                "'return' outside of a function",
                start,
            );
        }
        let value = match self.peek_kind() {
            TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof => None,
            _ => Some(self.parse_expression()?),
        };
        self.eat_semicolon();
        let span = start.merge(self.previous_span());
        Some(Stmt::Return(ReturnStmt { value, span }))
    }

    /// `break` / `continue`
    fn parse_jump_stmt(&mut self) -> Option<Stmt> {
        let token = self.advance();
        let is_break = token.kind == TokenKind::Break;
        if self.loop_depth == 0 {
            self.error_at(
                ErrorCode::BREAK_OUTSIDE_LOOP,
                format!("'{}' outside of a loop", token.kind),
                token.span,
            );
        }
        self.eat_semicolon();
        Some(if is_break {
            Stmt::Break(token.span)
        } else {
            Stmt::Continue(token.span)
        })
    }
}
