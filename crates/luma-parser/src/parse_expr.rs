//! Expression parsing with full operator precedence.
//!
//! Precedence (lowest → highest):
//! 13. `=`, `+=`, `-=`, `*=`, `/=`, `%=` (right associative)
//! 12. `?:`
//! 11. `||`
//! 10. `&&`
//! 9. `|`
//! 8. `^`
//! 7. `&`
//! 6. `==`, `!=`, `===`, `!==`
//! 5. `<`, `>`, `<=`, `>=`
//! 4. `<<`, `>>`
//! 3. `+`, `-`
//! 2. `*`, `/`, `%`
//! 1. unary `!` `-` `+` `~` `++` `--` `await`, postfix `++` `--`,
//!    call, `.`, `[]`

use luma_lexer::token::TokenKind;
use luma_types::ast::*;
use luma_types::ErrorCode;

use crate::parser::{Parser, MAX_EXPR_DEPTH};

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Point
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse an expression.
    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        self.expr_depth += 1;
        if self.expr_depth > MAX_EXPR_DEPTH {
            self.error_at_current(
                ErrorCode::STRUCTURAL_LIMIT_EXCEEDED,
                format!("maximum expression nesting depth is {MAX_EXPR_DEPTH}"),
            );
            self.expr_depth -= 1;
            return None;
        }
        let result = self.parse_assignment();
        self.expr_depth -= 1;
        result
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Assignment & Conditional
    // ══════════════════════════════════════════════════════════════════════════

    /// `Assign = Conditional [ AssignOp Assign ]`
    pub(crate) fn parse_assignment(&mut self) -> Option<Expr> {
        let target = self.parse_conditional()?;
        let op = match self.peek_kind() {
            TokenKind::Eq => AssignOp::Assign,
            TokenKind::PlusEq => AssignOp::Add,
            TokenKind::MinusEq => AssignOp::Sub,
            TokenKind::StarEq => AssignOp::Mul,
            TokenKind::SlashEq => AssignOp::Div,
            TokenKind::PercentEq => AssignOp::Mod,
            _ => return Some(target),
        };
        self.advance();
        if !target.is_assignable() {
            self.error_at(
                ErrorCode::INVALID_ASSIGNMENT_TARGET,
                "invalid assignment target",
                target.span,
            );
        }
        let value = self.parse_assignment()?;
        let span = target.span.merge(value.span);
        Some(Expr::new(
            ExprKind::Assign {
                target: Box::new(target),
                op,
                value: Box::new(value),
            },
            span,
        ))
    }

    /// `Conditional = Or [ "?" Assign ":" Assign ]`
    fn parse_conditional(&mut self) -> Option<Expr> {
        let condition = self.parse_or()?;
        if !self.eat(&TokenKind::Question) {
            return Some(condition);
        }
        let then_expr = self.parse_assignment()?;
        self.expect(&TokenKind::Colon)?;
        let else_expr = self.parse_assignment()?;
        let span = condition.span.merge(else_expr.span);
        Some(Expr::new(
            ExprKind::Conditional {
                condition: Box::new(condition),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            span,
        ))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Precedence Chain
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_or(&mut self) -> Option<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::PipePipe) {
            let right = self.parse_and()?;
            left = Self::logical(left, LogicalOp::Or, right);
        }
        Some(left)
    }

    fn parse_and(&mut self) -> Option<Expr> {
        let mut left = self.parse_bit_or()?;
        while self.eat(&TokenKind::AmpAmp) {
            let right = self.parse_bit_or()?;
            left = Self::logical(left, LogicalOp::And, right);
        }
        Some(left)
    }

    fn parse_bit_or(&mut self) -> Option<Expr> {
        self.parse_binary_level(Self::parse_bit_xor, |k| match k {
            TokenKind::Pipe => Some(BinOp::BitOr),
            _ => None,
        })
    }

    fn parse_bit_xor(&mut self) -> Option<Expr> {
        self.parse_binary_level(Self::parse_bit_and, |k| match k {
            TokenKind::Caret => Some(BinOp::BitXor),
            _ => None,
        })
    }

    fn parse_bit_and(&mut self) -> Option<Expr> {
        self.parse_binary_level(Self::parse_equality, |k| match k {
            TokenKind::Amp => Some(BinOp::BitAnd),
            _ => None,
        })
    }

    fn parse_equality(&mut self) -> Option<Expr> {
        self.parse_binary_level(Self::parse_relational, |k| match k {
            TokenKind::EqEq => Some(BinOp::Eq),
            TokenKind::BangEq => Some(BinOp::NotEq),
            TokenKind::EqEqEq => Some(BinOp::StrictEq),
            TokenKind::BangEqEq => Some(BinOp::StrictNotEq),
            _ => None,
        })
    }

    fn parse_relational(&mut self) -> Option<Expr> {
        self.parse_binary_level(Self::parse_shift, |k| match k {
            TokenKind::Less => Some(BinOp::Less),
            TokenKind::Greater => Some(BinOp::Greater),
            TokenKind::LessEq => Some(BinOp::LessEq),
            TokenKind::GreaterEq => Some(BinOp::GreaterEq),
            _ => None,
        })
    }

    fn parse_shift(&mut self) -> Option<Expr> {
        self.parse_binary_level(Self::parse_add, |k| match k {
            TokenKind::Shl => Some(BinOp::Shl),
            TokenKind::Shr => Some(BinOp::Shr),
            _ => None,
        })
    }

    fn parse_add(&mut self) -> Option<Expr> {
        self.parse_binary_level(Self::parse_mul, |k| match k {
            TokenKind::Plus => Some(BinOp::Add),
            TokenKind::Minus => Some(BinOp::Sub),
            _ => None,
        })
    }

    fn parse_mul(&mut self) -> Option<Expr> {
        self.parse_binary_level(Self::parse_unary, |k| match k {
            TokenKind::Star => Some(BinOp::Mul),
            TokenKind::Slash => Some(BinOp::Div),
            TokenKind::Percent => Some(BinOp::Mod),
            _ => None,
        })
    }

    /// One left-associative level: `Next { op Next }`.
    fn parse_binary_level(
        &mut self,
        next: fn(&mut Self) -> Option<Expr>,
        op_for: fn(&TokenKind) -> Option<BinOp>,
    ) -> Option<Expr> {
        let mut left = next(self)?;
        while let Some(op) = op_for(self.peek_kind()) {
            self.advance();
            let right = next(self)?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                span,
            );
        }
        Some(left)
    }

    fn logical(left: Expr, op: LogicalOp, right: Expr) -> Expr {
        let span = left.span.merge(right.span);
        Expr::new(
            ExprKind::Logical {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
            span,
        )
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Unary & Postfix
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_unary(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let op = match self.peek_kind() {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Tilde => UnaryOp::BitNot,
            TokenKind::PlusPlus | TokenKind::MinusMinus => return self.parse_prefix_update(),
            TokenKind::Await => return self.parse_await(),
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        let span = start.merge(operand.span);
        Some(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_prefix_update(&mut self) -> Option<Expr> {
        let token = self.advance();
        let op = if token.kind == TokenKind::PlusPlus {
            UpdateOp::Increment
        } else {
            UpdateOp::Decrement
        };
        let target = self.parse_unary()?;
        self.check_update_target(&target);
        let span = token.span.merge(target.span);
        Some(Expr::new(
            ExprKind::Update {
                target: Box::new(target),
                op,
                prefix: true,
            },
            span,
        ))
    }

    fn parse_await(&mut self) -> Option<Expr> {
        let start = self.advance().span;
        if !self.in_async_function() {
            self.error_with_suggestion(
                ErrorCode::AWAIT_OUTSIDE_ASYNC,
                "'await' is only valid inside async functions",
                start,
                "declare the enclosing function with 'async function'",
            );
        }
        let operand = self.parse_unary()?;
        let span = start.merge(operand.span);
        Some(Expr::new(ExprKind::Await(Box::new(operand)), span))
    }

    fn check_update_target(&mut self, target: &Expr) {
        if !target.is_assignable() {
            self.error_at(
                ErrorCode::INVALID_ASSIGNMENT_TARGET,
                "invalid increment/decrement target",
                target.span,
            );
        }
    }

    /// `Postfix = Call [ "++" | "--" ]`
    fn parse_postfix(&mut self) -> Option<Expr> {
        let expr = self.parse_call()?;
        let op = match self.peek_kind() {
            TokenKind::PlusPlus => UpdateOp::Increment,
            TokenKind::MinusMinus => UpdateOp::Decrement,
            _ => return Some(expr),
        };
        let end = self.advance().span;
        self.check_update_target(&expr);
        let span = expr.span.merge(end);
        Some(Expr::new(
            ExprKind::Update {
                target: Box::new(expr),
                op,
                prefix: false,
            },
            span,
        ))
    }

    /// `Call = Primary { "(" args ")" | "." name | "[" expr "]" }`
    fn parse_call(&mut self) -> Option<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_list(&TokenKind::RParen)?;
                    let span = expr.span.merge(self.previous_span());
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    );
                }
                TokenKind::Dot => {
                    self.advance();
                    let property = self.expect_member_name()?;
                    let span = expr.span.merge(property.span);
                    expr = Expr::new(
                        ExprKind::Member {
                            object: Box::new(expr),
                            property,
                        },
                        span,
                    );
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(&TokenKind::RBracket)?;
                    let span = expr.span.merge(self.previous_span());
                    expr = Expr::new(
                        ExprKind::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                _ => return Some(expr),
            }
        }
    }

    /// Comma-separated expressions up to and including `close`.
    /// A trailing comma is allowed.
    fn parse_list(&mut self, close: &TokenKind) -> Option<Vec<Expr>> {
        let mut items = Vec::new();
        while !self.check_exact(close) && !self.at_end() {
            self.expr_depth += 1;
            let item = if self.expr_depth > MAX_EXPR_DEPTH {
                self.error_at_current(
                    ErrorCode::STRUCTURAL_LIMIT_EXCEEDED,
                    format!("maximum expression nesting depth is {MAX_EXPR_DEPTH}"),
                );
                None
            } else {
                self.parse_assignment()
            };
            self.expr_depth -= 1;
            items.push(item?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(close)?;
        Some(items)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Primary
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_primary(&mut self) -> Option<Expr> {
        let token = self.advance();
        let span = token.span;
        let kind = match token.kind {
            TokenKind::Number(n) => ExprKind::Number(n),
            TokenKind::Str(s) => ExprKind::Str(s),
            TokenKind::True => ExprKind::Bool(true),
            TokenKind::False => ExprKind::Bool(false),
            TokenKind::Null => ExprKind::Null,
            TokenKind::Undefined => ExprKind::Undefined,
            TokenKind::Identifier(name) => ExprKind::Identifier(name),
            TokenKind::TemplateStart(head) => return self.parse_template(head, span),
            TokenKind::LParen => {
                let inner = self.parse_expression()?;
                self.expect(&TokenKind::RParen)?;
                return Some(Expr::new(inner.kind, span.merge(self.previous_span())));
            }
            TokenKind::LBracket => {
                let items = self.parse_list(&TokenKind::RBracket)?;
                return Some(Expr::new(
                    ExprKind::Array(items),
                    span.merge(self.previous_span()),
                ));
            }
            other => {
                self.error_at(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected expression, got '{other}'"),
                    span,
                );
                return None;
            }
        };
        Some(Expr::new(kind, span))
    }

    /// The rest of a template after its `TemplateStart`.
    fn parse_template(&mut self, head: String, start: luma_types::Span) -> Option<Expr> {
        let mut parts = vec![TemplatePart::Literal(head)];
        loop {
            self.expect(&TokenKind::InterpolationStart)?;
            parts.push(TemplatePart::Expr(self.parse_expression()?));
            self.expect(&TokenKind::InterpolationEnd)?;
            match self.advance().kind {
                TokenKind::TemplatePart(text) => parts.push(TemplatePart::Literal(text)),
                TokenKind::TemplateEnd(text) => {
                    parts.push(TemplatePart::Literal(text));
                    break;
                }
                other => {
                    self.error_at(
                        ErrorCode::UNEXPECTED_TOKEN,
                        format!("expected template text, got '{other}'"),
                        self.previous_span(),
                    );
                    return None;
                }
            }
        }
        parts.retain(|p| !matches!(p, TemplatePart::Literal(s) if s.is_empty()));
        let span = start.merge(self.previous_span());
        Some(Expr::new(ExprKind::Template(parts), span))
    }
}
