//! Parser tests.
//!
//! Covers: function declarations, statements, operator precedence,
//! templates, scope errors (await/return/break placement), recovery, and
//! the 100-iteration determinism test.

use luma_lexer::Lexer;
use luma_parser::Parser;
use luma_types::ast::*;
use luma_types::{ErrorCode, SourceFile};

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

fn parse(source: &str) -> (Program, Vec<ErrorCode>) {
    let sf = SourceFile::new("test.js", source);
    let lexed = Lexer::new(&sf).lex();
    assert!(!lexed.errors.has_errors(), "lex errors: {}", lexed.errors);
    let result = Parser::new(lexed.tokens, &sf).parse();
    let codes = result.errors.errors.iter().map(|e| e.code).collect();
    (result.program, codes)
}

fn parse_ok(source: &str) -> Program {
    let (program, codes) = parse(source);
    assert!(codes.is_empty(), "unexpected errors {codes:?} for {source:?}");
    program
}

/// Parse `source` as the single expression statement of a program.
fn expr(source: &str) -> Expr {
    let program = parse_ok(source);
    match program.body.into_iter().next() {
        Some(Stmt::Expr(stmt)) => stmt.expr,
        other => panic!("expected expression statement, got {other:?}"),
    }
}

fn errors(source: &str) -> Vec<ErrorCode> {
    parse(source).1
}

// ─────────────────────────────────────────────────────────────────────
// Declarations
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_async_entry_points() {
    let program = parse_ok("async function setup() {}\nasync function loop() { await delay(5); }");
    let setup = program.function("setup").unwrap();
    assert!(setup.is_async);
    assert!(setup.params.is_empty());
    let lp = program.function("loop").unwrap();
    assert_eq!(lp.body.stmts.len(), 1);
}

#[test]
fn test_function_params() {
    let program = parse_ok("function blink(pin, ms) { return pin + ms; }");
    let f = program.function("blink").unwrap();
    let names: Vec<_> = f.params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["pin", "ms"]);
    assert!(!f.is_async);
}

#[test]
fn test_multiple_declarators() {
    let program = parse_ok("let a = 1, b, c = a;");
    match &program.body[0] {
        Stmt::Var(decl) => {
            assert_eq!(decl.kind, DeclKind::Let);
            assert_eq!(decl.declarators.len(), 3);
            assert!(decl.declarators[1].init.is_none());
        }
        other => panic!("expected var decl, got {other:?}"),
    }
}

#[test]
fn test_const_requires_initializer() {
    assert_eq!(errors("const N;"), vec![ErrorCode::MISSING_INITIALIZER]);
}

#[test]
fn test_semicolons_are_optional() {
    let program = parse_ok("let a = 1\nlet b = 2\nprint(a + b)");
    assert_eq!(program.body.len(), 3);
}

// ─────────────────────────────────────────────────────────────────────
// Statements
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_for_loop_parts() {
    let program = parse_ok("for (let i = 0; i < 3; i++) { toggle(i); }");
    match &program.body[0] {
        Stmt::For(f) => {
            assert!(matches!(f.init, Some(ForInit::Var(_))));
            assert!(f.condition.is_some());
            assert!(matches!(
                f.update.as_ref().map(|u| &u.kind),
                Some(ExprKind::Update { prefix: false, .. })
            ));
        }
        other => panic!("expected for, got {other:?}"),
    }
}

#[test]
fn test_empty_for_header() {
    parse_ok("for (;;) { break; }");
}

#[test]
fn test_else_if_chain() {
    let program = parse_ok("if (a) x = 1; else if (b) x = 2; else x = 3;");
    match &program.body[0] {
        Stmt::If(stmt) => assert!(matches!(
            stmt.else_branch.as_deref(),
            Some(Stmt::If(_))
        )),
        other => panic!("expected if, got {other:?}"),
    }
}

#[test]
fn test_do_while() {
    let program = parse_ok("do { n--; } while (n > 0);");
    assert!(matches!(program.body[0], Stmt::DoWhile(_)));
}

#[test]
fn test_nested_function_declaration() {
    let program = parse_ok("async function loop() { function inner() { return 1; } inner(); }");
    let lp = program.function("loop").unwrap();
    assert!(matches!(lp.body.stmts[0], Stmt::Function(_)));
}

// ─────────────────────────────────────────────────────────────────────
// Expressions
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_mul_binds_tighter_than_add() {
    match expr("1 + 2 * 3").kind {
        ExprKind::Binary { op, right, .. } => {
            assert_eq!(op, BinOp::Add);
            assert!(matches!(right.kind, ExprKind::Binary { op: BinOp::Mul, .. }));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_assignment_is_right_associative() {
    match expr("a = b = 3").kind {
        ExprKind::Assign { value, .. } => {
            assert!(matches!(value.kind, ExprKind::Assign { .. }));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_logical_below_equality() {
    match expr("a == 1 || b != 2 && c").kind {
        ExprKind::Logical { op, right, .. } => {
            assert_eq!(op, LogicalOp::Or);
            assert!(matches!(
                right.kind,
                ExprKind::Logical {
                    op: LogicalOp::And,
                    ..
                }
            ));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_conditional_expression() {
    assert!(matches!(
        expr("on ? HIGH : LOW").kind,
        ExprKind::Conditional { .. }
    ));
}

#[test]
fn test_member_index_call_chain() {
    match expr("pins[2].length").kind {
        ExprKind::Member { object, property } => {
            assert_eq!(property.name, "length");
            assert!(matches!(object.kind, ExprKind::Index { .. }));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_template_parts() {
    match expr("`pin ${p} is ${v}`").kind {
        ExprKind::Template(parts) => {
            assert_eq!(parts.len(), 4);
            assert_eq!(parts[0], TemplatePart::Literal("pin ".into()));
            assert!(matches!(parts[3], TemplatePart::Expr(_)));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_array_literal_trailing_comma() {
    match expr("[1, 2, 3,]").kind {
        ExprKind::Array(items) => assert_eq!(items.len(), 3),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_invalid_assignment_target() {
    assert_eq!(errors("1 = 2;"), vec![ErrorCode::INVALID_ASSIGNMENT_TARGET]);
    assert_eq!(errors("f()++;"), vec![ErrorCode::INVALID_ASSIGNMENT_TARGET]);
}

// ─────────────────────────────────────────────────────────────────────
// Scope checks
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_await_outside_async() {
    assert_eq!(
        errors("function f() { await delay(1); }"),
        vec![ErrorCode::AWAIT_OUTSIDE_ASYNC]
    );
    assert_eq!(errors("await delay(1);"), vec![ErrorCode::AWAIT_OUTSIDE_ASYNC]);
}

#[test]
fn test_await_in_nested_sync_function() {
    let src = "async function loop() { function inner() { await delay(1); } }";
    assert_eq!(errors(src), vec![ErrorCode::AWAIT_OUTSIDE_ASYNC]);
}

#[test]
fn test_return_outside_function() {
    assert_eq!(errors("return 1;"), vec![ErrorCode::RETURN_OUTSIDE_FUNCTION]);
}

#[test]
fn test_break_outside_loop() {
    assert_eq!(errors("break;"), vec![ErrorCode::BREAK_OUTSIDE_LOOP]);
    // A function body does not inherit the enclosing loop.
    assert_eq!(
        errors("while (true) { function f() { continue; } break; }"),
        vec![ErrorCode::BREAK_OUTSIDE_LOOP]
    );
}

// ─────────────────────────────────────────────────────────────────────
// Recovery & limits
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_recovers_after_bad_statement() {
    let (program, codes) = parse("let = 5;\nlet ok = 1;");
    assert_eq!(codes, vec![ErrorCode::UNEXPECTED_TOKEN]);
    assert!(program
        .body
        .iter()
        .any(|s| matches!(s, Stmt::Var(d) if d.declarators[0].name.name == "ok")));
}

#[test]
fn test_unmatched_close_brace() {
    assert_eq!(errors("}"), vec![ErrorCode::UNEXPECTED_TOKEN]);
}

#[test]
fn test_expression_depth_limit() {
    let src = format!("{}1{}", "(".repeat(80), ")".repeat(80));
    assert!(errors(&src).contains(&ErrorCode::STRUCTURAL_LIMIT_EXCEEDED));
}

#[test]
fn test_parser_determinism_100_iterations() {
    let src = "async function loop() { for (let i = 0; i < 4; i++) { toggle(i); await delay(10); } }";
    let first = parse_ok(src);
    for i in 0..100 {
        assert_eq!(parse_ok(src), first, "iteration {i} diverged");
    }
}
