//! End-to-end transpiler tests.
//!
//! Covers: entry-point rewriting, nested function contexts, comment and
//! literal immunity, brace characters hidden in literals, structural
//! validation, and the 100-iteration determinism test.

use luma_transpile::{classify, transpile, validate_sketch, ScanState};

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

/// Assert `line` appears verbatim in the output.
fn assert_has_line(output: &str, line: &str) {
    assert!(
        output.lines().any(|l| l.trim() == line),
        "missing line {line:?} in:\n{output}"
    );
}

const BLINK: &str = r#"
const int LED = 13;

void setup() {
  pinMode(LED, OUTPUT);
}

void loop() {
  digitalWrite(LED, HIGH);
  delay(500);
  digitalWrite(LED, LOW);
  delay(500);
}
"#;

// ─────────────────────────────────────────────────────────────────────
// Entry points and declarations
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_blink_sketch() {
    let out = transpile(BLINK);
    assert_has_line(&out, "const LED = 13;");
    assert_has_line(&out, "async function setup() {");
    assert_has_line(&out, "async function loop() {");
    assert_eq!(count(&out, "await delay(500);"), 2);
}

#[test]
fn test_for_loop_counter_becomes_let() {
    let out = transpile("void loop() {\n  for (int i = 0; i < 12; i++) { toggle(i); delay(50); }\n}");
    assert_has_line(&out, "for (let i = 0; i < 12; i++) { toggle(i); await delay(50); }");
}

#[test]
fn test_nested_function_is_not_suspendable() {
    let src = r#"
void setup() {}
void loop() {
  function inner() {
    delay(5);
  }
  delay(10);
  inner();
}
"#;
    let out = transpile(src);
    assert_has_line(&out, "delay(5);");
    assert_has_line(&out, "await delay(10);");
    assert_eq!(count(&out, "await"), 1);
}

#[test]
fn test_typed_helper_is_not_suspendable() {
    let src = "int helper(int x) {\n  delay(1);\n  return x;\n}\nvoid loop() {\n  delay(2);\n}";
    let out = transpile(src);
    assert_has_line(&out, "function helper(x) {");
    assert_has_line(&out, "delay(1);");
    assert_has_line(&out, "await delay(2);");
}

#[test]
fn test_context_restored_after_nested_function() {
    let src = "void loop() {\n  if (true) {\n    function f() { delay(1); }\n  }\n  delay(2);\n}";
    let out = transpile(src);
    assert!(out.contains("function f() { delay(1); }"));
    assert_has_line(&out, "await delay(2);");
}

#[test]
fn test_explicit_async_helper_is_suspendable() {
    let src = "async function fade() {\n  delay(3);\n}";
    assert_has_line(&transpile(src), "await delay(3);");
}

#[test]
fn test_delay_declaration_is_not_rewritten() {
    let src = "function delay(ms) { return ms; }\nvoid loop() { let d = delay; }";
    let out = transpile(src);
    assert!(out.starts_with("function delay(ms)"));
    assert!(!out.contains("await"));
}

#[test]
fn test_setup_inside_block_still_rewritten() {
    let out = transpile("{\n  void setup() {}\n}");
    assert_has_line(&out, "async function setup() {}");
}

#[test]
fn test_void_parameter_list_is_emptied() {
    let src = "void setup(void) {}\nint level(void) { return 3; }\nvoid loop(void) {\n  delay(1);\n}";
    let out = transpile(src);
    assert_has_line(&out, "async function setup() {}");
    assert_has_line(&out, "function level() { return 3; }");
    assert_has_line(&out, "async function loop() {");
    assert_has_line(&out, "await delay(1);");
}

#[test]
fn test_parameter_types_dropped_from_helper() {
    let out = transpile("void blink(int pin, long ms) {}");
    assert_has_line(&out, "function blink(pin, ms) {}");
}

// ─────────────────────────────────────────────────────────────────────
// Comment and literal immunity
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_delay_in_comments_and_literals_untouched() {
    let src = r#"void loop() {
  // delay(1);
  /* delay(2);
     void setup() {} */
  print("delay(3)");
  print('delay(4)');
  print(`delay(5) ${ delay(6) } \` delay(7)`);
  delay(8);
}"#;
    let out = transpile(src);
    assert_has_line(&out, "// delay(1);");
    assert_has_line(&out, "/* delay(2);");
    assert_has_line(&out, "void setup() {} */");
    assert_has_line(&out, "print(\"delay(3)\");");
    assert_has_line(&out, "print('delay(4)');");
    assert_has_line(&out, "print(`delay(5) ${ delay(6) } \\` delay(7)`);");
    assert_has_line(&out, "await delay(8);");
    assert_eq!(count(&out, "await"), 1);
}

#[test]
fn test_types_in_literals_untouched() {
    let src = "void loop() {\n  print(\"int x = 1\");\n  // float y = 2;\n}";
    let out = transpile(src);
    assert!(out.contains("\"int x = 1\""));
    assert!(out.contains("// float y = 2;"));
}

#[test]
fn test_braces_in_literals_do_not_move_depth() {
    let src = r#"void loop() {
  print("}}}");
  print('{');
  // }
  print(`}${ "}" }`);
  delay(1);
}
void setup() {
  delay(2);
}"#;
    let out = transpile(src);
    assert_has_line(&out, "await delay(1);");
    assert_has_line(&out, "await delay(2);");
}

#[test]
fn test_escaped_quote_keeps_string_open() {
    let src = "void loop() {\n  print(\"a\\\" delay(1) \");\n  delay(2);\n}";
    let out = transpile(src);
    assert!(out.contains("\"a\\\" delay(1) \""));
    assert_eq!(count(&out, "await"), 1);
}

#[test]
fn test_output_preserves_non_ascii() {
    let src = "void loop() {\n  print(\"héllo ✓\"); // ünïcode\n  delay(1);\n}";
    let out = transpile(src);
    assert!(out.contains("\"héllo ✓\""));
    assert!(out.contains("// ünïcode"));
}

#[test]
fn test_classify_matches_char_count() {
    let src = "let s = `a${b}` // c\n";
    let states = classify(src);
    assert_eq!(states.len(), src.chars().count());
    assert_eq!(states[0], ScanState::Code);
    assert_eq!(*states.last().unwrap_or(&ScanState::Code), ScanState::Code);
}

// ─────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_validate_blink() {
    assert!(validate_sketch(BLINK).is_ok());
}

#[test]
fn test_validate_rejects_commented_loop() {
    let src = "void setup() {}\n// void loop() {}";
    assert!(validate_sketch(src).is_err());
}

// ─────────────────────────────────────────────────────────────────────
// Determinism
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_transpile_determinism_100_iterations() {
    let first = transpile(BLINK);
    for i in 0..100 {
        assert_eq!(transpile(BLINK), first, "iteration {i} diverged");
    }
}
