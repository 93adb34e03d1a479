//! Compile pipeline tests: transpile → compile → cache.
//!
//! Covers: entry-point validation, diagnostics JSON, digests, cache
//! identity and compile-once behaviour, and the 100-iteration determinism
//! test.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use luma_compiler::{check, compile, source_digest, ProgramCache};
use luma_transpile::transpile;
use luma_types::ErrorCode;

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

const BLINK: &str = r#"
void setup() {
  pinMode(0, OUTPUT);
}
void loop() {
  toggle(0);
  delay(100);
}
"#;

fn error_codes(host: &str) -> Vec<ErrorCode> {
    match compile(host, "sketch.js") {
        Ok(_) => Vec::new(),
        Err(errors) => errors.errors.iter().map(|e| e.code).collect(),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Compile
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_transpiled_sketch_compiles() {
    let program = compile(&transpile(BLINK), "sketch.js").unwrap();
    assert_eq!(program.setup().name.name, "setup");
    assert_eq!(program.loop_fn().name.name, "loop");
    assert!(program.setup().is_async);
    assert!(program.warnings().is_empty());
}

#[test]
fn test_missing_loop() {
    assert_eq!(
        error_codes("async function setup() {}"),
        vec![ErrorCode::MISSING_ENTRY_POINT]
    );
}

#[test]
fn test_missing_both() {
    assert_eq!(
        error_codes("let x = 1;"),
        vec![ErrorCode::MISSING_ENTRY_POINT, ErrorCode::MISSING_ENTRY_POINT]
    );
}

#[test]
fn test_entry_point_must_be_async() {
    assert_eq!(
        error_codes("function setup() {}\nasync function loop() {}"),
        vec![ErrorCode::ENTRY_POINT_NOT_ASYNC]
    );
}

#[test]
fn test_entry_point_without_params() {
    assert_eq!(
        error_codes("async function setup(a) {}\nasync function loop() {}"),
        vec![ErrorCode::ENTRY_POINT_HAS_PARAMS]
    );
}

#[test]
fn test_syntax_errors_stop_before_checker() {
    assert_eq!(error_codes("let = ;"), vec![ErrorCode::UNEXPECTED_TOKEN]);
}

#[test]
fn test_duplicate_function_warns() {
    let src = "function f() {}\nfunction f() {}\nasync function setup() {}\nasync function loop() {}";
    let program = compile(src, "sketch.js").unwrap();
    assert_eq!(program.warnings().len(), 1);
    assert_eq!(program.warnings()[0].code, ErrorCode::DUPLICATE_FUNCTION);
}

#[test]
fn test_check_reports_json() {
    let diagnostics = check("async function setup() {}", "sketch.js");
    let json = serde_json::to_value(&diagnostics).unwrap();
    assert_eq!(json["total_errors"], 1);
    assert_eq!(json["errors"][0]["code"], 600);
    assert_eq!(json["errors"][0]["category"], "structure");
    assert_eq!(json["errors"][0]["file"], "sketch.js");
}

#[test]
fn test_digest_is_sha256_hex() {
    assert_eq!(
        source_digest(""),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
    let program = compile(&transpile(BLINK), "sketch.js").unwrap();
    assert_eq!(program.digest(), source_digest(&transpile(BLINK)));
}

// ─────────────────────────────────────────────────────────────────────
// Cache
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_cache_same_instance_compile_once() {
    let cache = ProgramCache::new();
    let calls = AtomicUsize::new(0);
    let host = transpile(BLINK);
    let counted = |src: &str| {
        calls.fetch_add(1, Ordering::SeqCst);
        compile(src, "sketch.js")
    };
    let first = cache.get_or_compile(&host, counted).unwrap();
    let second = cache.get_or_compile(&host, counted).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_cache_does_not_store_compile_errors() {
    let cache = ProgramCache::new();
    let result = cache.get_or_compile("let x = 1;", |src| compile(src, "sketch.js"));
    assert!(result.is_err());
    assert!(cache.is_empty());
}

#[test]
fn test_concurrent_lookups_compile_once() {
    let cache = Arc::new(ProgramCache::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let host = Arc::new(transpile(BLINK));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            let host = Arc::clone(&host);
            std::thread::spawn(move || {
                cache
                    .get_or_compile(&host, |src| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        compile(src, "sketch.js")
                    })
                    .map(|p| p.digest().to_string())
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap().is_ok());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.stats().hits, 7);
}

#[test]
fn test_global_cache_is_shared() {
    let a = ProgramCache::global() as *const _;
    let b = ProgramCache::global() as *const _;
    assert_eq!(a, b);
}

#[test]
fn test_compile_determinism_100_iterations() {
    let host = transpile(BLINK);
    let first = compile(&host, "sketch.js").unwrap();
    for i in 0..100 {
        let again = compile(&host, "sketch.js").unwrap();
        assert_eq!(again.program(), first.program(), "iteration {i} diverged");
        assert_eq!(again.digest(), first.digest());
    }
}
