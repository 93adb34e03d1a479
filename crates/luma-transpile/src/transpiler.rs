//! The sketch-to-host rewrite pass.
//!
//! Rewrites, all applied to code text only:
//!
//! - `void setup(` / `void loop(` (any return type) become
//!   `async function setup(` / `async function loop(`.
//! - Other typed declarations `int blink(int pin)` become
//!   `function blink(pin)`; their bodies are non-suspendable.
//! - Typed locals `unsigned long t = 0` become `let t = 0`, and
//!   `const int N = 3` becomes `const N = 3`.
//! - `delay(` becomes `await delay(` inside suspendable bodies.
//!
//! Text inside comments, string literals, template text and template
//! interpolations is copied unchanged.

use crate::{ContextTracker, ScanState, Scanner};

/// Type keywords that introduce a local declaration.
pub const PRIMITIVE_TYPES: &[&str] = &[
    "int", "long", "short", "byte", "char", "float", "double", "bool", "boolean", "String",
];

/// Entry points the scheduler drives; always made suspendable.
pub const ENTRY_POINTS: &[&str] = &["setup", "loop"];

const TYPE_QUALIFIERS: &[&str] = &["unsigned", "signed"];
const SUSPENDING_CALL: &str = "delay";

/// Rewrite sketch source into host script. Pure and deterministic.
pub fn transpile(source: &str) -> String {
    Transpiler::new(source).run()
}

fn is_qualifier(word: &str) -> bool {
    TYPE_QUALIFIERS.contains(&word)
}

pub(crate) fn is_type_word(word: &str) -> bool {
    word == "void" || PRIMITIVE_TYPES.contains(&word) || is_qualifier(word)
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

/// Last significant code token emitted.
#[derive(Debug, Clone, PartialEq)]
enum LastToken {
    None,
    Punct(char),
    Word(String),
    Literal,
}

impl LastToken {
    fn is_word(&self, word: &str) -> bool {
        matches!(self, LastToken::Word(w) if w == word)
    }
}

struct Transpiler {
    chars: Vec<char>,
    pos: usize,
    out: String,
    scanner: Scanner,
    tracker: ContextTracker,
    last: LastToken,
    /// Paren depth inside a declaration's parameter list.
    params: Option<usize>,
}

impl Transpiler {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            out: String::with_capacity(source.len() + source.len() / 8),
            scanner: Scanner::new(),
            tracker: ContextTracker::new(),
            last: LastToken::None,
            params: None,
        }
    }

    fn run(mut self) -> String {
        while self.pos < self.chars.len() {
            if self.scanner.state() == ScanState::Code {
                let ch = self.chars[self.pos];
                if is_ident_start(ch) {
                    self.word();
                    continue;
                }
                if ch.is_ascii_digit() {
                    self.number();
                    continue;
                }
            }
            self.step();
        }
        self.out
    }

    // ── Character stepping ──────────────────────────────────────────────

    fn step(&mut self) {
        let current = self.chars[self.pos];
        let next = self.chars.get(self.pos + 1).copied();
        let was_code = self.scanner.state() == ScanState::Code;
        let step = self.scanner.step(current, next, self.tracker.depth());
        let end = (self.pos + step.len).min(self.chars.len());
        self.out.extend(&self.chars[self.pos..end]);
        self.pos = end;

        if let Some(event) = step.event {
            self.tracker.observe(event);
        }
        if !was_code {
            return;
        }
        match step.state {
            ScanState::Code => self.code_char(current),
            ScanState::StringLiteral(_) | ScanState::TemplateLiteral => {
                self.last = LastToken::Literal
            }
            ScanState::LineComment | ScanState::BlockComment => {}
        }
    }

    fn code_char(&mut self, ch: char) {
        if ch.is_whitespace() {
            return;
        }
        match ch {
            '(' => {
                if let Some(depth) = self.params.as_mut() {
                    *depth += 1;
                }
            }
            ')' => {
                self.params = match self.params {
                    Some(depth) if depth > 1 => Some(depth - 1),
                    _ => None,
                };
            }
            ';' => {
                self.tracker.cancel_pending();
                self.params = None;
            }
            _ => {}
        }
        self.last = LastToken::Punct(ch);
    }

    fn number(&mut self) {
        let start = self.pos;
        while self.pos < self.chars.len() {
            let ch = self.chars[self.pos];
            let fraction = ch == '.'
                && self
                    .chars
                    .get(self.pos + 1)
                    .is_some_and(|next| next.is_ascii_digit());
            if is_ident_char(ch) || fraction {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.out.extend(&self.chars[start..self.pos]);
        self.last = LastToken::Literal;
    }

    // ── Look-ahead helpers ──────────────────────────────────────────────

    fn skip_ws(&self, mut at: usize) -> usize {
        while self.chars.get(at).is_some_and(|ch| ch.is_whitespace()) {
            at += 1;
        }
        at
    }

    /// Identifier starting exactly at `at`, with its end offset.
    fn ident_at(&self, at: usize) -> Option<(String, usize)> {
        if !self.chars.get(at).is_some_and(|&ch| is_ident_start(ch)) {
            return None;
        }
        let mut end = at;
        while self.chars.get(end).is_some_and(|&ch| is_ident_char(ch)) {
            end += 1;
        }
        Some((self.chars[at..end].iter().collect(), end))
    }

    fn char_at(&self, at: usize) -> Option<char> {
        self.chars.get(at).copied()
    }

    fn emit_word(&mut self, word: String) {
        self.out.push_str(&word);
        self.last = LastToken::Word(word);
    }

    // ── Words ───────────────────────────────────────────────────────────

    fn word(&mut self) {
        let Some((word, end)) = self.ident_at(self.pos) else {
            return self.step();
        };
        self.pos = end;

        if self.scanner.in_interpolation() || self.last == LastToken::Punct('.') {
            return self.emit_word(word);
        }
        match word.as_str() {
            "function" => self.function_keyword(word),
            SUSPENDING_CALL => self.suspending_call(word),
            w if is_type_word(w) => self.typed(word),
            _ => self.emit_word(word),
        }
    }

    /// `function name(` / `async function name(` / `function (`.
    fn function_keyword(&mut self, word: String) {
        let is_async = self.last.is_word("async");
        let name = self.ident_at(self.skip_ws(self.pos)).map(|(name, _)| name);
        let entry = name
            .as_deref()
            .is_some_and(|name| ENTRY_POINTS.contains(&name));

        if entry && !is_async {
            self.out.push_str("async ");
        }
        self.tracker.declare(is_async || entry);
        self.params = Some(0);
        self.emit_word(word);
    }

    /// `delay(` → `await delay(` when the enclosing body can suspend.
    fn suspending_call(&mut self, word: String) {
        let call = self.char_at(self.skip_ws(self.pos)) == Some('(');
        let blocked = match &self.last {
            LastToken::Word(prev) => {
                prev == "await" || prev == "function" || prev == "new" || is_type_word(prev)
            }
            _ => false,
        };
        if call && !blocked && self.tracker.is_suspendable() {
            self.out.push_str("await ");
        }
        self.emit_word(word);
    }

    /// A type keyword: a parameter type, a function return type, or a
    /// local declaration.
    fn typed(&mut self, word: String) {
        let type_start = self.pos - word.chars().count();

        // Types in a parameter list are dropped along with their spacing.
        if self.params.is_some() {
            let next = self.skip_ws(self.pos);
            if self.ident_at(next).is_some() {
                self.pos = next;
                return;
            }
            // `loop(void)` takes no parameters.
            if word == "void" && self.char_at(next) == Some(')') {
                self.pos = next;
                return;
            }
            return self.emit_word(word);
        }

        // Absorb `unsigned long`, `signed char`, ...
        let mut type_end = self.pos;
        loop {
            let at = self.skip_ws(type_end);
            match self.ident_at(at) {
                Some((more, end)) if is_type_word(&more) && more != "void" => type_end = end,
                _ => break,
            }
        }

        let name_start = self.skip_ws(type_end);
        let Some((name, name_end)) = self.ident_at(name_start) else {
            // `String(x)`, `(int)x`, ...
            self.pos = type_end;
            let text: String = self.chars[type_start..type_end].iter().collect();
            return self.emit_word(text);
        };
        if is_type_word(&name) {
            self.pos = type_end;
            return self.emit_word(word);
        }

        if self.char_at(self.skip_ws(name_end)) == Some('(') {
            let entry = ENTRY_POINTS.contains(&name.as_str());
            self.out
                .push_str(if entry { "async function " } else { "function " });
            self.tracker.declare(entry);
            self.params = Some(0);
            self.pos = name_end;
            return self.emit_word(name);
        }

        if word == "void" {
            self.pos = type_end;
            return self.emit_word(word);
        }
        if self.last.is_word("const") {
            // `const int N` → `const N`
            self.pos = name_start;
            return;
        }
        self.pos = name_start;
        self.out.push_str("let ");
        self.last = LastToken::Word("let".to_string());
    }
}
