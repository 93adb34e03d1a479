//! Structural pre-check run before transpiling.

use crate::transpiler::is_type_word;
use crate::{classify, ScanState, ENTRY_POINTS};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SketchError {
    #[error("Sketch must contain both void setup() and void loop().")]
    MissingEntryPoints { missing: Vec<&'static str> },
}

/// Check that every entry point is declared in code text.
///
/// Declarations inside comments or literals do not count. A declaration is
/// a return type (`void setup(`) or the `function` keyword followed by an
/// entry-point name and `(`.
pub fn validate_sketch(source: &str) -> Result<(), SketchError> {
    let code: String = source
        .chars()
        .zip(classify(source))
        .map(|(ch, state)| if state == ScanState::Code { ch } else { ' ' })
        .collect();
    let tokens = tokens(&code);

    let missing: Vec<&'static str> = ENTRY_POINTS
        .iter()
        .copied()
        .filter(|entry| {
            !tokens.windows(3).any(|w| {
                (w[0] == "function" || is_type_word(w[0]))
                    && w[1] == *entry
                    && w[2] == "("
            })
        })
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(SketchError::MissingEntryPoints { missing })
    }
}

fn tokens(code: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    for (i, ch) in code.char_indices() {
        let word = ch.is_alphanumeric() || ch == '_';
        match (start, word) {
            (None, true) => start = Some(i),
            (Some(s), false) => {
                out.push(&code[s..i]);
                start = None;
            }
            _ => {}
        }
        if !word && !ch.is_whitespace() {
            out.push(&code[i..i + ch.len_utf8()]);
        }
    }
    if let Some(s) = start {
        out.push(&code[s..]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_both_entry_points() {
        assert_eq!(validate_sketch("void setup() {}\nvoid loop() {}"), Ok(()));
    }

    #[test]
    fn test_accepts_function_keyword() {
        assert!(validate_sketch("async function setup(){}\nfunction loop (){}").is_ok());
    }

    #[test]
    fn test_reports_missing_loop() {
        let err = validate_sketch("void setup() {}").unwrap_err();
        assert_eq!(
            err,
            SketchError::MissingEntryPoints {
                missing: vec!["loop"]
            }
        );
        assert_eq!(
            err.to_string(),
            "Sketch must contain both void setup() and void loop()."
        );
    }

    #[test]
    fn test_commented_entry_points_do_not_count() {
        let src = "// void setup() {}\n/* void loop() {} */\nlet s = 'void loop() {}';";
        let err = validate_sketch(src).unwrap_err();
        assert_eq!(
            err,
            SketchError::MissingEntryPoints {
                missing: vec!["setup", "loop"]
            }
        );
    }

    #[test]
    fn test_call_is_not_a_declaration() {
        // `setup()` on its own line is a call, not a declaration.
        assert!(validate_sketch("void loop() {}\n;setup();").is_err());
    }

    #[test]
    fn test_return_of_call_is_not_a_declaration() {
        let err = validate_sketch("void setup(){}\nfunction go(){ return loop(); }").unwrap_err();
        assert_eq!(
            err,
            SketchError::MissingEntryPoints {
                missing: vec!["loop"]
            }
        );
    }

    #[test]
    fn test_accepts_qualified_return_type() {
        assert!(validate_sketch("unsigned long setup() {}\nint loop(void) {}").is_ok());
    }
}
