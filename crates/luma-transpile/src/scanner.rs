//! Character-level region scanner.
//!
//! The scanner classifies source characters as code, comment, or literal
//! text. It never builds a token list: the transpiler feeds it one position
//! at a time and it reports how many characters it consumed and what they
//! were. Brace depth is owned by the [`ContextTracker`](crate::ContextTracker);
//! the scanner only remembers at which depth each open template
//! interpolation has to resume literal text.

/// Quote character of a plain string literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quote {
    Double,
    Single,
}

impl Quote {
    fn from_char(ch: char) -> Option<Quote> {
        match ch {
            '"' => Some(Quote::Double),
            '\'' => Some(Quote::Single),
            _ => None,
        }
    }

    pub fn delimiter(self) -> char {
        match self {
            Quote::Double => '"',
            Quote::Single => '\'',
        }
    }
}

/// Lexical region a character belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanState {
    Code,
    LineComment,
    BlockComment,
    StringLiteral(Quote),
    /// Backtick template text, excluding `${ ... }` expressions.
    TemplateLiteral,
}

/// Structural event the tracker must see alongside a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEvent {
    OpenBrace,
    CloseBrace,
    /// `${` inside a template; counts as one open brace.
    InterpolationOpen,
    /// The `}` that returns to template text.
    InterpolationClose,
}

/// Result of one scanner step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Region of the consumed characters.
    pub state: ScanState,
    /// Number of characters consumed (1 or 2).
    pub len: usize,
    pub event: Option<ScanEvent>,
}

impl Step {
    fn one(state: ScanState) -> Self {
        Self {
            state,
            len: 1,
            event: None,
        }
    }

    fn two(state: ScanState) -> Self {
        Self {
            state,
            len: 2,
            event: None,
        }
    }

    fn with_event(mut self, event: ScanEvent) -> Self {
        self.event = Some(event);
        self
    }
}

/// Resumable region state machine.
#[derive(Debug, Clone)]
pub struct Scanner {
    state: ScanState,
    /// Brace depth at which each open interpolation closes, innermost last.
    template_resume: Vec<usize>,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    pub fn new() -> Self {
        Self {
            state: ScanState::Code,
            template_resume: Vec::new(),
        }
    }

    /// Current region (the region of the next character unless it is a
    /// delimiter).
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// True while scanning code inside a `${ ... }` interpolation.
    pub fn in_interpolation(&self) -> bool {
        !self.template_resume.is_empty()
    }

    /// Consume the character `current` (with one character of look-ahead).
    ///
    /// `depth` is the tracker's brace depth before this step.
    pub fn step(&mut self, current: char, next: Option<char>, depth: usize) -> Step {
        match self.state {
            ScanState::Code => self.step_code(current, next, depth),
            ScanState::LineComment => {
                if current == '\n' {
                    self.state = ScanState::Code;
                    Step::one(ScanState::Code)
                } else {
                    Step::one(ScanState::LineComment)
                }
            }
            ScanState::BlockComment => {
                if current == '*' && next == Some('/') {
                    self.state = ScanState::Code;
                    Step::two(ScanState::BlockComment)
                } else {
                    Step::one(ScanState::BlockComment)
                }
            }
            ScanState::StringLiteral(quote) => {
                let here = ScanState::StringLiteral(quote);
                if current == '\\' {
                    Self::escape(here, next)
                } else {
                    if current == quote.delimiter() {
                        self.state = ScanState::Code;
                    }
                    Step::one(here)
                }
            }
            ScanState::TemplateLiteral => match (current, next) {
                ('\\', _) => Self::escape(ScanState::TemplateLiteral, next),
                ('`', _) => {
                    self.state = ScanState::Code;
                    Step::one(ScanState::TemplateLiteral)
                }
                ('$', Some('{')) => {
                    self.template_resume.push(depth + 1);
                    self.state = ScanState::Code;
                    Step::two(ScanState::TemplateLiteral).with_event(ScanEvent::InterpolationOpen)
                }
                _ => Step::one(ScanState::TemplateLiteral),
            },
        }
    }

    fn step_code(&mut self, current: char, next: Option<char>, depth: usize) -> Step {
        match (current, next) {
            ('/', Some('/')) => {
                self.state = ScanState::LineComment;
                Step::two(ScanState::LineComment)
            }
            ('/', Some('*')) => {
                self.state = ScanState::BlockComment;
                Step::two(ScanState::BlockComment)
            }
            ('`', _) => {
                self.state = ScanState::TemplateLiteral;
                Step::one(ScanState::TemplateLiteral)
            }
            ('{', _) => Step::one(ScanState::Code).with_event(ScanEvent::OpenBrace),
            ('}', _) if self.template_resume.last() == Some(&depth) => {
                self.template_resume.pop();
                self.state = ScanState::TemplateLiteral;
                Step::one(ScanState::TemplateLiteral).with_event(ScanEvent::InterpolationClose)
            }
            ('}', _) => Step::one(ScanState::Code).with_event(ScanEvent::CloseBrace),
            _ => match Quote::from_char(current) {
                Some(quote) => {
                    self.state = ScanState::StringLiteral(quote);
                    Step::one(self.state)
                }
                None => Step::one(ScanState::Code),
            },
        }
    }

    /// A backslash swallows the following character, whatever it is.
    fn escape(state: ScanState, next: Option<char>) -> Step {
        if next.is_some() {
            Step::two(state)
        } else {
            Step::one(state)
        }
    }
}

/// Classify every character of `source`.
///
/// Runs the same machine the transpiler drives, keeping its own brace
/// depth, and returns one [`ScanState`] per `char`.
pub fn classify(source: &str) -> Vec<ScanState> {
    let chars: Vec<char> = source.chars().collect();
    let mut scanner = Scanner::new();
    let mut depth = 0usize;
    let mut states = Vec::with_capacity(chars.len());
    let mut pos = 0;
    while pos < chars.len() {
        let step = scanner.step(chars[pos], chars.get(pos + 1).copied(), depth);
        match step.event {
            Some(ScanEvent::OpenBrace | ScanEvent::InterpolationOpen) => depth += 1,
            Some(ScanEvent::CloseBrace | ScanEvent::InterpolationClose) => {
                depth = depth.saturating_sub(1)
            }
            None => {}
        }
        let end = (pos + step.len).min(chars.len());
        states.extend(std::iter::repeat(step.state).take(end - pos));
        pos = end;
    }
    states
}

#[cfg(test)]
mod tests {
    use super::*;

    fn states_of(source: &str) -> String {
        // One letter per char: c=code l=line b=block s=string t=template
        classify(source)
            .into_iter()
            .map(|s| match s {
                ScanState::Code => 'c',
                ScanState::LineComment => 'l',
                ScanState::BlockComment => 'b',
                ScanState::StringLiteral(_) => 's',
                ScanState::TemplateLiteral => 't',
            })
            .collect()
    }

    #[test]
    fn test_line_comment_ends_at_newline() {
        assert_eq!(states_of("a//x\nb"), "clllcc");
    }

    #[test]
    fn test_block_comment_closes_atomically() {
        // `/*/` must not close the comment it just opened.
        assert_eq!(states_of("/*/x*/y"), "bbbbbbc");
    }

    #[test]
    fn test_string_escape_swallows_quote() {
        assert_eq!(states_of(r#""a\"b"c"#), "ssssssc");
    }

    #[test]
    fn test_double_backslash_then_quote_closes() {
        assert_eq!(states_of(r#"'\\'x"#), "ssssc");
    }

    #[test]
    fn test_other_quote_does_not_close() {
        assert_eq!(states_of(r#""it's"x"#), "ssssssc");
    }

    #[test]
    fn test_template_interpolation_returns_to_code() {
        assert_eq!(states_of("`a${b}c`"), "ttttcttt");
    }

    #[test]
    fn test_nested_braces_inside_interpolation() {
        assert_eq!(states_of("`${ {x:1} }`z"), "tttcccccccttc");
    }

    #[test]
    fn test_template_inside_interpolation() {
        assert_eq!(states_of("`${`in`}`"), "ttttttttt");
    }

    #[test]
    fn test_comment_markers_inside_string_are_text() {
        assert_eq!(states_of("\"//\"x"), "ssssc");
    }

    #[test]
    fn test_step_reports_brace_events() {
        let mut scanner = Scanner::new();
        assert_eq!(scanner.step('{', None, 0).event, Some(ScanEvent::OpenBrace));
        assert_eq!(scanner.step('}', None, 1).event, Some(ScanEvent::CloseBrace));
    }

    #[test]
    fn test_scanner_is_resumable() {
        // Feeding one character at a time gives the same answer as classify.
        let src = "x = `${ '}' }` // }\n/* ` */ y";
        let chars: Vec<char> = src.chars().collect();
        let mut scanner = Scanner::new();
        let mut depth = 0usize;
        let mut pos = 0;
        let mut manual = Vec::new();
        while pos < chars.len() {
            let step = scanner.step(chars[pos], chars.get(pos + 1).copied(), depth);
            match step.event {
                Some(ScanEvent::OpenBrace | ScanEvent::InterpolationOpen) => depth += 1,
                Some(_) => depth -= 1,
                None => {}
            }
            for _ in 0..step.len {
                manual.push(step.state);
            }
            pos += step.len;
        }
        assert_eq!(manual, classify(src));
        assert_eq!(depth, 0);
    }
}
