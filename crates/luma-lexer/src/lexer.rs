//! Core host script lexer: converts source text to a token stream.
//!
//! Features:
//! - `//` and `/* */` comments stripped
//! - Single- and double-quoted strings with the usual escapes
//! - Backtick templates with `${expr}` via a mode stack
//! - Decimal, fractional, exponent, hex and binary number literals
//! - Error recovery: collects up to 20 errors instead of stopping at the first

use luma_types::{CompileErrors, ErrorCode, LumaError, SourceFile, Span};

use crate::token::{Token, TokenKind};

/// Lexer mode: top-level code, template text, or a `${...}` expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    /// Inside a backtick template, scanning text until `` ` `` or `${`.
    Template,
    /// Inside `${...}`. `brace_depth` counts nested `{` so the closing `}`
    /// of the interpolation can be told apart.
    Interpolation { brace_depth: u32 },
}

/// Start position of a token.
#[derive(Debug, Clone, Copy)]
struct Mark {
    offset: usize,
    line: u32,
    col: u32,
}

/// The host script lexer.
pub struct Lexer<'src> {
    chars: Vec<char>,
    source_file: &'src SourceFile,
    /// Current char offset into `chars`.
    pos: usize,
    line: u32,
    col: u32,
    errors: CompileErrors,
    mode_stack: Vec<Mode>,
    /// Tokens to emit before the next scan (used for interpolation).
    pending: Vec<Token>,
}

/// Result of lexing: tokens + any errors collected.
pub struct LexResult {
    /// The token stream (always ends with [`TokenKind::Eof`]).
    pub tokens: Vec<Token>,
    pub errors: CompileErrors,
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

impl<'src> Lexer<'src> {
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            chars: source_file.source.chars().collect(),
            source_file,
            pos: 0,
            line: 1,
            col: 1,
            errors: CompileErrors::empty(),
            mode_stack: vec![Mode::Normal],
            pending: Vec::new(),
        }
    }

    /// Lex the entire source file into a token stream.
    pub fn lex(mut self) -> LexResult {
        let mut tokens = Vec::new();

        loop {
            if self.errors.is_full() {
                break;
            }

            if let Some(pending) = self.pending.pop() {
                tokens.push(pending);
                continue;
            }

            let token = match self.current_mode() {
                Mode::Template => self.scan_template_continuation(),
                Mode::Normal | Mode::Interpolation { .. } => self.scan_normal(),
            };

            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            tokens.push(Token::new(TokenKind::Eof, self.current_span()));
        }

        LexResult {
            tokens,
            errors: self.errors,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Mode stack helpers
    // ─────────────────────────────────────────────────────────────

    fn current_mode(&self) -> Mode {
        *self.mode_stack.last().unwrap_or(&Mode::Normal)
    }

    fn push_mode(&mut self, mode: Mode) {
        self.mode_stack.push(mode);
    }

    fn pop_mode(&mut self) {
        if self.mode_stack.len() > 1 {
            self.mode_stack.pop();
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    /// Consume the next char if it is `expected`.
    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn mark(&self) -> Mark {
        Mark {
            offset: self.pos,
            line: self.line,
            col: self.col,
        }
    }

    fn current_span(&self) -> Span {
        Span::point(self.pos, self.line, self.col)
    }

    fn span_from(&self, mark: Mark) -> Span {
        Span::new(mark.offset, self.pos, mark.line, mark.col)
    }

    fn token(&self, kind: TokenKind, mark: Mark) -> Token {
        Token::new(kind, self.span_from(mark))
    }

    fn emit_error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let err = LumaError::at(self.source_file, code, message, span);
        self.errors.push_error(err);
    }

    fn emit_error_with_suggestion(
        &mut self,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        suggestion: impl Into<String>,
    ) {
        let err = LumaError::at(self.source_file, code, message, span).with_suggestion(suggestion);
        self.errors.push_error(err);
    }

    // ─────────────────────────────────────────────────────────────
    // Whitespace & comments
    // ─────────────────────────────────────────────────────────────

    /// Skip whitespace and comments. Statements end at `;` or are
    /// separated by newlines the parser never sees.
    fn skip_trivia(&mut self) {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.advance();
            }
            match (self.peek(), self.peek_at(1)) {
                (Some('/'), Some('/')) => {
                    while self.peek().is_some_and(|ch| ch != '\n') {
                        self.advance();
                    }
                }
                (Some('/'), Some('*')) => self.skip_block_comment(),
                _ => return,
            }
        }
    }

    fn skip_block_comment(&mut self) {
        let mark = self.mark();
        self.advance();
        self.advance();
        loop {
            match self.peek() {
                None => {
                    let span = self.span_from(mark);
                    self.emit_error_with_suggestion(
                        ErrorCode::UNTERMINATED_COMMENT,
                        "Unterminated block comment",
                        span,
                        "Close the comment with */",
                    );
                    return;
                }
                Some('*') if self.peek_at(1) == Some('/') => {
                    self.advance();
                    self.advance();
                    return;
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Normal-mode scanning
    // ─────────────────────────────────────────────────────────────

    fn scan_normal(&mut self) -> Token {
        self.skip_trivia();

        if self.errors.is_full() {
            return Token::new(TokenKind::Eof, self.current_span());
        }

        if self.at_end() {
            if self
                .mode_stack
                .iter()
                .any(|m| matches!(m, Mode::Template | Mode::Interpolation { .. }))
            {
                self.emit_error(
                    ErrorCode::UNTERMINATED_STRING,
                    "Unterminated template literal",
                    self.current_span(),
                );
            }
            return Token::new(TokenKind::Eof, self.current_span());
        }

        let mark = self.mark();
        let Some(ch) = self.advance() else {
            return Token::new(TokenKind::Eof, self.current_span());
        };

        let kind = match ch {
            '"' | '\'' => return self.scan_string(ch, mark),
            '`' => return self.scan_template(mark),
            '0'..='9' => return self.scan_number(ch, mark),
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                return self.scan_number(ch, mark)
            }
            c if is_ident_start(c) => return self.scan_identifier(mark),

            // ── Operators ──
            '+' if self.eat('+') => TokenKind::PlusPlus,
            '+' if self.eat('=') => TokenKind::PlusEq,
            '+' => TokenKind::Plus,
            '-' if self.eat('-') => TokenKind::MinusMinus,
            '-' if self.eat('=') => TokenKind::MinusEq,
            '-' => TokenKind::Minus,
            '*' if self.eat('=') => TokenKind::StarEq,
            '*' => TokenKind::Star,
            '/' if self.eat('=') => TokenKind::SlashEq,
            '/' => TokenKind::Slash,
            '%' if self.eat('=') => TokenKind::PercentEq,
            '%' => TokenKind::Percent,
            '=' if self.eat('=') => {
                if self.eat('=') {
                    TokenKind::EqEqEq
                } else {
                    TokenKind::EqEq
                }
            }
            '=' => TokenKind::Eq,
            '!' if self.eat('=') => {
                if self.eat('=') {
                    TokenKind::BangEqEq
                } else {
                    TokenKind::BangEq
                }
            }
            '!' => TokenKind::Bang,
            '<' if self.eat('<') => TokenKind::Shl,
            '<' if self.eat('=') => TokenKind::LessEq,
            '<' => TokenKind::Less,
            '>' if self.eat('>') => TokenKind::Shr,
            '>' if self.eat('=') => TokenKind::GreaterEq,
            '>' => TokenKind::Greater,
            '&' if self.eat('&') => TokenKind::AmpAmp,
            '&' => TokenKind::Amp,
            '|' if self.eat('|') => TokenKind::PipePipe,
            '|' => TokenKind::Pipe,
            '^' => TokenKind::Caret,
            '~' => TokenKind::Tilde,
            '?' => TokenKind::Question,
            ':' => TokenKind::Colon,

            // ── Punctuation ──
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '.' => TokenKind::Dot,

            '{' => {
                if let Some(Mode::Interpolation { brace_depth }) = self.mode_stack.last_mut() {
                    *brace_depth += 1;
                }
                TokenKind::LBrace
            }

            '}' => match self.current_mode() {
                Mode::Interpolation { brace_depth: 0 } => {
                    // Back to template text.
                    self.pop_mode();
                    self.push_mode(Mode::Template);
                    TokenKind::InterpolationEnd
                }
                Mode::Interpolation { .. } => {
                    if let Some(Mode::Interpolation { brace_depth }) = self.mode_stack.last_mut()
                    {
                        *brace_depth -= 1;
                    }
                    TokenKind::RBrace
                }
                _ => TokenKind::RBrace,
            },

            _ => {
                let span = self.span_from(mark);
                self.emit_error(
                    ErrorCode::UNEXPECTED_CHARACTER,
                    format!("Unexpected character '{ch}'"),
                    span,
                );
                return self.scan_normal();
            }
        };

        self.token(kind, mark)
    }

    // ─────────────────────────────────────────────────────────────
    // Number literals
    // ─────────────────────────────────────────────────────────────

    fn scan_number(&mut self, first: char, mark: Mark) -> Token {
        if first == '0' {
            let radix = match self.peek() {
                Some('x' | 'X') => Some(16),
                Some('b' | 'B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.advance();
                return self.scan_radix_number(radix, mark);
            }
        }

        if first != '.' {
            self.skip_digits();
            if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        self.skip_digits();

        if matches!(self.peek(), Some('e' | 'E')) {
            let sign = usize::from(matches!(self.peek_at(1), Some('+' | '-')));
            if self.peek_at(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                for _ in 0..=sign {
                    self.advance();
                }
                self.skip_digits();
            }
        }

        let text: String = self.chars[mark.offset..self.pos].iter().collect();
        if self.peek().is_some_and(is_ident_start) {
            return self.invalid_number(mark);
        }
        match text.parse::<f64>() {
            Ok(value) => self.token(TokenKind::Number(value), mark),
            Err(_) => self.invalid_number(mark),
        }
    }

    fn scan_radix_number(&mut self, radix: u32, mark: Mark) -> Token {
        let digits_start = self.pos;
        while self.peek().is_some_and(|c| c.is_digit(radix)) {
            self.advance();
        }
        let digits: String = self.chars[digits_start..self.pos].iter().collect();
        if self.peek().is_some_and(is_ident_char) {
            return self.invalid_number(mark);
        }
        match u64::from_str_radix(&digits, radix) {
            Ok(value) => self.token(TokenKind::Number(value as f64), mark),
            Err(_) => self.invalid_number(mark),
        }
    }

    fn skip_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    /// Report a malformed number and swallow the rest of the word.
    fn invalid_number(&mut self, mark: Mark) -> Token {
        while self.peek().is_some_and(is_ident_char) {
            self.advance();
        }
        let span = self.span_from(mark);
        let text: String = self.chars[mark.offset..self.pos].iter().collect();
        self.emit_error(
            ErrorCode::INVALID_NUMBER,
            format!("Invalid number literal '{text}'"),
            span,
        );
        Token::new(TokenKind::Number(0.0), span)
    }

    // ─────────────────────────────────────────────────────────────
    // Identifiers & keywords
    // ─────────────────────────────────────────────────────────────

    fn scan_identifier(&mut self, mark: Mark) -> Token {
        while self.peek().is_some_and(is_ident_char) {
            self.advance();
        }
        let text: String = self.chars[mark.offset..self.pos].iter().collect();
        let kind = TokenKind::from_keyword(&text).unwrap_or(TokenKind::Identifier(text));
        self.token(kind, mark)
    }

    // ─────────────────────────────────────────────────────────────
    // Strings, templates & interpolation
    // ─────────────────────────────────────────────────────────────

    /// Scan a quoted string after its opening quote.
    fn scan_string(&mut self, quote: char, mark: Mark) -> Token {
        let mut buf = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    let span = self.span_from(mark);
                    self.emit_error_with_suggestion(
                        ErrorCode::UNTERMINATED_STRING,
                        "Unterminated string literal",
                        span,
                        format!("Close the string with {quote}"),
                    );
                    return Token::new(TokenKind::Str(buf), span);
                }
                Some(ch) if ch == quote => {
                    self.advance();
                    return self.token(TokenKind::Str(buf), mark);
                }
                Some('\\') => {
                    if let Some(escaped) = self.scan_escape_sequence() {
                        buf.push(escaped);
                    }
                }
                Some(ch) => {
                    self.advance();
                    buf.push(ch);
                }
            }
        }
    }

    /// Scan a template after its opening backtick.
    /// A template with no `${` becomes a plain [`TokenKind::Str`].
    fn scan_template(&mut self, mark: Mark) -> Token {
        self.scan_template_text(mark, TokenKind::Str, TokenKind::TemplateStart, false)
    }

    /// Continue template text after an interpolation ends.
    fn scan_template_continuation(&mut self) -> Token {
        let mark = self.mark();
        self.scan_template_text(mark, TokenKind::TemplateEnd, TokenKind::TemplatePart, true)
    }

    fn scan_template_text(
        &mut self,
        mark: Mark,
        on_close: fn(String) -> TokenKind,
        on_interpolation: fn(String) -> TokenKind,
        in_template_mode: bool,
    ) -> Token {
        let mut buf = String::new();
        loop {
            match self.peek() {
                None => {
                    let span = self.span_from(mark);
                    self.emit_error(
                        ErrorCode::UNTERMINATED_STRING,
                        "Unterminated template literal",
                        span,
                    );
                    if in_template_mode {
                        self.pop_mode();
                    }
                    return Token::new(on_close(buf), span);
                }
                Some('`') => {
                    self.advance();
                    if in_template_mode {
                        self.pop_mode();
                    }
                    return self.token(on_close(buf), mark);
                }
                Some('\\') => {
                    if let Some(escaped) = self.scan_escape_sequence() {
                        buf.push(escaped);
                    }
                }
                Some('$') if self.peek_at(1) == Some('{') => {
                    let text_span = self.span_from(mark);
                    let interp = self.mark();
                    self.advance();
                    self.advance();
                    if in_template_mode {
                        self.pop_mode();
                    }
                    self.push_mode(Mode::Interpolation { brace_depth: 0 });
                    let interp_token = self.token(TokenKind::InterpolationStart, interp);
                    self.pending.push(interp_token);
                    return Token::new(on_interpolation(buf), text_span);
                }
                Some(ch) => {
                    self.advance();
                    buf.push(ch);
                }
            }
        }
    }

    /// Scan an escape sequence starting at the `\`.
    /// Returns `None` for a line continuation or a malformed escape.
    fn scan_escape_sequence(&mut self) -> Option<char> {
        let mark = self.mark();
        self.advance();

        match self.advance()? {
            'n' => Some('\n'),
            't' => Some('\t'),
            'r' => Some('\r'),
            '0' => Some('\0'),
            'b' => Some('\u{8}'),
            'f' => Some('\u{c}'),
            'v' => Some('\u{b}'),
            '\n' => None,
            'x' => self.scan_hex_escape(2, mark),
            'u' => self.scan_hex_escape(4, mark),
            // `\"`, `\\`, `` \` ``, `\$` and any other char stand for themselves.
            other => Some(other),
        }
    }

    fn scan_hex_escape(&mut self, width: usize, mark: Mark) -> Option<char> {
        let mut value = 0u32;
        for _ in 0..width {
            match self.peek().and_then(|c| c.to_digit(16)) {
                Some(digit) => {
                    self.advance();
                    value = value * 16 + digit;
                }
                None => {
                    let span = self.span_from(mark);
                    self.emit_error(
                        ErrorCode::UNEXPECTED_CHARACTER,
                        "Invalid escape sequence",
                        span,
                    );
                    return None;
                }
            }
        }
        char::from_u32(value)
    }
}
