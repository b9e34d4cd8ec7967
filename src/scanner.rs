//! Module `scanner` implements a one-pass, streaming lexer for the Lox language.
//!
//! It transforms a source `&str` into a sequence of [`Token`]s, skipping
//! whitespace and comments, and emitting exactly one `EOF` token at the end.
//! Designed as a `FusedIterator`, it can be chained safely with other iterator
//! adapters.
//!
//! # Public API
//!
//! - `Scanner::new(src: &'a str) -> Scanner<'a>`
//!   Create a new lexer over the input text.
//!
//! - `impl Iterator for Scanner<'a>`
//!   Yields `Result<Token, LoxError>` on each `.next()`. Errors never stop the
//!   iterator: scanning resumes at the next character.
//!
//! - `Scanner::scan_tokens(self, &mut Diagnostics) -> Vec<Token>`
//!   Drain the iterator, routing every error into the diagnostics sink.
//!
//! # Positions
//!
//! `line` counts from 0 and `line_start` is the byte offset where the current
//! line begins, so a column is the number of characters between `line_start`
//! and the position in question. Multi-line strings record the line and column
//! where they open and the line and column just past where they close.
//!
//! # Token Recognition (`scan_token`)
//!
//! - Single-character tokens: `(`, `)`, `{`, `}`, `,`, `.`, `-`, `+`, `;`, `*`,
//!   `^`, `%`, `\`.
//! - Two-character operators: `!=`, `==`, `<=`, `>=`.
//! - Comments: `//` to end of line, `/* ... */` nesting to any depth.
//! - String literals: `"..."` or `'...'`, allowing multi-line.
//! - Numeric literals: integer and optional fractional part.
//! - Identifiers/keywords: resolved via a perfect-hash `KEYWORDS` map.

use crate::error::{Diagnostics, LoxError, Result};
use crate::token::{Literal, Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile-time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"      => TokenType::AND,
    b"break"    => TokenType::BREAK,
    b"class"    => TokenType::CLASS,
    b"continue" => TokenType::CONTINUE,
    b"else"     => TokenType::ELSE,
    b"false"    => TokenType::FALSE,
    b"for"      => TokenType::FOR,
    b"fun"      => TokenType::FUN,
    b"if"       => TokenType::IF,
    b"nil"      => TokenType::NIL,
    b"or"       => TokenType::OR,
    b"print"    => TokenType::PRINT,
    b"return"   => TokenType::RETURN,
    b"super"    => TokenType::SUPER,
    b"this"     => TokenType::THIS,
    b"true"     => TokenType::TRUE,
    b"var"      => TokenType::VAR,
    b"while"    => TokenType::WHILE,
};

/// A single pass **scanner / lexer** that converts source text into a
/// sequence of [`Token`]s.
pub struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    start: usize,      // byte index of the *first* byte of the current lexeme
    curr: usize,       // byte index *one past* the last byte examined
    line: usize,       // 0-based line counter (\n increments)
    line_start: usize, // byte index where the current line begins
    start_line: usize, // line the current lexeme opened on
    start_col: usize,  // column the current lexeme opened on
    pending: Option<(TokenType, Option<Literal>)>, // recognised token waiting to be emitted
    finished: bool,
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `src`.
    #[inline]
    pub fn new(src: &'a str) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            bytes: src.as_bytes(),
            start: 0,
            curr: 0,
            line: 0,
            line_start: 0,
            start_line: 0,
            start_col: 0,
            pending: None,
            finished: false,
        }
    }

    /// Scan the whole input. Errors go to `diagnostics`; the returned tokens
    /// always end with a single `EOF`.
    pub fn scan_tokens(self, diagnostics: &mut Diagnostics) -> Vec<Token> {
        let mut tokens: Vec<Token> = Vec::new();

        for result in self {
            match result {
                Ok(token) => tokens.push(token),
                Err(e) => {
                    debug!("Scan error: {}", e);
                    diagnostics.report(e);
                }
            }
        }

        info!("Scanned {} tokens", tokens.len());

        tokens
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    #[inline(always)]
    const fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.len()
    }

    /// Advance one byte and return it.  Callers guard with [`is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.bytes[self.curr];
        self.curr += 1;
        b
    }

    /// Peek at the current byte without consuming it.  Returns `0` past EOF.
    #[inline(always)]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.bytes[self.curr]
        }
    }

    /// Peek one byte beyond [`peek`].  Safe at EOF.
    #[inline(always)]
    fn peek_next(&self) -> u8 {
        if self.curr + 1 >= self.len() {
            0
        } else {
            self.bytes[self.curr + 1]
        }
    }

    /// Conditionally consume a byte **iff** it matches `expected`.
    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Record that a `\n` was just consumed.
    #[inline(always)]
    fn bump_line(&mut self) {
        self.line += 1;
        self.line_start = self.curr;
    }

    /// Character column of byte offset `pos` on the current line.
    fn col_of(&self, pos: usize) -> usize {
        self.src
            .get(self.line_start..pos)
            .map_or(pos - self.line_start, |s| s.chars().count())
    }

    fn emit(&mut self, token_type: TokenType) {
        self.pending = Some((token_type, None));
    }

    /// Pick the two-character kind when the next byte is `=`.
    fn emit_with_equal(&mut self, double: TokenType, single: TokenType) {
        let tt = if self.match_byte(b'=') { double } else { single };

        self.emit(tt);
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a *single* lexeme starting at `self.curr`.  If it produces an
    /// actual token the kind is stored in `self.pending`.  Whitespace and
    /// comments are skipped by returning `Ok(())` with `pending = None`.
    fn scan_token(&mut self) -> Result<()> {
        let b = self.advance();

        match b {
            // ── single-character punctuators ──────────────────────────────
            b'(' => self.emit(TokenType::LEFT_PAREN),
            b')' => self.emit(TokenType::RIGHT_PAREN),
            b'{' => self.emit(TokenType::LEFT_BRACE),
            b'}' => self.emit(TokenType::RIGHT_BRACE),
            b',' => self.emit(TokenType::COMMA),
            b'.' => self.emit(TokenType::DOT),
            b'-' => self.emit(TokenType::MINUS),
            b'+' => self.emit(TokenType::PLUS),
            b';' => self.emit(TokenType::SEMICOLON),
            b'*' => self.emit(TokenType::STAR),
            b'^' => self.emit(TokenType::CARAT),
            b'%' => self.emit(TokenType::PERCENT),
            b'\\' => self.emit(TokenType::BACK_SLASH),

            // ── two-character operators (!=, ==, <=, >=) ─────────────────
            b'!' => self.emit_with_equal(TokenType::BANG_EQUAL, TokenType::BANG),
            b'=' => self.emit_with_equal(TokenType::EQUAL_EQUAL, TokenType::EQUAL),
            b'<' => self.emit_with_equal(TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.emit_with_equal(TokenType::GREATER_EQUAL, TokenType::GREATER),

            // ── whitespace / newline ─────────────────────────────────────
            b' ' | b'\r' | b'\t' => {}

            b'\n' => self.bump_line(),

            // ── comments or slash ────────────────────────────────────────
            b'/' => {
                if self.match_byte(b'/') {
                    // Fast-forward to the next newline; the newline itself is
                    // left for the main loop so the line counter stays right.
                    match memchr(b'\n', &self.bytes[self.curr..]) {
                        Some(pos) => self.curr += pos,
                        None => self.curr = self.len(),
                    }
                } else if self.match_byte(b'*') {
                    return self.block_comment();
                } else {
                    self.emit(TokenType::SLASH);
                }
            }

            // ── string literal "..." or '...' ────────────────────────────
            b'"' | b'\'' => {
                return self.parse_string(b);
            }

            // ── number literal (digit-leading) ───────────────────────────
            b'0'..=b'9' => self.parse_number(),

            // ── identifiers / keywords (alpha or underscore-leading) ─────
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.parse_identifier(),

            // ── unexpected character ─────────────────────────────────────
            _ => {
                // Step over the whole UTF-8 sequence, not just its lead byte.
                let ch: char = self.src[self.start..].chars().next().unwrap_or('\u{fffd}');
                self.curr = self.start + ch.len_utf8();

                return Err(LoxError::syntax(
                    self.line,
                    self.start_col,
                    format!("Unsupported character encountered: '{}'", ch),
                ));
            }
        }

        Ok(())
    }

    /// Discard a `/* ... */` comment, honouring nested openers.  The opening
    /// `/*` has already been consumed.
    fn block_comment(&mut self) -> Result<()> {
        let mut depth: usize = 1;

        while depth > 0 {
            if self.is_at_end() {
                return Err(LoxError::syntax(
                    self.line,
                    self.col_of(self.curr).saturating_sub(1),
                    "Unterminated block comment.",
                ));
            }

            if self.peek() == b'/' && self.peek_next() == b'*' {
                self.curr += 2;
                depth += 1;
            } else if self.peek() == b'*' && self.peek_next() == b'/' {
                self.curr += 2;
                depth -= 1;
            } else if self.advance() == b'\n' {
                self.bump_line();
            }
        }

        debug!("Skipped block comment ending on line {}", self.line);

        Ok(())
    }

    /// Parse a string literal closed by the same quote that opened it.
    ///
    /// * `self.start` still points to the opening quote.
    /// * When we return, `self.curr` points **past** the closing quote.
    fn parse_string(&mut self, quote: u8) -> Result<()> {
        while !self.is_at_end() && self.peek() != quote {
            if self.advance() == b'\n' {
                self.bump_line(); // multi-line strings are allowed
            }
        }

        if self.is_at_end() {
            return Err(LoxError::syntax(self.line, 0, "Unterminated string."));
        }

        self.advance(); // consume closing quote

        let s: &str = &self.src[self.start + 1..self.curr - 1];
        self.pending = Some((TokenType::STRING, Some(Literal::Str(s.to_owned()))));

        Ok(())
    }

    /// Parse a numeric literal (`123`, `3.14`).  No leading or trailing dot.
    fn parse_number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        let mut is_float = false;
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            is_float = true;
            self.advance(); // consume "."

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let s: &str = &self.src[self.start..self.curr];
        let literal = if is_float {
            Literal::Float(s.parse::<f64>().unwrap_or(f64::NAN))
        } else {
            // Digit runs too long for i64 degrade to a float.
            s.parse::<i64>()
                .map(Literal::Int)
                .unwrap_or_else(|_| Literal::Float(s.parse::<f64>().unwrap_or(f64::INFINITY)))
        };

        self.pending = Some((TokenType::NUMBER, Some(literal)));
    }

    /// Parse an identifier and decide if it is a **keyword** or a generic
    /// `IDENTIFIER` token.
    fn parse_identifier(&mut self) {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_'
        } {
            self.advance();
        }

        let slice: &[u8] = &self.bytes[self.start..self.curr];

        let tt: TokenType = KEYWORDS
            .get(slice)
            .copied()
            .unwrap_or(TokenType::IDENTIFIER);

        self.emit(tt);
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        // Loop until we either emit a token, hit EOF, or see an error.
        while !self.finished {
            // 1. EOF guard: emit exactly one EOF then terminate.
            if self.is_at_end() {
                self.finished = true;
                return Some(Ok(Token::new(TokenType::EOF, "", self.line, 0)));
            }

            // 2. Reset per-token state.
            self.start = self.curr;
            self.start_line = self.line;
            self.start_col = self.col_of(self.start);
            self.pending = None;

            // 3. Attempt to scan a token.
            if let Err(e) = self.scan_token() {
                return Some(Err(e));
            }

            // 4. If a real token was recognised, build and return it.
            if let Some((tt, literal)) = self.pending.take() {
                let lexeme: &str = &self.src[self.start..self.curr];
                let mut token = Token::new(tt, lexeme, self.start_line, self.start_col);
                token.literal = literal;
                token.end_line = self.line;
                token.end_col = self.col_of(self.curr);

                debug!("Scanned token ({:?}) on line {}", tt, self.start_line);

                return Some(Ok(token));
            }
            // Otherwise it was whitespace / comment → continue loop.
        }

        None // already yielded EOF
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
