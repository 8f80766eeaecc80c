//! Module `scanner` implements a one‑pass, streaming lexer for the Lox language.
//!
//! It transforms source text into a sequence of [`Token`]s, skipping whitespace
//! and comments, and emitting exactly one `EOF` token at the end. Designed as a
//! `FusedIterator`, it can be chained safely with other iterator adapters.
//!
//! # Public API
//!
//! - `Scanner::new(src: &'a str) -> Scanner<'a>`
//!   Create a new lexer over the input text.
//!
//! - `impl Iterator for Scanner<'a>`
//!   Yields `Result<Token, LoxError>` on each `.next()`.  Errors are not fatal:
//!   the offending input is skipped and the following call resumes scanning.
//!
//! # Token recognition
//!
//! - Single‑character tokens: `(`, `)`, `{`, `}`, `,`, `.`, `-`, `+`, `;`, `*`.
//! - Two‑character operators: `!=`, `==`, `<=`, `>=` (greedy, falling back to
//!   the one‑character form).
//! - Comments: `//` to end of line, `/* … */` blocks.  An unterminated block
//!   comment silently runs to EOF.
//! - String literals: `"` … `"`, allowing multi‑line and reporting unterminated
//!   strings.
//! - Numeric literals: digits with an optional fractional part.  A trailing `.`
//!   without a digit after it is left for the next token.
//! - Identifiers/keywords: alphanumeric/_ sequences, resolved via a
//!   perfect‑hash `KEYWORDS` map.
//!
//! Comment skipping uses `memchr` / `memmem` rather than a byte loop.
//!
//! # Example
//!
//! ```rust
//! use rox::scanner::Scanner;
//!
//! let scanner = Scanner::new("print 123; // example");
//! for result in scanner {
//!     match result {
//!         Ok(token) => println!("{}", token),
//!         Err(err) => eprintln!("{}", err),
//!     }
//! }
//! ```

use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::{memchr, memchr_iter, memmem};
use phf::phf_map;
use std::iter::FusedIterator;

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"    => TokenType::AND,
    b"class"  => TokenType::CLASS,
    b"else"   => TokenType::ELSE,
    b"false"  => TokenType::FALSE,
    b"fun"    => TokenType::FUN,
    b"for"    => TokenType::FOR,
    b"if"     => TokenType::IF,
    b"nil"    => TokenType::NIL,
    b"or"     => TokenType::OR,
    b"print"  => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super"  => TokenType::SUPER,
    b"this"   => TokenType::THIS,
    b"true"   => TokenType::TRUE,
    b"var"    => TokenType::VAR,
    b"while"  => TokenType::WHILE,
};

/// Streaming lexer over one source text.
pub struct Scanner<'a> {
    text: &'a str,
    bytes: &'a [u8],
    /// First byte of the lexeme being scanned.
    start: usize,
    /// Next byte to look at.  One past the end once `EOF` has been emitted.
    pos: usize,
    line: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str) -> Self {
        info!("Scanner created over {} bytes", text.len());

        Self {
            text,
            bytes: text.as_bytes(),
            start: 0,
            pos: 0,
            line: 1,
        }
    }

    /// Scan the whole input, splitting tokens from lexical errors.  The token
    /// list always ends with `EOF`.
    pub fn scan_all(self) -> (Vec<Token>, Vec<LoxError>) {
        let mut tokens: Vec<Token> = Vec::new();
        let mut errors: Vec<LoxError> = Vec::new();

        for result in self {
            match result {
                Ok(token) => tokens.push(token),
                Err(e) => errors.push(e),
            }
        }

        info!(
            "Scanned {} token(s) with {} error(s)",
            tokens.len(),
            errors.len()
        );

        (tokens, errors)
    }

    fn done(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Byte `offset` places ahead of the cursor, `0` past the end.
    fn look(&self, offset: usize) -> u8 {
        self.bytes.get(self.pos + offset).copied().unwrap_or(0)
    }

    fn bump(&mut self) -> u8 {
        let byte: u8 = self.bytes[self.pos];
        self.pos += 1;
        byte
    }

    fn eat(&mut self, expected: u8) -> bool {
        let hit: bool = !self.done() && self.look(0) == expected;
        if hit {
            self.pos += 1;
        }
        hit
    }

    /// `long` when the next byte is `=`, else `short`.
    fn with_equal(&mut self, long: TokenType, short: TokenType) -> TokenType {
        if self.eat(b'=') {
            long
        } else {
            short
        }
    }

    /// Recognise one lexeme starting at `self.start`.  `Ok(None)` means it
    /// was whitespace or a comment.
    fn scan_token(&mut self) -> Result<Option<TokenType>> {
        let kind: TokenType = match self.bump() {
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,

            b'!' => self.with_equal(TokenType::BANG_EQUAL, TokenType::BANG),
            b'=' => self.with_equal(TokenType::EQUAL_EQUAL, TokenType::EQUAL),
            b'<' => self.with_equal(TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.with_equal(TokenType::GREATER_EQUAL, TokenType::GREATER),

            b' ' | b'\r' | b'\t' => return Ok(None),

            b'\n' => {
                self.line += 1;
                return Ok(None);
            }

            b'/' if self.eat(b'/') => {
                self.skip_line_comment();
                return Ok(None);
            }

            b'/' if self.eat(b'*') => {
                self.skip_block_comment();
                return Ok(None);
            }

            b'/' => TokenType::SLASH,

            b'"' => self.string()?,

            b'0'..=b'9' => self.number(),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),

            _ => {
                // Skip the whole character, which may span several bytes.
                let ch: char = self.text[self.start..].chars().next().unwrap_or('\0');
                self.pos = self.start + ch.len_utf8();

                return Err(LoxError::lex(
                    self.line,
                    format!("Unexpected character: {}", ch),
                ));
            }
        };

        Ok(Some(kind))
    }

    /// `//` runs to the next newline, which is left for the line counter.
    fn skip_line_comment(&mut self) {
        self.pos = match memchr(b'\n', &self.bytes[self.pos..]) {
            Some(offset) => self.pos + offset,
            None => self.bytes.len(),
        };
    }

    /// `/* … */`.  Newlines inside still count; no closing `*/` means the rest
    /// of the input is comment.
    fn skip_block_comment(&mut self) {
        let rest: &[u8] = &self.bytes[self.pos..];

        let end: usize = match memmem::find(rest, b"*/") {
            Some(offset) => offset + 2,
            None => {
                debug!("Unterminated block comment starting on line {}", self.line);
                rest.len()
            }
        };

        self.line += memchr_iter(b'\n', &rest[..end]).count();
        self.pos += end;
    }

    /// Body of a string literal; the opening quote is already consumed.
    fn string(&mut self) -> Result<TokenType> {
        let close: usize = match memchr(b'"', &self.bytes[self.pos..]) {
            Some(offset) => self.pos + offset,
            None => {
                self.line += memchr_iter(b'\n', &self.bytes[self.pos..]).count();
                self.pos = self.bytes.len();
                return Err(LoxError::lex(self.line, "Unterminated string."));
            }
        };

        self.line += memchr_iter(b'\n', &self.bytes[self.pos..close]).count();
        self.pos = close + 1;

        Ok(TokenType::STRING(self.text[self.start + 1..close].to_owned()))
    }

    fn number(&mut self) -> TokenType {
        self.skip_digits();

        if self.look(0) == b'.' && self.look(1).is_ascii_digit() {
            self.pos += 1;
            self.skip_digits();
        }

        // Only ASCII digits and at most one dot were consumed.
        let value: f64 = self.text[self.start..self.pos].parse().unwrap_or(0.0);
        TokenType::NUMBER(value)
    }

    fn skip_digits(&mut self) {
        while self.look(0).is_ascii_digit() {
            self.pos += 1;
        }
    }

    fn identifier(&mut self) -> TokenType {
        while matches!(self.look(0), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_') {
            self.pos += 1;
        }

        KEYWORDS
            .get(&self.bytes[self.start..self.pos])
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.pos > self.bytes.len() {
                return None;
            }

            if self.done() {
                self.pos += 1;
                return Some(Ok(Token::new(TokenType::EOF, "", self.line)));
            }

            self.start = self.pos;

            match self.scan_token() {
                Err(e) => return Some(Err(e)),
                Ok(None) => continue,
                Ok(Some(kind)) => {
                    debug!("Scanned token ({:?}) on line {}", kind, self.line);
                    let lexeme: &str = &self.text[self.start..self.pos];
                    return Some(Ok(Token::new(kind, lexeme, self.line)));
                }
            }
        }
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
