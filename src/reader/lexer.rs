// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tokenizer for Atto source text.
//!
//! Grammar (`SPEC_FULL.md` §1 reader module): parentheses, bare
//! identifiers, `:`-prefixed symbols, and numbers (`-`? digits, parsed as
//! `f64`).

#[cfg(test)]
mod lexer_test;

use std::iter::Peekable;
use std::str::Chars;

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    Ident(String),
    Symbol(String),
    Number(f64),
}

/// A lexing failure.
#[derive(Debug, Clone, PartialEq)]
pub enum LexError {
    UnexpectedChar(char),
    InvalidNumber(String),
    EmptySymbol,
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedChar(c) => write!(f, "unexpected character: {c:?}"),
            Self::InvalidNumber(s) => write!(f, "invalid number: {s:?}"),
            Self::EmptySymbol => write!(f, "symbol literal has no name after ':'"),
        }
    }
}

impl std::error::Error for LexError {}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '-'
}

/// A `Peekable<Chars>`-driven scanner, one token at a time.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some(c) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn lex_number(&mut self, first: char) -> Result<Token, LexError> {
        let mut text = String::new();
        text.push(first);
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() || c == '.' {
                text.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| LexError::InvalidNumber(text))
    }

    fn lex_ident(&mut self, first: char) -> Token {
        let mut text = String::new();
        text.push(first);
        while let Some(&c) = self.chars.peek() {
            if is_ident_continue(c) {
                text.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        Token::Ident(text)
    }

    fn lex_symbol(&mut self) -> Result<Token, LexError> {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if is_ident_continue(c) {
                text.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        if text.is_empty() {
            return Err(LexError::EmptySymbol);
        }
        Ok(Token::Symbol(text))
    }

    /// Read the next token, or `None` at end of input.
    ///
    /// # Errors
    ///
    /// Returns [`LexError`] on malformed input.
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_whitespace();
        let Some(c) = self.chars.next() else {
            return Ok(None);
        };
        match c {
            '(' => Ok(Some(Token::LParen)),
            ')' => Ok(Some(Token::RParen)),
            ':' => self.lex_symbol().map(Some),
            '-' if matches!(self.chars.peek(), Some(d) if d.is_ascii_digit()) => {
                let next = self.chars.next().expect("peeked digit must exist");
                let mut text = String::from("-");
                text.push(next);
                while let Some(&d) = self.chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        text.push(d);
                        self.chars.next();
                    } else {
                        break;
                    }
                }
                text.parse::<f64>()
                    .map(Token::Number)
                    .map(Some)
                    .map_err(|_| LexError::InvalidNumber(text))
            }
            d if d.is_ascii_digit() => self.lex_number(d).map(Some),
            c if is_ident_start(c) => Ok(Some(self.lex_ident(c))),
            c => Err(LexError::UnexpectedChar(c)),
        }
    }
}
