// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Recursive-descent parser: token stream -> [`SExpr`] tree.

#[cfg(test)]
mod parser_test;

use super::lexer::{LexError, Lexer, Token};
use super::sexpr::SExpr;

/// A parse failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    Lex(LexError),
    UnexpectedEof,
    UnmatchedRParen,
    UnexpectedToken(Token),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lex(e) => write!(f, "{e}"),
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
            Self::UnmatchedRParen => write!(f, "unmatched )"),
            Self::UnexpectedToken(t) => write!(f, "unexpected token: {t:?}"),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        Self::Lex(e)
    }
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    lookahead: Option<Token>,
}

impl<'a> Parser<'a> {
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self {
            lexer: Lexer::new(input),
            lookahead: None,
        }
    }

    fn peek(&mut self) -> Result<Option<&Token>, ParseError> {
        if self.lookahead.is_none() {
            self.lookahead = self.lexer.next_token()?;
        }
        Ok(self.lookahead.as_ref())
    }

    fn advance(&mut self) -> Option<Token> {
        self.lookahead.take()
    }

    /// Read one top-level form, or `None` at end of input.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] on malformed input.
    pub fn read(&mut self) -> Result<Option<SExpr>, ParseError> {
        if self.peek()?.is_none() {
            return Ok(None);
        }
        self.read_expr().map(Some)
    }

    fn read_expr(&mut self) -> Result<SExpr, ParseError> {
        let Some(token) = self.peek()?.cloned() else {
            return Err(ParseError::UnexpectedEof);
        };
        match token {
            Token::LParen => self.read_list(),
            Token::RParen => Err(ParseError::UnmatchedRParen),
            Token::Number(n) => {
                self.advance();
                Ok(SExpr::Number(n))
            }
            Token::Symbol(s) => {
                self.advance();
                Ok(SExpr::Symbol(s))
            }
            Token::Ident(name) => {
                self.advance();
                Ok(SExpr::Ident(name))
            }
        }
    }

    fn read_list(&mut self) -> Result<SExpr, ParseError> {
        self.advance(); // consume '('
        let mut items = Vec::new();
        loop {
            match self.peek()? {
                None => return Err(ParseError::UnexpectedEof),
                Some(Token::RParen) => {
                    self.advance();
                    break;
                }
                Some(_) => items.push(self.read_expr()?),
            }
        }
        Ok(SExpr::List(items))
    }
}
