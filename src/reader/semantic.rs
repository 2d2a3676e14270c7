// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Semantic pass: [`SExpr`] -> the typed [`Expr`] tree the compiler
//! consumes. Checks list-forms against the grammar's alternatives
//! (`define`, `lambda`, `if`, `list`, application) and rejects anything
//! that doesn't match one of them.

#[cfg(test)]
mod semantic_test;

use super::expr::Expr;
use super::sexpr::SExpr;

/// A malformed top-level or nested form.
#[derive(Debug, Clone, PartialEq)]
pub enum SemanticError {
    EmptyApplication,
    MalformedDefine,
    MalformedLambda,
    MalformedIf,
    DefineNotAtTopLevel,
}

impl std::fmt::Display for SemanticError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyApplication => write!(f, "empty application: ()"),
            Self::MalformedDefine => {
                write!(f, "malformed define: expected (define name expression)")
            }
            Self::MalformedLambda => write!(
                f,
                "malformed lambda: expected (lambda (params...) expression)"
            ),
            Self::MalformedIf => write!(
                f,
                "malformed if: expected (if condition then else)"
            ),
            Self::DefineNotAtTopLevel => write!(f, "define is only legal at the top level"),
        }
    }
}

impl std::error::Error for SemanticError {}

/// Parse a top-level form. Accepts `(define name body)` in addition to
/// any ordinary expression, per `SPEC_FULL.md` §1 driver module.
///
/// # Errors
///
/// Returns [`SemanticError`] if the form doesn't match the grammar.
pub fn parse_top_level(sexpr: &SExpr) -> Result<Expr, SemanticError> {
    if let SExpr::List(items) = sexpr {
        if let [SExpr::Ident(head), rest @ ..] = items.as_slice() {
            if head == "define" {
                return parse_define(rest);
            }
        }
    }
    parse_expr(sexpr)
}

fn parse_define(rest: &[SExpr]) -> Result<Expr, SemanticError> {
    let [SExpr::Ident(name), body] = rest else {
        return Err(SemanticError::MalformedDefine);
    };
    Ok(Expr::Define {
        name: name.clone(),
        body: Box::new(parse_expr(body)?),
    })
}

/// Parse any expression, rejecting a bare `define` (only legal at the top
/// level — `SPEC_FULL.md` §1 reader module).
///
/// # Errors
///
/// Returns [`SemanticError`] if the form doesn't match the grammar.
pub fn parse_expr(sexpr: &SExpr) -> Result<Expr, SemanticError> {
    match sexpr {
        SExpr::Number(n) => Ok(Expr::Number(*n)),
        SExpr::Symbol(s) => Ok(Expr::Symbol(s.clone())),
        SExpr::Ident(name) => Ok(Expr::Reference(name.clone())),
        SExpr::List(items) => parse_list(items),
    }
}

fn parse_list(items: &[SExpr]) -> Result<Expr, SemanticError> {
    let Some(head) = items.first() else {
        return Err(SemanticError::EmptyApplication);
    };

    if let SExpr::Ident(name) = head {
        match name.as_str() {
            "define" => return Err(SemanticError::DefineNotAtTopLevel),
            "lambda" => return parse_lambda(&items[1..]),
            "if" => return parse_if(&items[1..]),
            "list" => {
                let elems = items[1..]
                    .iter()
                    .map(parse_expr)
                    .collect::<Result<Vec<_>, _>>()?;
                return Ok(Expr::List(elems));
            }
            _ => {}
        }
    }

    // Application: head + one-or-more arguments.
    let args = items[1..]
        .iter()
        .map(parse_expr)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Expr::Application {
        callee: Box::new(parse_expr(head)?),
        args,
    })
}

fn parse_lambda(rest: &[SExpr]) -> Result<Expr, SemanticError> {
    let [SExpr::List(param_list), body] = rest else {
        return Err(SemanticError::MalformedLambda);
    };
    let mut params = Vec::with_capacity(param_list.len());
    for p in param_list {
        let SExpr::Ident(name) = p else {
            return Err(SemanticError::MalformedLambda);
        };
        params.push(name.clone());
    }
    if params.is_empty() {
        return Err(SemanticError::MalformedLambda);
    }
    Ok(Expr::Lambda {
        params,
        body: Box::new(parse_expr(body)?),
    })
}

fn parse_if(rest: &[SExpr]) -> Result<Expr, SemanticError> {
    let [cond, then, els] = rest else {
        return Err(SemanticError::MalformedIf);
    };
    Ok(Expr::If {
        cond: Box::new(parse_expr(cond)?),
        then: Box::new(parse_expr(then)?),
        els: Box::new(parse_expr(els)?),
    })
}
