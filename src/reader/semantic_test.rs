// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use super::super::parser::Parser;
use super::*;

fn top(src: &str) -> Expr {
    let sexpr = Parser::new(src).read().unwrap().unwrap();
    parse_top_level(&sexpr).expect("semantic parse should succeed")
}

#[test]
fn parses_define() {
    assert_eq!(
        top("(define x 42)"),
        Expr::Define {
            name: "x".to_owned(),
            body: Box::new(Expr::Number(42.0)),
        }
    );
}

#[test]
fn parses_lambda() {
    assert_eq!(
        top("(lambda (a b) (add a b))"),
        Expr::Lambda {
            params: vec!["a".to_owned(), "b".to_owned()],
            body: Box::new(Expr::Application {
                callee: Box::new(Expr::Reference("add".to_owned())),
                args: vec![Expr::Reference("a".to_owned()), Expr::Reference("b".to_owned())],
            }),
        }
    );
}

#[test]
fn parses_if() {
    assert_eq!(
        top("(if (lt 1 2) 10 20)"),
        Expr::If {
            cond: Box::new(Expr::Application {
                callee: Box::new(Expr::Reference("lt".to_owned())),
                args: vec![Expr::Number(1.0), Expr::Number(2.0)],
            }),
            then: Box::new(Expr::Number(10.0)),
            els: Box::new(Expr::Number(20.0)),
        }
    );
}

#[test]
fn parses_list_literal() {
    assert_eq!(
        top("(list 1 2 3)"),
        Expr::List(vec![Expr::Number(1.0), Expr::Number(2.0), Expr::Number(3.0)])
    );
}

#[test]
fn parses_empty_list_literal() {
    assert_eq!(top("(list)"), Expr::List(vec![]));
}

#[test]
fn anonymous_lambda_application() {
    assert_eq!(
        top("((lambda (a) a) 5)"),
        Expr::Application {
            callee: Box::new(Expr::Lambda {
                params: vec!["a".to_owned()],
                body: Box::new(Expr::Reference("a".to_owned())),
            }),
            args: vec![Expr::Number(5.0)],
        }
    );
}

#[test]
fn define_not_at_top_level_is_rejected() {
    let sexpr = Parser::new("(add 1 (define x 2))").read().unwrap().unwrap();
    assert_eq!(parse_top_level(&sexpr), Err(SemanticError::DefineNotAtTopLevel));
}

#[test]
fn empty_application_is_rejected() {
    let sexpr = Parser::new("()").read().unwrap().unwrap();
    assert_eq!(parse_top_level(&sexpr), Err(SemanticError::EmptyApplication));
}

#[test]
fn malformed_if_arity_is_rejected() {
    let sexpr = Parser::new("(if 1 2)").read().unwrap().unwrap();
    assert_eq!(parse_top_level(&sexpr), Err(SemanticError::MalformedIf));
}

#[test]
fn lambda_with_no_params_is_rejected() {
    let sexpr = Parser::new("(lambda () 1)").read().unwrap().unwrap();
    assert_eq!(parse_top_level(&sexpr), Err(SemanticError::MalformedLambda));
}
