use crate::calculator::UNIT_MULT_ORDER;
use crate::parser::{precedence, Assoc};
use crate::token::{RPNExpr, Token, TokenKind};
use std::fmt;

#[derive(Debug, Clone)]
enum AST<'a> {
    Leaf(&'a Token),
    Node(&'a Token, Vec<AST<'a>>),
}

fn arity(token: &Token) -> usize {
    match token.kind {
        TokenKind::Operator if token.is_negation() => 1,
        TokenKind::Operator | TokenKind::Function2 => 2,
        TokenKind::Function => 1,
        TokenKind::If => 3,
        TokenKind::MultiFunction | TokenKind::CustomFunction => token.param_count,
        _ => 0,
    }
}

impl RPNExpr {
    fn build_ast(&self) -> Option<AST> {
        let mut ops = Vec::new();
        for token in self.0.iter() {
            match arity(token) {
                0 => ops.push(AST::Leaf(token)),
                n if n <= ops.len() => {
                    let operands = ops.split_off(ops.len() - n);
                    ops.push(AST::Node(token, operands));
                },
                _ => return None,
            }
        }
        ops.pop().filter(|_| ops.is_empty())
    }

    /// Infix rendering that shows solve blocks through `solver`.
    pub fn infix_with<'a>(&'a self, solver: &'a dyn Fn(usize) -> Option<String>) -> Infix<'a> {
        Infix{rpn: self, solver: Some(solver)}
    }
}

pub struct Infix<'a> {
    rpn: &'a RPNExpr,
    solver: Option<&'a dyn Fn(usize) -> Option<String>>,
}

impl<'a> Infix<'a> {
    fn leaf(&self, token: &Token) -> String {
        match (token.kind, self.solver) {
            (TokenKind::Solver, Some(solver)) if token.index >= 0 => {
                solver(token.index as usize).unwrap_or_else(|| token.to_string())
            },
            _ => token.to_string(),
        }
    }

    fn printer(&self, root: &AST) -> (String, (usize, Assoc)) {
        match root {
            AST::Leaf(token) => (self.leaf(token), precedence(token)),
            AST::Node(token, args) if token.is_negation() => {
                let subtree = self.printer(&args[0]);
                let (prec, assoc) = precedence(token);
                if prec > (subtree.1).0 {
                    (format!("{}({})", token, subtree.0), (prec, assoc))
                } else {
                    (format!("{}{}", token, subtree.0), (prec, assoc))
                }
            },
            AST::Node(token, args) if token.is_factorial() => {
                let subtree = self.printer(&args[0]);
                let (prec, assoc) = precedence(token);
                if prec > (subtree.1).0 {
                    (format!("({})!", subtree.0), (prec, assoc))
                } else {
                    (format!("{}!", subtree.0), (prec, assoc))
                }
            },
            AST::Node(token, args) if token.kind == TokenKind::Operator => {
                let (lhs, rhs) = (self.printer(&args[0]), self.printer(&args[1]));
                let (prec, assoc) = precedence(token);

                let lh = if prec > (lhs.1).0 || (prec == (lhs.1).0 && assoc != Assoc::Left) {
                    format!("({})", lhs.0)
                } else {
                    lhs.0
                };
                let rh = if prec > (rhs.1).0 || (prec == (rhs.1).0 && assoc != Assoc::Right) {
                    format!("({})", rhs.0)
                } else {
                    rhs.0
                };
                let text = if token.is_operator("^") {
                    format!("{}^{}", lh, rh)
                } else if token.order == UNIT_MULT_ORDER {
                    // 5 m
                    format!("{} {}", lh, rh)
                } else {
                    format!("{} {} {}", lh, token, rh)
                };
                (text, (prec, assoc))
            },
            AST::Node(token, args) => {
                let expr = args
                    .iter()
                    .map(|leaf| self.printer(leaf).0)
                    .collect::<Vec<String>>()
                    .join("; ");
                (format!("{}({})", token, expr), precedence(token))
            },
        }
    }
}

impl<'a> fmt::Display for Infix<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.rpn.build_ast() {
            Some(ast) => write!(f, "{}", self.printer(&ast).0),
            None => {
                let raw: Vec<String> = self.rpn.0.iter().map(|t| t.to_string()).collect();
                write!(f, "{}", raw.join(" "))
            },
        }
    }
}

impl fmt::Display for RPNExpr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", Infix{rpn: self, solver: None})
    }
}
