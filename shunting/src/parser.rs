use std::sync::Arc;

use unidades::Unit;

use crate::calculator::{self, MULTIPLY, NEGATION_ORDER, UNIT_TERM_ORDER};
use crate::token::{RPNExpr, Token, TokenKind};
use crate::value::Value;
use crate::MathError;

#[derive(PartialEq, Debug)]
pub enum Assoc {
    Left,
    Right,
    None,
}

/// Printing precedence, higher binds tighter. Derived from the operator
/// order so `-2^2` and `(-2)^2` render differently.
pub fn precedence(t: &Token) -> (usize, Assoc) {
    match t.kind {
        TokenKind::BracketLeft => (1, Assoc::Left), // keep at bottom
        TokenKind::Operator if t.is_negation() => (19, Assoc::Right),
        TokenKind::Operator => {
            match calculator::operator_order(t.index.max(0) as usize) {
                0 => (20, Assoc::Right),
                o => (20 - o.max(1) as usize, Assoc::Left),
            }
        },
        TokenKind::Function if t.is_factorial() => (21, Assoc::Left),
        TokenKind::Function | TokenKind::Function2 | TokenKind::MultiFunction
            | TokenKind::If | TokenKind::CustomFunction => (22, Assoc::Left),
        _ => (99, Assoc::None),
    }
}

pub struct ShuntingParser;

impl ShuntingParser {
    /// Assigns binding orders to operators and tightens `*` and `/` inside
    /// runs of units, so `1/m*s` keeps `m*s` together. When `resolve` is
    /// given, undefined variables past the assignment that name a unit
    /// become unit literals.
    pub fn order_operators(
        tokens: &mut [Token],
        assignment_index: usize,
        resolve: Option<&dyn Fn(&str) -> Option<Arc<Unit>>>,
    ) {
        let mut is_unit = false;
        for i in 0..tokens.len() {
            {
                let t = &mut tokens[i];
                if t.kind == TokenKind::Operator {
                    if t.is_negation() {
                        t.order = NEGATION_ORDER;
                    } else if t.order < 0 && t.index >= 0 {
                        t.order = calculator::operator_order(t.index as usize);
                    }
                }
                if let (Some(resolve), TokenKind::Variable) = (resolve, t.kind) {
                    let defined = t.var.as_ref().map_or(false, |v| v.borrow().initialized);
                    if i > assignment_index && !defined {
                        if let Some(unit) = resolve(&t.content) {
                            t.kind = TokenKind::Unit;
                            t.value = Some(Value::unit_literal(unit));
                        }
                    }
                }
            }
            if i == 0 {
                is_unit = tokens[i].kind == TokenKind::Unit;
                continue;
            }
            let (head, tail) = tokens.split_at_mut(i);
            let (pt, t) = (&mut head[i - 1], &tail[0]);
            if t.kind == TokenKind::Unit {
                if is_unit {
                    if pt.is_operator("*") || pt.is_operator("/") || pt.is_operator("÷") {
                        pt.order = UNIT_TERM_ORDER;
                    }
                } else {
                    is_unit = true;
                }
            } else if is_unit && (t.kind != TokenKind::Constant || !pt.is_operator("^")) {
                if !(t.is_operator("*") || t.is_operator("/") || t.is_operator("^")) {
                    is_unit = false;
                }
            }
        }
    }

    /// Shunting yard over ordered tokens. Lower order binds tighter and `^`
    /// is right associative. Prefix functions wait on the stack, factorial
    /// goes straight to the output.
    pub fn parse(tokens: Vec<Token>) -> Result<RPNExpr, MathError> {
        let mut out = Vec::with_capacity(tokens.len());
        let mut stack: Vec<Token> = Vec::new();

        for mut token in tokens {
            match token.kind {
                TokenKind::Constant | TokenKind::Unit | TokenKind::Variable
                    | TokenKind::Solver | TokenKind::Input => out.push(token),
                TokenKind::Operator => {
                    if !token.is_negation() {
                        while let Some(top) = stack.last() {
                            let keep = top.kind == TokenKind::BracketLeft
                                || top.kind == TokenKind::Operator && (top.order > token.order
                                    || top.order == token.order && token.is_operator("^"));
                            if keep {
                                break;
                            }
                            out.extend(stack.pop());
                        }
                    }
                    if token.order == UNIT_TERM_ORDER && token.index == MULTIPLY as isize {
                        token.order = calculator::operator_order(MULTIPLY);
                    }
                    stack.push(token);
                },
                TokenKind::Function if token.is_factorial() => {
                    while let Some(top) = stack.last() {
                        if top.kind == TokenKind::Operator || top.kind == TokenKind::BracketLeft {
                            break;
                        }
                        out.extend(stack.pop());
                    }
                    out.push(token);
                },
                TokenKind::Function | TokenKind::Function2 | TokenKind::MultiFunction
                    | TokenKind::If | TokenKind::CustomFunction
                    | TokenKind::BracketLeft => stack.push(token),
                TokenKind::BracketRight | TokenKind::Divisor => {
                    let mut opened = false;
                    while let Some(top) = stack.pop() {
                        if top.kind == TokenKind::BracketLeft {
                            opened = true;
                            if token.kind == TokenKind::Divisor {
                                stack.push(top);
                            }
                            break;
                        }
                        out.push(top);
                    }
                    if !opened {
                        return Err(MathError::MissingLeftBracket);
                    }
                },
                TokenKind::None => (),
            }
        }
        while let Some(top) = stack.pop() {
            match top.kind {
                TokenKind::BracketLeft => return Err(MathError::MissingRightBracket),
                _ => out.push(top),
            }
        }
        Ok(RPNExpr(out))
    }
}
