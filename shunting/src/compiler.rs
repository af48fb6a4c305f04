use std::rc::Rc;

use crate::calculator::{Binary, Unary, NEG, RANDOM};
use crate::context::MathContext;
use crate::token::{RPNExpr, Token, TokenKind};
use crate::value::Value;
use crate::MathError;

/// A compiled expression. The session is passed in on every call so the
/// closure owns nothing but cells and constants.
pub type Compiled = Rc<dyn Fn(&MathContext) -> Result<Value, MathError>>;

enum Expr {
    Const(Value),
    Dynamic(Compiled),
}

impl Expr {
    fn into_compiled(self) -> Compiled {
        match self {
            Expr::Const(v) => Rc::new(move |_| Ok(v.clone())),
            Expr::Dynamic(f) => f,
        }
    }
}

fn literal(t: &Token) -> Result<Value, MathError> {
    t.value.clone().ok_or_else(|| MathError::UndefinedVariableOrUnits(t.content.clone()))
}

/// Turns a postfix expression into a closure tree. Sub-trees that don't
/// depend on variables, custom functions or solve blocks are evaluated
/// right away and kept as constants.
pub fn compile(cx: &MathContext, rpn: &RPNExpr) -> Result<Compiled, MathError> {
    let tokens = &rpn.0;
    if tokens.is_empty() {
        return Err(MathError::ExpressionEmpty);
    }
    let mut c = Compiler{cx, stack: Vec::with_capacity(tokens.len())};
    for t in tokens {
        let expr = match t.kind {
            TokenKind::Constant => Expr::Const(literal(t)?),
            TokenKind::Unit if t.is_unit_placeholder() => Expr::Const(Value::default()),
            TokenKind::Unit => Expr::Const(literal(t)?.collapse_percent()),
            TokenKind::Input => Expr::Const(t.value.clone().ok_or(MathError::UndefinedInputField)?),
            TokenKind::Variable => c.variable(t)?,
            TokenKind::Operator if t.is_assignment() => c.assign(&tokens[0])?,
            TokenKind::Operator if t.is_negation() => c.unary(cx.calc.function(NEG), true)?,
            TokenKind::Operator => c.binary(cx.calc.operator(t.index as usize))?,
            TokenKind::Function => {
                let index = t.index as usize;
                c.unary(cx.calc.function(index), index != RANDOM)?
            },
            TokenKind::Function2 => c.binary(cx.calc.function2(t.index as usize))?,
            TokenKind::If => c.condition()?,
            TokenKind::MultiFunction => c.multi(t)?,
            TokenKind::CustomFunction => c.custom(t)?,
            TokenKind::Solver => {
                let index = t.index as usize;
                Expr::Dynamic(Rc::new(move |cx| cx.solve(index)))
            },
            _ => return Err(MathError::InvalidSyntax(t.content.clone(), String::new())),
        };
        c.stack.push(expr);
    }
    let result = c.pop()?;
    if !c.stack.is_empty() {
        return Err(MathError::StackLeak);
    }
    Ok(result.into_compiled())
}

struct Compiler<'a> {
    cx: &'a MathContext,
    stack: Vec<Expr>,
}

impl<'a> Compiler<'a> {
    fn pop(&mut self) -> Result<Expr, MathError> {
        self.stack.pop().ok_or(MathError::StackEmpty)
    }

    fn pop_args(&mut self, n: usize) -> Result<Vec<Expr>, MathError> {
        if n > self.stack.len() {
            return Err(MathError::StackEmpty);
        }
        let at = self.stack.len() - n;
        Ok(self.stack.split_off(at))
    }

    fn variable(&mut self, t: &Token) -> Result<Expr, MathError> {
        let var = t.var.clone()
            .ok_or_else(|| MathError::UndefinedVariableOrUnits(t.content.clone()))?;
        if !var.borrow().initialized {
            if let Some(unit) = self.cx.unit(&t.content) {
                return Ok(Expr::Const(Value::unit_literal(unit).collapse_percent()));
            }
        }
        let name = t.content.clone();
        Ok(Expr::Dynamic(Rc::new(move |cx| {
            let v = var.borrow();
            if v.initialized {
                return Ok(v.value.clone());
            }
            cx.unit(&name)
                .map(Value::unit_literal)
                .ok_or_else(|| MathError::UndefinedVariableOrUnits(name.clone()))
        })))
    }

    // writes through the cell and reads it back
    fn assign(&mut self, lhs: &Token) -> Result<Expr, MathError> {
        let value = self.pop()?.into_compiled();
        self.pop()?;
        match (lhs.kind, &lhs.var) {
            (TokenKind::Variable, Some(var)) => {
                let var = var.clone();
                Ok(Expr::Dynamic(Rc::new(move |cx| {
                    let v = value(cx)?;
                    cx.assign(&var, v);
                    let v = var.borrow().value.clone();
                    Ok(v)
                })))
            },
            _ if lhs.is_unit_placeholder() => {
                let name = lhs.content.clone();
                Ok(Expr::Dynamic(Rc::new(move |cx| {
                    let v = value(cx)?;
                    cx.define_unit(&name, &v)?;
                    Ok(v)
                })))
            },
            _ => Err(MathError::AssignmentPreceded),
        }
    }

    fn unary(&mut self, f: Unary, foldable: bool) -> Result<Expr, MathError> {
        Ok(match self.pop()? {
            Expr::Const(a) if foldable => Expr::Const(f(&a)?),
            a => {
                let a = a.into_compiled();
                Expr::Dynamic(Rc::new(move |cx| f(&a(cx)?)))
            },
        })
    }

    fn binary(&mut self, f: Binary) -> Result<Expr, MathError> {
        let b = self.pop()?;
        let a = self.pop()?;
        Ok(match (a, b) {
            (Expr::Const(a), Expr::Const(b)) => Expr::Const(f(&a, &b)?),
            (a, b) => {
                let (a, b) = (a.into_compiled(), b.into_compiled());
                Expr::Dynamic(Rc::new(move |cx| f(&a(cx)?, &b(cx)?)))
            },
        })
    }

    /// `if` only evaluates the branch it takes.
    fn condition(&mut self) -> Result<Expr, MathError> {
        let if_false = self.pop()?;
        let if_true = self.pop()?;
        Ok(match self.pop()? {
            Expr::Const(c) => if c.re().abs() < 1e-12 { if_false } else { if_true },
            c => {
                let c = c.into_compiled();
                let (t, f) = (if_true.into_compiled(), if_false.into_compiled());
                Expr::Dynamic(Rc::new(move |cx| {
                    if c(cx)?.re().abs() < 1e-12 { f(cx) } else { t(cx) }
                }))
            },
        })
    }

    fn multi(&mut self, t: &Token) -> Result<Expr, MathError> {
        let f = self.cx.calc.multi_function(t.index as usize);
        let args = self.pop_args(t.param_count)?;
        if args.iter().all(|a| matches!(a, Expr::Const(_))) {
            let values: Vec<Value> = args.into_iter()
                .filter_map(|a| match a { Expr::Const(v) => Some(v), _ => None })
                .collect();
            return Ok(Expr::Const(f(&values)?));
        }
        let args: Vec<Compiled> = args.into_iter().map(Expr::into_compiled).collect();
        Ok(Expr::Dynamic(Rc::new(move |cx| {
            let values = args.iter().map(|a| a(cx)).collect::<Result<Vec<_>, _>>()?;
            f(&values)
        })))
    }

    // never folded, the body may change behind the call
    fn custom(&mut self, t: &Token) -> Result<Expr, MathError> {
        if t.index < 0 {
            return Err(MathError::FunctionNotDefined(t.content.clone()));
        }
        let index = t.index as usize;
        let args: Vec<Compiled> = self.pop_args(t.param_count)?
            .into_iter()
            .map(Expr::into_compiled)
            .collect();
        Ok(Expr::Dynamic(Rc::new(move |cx| {
            let values = args.iter().map(|a| a(cx)).collect::<Result<Vec<_>, _>>()?;
            cx.call_function(index, &values)
        })))
    }
}
