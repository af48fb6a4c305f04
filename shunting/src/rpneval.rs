use std::sync::Arc;

use unidades::Unit;

use crate::calculator::NEG;
use crate::context::MathContext;
use crate::token::{RPNExpr, Token, TokenKind};
use crate::value::{apply_units, Value};
use crate::MathError;

/// Values a single pass may hold at once.
pub const STACK_SIZE: usize = 100;

/// Stack interpreter for one statement.
pub struct Evaluator<'a> {
    cx: &'a MathContext,
    stack: Vec<Value>,
    /// Set once an initialized variable was read.
    pub has_variables: bool,
    pub previous: Option<Value>,
}

impl<'a> Evaluator<'a> {
    pub fn new(cx: &'a MathContext) -> Evaluator<'a> {
        Evaluator{cx, stack: Vec::with_capacity(STACK_SIZE), has_variables: false, previous: None}
    }

    fn push(&mut self, value: Value) -> Result<(), MathError> {
        if self.stack.len() >= STACK_SIZE {
            return Err(MathError::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, MathError> {
        self.stack.pop().ok_or(MathError::StackEmpty)
    }

    fn pop_operand(&mut self) -> Result<Value, MathError> {
        self.stack.pop().ok_or(MathError::MissingOperand)
    }

    fn pop_args(&mut self, n: usize) -> Result<Vec<Value>, MathError> {
        if n > self.stack.len() {
            return Err(MathError::StackEmpty);
        }
        let at = self.stack.len() - n;
        Ok(self.stack.split_off(at))
    }

    fn variable(&mut self, t: &Token) -> Result<Value, MathError> {
        if let Some(var) = &t.var {
            let var = var.borrow();
            if var.initialized {
                self.has_variables = true;
                return Ok(var.value.clone());
            }
        }
        self.cx.unit(&t.content)
            .map(Value::unit_literal)
            .ok_or_else(|| MathError::UndefinedVariableOrUnits(t.content.clone()))
    }

    fn assign(&mut self, lhs: &Token, value: Value, target: Option<&Arc<Unit>>) -> Result<Value, MathError> {
        let value = apply_units(value, target)?;
        match (&lhs.var, lhs.kind) {
            (Some(var), TokenKind::Variable) => {
                self.previous = {
                    let var = var.borrow();
                    if var.initialized { Some(var.value.clone()) } else { None }
                };
                self.cx.assign(var, value.clone());
                Ok(value)
            },
            _ if lhs.is_unit_placeholder() => {
                self.cx.define_unit(&lhs.content, &value)?;
                Ok(value)
            },
            _ => Err(MathError::AssignmentPreceded),
        }
    }

    /// Runs `rpn` and converts the result into `target`. A statement of
    /// the form `lhs = expr` returns the assigned value.
    pub fn run(&mut self, rpn: &RPNExpr, target: Option<&Arc<Unit>>) -> Result<Value, MathError> {
        self.cx.check_cancel()?;
        let tokens = &rpn.0;
        if tokens.is_empty() {
            return Err(MathError::ExpressionEmpty);
        }
        self.stack.clear();
        self.has_variables = false;
        self.previous = None;

        let is_assignment = tokens.len() > 1
            && tokens[tokens.len() - 1].is_assignment()
            && matches!(tokens[0].kind, TokenKind::Variable | TokenKind::Unit);
        let start = if is_assignment { 1 } else { 0 };
        let cx = self.cx;
        let calc = &cx.calc;

        for t in &tokens[start..] {
            let value = match t.kind {
                TokenKind::Constant | TokenKind::Unit => t.value.clone()
                    .ok_or_else(|| MathError::UndefinedVariableOrUnits(t.content.clone()))?,
                TokenKind::Input => t.value.clone().ok_or(MathError::UndefinedInputField)?,
                TokenKind::Variable => self.variable(t)?,
                TokenKind::Operator if t.is_assignment() => {
                    if !is_assignment {
                        return Err(MathError::AssignmentPreceded);
                    }
                    let value = self.pop()?;
                    return self.assign(&tokens[0], value, target);
                },
                TokenKind::Operator if t.is_negation() => {
                    let a = self.pop_operand()?;
                    calc.evaluate_function(NEG, &a)?
                },
                TokenKind::Operator => {
                    let b = self.pop_operand()?;
                    let a = self.pop_operand()?;
                    calc.evaluate_operator(t.index as usize, &a, &b)?
                },
                TokenKind::Function => {
                    let a = self.pop_operand()?;
                    calc.evaluate_function(t.index as usize, &a)?
                },
                TokenKind::Function2 => {
                    let b = self.pop_operand()?;
                    let a = self.pop_operand()?;
                    calc.evaluate_function2(t.index as usize, &a, &b)?
                },
                TokenKind::If => {
                    let if_false = self.pop()?;
                    let if_true = self.pop()?;
                    let condition = self.pop()?;
                    if condition.re().abs() < 1e-12 { if_false } else { if_true }
                },
                TokenKind::MultiFunction => {
                    let args = self.pop_args(t.param_count)?;
                    calc.evaluate_multi_function(t.index as usize, &args)?
                },
                TokenKind::CustomFunction => {
                    if t.index < 0 {
                        return Err(MathError::FunctionNotDefined(t.content.clone()));
                    }
                    let args = self.pop_args(t.param_count)?;
                    cx.call_function(t.index as usize, &args)?
                },
                TokenKind::Solver => cx.solve(t.index as usize)?,
                _ => return Err(MathError::InvalidSyntax(t.content.clone(), String::new())),
            };
            self.push(value)?;
        }
        let value = self.pop()?;
        if !self.stack.is_empty() {
            return Err(MathError::StackLeak);
        }
        apply_units(value, target)
    }
}
