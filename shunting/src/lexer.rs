use std::sync::Arc;

use unidades::Unit;

use crate::calculator::{self, UNIT_MULT_ORDER};
use crate::context::MathContext;
use crate::scanner::Scanner;
use crate::solve_block::{SolveBlock, SolverKind};
use crate::token::{char_class, CharClass, Token, TokenKind};
use crate::value::Value;
use crate::MathError;

/// Tokens of one statement plus its `| units` suffix.
#[derive(Debug)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub target: Option<Arc<Unit>>,
    /// Position of `=` in the token list, 0 when there's none.
    pub assignment_index: usize,
}

/// Splits off a trailing comment and then the target units.
fn split_statement(text: &str) -> (&str, Option<&str>) {
    let mut depth = 0;
    let mut end = text.len();
    for (i, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth -= 1,
            '\'' | '"' if depth <= 0 => {
                end = i;
                break;
            },
            _ => (),
        }
    }
    let text = &text[..end];
    match text.find('|') {
        Some(n) => (&text[..n], Some(&text[n + 1..])),
        None => (text, None),
    }
}

/// Units symbols that can't start a variable name (°, %, currencies).
fn is_unit_symbol(c: char) -> bool {
    c != '_' && !c.is_alphabetic() && unidades::is_unit_char(c)
}

fn parse_number(text: &str) -> Result<f64, MathError> {
    text.trim().parse::<f64>().map_err(|_| MathError::InvalidNumber(text.trim().to_string()))
}

pub struct Lexer<'a> {
    cx: &'a MathContext,
    src: Scanner,
    target: Option<&'a str>,
    tokens: Vec<Token>,
    allow_assignment: bool,
    assignment_index: usize,
    is_division: bool,
    unit_division: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(cx: &'a MathContext, text: &'a str, allow_assignment: bool) -> Lexer<'a> {
        let (expr, target) = split_statement(text);
        Lexer{
            cx,
            src: Scanner::new(expr),
            target,
            tokens: Vec::new(),
            allow_assignment,
            assignment_index: 0,
            is_division: false,
            unit_division: false,
        }
    }

    pub fn tokenize(mut self) -> Result<Lexed, MathError> {
        let target = match self.target.map(str::trim) {
            Some(units) if !units.is_empty() => {
                let cx = self.cx;
                Some(Arc::new(unidades::parse_with(units, |name| cx.unit(name))?))
            },
            _ => None,
        };
        loop {
            self.src.ignore_ws();
            let c = match self.src.peek() {
                Some(c) => c,
                None => break,
            };
            match char_class(c) {
                CharClass::Digit => self.scan_number()?,
                CharClass::Letter => self.scan_identifier()?,
                CharClass::Operator => {
                    self.src.next();
                    let op = match c {
                        '·' => '*',
                        '<' if self.src.accept('=') => '≤',
                        '>' if self.src.accept('=') => '≥',
                        '=' if self.src.accept('=') => '≡',
                        c => c,
                    };
                    self.push_operator(op)?;
                },
                CharClass::Exclamation => {
                    self.src.next();
                    if self.src.accept('=') {
                        self.push_operator('≠')?;
                    } else {
                        self.push_factorial()?;
                    }
                },
                CharClass::BracketLeft => {
                    self.src.next();
                    self.is_division = false;
                    self.tokens.push(Token::new(TokenKind::BracketLeft, "("));
                },
                CharClass::BracketRight | CharClass::Divisor => {
                    self.src.next();
                    self.close_unit_division();
                    self.is_division = false;
                    self.tokens.push(match c {
                        ')' => Token::new(TokenKind::BracketRight, ")"),
                        _ => Token::new(TokenKind::Divisor, ";"),
                    });
                },
                CharClass::Dollar => self.scan_solver()?,
                CharClass::Question => self.scan_input()?,
                CharClass::Quote | CharClass::Pipe => break,
                CharClass::Space => { self.src.next(); },
                CharClass::None => return Err(MathError::InvalidSymbol(c)),
            }
        }
        self.close_unit_division();
        log::trace!("lexed {} tokens", self.tokens.len());
        Ok(Lexed{tokens: self.tokens, target, assignment_index: self.assignment_index})
    }

    fn last_kind(&self) -> TokenKind {
        self.tokens.last().map_or(TokenKind::None, |t| t.kind)
    }

    fn close_unit_division(&mut self) {
        if self.unit_division {
            self.unit_division = false;
            self.tokens.push(Token::new(TokenKind::BracketRight, ")"));
        }
    }

    fn push_operator(&mut self, op: char) -> Result<(), MathError> {
        let negation = op == '-' && matches!(self.last_kind(),
            TokenKind::None | TokenKind::BracketLeft | TokenKind::Divisor | TokenKind::Operator);
        if negation {
            self.tokens.push(Token::negation());
            return Ok(());
        }
        if op != '^' {
            self.close_unit_division();
        }
        self.is_division = op == '/' || op == '÷';
        if op == '=' {
            if !self.allow_assignment || self.assignment_index > 0 {
                return Err(MathError::ImproperAssignment);
            }
            self.assignment_index = self.tokens.len();
        }
        self.tokens.push(Token::operator(op));
        Ok(())
    }

    fn push_factorial(&mut self) -> Result<(), MathError> {
        match self.last_kind() {
            TokenKind::Constant | TokenKind::BracketRight | TokenKind::Variable => {
                self.tokens.push(Token::factorial());
                Ok(())
            },
            _ => Err(MathError::MissingOperand),
        }
    }

    fn scan_number(&mut self) -> Result<(), MathError> {
        let literal = self.src.take_while(|c| c.is_ascii_digit() || c == '.');
        let x = parse_number(&literal)?;
        // `3i` is imaginary but `3in` is three inches
        if self.cx.settings.complex && self.src.peek() == Some('i') && self.src.peek_at(1) != Some('n') {
            self.src.next();
            self.tokens.push(Token::constant(Value::complex(0.0, x), format!("{}i", literal)));
            return Ok(());
        }
        self.tokens.push(Token::constant(Value::real(x), literal));
        Ok(())
    }

    fn scan_identifier(&mut self) -> Result<(), MathError> {
        let first = self.src.peek().unwrap_or(' ');
        if !(first.is_alphabetic() || is_unit_symbol(first)) {
            return Err(MathError::InvalidCharacter(first));
        }
        let name = self.src.take_while(|c| {
            c != '.' && matches!(char_class(c), CharClass::Letter | CharClass::Digit)
        });
        match self.src.peek() {
            Some('$') => return Err(MathError::InvalidMacro(name)),
            Some('(') => return self.push_function(&name),
            _ => (),
        }
        if matches!(self.last_kind(), TokenKind::Constant | TokenKind::Input) {
            return self.push_unit_suffix(&name);
        }
        if is_unit_symbol(first) {
            let token = if self.tokens.is_empty() && self.src.peek_non_ws() == Some('=') {
                Token::unit(None, name.as_str())
            } else {
                self.unit_token(&name)?
            };
            self.tokens.push(token);
            return Ok(());
        }
        let var = self.cx.variable(&name);
        self.tokens.push(Token::variable(&name, var));
        Ok(())
    }

    fn unit_token(&self, name: &str) -> Result<Token, MathError> {
        match self.cx.unit(name) {
            Some(unit) => Ok(Token::unit(Some(Value::unit_literal(unit)), name)),
            None => Err(MathError::InvalidUnits(name.to_string())),
        }
    }

    /// `5m` and `5 m` read as five times the unit, `6/2m` as `6/(2m)`.
    fn push_unit_suffix(&mut self, name: &str) -> Result<(), MathError> {
        let unit = self.unit_token(name)?;
        if self.is_division && !self.unit_division {
            let at = self.tokens.len() - 1;
            self.tokens.insert(at, Token::new(TokenKind::BracketLeft, "("));
            self.unit_division = true;
        }
        let mut times = Token::operator('*');
        times.order = UNIT_MULT_ORDER;
        self.tokens.push(times);
        self.tokens.push(unit);
        Ok(())
    }

    fn push_function(&mut self, name: &str) -> Result<(), MathError> {
        let token = if let Some(i) = calculator::function_index(name) {
            Token::function(TokenKind::Function, name, i as isize)
        } else if let Some(i) = calculator::function2_index(name) {
            Token::function(TokenKind::Function2, name, i as isize)
        } else if let Some(i) = calculator::multi_function_index(name) {
            Token::function(TokenKind::MultiFunction, name, i as isize)
        } else if name == "if" {
            Token::function(TokenKind::If, name, -1)
        } else if let Some(i) = self.cx.functions.index_of(name) {
            let mut token = Token::function(TokenKind::CustomFunction, name, i as isize);
            token.param_count = self.cx.functions.param_count(i);
            token
        } else {
            let defining = match self.tokens.first() {
                None => true,
                Some(first) => first.kind == TokenKind::CustomFunction && first.content == name,
            };
            if !defining {
                return Err(MathError::InvalidFunction(name.to_string()));
            }
            Token::function(TokenKind::CustomFunction, name, -1)
        };
        self.tokens.push(token);
        Ok(())
    }

    fn scan_solver(&mut self) -> Result<(), MathError> {
        self.src.next();
        let keyword = self.src.take_while(|c| c != '{');
        if self.src.peek().is_none() {
            return Err(MathError::MissingLeftSolverBracket);
        }
        let keyword = keyword.trim();
        let kind = SolverKind::from_keyword(keyword)
            .ok_or_else(|| MathError::InvalidSolver(format!("${}", keyword)))?;
        let script = self.src.braced().ok_or(MathError::MissingRightSolverBracket)?;
        let index = SolveBlock::create(self.cx, kind, &script)?;
        let mut token = Token::new(TokenKind::Solver, kind.name());
        token.index = index as isize;
        self.tokens.push(token);
        Ok(())
    }

    fn scan_input(&mut self) -> Result<(), MathError> {
        self.src.next();
        let value = if self.src.peek() == Some('{') {
            let inline = self.src.braced().ok_or(MathError::MissingRightBracket)?;
            Some(Value::real(parse_number(&inline)?))
        } else if self.cx.is_enabled() {
            match self.cx.read_input() {
                Some(text) => Some(Value::real(parse_number(&text)?)),
                None => None,
            }
        } else {
            None
        };
        self.tokens.push(Token{value, ..Token::new(TokenKind::Input, "?")});
        Ok(())
    }
}
