// Parser for unit expressions such as `kN·m/s^2` or `1000*m`.
// The expression is tokenized, checked against an adjacency table,
// reordered into RPN by precedence and folded into a single Unit.

use std::sync::Arc;

use crate::registry;
use crate::si_units::Unit;
use crate::UnitError;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Kind {
    None,
    Constant,
    Units,
    Operator,
    BracketLeft,
    BracketRight,
}

#[derive(Clone, Debug, PartialEq)]
struct Token {
    kind: Kind,
    text: String,
}

impl Token {
    fn new(kind: Kind, text: impl Into<String>) -> Token {
        Token{kind, text: text.into()}
    }

    // ^ binds tighter than /, which binds tighter than *
    fn order(&self) -> u8 {
        match self.text.as_str() {
            "^" => 0,
            "/" => 1,
            _ => 2,
        }
    }
}

pub fn is_currency(c: char) -> bool {
    matches!(c, '$' | '¢' | '£' | '¤' | '¥' | '₠'..='₿')
}

pub fn is_unit_char(c: char) -> bool {
    c.is_alphabetic() || "_°′″‴⁗℧%‰‱Δ".contains(c) || is_currency(c)
}

fn tokenize(text: &str) -> Result<Vec<Token>, UnitError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => (),
            '*' | '·' => tokens.push(Token::new(Kind::Operator, "*")),
            '/' | '^' => tokens.push(Token::new(Kind::Operator, c.to_string())),
            '(' => tokens.push(Token::new(Kind::BracketLeft, "(")),
            ')' => tokens.push(Token::new(Kind::BracketRight, ")")),
            c if c.is_ascii_digit() || c == '-' || c == '.' => {
                let mut number = c.to_string();
                while let Some(&n) = chars.peek() {
                    if !(n.is_ascii_digit() || n == '.') { break; }
                    number.push(n);
                    chars.next();
                }
                tokens.push(Token::new(Kind::Constant, number));
            },
            c if is_unit_char(c) => {
                let mut name = c.to_string();
                while let Some(&n) = chars.peek() {
                    if !is_unit_char(n) { break; }
                    name.push(n);
                    chars.next();
                }
                tokens.push(Token::new(Kind::Units, name));
            },
            _ => return Err(UnitError::InvalidSymbol(c)),
        }
    }
    Ok(tokens)
}

fn validate(tokens: &[Token]) -> Result<(), UnitError> {
    use Kind::*;
    // rows: previous token, columns: current token
    const LEGAL: [[bool; 6]; 6] = [
        [true, true, true, true, true, true],
        [true, false, false, true, false, true],
        [true, false, false, true, false, true],
        [true, true, true, false, true, false],
        [true, true, true, false, true, false],
        [true, false, false, true, false, true],
    ];
    let index = |k: Kind| match k {
        None => 0,
        Constant => 1,
        Units => 2,
        Operator => 3,
        BracketLeft => 4,
        BracketRight => 5,
    };
    let mut brackets = 0;
    let mut prev = Token::new(None, "");
    for t in tokens {
        if !LEGAL[index(prev.kind)][index(t.kind)] {
            return Err(UnitError::Syntax{prev: prev.text, cur: t.text.clone()});
        }
        match t.kind {
            BracketLeft => brackets += 1,
            BracketRight if brackets == 0 => return Err(UnitError::MissingLeftBracket),
            BracketRight => brackets -= 1,
            _ => (),
        }
        prev = t.clone();
    }
    if matches!(prev.kind, Operator | BracketLeft) {
        return Err(UnitError::IncompleteExpression);
    }
    if brackets > 0 {
        return Err(UnitError::MissingRightBracket);
    }
    Ok(())
}

fn to_rpn(tokens: Vec<Token>) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut stack: Vec<Token> = Vec::new();
    for t in tokens {
        match t.kind {
            Kind::Constant | Kind::Units => out.push(t),
            Kind::BracketLeft => stack.push(t),
            Kind::BracketRight => {
                while let Some(top) = stack.pop() {
                    if top.kind == Kind::BracketLeft { break; }
                    out.push(top);
                }
            },
            Kind::Operator => {
                while let Some(top) = stack.last() {
                    if top.kind == Kind::BracketLeft || top.order() > t.order() {
                        break;
                    }
                    out.extend(stack.pop());
                }
                stack.push(t);
            },
            Kind::None => (),
        }
    }
    while let Some(top) = stack.pop() {
        out.push(top);
    }
    out
}

#[derive(Clone, Debug)]
enum Operand {
    Number(f64),
    Unit(Unit),
}

fn apply(op: &str, a: Operand, b: Operand) -> Result<Operand, UnitError> {
    use Operand::*;
    Ok(match (op, a, b) {
        ("^", _, Unit(_)) => return Err(UnitError::PowerNotUnitless),
        ("^", Number(a), Number(n)) => Number(a.powf(n)),
        ("^", Unit(u), Number(n)) => Unit(u.pow(n as f32)),
        ("*", Number(a), Number(b)) => Number(a * b),
        ("*", Number(k), Unit(u)) | ("*", Unit(u), Number(k)) => Unit(u.scaled(k)),
        ("*", Unit(a), Unit(b)) => Unit(a.combine(&b, 1.0)),
        ("/", Number(a), Number(b)) => Number(a / b),
        ("/", Number(k), Unit(u)) => Unit(u.pow(-1.0).scaled(k)),
        ("/", Unit(u), Number(k)) => Unit(u.scaled(1.0 / k)),
        ("/", Unit(a), Unit(b)) => Unit(a.combine(&b, -1.0)),
        _ => return Err(UnitError::IncompleteExpression),
    })
}

fn evaluate<F>(rpn: Vec<Token>, lookup: F) -> Result<Unit, UnitError>
    where F: Fn(&str) -> Option<Arc<Unit>>
{
    let mut operands = Vec::new();
    for t in rpn {
        match t.kind {
            Kind::Constant => {
                let n = t.text.parse::<f64>()
                    .map_err(|_| UnitError::InvalidNumber(t.text.clone()))?;
                operands.push(Operand::Number(n));
            },
            Kind::Units => {
                let u = lookup(&t.text).ok_or_else(|| UnitError::InvalidUnits(t.text.clone()))?;
                operands.push(Operand::Unit(u.as_ref().clone()));
            },
            _ => {
                let b = operands.pop().ok_or(UnitError::MissingOperand)?;
                let a = operands.pop().ok_or(UnitError::MissingOperand)?;
                operands.push(apply(&t.text, a, b)?);
            },
        }
    }
    match operands.pop() {
        Some(Operand::Unit(u)) if operands.is_empty() => Ok(u),
        Some(_) if !operands.is_empty() => Err(UnitError::MissingOperand),
        _ => Err(UnitError::NotUnits),
    }
}

/// Parses a unit expression resolving unit names with `lookup`. A trailing
/// `:format` is split off and attached to the resulting unit.
pub fn parse_with<F>(text: &str, lookup: F) -> Result<Unit, UnitError>
    where F: Fn(&str) -> Option<Arc<Unit>>
{
    let (expr, format) = match text.split_once(':') {
        Some((expr, format)) => (expr, Some(format.trim())),
        None => (text, None),
    };
    let tokens = tokenize(expr)?;
    validate(&tokens)?;
    let unit = evaluate(to_rpn(tokens), lookup)?;
    log::trace!("parsed units {:?} as {}", text, unit);
    Ok(match format {
        Some(f) if !f.is_empty() => unit.with_format(f),
        _ => unit,
    })
}

/// Parses a unit expression against the built in units.
pub fn parse(text: &str) -> Result<Unit, UnitError> {
    parse_with(text, registry::lookup)
}
