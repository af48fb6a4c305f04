use std::fmt;

use crate::calculator::{self, FACT, NEG, NEGATE};
use crate::value::Value;
use crate::variable::VarRef;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    None,
    Constant,
    Variable,
    Unit,
    Input,
    Operator,
    Function,
    Function2,
    MultiFunction,
    If,
    CustomFunction,
    BracketLeft,
    BracketRight,
    Divisor,
    Solver,
}

#[derive(Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub content: String,
    /// Opcode, custom function or solve block index; -1 when unresolved.
    pub index: isize,
    /// Lower binds tighter; -1 until operators are ordered.
    pub order: i8,
    pub value: Option<Value>,
    pub var: Option<VarRef>,
    pub param_count: usize,
}

impl Token {
    pub fn new(kind: TokenKind, content: impl Into<String>) -> Token {
        Token{
            kind,
            content: content.into(),
            index: -1,
            order: -1,
            value: None,
            var: None,
            param_count: 0,
        }
    }

    pub fn constant(value: Value, content: impl Into<String>) -> Token {
        Token{value: Some(value), ..Token::new(TokenKind::Constant, content)}
    }

    /// A unit literal; `value` is None for the target of a unit definition.
    pub fn unit(value: Option<Value>, content: impl Into<String>) -> Token {
        Token{value, ..Token::new(TokenKind::Unit, content)}
    }

    pub fn variable(name: &str, var: VarRef) -> Token {
        Token{var: Some(var), ..Token::new(TokenKind::Variable, name)}
    }

    pub fn operator(op: char) -> Token {
        let index = calculator::operator_index(op).map_or(-1, |i| i as isize);
        Token{index, ..Token::new(TokenKind::Operator, op.to_string())}
    }

    pub fn negation() -> Token {
        Token{index: NEG as isize, ..Token::new(TokenKind::Operator, NEGATE)}
    }

    pub fn factorial() -> Token {
        Token{index: FACT as isize, ..Token::new(TokenKind::Function, "!")}
    }

    pub fn function(kind: TokenKind, name: &str, index: isize) -> Token {
        Token{index, ..Token::new(kind, name)}
    }

    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.content == op
    }

    pub fn is_negation(&self) -> bool {
        self.is_operator(NEGATE)
    }

    pub fn is_factorial(&self) -> bool {
        self.kind == TokenKind::Function && self.content == "!"
    }

    pub fn is_assignment(&self) -> bool {
        self.is_operator("=")
    }

    /// The placeholder left for the unit being defined in `€ = 1`.
    pub fn is_unit_placeholder(&self) -> bool {
        self.kind == TokenKind::Unit && self.value.is_none()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            _ if self.is_negation() => write!(f, "-"),
            TokenKind::Constant => match &self.value {
                Some(v) if self.content.is_empty() => write!(f, "{}", v),
                _ => write!(f, "{}", self.content),
            },
            _ => write!(f, "{}", self.content),
        }
    }
}

/// A statement in postfix order.
#[derive(Clone, Debug, Default)]
pub struct RPNExpr(pub Vec<Token>);

impl RPNExpr {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the expression is a single literal.
    pub fn is_constant(&self) -> bool {
        matches!(self.0.as_slice(), [t] if t.kind == TokenKind::Constant)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharClass {
    None,
    Digit,
    Letter,
    Operator,
    Space,
    BracketLeft,
    BracketRight,
    Divisor,
    Dollar,
    Question,
    Exclamation,
    Quote,
    Pipe,
}

const fn ascii_classes() -> [CharClass; 128] {
    let mut table = [CharClass::None; 128];
    let mut i = 0;
    while i < 128 {
        table[i] = match i as u8 {
            b'0'..=b'9' | b'.' => CharClass::Digit,
            b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'%' => CharClass::Letter,
            b'^' | b'/' | b'\\' | b'*' | b'-' | b'+' | b'<' | b'>' | b'=' => CharClass::Operator,
            b' ' | b'\t' | b'\r' | b'\n' => CharClass::Space,
            b'(' => CharClass::BracketLeft,
            b')' => CharClass::BracketRight,
            b';' => CharClass::Divisor,
            b'$' => CharClass::Dollar,
            b'?' => CharClass::Question,
            b'!' => CharClass::Exclamation,
            b'\'' | b'"' => CharClass::Quote,
            b'|' => CharClass::Pipe,
            _ => CharClass::None,
        };
        i += 1;
    }
    table
}

static CHAR_CLASS: [CharClass; 128] = ascii_classes();

pub fn char_class(c: char) -> CharClass {
    if c.is_ascii() {
        CHAR_CLASS[c as usize]
    } else if c == '·' || calculator::is_operator(c) {
        CharClass::Operator
    } else if unidades::is_unit_char(c) {
        CharClass::Letter
    } else if c.is_whitespace() {
        CharClass::Space
    } else {
        CharClass::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes() {
        assert_eq!(char_class('7'), CharClass::Digit);
        assert_eq!(char_class('x'), CharClass::Letter);
        assert_eq!(char_class('°'), CharClass::Letter);
        assert_eq!(char_class('€'), CharClass::Letter);
        assert_eq!(char_class('α'), CharClass::Letter);
        assert_eq!(char_class('≤'), CharClass::Operator);
        assert_eq!(char_class('·'), CharClass::Operator);
        assert_eq!(char_class('$'), CharClass::Dollar);
        assert_eq!(char_class('#'), CharClass::None);
    }
}
