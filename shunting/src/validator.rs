use crate::token::{Token, TokenKind};
use crate::MathError;

// Columns and rows of the adjacency table.
fn order_index(t: &Token) -> usize {
    match t.kind {
        TokenKind::None => 0,
        TokenKind::Constant | TokenKind::Variable | TokenKind::Unit
            | TokenKind::Input | TokenKind::Solver => 1,
        TokenKind::Operator => 2,
        TokenKind::Function | TokenKind::Function2 | TokenKind::MultiFunction
            | TokenKind::If | TokenKind::CustomFunction => 3,
        TokenKind::BracketLeft => 4,
        TokenKind::BracketRight => 5,
        TokenKind::Divisor => 6,
    }
}

const T: bool = true;
const F: bool = false;

/// `CORRECT_ORDER[prev][cur]` tells whether `cur` may follow `prev`.
static CORRECT_ORDER: [[bool; 7]; 7] = [
    //  -  val op  fn  (   )   ;
    [T, T, T, T, T, T, T], // none
    [T, F, T, F, F, T, T], // value
    [T, T, F, T, T, F, F], // operator
    [T, T, F, F, T, F, F], // function
    [T, T, F, T, T, F, F], // (
    [T, F, T, F, F, T, T], // )
    [T, T, F, T, T, F, F], // ;
];

// Negation behaves like a prefix function, factorial like a postfix operator.
fn column(t: &Token) -> usize {
    if t.is_negation() {
        3
    } else if t.is_factorial() {
        2
    } else {
        order_index(t)
    }
}

fn row(t: &Token) -> usize {
    if t.is_factorial() { 1 } else { order_index(t) }
}

/// Checks token adjacency, bracket balance and argument counts. Fills in
/// `param_count` of multi-argument calls and reports whether the tokens
/// form a custom function definition.
pub fn check(tokens: &mut [Token]) -> Result<bool, MathError> {
    let header = match tokens.first() {
        Some(t) if t.kind == TokenKind::CustomFunction => Some((t.content.clone(), t.index)),
        _ => None,
    };
    let mut is_definition = false;
    let mut count = 0i32;
    let mut divisors = 0i32;
    let mut first_operator = true;
    // open multi-argument calls: (token, bracket level, divisors before it)
    let mut multi = Vec::<(usize, i32, i32)>::new();
    let none = Token::new(TokenKind::None, "");

    for i in 0..tokens.len() {
        let prev = if i == 0 { &none } else { &tokens[i - 1] };
        let cur = &tokens[i];
        if !CORRECT_ORDER[row(prev)][column(cur)] {
            return Err(MathError::InvalidSyntax(prev.to_string(), cur.to_string()));
        }
        match cur.kind {
            TokenKind::BracketLeft => count += 1,
            TokenKind::BracketRight => {
                count -= 1;
                if count < 0 {
                    return Err(MathError::MissingLeftBracket);
                }
                if let Some(&(at, level, saved)) = multi.last() {
                    if level == count {
                        tokens[at].param_count = (divisors - saved + 1) as usize;
                        divisors = saved;
                        multi.pop();
                    }
                }
            },
            TokenKind::Divisor => divisors += 1,
            TokenKind::Function2 => divisors -= 1,
            TokenKind::If => divisors -= 2,
            TokenKind::CustomFunction => {
                if let Some((name, _)) = &header {
                    if is_definition && &cur.content == name {
                        return Err(MathError::RecursionNotAllowed(name.clone()));
                    }
                }
                if cur.param_count > 1 {
                    divisors -= cur.param_count as i32 - 1;
                }
            },
            TokenKind::MultiFunction => multi.push((i, count, divisors)),
            TokenKind::Operator if cur.is_assignment() => {
                if header.is_some() && !is_definition {
                    is_definition = true;
                    divisors = 0;
                } else {
                    if !matches!(prev.kind, TokenKind::Variable | TokenKind::Unit) {
                        return Err(MathError::AssignmentPreceded);
                    }
                    if !first_operator {
                        return Err(MathError::AssignmentNotFirst);
                    }
                }
                first_operator = false;
            },
            TokenKind::Operator => first_operator = false,
            _ => (),
        }
    }

    if let Some(last) = tokens.last() {
        let dangling = match last.kind {
            TokenKind::Operator | TokenKind::BracketLeft | TokenKind::If
                | TokenKind::Function2 | TokenKind::MultiFunction | TokenKind::CustomFunction => true,
            TokenKind::Function => !last.is_factorial(),
            _ => false,
        };
        if dangling {
            return Err(MathError::IncompleteExpression);
        }
    }
    if let Some((name, -1)) = header {
        if !is_definition {
            return Err(MathError::InvalidFunction(name));
        }
    }
    if count > 0 {
        return Err(MathError::MissingRightBracket);
    }
    if divisors > 0 {
        return Err(MathError::UnexpectedDelimiter);
    }
    if divisors < 0 {
        return Err(MathError::InvalidNumberOfArguments);
    }
    Ok(is_definition)
}
