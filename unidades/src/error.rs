use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnitError {
    #[error("Invalid symbol '{0}'.")]
    InvalidSymbol(char),
    #[error("Invalid units: \"{0}\".")]
    InvalidUnits(String),
    #[error("Cannot evaluate \"{0}\" as number.")]
    InvalidNumber(String),
    #[error("Invalid syntax: \"{prev} {cur}\".")]
    Syntax { prev: String, cur: String },
    #[error("Missing left bracket '('.")]
    MissingLeftBracket,
    #[error("Missing right bracket ')'.")]
    MissingRightBracket,
    #[error("Incomplete expression.")]
    IncompleteExpression,
    #[error("Missing operand.")]
    MissingOperand,
    #[error("Power must be unitless.")]
    PowerNotUnitless,
    #[error("This expression does not evaluate to units.")]
    NotUnits,
    #[error("Inconsistent units \"{lhs} {op} {rhs}\".")]
    Inconsistent { lhs: String, op: char, rhs: String },
}
