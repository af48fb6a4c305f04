use thiserror::Error;
use unidades::UnitError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MathError {
    #[error(transparent)]
    Units(#[from] UnitError),

    // lexical
    #[error("Invalid symbol '{0}'.")]
    InvalidSymbol(char),
    #[error("Invalid character '{0}'. Variables, functions and units must begin with a letter.")]
    InvalidCharacter(char),
    #[error("Cannot evaluate \"{0}\" as number.")]
    InvalidNumber(String),
    #[error("Invalid units: \"{0}\".")]
    InvalidUnits(String),
    #[error("Invalid macro identifier \"{0}$\".")]
    InvalidMacro(String),
    #[error("Invalid solver \"{0}\".")]
    InvalidSolver(String),
    #[error("Missing left bracket '{{' in solver command.")]
    MissingLeftSolverBracket,
    #[error("Missing right bracket '}}' in solver command.")]
    MissingRightSolverBracket,
    #[error("Improper use of the assignment operator '='.")]
    ImproperAssignment,

    // syntax
    #[error("Invalid syntax: \"{0} {1}\".")]
    InvalidSyntax(String, String),
    #[error("Incomplete expression.")]
    IncompleteExpression,
    #[error("Missing left bracket '('.")]
    MissingLeftBracket,
    #[error("Missing right bracket ')'.")]
    MissingRightBracket,
    #[error("Unexpected delimiter ';'.")]
    UnexpectedDelimiter,
    #[error("Invalid number of arguments.")]
    InvalidNumberOfArguments,
    #[error("Missing operand.")]
    MissingOperand,
    #[error("Invalid function: \"{0}\".")]
    InvalidFunction(String),
    #[error("The assignment '=' must be preceded by a variable or unit.")]
    AssignmentPreceded,
    #[error("The assignment '=' must be the first operator in the expression.")]
    AssignmentNotFirst,
    #[error("Recursion is not allowed in function definition: \"{0}\".")]
    RecursionNotAllowed(String),
    #[error("Missing parameter in function definition.")]
    MissingFunctionParameter,
    #[error("Missing delimiter in function definition.")]
    MissingFunctionDelimiter,
    #[error("Invalid token in function definition: \"{0}\".")]
    InvalidFunctionToken(String),
    #[error("Invalid function definition. It have to match the pattern: \"f(x; y; z...) =\".")]
    InvalidFunctionDefinition,
    #[error("Function definitions are not allowed inside solver blocks.")]
    FunctionDefinitionInSolver,
    #[error("Circular reference detected for function \"{0}\".")]
    CircularReference(String),

    // runtime
    #[error("Expression is empty.")]
    ExpressionEmpty,
    #[error("Stack memory leak. Invalid expression.")]
    StackLeak,
    #[error("Stack empty. Invalid expression.")]
    StackEmpty,
    #[error("Stack overflow. The expression is nested too deeply.")]
    StackOverflow,
    #[error("Undefined input field.")]
    UndefinedInputField,
    #[error("Undefined variable or units: \"{0}\".")]
    UndefinedVariableOrUnits(String),
    #[error("Function not defined: \"{0}\".")]
    FunctionNotDefined(String),
    #[error("The calculated units \"{0}\" are inconsistent with the target units \"{1}\".")]
    InconsistentTargetUnits(String, String),
    #[error("Invalid units for function: \"{0}({1})\".")]
    InvalidUnitsFunction(String, String),
    #[error("Power must be unitless.")]
    PowerNotUnitless,
    #[error("Units cannot be raised to a complex power.")]
    UnitsToComplexPower,
    #[error("Root index must be an integer greater than 1.")]
    RootInteger,
    #[error("Root index must be unitless.")]
    RootUnitless,
    #[error("Factorial argument must be unitless.")]
    FactorialUnitless,
    #[error("Factorial argument must be a positive integer.")]
    FactorialPositiveInteger,
    #[error("Factorial argument is out of range.")]
    FactorialOutOfRange,
    #[error("Both values must be integers.")]
    BothValuesInteger,
    #[error("The argument of \"{0}\" is out of range.")]
    ArgumentOutOfRange(String),
    #[error("The result is not a real number: \"{0}\".")]
    ResultNotReal(String),
    #[error("Calculations are not active.")]
    CalculationsNotActive,
    #[error("Interrupted by user.")]
    InterruptedByUser,

    // solver blocks
    #[error("Missing delimiter \"{0}\" in solver command {{{1}}}.")]
    MissingDelimiter(char, String),
    #[error("Invalid variable \"{0}\" in solver command.")]
    InvalidSolverVariable(String),
    #[error("More than one operators '=' in '{0}'.")]
    MultipleAssignments(String),
    #[error("The expression on the right side must be constant: \"{0}\".")]
    NotConstantExpression(String),
    #[error("Inconsistent units for \"{0} = {1}\".")]
    InconsistentUnits1(String, String),
    #[error("Inconsistent units for \"{0} = {1} : {2}\".")]
    InconsistentUnits2(String, String, String),
    #[error("Limits out of range for \"{0} : {1}\".")]
    IterationLimits(String, String),
    #[error("No solution for: {0}.")]
    NoSolution(String),
    #[error("The function f(%V) = %F is not defined for %V = {0}.")]
    NotDefinedAt(String),
    #[error("Cannot evaluate the function f(%V) = %F for %V = {0}.")]
    CannotEvaluateAt(String),
    #[error("Inconsistent units \"{0}\" and \"{1}\".")]
    InconsistentUnits(String, String),
    #[error("{0}")]
    Solver(String),
}

impl MathError {
    /// Messages raised by the numeric methods may carry the placeholders
    /// `%F` (objective) and `%V` (variable), filled in by the solve block.
    pub(crate) fn with_placeholders(self, objective: &str, variable: &str) -> MathError {
        let message = self.to_string();
        if message.contains("%F") || message.contains("%V") {
            MathError::Solver(message.replace("%F", objective).replace("%V", variable))
        } else {
            self
        }
    }
}
