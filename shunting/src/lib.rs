//! Evaluation core of a unit aware expression language: statements are
//! lexed, validated, turned into postfix by a shunting yard and then either
//! interpreted on a bounded stack or compiled into closures.

#[cfg(test)]
macro_rules! fuzzy_eq {
    ($lhs:expr, $rhs:expr) => { assert!(($lhs - $rhs).abs() < 1.0e-10, "{} != {}", $lhs, $rhs) };
    ($lhs:expr, $rhs:expr, $eps:expr) => { assert!(($lhs - $rhs).abs() < $eps, "{} != {}", $lhs, $rhs) };
}

pub use calculator::Calculator;
pub use context::{CompiledExpr, Evaluation, MathContext, PlotSettings, Statement};
pub use error::MathError;
pub use function::FunctionStats;
pub use parser::ShuntingParser;
pub use settings::{AngleUnit, Settings};
pub use solve_block::SolverKind;
pub use token::{RPNExpr, Token, TokenKind};
pub use value::Value;

pub mod calculator;
mod compiler;
mod context;
mod error;
mod function;
mod lexer;
pub mod parser;
mod rpneval;
mod rpnprint;
mod scanner;
mod settings;
mod solve_block;
mod solver;
mod token;
mod validator;
mod value;
mod variable;

#[cfg(test)]
mod lexer_test;
#[cfg(test)]
mod rpneval_test;
#[cfg(test)]
mod compiler_test;
#[cfg(test)]
mod function_test;
#[cfg(test)]
mod session_test;
