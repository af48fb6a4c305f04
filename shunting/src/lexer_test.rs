use crate::calculator::UNIT_MULT_ORDER;
use crate::context::MathContext;
use crate::lexer::{Lexed, Lexer};
use crate::settings::Settings;
use crate::token::TokenKind;
use crate::MathError;

fn lex(cx: &MathContext, text: &str) -> Result<Lexed, MathError> {
    Lexer::new(cx, text, true).tokenize()
}

fn kinds(lexed: &Lexed) -> Vec<TokenKind> {
    lexed.tokens.iter().map(|t| t.kind).collect()
}

fn contents(lexed: &Lexed) -> Vec<String> {
    lexed.tokens.iter().map(|t| t.content.clone()).collect()
}

#[test]
fn test_lex_arithmetic() {
    let cx = MathContext::new();
    let lexed = lex(&cx, "2+3*4").unwrap();
    assert_eq!(kinds(&lexed), vec![
        TokenKind::Constant, TokenKind::Operator, TokenKind::Constant,
        TokenKind::Operator, TokenKind::Constant,
    ]);
    assert_eq!(contents(&lexed), vec!["2", "+", "3", "*", "4"]);
    assert_eq!(lexed.assignment_index, 0);
    assert!(lexed.target.is_none());
}

#[test]
fn test_lex_negation() {
    let cx = MathContext::new();
    let lexed = lex(&cx, "-x*(-2)").unwrap();
    assert!(lexed.tokens[0].is_negation());
    assert_eq!(lexed.tokens[1].kind, TokenKind::Variable);
    assert!(lexed.tokens[4].is_negation());
    // binary minus after a value
    let lexed = lex(&cx, "x-2").unwrap();
    assert!(lexed.tokens[1].is_operator("-"));
}

#[test]
fn test_lex_operator_aliases() {
    let cx = MathContext::new();
    let lexed = lex(&cx, "a <= b").unwrap();
    assert!(lexed.tokens[1].is_operator("≤"));
    let lexed = lex(&cx, "a != b").unwrap();
    assert!(lexed.tokens[1].is_operator("≠"));
    let lexed = lex(&cx, "a == b").unwrap();
    assert!(lexed.tokens[1].is_operator("≡"));
    let lexed = lex(&cx, "a·b").unwrap();
    assert!(lexed.tokens[1].is_operator("*"));
}

#[test]
fn test_lex_unit_suffix() {
    let cx = MathContext::new();
    let lexed = lex(&cx, "5m").unwrap();
    assert_eq!(kinds(&lexed), vec![TokenKind::Constant, TokenKind::Operator, TokenKind::Unit]);
    assert_eq!(lexed.tokens[1].order, UNIT_MULT_ORDER);
    assert_eq!(lexed.tokens[2].value.as_ref().map(|v| v.unit_text()), Some("m".to_string()));

    // a number divided by a quantity keeps the quantity together
    let lexed = lex(&cx, "6/2m").unwrap();
    assert_eq!(contents(&lexed), vec!["6", "/", "(", "2", "*", "m", ")"]);
}

#[test]
fn test_lex_target_and_assignment() {
    let cx = MathContext::new();
    let lexed = lex(&cx, "x = 5 | km").unwrap();
    assert_eq!(lexed.assignment_index, 1);
    assert_eq!(lexed.target.as_ref().map(|u| u.text().to_string()), Some("km".to_string()));
    assert_eq!(lexed.tokens.len(), 3);

    assert_eq!(lex(&cx, "x = 1 = 2").unwrap_err(), MathError::ImproperAssignment);
    let no_assignment = Lexer::new(&cx, "x = 1", false).tokenize();
    assert_eq!(no_assignment.unwrap_err(), MathError::ImproperAssignment);
}

#[test]
fn test_lex_comment() {
    let cx = MathContext::new();
    let lexed = lex(&cx, "1 + 2 'three").unwrap();
    assert_eq!(lexed.tokens.len(), 3);
}

#[test]
fn test_lex_factorial() {
    let cx = MathContext::new();
    let lexed = lex(&cx, "3!").unwrap();
    assert!(lexed.tokens[1].is_factorial());
    assert_eq!(lex(&cx, "!3").unwrap_err(), MathError::MissingOperand);
}

#[test]
fn test_lex_functions() {
    let cx = MathContext::new();
    let lexed = lex(&cx, "sin(x) + atan2(1; 2) + max(1; 2; 3) + if(1; 2; 3)").unwrap();
    let kinds = kinds(&lexed);
    assert_eq!(kinds[0], TokenKind::Function);
    assert!(kinds.contains(&TokenKind::Function2));
    assert!(kinds.contains(&TokenKind::MultiFunction));
    assert!(kinds.contains(&TokenKind::If));
    assert_eq!(lex(&cx, "1 + foo(2)").unwrap_err(), MathError::InvalidFunction("foo".into()));
    // the function being defined may reference itself, the validator decides
    let lexed = lex(&cx, "foo(x) = x").unwrap();
    assert_eq!(lexed.tokens[0].kind, TokenKind::CustomFunction);
    assert_eq!(lexed.tokens[0].index, -1);
}

#[test]
fn test_lex_errors() {
    let cx = MathContext::new();
    assert_eq!(lex(&cx, "1 # 2").unwrap_err(), MathError::InvalidSymbol('#'));
    assert_eq!(lex(&cx, "x$").unwrap_err(), MathError::InvalidMacro("x".into()));
    assert_eq!(lex(&cx, "$solve{x@x:0:1}").unwrap_err(), MathError::InvalidSolver("$solve".into()));
    assert_eq!(lex(&cx, "$find").unwrap_err(), MathError::MissingLeftSolverBracket);
    assert_eq!(lex(&cx, "$find{x@x:0:1").unwrap_err(), MathError::MissingRightSolverBracket);
    assert_eq!(lex(&cx, "1..2").unwrap_err(), MathError::InvalidNumber("1..2".into()));
}

#[test]
fn test_lex_input() {
    let cx = MathContext::new();
    let lexed = lex(&cx, "?{5} + 1").unwrap();
    assert_eq!(lexed.tokens[0].kind, TokenKind::Input);
    assert_eq!(lexed.tokens[0].value.as_ref().map(|v| v.re()), Some(5.0));

    cx.set_input_provider(|| Some("7".to_string()));
    let lexed = lex(&cx, "? * 2").unwrap();
    assert_eq!(lexed.tokens[0].value.as_ref().map(|v| v.re()), Some(7.0));

    cx.set_enabled(false);
    let lexed = lex(&cx, "? * 2").unwrap();
    assert!(lexed.tokens[0].value.is_none());
}

#[test]
fn test_lex_imaginary() {
    let cx = MathContext::with_settings(Settings::default().complex(true));
    let lexed = lex(&cx, "3i").unwrap();
    assert_eq!(lexed.tokens.len(), 1);
    assert_eq!(lexed.tokens[0].value.as_ref().map(|v| v.im()), Some(3.0));
}

#[test]
fn test_lex_solver() {
    let cx = MathContext::new();
    let lexed = lex(&cx, "1 + $find{x^2 - 4 @ x : 0 : 10}").unwrap();
    assert_eq!(lexed.tokens[2].kind, TokenKind::Solver);
    assert_eq!(lexed.tokens[2].content, "$Find");
    assert!(lexed.tokens[2].index >= 0);
}
