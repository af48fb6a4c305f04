use crate::compiler;
use crate::context::MathContext;
use crate::value::Value;
use crate::MathError;

#[test]
fn test_compile_params() {
    let cx = MathContext::new();
    let f = cx.compile("x^2 + 1", &["x"]).unwrap();
    assert_eq!(f.param_count(), 1);
    fuzzy_eq!(f.call(&cx, &[Value::real(3.0)]).unwrap().re(), 10.0);
    fuzzy_eq!(f.call(&cx, &[Value::real(-2.0)]).unwrap().re(), 5.0);

    let g = cx.compile("x*y - 1", &["x", "y"]).unwrap();
    fuzzy_eq!(g.call(&cx, &[Value::real(2.0), Value::real(4.0)]).unwrap().re(), 7.0);
    assert_eq!(g.call(&cx, &[Value::real(2.0)]), Err(MathError::InvalidNumberOfArguments));
}

#[test]
fn test_compile_globals() {
    let cx = MathContext::new();
    cx.setvar("b", Value::real(2.0));
    let f = cx.compile("b*x", &["x"]).unwrap();
    fuzzy_eq!(f.call(&cx, &[Value::real(3.0)]).unwrap().re(), 6.0);
    cx.setvar("b", Value::real(5.0));
    fuzzy_eq!(f.call(&cx, &[Value::real(3.0)]).unwrap().re(), 15.0);
}

#[test]
fn test_compile_units() {
    let cx = MathContext::new();
    let f = cx.compile("x*m", &["x"]).unwrap();
    let v = f.call(&cx, &[Value::real(2.0)]).unwrap();
    fuzzy_eq!(v.re(), 2.0);
    assert_eq!(v.unit_text(), "m");

    let g = cx.compile("x*1m | cm", &["x"]).unwrap();
    fuzzy_eq!(g.call(&cx, &[Value::real(2.0)]).unwrap().re(), 200.0);
}

#[test]
fn test_compile_folding() {
    let cx = MathContext::new();
    // constant parts are evaluated while compiling
    let rpn = cx.parse("2*3 + sin(30)").unwrap().rpn;
    let f = compiler::compile(&cx, &rpn).unwrap();
    fuzzy_eq!(f(&cx).unwrap().re(), 6.5);

    let rpn = cx.parse("x + (1 m + 1 s)").unwrap().rpn;
    assert!(matches!(compiler::compile(&cx, &rpn), Err(MathError::Units(_))));

    let rpn = cx.parse("if(1; 2; 1/0)").unwrap().rpn;
    fuzzy_eq!(compiler::compile(&cx, &rpn).unwrap()(&cx).unwrap().re(), 2.0);
}

#[test]
fn test_compile_custom_calls() {
    let cx = MathContext::new();
    cx.parse("f(x) = x + 1").unwrap();
    let g = cx.compile("f(2)*y", &["y"]).unwrap();
    fuzzy_eq!(g.call(&cx, &[Value::real(2.0)]).unwrap().re(), 6.0);
    // calls are never folded so a redefinition shows through
    cx.parse("f(x) = x + 10").unwrap();
    fuzzy_eq!(g.call(&cx, &[Value::real(2.0)]).unwrap().re(), 24.0);
}

#[test]
fn test_compile_errors() {
    let cx = MathContext::new();
    assert!(matches!(cx.compile("x = 1", &["x"]), Err(MathError::ImproperAssignment)));
    assert!(matches!(cx.compile("", &[]), Err(MathError::ExpressionEmpty)));
    let f = cx.compile("x + z", &["x"]).unwrap();
    assert_eq!(f.call(&cx, &[Value::real(1.0)]), Err(MathError::UndefinedVariableOrUnits("z".into())));
}
