use crate::context::MathContext;
use crate::function::MAX_CACHE_SIZE;
use crate::FunctionStats;
use crate::MathError;

fn session(definitions: &[&str]) -> MathContext {
    let cx = MathContext::new();
    for text in definitions {
        cx.calculate(text).unwrap();
    }
    cx
}

#[test]
fn test_function_definition() {
    let cx = MathContext::new();
    let statement = cx.parse("f(x) = x^2 + 1").unwrap();
    assert!(statement.is_function_definition());
    assert_eq!(statement.to_string(), "f(x) = x^2 + 1");
    assert!(cx.eval(&statement).unwrap().value.is_nan());
    fuzzy_eq!(cx.calculate_real("f(3)").unwrap(), 10.0);
    fuzzy_eq!(cx.calculate_real("2*f(1) + f(0)").unwrap(), 5.0);
}

#[test]
fn test_function_cache() {
    let cx = session(&["f(x) = x^2"]);
    fuzzy_eq!(cx.calculate_real("f(3)").unwrap(), 9.0);
    fuzzy_eq!(cx.calculate_real("f(3)").unwrap(), 9.0);
    assert_eq!(cx.function_stats("f"), Some(FunctionStats{hits: 1, misses: 1, cached: 1}));
    fuzzy_eq!(cx.calculate_real("f(4)").unwrap(), 16.0);
    assert_eq!(cx.function_stats("f").map(|s| s.cached), Some(2));
    assert_eq!(cx.function_stats("nope"), None);
}

#[test]
fn test_function_cache_limit() {
    let cx = session(&["f(x) = x + 1"]);
    for i in 0..MAX_CACHE_SIZE {
        cx.calculate(&format!("f({})", i)).unwrap();
    }
    assert_eq!(cx.function_stats("f").map(|s| s.cached), Some(MAX_CACHE_SIZE));
    // a full cache is dropped before the next statement runs
    cx.calculate("f(-1)").unwrap();
    assert_eq!(cx.function_stats("f").map(|s| s.cached), Some(1));
}

#[test]
fn test_function_two_params() {
    let cx = session(&["r(x; y) = x*y + 1"]);
    fuzzy_eq!(cx.calculate_real("r(2; 3)").unwrap(), 7.0);
    fuzzy_eq!(cx.calculate_real("r(2; 3)").unwrap(), 7.0);
    assert_eq!(cx.function_stats("r").map(|s| s.hits), Some(1));
    assert_eq!(cx.calculate("r(1)"), Err(MathError::InvalidNumberOfArguments));

    let cx = session(&["v(x; y; z) = x + y + z"]);
    fuzzy_eq!(cx.calculate_real("v(1; 2; 3)").unwrap(), 6.0);
    fuzzy_eq!(cx.calculate_real("v(1; 2; 3)").unwrap(), 6.0);
    // three parameters aren't cached
    assert_eq!(cx.function_stats("v").map(|s| (s.hits, s.cached)), Some((0, 0)));
}

#[test]
fn test_function_units() {
    let cx = session(&["len(x) = x*1m | cm"]);
    let v = cx.calculate("len(2)").unwrap();
    fuzzy_eq!(v.re(), 200.0);
    assert_eq!(v.unit_text(), "cm");

    // same number, different units, different cache entries
    let cx = session(&["twice(x) = 2*x"]);
    assert_eq!(cx.calculate("twice(1m)").unwrap().unit_text(), "m");
    assert_eq!(cx.calculate("twice(1s)").unwrap().unit_text(), "s");
}

#[test]
fn test_function_invalidation() {
    let cx = session(&["b = 2", "g(x) = b*x", "h(x) = g(x) + 1"]);
    fuzzy_eq!(cx.calculate_real("g(3)").unwrap(), 6.0);
    fuzzy_eq!(cx.calculate_real("h(3)").unwrap(), 7.0);
    cx.calculate("b = 5").unwrap();
    fuzzy_eq!(cx.calculate_real("g(3)").unwrap(), 15.0);
    fuzzy_eq!(cx.calculate_real("h(3)").unwrap(), 16.0);
}

#[test]
fn test_function_redefinition() {
    let cx = session(&["k(x) = x + 1", "w(x) = k(x)*2"]);
    fuzzy_eq!(cx.calculate_real("w(1)").unwrap(), 4.0);
    cx.calculate("k(x) = x + 10").unwrap();
    fuzzy_eq!(cx.calculate_real("w(1)").unwrap(), 22.0);

    // a different number of parameters makes a new function
    cx.calculate("k(x; y) = x + y").unwrap();
    fuzzy_eq!(cx.calculate_real("k(1; 2)").unwrap(), 3.0);
    fuzzy_eq!(cx.calculate_real("w(1)").unwrap(), 22.0);
}

#[test]
fn test_function_recursion() {
    let cx = MathContext::new();
    assert_eq!(cx.parse("f(x) = f(x) + 1").unwrap_err(), MathError::RecursionNotAllowed("f".into()));

    let cx = session(&["p(x) = x + 1", "q(x) = p(x)*2"]);
    assert_eq!(cx.parse("p(x) = q(x)").unwrap_err(), MathError::CircularReference("p".into()));
    // the definition is kept but evaluates to nothing
    assert!(cx.calculate("p(1)").unwrap().is_nan());
    assert!(cx.calculate("q(1)").unwrap().is_nan());
}

#[test]
fn test_function_header_errors() {
    let cx = MathContext::new();
    assert_eq!(cx.parse("f(x; x) = x").unwrap_err(), MathError::InvalidFunctionToken("x".into()));
    assert_eq!(cx.parse("f(x; ) = x").unwrap_err(), MathError::InvalidSyntax(";".into(), ")".into()));
    assert_eq!(cx.parse("f(2) = 3").unwrap_err(), MathError::InvalidFunctionToken("2".into()));
    assert_eq!(cx.parse("f(x y) = x").unwrap_err(), MathError::InvalidSyntax("x".into(), "y".into()));
    assert_eq!(cx.parse("foo(1)").unwrap_err(), MathError::InvalidFunction("foo".into()));
}

#[test]
fn test_function_in_solver() {
    let cx = MathContext::new();
    let err = cx.parse("$repeat{f(x) = x @ x : 0 : 1}").unwrap_err();
    assert_eq!(err, MathError::FunctionDefinitionInSolver);
    let err = cx.parse("$find{f(x) = x @ x : 0 : 1}").unwrap_err();
    assert_eq!(err, MathError::ImproperAssignment);
}
