use std::sync::atomic::Ordering;

use crate::context::MathContext;
use crate::settings::{AngleUnit, Settings};
use crate::value::Value;
use crate::MathError;

fn calc(text: &str) -> f64 {
    MathContext::new().calculate_real(text).unwrap()
}

#[test]
fn test_eval1() {
    fuzzy_eq!(calc("3+4*2/-(1-5)^2^3"), 2.99987792969);
}

#[test]
fn test_eval2() {
    fuzzy_eq!(calc("0.034*sin(60)/(541⦼-4)*max(2; -7)"), 0.058889727457341);
}

#[test]
fn test_eval3() {
    fuzzy_eq!(calc("(-(1-9^2) / (1 + 6^2))^0.5"), 1.470429244187615496759);
}

#[test]
fn test_eval4() {
    fuzzy_eq!(calc("sin(0.345)^2 + cos(0.345)^2"), 1.0);
}

#[test]
fn test_eval5() {
    let cx = MathContext::with_settings(Settings::default().angle(AngleUnit::Rad));
    fuzzy_eq!(cx.calculate_real("sin(e)/cos(e)").unwrap(), -0.4505495340698074);
}

#[test]
fn test_eval_operators() {
    fuzzy_eq!(calc("1 + 4 * 5"), 21.0);
    fuzzy_eq!(calc("2^3"), 8.0);
    fuzzy_eq!(calc("2^-3"), 0.125);
    fuzzy_eq!(calc("-2^3"), -8.0);
    fuzzy_eq!(calc("(-2)^-3"), -0.125);
    fuzzy_eq!(calc("2^3^2"), 512.0);
    fuzzy_eq!(calc("7 \\ 2"), 3.0);
    fuzzy_eq!(calc("7 ÷ 2"), 3.5);
    fuzzy_eq!(calc("2 > 1 ∧ 3 < 2"), 0.0);
    fuzzy_eq!(calc("2 > 1 ∨ 3 < 2"), 1.0);
    fuzzy_eq!(calc("3 ≡ 3"), 1.0);
    fuzzy_eq!(calc("3 != 3"), 0.0);
}

#[test]
fn test_eval_functions() {
    fuzzy_eq!(calc("5!"), 120.0);
    fuzzy_eq!(calc("(1 + 2)! + 1"), 7.0);
    fuzzy_eq!(calc("if(1 < 2; 10; 20)"), 10.0);
    fuzzy_eq!(calc("if(1 > 2; 10; 20)"), 20.0);
    fuzzy_eq!(calc("max(1; 5; 3)"), 5.0);
    fuzzy_eq!(calc("sum(1; 2; 3)"), 6.0);
    fuzzy_eq!(calc("switch(0; 1; 1; 2; 3)"), 2.0);
    fuzzy_eq!(calc("atan2(1; 1)"), 45.0);
    fuzzy_eq!(calc("root(27; 3)"), 3.0);
    assert_eq!(MathContext::new().calculate("2.5!"), Err(MathError::FactorialPositiveInteger));
}

#[test]
fn test_eval_integer_functions() {
    fuzzy_eq!(calc("gcd(12; 18; -30)"), 6.0);
    fuzzy_eq!(calc("lcm(4; 6; -10)"), 60.0);
    fuzzy_eq!(calc("lcm(4; 0)"), 0.0);
    assert_eq!(calc("lcm(4000000000000000000; 3)"), 1.2e19);
    fuzzy_eq!(calc("lcm(3000000000; 5000000000; 7000000001)") / 1.05000000015e20, 1.0);
    assert_eq!(calc("gcd(-9223372036854775808; 0)"), 2f64.powi(63));
    assert!(calc("lcm(9000000000000001; 9000000000000002; 9000000000000003)").is_infinite());

    let cx = MathContext::new();
    assert_eq!(cx.calculate("gcd(10000000000000000000; 2)"),
               Err(MathError::ArgumentOutOfRange("gcd".into())));
    assert_eq!(cx.calculate("lcm(2.5; 2)"), Err(MathError::BothValuesInteger));
}

#[test]
fn test_eval_units() {
    let cx = MathContext::new();
    let v = cx.calculate("1m + 100cm").unwrap();
    fuzzy_eq!(v.re(), 2.0);
    assert_eq!(v.unit_text(), "m");

    let area = cx.calculate("1m*1m").unwrap();
    assert_eq!(area.unit_ref().map(|u| u.dimension().m), Some(2.0));

    assert!(matches!(cx.calculate("1 m + 1 s"), Err(MathError::Units(_))));

    let k = cx.calculate("0 °C | K").unwrap();
    fuzzy_eq!(k.re(), 273.15);
    let f = cx.calculate("0 °C | °F").unwrap();
    fuzzy_eq!(f.re(), 32.0);
    fuzzy_eq!(cx.calculate_real("0 °R | K").unwrap(), 0.0);
    fuzzy_eq!(cx.calculate_real("0 °C | °R").unwrap(), 491.67);
    fuzzy_eq!(cx.calculate_real("0 °R | °C").unwrap(), -273.15);
    fuzzy_eq!(cx.calculate_real("1 °F | °R").unwrap(), 460.67);

    let km = cx.calculate("1500 m | km").unwrap();
    fuzzy_eq!(km.re(), 1.5);
    assert_eq!(cx.calculate("1 s | m"), Err(MathError::InconsistentTargetUnits("s".into(), "m".into())));
}

#[test]
fn test_eval_assignment() {
    let cx = MathContext::new();
    let first = cx.evaluate("x = 5 | km").unwrap();
    assert_eq!(first.value.unit_text(), "km");
    fuzzy_eq!(first.value.re(), 5.0);
    assert_eq!(first.previous, None);

    let second = cx.evaluate("x = 7").unwrap();
    assert_eq!(second.previous.map(|v| v.re()), Some(5.0));
    assert_eq!(cx.getvar("x"), Some(Value::real(7.0)));

    assert!(cx.evaluate("x + 1").unwrap().has_variables);
    assert!(!cx.evaluate("1 + 1").unwrap().has_variables);
    assert!(cx.evaluate("pi").unwrap().has_variables);
}

#[test]
fn test_eval_custom_units() {
    let cx = MathContext::new();
    cx.calculate("€ = 1").unwrap();
    cx.calculate("£ = 1.17€").unwrap();
    let v = cx.calculate("10£ | €").unwrap();
    fuzzy_eq!(v.re(), 11.7);
    assert_eq!(v.unit_text(), "€");
}

#[test]
fn test_eval_stack() {
    let cx = MathContext::new();
    let nested = format!("{}1{}", "1+(".repeat(100), ")".repeat(100));
    assert_eq!(cx.calculate(&nested), Err(MathError::StackOverflow));
    let shallow = format!("{}1{}", "1+(".repeat(50), ")".repeat(50));
    fuzzy_eq!(cx.calculate_real(&shallow).unwrap(), 51.0);
}

#[test]
fn test_eval_undefined() {
    let cx = MathContext::new();
    assert_eq!(cx.calculate("foo + 1"), Err(MathError::UndefinedVariableOrUnits("foo".into())));
    // names that aren't variables fall back to units
    let v = cx.calculate("3*km").unwrap();
    assert_eq!(v.unit_text(), "km");
}

#[test]
fn test_eval_input() {
    let cx = MathContext::new();
    cx.set_input_provider(|| Some("4".to_string()));
    fuzzy_eq!(cx.calculate_real("? * 2").unwrap(), 8.0);
    fuzzy_eq!(cx.calculate_real("?{1.5} * 2").unwrap(), 3.0);

    cx.set_enabled(false);
    assert_eq!(cx.calculate("1 + 1"), Err(MathError::CalculationsNotActive));
    cx.set_enabled(true);
    fuzzy_eq!(cx.calculate_real("1 + 1").unwrap(), 2.0);
}

#[test]
fn test_eval_cancel() {
    let cx = MathContext::new();
    cx.cancel_token().store(true, Ordering::Relaxed);
    assert_eq!(cx.calculate("1 + 1"), Err(MathError::InterruptedByUser));
    fuzzy_eq!(cx.calculate_real("1 + 1").unwrap(), 2.0);
}

#[test]
fn test_eval_complex() {
    let cx = MathContext::with_settings(Settings::default().complex(true));
    let z = cx.calculate("sqrt(-4)").unwrap();
    fuzzy_eq!(z.re(), 0.0);
    fuzzy_eq!(z.im(), 2.0);
    assert_eq!(cx.calculate("sqrt(0 - 4)").unwrap().im(), z.im());
    fuzzy_eq!(cx.calculate("-sqrt(-9)").unwrap().im(), -3.0);
    fuzzy_eq!(cx.calculate_real("i*i").unwrap(), -1.0);
    let w = cx.calculate("(1 + 2i)*(3 - i)").unwrap();
    assert_eq!(w.to_string(), "5 + 5i");
    assert!(matches!(cx.calculate_real("2i"), Err(MathError::ResultNotReal(_))));
}

#[test]
fn test_eval_return_angles() {
    let cx = MathContext::new();
    fuzzy_eq!(cx.calculate_real("asin(1)").unwrap(), 90.0);
    cx.setvar("ReturnAngleUnits", Value::real(1.0));
    let angle = cx.calculate("asin(1)").unwrap();
    fuzzy_eq!(angle.re(), 90.0);
    assert_eq!(angle.unit_text(), "°");
}
