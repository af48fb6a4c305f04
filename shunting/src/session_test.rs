use proptest::prelude::*;

use crate::context::{MathContext, PlotSettings};
use crate::settings::Settings;
use crate::value::Value;
use crate::MathError;

#[derive(Clone, Debug)]
enum Tree {
    Num(u8),
    Neg(Box<Tree>),
    Bin(char, Box<Tree>, Box<Tree>),
}

impl Tree {
    // fully bracketed so the source fixes the evaluation order
    fn text(&self) -> String {
        match self {
            Tree::Num(n) => n.to_string(),
            Tree::Neg(a) => format!("-({})", a.text()),
            Tree::Bin(op, a, b) => format!("({} {} {})", a.text(), op, b.text()),
        }
    }
}

fn tree_strategy() -> impl Strategy<Value = Tree> {
    let leaf = (1u8..10).prop_map(Tree::Num);
    leaf.prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|a| Tree::Neg(Box::new(a))),
            (prop_oneof![Just('+'), Just('-'), Just('*')], inner.clone(), inner)
                .prop_map(|(op, a, b)| Tree::Bin(op, Box::new(a), Box::new(b))),
        ]
    })
}

fn render(cx: &MathContext, text: &str) -> String {
    cx.render(&cx.parse(text).unwrap().rpn)
}

proptest! {
    #[test]
    fn printed_expressions_keep_their_value(tree in tree_strategy()) {
        let cx = MathContext::new();
        let source = tree.text();
        let printed = render(&cx, &source);
        let a = cx.calculate_real(&source).unwrap();
        let b = cx.calculate_real(&printed).unwrap();
        prop_assert_eq!(a, b, "{} printed as {}", source, printed);
    }

    #[test]
    fn printing_is_idempotent(tree in tree_strategy()) {
        let cx = MathContext::new();
        let once = render(&cx, &tree.text());
        let twice = render(&cx, &once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn compiled_matches_interpreted(tree in tree_strategy(), x in -50i32..50) {
        let cx = MathContext::new();
        let source = format!("{} + x*{}", tree.text(), tree.text());
        let f = cx.compile(&source, &["x"]).unwrap();
        let compiled = f.call(&cx, &[Value::real(x as f64)]).unwrap();
        cx.setvar("x", Value::real(x as f64));
        let interpreted = cx.calculate(&source).unwrap();
        prop_assert_eq!(compiled.re(), interpreted.re());
    }
}

#[test]
fn test_initial_variables() {
    let cx = MathContext::new();
    fuzzy_eq!(cx.getvar("e").unwrap().re(), std::f64::consts::E);
    fuzzy_eq!(cx.getvar("pi").unwrap().re(), std::f64::consts::PI);
    fuzzy_eq!(cx.calculate_real("π").unwrap(), std::f64::consts::PI);
    fuzzy_eq!(cx.getvar("g").unwrap().re(), 9.80665);
    assert_eq!(cx.getvar("i"), None);

    let cx = MathContext::with_settings(Settings::default().complex(true));
    assert_eq!(cx.getvar("i"), Some(Value::complex(0.0, 1.0)));
    let z = cx.calculate("ei").unwrap();
    fuzzy_eq!(z.im(), std::f64::consts::E);
    fuzzy_eq!(cx.calculate("e^πi").unwrap().re(), -1.0);
}

#[test]
fn test_plot_settings() {
    let cx = MathContext::new();
    assert_eq!(cx.plot_settings(), PlotSettings{width: 500.0, height: 300.0, step: 0.0});
    cx.calculate("PlotWidth = 800").unwrap();
    cx.calculate("PlotStep = 2").unwrap();
    let settings = cx.plot_settings();
    assert_eq!(settings.width, 800.0);
    assert_eq!(settings.step, 2.0);
}

#[test]
fn test_precision() {
    let cx = MathContext::new();
    assert_eq!(cx.precision(), 1e-14);
    cx.setvar("Precision", Value::real(1e-20));
    assert_eq!(cx.precision(), 1e-15);
    cx.setvar("Precision", Value::real(0.5));
    assert_eq!(cx.precision(), 1e-2);
}

#[test]
fn test_statement_display() {
    let cx = MathContext::new();
    assert_eq!(cx.parse("1 m + 2 m | cm").unwrap().to_string(), "1 m + 2 m | cm");
    assert_eq!(cx.parse("x = 2*(3 + 4)").unwrap().to_string(), "x = 2 * (3 + 4)");
    assert_eq!(cx.parse("sq(x) = x*x").unwrap().to_string(), "sq(x) = x*x");
}

#[test]
fn test_decimals() {
    let cx = MathContext::with_settings(Settings::default().decimals(2));
    let v = cx.calculate("2/3").unwrap();
    assert_eq!(v.format(cx.settings.decimals), "0.67");
    assert_eq!(Value::nan().format(2), "Undefined");
}

#[test]
fn test_clear() {
    let cx = MathContext::new();
    cx.calculate("b = 2").unwrap();
    cx.calculate("f(x) = b*x").unwrap();
    cx.calculate("€ = 1").unwrap();
    let statement = cx.parse("$sum{k @ k : 1 : 3}").unwrap();
    fuzzy_eq!(cx.eval(&statement).unwrap().value.re(), 6.0);

    cx.clear();
    assert_eq!(cx.getvar("b"), None);
    assert_eq!(cx.function_stats("f"), None);
    assert_eq!(cx.parse("1 + f(2)").unwrap_err(), MathError::InvalidFunction("f".into()));
    assert!(cx.calculate("2€").is_err());
    assert!(matches!(cx.eval(&statement), Err(MathError::InvalidSolver(_))));
    fuzzy_eq!(cx.getvar("pi").unwrap().re(), std::f64::consts::PI);

    // the session keeps working afterwards
    fuzzy_eq!(cx.calculate_real("$sum{k @ k : 1 : 3}").unwrap(), 6.0);
    cx.calculate("f(x) = x + 1").unwrap();
    fuzzy_eq!(cx.calculate_real("f(2)").unwrap(), 3.0);
}
