// Opcode indexed arithmetic for the interpreter and the compiler.
// Unit bookkeeping is shared; the numeric kernels come in a real flavour,
// where everything happens on f64, and a complex one.

use std::cell::Cell;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::marker::PhantomData;
use std::rc::Rc;

use num_complex::Complex64;
use once_cell::sync::Lazy;

use crate::settings::AngleUnit;
use crate::value::{additive_units, power_units, product_units, quotient_units, Value};
use crate::MathError;

pub type Unary = Rc<dyn Fn(&Value) -> Result<Value, MathError>>;
pub type Binary = Rc<dyn Fn(&Value, &Value) -> Result<Value, MathError>>;
pub type Multi = Rc<dyn Fn(&[Value]) -> Result<Value, MathError>>;

pub const OPERATORS: &str = "^/÷\\⦼*-+<>≤≥≡≠∧∨⊕=";
const OPERATOR_ORDER: [i8; 17] = [0, 4, 4, 4, 4, 5, 6, 7, 7, 7, 7, 7, 7, 8, 9, 9, 10];

pub const POWER: usize = 0;
pub const DIVIDE: usize = 1;
pub const MULTIPLY: usize = 4;
pub const SUBTRACT: usize = 5;
pub const ADD: usize = 6;
pub const ASSIGN: usize = 16;

/// Order of the multiplication joining a number to its unit suffix (`5m`).
pub const UNIT_MULT_ORDER: i8 = 3;
/// Order of `*` and `/` between two unit literals (`kN*m`).
pub const UNIT_TERM_ORDER: i8 = 1;
pub const NEGATION_ORDER: i8 = 1;
pub const NEGATE: &str = "‐";

pub static FUNCTIONS: &[&str] = &[
    "sin", "cos", "tan", "csc", "sec", "cot",
    "asin", "acos", "atan", "acsc", "asec", "acot",
    "sinh", "cosh", "tanh", "csch", "sech", "coth",
    "asinh", "acosh", "atanh", "acsch", "asech", "acoth",
    "log", "ln", "log_2", "exp",
    "abs", "sign", "sqr", "sqrt", "cbrt",
    "round", "floor", "ceiling", "trunc",
    "re", "im", "phase", "random", "fact", NEGATE,
];
pub static FUNCTIONS2: &[&str] = &["atan2", "root"];
pub static MULTI_FUNCTIONS: &[&str] = &[
    "min", "max", "sum", "sumsq", "srss", "average", "product", "mean",
    "switch", "and", "or", "xor", "gcd", "lcm",
];

pub const RANDOM: usize = 40;
pub const FACT: usize = 41;
pub const NEG: usize = 42;

fn index_table(names: &'static [&'static str]) -> HashMap<&'static str, usize> {
    names.iter().enumerate().map(|(i, name)| (*name, i)).collect()
}

static FUNCTION_INDEX: Lazy<HashMap<&str, usize>> = Lazy::new(|| index_table(FUNCTIONS));
static FUNCTION2_INDEX: Lazy<HashMap<&str, usize>> = Lazy::new(|| index_table(FUNCTIONS2));
static MULTI_INDEX: Lazy<HashMap<&str, usize>> = Lazy::new(|| index_table(MULTI_FUNCTIONS));

pub fn operator_index(c: char) -> Option<usize> {
    match c {
        '÷' => Some(DIVIDE),
        c => OPERATORS.chars().position(|o| o == c).map(|i| if i > 1 { i - 1 } else { i }),
    }
}

pub fn operator_order(index: usize) -> i8 {
    OPERATOR_ORDER.get(index).copied().unwrap_or(i8::MAX)
}

pub fn is_operator(c: char) -> bool {
    OPERATORS.contains(c)
}

pub fn function_index(name: &str) -> Option<usize> {
    FUNCTION_INDEX.get(name).copied()
}

pub fn function2_index(name: &str) -> Option<usize> {
    FUNCTION2_INDEX.get(name).copied()
}

pub fn multi_function_index(name: &str) -> Option<usize> {
    MULTI_INDEX.get(name).copied()
}

pub trait Calculator {
    fn evaluate_operator(&self, index: usize, a: &Value, b: &Value) -> Result<Value, MathError>;
    fn evaluate_function(&self, index: usize, a: &Value) -> Result<Value, MathError>;
    fn evaluate_function2(&self, index: usize, a: &Value, b: &Value) -> Result<Value, MathError>;
    fn evaluate_multi_function(&self, index: usize, args: &[Value]) -> Result<Value, MathError>;

    fn operator(&self, index: usize) -> Binary;
    fn function(&self, index: usize) -> Unary;
    fn function2(&self, index: usize) -> Binary;
    fn multi_function(&self, index: usize) -> Multi;

    fn is_complex(&self) -> bool;
    fn set_return_angle_units(&self, on: bool);
}

type C = Complex64;

/// Numeric kernel behind a calculator.
pub trait Numeric: 'static {
    const COMPLEX: bool;
    fn div(a: C, b: C) -> C;
    fn mul(a: C, b: C) -> C;
    fn pow(a: C, b: C) -> C;
    fn root(a: C, n: f64) -> C;
    fn function(index: usize, z: C) -> C;
}

pub struct Real;
pub struct Complex;

fn re(x: f64) -> C {
    C::new(x, 0.0)
}

impl Numeric for Real {
    const COMPLEX: bool = false;
    fn div(a: C, b: C) -> C { re(a.re / b.re) }
    fn mul(a: C, b: C) -> C { re(a.re * b.re) }
    fn pow(a: C, b: C) -> C { re(a.re.powf(b.re)) }

    fn root(a: C, n: f64) -> C {
        let x = a.re;
        if x < 0.0 && n % 2.0 == 1.0 {
            re(-(-x).powf(1.0 / n))
        } else {
            re(x.powf(1.0 / n))
        }
    }

    fn function(index: usize, z: C) -> C {
        let x = z.re;
        re(match index {
            0 => x.sin(),
            1 => x.cos(),
            2 => x.tan(),
            3 => 1.0 / x.sin(),
            4 => 1.0 / x.cos(),
            5 => 1.0 / x.tan(),
            6 => x.asin(),
            7 => x.acos(),
            8 => x.atan(),
            9 => (1.0 / x).asin(),
            10 => (1.0 / x).acos(),
            11 => (1.0 / x).atan(),
            12 => x.sinh(),
            13 => x.cosh(),
            14 => x.tanh(),
            15 => 1.0 / x.sinh(),
            16 => 1.0 / x.cosh(),
            17 => 1.0 / x.tanh(),
            18 => x.asinh(),
            19 => x.acosh(),
            20 => x.atanh(),
            21 => (1.0 / x).asinh(),
            22 => (1.0 / x).acosh(),
            23 => (1.0 / x).atanh(),
            24 => x.log10(),
            25 => x.ln(),
            26 => x.log2(),
            27 => x.exp(),
            28 => x.abs(),
            29 => if x == 0.0 { 0.0 } else { x.signum() },
            30 | 31 => x.sqrt(),
            32 => x.cbrt(),
            33 => x.round(),
            34 => x.floor(),
            35 => x.ceil(),
            36 => x.trunc(),
            37 => x,
            38 => 0.0,
            39 => if x < 0.0 { PI } else { 0.0 },
            RANDOM => x * rand::random::<f64>(),
            _ => -x,
        })
    }
}

impl Numeric for Complex {
    const COMPLEX: bool = true;
    fn div(a: C, b: C) -> C {
        if a.im == 0.0 && b.im == 0.0 { re(a.re / b.re) } else { a / b }
    }

    fn mul(a: C, b: C) -> C {
        if a.im == 0.0 && b.im == 0.0 { re(a.re * b.re) } else { a * b }
    }

    fn pow(a: C, b: C) -> C {
        if a.im == 0.0 && b.im == 0.0 && (a.re >= 0.0 || b.re.fract() == 0.0) {
            re(a.re.powf(b.re))
        } else {
            a.powc(b)
        }
    }

    fn root(a: C, n: f64) -> C {
        if a.im == 0.0 && a.re < 0.0 && n % 2.0 == 1.0 {
            re(-(-a.re).powf(1.0 / n))
        } else {
            a.powf(1.0 / n)
        }
    }

    fn function(index: usize, z: C) -> C {
        let one = re(1.0);
        match index {
            0 => z.sin(),
            1 => z.cos(),
            2 => z.tan(),
            3 => one / z.sin(),
            4 => one / z.cos(),
            5 => one / z.tan(),
            6 => z.asin(),
            7 => z.acos(),
            8 => z.atan(),
            9 => (one / z).asin(),
            10 => (one / z).acos(),
            11 => (one / z).atan(),
            12 => z.sinh(),
            13 => z.cosh(),
            14 => z.tanh(),
            15 => one / z.sinh(),
            16 => one / z.cosh(),
            17 => one / z.tanh(),
            18 => z.asinh(),
            19 => z.acosh(),
            20 => z.atanh(),
            21 => (one / z).asinh(),
            22 => (one / z).acosh(),
            23 => (one / z).atanh(),
            24 => z.ln() / 10f64.ln(),
            25 => z.ln(),
            26 => z.ln() / 2f64.ln(),
            27 => z.exp(),
            28 => re(z.norm()),
            29 => re(if z.re == 0.0 { 0.0 } else { z.re.signum() }),
            30 | 31 => z.sqrt(),
            32 => Complex::root(z, 3.0),
            33 => C::new(z.re.round(), z.im.round()),
            34 => C::new(z.re.floor(), z.im.floor()),
            35 => C::new(z.re.ceil(), z.im.ceil()),
            36 => C::new(z.re.trunc(), z.im.trunc()),
            37 => re(z.re),
            38 => re(z.im),
            39 => re(z.arg()),
            RANDOM => z * rand::random::<f64>(),
            // +0 imaginary part, sqrt(-4) must agree with sqrt(0 - 4)
            _ => -z + C::new(0.0, 0.0),
        }
    }
}

/// Calculator over a numeric kernel; the angle settings decide how plain
/// numbers passed to trigonometric functions are read.
pub struct Calc<K: Numeric> {
    angle: AngleUnit,
    return_angle_units: Rc<Cell<bool>>,
    kernel: PhantomData<K>,
}

pub type RealCalculator = Calc<Real>;
pub type ComplexCalculator = Calc<Complex>;

impl<K: Numeric> Clone for Calc<K> {
    fn clone(&self) -> Self {
        Calc{
            angle: self.angle,
            return_angle_units: self.return_angle_units.clone(),
            kernel: PhantomData,
        }
    }
}

fn factorial(n: f64) -> f64 {
    (2..=n as u32).map(f64::from).product()
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Least common multiple, `None` once it no longer fits.
fn lcm(a: u128, b: u128) -> Option<u128> {
    if a == 0 || b == 0 {
        return Some(0);
    }
    (a / gcd(a, b)).checked_mul(b)
}

fn truth(x: bool) -> Value {
    Value::real(if x { 1.0 } else { 0.0 })
}

impl<K: Numeric> Calc<K> {
    pub fn new(angle: AngleUnit) -> Self {
        Calc{angle, return_angle_units: Rc::new(Cell::new(false)), kernel: PhantomData}
    }

    fn unitless(&self, name: &str, v: &Value) -> Result<C, MathError> {
        match v.unit_ref() {
            None => Ok(v.num),
            Some(u) if u.is_dimensionless() => Ok(v.num * u.factor()),
            Some(u) => Err(MathError::InvalidUnitsFunction(name.to_string(), u.text().to_string())),
        }
    }

    fn angle_in(&self, name: &str, v: &Value) -> Result<C, MathError> {
        match v.unit_ref() {
            Some(u) if u.is_angle() => Ok(v.num * u.factor()),
            _ => Ok(self.unitless(name, v)? * self.angle.factor()),
        }
    }

    fn angle_out(&self, radians: C) -> Value {
        let num = radians / self.angle.factor();
        if self.return_angle_units.get() {
            if let Some(u) = unidades::lookup(self.angle.symbol()) {
                return Value::new(num, Some(u));
            }
        }
        Value::new(num, None)
    }

    fn fact(&self, v: &Value) -> Result<Value, MathError> {
        if v.unit.is_some() {
            return Err(MathError::FactorialUnitless);
        }
        if !v.is_real() {
            return Err(MathError::FactorialPositiveInteger);
        }
        let n = v.re();
        if n < 0.0 || n.fract() != 0.0 {
            return Err(MathError::FactorialPositiveInteger);
        }
        if n > 170.0 {
            return Err(MathError::FactorialOutOfRange);
        }
        Ok(Value::real(factorial(n)))
    }

    fn compare(&self, index: usize, a: &Value, b: &Value) -> Result<Value, MathError> {
        let op = OPERATORS.chars().nth(index + 1).unwrap_or('=');
        let (k, _) = additive_units(a, b, op)?;
        let (x, y) = (a.num, b.num * k);
        Ok(truth(match index {
            7 => x.re < y.re,
            8 => x.re > y.re,
            9 => x.re <= y.re,
            10 => x.re >= y.re,
            11 => x == y,
            _ => x != y,
        }))
    }

    /// Brings every argument into the units of the first one.
    fn aligned(&self, args: &[Value]) -> Result<(Vec<C>, Option<Value>), MathError> {
        let first = match args.first() {
            Some(first) => first,
            None => return Ok((Vec::new(), None)),
        };
        let nums = args.iter()
            .map(|v| additive_units(first, v, ';').map(|(k, _)| v.num * k))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((nums, Some(first.clone())))
    }

    /// Magnitudes of integer arguments within the i64 range.
    fn integers(&self, name: &str, args: &[Value]) -> Result<Vec<u128>, MathError> {
        args.iter().map(|v| {
            let x = self.unitless(name, v)?.re;
            if x.fract() != 0.0 {
                return Err(MathError::BothValuesInteger);
            }
            if !(i64::MIN as f64..i64::MAX as f64).contains(&x) {
                return Err(MathError::ArgumentOutOfRange(name.to_string()));
            }
            Ok((x as i64).unsigned_abs() as u128)
        }).collect()
    }
}

impl<K: Numeric> Calculator for Calc<K> {
    fn evaluate_operator(&self, index: usize, a: &Value, b: &Value) -> Result<Value, MathError> {
        let mut result = match index {
            POWER => {
                let unit = power_units(a, b)?;
                Value::new(K::pow(a.num, b.collapse_percent().num), unit)
            },
            1 | 2 => {
                let (k, unit) = quotient_units(a, b);
                let q = K::div(a.num, b.num) * k;
                let q = if index == 2 { C::new(q.re.trunc(), q.im.trunc()) } else { q };
                Value::new(q, unit)
            },
            3 => {
                let (k, unit) = additive_units(a, b, '⦼')?;
                let d = b.num * k;
                Value::new(C::new(a.num.re % d.re, 0.0), unit)
            },
            MULTIPLY => {
                let (k, unit) = product_units(a, b);
                Value::new(K::mul(a.num, b.num) * k, unit)
            },
            SUBTRACT | ADD => {
                let op = if index == ADD { '+' } else { '-' };
                let (k, unit) = additive_units(a, b, op)?;
                let d = b.num * k;
                Value::new(if index == ADD { a.num + d } else { a.num - d }, unit)
            },
            7..=12 => self.compare(index, a, b)?,
            13 => truth(a.re() != 0.0 && b.re() != 0.0),
            14 => truth(a.re() != 0.0 || b.re() != 0.0),
            15 => truth((a.re() != 0.0) != (b.re() != 0.0)),
            _ => b.clone(),
        };
        result.is_unit = index == MULTIPLY || index == DIVIDE || index == POWER;
        result.is_unit &= a.is_unit && (b.is_unit || index == POWER);
        Ok(result)
    }

    fn evaluate_function(&self, index: usize, a: &Value) -> Result<Value, MathError> {
        let name = FUNCTIONS.get(index).copied().unwrap_or("?");
        Ok(match index {
            0..=5 => Value::new(K::function(index, self.angle_in(name, a)?), None),
            6..=11 => self.angle_out(K::function(index, self.unitless(name, a)?)),
            12..=27 => Value::new(K::function(index, self.unitless(name, a)?), None),
            29 => Value::new(K::function(index, a.num), None),
            30..=32 => {
                let n = if index == 32 { 3.0 } else { 2.0 };
                let unit = a.unit_ref().map(|u| std::sync::Arc::new(u.pow(1.0 / n as f32)));
                Value::new(K::function(index, a.num), unit)
            },
            39 => self.angle_out(K::function(index, a.num)),
            FACT => self.fact(a)?,
            NEG => Value{num: K::function(index, a.num), unit: a.unit.clone(), is_unit: false},
            _ => Value::new(K::function(index, a.num), a.unit.clone()),
        })
    }

    fn evaluate_function2(&self, index: usize, a: &Value, b: &Value) -> Result<Value, MathError> {
        match index {
            0 => {
                let (k, _) = additive_units(a, b, ';')?;
                let (x, y) = (a.num.re, b.num.re * k);
                Ok(self.angle_out(re(y.atan2(x))))
            },
            _ => {
                if b.unit.is_some() {
                    return Err(MathError::RootUnitless);
                }
                let n = b.re();
                if !b.is_real() || n < 2.0 || n.fract() != 0.0 {
                    return Err(MathError::RootInteger);
                }
                let unit = a.unit_ref().map(|u| std::sync::Arc::new(u.pow(1.0 / n as f32)));
                Ok(Value::new(K::root(a.num, n), unit))
            },
        }
    }

    fn evaluate_multi_function(&self, index: usize, args: &[Value]) -> Result<Value, MathError> {
        let name = MULTI_FUNCTIONS.get(index).copied().unwrap_or("?");
        if args.is_empty() {
            return Err(MathError::InvalidNumberOfArguments);
        }
        match index {
            0 | 1 => {
                let (nums, first) = self.aligned(args)?;
                let pick = nums.into_iter().fold(None, |acc: Option<C>, x| match acc {
                    Some(m) if (index == 0) == (m.re <= x.re) => Some(m),
                    _ => Some(x),
                });
                Ok(Value::new(pick.unwrap_or_default(), first.and_then(|f| f.unit)))
            },
            2 | 5 => {
                let (nums, first) = self.aligned(args)?;
                let n = nums.len() as f64;
                let sum: C = nums.into_iter().sum();
                let sum = if index == 5 { sum / n } else { sum };
                Ok(Value::new(sum, first.and_then(|f| f.unit)))
            },
            3 | 4 => {
                let (nums, first) = self.aligned(args)?;
                let sumsq: C = nums.into_iter().map(|x| K::mul(x, x)).sum();
                let unit = first.and_then(|f| f.unit);
                if index == 4 {
                    Ok(Value::new(K::pow(sumsq, re(0.5)), unit))
                } else {
                    let square = unit.map(|u| std::sync::Arc::new(u.pow(2.0)));
                    Ok(Value::new(sumsq, square))
                }
            },
            6 | 7 => {
                let mut product = args[0].clone();
                for v in &args[1..] {
                    product = self.evaluate_operator(MULTIPLY, &product, v)?;
                }
                if index == 7 {
                    let n = args.len() as f64;
                    let unit = product.unit_ref().map(|u| std::sync::Arc::new(u.pow(1.0 / n as f32)));
                    return Ok(Value::new(K::root(product.num, n), unit));
                }
                Ok(product)
            },
            8 => {
                for pair in args.chunks(2) {
                    match pair {
                        [cond, value] if self.unitless(name, cond)?.re != 0.0 => return Ok(value.clone()),
                        [default] => return Ok(default.clone()),
                        _ => (),
                    }
                }
                Ok(Value::nan())
            },
            9 => Ok(truth(args.iter().all(|v| v.re() != 0.0))),
            10 => Ok(truth(args.iter().any(|v| v.re() != 0.0))),
            11 => Ok(truth(args.iter().filter(|v| v.re() != 0.0).count() % 2 == 1)),
            _ => {
                let ints = self.integers(name, args)?;
                let (first, rest) = match ints.split_first() {
                    Some(split) => split,
                    None => return Err(MathError::InvalidNumberOfArguments),
                };
                let result = if index == 12 {
                    rest.iter().fold(*first, |acc, &x| gcd(acc, x)) as f64
                } else {
                    rest.iter()
                        .try_fold(*first, |acc, &x| lcm(acc, x))
                        .map_or(f64::INFINITY, |l| l as f64)
                };
                Ok(Value::real(result))
            },
        }
    }

    fn operator(&self, index: usize) -> Binary {
        let calc = self.clone();
        Rc::new(move |a, b| calc.evaluate_operator(index, a, b))
    }

    fn function(&self, index: usize) -> Unary {
        let calc = self.clone();
        Rc::new(move |a| calc.evaluate_function(index, a))
    }

    fn function2(&self, index: usize) -> Binary {
        let calc = self.clone();
        Rc::new(move |a, b| calc.evaluate_function2(index, a, b))
    }

    fn multi_function(&self, index: usize) -> Multi {
        let calc = self.clone();
        Rc::new(move |args| calc.evaluate_multi_function(index, args))
    }

    fn is_complex(&self) -> bool {
        K::COMPLEX
    }

    fn set_return_angle_units(&self, on: bool) {
        self.return_angle_units.set(on);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! fuzzy_eq {
        ($lhs:expr, $rhs:expr) => { assert!(($lhs - $rhs).abs() < 1.0e-10) }
    }

    #[test]
    fn operator_tables() {
        assert_eq!(operator_index('^'), Some(POWER));
        assert_eq!(operator_index('/'), Some(DIVIDE));
        assert_eq!(operator_index('÷'), Some(DIVIDE));
        assert_eq!(operator_index('*'), Some(MULTIPLY));
        assert_eq!(operator_index('='), Some(ASSIGN));
        assert_eq!(operator_order(ADD), 6);
        assert_eq!(function_index("fact"), Some(FACT));
        assert_eq!(function_index(NEGATE), Some(NEG));
        assert_eq!(multi_function_index("lcm"), Some(13));
    }

    #[test]
    fn real_kernel() {
        let calc = RealCalculator::new(AngleUnit::Deg);
        let sin30 = calc.evaluate_function(0, &Value::real(30.0)).unwrap();
        fuzzy_eq!(sin30.re(), 0.5);
        let sqrt = calc.evaluate_function(31, &Value::real(-1.0)).unwrap();
        assert!(sqrt.is_nan());
        let root = calc.evaluate_function2(1, &Value::real(-8.0), &Value::real(3.0)).unwrap();
        fuzzy_eq!(root.re(), -2.0);
        let fact = calc.evaluate_function(FACT, &Value::real(5.0)).unwrap();
        fuzzy_eq!(fact.re(), 120.0);
        assert_eq!(calc.evaluate_function(FACT, &Value::real(2.5)), Err(MathError::FactorialPositiveInteger));
    }

    #[test]
    fn complex_kernel() {
        let calc = ComplexCalculator::new(AngleUnit::Rad);
        let z = calc.evaluate_function(31, &Value::real(-4.0)).unwrap();
        fuzzy_eq!(z.re(), 0.0);
        fuzzy_eq!(z.im(), 2.0);
        let p = calc.evaluate_operator(MULTIPLY, &Value::complex(0.0, 1.0), &Value::complex(0.0, 1.0)).unwrap();
        fuzzy_eq!(p.re(), -1.0);
        let neg = calc.evaluate_function(NEG, &Value::real(4.0)).unwrap();
        assert!(neg.im().is_sign_positive());
        let z = calc.evaluate_function(31, &neg).unwrap();
        fuzzy_eq!(z.im(), 2.0);
    }

    #[test]
    fn multi_functions() {
        let calc = RealCalculator::new(AngleUnit::Rad);
        let args: Vec<Value> = [3.0, 1.0, 2.0].iter().map(|x| Value::real(*x)).collect();
        fuzzy_eq!(calc.evaluate_multi_function(0, &args).unwrap().re(), 1.0);
        fuzzy_eq!(calc.evaluate_multi_function(1, &args).unwrap().re(), 3.0);
        fuzzy_eq!(calc.evaluate_multi_function(5, &args).unwrap().re(), 2.0);
        fuzzy_eq!(calc.evaluate_multi_function(4, &args).unwrap().re(), 14f64.sqrt());
        let ints: Vec<Value> = [12.0, 18.0].iter().map(|x| Value::real(*x)).collect();
        fuzzy_eq!(calc.evaluate_multi_function(12, &ints).unwrap().re(), 6.0);
        fuzzy_eq!(calc.evaluate_multi_function(13, &ints).unwrap().re(), 36.0);
        let switch = vec![Value::real(0.0), Value::real(1.0), Value::real(5.0)];
        fuzzy_eq!(calc.evaluate_multi_function(8, &switch).unwrap().re(), 5.0);
    }

    #[test]
    fn units_in_functions() {
        let calc = RealCalculator::new(AngleUnit::Rad);
        let deg = unidades::lookup("°").unwrap();
        let sin = calc.evaluate_function(0, &Value::with_unit(90.0, deg)).unwrap();
        fuzzy_eq!(sin.re(), 1.0);
        let m = unidades::lookup("m").unwrap();
        let err = calc.evaluate_function(25, &Value::with_unit(1.0, m.clone()));
        assert_eq!(err, Err(MathError::InvalidUnitsFunction("ln".into(), "m".into())));
        let area = Value::with_unit(4.0, std::sync::Arc::new(m.pow(2.0)));
        let side = calc.evaluate_function(31, &area).unwrap();
        fuzzy_eq!(side.re(), 2.0);
        assert_eq!(side.unit_text(), "m");
    }
}
