use std::fmt;
use std::sync::Arc;

use num_complex::Complex64;
use once_cell::sync::Lazy;
use unidades::{Field, Unit};

use crate::MathError;

/// A scalar, possibly complex, with optional units. `is_unit` marks values
/// that came straight from a unit literal such as `m` or `%`.
#[derive(Clone, Debug, PartialEq)]
pub struct Value {
    pub num: Complex64,
    pub unit: Option<Arc<Unit>>,
    pub is_unit: bool,
}

impl Default for Value {
    fn default() -> Self {
        Value::real(0.0)
    }
}

impl Value {
    pub fn real(x: f64) -> Value {
        Value{num: Complex64::new(x, 0.0), unit: None, is_unit: false}
    }

    pub fn complex(re: f64, im: f64) -> Value {
        Value{num: Complex64::new(re, im), unit: None, is_unit: false}
    }

    pub fn nan() -> Value {
        Value::real(f64::NAN)
    }

    pub fn new(num: Complex64, unit: Option<Arc<Unit>>) -> Value {
        Value{num, unit, is_unit: false}
    }

    pub fn with_unit(x: f64, unit: Arc<Unit>) -> Value {
        Value::new(Complex64::new(x, 0.0), Some(unit))
    }

    /// The value of a bare unit literal, one of that unit.
    pub fn unit_literal(unit: Arc<Unit>) -> Value {
        Value{num: Complex64::new(1.0, 0.0), unit: Some(unit), is_unit: true}
    }

    pub fn re(&self) -> f64 { self.num.re }
    pub fn im(&self) -> f64 { self.num.im }
    pub fn is_real(&self) -> bool { self.num.im == 0.0 }
    pub fn is_nan(&self) -> bool { self.num.re.is_nan() || self.num.im.is_nan() }
    pub fn unit_ref(&self) -> Option<&Unit> { self.unit.as_deref() }

    pub fn unit_text(&self) -> String {
        unidades::text_of(self.unit_ref())
    }

    /// Drops dimensionless scaled units (%, ‰) folding their factor into the number.
    pub fn collapse_percent(&self) -> Value {
        match self.unit_ref() {
            Some(u) if u.is_dimensionless() => Value::new(self.num * u.factor(), None),
            _ => self.clone(),
        }
    }

    /// The magnitude expressed in SI, used where units are only checked.
    pub fn si(&self) -> Complex64 {
        match self.unit_ref() {
            Some(u) => self.num * u.factor(),
            None => self.num,
        }
    }
}

fn shared(unit: Option<Unit>, a: &Option<Arc<Unit>>) -> Option<Arc<Unit>> {
    match (unit, a) {
        (Some(u), Some(a)) if u == **a => Some(a.clone()),
        (u, _) => u.map(Arc::new),
    }
}

/// Units of `a ± b` and the factor that brings `b` into the units of `a`.
pub(crate) fn additive_units(a: &Value, b: &Value, op: char)
    -> Result<(f64, Option<Arc<Unit>>), MathError>
{
    let k = unidades::convert(a.unit_ref(), b.unit_ref(), op)?;
    let unit = match (&a.unit, &b.unit) {
        (None, Some(ub)) if ub.is_dimensionless() => None,
        (ua, _) => ua.clone(),
    };
    Ok((k, unit))
}

/// Units of `a * b` and the factor applied to the product of the numbers.
pub(crate) fn product_units(a: &Value, b: &Value) -> (f64, Option<Arc<Unit>>) {
    match (&a.unit, &b.unit) {
        (None, None) => (1.0, None),
        (ua, Some(ub)) if ub.is_dimensionless() && !b.is_unit => (ub.factor(), ua.clone()),
        (Some(ua), None) => (1.0, Some(ua.clone())),
        (None, Some(ub)) => (1.0, Some(ub.clone())),
        (Some(ua), Some(ub)) => {
            let (k, u) = ua.multiply(ub);
            (k, shared(u, &a.unit))
        },
    }
}

/// Units of `a / b` and the factor applied to the quotient of the numbers.
pub(crate) fn quotient_units(a: &Value, b: &Value) -> (f64, Option<Arc<Unit>>) {
    match (&a.unit, &b.unit) {
        (None, None) => (1.0, None),
        (ua, Some(ub)) if ub.is_dimensionless() && !b.is_unit => (1.0 / ub.factor(), ua.clone()),
        (Some(ua), None) => (1.0, Some(ua.clone())),
        (None, Some(ub)) => (1.0, Some(Arc::new(ub.pow(-1.0)))),
        (Some(ua), Some(ub)) => {
            let (k, u) = ua.divide(ub);
            (k, shared(u, &a.unit))
        },
    }
}

/// Units of `a ^ b`; the exponent has to be a plain real number.
pub(crate) fn power_units(a: &Value, b: &Value) -> Result<Option<Arc<Unit>>, MathError> {
    if b.unit_ref().map_or(false, |u| !u.is_dimensionless()) {
        return Err(MathError::PowerNotUnitless);
    }
    match a.unit_ref() {
        None => Ok(None),
        Some(_) if !b.is_real() => Err(MathError::UnitsToComplexPower),
        Some(_) if b.re() == 0.0 => Ok(None),
        Some(u) => Ok(Some(Arc::new(u.pow(b.collapse_percent().re() as f32)))),
    }
}

static MECHANICAL: Lazy<Vec<Option<Arc<Unit>>>> = Lazy::new(|| {
    ["kN/m^4", "kN/m^3", "kPa", "kN/m", "kN", "kNm", "kN·m^2", "kN·m^3", "kN·m^4"]
        .iter()
        .map(|text| unidades::parse(text).ok().map(Arc::new))
        .collect()
});

static ELECTRICAL: Lazy<Vec<Arc<Unit>>> = Lazy::new(|| {
    ["S", "F", "C", "T", "Ω", "V", "W", "H", "Wb"]
        .iter()
        .filter_map(|name| unidades::lookup(name))
        .collect()
});

/// Representative unit for composite mechanical and electrical results.
fn field_unit(unit: &Unit) -> Option<Arc<Unit>> {
    if !unit.is_composite() {
        return None;
    }
    match unit.field() {
        Field::Mechanical => {
            let m = unit.dimension().m;
            // force is kg·m·s⁻², so kN/m^4 sits at m = -3
            if m.fract() != 0.0 || !(-3.0..=5.0).contains(&m) {
                return None;
            }
            MECHANICAL[(m + 3.0) as usize].clone()
        },
        Field::Electrical if !unit.text().starts_with("VA") => ELECTRICAL.iter()
            .find(|u| u.is_consistent(unit))
            .cloned(),
        _ => None,
    }
}

/// Converts `value` into `target`. Without a target, composite mechanical
/// and electrical units are rewritten into their representative unit.
pub fn apply_units(value: Value, target: Option<&Arc<Unit>>) -> Result<Value, MathError> {
    let target = match target {
        Some(t) => t,
        None => {
            return Ok(match value.unit_ref().and_then(field_unit) {
                Some(u) => {
                    let k = value.unit_ref().map_or(1.0, |vu| vu.convert_to(&u));
                    Value::new(value.num * k, Some(u))
                },
                None => value,
            });
        },
    };
    match value.unit_ref() {
        None if target.is_dimensionless() => {
            Ok(Value::new(value.num / target.factor(), Some(target.clone())))
        },
        None => Ok(Value::new(value.num, Some(target.clone()))),
        Some(vu) if !vu.is_consistent(target) => Err(MathError::InconsistentTargetUnits(
            vu.text().to_string(), target.text().to_string())),
        Some(vu) => {
            let mut num = value.num * vu.convert_to(target);
            if target.is_temperature() {
                num += unidades::temperature_delta(vu.text(), target.text());
            }
            Ok(Value::new(num, Some(target.clone())))
        },
    }
}

pub(crate) fn format_number(x: f64, decimals: usize) -> String {
    if x.is_nan() {
        return "Undefined".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "+∞".to_string() } else { "-∞".to_string() };
    }
    let ax = x.abs();
    if ax != 0.0 && (ax >= 1e15 || ax < 0.1f64.powi(decimals as i32)) {
        return format!("{:.*e}", decimals.min(6), x);
    }
    let s = format!("{:.*}", decimals, x);
    let s = if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    };
    if s == "-0" { "0".to_string() } else { s }
}

impl Value {
    pub fn format(&self, decimals: usize) -> String {
        let number = if self.is_real() {
            format_number(self.re(), decimals)
        } else if self.re() == 0.0 {
            format!("{}i", format_number(self.im(), decimals))
        } else {
            let sign = if self.im() < 0.0 { '-' } else { '+' };
            format!("{} {} {}i", format_number(self.re(), decimals), sign,
                    format_number(self.im().abs(), decimals))
        };
        match self.unit_ref() {
            Some(u) if !self.is_real() && self.re() != 0.0 => format!("({}) {}", number, u),
            Some(u) if matches!(u.text(), "%" | "‰" | "‱" | "°" | "′" | "″") => format!("{}{}", number, u),
            Some(u) => format!("{} {}", number, u),
            None => number,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.format(f.precision().unwrap_or(6)))
    }
}
