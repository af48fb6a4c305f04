// Ref: https://en.wikipedia.org/wiki/International_System_of_Units
// Dimension: exponents over the base quantities
// Factor: scale of a unit relative to the coherent SI unit of its dimension
// Unit: dimension + factor + the named terms it was built from

use std::fmt;
use std::ops;

use crate::UnitError;

pub(crate) const fn magnitude_prefix(factor: i32) -> Option<(&'static str, &'static str)> {
    Some(match factor {
        -24 => ("y", "yocto"),
        -21 => ("z", "zepto"),
        -18 => ("a", "atto"),
        -15 => ("f", "femto"),
        -12 => ("p", "pico"),
        -9 => ("n", "nano"),
        -6 => ("μ", "micro"),
        -3 => ("m", "milli"),
        -2 => ("c", "centi"),
        -1 => ("d", "deci"),
        0 => ("", ""),
        1 => ("da", "deca"),
        2 => ("h", "hecto"),
        3 => ("k", "kilo"),
        6 => ("M", "mega"),
        9 => ("G", "giga"),
        12 => ("T", "tera"),
        15 => ("P", "peta"),
        18 => ("E", "exa"),
        21 => ("Z", "zetta"),
        24 => ("Y", "yotta"),
        _ => return None
    })
}

#[allow(non_snake_case)]
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Dimension {
    pub s: f32,
    pub m: f32,
    pub kg: f32,
    pub A: f32,
    pub K: f32,
    pub mol: f32,
    pub cd: f32,
    pub rad: f32,
    /// Base of the units defined during a session, such as currencies.
    pub custom: f32,
}

pub const UNITD: Dimension = Dimension{
    s: 0.0, m: 0.0, kg: 0.0, A: 0.0, K: 0.0, mol: 0.0, cd: 0.0, rad: 0.0, custom: 0.0
};

/// Dimension of a unit defined from a plain number (`€ = 1`).
pub const CUSTOM: Dimension = Dimension{custom: 1.0, ..UNITD};

impl Dimension {
    fn zip(self, rhs: Dimension, op: impl Fn(f32, f32) -> f32) -> Dimension {
        Dimension{
            s: op(self.s, rhs.s),
            m: op(self.m, rhs.m),
            kg: op(self.kg, rhs.kg),
            A: op(self.A, rhs.A),
            K: op(self.K, rhs.K),
            mol: op(self.mol, rhs.mol),
            cd: op(self.cd, rhs.cd),
            rad: op(self.rad, rhs.rad),
            custom: op(self.custom, rhs.custom),
        }
    }

    pub fn powf(self, n: f32) -> Dimension {
        self.zip(UNITD, |a, _| a * n)
    }

    pub fn is_none(&self) -> bool {
        *self == UNITD
    }

    fn names(&self) -> Option<(&'static str, &'static str)> {
        // only integral exponents have names
        if self.custom != 0.0 {
            return None;
        }
        let d = [self.s as i8, self.m as i8, self.kg as i8, self.A as i8,
                 self.K as i8, self.mol as i8, self.cd as i8, self.rad as i8];
        Some(match d {
            [1, 0, 0, 0, 0, 0, 0, 0] => ("s", "second"),
            [0, 1, 0, 0, 0, 0, 0, 0] => ("m", "meter"),
            [0, 0, 1, 0, 0, 0, 0, 0] => ("kg", "kilogram"),
            [0, 0, 0, 1, 0, 0, 0, 0] => ("A", "ampere"),
            [0, 0, 0, 0, 1, 0, 0, 0] => ("K", "kelvin"),
            [0, 0, 0, 0, 0, 1, 0, 0] => ("mol", "mole"),
            [0, 0, 0, 0, 0, 0, 1, 0] => ("cd", "candela"),
            [0, 0, 0, 0, 0, 0, 0, 1] => ("rad", "radian"),
            [-1, 0, 0, 0, 0, 0, 0, 0] => ("Hz", "hertz"),
            [-2, 1, 1, 0, 0, 0, 0, 0] => ("N", "newton"),
            [-2, -1, 1, 0, 0, 0, 0, 0] => ("Pa", "pascal"),
            [-2, 2, 1, 0, 0, 0, 0, 0] => ("J", "joule"),
            [-3, 2, 1, 0, 0, 0, 0, 0] => ("W", "watt"),
            [1, 0, 0, 1, 0, 0, 0, 0] => ("C", "coulomb"),
            [-3, 2, 1, -1, 0, 0, 0, 0] => ("V", "volt"),
            [4, -2, -1, 2, 0, 0, 0, 0] => ("F", "farad"),
            [-3, 2, 1, -2, 0, 0, 0, 0] => ("Ω", "ohm"),
            [3, -2, -1, 2, 0, 0, 0, 0] => ("S", "siemens"),
            [-2, 2, 1, -1, 0, 0, 0, 0] => ("Wb", "weber"),
            [-2, 0, 1, -1, 0, 0, 0, 0] => ("T", "tesla"),
            [-2, 2, 1, -2, 0, 0, 0, 0] => ("H", "henry"),
            _ => return None
        })
    }

    /// Symbol and full name of the SI unit with exactly this dimension.
    pub fn si_name(&self) -> Option<(&'static str, &'static str)> {
        let integral = [self.s, self.m, self.kg, self.A, self.K, self.mol, self.cd, self.rad]
            .iter().all(|p| p.fract() == 0.0);
        if integral { self.names() } else { None }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        static SUP: &[&str] = &[
            "\u{2070}", "\u{00b9}", "\u{00b2}", "\u{00b3}", "\u{2074}",
            "\u{2075}", "\u{2076}", "\u{2077}", "\u{2078}", "\u{2079}",
        ];
        macro_rules! fmtunit {
            ($dimension:ident, $dim_name:literal) => {match self.$dimension {
                n if n == 0.0 => None,
                n if n == 1.0 => Some($dim_name.to_string()),
                n if n.fract() == 0.0 && n.abs() < 10.0 => Some(if n > 1.0 {
                    format!("{}{}", $dim_name, SUP[n as usize])
                } else {
                    format!("{}\u{207b}{}", $dim_name, SUP[-n as usize])
                }),
                n => Some(format!("{}^{}", $dim_name, n)),
            }}
        }
        let mut dims = vec![
            (self.s, fmtunit!(s, "s")),
            (self.m, fmtunit!(m, "m")),
            (self.kg, fmtunit!(kg, "kg")),
            (self.A, fmtunit!(A, "A")),
            (self.K, fmtunit!(K, "K")),
            (self.mol, fmtunit!(mol, "mol")),
            (self.cd, fmtunit!(cd, "cd")),
            (self.rad, fmtunit!(rad, "rad")),
            (self.custom, fmtunit!(custom, "¤")),
        ];
        dims.sort_by(|a, b| b.0.total_cmp(&a.0));
        write!(f, "{}", dims.into_iter()
            .filter_map(|x| x.1).collect::<Vec<_>>().join("\u{00b7}"))
    }
}

impl ops::Mul for Dimension {
    type Output = Dimension;
    fn mul(self, rhs: Dimension) -> Dimension {
        self.zip(rhs, |a, b| a + b)
    }
}

impl ops::Div for Dimension {
    type Output = Dimension;
    fn div(self, rhs: Dimension) -> Dimension {
        self.zip(rhs, |a, b| a - b)
    }
}

/// Which family of canonical units a composite result belongs to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Field {
    Mechanical,
    Electrical,
    Other,
}

#[derive(Clone, Debug)]
pub struct Unit {
    dimension: Dimension,
    factor: f64,
    terms: Vec<(String, f32)>,
    text: String,
    format: Option<String>,
}

impl PartialEq for Unit {
    fn eq(&self, other: &Unit) -> bool {
        self.dimension == other.dimension &&
            self.factor == other.factor &&
            self.text == other.text
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

fn format_power(p: f32) -> String {
    if p.fract() == 0.0 { format!("{}", p as i32) } else { format!("{}", p) }
}

fn render_terms(terms: &[(String, f32)]) -> String {
    let term = |name: &str, p: f32| if p == 1.0 {
        name.to_string()
    } else {
        format!("{}^{}", name, format_power(p))
    };
    let num: Vec<String> = terms.iter()
        .filter(|(_, p)| *p > 0.0)
        .map(|(n, p)| term(n, *p))
        .collect();
    let den: Vec<String> = terms.iter()
        .filter(|(_, p)| *p < 0.0)
        .map(|(n, p)| term(n, -*p))
        .collect();
    let num = if num.is_empty() { "1".to_string() } else { num.join("\u{00b7}") };
    match den.len() {
        0 => num,
        1 => format!("{}/{}", num, den[0]),
        _ => format!("{}/({})", num, den.join("\u{00b7}")),
    }
}

impl Unit {
    /// A named unit: `factor` converts one of it into the coherent SI unit.
    pub fn named(name: &str, dimension: Dimension, factor: f64) -> Unit {
        Unit{
            dimension,
            factor,
            terms: vec![(name.to_string(), 1.0)],
            text: name.to_string(),
            format: None,
        }
    }

    fn from_terms(dimension: Dimension, factor: f64, terms: Vec<(String, f32)>) -> Unit {
        let text = render_terms(&terms);
        Unit{dimension, factor, terms, text, format: None}
    }

    pub fn text(&self) -> &str { &self.text }
    pub fn dimension(&self) -> Dimension { self.dimension }
    pub fn factor(&self) -> f64 { self.factor }
    pub fn format(&self) -> Option<&str> { self.format.as_deref() }

    pub fn with_format(mut self, format: &str) -> Unit {
        self.format = Some(format.to_string());
        self
    }

    /// Same magnitude under a new name, used for session defined units.
    pub fn renamed(&self, name: &str) -> Unit {
        Unit::named(name, self.dimension, self.factor)
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dimension.is_none()
    }

    pub fn is_temperature(&self) -> bool {
        self.dimension == Dimension{K: 1.0, ..UNITD}
    }

    pub fn is_angle(&self) -> bool {
        self.dimension == Dimension{rad: 1.0, ..UNITD}
    }

    pub fn is_consistent(&self, other: &Unit) -> bool {
        self.dimension == other.dimension
    }

    pub fn is_composite(&self) -> bool {
        self.text.contains(['\u{00b7}', '/', '^'])
    }

    /// Multiplier taking a number expressed in `self` into `other`.
    pub fn convert_to(&self, other: &Unit) -> f64 {
        self.factor / other.factor
    }

    pub fn pow(&self, n: f32) -> Unit {
        let terms = self.terms.iter()
            .map(|(name, p)| (name.clone(), p * n))
            .filter(|(_, p)| *p != 0.0)
            .collect();
        Unit::from_terms(self.dimension.powf(n), self.factor.powf(n as f64), terms)
    }

    /// Scales the unit by a plain number, as in `1000*m` inside a unit expression.
    pub fn scaled(&self, k: f64) -> Unit {
        if k == 1.0 {
            return self.clone();
        }
        let mut terms = vec![(format!("{}", k), 1.0)];
        terms.extend(self.terms.iter().cloned());
        Unit::from_terms(self.dimension, self.factor * k, terms)
    }

    /// Merges the terms of two units without any conversion, `sign` is 1 to
    /// multiply and -1 to divide.
    pub(crate) fn combine(&self, rhs: &Unit, sign: f32) -> Unit {
        let mut terms = self.terms.clone();
        for (name, p) in rhs.terms.iter() {
            match terms.iter_mut().find(|(n, _)| n == name) {
                Some(term) => term.1 += sign * p,
                None => terms.push((name.clone(), sign * p)),
            }
        }
        terms.retain(|(_, p)| *p != 0.0);
        let dimension = if sign > 0.0 {
            self.dimension * rhs.dimension
        } else {
            self.dimension / rhs.dimension
        };
        Unit::from_terms(dimension, self.factor * rhs.factor.powf(sign as f64), terms)
    }

    /// Product of two units. The returned number multiplies the value;
    /// `None` means the result carries no dimension.
    pub fn multiply(&self, rhs: &Unit) -> (f64, Option<Unit>) {
        if rhs.is_dimensionless() {
            return (rhs.factor, Some(self.clone()));
        }
        if self.is_dimensionless() {
            return (self.factor, Some(rhs.clone()));
        }
        if self.is_consistent(rhs) && self.text != rhs.text {
            return (rhs.factor / self.factor, Some(self.pow(2.0)));
        }
        let unit = self.combine(rhs, 1.0);
        if unit.is_dimensionless() {
            (unit.factor, None)
        } else {
            (1.0, Some(unit))
        }
    }

    pub fn divide(&self, rhs: &Unit) -> (f64, Option<Unit>) {
        if rhs.is_dimensionless() {
            return (1.0 / rhs.factor, Some(self.clone()));
        }
        if self.is_dimensionless() {
            return (self.factor, Some(rhs.pow(-1.0)));
        }
        if self.is_consistent(rhs) {
            return (self.factor / rhs.factor, None);
        }
        let unit = self.combine(rhs, -1.0);
        if unit.is_dimensionless() {
            (unit.factor, None)
        } else {
            (1.0, Some(unit))
        }
    }

    pub fn field(&self) -> Field {
        let d = self.dimension;
        let others = d.K == 0.0 && d.mol == 0.0 && d.cd == 0.0 && d.rad == 0.0 && d.custom == 0.0;
        if !others {
            Field::Other
        } else if d.A != 0.0 || (d.kg == 1.0 && d.s == -3.0 && d.m == 2.0) {
            Field::Electrical
        } else if d.kg == 1.0 && d.s == -2.0 {
            Field::Mechanical
        } else {
            Field::Other
        }
    }
}

/// Factor that converts a number in `ub` into `ua`, checking that the two
/// can be combined by `op`. Dimensionless scaled units (%, ‰) combine with
/// plain numbers.
pub fn convert(ua: Option<&Unit>, ub: Option<&Unit>, op: char) -> Result<f64, UnitError> {
    let inconsistent = || UnitError::Inconsistent{
        lhs: text_of(ua), op, rhs: text_of(ub),
    };
    match (ua, ub) {
        (None, None) => Ok(1.0),
        (Some(a), Some(b)) if a == b => Ok(1.0),
        (Some(a), Some(b)) if a.is_consistent(b) => Ok(b.convert_to(a)),
        (Some(a), None) if a.is_dimensionless() => Ok(1.0 / a.factor),
        (None, Some(b)) if b.is_dimensionless() => Ok(b.factor),
        _ => Err(inconsistent()),
    }
}

pub fn text_of(u: Option<&Unit>) -> String {
    u.map(|u| u.text.clone()).unwrap_or_else(|| "unitless".to_string())
}

/// Additive offset applied after scaling when converting between the
/// temperature scales.
pub fn temperature_delta(src: &str, tgt: &str) -> f64 {
    match src {
        "°C" => match tgt {
            "K" => 273.15,
            "°F" => 32.0,
            "°R" => 491.67,
            _ => 0.0,
        },
        "K" => match tgt {
            "°C" => -273.15,
            "°F" => -459.67,
            "°R" => 0.0,
            _ => 0.0,
        },
        "°F" => match tgt {
            "°C" => -17.0,
            "K" => 255.372222222222,
            "°R" => 459.67,
            _ => 0.0,
        },
        "°R" => match tgt {
            "°C" => -273.15,
            "°F" => -459.67,
            "K" => 0.0,
            _ => 0.0,
        },
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_display() {
        let force = Dimension{kg: 1.0, m: 1.0, s: -2.0, ..UNITD};
        assert_eq!(force.to_string(), "m\u{00b7}kg\u{00b7}s\u{207b}\u{00b2}");
        assert_eq!(force.si_name(), Some(("N", "newton")));
        assert_eq!(Dimension{m: 0.5, ..UNITD}.si_name(), None);
    }

    #[test]
    fn render_compound_terms() {
        let terms = vec![("kN".to_string(), 1.0), ("m".to_string(), 2.0), ("s".to_string(), -1.0)];
        assert_eq!(render_terms(&terms), "kN\u{00b7}m^2/s");
        let terms = vec![("s".to_string(), -1.0), ("A".to_string(), -2.0)];
        assert_eq!(render_terms(&terms), "1/(s\u{00b7}A^2)");
    }
}
