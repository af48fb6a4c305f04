use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::si_units::{magnitude_prefix, Dimension, Unit, UNITD};

macro_rules! dim {
    ($($d:ident: $p:expr),*) => { Dimension{$($d: $p,)* ..UNITD} };
}

const MASS: Dimension = dim!(kg: 1.0);
const LENGTH: Dimension = dim!(m: 1.0);
const AREA: Dimension = dim!(m: 2.0);
const VOLUME: Dimension = dim!(m: 3.0);
const TIME: Dimension = dim!(s: 1.0);
const CURRENT: Dimension = dim!(A: 1.0);
const TEMPERATURE: Dimension = dim!(K: 1.0);
const SUBSTANCE: Dimension = dim!(mol: 1.0);
const LUMINOSITY: Dimension = dim!(cd: 1.0);
const ANGLE: Dimension = dim!(rad: 1.0);
const FREQUENCY: Dimension = dim!(s: -1.0);
const SPEED: Dimension = dim!(m: 1.0, s: -1.0);
const FORCE: Dimension = dim!(kg: 1.0, m: 1.0, s: -2.0);
const MOMENT: Dimension = dim!(kg: 1.0, m: 2.0, s: -2.0);
const PRESSURE: Dimension = dim!(kg: 1.0, m: -1.0, s: -2.0);
const ENERGY: Dimension = MOMENT;
const POWER: Dimension = dim!(kg: 1.0, m: 2.0, s: -3.0);
const CHARGE: Dimension = dim!(s: 1.0, A: 1.0);
const VOLTAGE: Dimension = dim!(kg: 1.0, m: 2.0, s: -3.0, A: -1.0);
const CAPACITANCE: Dimension = dim!(kg: -1.0, m: -2.0, s: 4.0, A: 2.0);
const RESISTANCE: Dimension = dim!(kg: 1.0, m: 2.0, s: -3.0, A: -2.0);
const CONDUCTANCE: Dimension = dim!(kg: -1.0, m: -2.0, s: 3.0, A: 2.0);
const FLUX: Dimension = dim!(kg: 1.0, m: 2.0, s: -2.0, A: -1.0);
const FLUX_DENSITY: Dimension = dim!(kg: 1.0, s: -2.0, A: -1.0);
const INDUCTANCE: Dimension = dim!(kg: 1.0, m: 2.0, s: -2.0, A: -2.0);
const DOSE: Dimension = dim!(m: 2.0, s: -2.0);

const G: f64 = 9.80665;
const LB: f64 = 0.45359237;
const INCH: f64 = 0.0254;

// (symbol, dimension, factor to coherent SI, takes metric prefixes)
static TABLE: &[(&str, Dimension, f64, bool)] = &[
    ("g", MASS, 1e-3, true),
    ("t", MASS, 1e3, false),
    ("lb", MASS, LB, false),
    ("oz", MASS, LB / 16.0, false),
    ("m", LENGTH, 1.0, true),
    ("in", LENGTH, INCH, false),
    ("ft", LENGTH, 12.0 * INCH, false),
    ("yd", LENGTH, 36.0 * INCH, false),
    ("mi", LENGTH, 1609.344, false),
    ("nmi", LENGTH, 1852.0, false),
    ("a", AREA, 100.0, false),
    ("ha", AREA, 1e4, false),
    ("L", VOLUME, 1e-3, true),
    ("gal", VOLUME, 3.785411784e-3, false),
    ("s", TIME, 1.0, true),
    ("min", TIME, 60.0, false),
    ("h", TIME, 3600.0, false),
    ("d", TIME, 86400.0, false),
    ("w", TIME, 604800.0, false),
    ("y", TIME, 31556952.0, false),
    ("Hz", FREQUENCY, 1.0, true),
    ("rpm", FREQUENCY, 1.0 / 60.0, false),
    ("kmh", SPEED, 1.0 / 3.6, false),
    ("mph", SPEED, 1609.344 / 3600.0, false),
    ("knot", SPEED, 1852.0 / 3600.0, false),
    ("A", CURRENT, 1.0, true),
    ("Ah", CHARGE, 3600.0, false),
    ("K", TEMPERATURE, 1.0, false),
    ("°C", TEMPERATURE, 1.0, false),
    ("Δ°C", TEMPERATURE, 1.0, false),
    ("°F", TEMPERATURE, 5.0 / 9.0, false),
    ("Δ°F", TEMPERATURE, 5.0 / 9.0, false),
    ("°R", TEMPERATURE, 5.0 / 9.0, false),
    ("mol", SUBSTANCE, 1.0, true),
    ("cd", LUMINOSITY, 1.0, false),
    ("N", FORCE, 1.0, true),
    ("kgf", FORCE, G, false),
    ("tf", FORCE, G * 1e3, false),
    ("lbf", FORCE, G * LB, false),
    ("kip", FORCE, G * LB * 1e3, false),
    ("dyn", FORCE, 1e-5, false),
    ("Nm", MOMENT, 1.0, false),
    ("kNm", MOMENT, 1e3, false),
    ("Pa", PRESSURE, 1.0, true),
    ("bar", PRESSURE, 1e5, true),
    ("atm", PRESSURE, 101325.0, false),
    ("at", PRESSURE, G * 1e4, false),
    ("psi", PRESSURE, G * LB / (INCH * INCH), false),
    ("ksi", PRESSURE, G * LB * 1e3 / (INCH * INCH), false),
    ("mmHg", PRESSURE, 133.322387415, false),
    ("J", ENERGY, 1.0, true),
    ("Wh", ENERGY, 3600.0, true),
    ("eV", ENERGY, 1.602176634e-19, true),
    ("cal", ENERGY, 4.1868, false),
    ("kcal", ENERGY, 4186.8, false),
    ("BTU", ENERGY, 1055.05585262, false),
    ("W", POWER, 1.0, true),
    ("VA", POWER, 1.0, true),
    ("hp", POWER, 745.69987158227, false),
    ("C", CHARGE, 1.0, true),
    ("V", VOLTAGE, 1.0, true),
    ("F", CAPACITANCE, 1.0, true),
    ("Ω", RESISTANCE, 1.0, true),
    ("S", CONDUCTANCE, 1.0, true),
    ("Wb", FLUX, 1.0, true),
    ("T", FLUX_DENSITY, 1.0, true),
    ("H", INDUCTANCE, 1.0, true),
    ("Bq", FREQUENCY, 1.0, false),
    ("Gy", DOSE, 1.0, false),
    ("Sv", DOSE, 1.0, false),
    ("rad", ANGLE, 1.0, false),
    ("deg", ANGLE, PI / 180.0, false),
    ("°", ANGLE, PI / 180.0, false),
    ("′", ANGLE, PI / 10800.0, false),
    ("″", ANGLE, PI / 648000.0, false),
    ("grad", ANGLE, PI / 200.0, false),
    ("rev", ANGLE, 2.0 * PI, false),
    ("%", UNITD, 1e-2, false),
    ("‰", UNITD, 1e-3, false),
    ("‱", UNITD, 1e-4, false),
];

const PREFIXES: [i32; 12] = [-12, -9, -6, -3, -2, -1, 1, 2, 3, 6, 9, 12];

static UNITS: Lazy<HashMap<String, Arc<Unit>>> = Lazy::new(|| {
    let mut units = HashMap::new();
    for (name, dimension, factor, _) in TABLE {
        units.insert(name.to_string(), Arc::new(Unit::named(name, *dimension, *factor)));
    }
    for (name, dimension, factor, prefixed) in TABLE {
        if !prefixed {
            continue;
        }
        for exp in PREFIXES {
            if let Some((prefix, _)) = magnitude_prefix(exp) {
                let symbol = format!("{}{}", prefix, name);
                let k = factor * 10f64.powi(exp);
                // plain names win over prefixed ones (min, cd, ha...)
                units.entry(symbol.clone())
                    .or_insert_with(|| Arc::new(Unit::named(&symbol, *dimension, k)));
            }
        }
    }
    log::debug!("unit registry holds {} units", units.len());
    units
});

/// Finds a built in unit by its symbol.
pub fn lookup(name: &str) -> Option<Arc<Unit>> {
    UNITS.get(name).cloned()
}

pub fn exists(name: &str) -> bool {
    UNITS.contains_key(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_units() {
        let km = lookup("km").unwrap();
        assert_eq!(km.factor(), 1e3);
        assert!((lookup("kg").unwrap().factor() - 1.0).abs() < 1e-15);
        assert_eq!(lookup("min").unwrap().factor(), 60.0);
        assert!((lookup("mA").unwrap().factor() - 1e-3).abs() < 1e-18);
        assert!(exists("kPa"));
        assert!(!exists("kmin"));
    }

    #[test]
    fn named_dimensions() {
        assert_eq!(lookup("kN").unwrap().dimension().si_name(), Some(("N", "newton")));
        assert!(lookup("°F").unwrap().is_temperature());
        assert!(lookup("%").unwrap().is_dimensionless());
    }
}
