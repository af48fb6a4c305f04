use std::sync::Arc;

use crate::{convert, lookup, parse, parse_with, temperature_delta, Unit, UnitError, CUSTOM};

macro_rules! fuzzy_eq {
    ($lhs:expr, $rhs:expr) => { assert!(($lhs - $rhs).abs() < 1.0e-10) }
}

#[test]
fn test_parse_simple() {
    let u = parse("km").unwrap();
    assert_eq!(u.text(), "km");
    fuzzy_eq!(u.factor(), 1000.0);
}

#[test]
fn test_parse_compound() {
    let u = parse("kN*m/s^2").unwrap();
    assert_eq!(u.text(), "kN\u{00b7}m/s^2");
    fuzzy_eq!(u.factor(), 1000.0);
    let u = parse("kg·m^2/(s^2·A)").unwrap();
    assert_eq!(u.dimension(), lookup("Wb").unwrap().dimension());
}

#[test]
fn test_parse_precedence() {
    // ^ before / before *
    let a = parse("m/s*kg").unwrap();
    let b = parse("m*kg/s").unwrap();
    assert_eq!(a.dimension(), b.dimension());
    let c = parse("m^2/s").unwrap();
    assert_eq!(c.dimension().m, 2.0);
    assert_eq!(c.dimension().s, -1.0);
}

#[test]
fn test_parse_scaled() {
    let u = parse("1000*m").unwrap();
    fuzzy_eq!(u.factor(), 1000.0);
    assert!(u.is_consistent(&lookup("km").unwrap()));
    let u = parse("1/s").unwrap();
    assert_eq!(u.text(), "1/s");
}

#[test]
fn test_parse_format() {
    let u = parse("kN:f2").unwrap();
    assert_eq!(u.text(), "kN");
    assert_eq!(u.format(), Some("f2"));
}

#[test]
fn test_parse_errors() {
    assert_eq!(parse("m & s"), Err(UnitError::InvalidSymbol('&')));
    assert_eq!(parse("foo"), Err(UnitError::InvalidUnits("foo".to_string())));
    assert_eq!(parse("m s"), Err(UnitError::Syntax{prev: "m".to_string(), cur: "s".to_string()}));
    assert_eq!(parse("m)"), Err(UnitError::MissingLeftBracket));
    assert_eq!(parse("(m"), Err(UnitError::MissingRightBracket));
    assert_eq!(parse("m*"), Err(UnitError::IncompleteExpression));
    assert_eq!(parse("m^s"), Err(UnitError::PowerNotUnitless));
    assert_eq!(parse("2*3"), Err(UnitError::NotUnits));
    assert_eq!(parse("1..2*m"), Err(UnitError::InvalidNumber("1..2".to_string())));
}

#[test]
fn test_parse_custom_lookup() {
    let euro = Arc::new(Unit::named("€", CUSTOM, 1.0));
    let find = |name: &str| if name == "€" { Some(euro.clone()) } else { lookup(name) };
    let u = parse_with("€/kg", find).unwrap();
    assert_eq!(u.text(), "€/kg");
    assert!(parse("€").is_err());
}

#[test]
fn test_multiply_units() {
    let m = lookup("m").unwrap();
    let cm = lookup("cm").unwrap();
    let (k, u) = m.multiply(&cm);
    fuzzy_eq!(k, 0.01);
    assert_eq!(u.unwrap().text(), "m^2");
    let s = lookup("s").unwrap();
    let (k, u) = m.multiply(&s);
    fuzzy_eq!(k, 1.0);
    assert_eq!(u.unwrap().text(), "m\u{00b7}s");
}

#[test]
fn test_divide_units() {
    let km = lookup("km").unwrap();
    let m = lookup("m").unwrap();
    let (k, u) = km.divide(&m);
    fuzzy_eq!(k, 1000.0);
    assert!(u.is_none());
    let h = lookup("h").unwrap();
    let (k, u) = km.divide(&h);
    fuzzy_eq!(k, 1.0);
    let kmh = u.unwrap();
    assert_eq!(kmh.text(), "km/h");
    fuzzy_eq!(kmh.convert_to(&lookup("kmh").unwrap()), 1.0);
}

#[test]
fn test_convert() {
    let m = lookup("m").unwrap();
    let cm = lookup("cm").unwrap();
    let s = lookup("s").unwrap();
    fuzzy_eq!(convert(Some(&m), Some(&cm), '+').unwrap(), 0.01);
    assert!(convert(Some(&m), Some(&s), '+').is_err());
    assert!(convert(Some(&m), None, '+').is_err());
    let pct = lookup("%").unwrap();
    fuzzy_eq!(convert(None, Some(&pct), '+').unwrap(), 0.01);
}

#[test]
fn test_temperature_delta() {
    fuzzy_eq!(temperature_delta("°C", "K"), 273.15);
    fuzzy_eq!(temperature_delta("°C", "°F"), 32.0);
    fuzzy_eq!(temperature_delta("K", "°F"), -459.67);
    fuzzy_eq!(temperature_delta("°F", "°C"), -17.0);
    fuzzy_eq!(temperature_delta("°C", "°R"), 491.67);
    fuzzy_eq!(temperature_delta("°F", "°R"), 459.67);
    fuzzy_eq!(temperature_delta("°R", "°C"), -273.15);
    fuzzy_eq!(temperature_delta("°R", "K"), 0.0);
    fuzzy_eq!(temperature_delta("m", "K"), 0.0);
}

#[test]
fn test_fields() {
    use crate::Field;
    assert_eq!(parse("kN/m^2").unwrap().field(), Field::Mechanical);
    assert_eq!(parse("V*A").unwrap().field(), Field::Electrical);
    assert_eq!(parse("m/s").unwrap().field(), Field::Other);
}
