mod error;
mod registry;
mod si_units;
mod units_parser;
#[cfg(test)] mod units_parser_test;

pub use error::UnitError;
pub use registry::{exists, lookup};
pub use si_units::{convert, temperature_delta, text_of, Dimension, Field, Unit, CUSTOM, UNITD};
pub use units_parser::{is_currency, is_unit_char, parse, parse_with};
