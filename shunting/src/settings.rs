use std::env;
use std::str::FromStr;

/// Unit assumed for the arguments of trigonometric functions when they
/// carry no angle unit of their own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AngleUnit {
    Deg,
    Rad,
    Grad,
}

impl AngleUnit {
    /// Radians in one unit of this kind.
    pub fn factor(self) -> f64 {
        match self {
            AngleUnit::Deg => std::f64::consts::PI / 180.0,
            AngleUnit::Rad => 1.0,
            AngleUnit::Grad => std::f64::consts::PI / 200.0,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            AngleUnit::Deg => "°",
            AngleUnit::Rad => "rad",
            AngleUnit::Grad => "grad",
        }
    }
}

impl FromStr for AngleUnit {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deg" | "d" => Ok(AngleUnit::Deg),
            "rad" | "r" => Ok(AngleUnit::Rad),
            "grad" | "g" => Ok(AngleUnit::Grad),
            other => Err(format!("unknown angle unit {:?}", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub complex: bool,
    pub angle: AngleUnit,
    pub decimals: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings{complex: false, angle: AngleUnit::Deg, decimals: 6}
    }
}

impl Settings {
    pub fn complex(mut self, complex: bool) -> Self {
        self.complex = complex;
        self
    }

    pub fn angle(mut self, angle: AngleUnit) -> Self {
        self.angle = angle;
        self
    }

    pub fn decimals(mut self, decimals: usize) -> Self {
        self.decimals = decimals.min(15);
        self
    }

    /// Defaults overridden by TOX_COMPLEX, TOX_ANGLE and TOX_DECIMALS.
    pub fn from_env() -> Self {
        let mut settings = Settings::default();
        if let Ok(complex) = env::var("TOX_COMPLEX") {
            match complex.trim() {
                "1" | "true" | "yes" => settings.complex = true,
                "0" | "false" | "no" => settings.complex = false,
                other => log::warn!("ignoring TOX_COMPLEX={:?}", other),
            }
        }
        if let Ok(angle) = env::var("TOX_ANGLE") {
            match angle.parse() {
                Ok(angle) => settings.angle = angle,
                Err(e) => log::warn!("ignoring TOX_ANGLE: {}", e),
            }
        }
        if let Ok(decimals) = env::var("TOX_DECIMALS") {
            match decimals.trim().parse() {
                Ok(decimals) => settings = settings.decimals(decimals),
                Err(_) => log::warn!("ignoring TOX_DECIMALS={:?}", decimals),
            }
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder() {
        let s = Settings::default().complex(true).angle(AngleUnit::Rad).decimals(40);
        assert!(s.complex);
        assert_eq!(s.angle, AngleUnit::Rad);
        assert_eq!(s.decimals, 15);
        assert_eq!("GRAD".parse::<AngleUnit>(), Ok(AngleUnit::Grad));
        assert!("turns".parse::<AngleUnit>().is_err());
    }
}
