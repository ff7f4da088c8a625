use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::prelude::{EngineError, EngineResult};

/// Detection wavelength held as an integer count of tenths of a nanometer.
///
/// Equality, hashing and ordering are exact on the tenths count, so `"280"`,
/// `"280.0"` and `280.0` all identify the same column. The canonical key is
/// the one-decimal [`Display`](fmt::Display) form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Wavelength(u32);

impl Wavelength {
    /// Round a value in nanometers to the nearest tenth.
    pub fn from_nm(nm: f64) -> EngineResult<Self> {
        if !nm.is_finite() || nm <= 0.0 {
            return Err(EngineError::MalformedWavelengthKey(nm.to_string()));
        }
        let tenths = (nm * 10.0).round();
        if tenths < 1.0 || tenths > f64::from(u32::MAX) {
            return Err(EngineError::MalformedWavelengthKey(nm.to_string()));
        }
        Ok(Self(tenths as u32))
    }

    pub fn tenths(self) -> u32 {
        self.0
    }

    pub fn nm(self) -> f64 {
        f64::from(self.0) / 10.0
    }

    /// Canonical one-decimal key used for column headers.
    pub fn key(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Wavelength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0 / 10, self.0 % 10)
    }
}

impl FromStr for Wavelength {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let nm: f64 = raw
            .trim()
            .parse()
            .map_err(|_| EngineError::MalformedWavelengthKey(raw.to_string()))?;
        Self::from_nm(nm).map_err(|_| EngineError::MalformedWavelengthKey(raw.to_string()))
    }
}

impl Serialize for Wavelength {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equivalent_spellings_normalize_to_one_key() {
        let a: Wavelength = "280.0".parse().unwrap();
        let b: Wavelength = "280".parse().unwrap();
        let c = Wavelength::from_nm(280.0).unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.key(), "280.0");
    }

    #[test]
    fn display_keeps_one_decimal() {
        assert_eq!(Wavelength::from_nm(254.3).unwrap().to_string(), "254.3");
        assert_eq!(Wavelength::from_nm(0.5).unwrap().to_string(), "0.5");
        assert_eq!(Wavelength::from_nm(281.96).unwrap().to_string(), "282.0");
    }

    #[test]
    fn ordering_is_numeric_not_lexical() {
        let short: Wavelength = "95.0".parse().unwrap();
        let long: Wavelength = "210.0".parse().unwrap();
        assert!(short < long);
    }

    #[test]
    fn malformed_keys_are_rejected() {
        for raw in ["", "abc", "-5.0", "0", "NaN", "inf"] {
            assert!(
                matches!(
                    raw.parse::<Wavelength>(),
                    Err(EngineError::MalformedWavelengthKey(_))
                ),
                "{raw} should not parse"
            );
        }
    }
}
