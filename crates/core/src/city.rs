//! Serviceable cities.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A city the shop delivers to. Stock is partitioned per city.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum City {
    Riyadh,
    Jeddah,
}

impl City {
    pub const ALL: [City; 2] = [City::Riyadh, City::Jeddah];

    pub fn as_str(&self) -> &'static str {
        match self {
            City::Riyadh => "Riyadh",
            City::Jeddah => "Jeddah",
        }
    }

    /// Arabic display name used in localized customer messages.
    pub fn name_ar(&self) -> &'static str {
        match self {
            City::Riyadh => "الرياض",
            City::Jeddah => "جدة",
        }
    }
}

impl core::fmt::Display for City {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for City {
    type Err = DomainError;

    /// Case-insensitive; accepts the Arabic names too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        City::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(trimmed) || c.name_ar() == trimmed)
            .ok_or_else(|| DomainError::validation(format!("unsupported city '{trimmed}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively_and_in_arabic() {
        assert_eq!("riyadh".parse::<City>().unwrap(), City::Riyadh);
        assert_eq!(" JEDDAH ".parse::<City>().unwrap(), City::Jeddah);
        assert_eq!("جدة".parse::<City>().unwrap(), City::Jeddah);
    }

    #[test]
    fn unknown_city_is_a_validation_error() {
        let err = "Dammam".parse::<City>().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
