use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Fixed set of listing categories. Stored in the database as the
/// display name, so parsing and formatting must round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Auto,
    Toys,
    Electronics,
    Fashion,
    Home,
}

impl Category {
    pub const ALL: [Self; 5] = [
        Self::Auto,
        Self::Toys,
        Self::Electronics,
        Self::Fashion,
        Self::Home,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "Auto",
            Self::Toys => "Toys",
            Self::Electronics => "Electronics",
            Self::Fashion => "Fashion",
            Self::Home => "Home",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category: {}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Auto" => Ok(Self::Auto),
            "Toys" => Ok(Self::Toys),
            "Electronics" => Ok(Self::Electronics),
            "Fashion" => Ok(Self::Fashion),
            "Home" => Ok(Self::Home),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
        }
    }

    #[test]
    fn test_unknown_rejected() {
        assert!("Boats".parse::<Category>().is_err());
        assert!("".parse::<Category>().is_err());
        // Case sensitive, matching the stored form
        assert!("auto".parse::<Category>().is_err());
    }
}
