// crates/placedex-core/src/category.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The administrative level of a place.
///
/// Each category carries a *baseline*: the dominant term of every score
/// computed for its places. A lower baseline ranks earlier, so a country
/// always sorts ahead of a state with a similar name, and so on down to
/// postal codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Country,
    State,
    City,
    County,
    PostalCode,
}

impl Category {
    /// Harvest order: the least important categories first, so the ones
    /// users search for most are refreshed last and are freshest.
    pub const ALL: [Category; 5] = [
        Category::PostalCode,
        Category::County,
        Category::City,
        Category::State,
        Category::Country,
    ];

    /// The `locationcategoryid` the upstream catalog uses.
    pub fn upstream_id(self) -> &'static str {
        match self {
            Category::Country => "CNTRY",
            Category::State => "ST",
            Category::City => "CITY",
            Category::County => "CNTY",
            Category::PostalCode => "ZIP",
        }
    }

    /// Human-readable label returned with suggestions.
    pub fn label(self) -> &'static str {
        match self {
            Category::Country => "country",
            Category::State => "state",
            Category::City => "city",
            Category::County => "county",
            Category::PostalCode => "postal-code",
        }
    }

    pub fn baseline(self) -> u64 {
        match self {
            Category::Country => 1,
            Category::State => 2,
            Category::City => 3,
            Category::County => 4,
            Category::PostalCode => 5,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Accepts either the display label or the upstream id, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(s) || c.upstream_id().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown place category: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baselines_follow_administrative_priority() {
        assert!(Category::Country.baseline() < Category::State.baseline());
        assert!(Category::State.baseline() < Category::City.baseline());
        assert!(Category::City.baseline() < Category::County.baseline());
        assert!(Category::County.baseline() < Category::PostalCode.baseline());
    }

    #[test]
    fn parses_labels_and_upstream_ids() {
        assert_eq!("state".parse::<Category>(), Ok(Category::State));
        assert_eq!("ZIP".parse::<Category>(), Ok(Category::PostalCode));
        assert_eq!(" cnty ".parse::<Category>(), Ok(Category::County));
        assert!("planet".parse::<Category>().is_err());
    }
}
