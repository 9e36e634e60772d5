//! Identifier newtypes
//!
//! The backend uses integer primary keys. Wrapping them keeps venue ids and plan ids
//! from being mixed up when building requests.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

numeric_id!(
    /// Identifier of a venue
    VenueId
);

numeric_id!(
    /// Identifier of a saved plan (a "path" on the backend)
    PlanId
);

numeric_id!(
    /// Identifier of a registered user
    UserId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let id = PlanId(17);
        assert_eq!(id.to_string(), "17");
        assert_eq!(" 17 ".parse::<PlanId>().unwrap(), id);
        assert!("seventeen".parse::<VenueId>().is_err());
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&VenueId(3)).unwrap();
        assert_eq!(json, "3");
        let back: VenueId = serde_json::from_str("3").unwrap();
        assert_eq!(back, VenueId(3));
    }
}
