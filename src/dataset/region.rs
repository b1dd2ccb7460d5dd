use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// US state a startup operates in, encoded as a small integer feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    NewYork,
    Florida,
    California,
}

/// A `State` label outside the closed mapping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown region label {0:?} (expected one of \"New York\", \"Florida\", \"California\")")]
pub struct UnknownRegion(pub String);

impl Region {
    /// Every region in code order.
    pub const ALL: [Region; 3] = [Region::NewYork, Region::Florida, Region::California];

    /// Label exactly as it appears in the CSV.
    pub fn label(self) -> &'static str {
        match self {
            Region::NewYork => "New York",
            Region::Florida => "Florida",
            Region::California => "California",
        }
    }

    /// Integer code used as the model feature.
    pub fn code(self) -> u8 {
        match self {
            Region::NewYork => 0,
            Region::Florida => 1,
            Region::California => 2,
        }
    }

    /// Feature value for the model.
    pub fn as_feature(self) -> f64 {
        f64::from(self.code())
    }
}

impl FromStr for Region {
    type Err = UnknownRegion;

    /// Exact, case-sensitive match; no trimming.
    fn from_str(label: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|region| region.label() == label)
            .ok_or_else(|| UnknownRegion(label.to_string()))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_labels_map_to_fixed_codes() {
        assert_eq!("New York".parse::<Region>().unwrap().code(), 0);
        assert_eq!("Florida".parse::<Region>().unwrap().code(), 1);
        assert_eq!("California".parse::<Region>().unwrap().code(), 2);
    }

    #[test]
    fn unknown_or_near_miss_labels_are_rejected() {
        for label in ["Texas", "new york", " Florida", "California ", ""] {
            let err = label.parse::<Region>().unwrap_err();
            assert_eq!(err, UnknownRegion(label.to_string()));
        }
    }

    #[test]
    fn codes_follow_declaration_order() {
        for (index, region) in Region::ALL.into_iter().enumerate() {
            assert_eq!(usize::from(region.code()), index);
            assert_eq!(region.as_feature(), index as f64);
        }
    }
}
