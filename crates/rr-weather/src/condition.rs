//! Coarse weather condition labels.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Main weather group reported for a coordinate, following the group names
/// used by common weather providers ("Rain", "Clouds", ...).
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Condition {
    Clear,
    Clouds,
    Drizzle,
    Rain,
    Snow,
    Thunderstorm,
    Mist,
    Fog,
    /// Any label without a dedicated variant, kept verbatim.
    Other(String),
}

impl Condition {
    /// Parse a provider label, case-insensitively.  Unknown labels become
    /// [`Condition::Other`].
    pub fn from_label(label: &str) -> Condition {
        let trimmed = label.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "clear"        => Condition::Clear,
            "clouds"       => Condition::Clouds,
            "drizzle"      => Condition::Drizzle,
            "rain"         => Condition::Rain,
            "snow"         => Condition::Snow,
            "thunderstorm" => Condition::Thunderstorm,
            "mist"         => Condition::Mist,
            "fog"          => Condition::Fog,
            _              => Condition::Other(trimmed.to_string()),
        }
    }

    /// Conditions that flag a route window as rainy.  Drizzle does not count.
    pub fn is_precipitation(&self) -> bool {
        matches!(self, Condition::Rain | Condition::Snow | Condition::Thunderstorm)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Condition::Clear        => "Clear",
            Condition::Clouds       => "Clouds",
            Condition::Drizzle      => "Drizzle",
            Condition::Rain         => "Rain",
            Condition::Snow         => "Snow",
            Condition::Thunderstorm => "Thunderstorm",
            Condition::Mist         => "Mist",
            Condition::Fog          => "Fog",
            Condition::Other(s)     => s,
        };
        f.write_str(label)
    }
}
