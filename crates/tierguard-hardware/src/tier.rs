//! Performance tiers and the `auto` preset choice

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnknownPresetError;

/// A named bundle of per-file setting values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    /// Weak hardware: integrated graphics, little RAM
    LowEnd,
    /// Mid-range hardware
    Balanced,
    /// Strong hardware: dedicated GPU, plenty of RAM and cores
    HighEnd,
}

impl Tier {
    /// Every tier, lowest first
    pub const ALL: [Tier; 3] = [Tier::LowEnd, Tier::Balanced, Tier::HighEnd];

    /// Wire name of the tier
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::LowEnd => "low-end",
            Tier::Balanced => "balanced",
            Tier::HighEnd => "high-end",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = UnknownPresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low-end" | "low" => Ok(Tier::LowEnd),
            "balanced" | "medium" => Ok(Tier::Balanced),
            "high-end" | "high" => Ok(Tier::HighEnd),
            _ => Err(UnknownPresetError(s.to_string())),
        }
    }
}

/// What the caller asked for: a fixed tier, or let the profiler decide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PresetChoice {
    /// Use the hardware profiler's recommendation
    #[default]
    Auto,
    /// Use this tier regardless of hardware
    Fixed(Tier),
}

impl PresetChoice {
    /// The fixed tier, if one was chosen
    pub fn fixed(&self) -> Option<Tier> {
        match self {
            PresetChoice::Auto => None,
            PresetChoice::Fixed(tier) => Some(*tier),
        }
    }
}

impl From<Tier> for PresetChoice {
    fn from(tier: Tier) -> Self {
        PresetChoice::Fixed(tier)
    }
}

impl fmt::Display for PresetChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetChoice::Auto => f.write_str("auto"),
            PresetChoice::Fixed(tier) => tier.fmt(f),
        }
    }
}

impl TryFrom<String> for PresetChoice {
    type Error = UnknownPresetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PresetChoice> for String {
    fn from(choice: PresetChoice) -> Self {
        choice.to_string()
    }
}

impl FromStr for PresetChoice {
    type Err = UnknownPresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(PresetChoice::Auto);
        }
        s.parse().map(PresetChoice::Fixed)
    }
}
