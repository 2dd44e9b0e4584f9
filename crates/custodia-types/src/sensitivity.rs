//! Field classification and mask pattern enums.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Coarse data classification attached to a field name.
///
/// Fields that are not classified are treated as [`SensitivityLevel::Public`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensitivityLevel {
    #[default]
    Public,
    Internal,
    Confidential,
    /// Protected Health Information.
    Phi,
    /// Personally Identifiable Information.
    Pii,
}

impl fmt::Display for SensitivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SensitivityLevel::Public => "public",
            SensitivityLevel::Internal => "internal",
            SensitivityLevel::Confidential => "confidential",
            SensitivityLevel::Phi => "phi",
            SensitivityLevel::Pii => "pii",
        };
        f.write_str(s)
    }
}

/// How a restricted value is rendered for a viewer without access.
///
/// Every pattern is a one-way, deterministic string transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MaskPattern {
    /// Keep the first and last two characters.
    Partial,
    /// Replace every character.
    #[default]
    Full,
    /// `[REDACTED-<len>]`: reveals only the length.
    Hash,
    Email,
    Phone,
    Ssn,
    CreditCard,
}

impl MaskPattern {
    pub const ALL: [MaskPattern; 7] = [
        MaskPattern::Partial,
        MaskPattern::Full,
        MaskPattern::Hash,
        MaskPattern::Email,
        MaskPattern::Phone,
        MaskPattern::Ssn,
        MaskPattern::CreditCard,
    ];

    /// The configuration name of this pattern.
    pub fn as_str(&self) -> &'static str {
        match self {
            MaskPattern::Partial => "partial",
            MaskPattern::Full => "full",
            MaskPattern::Hash => "hash",
            MaskPattern::Email => "email",
            MaskPattern::Phone => "phone",
            MaskPattern::Ssn => "ssn",
            MaskPattern::CreditCard => "credit-card",
        }
    }

    /// Parse a pattern name, falling back to [`MaskPattern::Full`] for
    /// anything unrecognized so a typo never exposes a raw value.
    pub fn from_name_lossy(name: &str) -> Self {
        match name.parse() {
            Ok(pattern) => pattern,
            Err(()) => {
                tracing::warn!(pattern = %name, "unknown mask pattern, using full mask");
                MaskPattern::Full
            }
        }
    }
}

impl FromStr for MaskPattern {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MaskPattern::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for MaskPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MaskPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MaskPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(MaskPattern::from_name_lossy(&s))
    }
}
