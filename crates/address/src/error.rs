use std::fmt;

/// Ambiguity reported by a tagger. Expected on messy input and handled by
/// the fail-open policy; never surfaced past the normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    /// A component label would appear twice, non-contiguously.
    RepeatedLabel { label: String, input: String },
}

impl fmt::Display for TagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RepeatedLabel { label, input } => {
                write!(f, "repeated label '{label}' while tagging '{input}'")
            }
        }
    }
}

impl std::error::Error for TagError {}

/// Data-quality violations. The canonicalization tables are a closed,
/// curated vocabulary; these abort the run so a human can extend them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// The tagger emitted a label outside the known component set.
    UnknownComponent { label: String, input: String },
    /// A token tagged as street type has no canonical abbreviation.
    UnknownStreetType { value: String, input: String },
    /// A token tagged as directional has no canonical abbreviation.
    UnknownDirectional { value: String, input: String },
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownComponent { label, input } => {
                write!(f, "unknown address component '{label}' in '{input}'")
            }
            Self::UnknownStreetType { value, input } => {
                write!(f, "unknown street type '{value}' in '{input}'")
            }
            Self::UnknownDirectional { value, input } => {
                write!(f, "unknown directional '{value}' in '{input}'")
            }
        }
    }
}

impl std::error::Error for AddressError {}
