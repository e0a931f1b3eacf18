use std::fmt;
use std::str::FromStr;

/// Address component labels a tagger may emit.
///
/// Label strings are the ones used by the common US address taggers, so a
/// tagger backed by an external parser can hand its dictionary over
/// unchanged. Anything outside this set is rejected by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    AddressNumberPrefix,
    AddressNumber,
    AddressNumberSuffix,
    StreetNamePreModifier,
    StreetNamePreDirectional,
    StreetNamePreType,
    StreetName,
    StreetNamePostType,
    StreetNamePostDirectional,
    StreetNamePostModifier,
    OccupancyType,
    OccupancyIdentifier,
    SubaddressType,
    SubaddressIdentifier,
    BuildingName,
    Recipient,
    PlaceName,
    StateName,
    ZipCode,
    UspsBoxType,
    UspsBoxId,
}

impl Component {
    pub const ALL: [Component; 21] = [
        Self::AddressNumberPrefix,
        Self::AddressNumber,
        Self::AddressNumberSuffix,
        Self::StreetNamePreModifier,
        Self::StreetNamePreDirectional,
        Self::StreetNamePreType,
        Self::StreetName,
        Self::StreetNamePostType,
        Self::StreetNamePostDirectional,
        Self::StreetNamePostModifier,
        Self::OccupancyType,
        Self::OccupancyIdentifier,
        Self::SubaddressType,
        Self::SubaddressIdentifier,
        Self::BuildingName,
        Self::Recipient,
        Self::PlaceName,
        Self::StateName,
        Self::ZipCode,
        Self::UspsBoxType,
        Self::UspsBoxId,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AddressNumberPrefix => "AddressNumberPrefix",
            Self::AddressNumber => "AddressNumber",
            Self::AddressNumberSuffix => "AddressNumberSuffix",
            Self::StreetNamePreModifier => "StreetNamePreModifier",
            Self::StreetNamePreDirectional => "StreetNamePreDirectional",
            Self::StreetNamePreType => "StreetNamePreType",
            Self::StreetName => "StreetName",
            Self::StreetNamePostType => "StreetNamePostType",
            Self::StreetNamePostDirectional => "StreetNamePostDirectional",
            Self::StreetNamePostModifier => "StreetNamePostModifier",
            Self::OccupancyType => "OccupancyType",
            Self::OccupancyIdentifier => "OccupancyIdentifier",
            Self::SubaddressType => "SubaddressType",
            Self::SubaddressIdentifier => "SubaddressIdentifier",
            Self::BuildingName => "BuildingName",
            Self::Recipient => "Recipient",
            Self::PlaceName => "PlaceName",
            Self::StateName => "StateName",
            Self::ZipCode => "ZipCode",
            Self::UspsBoxType => "USPSBoxType",
            Self::UspsBoxId => "USPSBoxID",
        }
    }

    /// Labels that belong to the place trailer, never to the street address.
    pub fn is_place(&self) -> bool {
        matches!(self, Self::PlaceName | Self::StateName | Self::ZipCode)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Component {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| s.to_string())
    }
}

/// Ordered `(label, value)` pairs as a tagger produced them.
///
/// Labels stay strings until the normalizer validates them, so a tagger
/// that emits something unexpected is caught at one place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentMap {
    entries: Vec<(String, String)>,
}

impl ComponentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value. Consecutive values under the same label are joined
    /// with a space, matching how taggers merge multi-token components.
    pub fn push(&mut self, label: impl Into<String>, value: impl Into<String>) {
        let label = label.into();
        let value = value.into();
        if let Some((last_label, last_value)) = self.entries.last_mut() {
            if *last_label == label {
                last_value.push(' ');
                last_value.push_str(&value);
                return;
            }
        }
        self.entries.push((label, value));
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, v)| (l.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<L: Into<String>, V: Into<String>> FromIterator<(L, V)> for ComponentMap {
    fn from_iter<I: IntoIterator<Item = (L, V)>>(iter: I) -> Self {
        let mut map = ComponentMap::new();
        for (l, v) in iter {
            map.push(l, v);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_round_trip() {
        for c in Component::ALL {
            assert_eq!(c.as_str().parse::<Component>().unwrap(), c);
        }
        assert_eq!("USPSBoxID".parse::<Component>().unwrap(), Component::UspsBoxId);
        assert!("Landmark".parse::<Component>().is_err());
    }

    #[test]
    fn consecutive_labels_merge() {
        let map: ComponentMap = [
            ("AddressNumber", "12"),
            ("StreetName", "OLD"),
            ("StreetName", "COUNTY"),
            ("StreetNamePostType", "RD"),
        ]
        .into_iter()
        .collect();
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("StreetName"), Some("OLD COUNTY"));
    }
}
