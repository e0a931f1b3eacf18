use std::collections::{BTreeSet, HashMap};

use serde::Deserialize;

use crate::error::LinkageError;
use crate::model::ServiceType;

pub const DEFAULT_MAX_METERS_PER_CUSTOMER: usize = 2;
pub const DEFAULT_ENTITY_MARKERS: &[&str] = &["TRUST", "TR", "RT", "IRT"];

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct LinkageConfig {
    pub name: String,
    pub sources: SourcesConfig,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub census: Option<SourceConfig>,
    #[serde(default)]
    pub assessment: Option<SourceConfig>,
    /// Extra assessment rows published separately; appended to assessment.
    #[serde(default)]
    pub addendum: Option<SourceConfig>,
    #[serde(default)]
    pub water: Option<SourceConfig>,
    #[serde(default)]
    pub solar: Option<SourceConfig>,
}

impl SourcesConfig {
    /// Configured sources in pipeline order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &SourceConfig)> {
        [
            ("census", &self.census),
            ("assessment", &self.assessment),
            ("addendum", &self.addendum),
            ("water", &self.water),
            ("solar", &self.solar),
        ]
        .into_iter()
        .filter_map(|(name, source)| source.as_ref().map(|s| (name, s)))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub file: String,
    pub city: String,
    /// Worksheet to read when `file` is a workbook. First sheet otherwise.
    #[serde(default)]
    pub sheet: Option<String>,
    /// Logical field name -> header in the source table.
    #[serde(default)]
    pub columns: HashMap<String, String>,
    pub address: AddressColumns,
}

impl SourceConfig {
    pub fn column(&self, field: &str) -> Option<&str> {
        self.columns.get(field).map(String::as_str)
    }
}

/// Where a source keeps its address: one pre-concatenated `full` column, or
/// split `number` / `suffix` / `street` / `apartment` columns.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressColumns {
    #[serde(default)]
    pub full: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub apartment: Option<String>,
}

// ---------------------------------------------------------------------------
// Thresholds + Output
// ---------------------------------------------------------------------------

/// Empirical constants of the linkage heuristics. Defaults reproduce the
/// behavior the published lookup tables were built with.
#[derive(Debug, Clone, Deserialize)]
pub struct Thresholds {
    /// A water customer with more unmatched meters than this is treated as
    /// commercial or municipal and kept out of the backfill.
    #[serde(default = "default_max_meters")]
    pub max_meters_per_customer: usize,
    #[serde(default = "default_residential_types")]
    pub residential_service_types: Vec<ServiceType>,
    /// Owner-name tokens that stand in for a first name (trust ownership).
    #[serde(default = "default_entity_markers")]
    pub entity_markers: Vec<String>,
}

fn default_max_meters() -> usize {
    DEFAULT_MAX_METERS_PER_CUSTOMER
}

fn default_residential_types() -> Vec<ServiceType> {
    vec![ServiceType::Residential, ServiceType::Irrigation]
}

fn default_entity_markers() -> Vec<String> {
    DEFAULT_ENTITY_MARKERS.iter().map(|m| m.to_string()).collect()
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_meters_per_customer: default_max_meters(),
            residential_service_types: default_residential_types(),
            entity_markers: default_entity_markers(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_sqlite")]
    pub sqlite: String,
    /// Also write the `LookupDebug` table with every column.
    #[serde(default = "default_true")]
    pub debug: bool,
    #[serde(default)]
    pub xlsx: Option<String>,
}

fn default_sqlite() -> String {
    "lookup.sqlite".into()
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sqlite: default_sqlite(),
            debug: true,
            xlsx: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl LinkageConfig {
    pub fn from_toml(input: &str) -> Result<Self, LinkageError> {
        let config: LinkageConfig =
            toml::from_str(input).map_err(|e| LinkageError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LinkageError> {
        if self.sources.census.is_none() {
            return Err(LinkageError::MissingSource("census".into()));
        }
        if self.sources.assessment.is_none() {
            return Err(LinkageError::MissingSource("assessment".into()));
        }

        for (name, source) in self.sources.iter() {
            if source.file.trim().is_empty() {
                return Err(LinkageError::ConfigValidation(format!(
                    "source '{name}': file is empty"
                )));
            }
            if source.city.trim().is_empty() {
                return Err(LinkageError::ConfigValidation(format!(
                    "source '{name}': city is empty"
                )));
            }

            let address = &source.address;
            let split = address.number.is_some() || address.suffix.is_some() || address.street.is_some();
            match (&address.full, split) {
                (Some(_), true) => {
                    return Err(LinkageError::ConfigValidation(format!(
                        "source '{name}': address has both `full` and split columns"
                    )));
                }
                (None, _) if address.street.is_none() => {
                    return Err(LinkageError::ConfigValidation(format!(
                        "source '{name}': address needs `full` or `street`"
                    )));
                }
                _ => {}
            }
        }

        if self.thresholds.max_meters_per_customer == 0 {
            return Err(LinkageError::ConfigValidation(
                "max_meters_per_customer must be at least 1".into(),
            ));
        }
        if self.thresholds.residential_service_types.is_empty() {
            return Err(LinkageError::ConfigValidation(
                "residential_service_types must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Distinct source cities, uppercased. Used as the tagger's gazetteer.
    pub fn cities(&self) -> Vec<String> {
        let cities: BTreeSet<String> = self
            .sources
            .iter()
            .map(|(_, s)| s.city.trim().to_uppercase())
            .collect();
        cities.into_iter().collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
name = "Andover"

[sources.census]
file = "census.csv"
city = "Andover"
[sources.census.columns]
resident_id = "Resident Id"
last_name = "Last Name"
first_name = "First Name"
[sources.census.address]
number = "Street Number"
street = "Street Name"
apartment = "Apartment Number"

[sources.assessment]
file = "assessment.csv"
city = "ANDOVER"
[sources.assessment.columns]
parcel_id = "Parcel Id"
owner_1_name = "Owner 1"
[sources.assessment.address]
full = "Location"
"#;

    #[test]
    fn parse_minimal_uses_defaults() {
        let config = LinkageConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.name, "Andover");
        assert!(config.sources.water.is_none());
        assert_eq!(config.thresholds.max_meters_per_customer, 2);
        assert_eq!(
            config.thresholds.residential_service_types,
            vec![ServiceType::Residential, ServiceType::Irrigation]
        );
        assert_eq!(config.thresholds.entity_markers, vec!["TRUST", "TR", "RT", "IRT"]);
        assert_eq!(config.output.sqlite, "lookup.sqlite");
        assert!(config.output.debug);
        assert_eq!(config.cities(), vec!["ANDOVER".to_string()]);
    }

    #[test]
    fn parse_thresholds_override() {
        let input = format!(
            r#"{MINIMAL}
[thresholds]
max_meters_per_customer = 3
residential_service_types = ["residential"]
"#
        );
        let config = LinkageConfig::from_toml(&input).unwrap();
        assert_eq!(config.thresholds.max_meters_per_customer, 3);
        assert_eq!(config.thresholds.residential_service_types, vec![ServiceType::Residential]);
        assert_eq!(config.thresholds.entity_markers.len(), 4);
    }

    #[test]
    fn missing_assessment_is_rejected() {
        let input = r#"
name = "x"
[sources.census]
file = "census.csv"
city = "ANDOVER"
[sources.census.address]
full = "Address"
"#;
        let err = LinkageConfig::from_toml(input).unwrap_err();
        assert!(matches!(err, LinkageError::MissingSource(ref s) if s == "assessment"));
    }

    #[test]
    fn address_block_needs_street() {
        let input = MINIMAL.replace("full = \"Location\"", "number = \"No\"");
        let err = LinkageConfig::from_toml(&input).unwrap_err();
        assert!(matches!(err, LinkageError::ConfigValidation(_)));

        let input = MINIMAL.replace("full = \"Location\"", "full = \"Location\"\nstreet = \"Street\"");
        assert!(LinkageConfig::from_toml(&input).is_err());
    }

    #[test]
    fn empty_city_is_rejected() {
        let input = MINIMAL.replace("city = \"Andover\"", "city = \" \"");
        let err = LinkageConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("city is empty"));
    }

    #[test]
    fn zero_meter_threshold_is_rejected() {
        let input = format!("{MINIMAL}\n[thresholds]\nmax_meters_per_customer = 0\n");
        assert!(matches!(
            LinkageConfig::from_toml(&input),
            Err(LinkageError::ConfigValidation(_))
        ));
    }
}
