use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use townlink_address::NormalizedAddress;

use crate::error::LinkageError;

// ---------------------------------------------------------------------------
// Source tables
// ---------------------------------------------------------------------------

/// A whole source table as handed in by a loader: trimmed headers plus rows
/// of cell text. Rows shorter than the header read as empty cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SourceTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers = headers.into_iter().map(|h| h.trim().to_string()).collect();
        Self { headers, rows }
    }

    /// Parse comma-separated text with a header row.
    pub fn from_csv_str(data: &str) -> Result<Self, LinkageError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(data.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| LinkageError::Io(e.to_string()))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| LinkageError::Io(e.to_string()))?;
            rows.push(record.iter().map(|v| v.to_string()).collect());
        }

        Ok(Self::new(headers, rows))
    }

    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum OwnerOccupied {
    Yes,
    No,
    #[default]
    Unknown,
}

impl OwnerOccupied {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "Y" | "YES" => Self::Yes,
            "N" | "NO" => Self::No,
            _ => Self::Unknown,
        }
    }

    pub fn as_flag(&self) -> &'static str {
        match self {
            Self::Yes => "Y",
            Self::No => "N",
            Self::Unknown => "",
        }
    }
}

/// Water service classification as billed. Matching is case-insensitive;
/// anything not residential or irrigation is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum ServiceType {
    Residential,
    Irrigation,
    Other(String),
}

impl ServiceType {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.eq_ignore_ascii_case("residential") {
            Self::Residential
        } else if value.eq_ignore_ascii_case("irrigation") {
            Self::Irrigation
        } else {
            Self::Other(value.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Residential => "Residential",
            Self::Irrigation => "Irrigation",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for ServiceType {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<ServiceType> for String {
    fn from(value: ServiceType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One census record. Source of truth for identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resident {
    pub resident_id: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub apartment_number: String,
    pub street_number_suffix: String,
    pub address: NormalizedAddress,
}

/// One assessment record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parcel {
    pub parcel_id: String,
    pub owner_1_name: String,
    pub owner_2_name: String,
    pub owner_3_name: String,
    pub owner_occupied: OwnerOccupied,
    pub condo_unit: String,
    pub zone: String,
    pub street_name_alt: String,
    pub address: NormalizedAddress,
}

impl Parcel {
    pub fn owners(&self) -> [&str; 3] {
        [&self.owner_1_name, &self.owner_2_name, &self.owner_3_name]
    }
}

/// Most recent reading of one water meter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaterMeter {
    pub meter_number: String,
    pub service_type: ServiceType,
    pub first_name: String,
    pub last_name: String,
    pub reading_date: Option<NaiveDate>,
    pub address: NormalizedAddress,
}

impl WaterMeter {
    /// Display name of the billed customer: `first last`, trimmed.
    pub fn customer_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolarRecord {
    pub solar_id: String,
    pub address: NormalizedAddress,
}

/// Records mapped out of the configured source tables, ready to link.
#[derive(Debug, Clone, Default)]
pub struct LinkageInput {
    pub residents: Vec<Resident>,
    pub parcels: Vec<Parcel>,
    pub meters: Vec<WaterMeter>,
    pub solar: Vec<SolarRecord>,
}

// ---------------------------------------------------------------------------
// Linkage rows
// ---------------------------------------------------------------------------

/// One reconciled row. A `None` source means no match, or a match the
/// disambiguation passes discarded as unreliable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkageRow {
    pub resident: Option<Resident>,
    pub parcel: Option<Parcel>,
    pub meter: Option<WaterMeter>,
    pub solar: Option<SolarRecord>,
    pub street_number: String,
    pub street_name: String,
    pub is_homeowner: bool,
    pub is_family: bool,
}

impl LinkageRow {
    pub fn for_resident(resident: Resident) -> Self {
        Self {
            street_number: resident.address.street_number().to_string(),
            street_name: resident.address.street_name().to_string(),
            resident: Some(resident),
            parcel: None,
            meter: None,
            solar: None,
            is_homeowner: false,
            is_family: false,
        }
    }

    /// Row for a water meter that matched no resident.
    pub fn for_meter(meter: WaterMeter) -> Self {
        Self {
            street_number: meter.address.street_number().to_string(),
            street_name: meter.address.street_name().to_string(),
            resident: None,
            parcel: None,
            meter: Some(meter),
            solar: None,
            is_homeowner: false,
            is_family: false,
        }
    }

    /// Address the row joins further sources on.
    pub fn join_key(&self) -> &str {
        match (&self.resident, &self.meter) {
            (Some(r), _) => r.address.join_key(),
            (None, Some(m)) => m.address.join_key(),
            (None, None) => "",
        }
    }

    pub fn resident_id(&self) -> Option<&str> {
        self.resident.as_ref().map(|r| r.resident_id.as_str())
    }

    pub fn parcel_id(&self) -> Option<&str> {
        self.parcel.as_ref().map(|p| p.parcel_id.as_str())
    }

    pub fn meter_number(&self) -> Option<&str> {
        self.meter.as_ref().map(|m| m.meter_number.as_str())
    }

    pub fn solar_id(&self) -> Option<&str> {
        self.solar.as_ref().map(|s| s.solar_id.as_str())
    }

    pub fn service_type(&self) -> Option<&ServiceType> {
        self.meter.as_ref().map(|m| &m.service_type)
    }

    pub fn water_customer(&self) -> String {
        self.meter.as_ref().map(WaterMeter::customer_name).unwrap_or_default()
    }
}
