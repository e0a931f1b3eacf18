//! Mapping of configured source tables onto linkage records.
//!
//! Every address is normalized here, once, at ingestion. Names are trimmed
//! and uppercased so ownership matching compares like with like.

use std::collections::HashMap;

use chrono::NaiveDate;
use log::info;
use townlink_address::{AddressTagger, NormalizedAddress, Normalizer, RawAddress};

use crate::config::{LinkageConfig, SourceConfig};
use crate::error::LinkageError;
use crate::model::{
    LinkageInput, OwnerOccupied, Parcel, Resident, ServiceType, SolarRecord, SourceTable, WaterMeter,
};

/// Tables for each configured source, as loaded by a collaborator.
#[derive(Debug, Clone, Default)]
pub struct SourceTables {
    pub census: SourceTable,
    pub assessment: SourceTable,
    pub addendum: Option<SourceTable>,
    pub water: Option<SourceTable>,
    pub solar: Option<SourceTable>,
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

// ---------------------------------------------------------------------------
// Column resolution
// ---------------------------------------------------------------------------

struct Columns<'a> {
    source: &'a str,
    table: &'a SourceTable,
    config: &'a SourceConfig,
}

impl<'a> Columns<'a> {
    fn new(source: &'a str, table: &'a SourceTable, config: &'a SourceConfig) -> Self {
        Self { source, table, config }
    }

    fn missing(&self, column: &str) -> LinkageError {
        LinkageError::MissingColumn {
            source: self.source.into(),
            column: column.into(),
        }
    }

    fn header(&self, header: &str) -> Result<usize, LinkageError> {
        self.table.column(header).ok_or_else(|| self.missing(header))
    }

    /// A field the record type cannot do without.
    fn required(&self, field: &str) -> Result<usize, LinkageError> {
        let header = self.config.column(field).ok_or_else(|| self.missing(field))?;
        self.header(header)
    }

    /// A field that may be left unconfigured. Configured but absent from the
    /// table is still an error.
    fn optional(&self, field: &str) -> Result<Option<usize>, LinkageError> {
        self.config.column(field).map(|h| self.header(h)).transpose()
    }

    fn address_header(&self, header: &Option<String>) -> Result<Option<usize>, LinkageError> {
        header.as_deref().map(|h| self.header(h)).transpose()
    }
}

struct AddressFields {
    full: Option<usize>,
    number: Option<usize>,
    suffix: Option<usize>,
    street: Option<usize>,
    apartment: Option<usize>,
}

impl AddressFields {
    fn resolve(columns: &Columns<'_>) -> Result<Self, LinkageError> {
        let address = &columns.config.address;
        Ok(Self {
            full: columns.address_header(&address.full)?,
            number: columns.address_header(&address.number)?,
            suffix: columns.address_header(&address.suffix)?,
            street: columns.address_header(&address.street)?,
            apartment: columns.address_header(&address.apartment)?,
        })
    }

    fn raw(&self, table: &SourceTable, row: usize) -> RawAddress {
        let cell = |col: Option<usize>| col.map(|c| table.cell(row, c).to_string()).unwrap_or_default();
        match self.full {
            Some(full) => RawAddress {
                apartment: cell(self.apartment),
                ..RawAddress::full(table.cell(row, full))
            },
            None => RawAddress {
                number: cell(self.number),
                suffix: cell(self.suffix),
                street: cell(self.street),
                apartment: cell(self.apartment),
            },
        }
    }
}

/// Cell text, trimmed and uppercased. Empty when the column is unmapped.
fn upper(table: &SourceTable, row: usize, col: Option<usize>) -> String {
    col.map(|c| table.cell(row, c).trim().to_uppercase()).unwrap_or_default()
}

fn normalize_row<T: AddressTagger>(
    normalizer: &Normalizer<T>,
    source: &str,
    config: &SourceConfig,
    raw: &RawAddress,
    row: usize,
) -> Result<NormalizedAddress, LinkageError> {
    normalizer
        .normalize(&raw.to_text(), &config.city)
        .map_err(|error| LinkageError::Address {
            source: source.into(),
            row: row + 1,
            error,
        })
}

// ---------------------------------------------------------------------------
// Per-source loaders
// ---------------------------------------------------------------------------

pub fn load_residents<T: AddressTagger>(
    table: &SourceTable,
    config: &SourceConfig,
    normalizer: &Normalizer<T>,
) -> Result<Vec<Resident>, LinkageError> {
    let source = "census";
    let columns = Columns::new(source, table, config);
    let id = columns.required("resident_id")?;
    let last = columns.required("last_name")?;
    let first = columns.required("first_name")?;
    let middle = columns.optional("middle_name")?;
    let address = AddressFields::resolve(&columns)?;
    let apartment = match address.apartment {
        Some(col) => Some(col),
        None => columns.optional("apartment_number")?,
    };

    let mut residents = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let raw = address.raw(table, row);
        residents.push(Resident {
            resident_id: table.cell(row, id).trim().to_string(),
            first_name: upper(table, row, Some(first)),
            middle_name: upper(table, row, middle),
            last_name: upper(table, row, Some(last)),
            apartment_number: upper(table, row, apartment),
            street_number_suffix: upper(table, row, address.suffix),
            address: normalize_row(normalizer, source, config, &raw, row)?,
        });
    }
    Ok(residents)
}

/// Assessment and addendum rows share one shape.
pub fn load_parcels<T: AddressTagger>(
    source: &str,
    table: &SourceTable,
    config: &SourceConfig,
    normalizer: &Normalizer<T>,
) -> Result<Vec<Parcel>, LinkageError> {
    let columns = Columns::new(source, table, config);
    let id = columns.required("parcel_id")?;
    let owner_1 = columns.required("owner_1_name")?;
    let owner_2 = columns.optional("owner_2_name")?;
    let owner_3 = columns.optional("owner_3_name")?;
    let occupied = columns.optional("owner_occupied")?;
    let condo_unit = columns.optional("condo_unit")?;
    let zone = columns.optional("zone")?;
    let street_name_alt = columns.optional("street_name_alt")?;
    let address = AddressFields::resolve(&columns)?;

    let mut parcels = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let raw = address.raw(table, row);
        parcels.push(Parcel {
            parcel_id: table.cell(row, id).trim().to_string(),
            owner_1_name: upper(table, row, Some(owner_1)),
            owner_2_name: upper(table, row, owner_2),
            owner_3_name: upper(table, row, owner_3),
            owner_occupied: occupied
                .map(|c| OwnerOccupied::parse(table.cell(row, c)))
                .unwrap_or_default(),
            condo_unit: upper(table, row, condo_unit),
            zone: upper(table, row, zone),
            street_name_alt: upper(table, row, street_name_alt),
            address: normalize_row(normalizer, source, config, &raw, row)?,
        });
    }
    Ok(parcels)
}

/// Every reading row; see [`latest_per_meter`].
pub fn load_water_meters<T: AddressTagger>(
    table: &SourceTable,
    config: &SourceConfig,
    normalizer: &Normalizer<T>,
) -> Result<Vec<WaterMeter>, LinkageError> {
    let source = "water";
    let columns = Columns::new(source, table, config);
    let meter = columns.required("meter_number")?;
    let service = columns.required("service_type")?;
    let first = columns.required("first_name")?;
    let last = columns.required("last_name")?;
    let date = columns.optional("reading_date")?;
    let address = AddressFields::resolve(&columns)?;

    let mut meters = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let raw = address.raw(table, row);
        meters.push(WaterMeter {
            meter_number: table.cell(row, meter).trim().to_string(),
            service_type: ServiceType::parse(table.cell(row, service)),
            first_name: upper(table, row, Some(first)),
            last_name: upper(table, row, Some(last)),
            reading_date: date.and_then(|c| parse_date(table.cell(row, c))),
            address: normalize_row(normalizer, source, config, &raw, row)?,
        });
    }
    Ok(meters)
}

pub fn load_solar<T: AddressTagger>(
    table: &SourceTable,
    config: &SourceConfig,
    normalizer: &Normalizer<T>,
) -> Result<Vec<SolarRecord>, LinkageError> {
    let source = "solar";
    let columns = Columns::new(source, table, config);
    let id = columns.required("solar_id")?;
    let address = AddressFields::resolve(&columns)?;

    let mut records = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let raw = address.raw(table, row);
        records.push(SolarRecord {
            solar_id: table.cell(row, id).trim().to_string(),
            address: normalize_row(normalizer, source, config, &raw, row)?,
        });
    }
    Ok(records)
}

/// Keep the most recent reading of each meter. Undated readings count as
/// oldest; on a tie the later row wins. Meters keep first-seen order.
pub fn latest_per_meter(meters: Vec<WaterMeter>) -> Vec<WaterMeter> {
    let mut slot: HashMap<String, usize> = HashMap::new();
    let mut latest: Vec<WaterMeter> = Vec::new();
    for meter in meters {
        match slot.get(&meter.meter_number) {
            Some(&i) => {
                if meter.reading_date >= latest[i].reading_date {
                    latest[i] = meter;
                }
            }
            None => {
                slot.insert(meter.meter_number.clone(), latest.len());
                latest.push(meter);
            }
        }
    }
    latest
}

// ---------------------------------------------------------------------------
// All sources
// ---------------------------------------------------------------------------

fn optional_source<'a>(
    name: &str,
    config: &'a Option<SourceConfig>,
    table: &'a Option<SourceTable>,
) -> Result<Option<(&'a SourceConfig, &'a SourceTable)>, LinkageError> {
    match (config, table) {
        (Some(config), Some(table)) => Ok(Some((config, table))),
        (Some(_), None) => Err(LinkageError::MissingSource(name.into())),
        (None, _) => Ok(None),
    }
}

/// Map every configured table to records.
pub fn load_inputs<T: AddressTagger>(
    config: &LinkageConfig,
    tables: &SourceTables,
    normalizer: &Normalizer<T>,
) -> Result<LinkageInput, LinkageError> {
    let sources = &config.sources;
    let census = sources
        .census
        .as_ref()
        .ok_or_else(|| LinkageError::MissingSource("census".into()))?;
    let assessment = sources
        .assessment
        .as_ref()
        .ok_or_else(|| LinkageError::MissingSource("assessment".into()))?;

    let residents = load_residents(&tables.census, census, normalizer)?;
    let mut parcels = load_parcels("assessment", &tables.assessment, assessment, normalizer)?;
    if let Some((cfg, table)) = optional_source("addendum", &sources.addendum, &tables.addendum)? {
        let addendum = load_parcels("addendum", table, cfg, normalizer)?;
        info!("addendum: {} parcels appended", addendum.len());
        parcels.extend(addendum);
    }

    let meters = match optional_source("water", &sources.water, &tables.water)? {
        Some((cfg, table)) => {
            let readings = load_water_meters(table, cfg, normalizer)?;
            let count = readings.len();
            let meters = latest_per_meter(readings);
            info!("water: {count} readings, {} meters", meters.len());
            meters
        }
        None => Vec::new(),
    };

    let solar = match optional_source("solar", &sources.solar, &tables.solar)? {
        Some((cfg, table)) => load_solar(table, cfg, normalizer)?,
        None => Vec::new(),
    };

    info!(
        "loaded {} residents, {} parcels, {} meters, {} solar records",
        residents.len(),
        parcels.len(),
        meters.len(),
        solar.len()
    );

    Ok(LinkageInput {
        residents,
        parcels,
        meters,
        solar,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use townlink_address::{AddressError, ComponentMap, TagError};

    fn config(toml_columns: &str, address: &str) -> SourceConfig {
        let input = format!(
            "file = \"x.csv\"\ncity = \"Andover\"\n[columns]\n{toml_columns}\n[address]\n{address}\n"
        );
        toml::from_str(&input).unwrap()
    }

    fn normalizer() -> Normalizer {
        Normalizer::for_cities(["ANDOVER"])
    }

    #[test]
    fn residents_from_split_address() {
        let table = SourceTable::from_csv_str(
            "Id,Last,First,No,Suffix,Street,Apt\n1, smith ,John,12,A,Main Street,\n2,Jones,Mary,5,,Elm St,3\n",
        )
        .unwrap();
        let cfg = config(
            "resident_id = \"Id\"\nlast_name = \"Last\"\nfirst_name = \"First\"",
            "number = \"No\"\nsuffix = \"Suffix\"\nstreet = \"Street\"\napartment = \"Apt\"",
        );
        let residents = load_residents(&table, &cfg, &normalizer()).unwrap();

        assert_eq!(residents[0].last_name, "SMITH");
        assert_eq!(residents[0].street_number_suffix, "A");
        assert_eq!(residents[0].address.full_text(), "12A MAIN ST");
        assert_eq!(residents[1].apartment_number, "3");
        assert_eq!(residents[1].address.full_text(), "5 ELM ST");
        assert_eq!(residents[1].address.occupancy(), "APT 3");
    }

    #[test]
    fn missing_required_column_is_reported() {
        let table = SourceTable::from_csv_str("Id,Last,Address\n1,SMITH,12 Main St\n").unwrap();
        let cfg = config(
            "resident_id = \"Id\"\nlast_name = \"Last\"\nfirst_name = \"First\"",
            "full = \"Address\"",
        );
        let err = load_residents(&table, &cfg, &normalizer()).unwrap_err();
        assert!(matches!(err, LinkageError::MissingColumn { ref column, .. } if column == "First"));
    }

    #[test]
    fn parcels_parse_owner_occupied() {
        let table = SourceTable::from_csv_str(
            "Parcel,Owner,Occ,Location\n9,Smith John,Y,12 MAIN STREET\n10,Jones,,5 Elm St\n",
        )
        .unwrap();
        let cfg = config(
            "parcel_id = \"Parcel\"\nowner_1_name = \"Owner\"\nowner_occupied = \"Occ\"",
            "full = \"Location\"",
        );
        let parcels = load_parcels("assessment", &table, &cfg, &normalizer()).unwrap();
        assert_eq!(parcels[0].owner_1_name, "SMITH JOHN");
        assert_eq!(parcels[0].owner_occupied, OwnerOccupied::Yes);
        assert_eq!(parcels[0].address.full_text(), "12 MAIN ST");
        assert_eq!(parcels[1].owner_occupied, OwnerOccupied::Unknown);
    }

    #[test]
    fn address_error_carries_source_and_row() {
        let tagger = |_: &str| -> Result<ComponentMap, TagError> {
            Ok([("AddressNumber", "1"), ("StreetName", "MAIN"), ("StreetNamePostType", "STRASSE")]
                .into_iter()
                .collect())
        };
        let table = SourceTable::from_csv_str("Id,Address\nS1,1 Main Strasse\n").unwrap();
        let cfg = config("solar_id = \"Id\"", "full = \"Address\"");
        let err = load_solar(&table, &cfg, &Normalizer::new(tagger)).unwrap_err();
        match err {
            LinkageError::Address { source, row, error } => {
                assert_eq!(source, "solar");
                assert_eq!(row, 1);
                assert!(matches!(error, AddressError::UnknownStreetType { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn latest_reading_wins() {
        let table = SourceTable::from_csv_str(
            "Meter,Service,First,Last,Date,Address\n\
             M1,Residential,Ann,Lee,2023-01-05,5 Elm St\n\
             M2,Irrigation,Ann,Lee,,5 Elm St\n\
             M1,Residential,Ann,Lee,03/01/2023,7 Elm St\n\
             M1,Residential,Ann,Lee,bad,9 Elm St\n",
        )
        .unwrap();
        let cfg = config(
            "meter_number = \"Meter\"\nservice_type = \"Service\"\nfirst_name = \"First\"\nlast_name = \"Last\"\nreading_date = \"Date\"",
            "full = \"Address\"",
        );
        let meters = latest_per_meter(load_water_meters(&table, &cfg, &normalizer()).unwrap());
        assert_eq!(meters.len(), 2);
        assert_eq!(meters[0].meter_number, "M1");
        assert_eq!(meters[0].address.full_text(), "7 ELM ST");
        assert_eq!(meters[1].service_type, ServiceType::Irrigation);
    }

    #[test]
    fn dates_in_both_formats() {
        assert_eq!(parse_date("2024-03-01"), NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(parse_date(" 3/1/2024 "), NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(parse_date("March 1"), None);
    }
}
