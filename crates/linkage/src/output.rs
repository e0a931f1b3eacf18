//! Final Lookup table: column set, ordering, surrogate ids.
//!
//! Every cell is text. A value the row has no provenance for renders as the
//! empty string, never as a null.

use std::cmp::Ordering;

use serde::Serialize;

use crate::model::{LinkageRow, Parcel, Resident};

pub const RELEASE_TABLE: &str = "Lookup";
pub const DEBUG_TABLE: &str = "LookupDebug";

const DEBUG_COLUMNS: &[&str] = &[
    "service_type",
    "street_number_suffix",
    "apartment_number",
    "last_name",
    "first_name",
    "middle_name",
    "owner_1_name",
    "owner_2_name",
    "owner_3_name",
    "owner_occupied",
    "condo_unit",
    "additional_info",
    "parcel_additional_info",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LookupTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl LookupTable {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell by row index and column name; `None` if the column is absent.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column(column)?;
        self.rows.get(row).and_then(|r| r.get(col)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Debug and release builds of one computation.
#[derive(Debug, Clone, Serialize)]
pub struct LookupOutput {
    pub debug: LookupTable,
    pub release: LookupTable,
}

fn flag(value: bool) -> String {
    String::from(if value { "1" } else { "0" })
}

/// Numeric ids compare as numbers and sort before non-numeric ones; rows
/// without a resident sort last.
fn compare_resident_ids(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match (a.parse::<u64>(), b.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => a.cmp(b),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn sort_rows(rows: &mut [LinkageRow]) {
    rows.sort_by(|a, b| {
        compare_resident_ids(a.resident_id(), b.resident_id())
            .then_with(|| a.water_customer().cmp(&b.water_customer()))
    });
}

fn release_columns(with_alt: bool) -> Vec<String> {
    let mut columns = vec!["id", "resident_id", "parcel_id", "meter_number", "solar_id", "street_number"];
    if with_alt {
        columns.push("street_name_alt");
    }
    columns.extend(["street_name", "water_customer", "is_homeowner", "is_family"]);
    columns.into_iter().map(String::from).collect()
}

fn release_cells(id: usize, row: &LinkageRow, with_alt: bool) -> Vec<String> {
    let text = |v: Option<&str>| v.unwrap_or_default().to_string();
    let mut cells = vec![
        id.to_string(),
        text(row.resident_id()),
        text(row.parcel_id()),
        text(row.meter_number()),
        text(row.solar_id()),
        row.street_number.clone(),
    ];
    if with_alt {
        cells.push(text(row.parcel.as_ref().map(|p| p.street_name_alt.as_str())));
    }
    cells.extend([
        row.street_name.clone(),
        row.water_customer(),
        flag(row.is_homeowner),
        flag(row.is_family),
    ]);
    cells
}

fn debug_cells(row: &LinkageRow) -> Vec<String> {
    let resident = row.resident.as_ref();
    let parcel = row.parcel.as_ref();
    let from_resident = |f: fn(&Resident) -> &str| resident.map(f).unwrap_or_default().to_string();
    let from_parcel = |f: fn(&Parcel) -> &str| parcel.map(f).unwrap_or_default().to_string();
    vec![
        row.service_type().map(|s| s.to_string()).unwrap_or_default(),
        from_resident(|r| r.street_number_suffix.as_str()),
        from_resident(|r| r.apartment_number.as_str()),
        from_resident(|r| r.last_name.as_str()),
        from_resident(|r| r.first_name.as_str()),
        from_resident(|r| r.middle_name.as_str()),
        from_parcel(|p| p.owner_1_name.as_str()),
        from_parcel(|p| p.owner_2_name.as_str()),
        from_parcel(|p| p.owner_3_name.as_str()),
        from_parcel(|p| p.owner_occupied.as_flag()),
        from_parcel(|p| p.condo_unit.as_str()),
        address_info(row),
        from_parcel(|p| p.address.additional_info()),
    ]
}

/// Parenthesised text stripped from the row's own address (resident, or
/// the meter on backfilled rows).
fn address_info(row: &LinkageRow) -> String {
    row.resident
        .as_ref()
        .map(|r| &r.address)
        .or_else(|| row.meter.as_ref().map(|m| &m.address))
        .map(|a| a.additional_info().to_string())
        .unwrap_or_default()
}

/// Sort, assign dense ids from 1, and render both builds.
pub fn build(rows: &[LinkageRow]) -> LookupOutput {
    let mut rows = rows.to_vec();
    sort_rows(&mut rows);

    let with_alt = rows
        .iter()
        .any(|r| r.parcel.as_ref().is_some_and(|p| !p.street_name_alt.is_empty()));

    let release_cols = release_columns(with_alt);
    let mut debug_cols = release_cols.clone();
    debug_cols.extend(DEBUG_COLUMNS.iter().map(|c| c.to_string()));

    let mut release = LookupTable {
        columns: release_cols,
        rows: Vec::with_capacity(rows.len()),
    };
    let mut debug = LookupTable {
        columns: debug_cols,
        rows: Vec::with_capacity(rows.len()),
    };

    for (i, row) in rows.iter().enumerate() {
        let cells = release_cells(i + 1, row, with_alt);
        let mut debug_row = cells.clone();
        debug_row.extend(debug_cells(row));
        release.rows.push(cells);
        debug.rows.push(debug_row);
    }

    LookupOutput { debug, release }
}
