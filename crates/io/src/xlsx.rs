// Excel source tables (xlsx, xls, xlsb, ods) and lookup export (xlsx only)

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::{Duration, NaiveDate};
use rust_xlsxwriter::{Format, Workbook};
use townlink_linkage::{LookupTable, SourceTable};

/// Excel serial day 0 in the 1900 date system.
fn excel_epoch() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        // Integers without decimals: parcel ids and street numbers come through as floats
        Data::Float(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => String::from(if *b { "TRUE" } else { "FALSE" }),
        Data::Error(e) => format!("#{:?}", e),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            excel_epoch()
                .and_then(|epoch| epoch.checked_add_signed(Duration::days(serial.floor() as i64)))
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| serial.to_string())
        }
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Read one sheet (the named one, or the first) with its first row as headers.
pub fn read_table(path: &Path, sheet: Option<&str>) -> Result<SourceTable, String> {
    let mut workbook: Sheets<_> =
        open_workbook_auto(path).map_err(|e| format!("Failed to open Excel file: {}", e))?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| "Excel file contains no sheets".to_string())?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(cell_text).collect(),
        None => return Ok(SourceTable::default()),
    };

    let body = rows
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>())
        .filter(|row| row.iter().any(|c| !c.trim().is_empty()))
        .collect();

    Ok(SourceTable::new(headers, body))
}

/// Write `table` to a one-sheet workbook: bold header row, header frozen.
pub fn write_table(path: &Path, sheet_name: &str, table: &LookupTable) -> Result<(), String> {
    let mut workbook = Workbook::new();
    let worksheet = workbook
        .add_worksheet()
        .set_name(sheet_name)
        .map_err(|e| format!("Failed to create sheet '{}': {}", sheet_name, e))?;

    let bold = Format::new().set_bold();
    for (col, name) in table.columns.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, name, &bold)
            .map_err(|e| format!("Failed to write header: {}", e))?;
    }

    for (r, row) in table.rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            worksheet
                .write_string((r + 1) as u32, col as u16, value)
                .map_err(|e| format!("Failed to write cell: {}", e))?;
        }
    }

    worksheet
        .set_freeze_panes(1, 0)
        .map_err(|e| format!("Failed to freeze header: {}", e))?;

    workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file: {}", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_float_cells_render_as_integers() {
        assert_eq!(cell_text(&Data::Float(12.0)), "12");
        assert_eq!(cell_text(&Data::Float(12.5)), "12.5");
        assert_eq!(cell_text(&Data::String("MAIN ST".into())), "MAIN ST");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn test_written_lookup_reads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lookup.xlsx");
        let table = LookupTable {
            columns: vec!["id".into(), "parcel_id".into(), "street_name".into()],
            rows: vec![
                vec!["1".into(), "".into(), "MAIN ST".into()],
                vec!["2".into(), "9".into(), "ELM ST".into()],
            ],
        };
        write_table(&path, "Lookup", &table).unwrap();

        let read = read_table(&path, Some("Lookup")).unwrap();
        assert_eq!(read.headers, vec!["id", "parcel_id", "street_name"]);
        assert_eq!(read.len(), 2);
        assert_eq!(read.cell(0, 1), "");
        assert_eq!(read.cell(1, 2), "ELM ST");

        let first = read_table(&path, None).unwrap();
        assert_eq!(first, read);
    }

    #[test]
    fn test_missing_sheet_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lookup.xlsx");
        write_table(&path, "Lookup", &LookupTable::default()).unwrap();
        assert!(read_table(&path, Some("Census")).is_err());
    }
}
