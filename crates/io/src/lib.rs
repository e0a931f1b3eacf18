// Source table loading and lookup persistence

use std::path::Path;

use townlink_linkage::SourceTable;

pub mod csv;
pub mod sqlite;
pub mod xlsx;

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Load a source table, picking the reader from the file extension.
/// `sheet` only applies to workbooks.
pub fn load_table(path: &Path, sheet: Option<&str>) -> Result<SourceTable, String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if WORKBOOK_EXTENSIONS.contains(&ext.as_str()) {
        xlsx::read_table(path, sheet)
    } else {
        csv::read_table(path)
    }
}
