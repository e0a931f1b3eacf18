// SQLite persistence for lookup tables
//
// Every write replaces its tables wholesale: DROP, CREATE, INSERT inside one
// transaction. Nothing is visible to readers until COMMIT.

use std::path::Path;

use rusqlite::{params_from_iter, Connection, Transaction};
use townlink_linkage::{LookupTable, ZoneEntry};
use townlink_linkage::zoning::ZONE_TABLE;

const ZONE_COLUMNS: [&str; 3] = ["street_number", "street_name", "zone"];

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn column_type(name: &str) -> &'static str {
    if name == "id" {
        "INTEGER"
    } else {
        "TEXT"
    }
}

fn replace_table(tx: &Transaction, name: &str, table: &LookupTable) -> Result<(), String> {
    if table.columns.is_empty() {
        return Err(format!("table '{}' has no columns", name));
    }
    if let Some(pos) = table.rows.iter().position(|r| r.len() != table.columns.len()) {
        return Err(format!(
            "table '{}' row {} has {} values, expected {}",
            name,
            pos + 1,
            table.rows[pos].len(),
            table.columns.len()
        ));
    }

    let table_ident = quote_ident(name);
    let column_defs: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(c), column_type(c)))
        .collect();

    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {table_ident};\nCREATE TABLE {table_ident} ({});",
        column_defs.join(", ")
    ))
    .map_err(|e| e.to_string())?;

    let placeholders: Vec<String> = (1..=table.columns.len()).map(|i| format!("?{i}")).collect();
    let mut stmt = tx
        .prepare(&format!(
            "INSERT INTO {table_ident} VALUES ({})",
            placeholders.join(", ")
        ))
        .map_err(|e| e.to_string())?;

    for row in &table.rows {
        // Absent values stay "" in the persisted table; `id` converts through INTEGER affinity
        stmt.execute(params_from_iter(row.iter().map(String::as_str))).map_err(|e| e.to_string())?;
    }

    log::debug!("sqlite: wrote {} rows to {}", table.rows.len(), name);
    Ok(())
}

/// The zone lookup in table form.
pub fn zone_table(entries: &[ZoneEntry]) -> LookupTable {
    LookupTable {
        columns: ZONE_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows: entries
            .iter()
            .map(|e| vec![e.street_number.clone(), e.street_name.clone(), e.zone.clone()])
            .collect(),
    }
}

/// Replace every named table in a single transaction.
pub fn write_run(path: &Path, tables: &[(&str, &LookupTable)]) -> Result<(), String> {
    let mut conn = Connection::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let tx = conn.transaction().map_err(|e| e.to_string())?;

    for (name, table) in tables {
        replace_table(&tx, name, table)?;
    }

    tx.commit().map_err(|e| e.to_string())?;
    log::info!("sqlite: committed {} table(s) to {}", tables.len(), path.display());
    Ok(())
}

pub fn write_lookup(path: &Path, table_name: &str, table: &LookupTable) -> Result<(), String> {
    write_run(path, &[(table_name, table)])
}

pub fn write_zone_lookup(path: &Path, entries: &[ZoneEntry]) -> Result<(), String> {
    write_run(path, &[(ZONE_TABLE, &zone_table(entries))])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn lookup(rows: &[(&str, &str)]) -> LookupTable {
        LookupTable {
            columns: vec!["id".into(), "parcel_id".into(), "street_name".into()],
            rows: rows
                .iter()
                .enumerate()
                .map(|(i, (parcel, street))| vec![(i + 1).to_string(), parcel.to_string(), street.to_string()])
                .collect(),
        }
    }

    fn count(path: &Path, table: &str) -> i64 {
        let conn = Connection::open(path).unwrap();
        conn.query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_write_lookup_replaces_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lookup.sqlite");

        write_lookup(&path, "Lookup", &lookup(&[("9", "MAIN ST"), ("", "ELM ST"), ("30", "OAK ST")])).unwrap();
        assert_eq!(count(&path, "Lookup"), 3);

        write_lookup(&path, "Lookup", &lookup(&[("9", "MAIN ST")])).unwrap();
        assert_eq!(count(&path, "Lookup"), 1);
    }

    #[test]
    fn test_empty_cells_are_empty_strings_and_id_is_integer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lookup.sqlite");
        write_lookup(&path, "Lookup", &lookup(&[("", "MAIN ST")])).unwrap();

        let conn = Connection::open(&path).unwrap();
        let (id, parcel): (i64, Option<String>) = conn
            .query_row("SELECT id, parcel_id FROM Lookup", [], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap();
        assert_eq!(id, 1);
        assert_eq!(parcel.as_deref(), Some(""));

        let nulls: i64 = conn
            .query_row("SELECT COUNT(*) FROM Lookup WHERE parcel_id IS NULL", [], |r| r.get(0))
            .unwrap();
        assert_eq!(nulls, 0);
    }

    #[test]
    fn test_failed_write_keeps_previous_tables() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lookup.sqlite");
        write_lookup(&path, "Lookup", &lookup(&[("9", "MAIN ST"), ("10", "ELM ST")])).unwrap();

        let good = lookup(&[("11", "OAK ST")]);
        let mut bad = lookup(&[("12", "PINE ST")]);
        bad.rows[0].pop();

        let result = write_run(&path, &[("Lookup", &good), ("LookupDebug", &bad)]);
        assert!(result.is_err());
        assert_eq!(count(&path, "Lookup"), 2);

        let conn = Connection::open(&path).unwrap();
        let debug_exists: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'LookupDebug'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(debug_exists, 0);
    }

    #[test]
    fn test_write_zone_lookup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lookup.sqlite");
        let entries = vec![ZoneEntry {
            street_number: "12".into(),
            street_name: "MAIN ST".into(),
            zone: "GB".into(),
        }];
        write_zone_lookup(&path, &entries).unwrap();

        let conn = Connection::open(&path).unwrap();
        let zone: String = conn
            .query_row(
                "SELECT zone FROM ZoneLookup WHERE street_number = '12' AND street_name = 'MAIN ST'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(zone, "GB");
    }
}
