//! `townlink run` and `townlink validate`: config-driven lookup rebuild.

use std::path::{Path, PathBuf};

use log::info;
use townlink_address::Normalizer;
use townlink_io::{load_table, sqlite, xlsx};
use townlink_linkage::config::SourceConfig;
use townlink_linkage::output::{DEBUG_TABLE, RELEASE_TABLE};
use townlink_linkage::sources::load_inputs;
use townlink_linkage::zoning::ZONE_TABLE;
use townlink_linkage::{
    build_zone_lookup, link, output, LinkageConfig, LinkageError, LookupTable, SourceTable, SourceTables,
};

use crate::exit_codes::{EXIT_CONFIG_INVALID, EXIT_DATA_QUALITY, EXIT_ERROR, EXIT_IO, EXIT_USAGE};
use crate::CliError;

fn run_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn linkage_err(err: LinkageError) -> CliError {
    if err.is_data_quality() {
        return CliError {
            code: EXIT_DATA_QUALITY,
            message: err.to_string(),
            hint: Some("fix the source row or extend the street type / directional tables".into()),
        };
    }
    match &err {
        LinkageError::Io(_) => run_err(EXIT_IO, err.to_string()),
        _ => run_err(EXIT_CONFIG_INVALID, err.to_string()),
    }
}

fn read_config(config_path: &Path) -> Result<LinkageConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| run_err(EXIT_USAGE, format!("cannot read config {}: {e}", config_path.display())))?;
    LinkageConfig::from_toml(&config_str).map_err(linkage_err)
}

fn load_source(base_dir: &Path, name: &str, source: &SourceConfig) -> Result<SourceTable, CliError> {
    let path = base_dir.join(&source.file);
    let table = load_table(&path, source.sheet.as_deref())
        .map_err(|e| run_err(EXIT_IO, format!("source '{name}': {e}")))?;
    info!("{name}: {} rows from {}", table.len(), path.display());
    Ok(table)
}

fn load_optional(
    base_dir: &Path,
    name: &str,
    source: &Option<SourceConfig>,
) -> Result<Option<SourceTable>, CliError> {
    source.as_ref().map(|s| load_source(base_dir, name, s)).transpose()
}

fn load_required(base_dir: &Path, name: &str, source: &Option<SourceConfig>) -> Result<SourceTable, CliError> {
    let source = source
        .as_ref()
        .ok_or_else(|| linkage_err(LinkageError::MissingSource(name.into())))?;
    load_source(base_dir, name, source)
}

pub fn cmd_run(config_path: PathBuf, json_output: bool, release_only: bool) -> Result<(), CliError> {
    let config = read_config(&config_path)?;

    // Source and output paths are relative to the config file's directory
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let sources = &config.sources;
    let tables = SourceTables {
        census: load_required(base_dir, "census", &sources.census)?,
        assessment: load_required(base_dir, "assessment", &sources.assessment)?,
        addendum: load_optional(base_dir, "addendum", &sources.addendum)?,
        water: load_optional(base_dir, "water", &sources.water)?,
        solar: load_optional(base_dir, "solar", &sources.solar)?,
    };

    // Any data-quality violation aborts here, before anything is written
    let normalizer = Normalizer::for_cities(config.cities());
    let input = load_inputs(&config, &tables, &normalizer).map_err(linkage_err)?;

    let linkage = link(&input.residents, &input.parcels, &input.meters, &input.solar, &config.thresholds);
    let lookup = output::build(&linkage.rows);
    let zones = sqlite::zone_table(&build_zone_lookup(&input.parcels));

    let mut written: Vec<(&str, &LookupTable)> = vec![(RELEASE_TABLE, &lookup.release)];
    if config.output.debug && !release_only {
        written.push((DEBUG_TABLE, &lookup.debug));
    }
    written.push((ZONE_TABLE, &zones));

    let sqlite_path = base_dir.join(&config.output.sqlite);
    sqlite::write_run(&sqlite_path, &written).map_err(|e| run_err(EXIT_IO, e))?;
    let table_names: Vec<&str> = written.iter().map(|(name, _)| *name).collect();
    eprintln!("wrote {} ({})", sqlite_path.display(), table_names.join(", "));

    if let Some(ref xlsx_file) = config.output.xlsx {
        let xlsx_path = base_dir.join(xlsx_file);
        xlsx::write_table(&xlsx_path, RELEASE_TABLE, &lookup.release).map_err(|e| run_err(EXIT_IO, e))?;
        eprintln!("wrote {}", xlsx_path.display());
    }

    // Human summary to stderr
    eprintln!("{}: {} lookup rows", config.name, lookup.release.len());
    for line in linkage.summary.lines() {
        eprintln!("  {line}");
    }

    if json_output {
        let report = serde_json::json!({
            "name": config.name,
            "sqlite": sqlite_path.display().to_string(),
            "tables": table_names,
            "summary": linkage.summary,
        });
        let json_str = serde_json::to_string_pretty(&report)
            .map_err(|e| run_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    let names: Vec<&str> = config.sources.iter().map(|(name, _)| name).collect();
    eprintln!(
        "valid: '{}' with {} source(s) ({}), cities: {}",
        config.name,
        names.len(),
        names.join(", "),
        config.cities().join(", "),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use townlink_address::AddressError;

    #[test]
    fn address_errors_abort_as_data_quality() {
        let err = linkage_err(LinkageError::Address {
            source: "census".into(),
            row: 3,
            error: AddressError::UnknownStreetType {
                value: "BLVDX".into(),
                input: "12 MAIN BLVDX".into(),
            },
        });
        assert_eq!(err.code, EXIT_DATA_QUALITY);
        assert!(err.message.contains("row 3"));
        assert!(err.hint.is_some());
    }

    #[test]
    fn config_and_io_errors_keep_their_codes() {
        assert_eq!(linkage_err(LinkageError::MissingSource("assessment".into())).code, EXIT_CONFIG_INVALID);
        let missing = LinkageError::MissingColumn { source: "water".into(), column: "Meter".into() };
        assert_eq!(linkage_err(missing).code, EXIT_CONFIG_INVALID);
        assert_eq!(linkage_err(LinkageError::Io("disk full".into())).code, EXIT_IO);
    }
}
