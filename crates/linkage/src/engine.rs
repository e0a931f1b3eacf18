use std::collections::{HashMap, HashSet};

use log::info;

use crate::backfill::backfill_water;
use crate::config::Thresholds;
use crate::disambiguate::{resolve_assessment, resolve_water};
use crate::model::{LinkageRow, Parcel, Resident, SolarRecord, WaterMeter};
use crate::ownership::classify;
use crate::summary::LinkageSummary;

/// Records of one source keyed by normalized address. Empty addresses are
/// never indexed, so they match nothing.
pub struct AddressIndex<'a, T> {
    by_key: HashMap<&'a str, Vec<&'a T>>,
}

impl<'a, T> AddressIndex<'a, T> {
    pub fn new(records: &'a [T], key: impl Fn(&'a T) -> &'a str) -> Self {
        let mut by_key: HashMap<&'a str, Vec<&'a T>> = HashMap::new();
        for record in records {
            let k = key(record);
            if !k.is_empty() {
                by_key.entry(k).or_default().push(record);
            }
        }
        Self { by_key }
    }

    pub fn get(&self, key: &str) -> &[&'a T] {
        self.by_key.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Result of one linkage run.
#[derive(Debug, Clone)]
pub struct Linkage {
    pub rows: Vec<LinkageRow>,
    pub summary: LinkageSummary,
}

/// Left-join every row to the records at its address. `attach` copies one
/// match onto a clone of the row.
fn left_join<T>(
    rows: Vec<LinkageRow>,
    index: &AddressIndex<'_, T>,
    attach: impl Fn(&mut LinkageRow, &T),
) -> Vec<LinkageRow> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let matches = index.get(row.join_key());
        match matches {
            [] => out.push(row),
            [only] => {
                let mut row = row;
                attach(&mut row, only);
                out.push(row);
            }
            _ => {
                for m in matches {
                    let mut joined = row.clone();
                    attach(&mut joined, m);
                    out.push(joined);
                }
            }
        }
    }
    out
}

/// Stages 1-2: census joined to assessment, ownership classified, pass A.
///
/// Stand-alone for datasets without water or solar sources.
pub fn link_residents_to_parcels(
    residents: &[Resident],
    parcels: &[Parcel],
    markers: &[String],
) -> (Vec<LinkageRow>, LinkageSummary) {
    let mut summary = LinkageSummary::for_inputs(residents, parcels, &[], &[]);
    let parcel_index = AddressIndex::new(parcels, |p| p.address.join_key());

    let rows: Vec<LinkageRow> = residents.iter().cloned().map(LinkageRow::for_resident).collect();
    let mut rows = left_join(rows, &parcel_index, |row, p| row.parcel = Some(p.clone()));
    classify(&mut rows, markers);
    summary.census_assessment_rows = rows.len();
    info!(
        "census + assessment: {} residents, {} parcels -> {} rows",
        residents.len(),
        parcels.len(),
        rows.len()
    );

    let (rows, pass_a) = resolve_assessment(rows);
    info!(
        "pass A: {} ambiguous residents ({} by homeowner, {} by family, {} parcels discarded)",
        pass_a.ambiguous_groups, pass_a.kept_by_homeowner, pass_a.kept_by_family, pass_a.parcels_discarded
    );
    summary.pass_a = pass_a;
    summary.rows = rows.len();
    (rows, summary)
}

/// Full pipeline: census, assessment, water and solar, in that order, each
/// stage consuming the previous stage's rows. Water and solar stages are
/// skipped when their tables are empty.
pub fn link(
    residents: &[Resident],
    parcels: &[Parcel],
    meters: &[WaterMeter],
    solar: &[SolarRecord],
    thresholds: &Thresholds,
) -> Linkage {
    let (mut rows, resident_summary) = link_residents_to_parcels(residents, parcels, &thresholds.entity_markers);
    let mut summary = LinkageSummary {
        meters: meters.len(),
        solar_records: solar.len(),
        fail_open_addresses: resident_summary.fail_open_addresses
            + LinkageSummary::fail_open_in(meters.iter().map(|m| &m.address))
            + LinkageSummary::fail_open_in(solar.iter().map(|s| &s.address)),
        ..resident_summary
    };

    let parcel_index = AddressIndex::new(parcels, |p| p.address.join_key());
    let solar_index = AddressIndex::new(solar, |s| s.address.join_key());

    let mut unmatched: Vec<&WaterMeter> = Vec::new();
    if !meters.is_empty() {
        let meter_index = AddressIndex::new(meters, |m| m.address.join_key());
        let resident_keys: HashSet<&str> = residents
            .iter()
            .map(|r| r.address.join_key())
            .filter(|k| !k.is_empty())
            .collect();
        unmatched = meters
            .iter()
            .filter(|m| !resident_keys.contains(m.address.join_key()))
            .collect();

        rows = left_join(rows, &meter_index, |row, m| row.meter = Some(m.clone()));
        summary.water_rows = rows.len();
        info!("+ water: {} meters -> {} rows", meters.len(), rows.len());

        let (resolved, pass_b) = resolve_water(rows);
        info!(
            "pass B: {} ambiguous pairs ({} residential/irrigation kept, {} meters discarded)",
            pass_b.ambiguous_groups, pass_b.accepted_pairs, pass_b.meters_discarded
        );
        rows = resolved;
        summary.pass_b = pass_b;
    }

    if !solar.is_empty() {
        rows = left_join(rows, &solar_index, |row, s| row.solar = Some(s.clone()));
        summary.solar_rows = rows.len();
        info!("+ solar: {} records -> {} rows", solar.len(), rows.len());
    }

    if !unmatched.is_empty() {
        let (extra, backfill) = backfill_water(&unmatched, &parcel_index, &solar_index, thresholds);
        info!(
            "backfill: {} unmatched meters, {} customers excluded, {} rows added",
            backfill.unmatched_meters, backfill.excluded_customers, backfill.rows
        );
        rows.extend(extra);
        summary.backfill = backfill;
    }

    summary.rows = rows.len();
    Linkage { rows, summary }
}
