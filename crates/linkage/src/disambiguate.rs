//! Post-join passes that resolve one resident matching several records.
//!
//! When evidence cannot rank the candidates, the pass keeps a single row and
//! drops the ambiguous attribution instead of guessing.

use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;

use log::debug;
use serde::Serialize;

use crate::model::{LinkageRow, ServiceType};

/// Decisions taken by pass A.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssessmentPass {
    /// Residents joined to more than one parcel.
    pub ambiguous_groups: usize,
    pub kept_by_homeowner: usize,
    pub kept_by_family: usize,
    /// Groups collapsed to one row with the parcel discarded.
    pub parcels_discarded: usize,
}

/// Decisions taken by pass B.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WaterPass {
    /// (resident, parcel) pairs joined to more than one meter.
    pub ambiguous_groups: usize,
    /// Groups kept whole as a residential + irrigation pair.
    pub accepted_pairs: usize,
    /// Groups collapsed to one row with the meter discarded.
    pub meters_discarded: usize,
}

/// Indices of `rows` grouped by `key`, groups in order of first appearance.
fn group_by<K, F>(rows: &[LinkageRow], key: F) -> Vec<Vec<usize>>
where
    K: Eq + Hash,
    F: Fn(&LinkageRow) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        let slot = *index.entry(key(row)).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(i);
    }
    groups
}

/// Keep the rows at `keep` (ascending), in their original order.
fn retain_indices(rows: Vec<LinkageRow>, keep: &[usize]) -> Vec<LinkageRow> {
    let mut keep = keep.iter().copied().peekable();
    rows.into_iter()
        .enumerate()
        .filter_map(|(i, row)| {
            if keep.peek() == Some(&i) {
                keep.next();
                Some(row)
            } else {
                None
            }
        })
        .collect()
}

/// Pass A: one resident, several parcels.
///
/// Homeowner rows win, then family rows. With neither signal the first row
/// survives with its parcel cleared.
pub fn resolve_assessment(rows: Vec<LinkageRow>) -> (Vec<LinkageRow>, AssessmentPass) {
    let mut stats = AssessmentPass::default();
    let mut rows = rows;
    let mut keep: Vec<usize> = Vec::with_capacity(rows.len());

    for group in group_by(&rows, |r| r.resident_id().map(str::to_string)) {
        if group.len() == 1 || rows[group[0]].resident.is_none() {
            keep.extend(group);
            continue;
        }
        stats.ambiguous_groups += 1;

        let homeowners: Vec<usize> = group.iter().copied().filter(|&i| rows[i].is_homeowner).collect();
        if !homeowners.is_empty() {
            stats.kept_by_homeowner += 1;
            keep.extend(homeowners);
            continue;
        }

        let family: Vec<usize> = group.iter().copied().filter(|&i| rows[i].is_family).collect();
        if !family.is_empty() {
            stats.kept_by_family += 1;
            keep.extend(family);
            continue;
        }

        let first = group[0];
        debug!(
            "resident {}: {} parcels and no ownership signal, parcel discarded",
            rows[first].resident_id().unwrap_or_default(),
            group.len()
        );
        let row = &mut rows[first];
        row.parcel = None;
        row.is_homeowner = false;
        row.is_family = false;
        stats.parcels_discarded += 1;
        keep.push(first);
    }

    keep.sort_unstable();
    (retain_indices(rows, &keep), stats)
}

/// A group of meters is a legitimate pair when it is exactly one
/// residential and one irrigation meter on a known parcel.
fn is_residential_irrigation_pair(rows: &[&LinkageRow]) -> bool {
    let mut types: Vec<&ServiceType> = rows.iter().filter_map(|r| r.service_type()).collect();
    types.sort();
    types == [&ServiceType::Residential, &ServiceType::Irrigation]
}

/// Pass B: one (resident, parcel) pair, several meters.
pub fn resolve_water(rows: Vec<LinkageRow>) -> (Vec<LinkageRow>, WaterPass) {
    let mut stats = WaterPass::default();
    let mut rows = rows;
    let mut keep: Vec<usize> = Vec::with_capacity(rows.len());

    let groups = group_by(&rows, |r| {
        (r.resident_id().map(str::to_string), r.parcel_id().map(str::to_string))
    });
    for group in groups {
        let meters: BTreeSet<&str> = group.iter().filter_map(|&i| rows[i].meter_number()).collect();
        if meters.len() <= 1 {
            keep.extend(group);
            continue;
        }
        stats.ambiguous_groups += 1;

        let members: Vec<&LinkageRow> = group.iter().map(|&i| &rows[i]).collect();
        let has_parcel = members[0].parcel.is_some();
        if has_parcel && is_residential_irrigation_pair(&members) {
            stats.accepted_pairs += 1;
            keep.extend(group);
            continue;
        }

        let first = group[0];
        debug!(
            "resident {}: {} meters without a residential/irrigation split, meter discarded",
            rows[first].resident_id().unwrap_or_default(),
            meters.len()
        );
        rows[first].meter = None;
        stats.meters_discarded += 1;
        keep.push(first);
    }

    keep.sort_unstable();
    (retain_indices(rows, &keep), stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OwnerOccupied, Parcel, Resident, WaterMeter};
    use townlink_address::NormalizedAddress;

    fn address() -> NormalizedAddress {
        NormalizedAddress::from_parts("12", "MAIN ST", "")
    }

    fn resident(id: &str) -> Resident {
        Resident {
            resident_id: id.into(),
            first_name: "JOHN".into(),
            middle_name: String::new(),
            last_name: "SMITH".into(),
            apartment_number: String::new(),
            street_number_suffix: String::new(),
            address: address(),
        }
    }

    fn parcel(id: &str) -> Parcel {
        Parcel {
            parcel_id: id.into(),
            owner_1_name: "JONES PAUL".into(),
            owner_2_name: String::new(),
            owner_3_name: String::new(),
            owner_occupied: OwnerOccupied::Yes,
            condo_unit: String::new(),
            zone: String::new(),
            street_name_alt: String::new(),
            address: address(),
        }
    }

    fn meter(number: &str, service: ServiceType) -> WaterMeter {
        WaterMeter {
            meter_number: number.into(),
            service_type: service,
            first_name: "JOHN".into(),
            last_name: "SMITH".into(),
            reading_date: None,
            address: address(),
        }
    }

    fn joined(resident_id: &str, parcel_id: Option<&str>, homeowner: bool, family: bool) -> LinkageRow {
        let mut row = LinkageRow::for_resident(resident(resident_id));
        row.parcel = parcel_id.map(parcel);
        row.is_homeowner = homeowner;
        row.is_family = family;
        row
    }

    fn with_meter(mut row: LinkageRow, number: &str, service: ServiceType) -> LinkageRow {
        row.meter = Some(meter(number, service));
        row
    }

    #[test]
    fn pass_a_keeps_homeowner_row() {
        let rows = vec![
            joined("1", Some("8"), false, false),
            joined("1", Some("9"), true, false),
        ];
        let (rows, stats) = resolve_assessment(rows);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].parcel_id(), Some("9"));
        assert!(rows[0].is_homeowner);
        assert_eq!(stats.kept_by_homeowner, 1);
    }

    #[test]
    fn pass_a_prefers_family_over_nothing() {
        let rows = vec![
            joined("1", Some("8"), false, true),
            joined("1", Some("9"), false, false),
        ];
        let (rows, stats) = resolve_assessment(rows);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].parcel_id(), Some("8"));
        assert_eq!(stats.kept_by_family, 1);
    }

    #[test]
    fn pass_a_without_signal_discards_parcel() {
        let rows = vec![
            joined("1", Some("8"), false, false),
            joined("1", Some("9"), false, false),
        ];
        let (rows, stats) = resolve_assessment(rows);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].resident_id(), Some("1"));
        assert_eq!(rows[0].parcel_id(), None);
        assert!(!rows[0].is_homeowner);
        assert!(!rows[0].is_family);
        assert_eq!(stats.parcels_discarded, 1);
    }

    #[test]
    fn pass_a_keeps_order_and_singletons() {
        let rows = vec![
            joined("2", Some("7"), false, false),
            joined("1", Some("8"), true, false),
            joined("1", Some("9"), true, false),
            joined("3", None, false, false),
        ];
        let (rows, stats) = resolve_assessment(rows);
        let ids: Vec<_> = rows.iter().map(|r| (r.resident_id(), r.parcel_id())).collect();
        assert_eq!(
            ids,
            vec![
                (Some("2"), Some("7")),
                (Some("1"), Some("8")),
                (Some("1"), Some("9")),
                (Some("3"), None),
            ]
        );
        assert_eq!(stats.ambiguous_groups, 1);
    }

    #[test]
    fn pass_b_accepts_residential_and_irrigation() {
        let base = joined("1", Some("9"), true, false);
        let rows = vec![
            with_meter(base.clone(), "M1", ServiceType::Residential),
            with_meter(base, "M2", ServiceType::Irrigation),
        ];
        let (rows, stats) = resolve_water(rows);
        assert_eq!(rows.len(), 2);
        assert_eq!(stats.accepted_pairs, 1);
    }

    #[test]
    fn pass_b_collapses_duplicate_service_type() {
        let base = joined("1", Some("9"), true, false);
        let rows = vec![
            with_meter(base.clone(), "M1", ServiceType::Residential),
            with_meter(base, "M2", ServiceType::Residential),
        ];
        let (rows, stats) = resolve_water(rows);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].meter_number(), None);
        assert_eq!(rows[0].water_customer(), "");
        assert_eq!(rows[0].parcel_id(), Some("9"));
        assert_eq!(stats.meters_discarded, 1);
    }

    #[test]
    fn pass_b_collapses_unexpected_or_extra_types() {
        let base = joined("1", Some("9"), true, false);
        let rows = vec![
            with_meter(base.clone(), "M1", ServiceType::Residential),
            with_meter(base.clone(), "M2", ServiceType::Irrigation),
            with_meter(base, "M3", ServiceType::Other("Commercial".into())),
        ];
        let (rows, _) = resolve_water(rows);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].meter_number(), None);
    }

    #[test]
    fn pass_b_collapses_pair_without_parcel() {
        let base = joined("1", None, false, false);
        let rows = vec![
            with_meter(base.clone(), "M1", ServiceType::Residential),
            with_meter(base, "M2", ServiceType::Irrigation),
        ];
        let (rows, _) = resolve_water(rows);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].meter_number(), None);
    }

    #[test]
    fn pass_b_leaves_single_meter_alone() {
        let rows = vec![with_meter(joined("1", Some("9"), true, false), "M1", ServiceType::Residential)];
        let (rows, stats) = resolve_water(rows);
        assert_eq!(rows[0].meter_number(), Some("M1"));
        assert_eq!(stats, WaterPass::default());
    }
}
