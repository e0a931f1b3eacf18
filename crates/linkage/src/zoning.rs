use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

use crate::model::Parcel;

pub const ZONE_TABLE: &str = "ZoneLookup";

/// Zoning code for one normalized address, keyed by the same parts the
/// linkage joins on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneEntry {
    pub street_number: String,
    pub street_name: String,
    pub zone: String,
}

/// One entry per address with an unambiguous zone, sorted by address.
/// Addresses whose parcels disagree on the zone are left out.
pub fn build_zone_lookup(parcels: &[Parcel]) -> Vec<ZoneEntry> {
    let mut zones: BTreeMap<(String, String), Option<String>> = BTreeMap::new();

    for parcel in parcels {
        let zone = parcel.zone.trim();
        if zone.is_empty() || parcel.address.is_empty() {
            continue;
        }
        let key = (
            parcel.address.street_number().to_string(),
            parcel.address.street_name().to_string(),
        );
        zones
            .entry(key)
            .and_modify(|existing| {
                if existing.as_deref() != Some(zone) {
                    *existing = None;
                }
            })
            .or_insert_with(|| Some(zone.to_string()));
    }

    zones
        .into_iter()
        .filter_map(|((street_number, street_name), zone)| match zone {
            Some(zone) => Some(ZoneEntry {
                street_number,
                street_name,
                zone,
            }),
            None => {
                debug!("zoning: conflicting zones at {street_number} {street_name}, dropped");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OwnerOccupied;
    use townlink_address::NormalizedAddress;

    fn parcel(number: &str, street: &str, zone: &str) -> Parcel {
        Parcel {
            parcel_id: format!("{number}-{street}"),
            owner_1_name: String::new(),
            owner_2_name: String::new(),
            owner_3_name: String::new(),
            owner_occupied: OwnerOccupied::Unknown,
            condo_unit: String::new(),
            zone: zone.into(),
            street_name_alt: String::new(),
            address: NormalizedAddress::from_parts(number, street, ""),
        }
    }

    #[test]
    fn lookup_is_sorted_and_deduplicated() {
        let parcels = [
            parcel("5", "ELM ST", "SRA"),
            parcel("12", "MAIN ST", "GB"),
            parcel("12", "MAIN ST", "GB"),
        ];
        let entries = build_zone_lookup(&parcels);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].street_number, "12");
        assert_eq!(entries[0].zone, "GB");
        assert_eq!(entries[1].street_name, "ELM ST");
    }

    #[test]
    fn conflicting_zones_are_dropped() {
        let parcels = [
            parcel("12", "MAIN ST", "GB"),
            parcel("12", "MAIN ST", "SRB"),
            parcel("14", "MAIN ST", ""),
        ];
        assert!(build_zone_lookup(&parcels).is_empty());
    }

    #[test]
    fn key_matches_linkage_join_parts() {
        let n = townlink_address::Normalizer::for_cities(["ANDOVER"]);
        let mut p = parcel("", "", "SRA");
        p.address = n.normalize("12 Main Street", "ANDOVER").unwrap();
        let entries = build_zone_lookup(&[p]);
        assert_eq!(entries[0].street_number, "12");
        assert_eq!(entries[0].street_name, "MAIN ST");
    }
}
