//! Owner / family inference from name fragments.
//!
//! Name matching is a coarse token overlap: assessment rolls write owners as
//! `SMITH JOHN & MARY`, `SMITH FAMILY TRUST` and so on, so anything stricter
//! than a shared word loses most true owners.

use std::collections::HashSet;

use crate::model::{LinkageRow, OwnerOccupied, Parcel, Resident};

/// True iff `a` and `b` share at least one whitespace-separated token.
/// Exact, case-sensitive comparison; inputs are uppercased upstream.
pub fn partial_match(a: &str, b: &str) -> bool {
    let left: HashSet<&str> = a.split_whitespace().collect();
    b.split_whitespace().any(|t| left.contains(t))
}

fn has_marker(owner: &str, markers: &[String]) -> bool {
    owner.split_whitespace().any(|t| markers.iter().any(|m| m == t))
}

/// The resident is the recorded owner of an owner-occupied parcel: some
/// owner field matches the last name and either the first name or an
/// entity marker (`TRUST`, `TR`, ...).
pub fn is_homeowner(resident: &Resident, parcel: &Parcel, markers: &[String]) -> bool {
    if parcel.owner_occupied != OwnerOccupied::Yes {
        return false;
    }
    parcel.owners().iter().any(|owner| {
        partial_match(owner, &resident.last_name)
            && (partial_match(owner, &resident.first_name) || has_marker(owner, markers))
    })
}

/// Owner fields plus unit of every homeowner row. A resident of a unit is
/// family only if the owners live in that same unit.
#[derive(Debug, Default)]
pub struct HomeownerUnits {
    units: HashSet<(String, String, String, String)>,
}

impl HomeownerUnits {
    pub fn from_rows(rows: &[LinkageRow]) -> Self {
        let units = rows
            .iter()
            .filter(|row| row.is_homeowner)
            .filter_map(|row| match (&row.resident, &row.parcel) {
                (Some(r), Some(p)) => Some(Self::key(r, p)),
                _ => None,
            })
            .collect();
        Self { units }
    }

    fn key(resident: &Resident, parcel: &Parcel) -> (String, String, String, String) {
        (
            parcel.owner_1_name.clone(),
            parcel.owner_2_name.clone(),
            parcel.owner_3_name.clone(),
            resident.apartment_number.clone(),
        )
    }

    pub fn contains(&self, resident: &Resident, parcel: &Parcel) -> bool {
        self.units.contains(&Self::key(resident, parcel))
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

pub fn is_family(resident: &Resident, parcel: &Parcel, homeowner: bool, units: &HomeownerUnits) -> bool {
    if homeowner || parcel.owner_occupied == OwnerOccupied::No {
        return false;
    }
    if !resident.apartment_number.trim().is_empty() {
        return units.contains(resident, parcel);
    }
    parcel
        .owners()
        .iter()
        .any(|owner| partial_match(owner, &resident.last_name))
}

/// Set `is_homeowner` then `is_family` on every row that carries both a
/// resident and a parcel. Family inference needs the complete homeowner
/// index, so it runs as a second sweep.
pub fn classify(rows: &mut [LinkageRow], markers: &[String]) {
    for row in rows.iter_mut() {
        row.is_homeowner = match (&row.resident, &row.parcel) {
            (Some(r), Some(p)) => is_homeowner(r, p, markers),
            _ => false,
        };
    }

    let units = HomeownerUnits::from_rows(rows);
    for row in rows.iter_mut() {
        row.is_family = match (&row.resident, &row.parcel) {
            (Some(r), Some(p)) => is_family(r, p, row.is_homeowner, &units),
            _ => false,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ENTITY_MARKERS;
    use townlink_address::NormalizedAddress;

    fn markers() -> Vec<String> {
        DEFAULT_ENTITY_MARKERS.iter().map(|m| m.to_string()).collect()
    }

    fn resident(first: &str, last: &str, apt: &str) -> Resident {
        Resident {
            resident_id: "1".into(),
            first_name: first.into(),
            middle_name: String::new(),
            last_name: last.into(),
            apartment_number: apt.into(),
            street_number_suffix: String::new(),
            address: NormalizedAddress::from_parts("12", "MAIN ST", apt),
        }
    }

    fn parcel(owner_1: &str, occupied: OwnerOccupied) -> Parcel {
        Parcel {
            parcel_id: "9".into(),
            owner_1_name: owner_1.into(),
            owner_2_name: String::new(),
            owner_3_name: String::new(),
            owner_occupied: occupied,
            condo_unit: String::new(),
            zone: String::new(),
            street_name_alt: String::new(),
            address: NormalizedAddress::from_parts("12", "MAIN ST", ""),
        }
    }

    fn row(resident: Resident, parcel: Parcel) -> LinkageRow {
        let mut row = LinkageRow::for_resident(resident);
        row.parcel = Some(parcel);
        row
    }

    #[test]
    fn partial_match_shares_a_token() {
        assert!(partial_match("SMITH JOHN", "JOHN"));
        assert!(partial_match("SMITH JOHN & MARY", "MARY ANN"));
        assert!(!partial_match("SMITHSON JOHN", "SMITH"));
        assert!(!partial_match("SMITH", "smith"));
        assert!(!partial_match("", ""));
    }

    #[test]
    fn homeowner_needs_first_and_last_name() {
        let r = resident("JOHN", "SMITH", "");
        assert!(is_homeowner(&r, &parcel("SMITH JOHN", OwnerOccupied::Yes), &markers()));
        assert!(!is_homeowner(&r, &parcel("SMITH MARY", OwnerOccupied::Yes), &markers()));
        assert!(!is_homeowner(&r, &parcel("SMITH JOHN", OwnerOccupied::No), &markers()));
        assert!(!is_homeowner(&r, &parcel("SMITH JOHN", OwnerOccupied::Unknown), &markers()));
    }

    #[test]
    fn trust_stands_in_for_first_name() {
        let r = resident("JOHN", "SMITH", "");
        assert!(is_homeowner(&r, &parcel("SMITH FAMILY TRUST", OwnerOccupied::Yes), &markers()));
        assert!(is_homeowner(&r, &parcel("SMITH IRT", OwnerOccupied::Yes), &markers()));
        assert!(!is_homeowner(&r, &parcel("JONES TRUST", OwnerOccupied::Yes), &markers()));
        assert!(!is_homeowner(&r, &parcel("SMITH FAMILY TRUST", OwnerOccupied::Yes), &[]));
    }

    #[test]
    fn family_by_last_name() {
        let units = HomeownerUnits::default();
        let r = resident("MARY", "SMITH", "");
        assert!(is_family(&r, &parcel("SMITH JOHN", OwnerOccupied::Yes), false, &units));
        assert!(is_family(&r, &parcel("SMITH JOHN", OwnerOccupied::Unknown), false, &units));
        assert!(!is_family(&r, &parcel("SMITH JOHN", OwnerOccupied::No), false, &units));
        assert!(!is_family(&r, &parcel("SMITH JOHN", OwnerOccupied::Yes), true, &units));
        assert!(!is_family(&r, &parcel("JONES PAUL", OwnerOccupied::Yes), false, &units));
    }

    #[test]
    fn family_in_unit_needs_owner_in_same_unit() {
        let owner = parcel("SMITH JOHN", OwnerOccupied::Yes);
        let mut rows = vec![
            row(resident("JOHN", "SMITH", "2"), owner.clone()),
            row(resident("MARY", "SMITH", "2"), owner.clone()),
            row(resident("PAUL", "SMITH", "3"), owner),
        ];
        classify(&mut rows, &markers());

        assert!(rows[0].is_homeowner);
        assert!(!rows[0].is_family);
        assert!(rows[1].is_family);
        assert!(!rows[2].is_family, "owner lives in a different unit");
    }

    #[test]
    fn rows_without_parcel_are_unflagged() {
        let mut rows = vec![LinkageRow::for_resident(resident("JOHN", "SMITH", ""))];
        classify(&mut rows, &markers());
        assert!(!rows[0].is_homeowner);
        assert!(!rows[0].is_family);
    }
}
