//! Water meters that matched no resident become resident-less rows, unless
//! the billed customer looks commercial or municipal.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use serde::Serialize;

use crate::config::Thresholds;
use crate::engine::AddressIndex;
use crate::model::{LinkageRow, Parcel, ServiceType, SolarRecord, WaterMeter};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillStats {
    pub unmatched_meters: usize,
    /// Customers dropped for holding too many meters or a non-residential
    /// service.
    pub excluded_customers: usize,
    pub backfilled_meters: usize,
    pub rows: usize,
}

#[derive(Debug, Default)]
struct Customer {
    meters: usize,
    services: BTreeSet<ServiceType>,
}

/// Customer display names allowed through the backfill.
pub fn eligible_customers(unmatched: &[&WaterMeter], thresholds: &Thresholds) -> (BTreeSet<String>, usize) {
    let mut customers: BTreeMap<String, Customer> = BTreeMap::new();
    for meter in unmatched {
        let customer = customers.entry(meter.customer_name()).or_default();
        customer.meters += 1;
        customer.services.insert(meter.service_type.clone());
    }

    let mut excluded = 0;
    let mut eligible = BTreeSet::new();
    for (name, customer) in customers {
        let too_many = customer.meters > thresholds.max_meters_per_customer;
        let commercial = customer
            .services
            .iter()
            .any(|s| !thresholds.residential_service_types.contains(s));
        if too_many || commercial {
            debug!(
                "backfill: excluding '{name}' ({} meters, services {:?})",
                customer.meters, customer.services
            );
            excluded += 1;
        } else {
            eligible.insert(name);
        }
    }
    (eligible, excluded)
}

/// Rows for meters no resident matched, left-joined to assessment and solar
/// on the meter's address.
pub fn backfill_water(
    unmatched: &[&WaterMeter],
    parcels: &AddressIndex<'_, Parcel>,
    solar: &AddressIndex<'_, SolarRecord>,
    thresholds: &Thresholds,
) -> (Vec<LinkageRow>, BackfillStats) {
    let (eligible, excluded_customers) = eligible_customers(unmatched, thresholds);
    let mut stats = BackfillStats {
        unmatched_meters: unmatched.len(),
        excluded_customers,
        ..Default::default()
    };

    let mut rows = Vec::new();
    for meter in unmatched.iter().filter(|m| eligible.contains(&m.customer_name())) {
        stats.backfilled_meters += 1;
        let base = LinkageRow::for_meter((*meter).clone());
        let key = base.join_key().to_string();

        let with_parcels: Vec<LinkageRow> = match parcels.get(&key) {
            [] => vec![base],
            matches => matches
                .iter()
                .map(|p| LinkageRow {
                    parcel: Some((*p).clone()),
                    ..base.clone()
                })
                .collect(),
        };

        for row in with_parcels {
            match solar.get(&key) {
                [] => rows.push(row),
                matches => rows.extend(matches.iter().map(|s| LinkageRow {
                    solar: Some((*s).clone()),
                    ..row.clone()
                })),
            }
        }
    }

    stats.rows = rows.len();
    (rows, stats)
}
