use serde::Serialize;
use townlink_address::NormalizedAddress;

use crate::backfill::BackfillStats;
use crate::disambiguate::{AssessmentPass, WaterPass};
use crate::model::{Parcel, Resident, SolarRecord, WaterMeter};

/// Counts of every decision a run took, stage by stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkageSummary {
    pub residents: usize,
    pub parcels: usize,
    pub meters: usize,
    pub solar_records: usize,
    /// Addresses the tagger could not parse, kept as opaque join keys.
    pub fail_open_addresses: usize,
    pub census_assessment_rows: usize,
    pub pass_a: AssessmentPass,
    pub water_rows: usize,
    pub pass_b: WaterPass,
    pub solar_rows: usize,
    pub backfill: BackfillStats,
    /// Rows in the final linkage.
    pub rows: usize,
}

impl LinkageSummary {
    pub fn for_inputs(
        residents: &[Resident],
        parcels: &[Parcel],
        meters: &[WaterMeter],
        solar: &[SolarRecord],
    ) -> Self {
        Self {
            residents: residents.len(),
            parcels: parcels.len(),
            meters: meters.len(),
            solar_records: solar.len(),
            fail_open_addresses: Self::fail_open_in(residents.iter().map(|r| &r.address))
                + Self::fail_open_in(parcels.iter().map(|p| &p.address))
                + Self::fail_open_in(meters.iter().map(|m| &m.address))
                + Self::fail_open_in(solar.iter().map(|s| &s.address)),
            ..Default::default()
        }
    }

    pub fn fail_open_in<'a>(addresses: impl Iterator<Item = &'a NormalizedAddress>) -> usize {
        addresses.filter(|a| !a.is_canonical()).count()
    }

    /// Human-readable report, one line per stage.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!(
                "inputs: {} residents, {} parcels, {} meters, {} solar",
                self.residents, self.parcels, self.meters, self.solar_records
            ),
            format!("addresses left unparsed: {}", self.fail_open_addresses),
            format!("census + assessment: {} rows", self.census_assessment_rows),
            format!(
                "pass A: {} ambiguous, {} by homeowner, {} by family, {} parcels discarded",
                self.pass_a.ambiguous_groups,
                self.pass_a.kept_by_homeowner,
                self.pass_a.kept_by_family,
                self.pass_a.parcels_discarded
            ),
        ];
        if self.meters > 0 {
            lines.push(format!("+ water: {} rows", self.water_rows));
            lines.push(format!(
                "pass B: {} ambiguous, {} residential/irrigation pairs, {} meters discarded",
                self.pass_b.ambiguous_groups, self.pass_b.accepted_pairs, self.pass_b.meters_discarded
            ));
            lines.push(format!(
                "backfill: {} unmatched meters, {} customers excluded, {} rows added",
                self.backfill.unmatched_meters, self.backfill.excluded_customers, self.backfill.rows
            ));
        }
        if self.solar_records > 0 {
            lines.push(format!("+ solar: {} rows", self.solar_rows));
        }
        lines.push(format!("total: {} rows", self.rows));
        lines
    }
}
