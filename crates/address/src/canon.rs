//! Canonical abbreviation tables for street types, directionals and
//! occupancy designators.
//!
//! Street types follow USPS Publication 28 (Appendix C1): every common
//! variant maps to the standard suffix abbreviation, and the standard
//! abbreviation maps to itself so already-canonical input passes through.
//! The vocabulary is closed. A token missing from these tables is either a
//! plain street-name word or, when a tagger labels it as a street type, a
//! data-quality problem for a human to review.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

/// (standard abbreviation, variants). The abbreviation itself is implied.
const STREET_TYPES: &[(&str, &[&str])] = &[
    ("ALY", &["ALLEY", "ALLEE", "ALLY"]),
    ("ANX", &["ANEX", "ANNEX", "ANNX"]),
    ("ARC", &["ARCADE"]),
    ("AVE", &["AV", "AVEN", "AVENU", "AVENUE", "AVN", "AVNUE"]),
    ("BLF", &["BLUFF", "BLUF"]),
    ("BLVD", &["BOULEVARD", "BOUL", "BOULV", "BLV"]),
    ("BND", &["BEND"]),
    ("BR", &["BRANCH", "BRNCH"]),
    ("BRG", &["BRIDGE", "BRDGE"]),
    ("BRK", &["BROOK"]),
    ("BYP", &["BYPASS", "BYPA", "BYPAS", "BYPS"]),
    ("CIR", &["CIRCLE", "CIRC", "CIRCL", "CRCL", "CRCLE"]),
    ("CLF", &["CLIFF"]),
    ("CMN", &["COMMON"]),
    ("COR", &["CORNER"]),
    ("CRES", &["CRESCENT", "CRSENT", "CRSNT"]),
    ("CRK", &["CREEK"]),
    ("CRSE", &["COURSE"]),
    ("CT", &["COURT", "CRT"]),
    ("CTR", &["CENTER", "CEN", "CENT", "CENTR", "CENTRE", "CNTER", "CNTR"]),
    ("CV", &["COVE"]),
    ("CSWY", &["CAUSEWAY", "CAUSWA"]),
    ("DL", &["DALE"]),
    ("DR", &["DRIVE", "DRIV", "DRV"]),
    ("EST", &["ESTATE"]),
    ("ESTS", &["ESTATES"]),
    ("EXPY", &["EXPRESSWAY", "EXP", "EXPR", "EXPRESS", "EXPW"]),
    ("EXT", &["EXTENSION", "EXTN", "EXTNSN"]),
    ("FLD", &["FIELD"]),
    ("FLDS", &["FIELDS"]),
    ("FRM", &["FARM"]),
    ("FRST", &["FOREST", "FORESTS"]),
    ("FWY", &["FREEWAY", "FREEWY", "FRWAY", "FRWY"]),
    ("GDN", &["GARDEN", "GARDN", "GRDEN", "GRDN"]),
    ("GDNS", &["GARDENS", "GRDNS"]),
    ("GLN", &["GLEN"]),
    ("GRN", &["GREEN"]),
    ("GRV", &["GROVE", "GROV"]),
    ("HBR", &["HARBOR", "HARB", "HARBR", "HRBOR"]),
    ("HL", &["HILL"]),
    ("HLS", &["HILLS"]),
    ("HOLW", &["HOLLOW", "HLLW", "HOLLOWS", "HOLWS"]),
    ("HTS", &["HEIGHTS", "HT"]),
    ("HWY", &["HIGHWAY", "HIGHWY", "HIWAY", "HIWY", "HWAY"]),
    ("IS", &["ISLAND", "ISLND"]),
    ("JCT", &["JUNCTION", "JCTION", "JCTN", "JUNCTN", "JUNCTON"]),
    ("KNL", &["KNOLL", "KNOL"]),
    ("LK", &["LAKE"]),
    ("LN", &["LANE"]),
    ("LNDG", &["LANDING", "LNDNG"]),
    ("LOOP", &["LOOPS"]),
    ("MDW", &["MEADOW"]),
    ("MDWS", &["MEADOWS", "MEDOWS"]),
    ("ML", &["MILL"]),
    ("MNR", &["MANOR"]),
    ("MT", &["MOUNT", "MNT"]),
    ("MTN", &["MOUNTAIN", "MNTAIN", "MNTN", "MOUNTIN", "MTIN"]),
    ("ORCH", &["ORCHARD", "ORCHRD"]),
    ("OVAL", &["OVL"]),
    ("PARK", &["PRK", "PARKS"]),
    ("PASS", &[]),
    ("PATH", &["PATHS"]),
    ("PIKE", &["PIKES"]),
    ("PKWY", &["PARKWAY", "PARKWY", "PKWAY", "PKY", "PARKWAYS", "PKWYS"]),
    ("PL", &["PLACE"]),
    ("PLZ", &["PLAZA", "PLZA"]),
    ("PND", &["POND"]),
    ("PT", &["POINT"]),
    ("RD", &["ROAD"]),
    ("RDG", &["RIDGE", "RDGE"]),
    ("RIV", &["RIVER", "RVR", "RIVR"]),
    ("ROW", &[]),
    ("RUN", &[]),
    ("SQ", &["SQUARE", "SQR", "SQRE", "SQU"]),
    ("ST", &["STREET", "STRT", "STR"]),
    ("TER", &["TERRACE", "TERR", "TR"]),
    ("TPKE", &["TURNPIKE", "TRNPK", "TURNPK"]),
    ("TRL", &["TRAIL", "TRAILS", "TRLS"]),
    ("VIS", &["VISTA", "VIST", "VST", "VSTA"]),
    ("VLG", &["VILLAGE", "VILL", "VILLAG", "VILLG", "VILLIAGE"]),
    ("VW", &["VIEW"]),
    ("WALK", &["WALKS"]),
    ("WAY", &["WY"]),
    ("WL", &["WELL"]),
    ("XING", &["CROSSING", "CRSSNG"]),
];

const DIRECTIONALS: &[(&str, &[&str])] = &[
    ("N", &["NORTH"]),
    ("S", &["SOUTH"]),
    ("E", &["EAST"]),
    ("W", &["WEST"]),
    ("NE", &["NORTHEAST"]),
    ("NW", &["NORTHWEST"]),
    ("SE", &["SOUTHEAST"]),
    ("SW", &["SOUTHWEST"]),
];

const OCCUPANCY_MARKERS: &[(&str, &[&str])] = &[
    ("APT", &["APARTMENT", "APTS"]),
    ("BLDG", &["BUILDING", "BLD"]),
    ("DEPT", &["DEPARTMENT"]),
    ("FL", &["FLOOR", "FLR"]),
    ("LOT", &[]),
    ("PH", &["PENTHOUSE"]),
    ("RM", &["ROOM"]),
    ("STE", &["SUITE"]),
    ("UNIT", &["UNITS"]),
    ("#", &["NO"]),
];

fn build(table: &[(&'static str, &[&'static str])]) -> HashMap<&'static str, &'static str> {
    let mut map = HashMap::new();
    for (canonical, variants) in table {
        map.insert(*canonical, *canonical);
        for v in *variants {
            map.insert(*v, *canonical);
        }
    }
    map
}

static STREET_TYPE_MAP: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| build(STREET_TYPES));
static DIRECTIONAL_MAP: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| build(DIRECTIONALS));
static OCCUPANCY_MAP: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| build(OCCUPANCY_MARKERS));
static CANONICAL_STREET_TYPES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| STREET_TYPES.iter().map(|(c, _)| *c).collect());

/// Standard abbreviation for a street-type token (`STREET` -> `ST`).
pub fn street_type(token: &str) -> Option<&'static str> {
    STREET_TYPE_MAP.get(token).copied()
}

/// True if `token` is already a standard street-type abbreviation.
pub fn is_canonical_street_type(token: &str) -> bool {
    CANONICAL_STREET_TYPES.contains(token)
}

/// Standard abbreviation for a directional word (`NORTHEAST` -> `NE`).
pub fn directional(token: &str) -> Option<&'static str> {
    DIRECTIONAL_MAP.get(token).copied()
}

/// Standard designator for a secondary-unit marker (`APARTMENT` -> `APT`).
pub fn occupancy_marker(token: &str) -> Option<&'static str> {
    OCCUPANCY_MAP.get(token).copied()
}
