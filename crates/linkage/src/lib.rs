//! `townlink-linkage`: resident, parcel, water and solar record linkage.
//!
//! Pure engine crate: receives pre-loaded tables, returns the reconciled
//! Lookup table. No file IO.

pub mod backfill;
pub mod config;
pub mod disambiguate;
pub mod engine;
pub mod error;
pub mod model;
pub mod output;
pub mod ownership;
pub mod sources;
pub mod summary;
pub mod zoning;

pub use config::{LinkageConfig, Thresholds};
pub use engine::{link, link_residents_to_parcels, Linkage};
pub use error::LinkageError;
pub use model::{LinkageInput, LinkageRow, SourceTable};
pub use output::{LookupOutput, LookupTable};
pub use sources::SourceTables;
pub use summary::LinkageSummary;
pub use zoning::{build_zone_lookup, ZoneEntry};
