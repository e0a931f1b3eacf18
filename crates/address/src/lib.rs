//! Street-address normalization.
//!
//! Free-text addresses from different municipal departments are tagged into
//! components, canonicalized against closed abbreviation tables and
//! reassembled so that the same physical address yields the same string no
//! matter which department typed it. This crate has no IO.

pub mod canon;
pub mod component;
pub mod error;
pub mod normalize;
pub mod tagger;

pub use component::{Component, ComponentMap};
pub use error::{AddressError, TagError};
pub use normalize::{NormalizedAddress, Normalizer, RawAddress};
pub use tagger::{AddressTagger, RuleTagger};
