//! Database schemas for Statehouse
//!
//! Defines the MongoDB document structure for country records.

mod country;
mod metadata;

pub use country::{
    CountryDoc, CountryView, PolicyField, UnknownPolicyField, COUNTRY_COLLECTION,
};
pub use metadata::Metadata;
