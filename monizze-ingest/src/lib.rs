//! monizze-ingest: raw history pages as the platform returns them, and their
//! normalization into transaction records.

pub mod normalize;
pub mod raw;

pub use normalize::Normalizer;
pub use raw::{RawEntry, RawPage};
