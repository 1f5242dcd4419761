//! Plain data records shared across connectors, parsers and the reconciler.
//!
//! Everything here is `Serialize + Deserialize` and carries no behavior
//! beyond small accessors; these are the shapes handed to rendering code.

pub mod enums;
pub mod citation;
pub mod detail;
pub mod reference;

use thiserror::Error;

pub use citation::{classification_key, normalize_url, Citation};
pub use detail::{ArticleDetail, ClassificationDetail, EnrichmentDetail, ParentCategory};
pub use enums::{ArticleFetchStatus, ClassificationFetchStatus, EvidenceSource};
pub use reference::{ClinicalSupportSource, Diagnosis, MergedReference};

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid value for {field}: {value}")]
    InvalidEnum { field: String, value: String },
}
