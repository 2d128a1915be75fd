//! Dataset handling: variable domains with inference, and the immutable
//! columnar view that estimators read.

pub mod dataset;
pub mod domain;

pub use dataset::{Column, ColumnKey, Dataset, DomainSpec};
pub use domain::{Domain, DomainKind, infer_domain_kind, make_domain};
