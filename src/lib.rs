pub mod alignment;
pub mod distribution;
pub mod error;
pub mod export;
pub mod feature_location;
pub mod hypothesis;
pub mod metric;
pub mod metrics;
pub mod nucleotide;
pub mod per_base;
pub mod reference;
pub mod selection;
pub mod session;
pub mod summary;
