//! Result aggregation layer.
//!
//! - **[`scope`]**: the "all sections or exactly one" presentation filter.
//! - **[`records`]**: the sectioned record set and its replace/merge rules.
//! - **[`aggregator`]**: [`SearchAggregator`], which drives the query
//!   client from user input and keeps the record set current.

pub mod aggregator;
pub mod records;
pub mod scope;

pub use aggregator::{AggregatorConfig, SearchAggregator, SearchEventHandler};
pub use records::{RecordSet, SectionData};
pub use scope::ScopeSelection;
