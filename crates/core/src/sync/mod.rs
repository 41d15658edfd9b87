//! Table sync pipeline: fetch, back up, regenerate SQL, replace.

mod backup;
mod catalog;
mod fetcher;
mod format;
mod importer;
mod orchestrator;
mod report_model;
mod snapshot_model;
mod sql_generator;
mod store;
mod value;

pub use backup::*;
pub use catalog::*;
pub use fetcher::*;
pub use format::*;
pub use importer::*;
pub use orchestrator::*;
pub use report_model::*;
pub use snapshot_model::*;
pub use sql_generator::*;
pub use store::*;
pub use value::*;

#[cfg(test)]
mod tests;
