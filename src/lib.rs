//! Address extraction from power-outage schedule documents.
//!
//! A schedule is a table of header rows (branch, queue, sub-queue) and data
//! rows with free-text address cells. One sequential pass turns it into
//! `(branch, slot, settlement, street, house)` records; a reconciliation pass
//! then repairs settlement names that extraction truncated.

pub mod assemble;
pub mod classify;
pub mod config;
pub mod context;
pub mod error;
pub mod houses;
pub mod loader;
pub mod pipeline;
pub mod reconcile;
pub mod segment;

pub use outage_types as types;

pub use config::ExtractConfig;
pub use error::ExtractError;
pub use loader::{InputFormat, load_rows};
pub use pipeline::{ExtractReport, Pipeline, Row, extract, extract_document};
pub use reconcile::{Reconciler, Reconciliation};
