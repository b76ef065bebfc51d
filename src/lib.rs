pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod index;

pub use config::{Config, SslMode};
pub use error::{Error, Result};
pub use export::{export_pairs, export_to_file, ExportFilter, ExportStats, ExportSummary, UaIpPair};
pub use index::{provision, IndexDescriptor, IndexOutcome, ProvisionReport, USER_EVENTS_INDEXES};
