mod catalog;
mod descriptor;
mod provision;

pub use catalog::{Catalog, CatalogIndex, PgCatalog};
pub use descriptor::{
    embedded_index_name, IndexDescriptor, TARGET_SCHEMA, TARGET_TABLE, USER_EVENTS_INDEXES,
};
pub use provision::{provision, IndexOutcome, IndexReport, ProvisionReport};
