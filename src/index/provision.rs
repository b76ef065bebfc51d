use serde::Serialize;

use super::catalog::{Catalog, CatalogIndex};
use super::descriptor::{IndexDescriptor, TARGET_SCHEMA, TARGET_TABLE};
use crate::error::Result;

/// What happened to one descriptor during a provisioning pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum IndexOutcome {
    Created,
    /// Already present in the catalog before the pass
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub name: String,
    pub description: String,
    #[serde(flatten)]
    pub outcome: IndexOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    /// Number of indexes on the table before anything was created
    pub existing_before: usize,
    /// One entry per descriptor, in input order
    pub outcomes: Vec<IndexReport>,
    /// Catalog listing read back after the pass
    pub final_indexes: Vec<CatalogIndex>,
}

impl ProvisionReport {
    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, IndexOutcome::Created))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, IndexOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, IndexOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&IndexOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|r| pred(&r.outcome)).count()
    }

    /// Human-readable summary for the console
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Existing indexes found: {}\n\n", self.existing_before));

        for report in &self.outcomes {
            let line = match &report.outcome {
                IndexOutcome::Skipped => format!("skipped  {} (already exists)", report.name),
                IndexOutcome::Created => {
                    format!("created  {} ({})", report.name, report.description)
                }
                IndexOutcome::Failed(reason) => format!("failed   {}: {}", report.name, reason),
            };
            out.push_str(&line);
            out.push('\n');
        }

        out.push('\n');
        out.push_str(&format!("Created: {}\n", self.created()));
        out.push_str(&format!("Skipped (already exist): {}\n", self.skipped()));
        out.push_str(&format!("Failed: {}\n\n", self.failed()));

        out.push_str(&format!(
            "Current indexes on {}.{}:\n",
            TARGET_SCHEMA, TARGET_TABLE
        ));
        for index in &self.final_indexes {
            out.push_str(&format!("  - {}\n", index.name));
        }
        out
    }
}

/// Ensure every descriptor exists on the target table.
///
/// The existing index set is read once up front. Each missing index is created and
/// committed on its own, so a failure only marks that descriptor as failed and the
/// pass moves on. Catalog read errors abort the pass.
pub async fn provision<C>(catalog: &mut C, descriptors: &[IndexDescriptor]) -> Result<ProvisionReport>
where
    C: Catalog + ?Sized,
{
    let existing = catalog.existing_index_names().await?;
    let mut outcomes = Vec::with_capacity(descriptors.len());

    for descriptor in descriptors {
        let outcome = if existing.contains(descriptor.name) {
            tracing::debug!(index = descriptor.name, "already exists, skipping");
            IndexOutcome::Skipped
        } else {
            match catalog.create_index(descriptor).await {
                Ok(()) => {
                    tracing::info!(index = descriptor.name, "created index");
                    IndexOutcome::Created
                }
                Err(e) => {
                    tracing::warn!(index = descriptor.name, error = %e, "index creation failed");
                    IndexOutcome::Failed(e.to_string())
                }
            }
        };

        outcomes.push(IndexReport {
            name: descriptor.name.to_string(),
            description: descriptor.description.to_string(),
            outcome,
        });
    }

    let final_indexes = catalog.list_indexes().await?;

    Ok(ProvisionReport {
        existing_before: existing.len(),
        outcomes,
        final_indexes,
    })
}
