//! Consolidation of many experiments into one properties table and a
//! keyed map of data tables.

use indexmap::IndexMap;
use polars::prelude::DataFrame;
use tracing::{debug, error, info};

use nanolab_model::ExperimentProperties;

use crate::error::Result;
use crate::source::ExperimentSource;
use crate::stack::stack_properties;

/// An experiment left out of a batch, with the reason it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedExperiment {
    pub key: String,
    pub reason: String,
}

/// Output of [`separate`].
#[derive(Debug, Clone)]
pub struct SeparatedDataset {
    /// One row per successfully parsed experiment, in processing order.
    pub properties: DataFrame,
    /// Data table of each successfully parsed experiment.
    pub tables: IndexMap<String, DataFrame>,
    pub skipped: Vec<SkippedExperiment>,
}

impl SeparatedDataset {
    pub fn succeeded(&self) -> usize {
        self.tables.len()
    }

    pub fn total(&self) -> usize {
        self.tables.len() + self.skipped.len()
    }

    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Runs every producer in order and splits the results.
///
/// A failing producer is logged with its key and skipped; it never aborts
/// the batch. Only building the stacked properties table can fail.
pub fn separate<K, S>(experiments: impl IntoIterator<Item = (K, S)>) -> Result<SeparatedDataset>
where
    K: Into<String>,
    S: ExperimentSource,
{
    let mut properties: Vec<ExperimentProperties> = Vec::new();
    let mut tables = IndexMap::new();
    let mut skipped = Vec::new();

    for (key, source) in experiments {
        let key = key.into();
        match source.produce() {
            Ok(result) => {
                debug!(
                    experiment = %key,
                    rows = result.table.height(),
                    "experiment parsed"
                );
                properties.push(result.properties);
                tables.insert(key, result.table);
            }
            Err(err) => {
                error!(
                    experiment = %key,
                    source = %source.describe(),
                    error = %err,
                    "failed to process experiment, skipping"
                );
                skipped.push(SkippedExperiment {
                    key,
                    reason: err.to_string(),
                });
            }
        }
    }

    info!(
        succeeded = tables.len(),
        skipped = skipped.len(),
        "dataset separated"
    );
    Ok(SeparatedDataset {
        properties: stack_properties(&properties)?,
        tables,
        skipped,
    })
}
