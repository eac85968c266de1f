//! The bulk generation pipeline.
//!
//! Rows are processed in fixed-size batches. Within a batch every row is
//! settled concurrently and independently: a bad row records a failure,
//! its siblings keep going. Batches run strictly one after another —
//! batch N+1 starts only after batch N has fully settled — which bounds
//! in-flight memory to one batch's worth of documents, and the pipeline
//! yields between batches so a long run cannot monopolize the runtime.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use certforge::{
    Record, RenderEngine, StorageGateway, Template, bucket, inject_system_values,
};

use crate::archive::{ArchiveEntry, ArchiveRef, Archiver};
use crate::error::Result;
use crate::source::parse_csv;

/// Pipeline tuning knobs
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Rows settled concurrently before the pipeline advances
    pub batch_size: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self { batch_size: 25 }
    }
}

/// One failed row. `row` is the 1-indexed physical row in the source
/// file, so the first data row is row 2 (the header is row 1).
#[derive(Debug, Clone, Serialize)]
pub struct RowFailure {
    pub row: usize,
    pub message: String,
}

/// Aggregate outcome of a bulk run
#[derive(Debug, Serialize)]
pub struct BatchResult {
    pub total_requested: usize,
    pub success_count: usize,
    pub failure_count: usize,
    /// Failures in ascending row order, regardless of completion order
    pub failures: Vec<RowFailure>,
    /// The bundled archive; `None` when no row succeeded
    pub archive: Option<ArchiveRef>,
}

/// Turns a tabular source plus a column mapping into many rendered
/// certificates and one archive.
pub struct BatchPipeline {
    storage: Arc<dyn StorageGateway>,
    engine: RenderEngine,
    options: BatchOptions,
}

impl BatchPipeline {
    pub fn new(storage: Arc<dyn StorageGateway>) -> Self {
        let engine = RenderEngine::new(storage.clone());
        Self {
            storage,
            engine,
            options: BatchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: BatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Run a bulk generation from raw CSV bytes. `column_mapping` maps
    /// CSV column names to attribute ids. Source parsing and base
    /// document fetching are fatal; everything after is per-row.
    pub async fn process(
        &self,
        template: &Template,
        source: &[u8],
        column_mapping: &HashMap<String, String>,
    ) -> Result<BatchResult> {
        let parsed = parse_csv(source)?;
        let base = self
            .storage
            .get(bucket::TEMPLATES, &template.source_file)
            .await?;
        self.process_rows(template, &base, parsed.rows, column_mapping)
            .await
    }

    /// Run a bulk generation from already-parsed row maps
    pub async fn process_rows(
        &self,
        template: &Template,
        base: &[u8],
        rows: Vec<BTreeMap<String, String>>,
        column_mapping: &HashMap<String, String>,
    ) -> Result<BatchResult> {
        let total_requested = rows.len();
        let batch_size = self.options.batch_size.max(1);
        info!(
            template = %template.id.as_ref(),
            rows = total_requested,
            batch_size,
            "starting bulk generation"
        );

        let mut successes: Vec<(usize, String)> = Vec::new();
        let mut failures: Vec<RowFailure> = Vec::new();

        for (batch_index, batch) in rows.chunks(batch_size).enumerate() {
            let tasks = batch.iter().enumerate().map(|(offset, row)| {
                // header is physical row 1, data row i is physical row i + 2
                let row_number = batch_index * batch_size + offset + 2;
                self.process_row(template, base, row, column_mapping, row_number)
            });

            for settled in futures::future::join_all(tasks).await {
                match settled {
                    Ok(success) => successes.push(success),
                    Err(failure) => failures.push(failure),
                }
            }
            debug!(
                batch = batch_index + 1,
                settled = batch.len(),
                "batch settled"
            );

            // fairness: let other work run before the next batch starts
            tokio::task::yield_now().await;
        }

        // completion order within a batch is arbitrary; results are not
        successes.sort_unstable_by_key(|(row, _)| *row);
        failures.sort_unstable_by_key(|failure| failure.row);

        let archive = if successes.is_empty() {
            None
        } else {
            let entries: Vec<ArchiveEntry> = successes
                .iter()
                .map(|(_, name)| ArchiveEntry {
                    name: name.clone(),
                    bucket: bucket::DOCUMENTS.to_string(),
                    source: name.clone(),
                })
                .collect();
            let destination = format!("bulk-{}.zip", Uuid::new_v4());
            let archiver = Archiver::new(self.storage.clone());
            Some(archiver.archive(&entries, &destination).await?)
        };

        info!(
            total = total_requested,
            succeeded = successes.len(),
            failed = failures.len(),
            "bulk generation finished"
        );

        Ok(BatchResult {
            total_requested,
            success_count: successes.len(),
            failure_count: failures.len(),
            failures,
            archive,
        })
    }

    /// Settle one row: map columns to attribute ids, validate, render,
    /// persist. Every failure is captured as a `RowFailure`, never
    /// propagated out of the batch.
    async fn process_row(
        &self,
        template: &Template,
        base: &[u8],
        row: &BTreeMap<String, String>,
        column_mapping: &HashMap<String, String>,
        row_number: usize,
    ) -> std::result::Result<(usize, String), RowFailure> {
        let mut record = Record::new();
        for (column, attribute_id) in column_mapping {
            if let Some(value) = row.get(column) {
                if !value.trim().is_empty() {
                    record.insert(attribute_id.clone(), value.clone());
                }
            }
        }

        let certificate_id = Uuid::new_v4().to_string();
        inject_system_values(&mut record, &certificate_id);

        template.validate_record(&record).map_err(|e| RowFailure {
            row: row_number,
            message: e.to_string(),
        })?;

        let bytes = self
            .engine
            .render_document(template, base, &record)
            .await
            .map_err(|e| RowFailure {
                row: row_number,
                message: e.to_string(),
            })?;

        let name = format!("{certificate_id}.pdf");
        self.storage
            .save(bucket::DOCUMENTS, &name, bytes)
            .await
            .map_err(|e| RowFailure {
                row: row_number,
                message: e.to_string(),
            })?;

        Ok((row_number, name))
    }
}
