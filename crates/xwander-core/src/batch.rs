//! Batch Chunker
//!
//! Splits large create/update/delete sets into vendor-sized chunks, runs a
//! caller-supplied operation per chunk and aggregates the per-item results.
//!
//! Partial failure is an expected outcome: a chunk whose operation fails is
//! recorded item by item and the run moves on to the next chunk. Only an
//! invalid chunk size is reported as an error, before anything is dispatched.

use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::common::{AppResult, XwanderError};
use crate::config::BatchConfig;

/// Airtable accepts at most 10 records per create/update/delete request
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Lazy, order-preserving chunks of `items`
///
/// Every chunk has `max_size` items except possibly the last.
pub fn chunk<T>(items: &[T], max_size: usize) -> AppResult<std::slice::Chunks<'_, T>> {
    if max_size < 1 {
        return Err(XwanderError::InvalidChunkSize(max_size));
    }
    Ok(items.chunks(max_size))
}

/// What a successful item did to its record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordChange {
    #[default]
    Unspecified,
    Created,
    Updated,
    Deleted,
}

/// Result for one item, as reported by the vendor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub id: Option<String>,
    pub ok: bool,
    pub error: Option<String>,
    #[serde(default)]
    pub change: RecordChange,
}

impl ItemOutcome {
    pub fn success(id: Option<String>) -> Self {
        Self {
            id,
            ok: true,
            error: None,
            change: RecordChange::Unspecified,
        }
    }

    pub fn failure(id: Option<String>, error: impl Into<String>) -> Self {
        Self {
            id,
            ok: false,
            error: Some(error.into()),
            change: RecordChange::Unspecified,
        }
    }

    pub fn created(id: impl Into<String>) -> Self {
        Self::success(Some(id.into())).with_change(RecordChange::Created)
    }

    pub fn updated(id: impl Into<String>) -> Self {
        Self::success(Some(id.into())).with_change(RecordChange::Updated)
    }

    pub fn deleted(id: impl Into<String>) -> Self {
        Self::success(Some(id.into())).with_change(RecordChange::Deleted)
    }

    pub fn with_change(mut self, change: RecordChange) -> Self {
        self.change = change;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchError {
    pub chunk_index: usize,
    /// Position within the chunk
    pub item_index: Option<usize>,
    pub record_id: Option<String>,
    pub message: String,
}

fn serialize_secs<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}

/// Aggregate of a batched run
///
/// `succeeded_count + failed_count == total_count` always holds. Every id
/// in `succeeded_ids` is also in at most one of the created, updated or
/// deleted lists, depending on the item's [`RecordChange`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub succeeded_count: usize,
    pub failed_count: usize,
    pub total_count: usize,
    pub errors: Vec<BatchError>,
    pub succeeded_ids: Vec<String>,
    pub created_ids: Vec<String>,
    pub updated_ids: Vec<String>,
    pub deleted_ids: Vec<String>,
    #[serde(rename = "duration_seconds", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

impl BatchOutcome {
    /// Percentage of items that succeeded; 100 for an empty run
    pub fn success_rate(&self) -> f64 {
        if self.total_count == 0 {
            return 100.0;
        }
        self.succeeded_count as f64 / self.total_count as f64 * 100.0
    }

    fn record_success(&mut self, id: Option<String>, change: RecordChange) {
        self.succeeded_count += 1;
        let Some(id) = id else {
            return;
        };
        match change {
            RecordChange::Created => self.created_ids.push(id.clone()),
            RecordChange::Updated => self.updated_ids.push(id.clone()),
            RecordChange::Deleted => self.deleted_ids.push(id.clone()),
            RecordChange::Unspecified => {}
        }
        self.succeeded_ids.push(id);
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed_count == 0
    }

    /// `PartialFailure` when any item failed
    pub fn ensure_success(&self) -> AppResult<()> {
        if self.is_complete_success() {
            return Ok(());
        }
        Err(XwanderError::PartialFailure {
            failed: self.failed_count,
            total: self.total_count,
        })
    }
}

impl std::fmt::Display for BatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BatchOutcome(success={}/{}, errors={})",
            self.succeeded_count, self.total_count, self.failed_count
        )
    }
}

type ProgressFn<'a> = Box<dyn FnMut(usize, usize) + 'a>;
type IdFn<'a, T> = Box<dyn Fn(&T) -> Option<String> + 'a>;

/// Sequential chunked executor
///
/// ```ignore
/// let outcome = BatchRunner::new(10)?
///     .with_delay(Duration::from_millis(200))
///     .on_progress(|done, total| debug!("{}/{}", done, total))
///     .run(&records, |chunk| client.create(chunk));
/// ```
pub struct BatchRunner<'a, T> {
    max_size: usize,
    delay: Duration,
    progress: Option<ProgressFn<'a>>,
    id_of: Option<IdFn<'a, T>>,
}

impl<'a, T> BatchRunner<'a, T> {
    pub fn new(max_size: usize) -> AppResult<Self> {
        if max_size < 1 {
            return Err(XwanderError::InvalidChunkSize(max_size));
        }
        Ok(Self {
            max_size,
            delay: Duration::ZERO,
            progress: None,
            id_of: None,
        })
    }

    pub fn from_config(config: &BatchConfig) -> AppResult<Self> {
        Ok(Self::new(config.max_chunk_size)?
            .with_delay(Duration::from_millis(config.delay_between_chunks_ms)))
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Fixed pause between chunks, never after the last one
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Called after every chunk with `(processed_so_far, total)`
    pub fn on_progress<F>(mut self, progress: F) -> Self
    where
        F: FnMut(usize, usize) + 'a,
    {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Record id of an input item, used to label failures
    pub fn with_id<F>(mut self, id_of: F) -> Self
    where
        F: Fn(&T) -> Option<String> + 'a,
    {
        self.id_of = Some(Box::new(id_of));
        self
    }

    fn item_id(&self, item: &T) -> Option<String> {
        self.id_of.as_ref().and_then(|id_of| id_of(item))
    }

    /// Process every chunk in order, blocking between chunks if a delay is set
    pub fn run<F, E>(&mut self, items: &[T], mut operation: F) -> BatchOutcome
    where
        F: FnMut(&[T]) -> Result<Vec<ItemOutcome>, E>,
        E: Display,
    {
        let total = items.len();
        let chunk_count = total.div_ceil(self.max_size);
        let mut outcome = BatchOutcome::default();
        let mut processed = 0;
        let started = Instant::now();

        info!("Running {} items in {} chunks of up to {}", total, chunk_count, self.max_size);

        for (index, chunk) in items.chunks(self.max_size).enumerate() {
            let result = operation(chunk);
            self.record_chunk(&mut outcome, index, chunk, result);
            processed += chunk.len();
            self.report_progress(processed, total);

            if !self.delay.is_zero() && index + 1 < chunk_count {
                std::thread::sleep(self.delay);
            }
        }

        self.finish(outcome, started)
    }

    /// Async variant of [`run`](Self::run); the delay yields to the runtime
    pub async fn run_async<'i, F, Fut, E>(&mut self, items: &'i [T], mut operation: F) -> BatchOutcome
    where
        F: FnMut(&'i [T]) -> Fut,
        Fut: Future<Output = Result<Vec<ItemOutcome>, E>>,
        E: Display,
    {
        let total = items.len();
        let chunk_count = total.div_ceil(self.max_size);
        let mut outcome = BatchOutcome::default();
        let mut processed = 0;
        let started = Instant::now();

        info!("Running {} items in {} chunks of up to {}", total, chunk_count, self.max_size);

        for (index, chunk) in items.chunks(self.max_size).enumerate() {
            let result = operation(chunk).await;
            self.record_chunk(&mut outcome, index, chunk, result);
            processed += chunk.len();
            self.report_progress(processed, total);

            if !self.delay.is_zero() && index + 1 < chunk_count {
                tokio::time::sleep(self.delay).await;
            }
        }

        self.finish(outcome, started)
    }

    fn report_progress(&mut self, processed: usize, total: usize) {
        if let Some(progress) = self.progress.as_mut() {
            progress(processed, total);
        }
    }

    fn finish(&self, mut outcome: BatchOutcome, started: Instant) -> BatchOutcome {
        outcome.elapsed = started.elapsed();
        info!(
            "Batch finished: {}/{} succeeded in {:?}",
            outcome.succeeded_count, outcome.total_count, outcome.elapsed
        );
        outcome
    }

    fn record_chunk<E: Display>(
        &self,
        outcome: &mut BatchOutcome,
        chunk_index: usize,
        chunk: &[T],
        result: Result<Vec<ItemOutcome>, E>,
    ) {
        outcome.total_count += chunk.len();

        let items = match result {
            Ok(items) => items,
            Err(e) => {
                let message = e.to_string();
                warn!("Chunk {} failed: {}", chunk_index, message);
                for (item_index, item) in chunk.iter().enumerate() {
                    self.record_failure(outcome, chunk_index, item_index, self.item_id(item), message.clone());
                }
                return;
            }
        };

        if items.len() > chunk.len() {
            warn!(
                "Chunk {} returned {} results for {} items; ignoring the extras",
                chunk_index,
                items.len(),
                chunk.len()
            );
        }

        let reported = items.len().min(chunk.len());
        for (item_index, item) in items.into_iter().take(chunk.len()).enumerate() {
            let id = item.id.or_else(|| self.item_id(&chunk[item_index]));
            if item.ok {
                outcome.record_success(id, item.change);
            } else {
                let message = item.error.unwrap_or_else(|| "operation reported failure".to_string());
                self.record_failure(outcome, chunk_index, item_index, id, message);
            }
        }

        for (item_index, item) in chunk.iter().enumerate().skip(reported) {
            self.record_failure(
                outcome,
                chunk_index,
                item_index,
                self.item_id(item),
                "no result returned for item".to_string(),
            );
        }

        debug!("Chunk {} recorded ({} items)", chunk_index, chunk.len());
    }

    fn record_failure(
        &self,
        outcome: &mut BatchOutcome,
        chunk_index: usize,
        item_index: usize,
        record_id: Option<String>,
        message: String,
    ) {
        outcome.failed_count += 1;
        outcome.errors.push(BatchError {
            chunk_index,
            item_index: Some(item_index),
            record_id,
            message,
        });
    }
}

/// One-shot form of [`BatchRunner::run`]
pub fn run_batched<T, F, E>(
    items: &[T],
    max_size: usize,
    operation: F,
    on_progress: Option<&mut dyn FnMut(usize, usize)>,
    delay_between_chunks: Duration,
) -> AppResult<BatchOutcome>
where
    F: FnMut(&[T]) -> Result<Vec<ItemOutcome>, E>,
    E: Display,
{
    let mut runner = BatchRunner::new(max_size)?.with_delay(delay_between_chunks);
    if let Some(progress) = on_progress {
        runner = runner.on_progress(progress);
    }
    Ok(runner.run(items, operation))
}

/// Body for a batch create: `{"records": [{"fields": ...}], "typecast": true?}`
pub fn create_payload(records: &[Map<String, Value>], typecast: bool) -> Value {
    let records: Vec<Value> = records.iter().map(|fields| json!({ "fields": fields })).collect();
    with_typecast(json!({ "records": records }), typecast)
}

/// Body for a batch update; each entry is `{"id": ..., "fields": {...}}`
pub fn update_payload(updates: &[Value], typecast: bool) -> Value {
    with_typecast(json!({ "records": updates }), typecast)
}

/// Body for a batch upsert keyed on `merge_on`
pub fn upsert_payload(records: &[Map<String, Value>], merge_on: &[&str], typecast: bool) -> Value {
    let records: Vec<Value> = records.iter().map(|fields| json!({ "fields": fields })).collect();
    with_typecast(
        json!({
            "performUpsert": { "fieldsToMergeOn": merge_on },
            "records": records,
        }),
        typecast,
    )
}

fn with_typecast(mut payload: Value, typecast: bool) -> Value {
    if typecast {
        payload["typecast"] = Value::Bool(true);
    }
    payload
}

/// Query string for a batch delete: `records[]=a&records[]=b`
pub fn delete_query<S: AsRef<str>>(record_ids: &[S]) -> String {
    record_ids
        .iter()
        .map(|id| format!("records[]={}", urlencoding::encode(id.as_ref())))
        .collect::<Vec<_>>()
        .join("&")
}

/// Per-item outcomes from a `{"records": [...]}` response
///
/// `change` labels records the response itself does not classify. A
/// `"deleted"` flag marks a delete (`false` counts as a failure), and an
/// upsert's `createdRecords` id list splits created from updated records.
pub fn outcomes_from_records(response: &Value, change: RecordChange) -> Vec<ItemOutcome> {
    let Some(records) = response.get("records").and_then(Value::as_array) else {
        return Vec::new();
    };
    let created: Option<Vec<&str>> = response
        .get("createdRecords")
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(Value::as_str).collect());

    records
        .iter()
        .map(|record| {
            let id = record.get("id").and_then(Value::as_str).map(str::to_string);
            match (record.get("deleted").and_then(Value::as_bool), &created) {
                (Some(false), _) => ItemOutcome::failure(id, "record was not deleted"),
                (Some(true), _) => ItemOutcome::success(id).with_change(RecordChange::Deleted),
                (None, Some(created)) => {
                    let was_created = id.as_deref().is_some_and(|id| created.contains(&id));
                    let change = if was_created {
                        RecordChange::Created
                    } else {
                        RecordChange::Updated
                    };
                    ItemOutcome::success(id).with_change(change)
                }
                (None, None) => ItemOutcome::success(id).with_change(change),
            }
        })
        .collect()
}
