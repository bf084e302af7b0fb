//! `SegmentLoader`: drives a [`Container`] through one load.
//!
//! ## Sequence
//!
//! ```text
//! lock ─► open(source) ─► record_count ─► next_record × N
//!                 │                             │
//!                 │                 field_name × field_count ─► FieldKind
//!                 │                             │
//!                 │        Data ─► decode_normalized   scalars ─► f64
//!                 ▼                             ▼
//!          OpenContainer guard ──── drop ────► close ─► unlock ─► Segment
//! ```
//!
//! The container is a single cursor, so the mutex is held for the whole
//! sequence: concurrent `load` calls on one loader run one after another.
//! `close` runs exactly once per successful `open`, on every exit path.

pub mod field;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::container::{Container, Record};
use crate::decode::{decode_normalized, DegenerateRowPolicy, StatisticsSeed};
use crate::error::{Result, SegmentError};
use crate::segment::Segment;

pub use field::FieldKind;

/// Decoding options applied to every load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct LoaderConfig {
    /// Initial min/max for each channel scan. Default: `Zero`.
    pub statistics_seed: StatisticsSeed,
    /// Handling of channels with `min == max`. Default: `ZeroFill`.
    pub degenerate_rows: DegenerateRowPolicy,
}

/// Loads [`Segment`]s through a container collaborator.
///
/// `SegmentLoader` is `Sync` when `C: Send`; share it behind an `Arc`.
pub struct SegmentLoader<C: Container> {
    container: Mutex<C>,
    config: LoaderConfig,
}

impl<C: Container> SegmentLoader<C> {
    pub fn new(container: C) -> Self {
        Self::with_config(container, LoaderConfig::default())
    }

    pub fn with_config(container: C, config: LoaderConfig) -> Self {
        Self {
            container: Mutex::new(container),
            config,
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Consume the loader and hand back its container.
    pub fn into_inner(self) -> C {
        self.container.into_inner()
    }

    /// Load the segment stored in `source_id`.
    ///
    /// # Errors
    /// - [`SegmentError::ContainerOpen`] if the source cannot be opened.
    /// - [`SegmentError::FieldAccess`] if `data` is absent or a recognised
    ///   field has the wrong class or shape.
    /// - [`SegmentError::DegenerateRow`] / [`SegmentError::NonFiniteSample`]
    ///   from decoding.
    /// - Any read error raised by the container.
    pub fn load(&self, source_id: &str) -> Result<Segment> {
        let mut container = self.container.lock();
        info!(source = source_id, "loading segment");

        let mut open = OpenContainer::acquire(&mut *container, source_id)?;
        let fields = self.read_fields(&mut open)?;
        drop(open);

        let data = fields
            .data
            .ok_or_else(|| SegmentError::field_access(field::DATA, "no record carries it"))?;

        let segment = Segment::new(
            data,
            fields.duration_seconds.unwrap_or(0.0),
            fields.sampling_frequency_hz.unwrap_or(0.0),
            source_id.to_string(),
        );
        info!(
            source = source_id,
            channels = segment.channel_count(),
            samples = segment.sample_count(),
            duration_s = segment.duration_seconds(),
            rate_hz = segment.sampling_frequency_hz(),
            "segment loaded"
        );
        Ok(segment)
    }

    fn read_fields(&self, open: &mut OpenContainer<'_, C>) -> Result<LoadedFields> {
        let mut fields = LoadedFields::default();
        let record_count = open.container.record_count()?;
        debug!(record_count, "enumerating records");

        for _ in 0..record_count {
            let record = open.container.next_record()?;
            self.apply_record(&record, &mut fields)?;
        }
        Ok(fields)
    }

    fn apply_record<R: Record>(&self, record: &R, fields: &mut LoadedFields) -> Result<()> {
        debug!(record = record.name(), field_count = record.field_count(), "reading record");

        for index in 0..record.field_count() {
            let name = record.field_name(index).ok_or_else(|| {
                SegmentError::field_access(
                    format!("#{index}"),
                    format!("record `{}` has no field at this index", record.name()),
                )
            })?;
            let kind = FieldKind::from_name(name);
            debug!(field = name, ?kind, "visiting field");

            match kind {
                FieldKind::Data => {
                    let view = field::matrix(name, field::lookup(record, name)?)?;
                    fields.data = Some(decode_normalized(&view, &self.config)?);
                }
                FieldKind::DurationSeconds => {
                    fields.duration_seconds = Some(field::scalar(name, field::lookup(record, name)?)?);
                }
                FieldKind::SamplingFrequency => {
                    fields.sampling_frequency_hz =
                        Some(field::scalar(name, field::lookup(record, name)?)?);
                }
                FieldKind::Unknown => {}
            }
        }
        Ok(())
    }
}

impl<C: Container> std::fmt::Debug for SegmentLoader<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentLoader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Fields gathered across all records; the last record read wins.
#[derive(Debug, Default)]
struct LoadedFields {
    data: Option<Vec<Vec<f64>>>,
    duration_seconds: Option<f64>,
    sampling_frequency_hz: Option<f64>,
}

/// An opened container; closes it when dropped.
struct OpenContainer<'a, C: Container> {
    container: &'a mut C,
}

impl<'a, C: Container> OpenContainer<'a, C> {
    fn acquire(container: &'a mut C, source_id: &str) -> Result<Self> {
        container.open(source_id).map_err(|e| match e {
            e @ SegmentError::ContainerOpen { .. } => e,
            other => SegmentError::container_open(source_id, other.to_string()),
        })?;
        Ok(Self { container })
    }
}

impl<C: Container> Drop for OpenContainer<'_, C> {
    fn drop(&mut self) {
        self.container.close();
        debug!("container released");
    }
}
