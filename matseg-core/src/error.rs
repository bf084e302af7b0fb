use thiserror::Error;

/// All errors produced by matseg-core.
#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("cannot open container `{source_id}`: {reason}")]
    ContainerOpen { source_id: String, reason: String },

    #[error("container read error: {0}")]
    ContainerRead(String),

    #[error("field `{field}`: {reason}")]
    FieldAccess { field: String, reason: String },

    #[error("channel {row} is constant ({value}); min == max leaves nothing to normalise against")]
    DegenerateRow { row: usize, value: f64 },

    #[error("non-finite sample at channel {row}, sample {col}")]
    NonFiniteSample { row: usize, col: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SegmentError {
    pub(crate) fn field_access(field: impl Into<String>, reason: impl Into<String>) -> Self {
        SegmentError::FieldAccess {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn container_open(source_id: impl Into<String>, reason: impl Into<String>) -> Self {
        SegmentError::ContainerOpen {
            source_id: source_id.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SegmentError>;
