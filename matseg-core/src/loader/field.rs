//! Closed dispatch over the record fields the loader understands.

use crate::container::{Field, Record};
use crate::decode::RawMatrixView;
use crate::error::{Result, SegmentError};

pub const DATA: &str = "data";
pub const DURATION_SECONDS: &str = "data_length_sec";
pub const SAMPLING_FREQUENCY: &str = "sampling_frequency";

/// Role of a record field, decided by its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `data`: channels × samples matrix.
    Data,
    /// `data_length_sec`: scalar.
    DurationSeconds,
    /// `sampling_frequency`: scalar.
    SamplingFrequency,
    /// Anything else; skipped.
    Unknown,
}

impl FieldKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            DATA => FieldKind::Data,
            DURATION_SECONDS => FieldKind::DurationSeconds,
            SAMPLING_FREQUENCY => FieldKind::SamplingFrequency,
            _ => FieldKind::Unknown,
        }
    }
}

/// Look up `name` on `record`; absence is a field access error.
pub(crate) fn lookup<'r, R: Record>(record: &'r R, name: &str) -> Result<Field<'r>> {
    record.field_by_name(name).ok_or_else(|| {
        SegmentError::field_access(
            name,
            format!("listed on record `{}` but has no value", record.name()),
        )
    })
}

/// Interpret `field` as a dense double matrix.
pub(crate) fn matrix<'a>(name: &str, field: Field<'a>) -> Result<RawMatrixView<'a>> {
    match field {
        Field::Double { rows, cols, values } => RawMatrixView::new(values, rows, cols)
            .ok_or_else(|| {
                SegmentError::field_access(
                    name,
                    format!(
                        "{rows}x{cols} matrix carries {} values",
                        values.len()
                    ),
                )
            }),
        other => Err(SegmentError::field_access(
            name,
            format!("expected a double matrix, found {}", other.describe()),
        )),
    }
}

/// Interpret `field` as exactly one double.
pub(crate) fn scalar(name: &str, field: Field<'_>) -> Result<f64> {
    match field {
        Field::Double { values: [value], .. } => Ok(*value),
        other => Err(SegmentError::field_access(
            name,
            format!("expected a scalar double, found {}", other.describe()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_by_name() {
        assert_eq!(FieldKind::from_name("data"), FieldKind::Data);
        assert_eq!(FieldKind::from_name("data_length_sec"), FieldKind::DurationSeconds);
        assert_eq!(FieldKind::from_name("sampling_frequency"), FieldKind::SamplingFrequency);
        assert_eq!(FieldKind::from_name("channels"), FieldKind::Unknown);
        assert_eq!(FieldKind::from_name("Data"), FieldKind::Unknown);
    }

    #[test]
    fn scalar_requires_one_value() {
        let one = Field::Double {
            rows: 1,
            cols: 1,
            values: &[400.0],
        };
        assert_eq!(scalar("sampling_frequency", one).unwrap(), 400.0);

        let two = Field::Double {
            rows: 1,
            cols: 2,
            values: &[1.0, 2.0],
        };
        assert!(matches!(
            scalar("sampling_frequency", two),
            Err(SegmentError::FieldAccess { .. })
        ));

        let text = Field::Unsupported { class: "char" };
        let err = scalar("data_length_sec", text).unwrap_err();
        assert!(err.to_string().contains("char array"), "{err}");
    }

    #[test]
    fn matrix_checks_length() {
        let short = Field::Double {
            rows: 2,
            cols: 2,
            values: &[1.0, 2.0, 3.0],
        };
        let err = matrix("data", short).unwrap_err();
        assert!(err.to_string().contains("2x2 matrix carries 3 values"), "{err}");

        let ok = Field::Double {
            rows: 2,
            cols: 1,
            values: &[1.0, 2.0],
        };
        let view = matrix("data", ok).unwrap();
        assert_eq!((view.rows(), view.cols()), (2, 1));
    }
}
