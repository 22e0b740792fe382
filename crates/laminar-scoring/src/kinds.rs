//! Type compatibility between caller-declared and model-declared kinds.
//!
//! Also maps model [`DataKind`]s to and from the Arrow [`DataType`] tags the
//! host uses in its record schemas:
//!
//! | `DataKind` | Arrow tag            |
//! |------------|----------------------|
//! | STRING     | `Utf8`               |
//! | INTEGER    | `Int32` (`Int64` parses to INTEGER too) |
//! | FLOAT      | `Float32`            |
//! | DOUBLE     | `Float64`            |
//! | BOOLEAN    | `Boolean`            |

use arrow_schema::DataType;

use crate::error::{ScoringError, ScoringResult};
use crate::types::DataKind;

/// Caller kinds accepted for an expected kind beyond exact matches and text.
fn widenable_from(expected: DataKind) -> &'static [DataKind] {
    match expected {
        DataKind::Integer => &[DataKind::Boolean],
        DataKind::Float => &[DataKind::Integer, DataKind::Double, DataKind::Boolean],
        DataKind::Double => &[DataKind::Integer, DataKind::Float, DataKind::Boolean],
        _ => &[],
    }
}

/// Returns `true` if a caller column of kind `actual` may feed a model
/// field of kind `expected`.
///
/// Text is accepted for every expected kind; whether a particular value
/// parses is only known when the record is evaluated.
#[must_use]
pub fn is_compatible(expected: DataKind, actual: DataKind) -> bool {
    if expected == actual {
        return true;
    }
    if actual == DataKind::String {
        return true;
    }
    widenable_from(expected).contains(&actual)
}

/// Maps a model kind to the host's external type tag.
///
/// # Errors
///
/// Returns [`ScoringError::UnsupportedKind`] for kinds outside STRING,
/// INTEGER, FLOAT, DOUBLE and BOOLEAN.
pub fn format_kind(kind: DataKind) -> ScoringResult<DataType> {
    match kind {
        DataKind::String => Ok(DataType::Utf8),
        DataKind::Integer => Ok(DataType::Int32),
        DataKind::Float => Ok(DataType::Float32),
        DataKind::Double => Ok(DataType::Float64),
        DataKind::Boolean => Ok(DataType::Boolean),
        other => Err(ScoringError::UnsupportedKind(other)),
    }
}

/// Maps a host type tag to a model kind.
///
/// `Int64` maps to INTEGER as well, so this is not the exact inverse of
/// [`format_kind`].
///
/// # Errors
///
/// Returns [`ScoringError::UnsupportedExternalType`] for any other tag.
pub fn parse_kind(data_type: &DataType) -> ScoringResult<DataKind> {
    match data_type {
        DataType::Utf8 => Ok(DataKind::String),
        DataType::Int32 | DataType::Int64 => Ok(DataKind::Integer),
        DataType::Float32 => Ok(DataKind::Float),
        DataType::Float64 => Ok(DataKind::Double),
        DataType::Boolean => Ok(DataKind::Boolean),
        other => Err(ScoringError::UnsupportedExternalType(other.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORMATTABLE: [DataKind; 5] = [
        DataKind::String,
        DataKind::Integer,
        DataKind::Float,
        DataKind::Double,
        DataKind::Boolean,
    ];

    // ── is_compatible ──────────────────────────────────────────

    #[test]
    fn test_identity_is_compatible() {
        for kind in DataKind::ALL {
            assert!(is_compatible(kind, kind), "{kind} should accept itself");
        }
    }

    #[test]
    fn test_string_satisfies_everything() {
        for expected in DataKind::ALL {
            assert!(is_compatible(expected, DataKind::String));
        }
    }

    #[test]
    fn test_integer_rules() {
        assert!(is_compatible(DataKind::Integer, DataKind::String));
        assert!(is_compatible(DataKind::Integer, DataKind::Integer));
        assert!(!is_compatible(DataKind::Integer, DataKind::Float));
        assert!(!is_compatible(DataKind::Integer, DataKind::Double));
        assert!(is_compatible(DataKind::Integer, DataKind::Boolean));
    }

    #[test]
    fn test_floating_point_rules() {
        for actual in [DataKind::Integer, DataKind::Double, DataKind::Boolean] {
            assert!(is_compatible(DataKind::Float, actual));
        }
        for actual in [DataKind::Integer, DataKind::Float, DataKind::Boolean] {
            assert!(is_compatible(DataKind::Double, actual));
        }
        assert!(!is_compatible(DataKind::Double, DataKind::Date));
    }

    #[test]
    fn test_no_widening_into_string_or_boolean() {
        assert!(!is_compatible(DataKind::String, DataKind::Integer));
        assert!(!is_compatible(DataKind::Boolean, DataKind::Integer));
        assert!(!is_compatible(DataKind::Boolean, DataKind::Double));
        assert!(!is_compatible(DataKind::Date, DataKind::DateTime));
    }

    // ── format_kind / parse_kind ───────────────────────────────

    #[test]
    fn test_format_kind() {
        assert_eq!(format_kind(DataKind::Integer).unwrap(), DataType::Int32);
        assert_eq!(format_kind(DataKind::String).unwrap(), DataType::Utf8);
    }

    #[test]
    fn test_format_then_parse() {
        for kind in FORMATTABLE {
            let tag = format_kind(kind).unwrap();
            assert_eq!(parse_kind(&tag).unwrap(), kind);
        }
    }

    #[test]
    fn test_wide_integer_is_many_to_one() {
        let kind = parse_kind(&DataType::Int64).unwrap();
        assert_eq!(kind, DataKind::Integer);
        assert_ne!(format_kind(kind).unwrap(), DataType::Int64);
    }

    #[test]
    fn test_parse_unsupported_tag() {
        let err = parse_kind(&DataType::Decimal128(38, 0)).unwrap_err();
        assert!(matches!(err, ScoringError::UnsupportedExternalType(_)));
        assert!(parse_kind(&DataType::LargeUtf8).is_err());
    }

    #[test]
    fn test_format_unsupported_kind() {
        let err = format_kind(DataKind::DateTime).unwrap_err();
        assert!(matches!(err, ScoringError::UnsupportedKind(DataKind::DateTime)));
        assert!(format_kind(DataKind::Date).is_err());
    }
}
