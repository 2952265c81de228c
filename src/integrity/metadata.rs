//! Tamper evidence for stored submissions.
//!
//! [`add_integrity_metadata`] seals a submission by hashing every field
//! except [`METADATA_FIELD`] and storing the digest under that field.
//! [`verify_submission_integrity`] recomputes the digest later. Failures are
//! returned as an [`IntegrityVerdict`] so the caller can quarantine the record
//! instead of failing the request.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use super::hash::generate_data_hash;
use super::record::{Record, METADATA_FIELD};

/// Schema tag written into every seal.
pub const METADATA_VERSION: &str = "1.0";

/// The `_integrity` side-channel value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityMetadata {
    pub hash: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("no integrity metadata found")]
    MissingMetadata,

    #[error("integrity metadata is malformed: {0}")]
    MalformedMetadata(String),

    #[error("data integrity check failed: hash mismatch")]
    HashMismatch { expected: String, actual: String },
}

impl IntegrityError {
    /// Short label for metrics and API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingMetadata => "missing_metadata",
            Self::MalformedMetadata(_) => "malformed_metadata",
            Self::HashMismatch { .. } => "hash_mismatch",
        }
    }
}

/// Result of [`verify_submission_integrity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityVerdict {
    pub valid: bool,
    pub error: Option<IntegrityError>,
}

impl IntegrityVerdict {
    fn valid() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    fn invalid(error: IntegrityError) -> Self {
        Self {
            valid: false,
            error: Some(error),
        }
    }
}

/// Seal `submission` with the current time.
pub fn add_integrity_metadata(submission: &Record) -> Record {
    add_integrity_metadata_at(submission, Utc::now())
}

/// Seal `submission`, stamping it with `timestamp`.
///
/// Any existing metadata is ignored for hashing and replaced.
pub fn add_integrity_metadata_at(submission: &Record, timestamp: DateTime<Utc>) -> Record {
    let mut sealed = submission.without_metadata();
    let hash = generate_data_hash(&sealed);
    sealed.insert(
        METADATA_FIELD,
        json!({
            "hash": hash,
            "timestamp": timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            "version": METADATA_VERSION,
        }),
    );
    sealed
}

/// Read the metadata attached to `submission`, if any.
pub fn integrity_metadata(submission: &Record) -> Result<IntegrityMetadata, IntegrityError> {
    let raw = submission
        .get(METADATA_FIELD)
        .ok_or(IntegrityError::MissingMetadata)?;
    serde_json::from_value(raw.clone()).map_err(|e| IntegrityError::MalformedMetadata(e.to_string()))
}

/// Check a sealed submission against its stored digest.
pub fn verify_submission_integrity(submission: &Record) -> IntegrityVerdict {
    let metadata = match integrity_metadata(submission) {
        Ok(metadata) => metadata,
        Err(error) => {
            tracing::warn!(error = %error, "Submission integrity metadata unusable");
            return IntegrityVerdict::invalid(error);
        }
    };

    let actual = generate_data_hash(&submission.without_metadata());
    if actual != metadata.hash {
        tracing::warn!(
            expected = %metadata.hash,
            actual = %actual,
            "Submission integrity hash mismatch"
        );
        return IntegrityVerdict::invalid(IntegrityError::HashMismatch {
            expected: metadata.hash,
            actual,
        });
    }

    IntegrityVerdict::valid()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::Value;

    fn submission() -> Record {
        Record::try_from(json!({
            "id": "sub-1",
            "clinic": "North",
            "rating": 4,
            "comments": "Friendly staff"
        }))
        .unwrap()
    }

    #[test]
    fn test_seal_preserves_fields_and_adds_metadata() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let original = submission();
        let sealed = add_integrity_metadata_at(&original, at);

        assert_eq!(sealed.without_metadata(), original);
        let metadata = integrity_metadata(&sealed).unwrap();
        assert_eq!(metadata.hash, generate_data_hash(&original));
        assert_eq!(metadata.version, METADATA_VERSION);
        assert_eq!(metadata.timestamp, at);
        assert_eq!(
            sealed.get(METADATA_FIELD).and_then(|m| m.get("timestamp")),
            Some(&Value::from("2024-05-01T12:00:00.000Z"))
        );
    }

    #[test]
    fn test_resealing_replaces_metadata() {
        let once = add_integrity_metadata(&submission());
        let twice = add_integrity_metadata(&once);
        assert_eq!(
            integrity_metadata(&once).unwrap().hash,
            integrity_metadata(&twice).unwrap().hash
        );
    }

    #[test]
    fn test_verify_round_trip() {
        let sealed = add_integrity_metadata(&submission());
        assert_eq!(verify_submission_integrity(&sealed), IntegrityVerdict::valid());
    }

    #[test]
    fn test_missing_metadata_is_reported() {
        let verdict = verify_submission_integrity(&submission());
        assert!(!verdict.valid);
        assert_eq!(verdict.error, Some(IntegrityError::MissingMetadata));
    }

    #[test]
    fn test_malformed_metadata_is_reported() {
        let mut record = submission();
        record.insert(METADATA_FIELD, "not an object");
        let verdict = verify_submission_integrity(&record);
        assert!(matches!(verdict.error, Some(IntegrityError::MalformedMetadata(_))));
    }

    #[test]
    fn test_tampering_is_detected() {
        let mut sealed = add_integrity_metadata(&submission());
        sealed.insert("rating", 1);

        let verdict = verify_submission_integrity(&sealed);
        assert!(!verdict.valid);
        match verdict.error {
            Some(IntegrityError::HashMismatch { expected, actual }) => assert_ne!(expected, actual),
            other => panic!("expected hash mismatch, got {other:?}"),
        }
    }
}
