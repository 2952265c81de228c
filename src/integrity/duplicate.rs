//! Near-duplicate submission detection.
//!
//! Existing submissions are scanned in order and the first one that matches
//! wins, even if a later one would score higher. A match is either an
//! identical hash of the whole record or a similarity score at or above the
//! threshold. Records with no comparable content fields only ever match by
//! hash.

use serde::Serialize;

use super::hash::generate_data_hash;
use super::record::Record;
use super::similarity::calculate_similarity;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.9;

/// How a duplicate was recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Identical record, field for field.
    Hash,
    /// Field-wise similarity at or above the threshold.
    Similarity,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hash => "hash",
            Self::Similarity => "similarity",
        }
    }
}

/// The existing submission a new one duplicates.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateMatch<'a> {
    /// Position in the slice that was searched.
    pub index: usize,
    pub record: &'a Record,
    pub similarity: f64,
    pub matched_by: MatchKind,
}

/// Find the first submission in `existing` that `submission` duplicates.
pub fn detect_duplicate_submission<'a>(
    submission: &Record,
    existing: &'a [Record],
    similarity_threshold: f64,
) -> Option<DuplicateMatch<'a>> {
    let fingerprint = generate_data_hash(submission);

    for (index, candidate) in existing.iter().enumerate() {
        if generate_data_hash(candidate) == fingerprint {
            tracing::debug!(index, "Duplicate submission: identical record");
            return Some(DuplicateMatch {
                index,
                record: candidate,
                similarity: 1.0,
                matched_by: MatchKind::Hash,
            });
        }

        let similarity = calculate_similarity(submission, candidate);
        if similarity >= similarity_threshold {
            tracing::debug!(index, similarity, "Duplicate submission: similar content");
            return Some(DuplicateMatch {
                index,
                record: candidate,
                similarity,
                matched_by: MatchKind::Similarity,
            });
        }
    }

    None
}
