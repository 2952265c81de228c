//! Submission integrity subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming submission:
//!     → duplicate.rs (compare against recent submissions)
//!         → hash.rs (exact content match)
//!         → similarity.rs (field-wise edit similarity)
//!     → metadata.rs (seal with SHA-256 before storage)
//!
//! Stored submission read back:
//!     → metadata.rs (recompute and compare the seal)
//! ```

pub mod duplicate;
pub mod hash;
pub mod metadata;
pub mod record;
pub mod similarity;

pub use duplicate::{detect_duplicate_submission, DuplicateMatch, MatchKind, DEFAULT_SIMILARITY_THRESHOLD};
pub use hash::{generate_data_hash, verify_data_integrity};
pub use metadata::{
    add_integrity_metadata, add_integrity_metadata_at, integrity_metadata, verify_submission_integrity,
    IntegrityError, IntegrityMetadata, IntegrityVerdict, METADATA_VERSION,
};
pub use record::{is_excluded_field, Record, METADATA_FIELD, SYSTEM_FIELDS};
pub use similarity::{calculate_similarity, levenshtein_distance, string_similarity};
