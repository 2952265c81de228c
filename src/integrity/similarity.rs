//! Field-wise similarity between two submissions.
//!
//! Only fields present in both records are compared; system fields and
//! `_`-prefixed metadata are skipped. An equal value scores 1. Two different
//! strings score their normalized edit similarity when it is above
//! [`FIELD_SIMILARITY_FLOOR`], else 0. The record score is the mean over
//! compared fields.

use std::collections::BTreeSet;

use serde_json::Value;

use super::record::{is_excluded_field, Record};

/// Per-field similarity must be strictly greater than this to count.
pub const FIELD_SIMILARITY_FLOOR: f64 = 0.8;

/// Edit distance between `a` and `b`, counted in UTF-16 code units.
///
/// Case- and whitespace-sensitive.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<u16> = a.encode_utf16().collect();
    let b: Vec<u16> = b.encode_utf16().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Two rolling rows of the classic DP matrix.
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            let insertion = curr[j] + 1;
            let deletion = prev[j + 1] + 1;
            curr[j + 1] = substitution.min(insertion).min(deletion);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// `1 - distance / longer_length`, in `0.0..=1.0`. Two empty strings are identical.
pub fn string_similarity(a: &str, b: &str) -> f64 {
    let longest = a.encode_utf16().count().max(b.encode_utf16().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein_distance(a, b) as f64 / longest as f64
}

/// Contribution of one shared field to the record score.
fn field_score(a: &Value, b: &Value) -> f64 {
    if a == b {
        return 1.0;
    }
    match (a, b) {
        (Value::String(a), Value::String(b)) => {
            let similarity = string_similarity(a, b);
            if similarity > FIELD_SIMILARITY_FLOOR {
                similarity
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// Mean field score over the content fields both records share.
///
/// Returns 0 when the records share no comparable field.
pub fn calculate_similarity(a: &Record, b: &Record) -> f64 {
    let fields: BTreeSet<&String> = a
        .fields()
        .chain(b.fields())
        .filter(|field| !is_excluded_field(field))
        .collect();

    let mut compared = 0usize;
    let mut total = 0.0;
    for field in fields {
        if let (Some(left), Some(right)) = (a.get(field), b.get(field)) {
            compared += 1;
            total += field_score(left, right);
        }
    }

    if compared == 0 {
        0.0
    } else {
        total / compared as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::try_from(value).unwrap()
    }

    #[test]
    fn test_levenshtein_classics() {
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("flaw", "lawn"), 2);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("abc", ""), 3);
        assert_eq!(levenshtein_distance("same", "same"), 0);
    }

    #[test]
    fn test_levenshtein_is_case_and_space_sensitive() {
        assert_eq!(levenshtein_distance("Jane", "jane"), 1);
        assert_eq!(levenshtein_distance("a b", "ab"), 1);
    }

    #[test]
    fn test_levenshtein_counts_utf16_units() {
        // U+1F600 is a surrogate pair: two code units.
        assert_eq!(levenshtein_distance("a\u{1F600}", "a"), 2);
        assert_eq!(levenshtein_distance("é", "e"), 1);
    }

    #[test]
    fn test_field_floor_is_exclusive() {
        // 1 - 1/4 = 0.75: below the floor, contributes nothing.
        let a = record(json!({"name": "Jane"}));
        let b = record(json!({"name": "Jone"}));
        assert_eq!(calculate_similarity(&a, &b), 0.0);

        // 1 - 1/8 = 0.875: counts fractionally.
        let a = record(json!({"name": "Jonathan"}));
        let b = record(json!({"name": "Jonathon"}));
        assert_eq!(calculate_similarity(&a, &b), 0.875);
    }

    #[test]
    fn test_only_shared_fields_are_compared() {
        let a = record(json!({"clinic": "North", "rating": 5}));
        let b = record(json!({"clinic": "North", "comments": "ok"}));
        assert_eq!(calculate_similarity(&a, &b), 1.0);
    }

    #[test]
    fn test_excluded_fields_are_ignored() {
        let a = record(json!({"id": "1", "submittedAt": "t", "_integrity": {}, "rating": 5}));
        let b = record(json!({"id": "2", "submittedAt": "u", "_integrity": {"x": 1}, "rating": 5}));
        assert_eq!(calculate_similarity(&a, &b), 1.0);
    }

    #[test]
    fn test_no_shared_fields_scores_zero() {
        let a = record(json!({"id": "1", "rating": 5}));
        let b = record(json!({"id": "1", "clinic": "North"}));
        assert_eq!(calculate_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_non_string_mismatch_scores_zero() {
        let a = record(json!({"rating": 4, "consent": true}));
        let b = record(json!({"rating": 5, "consent": true}));
        assert_eq!(calculate_similarity(&a, &b), 0.5);
    }

    #[test]
    fn test_nested_values_compare_structurally() {
        let a = record(json!({"answers": {"q1": "yes", "q2": [1, 2]}}));
        let b = record(json!({"answers": {"q2": [1, 2], "q1": "yes"}}));
        assert_eq!(calculate_similarity(&a, &b), 1.0);
    }
}
