// src/trends/merge.rs
//! Exact-key collection across buckets followed by a greedy near-duplicate merge.
//!
//! Near-duplicate test: Levenshtein distance `<= 2` (via `strsim::levenshtein`) or
//! token-set Jaccard overlap `>= 0.75`. The merge is first-match against the list of
//! already accepted entries, so the first-seen spelling stays canonical.

use std::collections::{HashMap, HashSet};
use strsim::levenshtein;

use super::normalize::{normalize, should_drop};
use super::types::{CandidateBucket, SourceType};

pub const MAX_EDIT_DISTANCE: usize = 2;
pub const MIN_TOKEN_OVERLAP: f64 = 0.75;

/// A collected query before scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub query: String,
    pub source_type: SourceType,
    pub sources: Vec<String>, // unique, first-seen order
}

impl Candidate {
    fn new(query: String, source_type: SourceType, source_name: &str) -> Self {
        Self {
            query,
            source_type,
            sources: vec![source_name.to_string()],
        }
    }

    fn add_source(&mut self, source_name: &str) {
        if !self.sources.iter().any(|s| s == source_name) {
            self.sources.push(source_name.to_string());
        }
    }

    /// Fold another candidate's provenance into this one; `self.query` is kept.
    fn absorb(&mut self, other: Candidate) {
        for s in &other.sources {
            self.add_source(s);
        }
        self.source_type = self.source_type.upgrade(other.source_type);
    }
}

/// Normalize, filter and group every raw item by exact query, preserving first-seen order.
///
/// Returns the candidates and the number of raw items that were dropped.
pub fn collect(buckets: &[CandidateBucket]) -> (Vec<Candidate>, usize) {
    let mut out: Vec<Candidate> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut dropped = 0usize;

    for bucket in buckets {
        for raw in &bucket.items {
            let query = normalize(raw);
            if query.is_empty() || should_drop(&query) {
                dropped += 1;
                continue;
            }
            match index.get(&query) {
                Some(&i) => {
                    let entry = &mut out[i];
                    entry.add_source(&bucket.source_name);
                    entry.source_type = entry.source_type.upgrade(bucket.source_type);
                }
                None => {
                    index.insert(query.clone(), out.len());
                    out.push(Candidate::new(query, bucket.source_type, &bucket.source_name));
                }
            }
        }
    }

    (out, dropped)
}

/// Greedy first-match merge of near-duplicate candidates.
pub fn merge_near_duplicates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut accepted: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for cand in candidates {
        match accepted
            .iter_mut()
            .find(|a| near_duplicate(&a.query, &cand.query))
        {
            Some(target) => target.absorb(cand),
            None => accepted.push(cand),
        }
    }
    accepted
}

/// Whether two normalized queries describe the same topic.
pub fn near_duplicate(a: &str, b: &str) -> bool {
    levenshtein(a, b) <= MAX_EDIT_DISTANCE || token_overlap(a, b) >= MIN_TOKEN_OVERLAP
}

/// Jaccard overlap of the whitespace token sets; two empty sets overlap fully.
pub fn token_overlap(a: &str, b: &str) -> f64 {
    let ta: HashSet<&str> = a.split_whitespace().collect();
    let tb: HashSet<&str> = b.split_whitespace().collect();
    let union = ta.union(&tb).count();
    if union == 0 {
        return 1.0;
    }
    ta.intersection(&tb).count() as f64 / union as f64
}
