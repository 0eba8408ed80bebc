//! Best-of-all match over a candidate pool.
//!
//! The running best starts at the threshold, so a stored signature is only
//! selected when it scores strictly above it, and only the single highest
//! scoring signature across the whole pool wins. Scan order does not change
//! the winner unless two identities tie exactly, in which case the first one
//! scanned is kept.

use crate::core::pool::CandidatePool;
use crate::core::similarity::score;

#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    NoMatch,
    Matched { identity: String, score: f32 },
}

/// Outcome of one scan, with diagnostics for rejected attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchScan {
    pub result: MatchResult,
    /// Highest score seen anywhere in the pool, even below the threshold.
    pub best_observed: Option<f32>,
    pub comparisons: usize,
}

/// Flat form of a scan: the matched identity, or the best score observed.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchVerdict {
    pub matched: bool,
    pub identity: Option<String>,
    pub score: f32,
}

impl MatchScan {
    pub fn verdict(&self) -> MatchVerdict {
        match &self.result {
            MatchResult::Matched { identity, score } => MatchVerdict {
                matched: true,
                identity: Some(identity.clone()),
                score: *score,
            },
            MatchResult::NoMatch => MatchVerdict {
                matched: false,
                identity: None,
                score: self.best_observed.unwrap_or(0.0),
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MatchEngine {
    threshold: f32,
}

impl MatchEngine {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn find(&self, probe: &[f32], pool: &CandidatePool) -> MatchResult {
        self.scan(probe, pool).result
    }

    pub fn scan(&self, probe: &[f32], pool: &CandidatePool) -> MatchScan {
        let mut result = MatchResult::NoMatch;
        let mut best_score = self.threshold;
        let mut best_observed: Option<f32> = None;
        let mut comparisons = 0usize;

        for candidate in pool.iter() {
            for stored in &candidate.signatures {
                if stored.len() != probe.len() {
                    tracing::debug!(
                        "Signature of '{}' has {} values, probe has {}; scoring as 0",
                        candidate.identity, stored.len(), probe.len()
                    );
                }

                let similarity = score(probe, stored);
                comparisons += 1;
                best_observed = Some(best_observed.map_or(similarity, |b| b.max(similarity)));

                if similarity > best_score {
                    best_score = similarity;
                    result = MatchResult::Matched {
                        identity: candidate.identity.clone(),
                        score: similarity,
                    };
                }
            }
        }

        MatchScan { result, best_observed, comparisons }
    }
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self::new(70.0)
    }
}
