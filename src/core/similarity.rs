//! Bounded similarity between two signatures.
//!
//! Cosine similarity in `[-1, 1]` is rescaled to a percentage in `[0, 100]` so
//! that acceptance thresholds can be configured as plain percentages.

/// Cosine similarity of `a` and `b`, or `None` when the vectors differ in
/// length, are empty, or either has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }

    let cosine = dot / (norm_a.sqrt() * norm_b.sqrt());
    if !cosine.is_finite() {
        return None;
    }
    Some(cosine.clamp(-1.0, 1.0) as f32)
}

/// Similarity percentage of two signatures.
///
/// Never fails: a dimensionality mismatch or a zero-norm operand scores `0.0`
/// so that a scan over stored signatures cannot be interrupted by one bad
/// record.
pub fn score(a: &[f32], b: &[f32]) -> f32 {
    match cosine_similarity(a, b) {
        Some(cosine) => ((cosine + 1.0) / 2.0 * 100.0).clamp(0.0, 100.0),
        None => 0.0,
    }
}
