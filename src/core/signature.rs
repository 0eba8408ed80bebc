/// Fixed-length face embedding. The length is set by the embedding model.
pub type Signature = Vec<f32>;

pub fn l2_norm(signature: &[f32]) -> f32 {
    signature.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scales `signature` to unit length in place. A zero vector is left untouched
/// and `false` is returned.
pub fn normalize(signature: &mut [f32]) -> bool {
    let norm = l2_norm(signature);
    if norm == 0.0 || !norm.is_finite() {
        return false;
    }
    for value in signature.iter_mut() {
        *value /= norm;
    }
    true
}
