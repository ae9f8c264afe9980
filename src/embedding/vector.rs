//! Vector math shared by the embedder, the search backends and MMR.

#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[inline]
pub fn norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

/// Scales `v` to unit length.
///
/// Returns `None` for empty, zero or non-finite vectors, which cannot take part in
/// cosine arithmetic.
pub fn l2_normalize(v: &[f32]) -> Option<Vec<f32>> {
    if v.is_empty() || v.iter().any(|x| !x.is_finite()) {
        return None;
    }
    let n = norm(v);
    if n == 0.0 || !n.is_finite() {
        return None;
    }
    Some(v.iter().map(|x| x / n).collect())
}

/// Cosine similarity in `[-1, 1]`; `0.0` for empty, mismatched or zero-norm inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let denom = norm(a) * norm(b);
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }
    (dot(a, b) / denom).clamp(-1.0, 1.0)
}
