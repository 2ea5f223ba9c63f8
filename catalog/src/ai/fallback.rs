//! Deterministic fallback embedding used when the provider is unreachable.
//!
//! Hashes the normalized text into a repeatable pseudo-random unit
//! vector. Clearly labelled via [`crate::ai::EmbeddingSource::Fallback`]
//! so normalization/SKU stages can refuse to persist it when
//! `ai.strict` is set.

use sha2::{Digest, Sha256};

use super::normalize_text;

pub fn fallback_vector(text: &str, dimension: usize) -> Vec<f32> {
    let normalized = normalize_text(text);
    let mut vector = Vec::with_capacity(dimension);
    let mut counter: u32 = 0;
    let mut block = hash_block(&normalized, counter);
    let mut cursor = 0usize;

    while vector.len() < dimension {
        if cursor >= block.len() {
            counter += 1;
            block = hash_block(&normalized, counter);
            cursor = 0;
        }
        // Map each byte to [-1, 1].
        let value = (block[cursor] as f32 / 255.0) * 2.0 - 1.0;
        vector.push(value);
        cursor += 1;
    }

    l2_normalize(&mut vector);
    vector
}

fn hash_block(normalized: &str, counter: u32) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hasher.update(counter.to_le_bytes());
    hasher.finalize().into()
}

fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_yields_same_vector() {
        let a = fallback_vector("Цемент М500", 32);
        let b = fallback_vector("  цемент   м500 ", 32);
        assert_eq!(a, b);
    }

    #[test]
    fn different_text_yields_different_vector() {
        let a = fallback_vector("cement", 32);
        let b = fallback_vector("brick", 32);
        assert_ne!(a, b);
    }

    #[test]
    fn vector_is_l2_normalized() {
        let v = fallback_vector("gravel", 64);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3);
    }
}
