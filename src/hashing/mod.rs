//! Query fingerprints and question hashes (BLAKE3).

use blake3::Hasher;

const FIELD_SEPARATOR: &[u8] = &[0x1F];

/// 32-byte BLAKE3 key addressing one cached result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex, 64 characters.
    pub fn to_hex(&self) -> String {
        blake3::Hash::from_bytes(self.0).to_hex().to_string()
    }
}

impl From<[u8; 32]> for Fingerprint {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Lowercases, trims and collapses whitespace runs to a single space.
pub fn normalize_question(question: &str) -> String {
    question
        .split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Derives the cache key for a query.
///
/// Two queries map to the same fingerprint exactly when their normalized question text,
/// `k` and `min_similarity` (compared bit-for-bit) are equal.
pub fn fingerprint(question: &str, k: usize, min_similarity: f32) -> Fingerprint {
    let normalized = normalize_question(question);

    let mut hasher = Hasher::new();
    hasher.update(normalized.as_bytes());
    hasher.update(FIELD_SEPARATOR);
    hasher.update(&(k as u64).to_le_bytes());
    hasher.update(FIELD_SEPARATOR);
    hasher.update(&min_similarity.to_bits().to_le_bytes());

    Fingerprint(*hasher.finalize().as_bytes())
}

/// 64-bit hash of the normalized question, stored in log records instead of raw text.
#[inline]
pub fn hash_question(question: &str) -> u64 {
    hash_to_u64(normalize_question(question).as_bytes())
}

/// First 8 bytes of a BLAKE3 hash, little-endian.
///
/// Fine for log correlation. Cache addressing uses the full [`Fingerprint`].
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[0..8]);
    u64::from_le_bytes(bytes)
}
