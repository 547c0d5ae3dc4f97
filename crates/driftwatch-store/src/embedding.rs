//! Embedding Model for Text Vectorization
//!
//! Text-to-vector conversion for the semantic fallback of the mapper.
//! Embeddings are computed locally; no network, no model files.
//!
//! # Architecture
//!
//! - **EmbeddingModel**: the seam; any model producing fixed-size vectors fits
//! - **HashingEmbeddingModel**: token-hashing bag of words, L2-normalized.
//!   Texts that share identifiers land close together, which is what matching
//!   a claim's wording against entity names and signatures needs.
//!
//! # Examples
//!
//! ```rust
//! use driftwatch_store::embedding::{HashingEmbeddingModel, EmbeddingModel, cosine_similarity};
//!
//! let model = HashingEmbeddingModel::new(256);
//! let a = model.embed("function retryRequest(attempts)").unwrap();
//! let b = model.embed("requests are retried on failure").unwrap();
//! assert_eq!(a.len(), 256);
//! assert!(cosine_similarity(&a, &b) > 0.0);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Errors that can occur during embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Invalid input text
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Model inference error
    #[error("Model inference failed: {0}")]
    InferenceFailed(String),
}

/// Trait for embedding models
pub trait EmbeddingModel: Send + Sync {
    /// Generate an embedding vector for the given text
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Get the dimension of embeddings produced by this model
    fn dimension(&self) -> usize;
}

/// Bag-of-words embedding over hashed, stemmed tokens
///
/// Identifiers are split on case and punctuation (`retryRequest` →
/// `retry`, `request`) and crudely stemmed (`retried` and `retry` both
/// become `retr`), then each token adds a signed unit to one bucket.
/// The result is:
///
/// - **Deterministic**: same text always produces the same vector
/// - **Normalized**: unit length, so dot product is cosine similarity
/// - **Lexical**: shared tokens mean positive similarity
pub struct HashingEmbeddingModel {
    dimension: usize,
}

impl HashingEmbeddingModel {
    /// Create a model producing vectors of `dimension` floats
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn bucket(&self, token: &str) -> (usize, f32) {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let h = hasher.finish();
        let index = (h % self.dimension as u64) as usize;
        let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

impl Default for HashingEmbeddingModel {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EmbeddingModel for HashingEmbeddingModel {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "Text has no tokens to embed".to_string(),
            ));
        }

        let mut embedding = vec![0.0f32; self.dimension];
        for token in &tokens {
            let (index, sign) = self.bucket(token);
            embedding[index] += sign;
        }

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut embedding {
                *value /= magnitude;
            }
        }
        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Split text into lowercase, stemmed word tokens
///
/// camelCase and snake_case identifiers are split into their words; tokens
/// shorter than two characters are dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in text.chars() {
        if c.is_alphanumeric() {
            if c.is_uppercase() && prev_lower && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
            current.extend(c.to_lowercase());
        } else {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
        }
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .into_iter()
        .filter(|w| w.chars().count() >= 2)
        .map(|w| stem(&w))
        .collect()
}

fn stem(word: &str) -> String {
    for suffix in ["ing", "ed", "es", "s"] {
        if let Some(base) = word.strip_suffix(suffix) {
            if base.chars().count() >= 3 {
                return base.trim_end_matches('i').to_string();
            }
        }
    }
    word.trim_end_matches('y').to_string()
}

/// Calculate cosine similarity between two embedding vectors
///
/// Cosine similarity in range [-1, 1]; vectors of different lengths or with
/// zero magnitude score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}

/// Encode a vector as little-endian f32 bytes for a BLOB column
pub fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decode a BLOB column back into a vector (trailing partial floats dropped)
pub fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_deterministic() {
        let model = HashingEmbeddingModel::new(128);
        let a = model.embed("function loadConfig(path)").unwrap();
        let b = model.embed("function loadConfig(path)").unwrap();
        assert_eq!(a, b, "Same text should produce same embedding");
    }

    #[test]
    fn test_embedding_dimension_and_norm() {
        let model = HashingEmbeddingModel::new(64);
        let embedding = model.embed("parse the manifest").unwrap();
        assert_eq!(embedding.len(), 64);
        assert_eq!(model.dimension(), 64);

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 0.0001, "Embedding should be normalized");
    }

    #[test]
    fn test_embedding_empty_text() {
        let model = HashingEmbeddingModel::default();
        let result = model.embed(" ... ");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("no tokens"));
    }

    #[test]
    fn test_shared_words_score_higher() {
        let model = HashingEmbeddingModel::new(512);
        let claim = model.embed("Requests are retried with exponential backoff").unwrap();
        let related = model.embed("function retryRequest backoff").unwrap();
        let unrelated = model.embed("class ThemePalette colors").unwrap();

        let close = cosine_similarity(&claim, &related);
        let far = cosine_similarity(&claim, &unrelated);
        assert!(close > far, "close={} far={}", close, far);
    }

    #[test]
    fn test_tokenize_splits_identifiers() {
        assert_eq!(
            tokenize("retryRequest load_config"),
            vec!["retr", "request", "load", "config"]
        );
        // inflections collapse onto one stem
        assert_eq!(tokenize("retried requests"), tokenize("retry request"));
    }

    #[test]
    fn test_cosine_similarity_cases() {
        let x = vec![1.0, 0.0, 0.0];
        let y = vec![0.0, 1.0, 0.0];
        let neg = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&x, &x) - 1.0).abs() < 0.0001);
        assert!(cosine_similarity(&x, &y).abs() < 0.0001);
        assert!((cosine_similarity(&x, &neg) + 1.0).abs() < 0.0001);
        assert_eq!(cosine_similarity(&x, &[1.0]), 0.0);
    }

    #[test]
    fn test_blob_round_trip() {
        let v = vec![0.25f32, -1.5, 3.0];
        assert_eq!(decode_embedding(&encode_embedding(&v)), v);
    }
}
