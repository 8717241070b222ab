//! Face Encoding Value Object
//!
//! Represents a fixed-length face encoding vector produced by the embedding
//! backend. Reference: https://arxiv.org/abs/1503.03832 (FaceNet)

use serde::{Deserialize, Serialize};

/// Dimension of the face encoding vector (store-wide constant).
pub const EMBEDDING_DIMENSION: usize = 128;

/// A face encoding vector for facial recognition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceEncoding {
    values: Vec<f32>,
}

impl FaceEncoding {
    /// Creates a new face encoding from a vector.
    ///
    /// # Panics
    /// Panics if the vector length does not match `EMBEDDING_DIMENSION`.
    pub fn new(values: Vec<f32>) -> Self {
        assert_eq!(
            values.len(),
            EMBEDDING_DIMENSION,
            "Encoding must have {} dimensions, got {}",
            EMBEDDING_DIMENSION,
            values.len()
        );
        Self { values }
    }

    /// Creates an encoding from a byte slice (for database/blob storage).
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != EMBEDDING_DIMENSION * 4 {
            return None;
        }

        let values: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes(chunk.try_into().unwrap()))
            .collect();

        Some(Self { values })
    }

    /// Converts the encoding to bytes for storage.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// Returns the encoding values.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Calculates the Euclidean distance to another encoding.
    /// Lower values indicate more similar faces.
    ///
    /// Reference: https://en.wikipedia.org/wiki/Euclidean_distance
    pub fn distance(&self, other: &FaceEncoding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }

    /// Calculates the cosine similarity to another encoding.
    /// Higher values indicate more similar faces (range: -1 to 1).
    ///
    /// Reference: https://en.wikipedia.org/wiki/Cosine_similarity
    pub fn cosine_similarity(&self, other: &FaceEncoding) -> f32 {
        let dot_product: f32 = self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a * b)
            .sum();

        let magnitude_self = self.values.iter().map(|x| x.powi(2)).sum::<f32>().sqrt();
        let magnitude_other = other.values.iter().map(|x| x.powi(2)).sum::<f32>().sqrt();

        if magnitude_self == 0.0 || magnitude_other == 0.0 {
            return 0.0;
        }

        dot_product / (magnitude_self * magnitude_other)
    }

    /// Normalizes the encoding to unit length (L2 normalization), in place.
    pub fn normalize(&mut self) {
        let magnitude: f32 = self.values.iter().map(|x| x.powi(2)).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for v in &mut self.values {
                *v /= magnitude;
            }
        }
    }

    /// Returns a normalized copy of this encoding.
    pub fn normalized(&self) -> Self {
        let mut copy = self.clone();
        copy.normalize();
        copy
    }
}

impl PartialEq for FaceEncoding {
    fn eq(&self, other: &Self) -> bool {
        self.values
            .iter()
            .zip(other.values.iter())
            .all(|(a, b)| (a - b).abs() < f32::EPSILON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoding_of(value: f32) -> FaceEncoding {
        FaceEncoding::new(vec![value; EMBEDDING_DIMENSION])
    }

    #[test]
    fn distance_of_identical_encodings_is_zero() {
        let e1 = encoding_of(0.5);
        let e2 = encoding_of(0.5);
        assert!((e1.distance(&e2) - 0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn distance_increases_with_difference() {
        let e1 = encoding_of(0.0);
        let e2 = encoding_of(1.0);
        assert!(e1.distance(&e2) > 0.0);
    }

    #[test]
    fn cosine_similarity_of_identical_is_one() {
        let e1 = encoding_of(0.5);
        let e2 = encoding_of(0.5);
        assert!((e1.cosine_similarity(&e2) - 1.0).abs() < 0.0001);
    }

    #[test]
    fn bytes_roundtrip_preserves_values() {
        let original = encoding_of(0.123);
        let bytes = original.to_bytes();
        let restored = FaceEncoding::from_bytes(&bytes).unwrap();
        assert_eq!(original.values(), restored.values());
    }

    #[test]
    fn from_bytes_rejects_wrong_length() {
        assert!(FaceEncoding::from_bytes(&[0u8; 10]).is_none());
    }

    #[test]
    fn normalized_encoding_has_unit_length() {
        let e = encoding_of(5.0);
        let normalized = e.normalized();
        let magnitude: f32 = normalized.values().iter().map(|x| x.powi(2)).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 0.0001);
    }

    #[test]
    #[should_panic(expected = "Encoding must have 128 dimensions")]
    fn rejects_wrong_dimension() {
        FaceEncoding::new(vec![0.0; 64]);
    }
}
