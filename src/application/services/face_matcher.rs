//! Face Matcher Service
//!
//! Matches detected face encodings against the Face Store's in-memory mirror
//! using adaptive-tolerance Euclidean distance.
//! Reference: https://arxiv.org/abs/1503.03832 (FaceNet: A Unified Embedding for Face Recognition)

use tokio::sync::RwLock;

use crate::domain::value_objects::FaceEncoding;

/// Result of a face matching operation.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub name: String,
    pub person_id: String,
    pub distance: f32,
    pub confidence: f32,
}

/// Adaptive tolerance table: relaxes monotonically as quality drops.
pub fn adaptive_tolerance(quality: f32, base_tolerance: f32) -> f32 {
    if quality >= 0.7 {
        base_tolerance
    } else if quality >= 0.5 {
        (base_tolerance + 0.05).min(0.70)
    } else {
        (base_tolerance + 0.10).min(0.75)
    }
}

/// Dual mirror of the Face Store: all matching reads this in-memory list,
/// never the backing file/table directly, so recognition stays O(N) over a
/// consistent snapshot.
pub struct FaceMatcher {
    cache: RwLock<Vec<(String, String, FaceEncoding)>>,
    base_tolerance: RwLock<f32>,
}

impl FaceMatcher {
    /// Creates a new face matcher with a base tolerance (relaxed per-query
    /// by `adaptive_tolerance` according to face quality).
    pub fn new(base_tolerance: f32) -> Self {
        Self {
            cache: RwLock::new(Vec::new()),
            base_tolerance: RwLock::new(base_tolerance),
        }
    }

    /// Replaces the entire mirror atomically. Used on load and on `clear`.
    pub async fn replace_cache(&self, entries: Vec<(String, String, FaceEncoding)>) {
        let mut cache = self.cache.write().await;
        *cache = entries;
    }

    /// Appends a single entry to the mirror. Must be called in the same
    /// critical section as the Face Store append.
    pub async fn add_to_cache(&self, name: String, person_id: String, encoding: FaceEncoding) {
        let mut cache = self.cache.write().await;
        cache.push((name, person_id, encoding));
    }

    pub async fn clear_cache(&self) {
        let mut cache = self.cache.write().await;
        cache.clear();
    }

    pub async fn set_base_tolerance(&self, tolerance: f32) {
        *self.base_tolerance.write().await = tolerance;
    }

    pub async fn base_tolerance(&self) -> f32 {
        *self.base_tolerance.read().await
    }

    /// Finds the closest matching entry for an encoding at the given face
    /// quality, applying adaptive tolerance. Returns `None` if the nearest
    /// entry still exceeds the relaxed tolerance.
    pub async fn find_match(&self, encoding: &FaceEncoding, quality: f32) -> Option<MatchResult> {
        let cache = self.cache.read().await;
        let base = *self.base_tolerance.read().await;
        let tolerance = adaptive_tolerance(quality, base);

        let mut best: Option<(&str, &str, f32)> = None;
        for (name, person_id, stored) in cache.iter() {
            let distance = encoding.distance(stored);
            match best {
                None => best = Some((name, person_id, distance)),
                Some((_, _, best_distance)) if distance < best_distance => {
                    best = Some((name, person_id, distance));
                }
                _ => {}
            }
        }

        best.and_then(|(name, person_id, distance)| {
            if distance > tolerance {
                return None;
            }
            let confidence = (1.0 - distance / tolerance).clamp(0.0, 1.0);
            Some(MatchResult {
                name: name.to_string(),
                person_id: person_id.to_string(),
                distance,
                confidence,
            })
        })
    }

    pub async fn cache_size(&self) -> usize {
        self.cache.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::EMBEDDING_DIMENSION;
    use rstest::rstest;

    fn encoding_of(value: f32) -> FaceEncoding {
        FaceEncoding::new(vec![value; EMBEDDING_DIMENSION])
    }

    #[rstest]
    #[case(0.9, 0.65, 0.65)]
    #[case(0.6, 0.65, 0.70)]
    #[case(0.3, 0.65, 0.75)]
    fn adaptive_tolerance_relaxes_with_quality(#[case] quality: f32, #[case] base: f32, #[case] expected: f32) {
        assert!((adaptive_tolerance(quality, base) - expected).abs() < 1e-6);
    }

    #[tokio::test]
    async fn find_match_returns_none_when_empty_cache() {
        let matcher = FaceMatcher::new(0.65);
        let result = matcher.find_match(&encoding_of(0.5), 0.9).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn find_match_returns_best_match_within_tolerance() {
        let matcher = FaceMatcher::new(0.65);
        matcher
            .add_to_cache("Alice".into(), "A1".into(), encoding_of(0.5))
            .await;

        let result = matcher.find_match(&encoding_of(0.5), 0.9).await;
        assert!(result.is_some());
        assert_eq!(result.unwrap().person_id, "A1");
    }

    #[tokio::test]
    async fn find_match_returns_none_outside_tolerance() {
        let matcher = FaceMatcher::new(0.1);
        matcher
            .add_to_cache("Alice".into(), "A1".into(), encoding_of(0.0))
            .await;

        let result = matcher.find_match(&encoding_of(1.0), 0.9).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn low_quality_match_uses_relaxed_tolerance() {
        // distance of sqrt(128*0.01^2)*... keep small: pick values so
        // distance sits between base (0.65) and relaxed (0.75).
        let matcher = FaceMatcher::new(0.65);
        matcher
            .add_to_cache("Alice".into(), "A1".into(), encoding_of(0.0))
            .await;

        // construct a query whose Euclidean distance to all-zero is ~0.7
        let value = 0.7 / (EMBEDDING_DIMENSION as f32).sqrt();
        let query = encoding_of(value);

        let rejected_at_base = matcher.find_match(&query, 0.9).await;
        assert!(rejected_at_base.is_none());

        let accepted_at_low_quality = matcher.find_match(&query, 0.3).await;
        assert!(accepted_at_low_quality.is_some());
    }

    #[tokio::test]
    async fn clear_cache_empties_mirror() {
        let matcher = FaceMatcher::new(0.65);
        matcher
            .add_to_cache("Alice".into(), "A1".into(), encoding_of(0.5))
            .await;
        assert_eq!(matcher.cache_size().await, 1);
        matcher.clear_cache().await;
        assert_eq!(matcher.cache_size().await, 0);
    }
}
