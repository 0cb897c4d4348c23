use crate::models::{Embedding, SourceKind};
use serde::Serialize;
use shared::error::BenchError;
use shared::types::Result;
use std::fmt;

/// How two embeddings are judged against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComparePolicy {
    /// Exact for two API-compatible sources, cosine otherwise.
    #[default]
    Auto,
    Exact,
    Cosine,
}

impl ComparePolicy {
    /// Resolve `Auto` for a concrete pair of sources.
    pub fn resolve(self, left: SourceKind, right: SourceKind) -> ComparePolicy {
        match self {
            ComparePolicy::Auto if left.is_api_compatible() && right.is_api_compatible() => {
                ComparePolicy::Exact
            }
            ComparePolicy::Auto => ComparePolicy::Cosine,
            other => other,
        }
    }
}

impl fmt::Display for ComparePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComparePolicy::Auto => "auto",
            ComparePolicy::Exact => "exact",
            ComparePolicy::Cosine => "cosine",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExactReport {
    pub matched: bool,
    pub differing: usize,
    pub first_difference: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MatchResult {
    Exact(ExactReport),
    /// No threshold: the caller interprets the number.
    Cosine { similarity: f64 },
}

impl MatchResult {
    /// `None` for cosine results, which carry no verdict.
    pub fn is_match(&self) -> Option<bool> {
        match self {
            MatchResult::Exact(report) => Some(report.matched),
            MatchResult::Cosine { .. } => None,
        }
    }
}

fn ensure_same_length(a: &[f32], b: &[f32]) -> Result<()> {
    if a.len() != b.len() {
        return Err(BenchError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(())
}

/// Bit-for-bit equality of every component. `-0.0` and `0.0` differ, a NaN
/// equals itself.
pub fn exact_match(a: &[f32], b: &[f32]) -> Result<ExactReport> {
    ensure_same_length(a, b)?;
    let mut differing = 0;
    let mut first_difference = None;
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        if x.to_bits() != y.to_bits() {
            differing += 1;
            first_difference.get_or_insert(i);
        }
    }
    Ok(ExactReport {
        matched: differing == 0,
        differing,
        first_difference,
    })
}

/// Accumulates in `f64`. A zero-norm operand yields `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    ensure_same_length(a, b)?;
    let dot_product: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        tracing::warn!("cosine similarity of a zero-norm vector reported as 0");
        return Ok(0.0);
    }
    Ok((dot_product / (norm_a * norm_b)).clamp(-1.0, 1.0))
}

/// Compare `candidate` against `reference` under `policy`.
pub fn compare(
    reference: &Embedding,
    candidate: &Embedding,
    policy: ComparePolicy,
) -> Result<MatchResult> {
    match policy.resolve(reference.kind, candidate.kind) {
        ComparePolicy::Cosine => Ok(MatchResult::Cosine {
            similarity: cosine_similarity(&reference.vector, &candidate.vector)?,
        }),
        _ => Ok(MatchResult::Exact(exact_match(
            &reference.vector,
            &candidate.vector,
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(vector: Vec<f32>) -> Embedding {
        Embedding::new("api", SourceKind::OpenAi, vector)
    }

    fn reference(vector: Vec<f32>) -> Embedding {
        Embedding::new("reference", SourceKind::Reference, vector)
    }

    #[test]
    fn identical_vectors_match_exactly() {
        let vectors = [
            vec![0.1, 0.2, 0.3],
            vec![0.0, -0.0, f32::MAX],
            vec![f32::NAN, 1.0],
            vec![],
        ];
        for v in vectors {
            let report = exact_match(&v, &v).unwrap();
            assert!(report.matched, "{v:?} should match itself");
            assert_eq!(report.first_difference, None);
        }
    }

    #[test]
    fn tiny_difference_fails_exact_match() {
        let report = exact_match(&[0.1, 0.2, 0.3], &[0.1, 0.2, 0.30001]).unwrap();
        assert!(!report.matched);
        assert_eq!(report.differing, 1);
        assert_eq!(report.first_difference, Some(2));
    }

    #[test]
    fn cosine_is_symmetric() {
        let a = [0.3, -1.2, 4.5, 0.0];
        let b = [1.1, 0.4, -2.0, 3.3];
        let ab = cosine_similarity(&a, &b).unwrap();
        let ba = cosine_similarity(&b, &a).unwrap();
        assert!((ab - ba).abs() < 1e-12);
    }

    #[test]
    fn cosine_of_self_is_one() {
        let a = [0.25, -0.5, 0.75, 1.0];
        let sim = cosine_similarity(&a, &a).unwrap();
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_of_near_identical_vectors() {
        let sim = cosine_similarity(&[0.1, 0.2, 0.3], &[0.1, 0.2, 0.30001]).unwrap();
        assert!(sim > 0.99999 && sim <= 1.0, "got {sim}");
    }

    #[test]
    fn cosine_of_opposite_vectors_is_minus_one() {
        let sim = cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]).unwrap();
        assert!((sim + 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_with_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]).unwrap(), 0.0);
    }

    #[test]
    fn unequal_lengths_are_rejected() {
        let err = cosine_similarity(&[0.1, 0.2], &[0.1, 0.2, 0.3]).unwrap_err();
        assert!(matches!(
            err,
            BenchError::DimensionMismatch { left: 2, right: 3 }
        ));
        let err = exact_match(&[0.1], &[]).unwrap_err();
        assert!(matches!(err, BenchError::DimensionMismatch { .. }));

        let err = compare(&api(vec![1.0]), &api(vec![1.0, 2.0]), ComparePolicy::Auto).unwrap_err();
        assert!(matches!(err, BenchError::DimensionMismatch { .. }));
    }

    #[test]
    fn auto_policy_picks_exact_for_api_sources() {
        let result = compare(
            &api(vec![0.1, 0.2, 0.3]),
            &api(vec![0.1, 0.2, 0.3]),
            ComparePolicy::Auto,
        )
        .unwrap();
        assert_eq!(result.is_match(), Some(true));
    }

    #[test]
    fn auto_policy_picks_cosine_for_heterogeneous_sources() {
        let result = compare(
            &reference(vec![0.1, 0.2, 0.3]),
            &api(vec![0.1, 0.2, 0.3]),
            ComparePolicy::Auto,
        )
        .unwrap();
        assert!(matches!(result, MatchResult::Cosine { .. }));
        assert_eq!(result.is_match(), None);
    }

    #[test]
    fn explicit_policy_overrides_source_kinds() {
        let result = compare(
            &api(vec![1.0, 0.0]),
            &api(vec![2.0, 0.0]),
            ComparePolicy::Cosine,
        )
        .unwrap();
        match result {
            MatchResult::Cosine { similarity } => assert!((similarity - 1.0).abs() < 1e-9),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn policy_displays_lowercase() {
        assert_eq!(ComparePolicy::Auto.to_string(), "auto");
        assert_eq!(ComparePolicy::Cosine.to_string(), "cosine");
    }
}
