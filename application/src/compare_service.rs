use domain::models::Embedding;
use domain::similarity::{compare, ComparePolicy, MatchResult};
use infrastructure::embedder::Embedder;
use shared::error::BenchError;
use shared::types::Result;

#[derive(Debug, Clone)]
pub struct CompareSettings {
    pub input: String,
    pub batch: usize,
    pub policy: ComparePolicy,
    pub concurrent: bool,
}

/// One candidate row judged against the reference row at the same index.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub reference: String,
    pub candidate: String,
    pub row: usize,
    pub result: MatchResult,
}

#[derive(Debug)]
pub struct CompareReport {
    /// Per source, per batch row.
    pub embeddings: Vec<Vec<Embedding>>,
    pub comparisons: Vec<Comparison>,
}

impl CompareReport {
    /// `Some(true)` when every exact comparison matched, `None` when only
    /// cosine scores were produced.
    pub fn verdict(&self) -> Option<bool> {
        let verdicts: Vec<bool> = self
            .comparisons
            .iter()
            .filter_map(|c| c.result.is_match())
            .collect();
        if verdicts.is_empty() {
            None
        } else {
            Some(verdicts.iter().all(|m| *m))
        }
    }
}

/// Compare every vector after the first against the first one.
pub fn compare_vectors(vectors: &[Embedding], policy: ComparePolicy) -> Result<Vec<MatchResult>> {
    let Some((reference, candidates)) = vectors.split_first() else {
        return Err(BenchError::Config("nothing to compare".into()));
    };
    if candidates.is_empty() {
        return Err(BenchError::Config(
            "at least two embeddings are needed for a comparison".into(),
        ));
    }
    candidates
        .iter()
        .map(|candidate| compare(reference, candidate, policy))
        .collect()
}

pub struct CompareService {
    embedder: Embedder,
}

impl CompareService {
    pub fn new(embedder: Embedder) -> Self {
        Self { embedder }
    }

    pub async fn run(&self, settings: &CompareSettings) -> Result<CompareReport> {
        if self.embedder.sources().len() < 2 {
            return Err(BenchError::Config(
                "at least two embedding sources are needed for a comparison".into(),
            ));
        }
        if settings.batch == 0 {
            return Err(BenchError::Config("batch size must be at least 1".into()));
        }

        let embeddings = self
            .embedder
            .embed_all(&settings.input, settings.batch, settings.concurrent)
            .await?;

        let mut comparisons = Vec::new();
        for row in 0..settings.batch {
            let column: Vec<Embedding> = embeddings.iter().map(|rows| rows[row].clone()).collect();
            let results = compare_vectors(&column, settings.policy)?;
            for (candidate, result) in column[1..].iter().zip(results) {
                comparisons.push(Comparison {
                    reference: column[0].source.clone(),
                    candidate: candidate.source.clone(),
                    row,
                    result,
                });
            }
        }

        Ok(CompareReport {
            embeddings,
            comparisons,
        })
    }
}
