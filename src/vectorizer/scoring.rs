use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn};

use crate::{
    config::{FailurePolicy, PipelineConfig},
    error::{PipelineError, Stage, TaskError},
    utils::pool::{TaskBatch, TaskOutcome, WorkerPool},
    vectorizer::{
        corpus::{Corpus, DocumentFrequency},
        tfidf::TfIdfEngine,
        token::Token,
    },
};

/// term -> TF-IDF score of one document.
/// Only positive scores are stored, in first-occurrence order of the term.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreMap {
    scores: IndexMap<Token, f64>,
}

impl ScoreMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            scores: IndexMap::with_capacity(capacity),
        }
    }

    /// Insert a score, returning the previous one
    pub fn insert(&mut self, term: Token, score: f64) -> Option<f64> {
        self.scores.insert(term, score)
    }

    pub fn get(&self, term: &str) -> Option<f64> {
        self.scores.get(term).copied()
    }

    pub fn contains_term(&self, term: &str) -> bool {
        self.scores.contains_key(term)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.scores.iter().map(|(term, &score)| (term.as_ref(), score))
    }

    /// The `n` best scores, highest first.
    /// Ties are broken by term so the result is stable.
    pub fn top_n(&self, n: usize) -> Vec<(&str, f64)> {
        let mut entries: Vec<(&str, f64)> = self.iter().collect();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries.truncate(n);
        entries
    }
}

/// Result slot of one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentScores {
    Scored(ScoreMap),
    /// the document's tokenize or score task failed
    Failed(TaskError),
}

impl DocumentScores {
    pub fn scores(&self) -> Option<&ScoreMap> {
        match self {
            DocumentScores::Scored(map) => Some(map),
            DocumentScores::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DocumentScores::Failed(_))
    }
}

/// Per-document results, index-aligned with the corpus
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreMatrix {
    rows: Vec<DocumentScores>,
}

impl ScoreMatrix {
    pub fn new(rows: Vec<DocumentScores>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DocumentScores> {
        self.rows.get(index)
    }

    /// Scores of document `index`, `None` when it failed or is out of range
    pub fn scores(&self, index: usize) -> Option<&ScoreMap> {
        self.rows.get(index).and_then(DocumentScores::scores)
    }

    pub fn is_failed(&self, index: usize) -> bool {
        self.rows.get(index).is_some_and(DocumentScores::is_failed)
    }

    pub fn failed_indices(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| row.is_failed().then_some(i))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentScores> {
        self.rows.iter()
    }

    pub fn into_rows(self) -> Vec<DocumentScores> {
        self.rows
    }
}

/// Score every document of `corpus` on `pool`, one task per document.
///
/// Each task reads its own document and the shared `df`, and its result lands
/// in the slot of its index. Documents whose tokenization failed are not
/// scored; their slot carries that failure.
pub fn score<E>(
    pool: &WorkerPool,
    corpus: &Arc<Corpus>,
    df: &Arc<DocumentFrequency>,
    engine: &Arc<E>,
    config: &PipelineConfig,
) -> Result<ScoreMatrix, PipelineError>
where
    E: TfIdfEngine + 'static,
{
    let _span = info_span!("phase", stage = %Stage::Score).entered();

    let mut slots: Vec<Option<DocumentScores>> = vec![None; corpus.len()];
    let mut batch = TaskBatch::new();
    for (index, slot) in slots.iter_mut().enumerate() {
        if let Some(reason) = corpus.failure(index) {
            *slot = Some(DocumentScores::Failed(reason.clone()));
            continue;
        }
        let corpus = Arc::clone(corpus);
        let df = Arc::clone(df);
        let engine = Arc::clone(engine);
        pool.submit(&mut batch, index, move || {
            let document = corpus
                .document(index)
                .ok_or_else(|| TaskError::failed(format!("no document at index {index}")))?;
            engine.score_document(index, document, &df)
        });
    }
    info!(tasks = batch.len(), threads = pool.threads(), "submitted scoring tasks");

    let outcomes = pool
        .await_all(batch, super::await_options(config))
        .map_err(|e| PipelineError::from_pool(Stage::Score, e))?;

    for (index, outcome) in outcomes {
        let row = match outcome {
            TaskOutcome::Done(scores) => DocumentScores::Scored(scores),
            TaskOutcome::Failed(reason) => match config.failure_policy {
                FailurePolicy::FailFast => return Err(PipelineError::from_task(Stage::Score, index, reason)),
                FailurePolicy::Isolate => {
                    warn!(index, %reason, "scoring failed, slot left empty");
                    DocumentScores::Failed(reason)
                }
            },
        };
        slots[index] = Some(row);
    }

    let rows = slots
        .into_iter()
        .map(|slot| slot.unwrap_or(DocumentScores::Failed(TaskError::Cancelled)))
        .collect();
    Ok(ScoreMatrix::new(rows))
}
