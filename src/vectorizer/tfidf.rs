use crate::{
    error::TaskError,
    vectorizer::{
        corpus::{Document, DocumentFrequency},
        scoring::ScoreMap,
    },
};

/// TF-IDF calculation engine.
///
/// One instance is shared by every scoring task, so implementations must be
/// `Send + Sync` and must not rely on interior mutability for correctness.
pub trait TfIdfEngine: Send + Sync {
    /// Term frequency of a term seen `count` times in a document of `doc_len`
    /// tokens
    fn tf(&self, count: u64, doc_len: u64) -> f64;

    /// Inverse document frequency of a term contained in `doc_freq` of
    /// `doc_num` documents
    fn idf(&self, doc_num: u64, doc_freq: u64) -> f64;

    /// Score every distinct term of one document.
    /// Only strictly positive scores are kept.
    ///
    /// # Arguments
    /// * `index` - position of the document in the corpus
    /// * `document` - the document to score
    /// * `df` - shared document frequencies
    fn score_document(&self, index: usize, document: &Document, df: &DocumentFrequency) -> Result<ScoreMap, TaskError> {
        let _ = index;
        let freq = document.term_frequency();
        let doc_len = freq.term_sum();
        let doc_num = df.get_doc_num();
        let mut scores = ScoreMap::with_capacity(freq.term_num());
        for (term, count) in freq.iter() {
            let score = self.tf(count, doc_len) * self.idf(doc_num, df.get_term_count(term));
            if score > 0.0 {
                scores.insert(term.clone(), score);
            }
        }
        Ok(scores)
    }
}

/// Default TF-IDF engine
/// - `tf = count / |d|`, 0 for an empty document
/// - `idf = ln(N / df)`, 0 when the term is unknown
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTfIdfEngine;

impl DefaultTfIdfEngine {
    pub fn new() -> Self {
        DefaultTfIdfEngine
    }
}

impl TfIdfEngine for DefaultTfIdfEngine {
    #[inline]
    fn tf(&self, count: u64, doc_len: u64) -> f64 {
        if doc_len == 0 {
            return 0.0;
        }
        count as f64 / doc_len as f64
    }

    #[inline]
    fn idf(&self, doc_num: u64, doc_freq: u64) -> f64 {
        if doc_freq == 0 {
            return 0.0;
        }
        (doc_num as f64 / doc_freq as f64).ln()
    }
}
