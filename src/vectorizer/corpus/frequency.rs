use std::collections::{HashMap, HashSet};

use ahash::RandomState;
use tracing::info;

use crate::vectorizer::{corpus::Corpus, token::Token};

/// keep document count and per-term document counts
///
/// Built once from a finished `Corpus`, then shared read-only by every
/// scoring task.
#[derive(Debug, Clone, Default)]
pub struct DocumentFrequency {
    /// number of documents in the corpus (IDF numerator)
    doc_num: u64,
    /// term -> number of documents containing it at least once
    term_counts: HashMap<Token, u64, RandomState>,
}

impl DocumentFrequency {
    /// Create a new instance
    pub fn new() -> Self {
        Self {
            doc_num: 0,
            term_counts: HashMap::with_hasher(RandomState::new()),
        }
    }

    /// Aggregate a whole corpus.
    /// Duplicates inside one document count once.
    pub fn build(corpus: &Corpus) -> Self {
        let mut df = Self::new();
        for document in corpus.iter() {
            df.add_set(document.tokens());
        }
        info!(
            documents = df.doc_num,
            unique_terms = df.vocab_size(),
            "document frequencies computed"
        );
        df
    }

    /// Add one document's terms
    pub fn add_set(&mut self, tokens: &[Token]) {
        self.doc_num += 1;
        let distinct: HashSet<&Token, RandomState> = tokens.iter().collect();
        for token in distinct {
            *self.term_counts.entry(Token::clone(token)).or_insert(0) += 1;
        }
    }

    /// Get the number of documents in the corpus
    #[inline]
    pub fn get_doc_num(&self) -> u64 {
        self.doc_num
    }

    /// Get the document count of a term, 0 when absent
    #[inline]
    pub fn get_term_count(&self, term: &str) -> u64 {
        self.term_counts.get(term).copied().unwrap_or(0)
    }

    /// Get the current vocabulary size (number of unique terms)
    #[inline]
    pub fn vocab_size(&self) -> usize {
        self.term_counts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.term_counts.iter().map(|(term, &count)| (term.as_ref(), count))
    }
}
