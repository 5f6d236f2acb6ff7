use std::sync::Arc;

use ahash::RandomState;
use indexmap::IndexMap;

use crate::vectorizer::token::Token;

/// TermFrequency struct
/// Counts how often each term occurs in one document.
/// Terms keep their first-occurrence order.
///
/// # Examples
/// ```
/// use tfidf_pipeline::vectorizer::term::TermFrequency;
/// let mut term_freq = TermFrequency::new();
/// term_freq.add_term("term1");
/// term_freq.add_term("term2");
/// term_freq.add_term("term1");
///
/// assert_eq!(term_freq.term_count("term1"), 2);
/// assert_eq!(term_freq.term_sum(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TermFrequency {
    term_count: IndexMap<Token, u64, RandomState>,
    total_term_count: u64,
}

/// Implementation for adding terms
impl TermFrequency {
    /// Create a new TermFrequency
    pub fn new() -> Self {
        TermFrequency {
            term_count: IndexMap::with_hasher(RandomState::new()),
            total_term_count: 0,
        }
    }

    /// Add a term
    ///
    /// # Arguments
    /// * `term` - term to add
    #[inline]
    pub fn add_term(&mut self, term: &str) -> &mut Self {
        match self.term_count.get_mut(term) {
            Some(count) => *count += 1,
            None => {
                self.term_count.insert(Arc::from(term), 1);
            }
        }
        self.total_term_count += 1;
        self
    }

    /// Add an already shared token without copying it
    #[inline]
    pub fn add_token(&mut self, token: &Token) -> &mut Self {
        *self.term_count.entry(Arc::clone(token)).or_insert(0) += 1;
        self.total_term_count += 1;
        self
    }
}

impl From<&[Token]> for TermFrequency {
    fn from(tokens: &[Token]) -> Self {
        let mut tf = TermFrequency::new();
        for token in tokens {
            tf.add_token(token);
        }
        tf
    }
}

/// Implementation for retrieving information
impl TermFrequency {
    /// Iterate over (term, count) in first-occurrence order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&Token, u64)> {
        self.term_count.iter().map(|(term, &count)| (term, count))
    }

    /// Total number of terms (with repetition)
    #[inline]
    pub fn term_sum(&self) -> u64 {
        self.total_term_count
    }

    /// Occurrence count of a term, 0 when absent
    #[inline]
    pub fn term_count(&self, term: &str) -> u64 {
        self.term_count.get(term).copied().unwrap_or(0)
    }

    /// Number of distinct terms
    #[inline]
    pub fn term_num(&self) -> usize {
        self.term_count.len()
    }

    #[inline]
    pub fn contains_term(&self, term: &str) -> bool {
        self.term_count.contains_key(term)
    }
}
