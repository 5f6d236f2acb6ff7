pub mod frequency;

use std::collections::BTreeMap;

use crate::{
    error::TaskError,
    vectorizer::{term::TermFrequency, token::Token},
};

pub use frequency::DocumentFrequency;

/// One blank-line delimited block, tokenized.
/// Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    tokens: Vec<Token>,
}

impl Document {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    /// Tokenize the lines of one block into a document
    pub fn from_lines<T>(lines: &[T]) -> Self
    where
        T: AsRef<str>,
    {
        Self::new(crate::vectorizer::token::tokenize_lines(lines))
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Number of tokens, counting repetitions
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Term counts of this document
    pub fn term_frequency(&self) -> TermFrequency {
        TermFrequency::from(self.tokens.as_slice())
    }
}

/// Ordered documents of one run, index-aligned with the input blocks.
///
/// A slot whose tokenization failed holds an empty document and the failure
/// reason, so indices never shift.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<Document>,
    failures: BTreeMap<usize, TaskError>,
}

impl Corpus {
    /// Create a new instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            documents: Vec::with_capacity(capacity),
            failures: BTreeMap::new(),
        }
    }

    /// Append the next document
    pub fn push(&mut self, document: Document) {
        self.documents.push(document);
    }

    /// Append a placeholder for a block whose tokenization failed
    pub fn push_failed(&mut self, reason: TaskError) {
        self.failures.insert(self.documents.len(), reason);
        self.documents.push(Document::default());
    }

    /// Number of documents, failed slots included
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn document(&self, index: usize) -> Option<&Document> {
        self.documents.get(index)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter()
    }

    /// Tokenization failure recorded for `index`
    pub fn failure(&self, index: usize) -> Option<&TaskError> {
        self.failures.get(&index)
    }

    pub fn failed_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.failures.keys().copied()
    }

    /// Total number of tokens across all documents
    pub fn token_count(&self) -> usize {
        self.documents.iter().map(Document::len).sum()
    }
}

impl FromIterator<Document> for Corpus {
    fn from_iter<I: IntoIterator<Item = Document>>(iter: I) -> Self {
        Self {
            documents: iter.into_iter().collect(),
            failures: BTreeMap::new(),
        }
    }
}
