//! A concurrent TF-IDF scoring pipeline.

pub mod config;
pub mod error;
pub mod utils;
pub mod vectorizer;

/// TF-IDF Pipeline
/// The top-level struct of this crate.
/// It turns a blank-line delimited text stream into one TF-IDF score map per
/// document.
///
/// A run has two fan-out/fan-in phases on a worker pool owned by that run:
/// - tokenization, one task per document block
/// - scoring, one task per document
///
/// Between them the document frequencies are aggregated sequentially.
///
/// `TfIdfPipeline<E>` takes the calculation engine `E` as a generic parameter,
/// `DefaultTfIdfEngine` by default.
///
/// # Errors
/// Every run returns `Result<ScoreMatrix, PipelineError>`.
/// An empty input is not an error, it yields an empty `ScoreMatrix`.
pub use vectorizer::TfIdfPipeline;

/// Pipeline configuration
/// - worker thread count
/// - bound for each phase to settle
/// - failure policy, applied to both phases
/// - progress log interval
pub use config::{FailurePolicy, PipelineConfig};

/// Errors
/// `PipelineError` names the stage and, for task failures, the document index.
pub use error::{PipelineError, Stage, TaskError};

/// Corpus and Document
/// The tokenized input, index-aligned with the input blocks.
///
/// Document Frequency
/// For each distinct term, the number of documents containing it.
/// Built once per run, shared read-only by the scoring tasks.
pub use vectorizer::corpus::{Corpus, Document, DocumentFrequency};

/// Score Map and Score Matrix
/// - `ScoreMap`: term -> TF-IDF score of one document, positive scores only
/// - `DocumentScores`: one slot, scored or failed
/// - `ScoreMatrix`: all slots, in input order
pub use vectorizer::scoring::{DocumentScores, ScoreMap, ScoreMatrix};

/// TF-IDF Calculation Engine Trait
/// By implementing this trait, you can plug a different calculation into
/// `TfIdfPipeline<E>`.
/// `DefaultTfIdfEngine` does textbook `tf = count / |d|`, `idf = ln(N / df)`.
pub use vectorizer::tfidf::{DefaultTfIdfEngine, TfIdfEngine};

/// Term Frequency
/// Per-document term counts, the base of TF.
pub use vectorizer::term::TermFrequency;

/// Tokenizer
pub use vectorizer::token::{tokenize, Token};

/// Worker pool, task batches and cancellation handle
pub use utils::pool::{CancelHandle, TaskBatch, WorkerPool};
