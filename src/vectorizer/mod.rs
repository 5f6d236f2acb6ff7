pub mod corpus;
pub mod scoring;
pub mod segment;
pub mod term;
pub mod tfidf;
pub mod token;

use std::{
    io::{self, BufRead},
    sync::Arc,
    time::Instant,
};

use tracing::{info, info_span};

use crate::{
    config::{FailurePolicy, PipelineConfig},
    error::{PipelineError, Stage},
    utils::pool::{AwaitOptions, CancelHandle, WorkerPool},
    vectorizer::{
        corpus::{Corpus, DocumentFrequency},
        scoring::ScoreMatrix,
        tfidf::{DefaultTfIdfEngine, TfIdfEngine},
    },
};

/// Concurrent TF-IDF pipeline.
///
/// Every `run` owns a fresh `WorkerPool` which is shut down before `run`
/// returns, so runs never share executor state.
///
/// `E` is the TF-IDF calculation engine, `DefaultTfIdfEngine` unless replaced.
#[derive(Debug, Clone)]
pub struct TfIdfPipeline<E = DefaultTfIdfEngine>
where
    E: TfIdfEngine,
{
    config: PipelineConfig,
    engine: Arc<E>,
    interrupt: CancelHandle,
}

impl TfIdfPipeline<DefaultTfIdfEngine> {
    /// Create a pipeline with the default engine
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_engine(config, DefaultTfIdfEngine)
    }
}

impl Default for TfIdfPipeline<DefaultTfIdfEngine> {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl<E> TfIdfPipeline<E>
where
    E: TfIdfEngine + 'static,
{
    /// Create a pipeline with a custom engine
    pub fn with_engine(config: PipelineConfig, engine: E) -> Self {
        Self {
            config,
            engine: Arc::new(engine),
            interrupt: CancelHandle::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Handle that interrupts a run in progress from another thread.
    /// It stays triggered until `CancelHandle::reset` is called.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.interrupt.clone()
    }

    /// Run the whole pipeline over a line source.
    ///
    /// load + tokenize -> document frequencies -> score
    ///
    /// # Arguments
    /// * `lines` - input lines, blank lines separate documents
    ///
    /// # Returns
    /// * `ScoreMatrix` - one slot per document, in input order
    pub fn run<I>(&self, lines: I) -> Result<ScoreMatrix, PipelineError>
    where
        I: IntoIterator<Item = io::Result<String>>,
    {
        let _span = info_span!("tfidf_run").entered();
        let started = Instant::now();
        let pool = self.start_pool(Stage::Tokenize)?;
        info!(threads = pool.threads(), policy = ?self.config.failure_policy, "pipeline started");

        let corpus = Arc::new(segment::segment(&pool, lines, &self.config)?);
        if corpus.is_empty() {
            info!("no documents found");
            pool.shutdown();
            return Ok(ScoreMatrix::default());
        }

        let df = Arc::new(DocumentFrequency::build(&corpus));
        let matrix = scoring::score(&pool, &corpus, &df, &self.engine, &self.config)?;
        pool.shutdown();

        info!(
            documents = matrix.len(),
            failed = matrix.failed_indices().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline finished"
        );
        Ok(matrix)
    }

    /// Run over a buffered reader, e.g. an opened file
    pub fn run_reader<R>(&self, reader: R) -> Result<ScoreMatrix, PipelineError>
    where
        R: BufRead,
    {
        self.run(reader.lines())
    }

    /// Run over in-memory text
    pub fn run_str(&self, text: &str) -> Result<ScoreMatrix, PipelineError> {
        self.run(text.lines().map(|line| Ok::<_, io::Error>(line.to_string())))
    }

    /// Only the segmentation phase, for callers that want the corpus itself
    pub fn segment<I>(&self, lines: I) -> Result<Corpus, PipelineError>
    where
        I: IntoIterator<Item = io::Result<String>>,
    {
        let pool = self.start_pool(Stage::Tokenize)?;
        let corpus = segment::segment(&pool, lines, &self.config)?;
        pool.shutdown();
        Ok(corpus)
    }

    /// Only the DF + scoring phases, over an already built corpus
    pub fn score(&self, corpus: Corpus) -> Result<ScoreMatrix, PipelineError> {
        if corpus.is_empty() {
            return Ok(ScoreMatrix::default());
        }
        let pool = self.start_pool(Stage::Score)?;
        let corpus = Arc::new(corpus);
        let df = Arc::new(DocumentFrequency::build(&corpus));
        let matrix = scoring::score(&pool, &corpus, &df, &self.engine, &self.config)?;
        pool.shutdown();
        Ok(matrix)
    }

    fn start_pool(&self, stage: Stage) -> Result<WorkerPool, PipelineError> {
        WorkerPool::new(self.config.worker_threads(), self.interrupt.clone())
            .map_err(|e| PipelineError::from_pool(stage, e))
    }
}

/// await settings shared by both phases
pub(crate) fn await_options(config: &PipelineConfig) -> AwaitOptions {
    AwaitOptions {
        timeout: config.phase_timeout,
        fail_fast: config.failure_policy == FailurePolicy::FailFast,
        progress_interval: config.progress_interval,
    }
}
