use std::{io, mem, sync::Arc};

use tracing::{debug, info, info_span, warn};

use crate::{
    config::{FailurePolicy, PipelineConfig},
    error::{PipelineError, Stage, TaskError},
    utils::pool::{TaskBatch, TaskOutcome, WorkerPool},
    vectorizer::corpus::{Corpus, Document},
};

/// Whether a line separates documents.
/// Blank means nothing but control characters and ASCII spaces (`<= U+0020`);
/// Unicode spaces like U+00A0 make a line non-blank.
#[inline]
pub fn is_blank(line: &str) -> bool {
    line.chars().all(|c| c <= '\u{20}')
}

/// Read `lines`, cut them into documents and tokenize each one on `pool`.
///
/// Blocks are submitted as soon as they close, in discovery order, and the
/// returned corpus follows that order whatever the completion order was.
///
/// # Errors
/// * `SourceRead` - a line could not be read; pending tasks are cancelled
/// * `Interrupted` - the interrupt handle fired while reading or awaiting
/// * `Timeout` - the phase did not settle
/// * `TaskFailed` / `TaskCancelled` - with `FailurePolicy::FailFast` only
pub fn segment<I>(pool: &WorkerPool, lines: I, config: &PipelineConfig) -> Result<Corpus, PipelineError>
where
    I: IntoIterator<Item = io::Result<String>>,
{
    let tokenize_block = |block: &[String]| -> Result<Document, TaskError> { Ok(Document::from_lines(block)) };
    segment_with(pool, lines, config, Arc::new(tokenize_block))
}

/// `segment` with a caller supplied block tokenizer
pub fn segment_with<I, F>(
    pool: &WorkerPool,
    lines: I,
    config: &PipelineConfig,
    tokenize_block: Arc<F>,
) -> Result<Corpus, PipelineError>
where
    I: IntoIterator<Item = io::Result<String>>,
    F: Fn(&[String]) -> Result<Document, TaskError> + Send + Sync + 'static,
{
    let _span = info_span!("phase", stage = %Stage::Tokenize).entered();

    let mut batch = TaskBatch::new();
    let mut block: Vec<String> = Vec::new();

    for (line_no, line) in lines.into_iter().enumerate() {
        if pool.is_interrupted() {
            warn!(line = line_no + 1, "interrupted while reading input");
            pool.shutdown_now();
            return Err(PipelineError::Interrupted { stage: Stage::Tokenize });
        }
        let line = match line {
            Ok(line) => line,
            Err(source) => {
                pool.shutdown_now();
                return Err(PipelineError::SourceRead { line: line_no + 1, source });
            }
        };
        if is_blank(&line) {
            if !block.is_empty() {
                submit_block(pool, &mut batch, mem::take(&mut block), &tokenize_block);
            }
        } else {
            block.push(line);
        }
    }
    if !block.is_empty() {
        submit_block(pool, &mut batch, block, &tokenize_block);
    }
    info!(tasks = batch.len(), threads = pool.threads(), "submitted tokenization tasks");

    let outcomes = pool
        .await_all(batch, super::await_options(config))
        .map_err(|e| PipelineError::from_pool(Stage::Tokenize, e))?;

    let mut corpus = Corpus::with_capacity(outcomes.len());
    for (index, outcome) in outcomes {
        match outcome {
            TaskOutcome::Done(document) => corpus.push(document),
            TaskOutcome::Failed(reason) => match config.failure_policy {
                FailurePolicy::FailFast => return Err(PipelineError::from_task(Stage::Tokenize, index, reason)),
                FailurePolicy::Isolate => {
                    warn!(index, %reason, "tokenization failed, document left empty");
                    corpus.push_failed(reason);
                }
            },
        }
    }
    debug!(documents = corpus.len(), tokens = corpus.token_count(), "corpus assembled");
    Ok(corpus)
}

/// Queue one closed block; its index is its position in the batch
fn submit_block<F>(pool: &WorkerPool, batch: &mut TaskBatch<Document>, block: Vec<String>, tokenize_block: &Arc<F>)
where
    F: Fn(&[String]) -> Result<Document, TaskError> + Send + Sync + 'static,
{
    let index = batch.len();
    let tokenize_block = Arc::clone(tokenize_block);
    pool.submit(batch, index, move || tokenize_block(&block));
}
