mod common;

use std::{
    io::{self, Cursor},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use approx::assert_abs_diff_eq;
use tfidf_pipeline::{
    Corpus, DefaultTfIdfEngine, Document, DocumentFrequency, DocumentScores, FailurePolicy, PipelineConfig,
    PipelineError, ScoreMap, Stage, TaskError, TfIdfEngine, TfIdfPipeline,
};

/// Default engine that fails on one document
struct FailingEngine {
    fail_at: usize,
    panic: bool,
}

impl TfIdfEngine for FailingEngine {
    fn tf(&self, count: u64, doc_len: u64) -> f64 {
        DefaultTfIdfEngine.tf(count, doc_len)
    }

    fn idf(&self, doc_num: u64, doc_freq: u64) -> f64 {
        DefaultTfIdfEngine.idf(doc_num, doc_freq)
    }

    fn score_document(&self, index: usize, document: &Document, df: &DocumentFrequency) -> Result<ScoreMap, TaskError> {
        if index == self.fail_at {
            if self.panic {
                panic!("simulated crash in document {index}");
            }
            return Err(TaskError::failed("simulated failure"));
        }
        DefaultTfIdfEngine.score_document(index, document, df)
    }
}

/// Default engine that takes its time
struct SlowEngine(Duration);

impl TfIdfEngine for SlowEngine {
    fn tf(&self, count: u64, doc_len: u64) -> f64 {
        thread::sleep(self.0);
        DefaultTfIdfEngine.tf(count, doc_len)
    }

    fn idf(&self, doc_num: u64, doc_freq: u64) -> f64 {
        DefaultTfIdfEngine.idf(doc_num, doc_freq)
    }
}

/// Document 0 stalls, document 1 fails at once, the rest take a little time
struct StallThenFail {
    scored: Arc<AtomicUsize>,
}

impl TfIdfEngine for StallThenFail {
    fn tf(&self, count: u64, doc_len: u64) -> f64 {
        DefaultTfIdfEngine.tf(count, doc_len)
    }

    fn idf(&self, doc_num: u64, doc_freq: u64) -> f64 {
        DefaultTfIdfEngine.idf(doc_num, doc_freq)
    }

    fn score_document(&self, index: usize, document: &Document, df: &DocumentFrequency) -> Result<ScoreMap, TaskError> {
        match index {
            0 => thread::sleep(Duration::from_millis(1000)),
            1 => return Err(TaskError::failed("boom")),
            _ => thread::sleep(Duration::from_millis(50)),
        }
        self.scored.fetch_add(1, Ordering::SeqCst);
        DefaultTfIdfEngine.score_document(index, document, df)
    }
}

fn config(threads: usize) -> PipelineConfig {
    PipelineConfig::new().with_threads(threads)
}

fn assert_matches_reference(text: &str, threads: usize) {
    let matrix = TfIdfPipeline::new(config(threads)).run_str(text).unwrap();
    let expected = common::reference_scores(text);
    assert_eq!(matrix.len(), expected.len());
    for (i, want) in expected.iter().enumerate() {
        let got = matrix.scores(i).unwrap();
        assert_eq!(got.len(), want.len(), "term count mismatch in document {i}");
        for (term, score) in want {
            let actual = got.get(term).unwrap_or_else(|| panic!("missing {term} in document {i}"));
            assert_abs_diff_eq!(actual, *score, epsilon = 1e-9);
        }
    }
}

#[test]
fn empty_input_yields_empty_matrix() {
    let pipeline = TfIdfPipeline::default();
    assert!(pipeline.run_str("").unwrap().is_empty());
    assert!(pipeline.run_str("\n\n   \n").unwrap().is_empty());
    assert!(pipeline.run(Vec::<io::Result<String>>::new()).unwrap().is_empty());
}

#[test]
fn single_document_has_no_significant_terms() {
    let matrix = TfIdfPipeline::default().run_str("the cat sat").unwrap();
    assert_eq!(matrix.len(), 1);
    assert!(!matrix.is_failed(0));
    assert!(matrix.scores(0).unwrap().is_empty());
}

#[test]
fn two_documents_score_their_rare_terms() {
    let matrix = TfIdfPipeline::new(config(2)).run_str("cat dog\n\ncat cat bird").unwrap();
    assert_eq!(matrix.len(), 2);

    let first = matrix.scores(0).unwrap();
    assert_eq!(first.len(), 1);
    assert!(!first.contains_term("cat"));
    assert_abs_diff_eq!(first.get("dog").unwrap(), 2f64.ln() / 2.0, epsilon = 1e-12);
    assert_abs_diff_eq!(first.get("dog").unwrap(), 0.3466, epsilon = 1e-4);

    let second = matrix.scores(1).unwrap();
    assert_eq!(second.len(), 1);
    assert!(!second.contains_term("cat"));
    assert_abs_diff_eq!(second.get("bird").unwrap(), 2f64.ln() / 3.0, epsilon = 1e-12);
    assert_abs_diff_eq!(second.get("bird").unwrap(), 0.2310, epsilon = 1e-4);
}

#[test]
fn failed_scoring_task_is_isolated() {
    let text = "cat dog\n\ncat fish\n\ncat cat bird";
    for panic in [false, true] {
        let pipeline = TfIdfPipeline::with_engine(config(3), FailingEngine { fail_at: 1, panic });
        let matrix = pipeline.run_str(text).unwrap();
        let expected = common::reference_scores(text);

        assert_eq!(matrix.len(), 3);
        assert_eq!(matrix.failed_indices(), vec![1]);
        match matrix.get(1) {
            Some(DocumentScores::Failed(TaskError::Panicked(msg))) => {
                assert!(panic);
                assert!(msg.contains("document 1"));
            }
            Some(DocumentScores::Failed(TaskError::Failed(msg))) => {
                assert!(!panic);
                assert_eq!(msg, "simulated failure");
            }
            other => panic!("unexpected slot: {other:?}"),
        }
        for i in [0, 2] {
            let got = matrix.scores(i).unwrap();
            assert_eq!(got.len(), expected[i].len());
            for (term, score) in &expected[i] {
                assert_abs_diff_eq!(got.get(term).unwrap(), *score, epsilon = 1e-12);
            }
        }
    }
}

#[test]
fn failed_scoring_task_aborts_under_fail_fast() {
    let config = config(2).with_failure_policy(FailurePolicy::FailFast);
    let pipeline = TfIdfPipeline::with_engine(config, FailingEngine { fail_at: 1, panic: false });
    let err = pipeline.run_str("a b\n\nc d\n\ne f").unwrap_err();
    match &err {
        PipelineError::TaskFailed { stage, index, reason } => {
            assert_eq!(*stage, Stage::Score);
            assert_eq!(*index, 1);
            assert_eq!(reason, &TaskError::failed("simulated failure"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.index(), Some(1));
}

#[test]
fn panicking_scoring_task_aborts_under_fail_fast() {
    let config = config(2).with_failure_policy(FailurePolicy::FailFast);
    let pipeline = TfIdfPipeline::with_engine(config, FailingEngine { fail_at: 2, panic: true });
    let err = pipeline.run_str("a b\n\nc d\n\ne f\n\ng h").unwrap_err();
    match &err {
        PipelineError::TaskFailed { stage: Stage::Score, index: 2, reason: TaskError::Panicked(msg) } => {
            assert!(msg.contains("document 2"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn fail_fast_aborts_without_waiting_for_earlier_documents() {
    let scored = Arc::new(AtomicUsize::new(0));
    let config = config(2).with_failure_policy(FailurePolicy::FailFast);
    let pipeline = TfIdfPipeline::with_engine(config, StallThenFail { scored: Arc::clone(&scored) });
    let text = (0..20).map(|i| format!("word{}", "x".repeat(i))).collect::<Vec<_>>().join("\n\n");

    let started = Instant::now();
    let err = pipeline.run_str(&text).unwrap_err();
    assert!(started.elapsed() < Duration::from_millis(800), "abort waited for document 0");
    assert!(matches!(err, PipelineError::TaskFailed { stage: Stage::Score, index: 1, .. }), "{err}");

    // documents queued behind the failure are never scored
    thread::sleep(Duration::from_millis(300));
    assert!(scored.load(Ordering::SeqCst) <= 3, "scored {}", scored.load(Ordering::SeqCst));
}

#[test]
fn tokenization_failure_slot_is_carried_into_matrix() {
    let mut corpus = Corpus::new();
    corpus.push(Document::from_lines(&["cat dog"]));
    corpus.push_failed(TaskError::Panicked("tokenizer crashed".into()));
    corpus.push(Document::from_lines(&["cat bird"]));

    let matrix = TfIdfPipeline::new(config(2)).score(corpus).unwrap();
    assert_eq!(matrix.len(), 3);
    assert_eq!(matrix.failed_indices(), vec![1]);
    // the failed slot still counts as a document: N = 3
    assert_abs_diff_eq!(matrix.scores(0).unwrap().get("cat").unwrap(), 0.5 * 1.5f64.ln(), epsilon = 1e-12);
    assert_abs_diff_eq!(matrix.scores(2).unwrap().get("bird").unwrap(), 0.5 * 3f64.ln(), epsilon = 1e-12);
}

#[test]
fn matches_sequential_reference() {
    let text = common::sample_corpus();
    for threads in [1, 2, 4] {
        assert_matches_reference(&text, threads);
    }
}

#[test]
fn output_is_independent_of_thread_count() {
    let text = common::sample_corpus().repeat(20);
    let baseline = TfIdfPipeline::new(config(1)).run_str(&text).unwrap();
    for threads in [2, 3, 8] {
        let matrix = TfIdfPipeline::new(config(threads)).run_str(&text).unwrap();
        assert_eq!(matrix, baseline);
        assert_eq!(
            serde_json::to_string(&matrix).unwrap(),
            serde_json::to_string(&baseline).unwrap()
        );
    }
}

#[test]
fn matrix_is_aligned_with_input_blocks() {
    let blocks: Vec<String> = (0..40).map(|i| format!("shared unique{}", "z".repeat(i + 1))).collect();
    let text = blocks.join("\n\n");
    let matrix = TfIdfPipeline::new(config(4)).run_str(&text).unwrap();
    assert_eq!(matrix.len(), 40);
    for i in 0..40 {
        let scores = matrix.scores(i).unwrap();
        let term = format!("unique{}", "z".repeat(i + 1));
        assert_eq!(scores.len(), 1);
        assert_abs_diff_eq!(scores.get(&term).unwrap(), 0.5 * 40f64.ln(), epsilon = 1e-12);
    }
}

#[test]
fn scores_stay_within_bounds() {
    let text = common::sample_corpus();
    let matrix = TfIdfPipeline::default().run_str(&text).unwrap();
    let max = (matrix.len() as f64).ln();
    for row in matrix.iter() {
        for (_, score) in row.scores().unwrap().iter() {
            assert!(score > 0.0);
            assert!(score <= max);
        }
    }
}

#[test]
fn reads_from_buffered_reader() {
    let reader = Cursor::new("cat dog\n\ncat cat bird\n");
    let matrix = TfIdfPipeline::default().run_reader(reader).unwrap();
    assert_eq!(matrix.len(), 2);
    assert!(matrix.scores(0).unwrap().contains_term("dog"));
}

#[test]
fn read_failure_aborts_the_run() {
    let input = vec![
        Ok("cat dog".to_string()),
        Ok(String::new()),
        Ok("bird".to_string()),
        Err(io::Error::new(io::ErrorKind::Other, "disk on fire")),
    ];
    let err = TfIdfPipeline::default().run(input).unwrap_err();
    match &err {
        PipelineError::SourceRead { line, source } => {
            assert_eq!(*line, 4);
            assert_eq!(source.to_string(), "disk on fire");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn slow_phase_times_out() {
    let config = config(1).with_phase_timeout(Duration::from_millis(50));
    let pipeline = TfIdfPipeline::with_engine(config, SlowEngine(Duration::from_millis(400)));
    let err = pipeline.run_str("a\n\nb").unwrap_err();
    assert!(matches!(err, PipelineError::Timeout { stage: Stage::Score, .. }), "{err}");
}

#[test]
fn expired_tokenize_phase_times_out() {
    let pipeline = TfIdfPipeline::new(config(2).with_phase_timeout(Duration::ZERO));
    let err = pipeline.run_str("a\n\nb").unwrap_err();
    match &err {
        PipelineError::Timeout { stage, pending, timeout } => {
            assert_eq!(*stage, Stage::Tokenize);
            assert_eq!(*pending, 2);
            assert_eq!(*timeout, Duration::ZERO);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn cancel_handle_interrupts_reading() {
    let pipeline = TfIdfPipeline::default();
    let cancel = pipeline.cancel_handle();
    let slow_lines = (0..100).map(|i| {
        thread::sleep(Duration::from_millis(20));
        Ok::<_, io::Error>(if i % 2 == 0 { format!("line{}", "s".repeat(i % 5)) } else { String::new() })
    });
    let trigger = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        cancel.cancel();
    });

    let started = Instant::now();
    let err = pipeline.run(slow_lines).unwrap_err();
    trigger.join().unwrap();
    assert!(matches!(err, PipelineError::Interrupted { stage: Stage::Tokenize }), "{err}");
    assert!(started.elapsed() < Duration::from_millis(1000), "read the whole source first");
}

#[test]
fn cancel_handle_interrupts_a_run() {
    let pipeline = TfIdfPipeline::with_engine(config(1), SlowEngine(Duration::from_millis(400)));
    let cancel = pipeline.cancel_handle();
    let trigger = thread::spawn(move || {
        thread::sleep(Duration::from_millis(150));
        cancel.cancel();
    });
    let err = pipeline.run_str("a b\n\nc d\n\ne f").unwrap_err();
    trigger.join().unwrap();
    assert!(matches!(err, PipelineError::Interrupted { stage: Stage::Score }), "{err}");

    // a reset handle lets the same pipeline run again
    pipeline.cancel_handle().reset();
    assert_eq!(pipeline.run_str("a\n\nb").unwrap().len(), 2);
}
