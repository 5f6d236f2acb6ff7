//! Sequential reference calculator, used as an oracle.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};

use tfidf_pipeline::tokenize;

pub fn documents(text: &str) -> Vec<Vec<String>> {
    let mut docs = Vec::new();
    let mut current: Vec<String> = Vec::new();
    for line in text.lines() {
        if line.chars().all(|c| c <= ' ') {
            if !current.is_empty() {
                docs.push(std::mem::take(&mut current));
            }
        } else {
            current.extend(tokenize(line).iter().map(|t| t.to_string()));
        }
    }
    if !current.is_empty() {
        docs.push(current);
    }
    docs
}

/// TF-IDF of every document, computed one term at a time
pub fn reference_scores(text: &str) -> Vec<HashMap<String, f64>> {
    let docs = documents(text);
    let n = docs.len() as f64;

    let mut df: HashMap<&str, u64> = HashMap::new();
    for doc in &docs {
        let distinct: HashSet<&str> = doc.iter().map(String::as_str).collect();
        for term in distinct {
            *df.entry(term).or_insert(0) += 1;
        }
    }

    docs.iter()
        .map(|doc| {
            let mut scores = HashMap::new();
            let distinct: HashSet<&str> = doc.iter().map(String::as_str).collect();
            for term in distinct {
                let count = doc.iter().filter(|t| t.as_str() == term).count() as f64;
                let tf = if doc.is_empty() { 0.0 } else { count / doc.len() as f64 };
                let idf = match df.get(term) {
                    Some(&d) if d > 0 => (n / d as f64).ln(),
                    _ => 0.0,
                };
                let score = tf * idf;
                if score > 0.0 {
                    scores.insert(term.to_string(), score);
                }
            }
            scores
        })
        .collect()
}

/// A few paragraphs with overlapping vocabulary
pub fn sample_corpus() -> String {
    let paragraphs = [
        "The cat sat on the mat.\nThe dog barked at the cat!",
        "A quick brown fox jumps over the lazy dog.",
        "Rust makes concurrency safe.\nThreads share nothing mutable here.",
        "O coração da cidade bate forte; a ação começa às 8h.",
        "Cats and dogs, dogs and cats: 42 of them.",
        "the the the",
        "Concurrency is not parallelism, but parallelism needs concurrency.",
    ];
    let mut text = String::from("\n\n");
    for (i, p) in paragraphs.iter().enumerate() {
        text.push_str(p);
        text.push('\n');
        // vary the separators
        text.push_str(if i % 2 == 0 { "\n" } else { "\n   \n\n" });
    }
    text
}
