use std::{collections::HashSet, sync::Arc};

use ahash::RandomState;

/// A normalized word.
/// Shared allocation, compared by content.
pub type Token = Arc<str>;

/// accented latin letters kept next to ascii a-z
const ACCENTED: &[char] = &['á', 'é', 'í', 'ó', 'ú', 'â', 'ê', 'î', 'ô', 'û', 'ã', 'õ', 'ç'];

/// Whether a (lower-cased) character survives normalization
#[inline]
pub fn is_term_char(c: char) -> bool {
    c.is_ascii_lowercase() || ACCENTED.contains(&c)
}

/// Word separators: ASCII space, tab, line feed, vertical tab, form feed and
/// carriage return. Unicode spaces are not separators.
#[inline]
pub fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\u{0B}' | '\u{0C}' | '\r')
}

/// Lower-case the line and drop everything that is neither a term character
/// nor a separator
pub fn normalize(line: &str) -> String {
    line.to_lowercase()
        .chars()
        .filter(|&c| is_term_char(c) || is_separator(c))
        .collect()
}

/// Deduplicates token allocations inside one unit of work
#[derive(Debug, Default)]
pub struct TermInterner {
    terms: HashSet<Token, RandomState>,
}

impl TermInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the shared token for `term`, allocating it on first sight
    pub fn intern(&mut self, term: &str) -> Token {
        if let Some(token) = self.terms.get(term) {
            return Arc::clone(token);
        }
        let token: Token = Arc::from(term);
        self.terms.insert(Arc::clone(&token));
        token
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Split one line into normalized tokens.
/// Never fails; garbage in gives an empty vector.
///
/// # Examples
/// ```
/// use tfidf_pipeline::vectorizer::token::tokenize;
/// let tokens = tokenize("O Ação, 42 vezes!");
/// let tokens: Vec<&str> = tokens.iter().map(|t| t.as_ref()).collect();
/// assert_eq!(tokens, vec!["o", "ação", "vezes"]);
/// ```
pub fn tokenize(line: &str) -> Vec<Token> {
    let mut interner = TermInterner::new();
    let mut out = Vec::new();
    tokenize_into(line, &mut interner, &mut out);
    out
}

/// Tokenize `line` and append the tokens to `out`
pub fn tokenize_into(line: &str, interner: &mut TermInterner, out: &mut Vec<Token>) {
    let normalized = normalize(line);
    out.extend(
        normalized
            .split(is_separator)
            .filter(|word| !word.is_empty())
            .map(|word| interner.intern(word)),
    );
}

/// Tokenize every line of a block and concatenate the results
pub fn tokenize_lines<T>(lines: &[T]) -> Vec<Token>
where
    T: AsRef<str>,
{
    let mut interner = TermInterner::new();
    let mut out = Vec::new();
    for line in lines {
        tokenize_into(line.as_ref(), &mut interner, &mut out);
    }
    out
}
