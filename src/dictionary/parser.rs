// dictionary/parser.rs
use regex::Regex;

use crate::error::LineError;

lazy_static::lazy_static! {
    // Explicit ASCII whitespace only: 0xA0 and friends are glyphs in some dictionaries.
    static ref FIELD_SEPARATOR: Regex = Regex::new(r"[ \t]+").unwrap();
}

/// One indexed word and its phoneme sequence.
pub type Entry = (String, Vec<String>);

fn is_annotation(token: &str) -> bool {
    token.starts_with('[') || token.starts_with('@')
}

/// Parses one dictionary line into zero or more entries.
///
/// Understands CMU style variants (`word(2)`), Julius compounds
/// (`word1+word2`) and Julius/Sphinx annotations (`[...]`, `@...`).
/// `line_number` is 1-based and only used for diagnostics.
pub fn parse_line(
    line: &str,
    dictionary_id: &str,
    line_number: usize,
) -> Result<Vec<Entry>, LineError> {
    // Ends are trimmed of any Unicode whitespace; inside the line only ASCII
    // spaces and tabs separate fields.
    let line = line.trim();
    if line.is_empty() {
        return Ok(Vec::new());
    }

    let mut tokens = FIELD_SEPARATOR.split(line);
    let mut word = tokens.next().unwrap_or_default();
    let phonemes: Vec<String> = tokens
        .filter(|t| !t.is_empty() && !is_annotation(t))
        .map(|t| t.to_string())
        .collect();

    if let Some(idx) = word.find('(') {
        if idx > 0 {
            word = &word[..idx];
        }
    }

    let words: Vec<&str> = word.split('+').filter(|w| !w.is_empty()).collect();
    if words.is_empty() {
        return Err(LineError {
            dictionary_id: dictionary_id.to_string(),
            line: line_number,
            reason: format!("no word in {:?}", word),
        });
    }

    Ok(words
        .into_iter()
        .map(|w| (w.to_string(), phonemes.clone()))
        .collect())
}
