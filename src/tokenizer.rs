//! Lowercase word tokenizer with camelCase/acronym splitting and optional
//! prefix n-gram expansion.
//!
//! Grounded in the teacher's standalone tokenizer crate (a hand-rolled
//! separator-scanning iterator over `&str`) but the splitting rule itself is
//! bespoke: runs of non-alphanumeric characters are separators, and case
//! transitions inside a run of letters split the run further.

/// Splits `text` into lowercase alphanumeric-run tokens.
///
/// Splits on every run of non-alphanumeric characters and on case
/// transitions: `HTTPRequestManager` -> `["http", "request", "manager"]`,
/// `1Password` -> `["1", "password"]`.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for run in split_alphanumeric_runs(text) {
        split_case_transitions(run, &mut tokens);
    }
    tokens
}

/// Produces, for each whole-word token in document order, the token
/// followed by all non-empty strict prefixes from length 1 up to
/// `length(token) - 1`. Duplicates are retained; the caller computes term
/// frequency.
pub fn tokenize_with_prefix_ngrams(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for token in tokenize(text) {
        let chars: Vec<char> = token.chars().collect();
        out.push(token.clone());
        for len in 1..chars.len() {
            out.push(chars[..len].iter().collect());
        }
    }
    out
}

fn split_alphanumeric_runs(text: &str) -> Vec<&str> {
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;
    let mut last_end = 0;
    for (i, c) in text.char_indices() {
        last_end = i + c.len_utf8();
        if c.is_alphanumeric() {
            if start.is_none() {
                start = Some(i);
            }
        } else if let Some(s) = start.take() {
            runs.push(&text[s..i]);
        }
    }
    if let Some(s) = start {
        runs.push(&text[s..last_end]);
    }
    runs
}

/// Splits a run of alphanumeric characters at case transitions, applying the
/// acronym rule: a run of uppercase letters followed by a lowercase letter
/// splits before the last uppercase letter (so `HTTPRequest` splits as
/// `HTTP` | `Request`, not `HTTPR` | `equest`).
fn split_case_transitions(run: &str, out: &mut Vec<String>) {
    let chars: Vec<char> = run.chars().collect();
    if chars.is_empty() {
        return;
    }
    let mut boundaries = Vec::new();
    for i in 1..chars.len() {
        let prev = chars[i - 1];
        let cur = chars[i];
        if prev.is_lowercase() && cur.is_uppercase() {
            // lower -> upper: split here ("requestManager" -> "request" | "Manager")
            boundaries.push(i);
        } else if prev.is_uppercase()
            && cur.is_uppercase()
            && chars.get(i + 1).is_some_and(|c| c.is_lowercase())
        {
            // acronym rule: ...XY followed by lowercase -> split before Y
            boundaries.push(i);
        } else if prev.is_alphabetic() && cur.is_numeric() {
            boundaries.push(i);
        } else if prev.is_numeric() && cur.is_alphabetic() {
            boundaries.push(i);
        }
    }
    let mut start = 0;
    for b in boundaries {
        push_lowercased(&chars[start..b], out);
        start = b;
    }
    push_lowercased(&chars[start..], out);
}

fn push_lowercased(chars: &[char], out: &mut Vec<String>) {
    if chars.is_empty() {
        return;
    }
    let s: String = chars.iter().collect::<String>().to_lowercase();
    out.push(s);
}
