// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fuzzy substring matching for noisy OCR output.
//
// Both strings are upper-cased and reduced to the character set
// `[A-Za-z .,;:'0-9]` (diacritics and ligatures folded through a fixed
// substitution table, anything else becomes a space). A window the length of
// the needle then slides across the haystack; each window scores the share of
// positions whose characters agree, with agreeing spaces excluded from both
// the count and the length so whitespace runs cannot inflate a score.

use std::collections::HashMap;
use std::sync::LazyLock;

use fitcheck_core::error::{FitcheckError, Result};

/// Score of a verbatim match.
pub const PERFECT_MATCH: u8 = 100;

/// Substitutions for characters outside the accepted set.
static SUBSTITUTIONS: LazyLock<HashMap<char, &'static str>> = LazyLock::new(|| {
    const TABLE: &[(&str, &str)] = &[
        ("ÀÁÂÃÄÅĀĂĄ", "A"),
        ("àáâãäåāăą", "a"),
        ("Æ", "AE"),
        ("æ", "ae"),
        ("ÇĆĈĊČ", "C"),
        ("çćĉċč", "c"),
        ("ÐĎĐ", "D"),
        ("ðďđ", "d"),
        ("ÈÉÊËĒĔĖĘĚ", "E"),
        ("èéêëēĕėęě", "e"),
        ("ĜĞĠĢ", "G"),
        ("ĝğġģ", "g"),
        ("ÌÍÎÏĨĪĬĮİ", "I"),
        ("ìíîïĩīĭįı", "i"),
        ("ĹĻĽĿŁ", "L"),
        ("ĺļľŀł", "l"),
        ("ÑŃŅŇ", "N"),
        ("ñńņň", "n"),
        ("ÒÓÔÕÖØŌŎŐ", "O"),
        ("òóôõöøōŏő", "o"),
        ("Œ", "OE"),
        ("œ", "oe"),
        ("ŔŖŘ", "R"),
        ("ŕŗř", "r"),
        ("ŚŜŞŠ", "S"),
        ("śŝşš", "s"),
        ("ß", "ss"),
        ("ŢŤ", "T"),
        ("ţť", "t"),
        ("Þ", "TH"),
        ("þ", "th"),
        ("ÙÚÛÜŨŪŬŮŰŲ", "U"),
        ("ùúûüũūŭůűų", "u"),
        ("ÝŸ", "Y"),
        ("ýÿ", "y"),
        ("ŹŻŽ", "Z"),
        ("źżž", "z"),
        ("‘’‚′`", "'"),
    ];

    let mut map = HashMap::new();
    for (sources, replacement) in TABLE {
        for c in sources.chars() {
            map.insert(c, *replacement);
        }
    }
    map
});

fn is_accepted(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ' ' | '.' | ',' | ';' | ':' | '\'')
}

/// Fold a string into the accepted character set and trim it.
///
/// Case is preserved; unmapped characters become a single space.
pub fn replace_invalid_characters(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if is_accepted(c) {
            out.push(c);
        } else if let Some(replacement) = SUBSTITUTIONS.get(&c) {
            out.push_str(replacement);
        } else {
            out.push(' ');
        }
    }
    out.trim().to_string()
}

fn normalise(text: &str) -> String {
    replace_invalid_characters(&text.to_uppercase())
}

/// How well `needle` is contained in `haystack`, as a percentage in `0..=100`.
///
/// Returns exactly [`PERFECT_MATCH`] iff the normalised needle occurs
/// verbatim in the normalised haystack, and `0` when the needle is longer
/// than the haystack.
///
/// # Errors
///
/// [`FitcheckError::InvalidInput`] if either string is empty, or if the
/// needle has no characters left after normalisation.
pub fn fuzzy_string_contains(haystack: &str, needle: &str) -> Result<u8> {
    if haystack.is_empty() {
        return Err(FitcheckError::InvalidInput("haystack must not be empty".into()));
    }
    if needle.is_empty() {
        return Err(FitcheckError::InvalidInput("needle must not be empty".into()));
    }

    let haystack = normalise(haystack);
    let needle = normalise(needle);
    if needle.is_empty() {
        return Err(FitcheckError::InvalidInput(
            "needle has no matchable characters".into(),
        ));
    }

    // Normalised strings are pure ASCII, so bytes are characters.
    let (haystack, needle) = (haystack.as_bytes(), needle.as_bytes());
    if needle.len() > haystack.len() {
        return Ok(0);
    }

    let mut best = 0;
    for window in haystack.windows(needle.len()) {
        if window == needle {
            return Ok(PERFECT_MATCH);
        }
        best = best.max(window_score(window, needle)?);
    }
    Ok(best)
}

/// Whether `needle` is contained in `haystack` to at least `min_percent`.
pub fn fuzzy_string_valid(haystack: &str, needle: &str, min_percent: u8) -> Result<bool> {
    Ok(fuzzy_string_contains(haystack, needle)? >= min_percent)
}

/// Positional agreement between one window and the needle.
fn window_score(window: &[u8], needle: &[u8]) -> Result<u8> {
    if window.len() != needle.len() {
        return Err(FitcheckError::InvalidInput(format!(
            "window length {} does not match needle length {}",
            window.len(),
            needle.len()
        )));
    }

    let mut effective_len = needle.len();
    let mut matches = 0usize;
    for (a, b) in window.iter().zip(needle) {
        if a == b {
            if *a == b' ' {
                effective_len -= 1;
            } else {
                matches += 1;
            }
        }
    }

    if effective_len == 0 {
        return Ok(0);
    }
    Ok((matches * 100 / effective_len) as u8)
}
