//! Plate text normalization, syntax plausibility, and garbage classification

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Broad composite grammar, checked first; a hit is enough on its own.
    /// Overlaps the itemized list on purpose - either path may accept.
    static ref COMPOSITE_GRAMMAR: Regex = Regex::new(
        r"^[A-Z]{2,3}\d{3,5}$|^\d{3,4}[A-Z]{2,3}$|^[A-Z]{3}\d{3}[A-Z]$|^[A-Z]\d{2}[A-Z]{3}$"
    )
    .unwrap();

    /// Known regional plate grammars, tested any-match.
    static ref PLATE_GRAMMARS: Vec<Regex> = vec![
        Regex::new(r"^[A-Z]{3}-?\d{2}-?\d{2}$").unwrap(),
        Regex::new(r"^[A-Z]{3}\d{3,5}$").unwrap(),
        Regex::new(r"^[A-Z]{2}\d{4,5}$").unwrap(),
        Regex::new(r"^\d{3,4}[A-Z]{3}$").unwrap(),
        Regex::new(r"^[A-Z]{3}\d{3}[A-Z]$").unwrap(),
        Regex::new(r"^[A-Z]{2,3}\d{2,5}$").unwrap(),
        Regex::new(r"^[A-Z]\d{2}[A-Z]{3}$").unwrap(),
    ];

    /// Shapes strongly associated with OCR misreads rather than real plates.
    static ref GARBAGE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"^[A-Z]{6,}$").unwrap(),
        Regex::new(r"^\d{6,}$").unwrap(),
        Regex::new(r"^[A-Z]+\d{1,2}$").unwrap(),
        Regex::new(r"^[A-Z]{1,2}\d{6,}$").unwrap(),
    ];
}

/// Plate length bounds after normalization
const MIN_PLATE_LEN: usize = 5;
const MAX_PLATE_LEN: usize = 12;

/// Strip whitespace and hyphens, uppercase. Idempotent.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .flat_map(char::to_uppercase)
        .collect()
}

/// Whether the text matches at least one known regional plate grammar.
///
/// A heuristic filter against obviously malformed strings, not a canonical
/// grammar - false negatives are acceptable.
pub fn is_plausible(raw: &str) -> bool {
    let plate = normalize(raw);
    let len = plate.chars().count();
    if !(MIN_PLATE_LEN..=MAX_PLATE_LEN).contains(&len) {
        return false;
    }

    let has_letter = plate.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = plate.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        return false;
    }

    if COMPOSITE_GRAMMAR.is_match(&plate) {
        return true;
    }
    PLATE_GRAMMARS.iter().any(|g| g.is_match(&plate))
}

/// Whether the text looks like a degenerate OCR misread.
///
/// Independent of [`is_plausible`]; a string can match both. Strings below the
/// minimum plate length are never garbage - they fail plausibility instead.
pub fn is_garbage(raw: &str) -> bool {
    let plate = normalize(raw);
    if plate.chars().count() < MIN_PLATE_LEN {
        return false;
    }
    if has_repeated_run(&plate, 5) {
        return true;
    }
    GARBAGE_PATTERNS.iter().any(|g| g.is_match(&plate))
}

/// True if `s` contains `min_run` or more consecutive identical chars.
fn has_repeated_run(s: &str, min_run: usize) -> bool {
    let mut run = 0usize;
    let mut prev: Option<char> = None;
    for c in s.chars() {
        if prev == Some(c) {
            run += 1;
        } else {
            run = 1;
            prev = Some(c);
        }
        if run >= min_run {
            return true;
        }
    }
    false
}
