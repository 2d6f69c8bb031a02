//! Text normalization shared by the matcher and the formatter.
//!
//! Everything compared during scoring goes through [`slugify`] first, so both
//! sides of a comparison are lowercase ASCII words joined by `-`.

use any_ascii::any_ascii;
use once_cell::sync::Lazy;
use regex::Regex;
use strsim::normalized_levenshtein;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Apostrophes are dropped rather than turned into separators ("don't" → "dont").
pub static APOSTROPHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"'+").unwrap());

/// Any run of characters that is not a lowercase ASCII letter or digit.
pub static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Check if a character is a Unicode combining mark (diacritical mark).
/// Used to filter out accents during normalization.
pub fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0xFE20..=0xFE2F)
}

/// Fold Unicode text to ASCII by applying NFKD decomposition and removing combining marks.
/// e.g., "Beyoncé" → "beyonce", "naïve" → "naive"
pub fn fold_to_ascii(s: &str) -> String {
    // First strip diacritics via NFKD decomposition
    let stripped: String = s.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    // Then transliterate any remaining non-ASCII (Cyrillic, Hebrew, CJK, etc.)
    any_ascii(&stripped).to_lowercase()
}

/// Convert curly quotes and stray accent marks to straight quotes.
pub fn normalize_quotes(s: &str) -> String {
    s.replace(['\u{2018}', '\u{2019}'], "'")  // Left/right single curly quotes
        .replace(['\u{201C}', '\u{201D}'], "\"")  // Left/right double curly quotes
        .replace(['\u{00B4}', '\u{0060}'], "'")  // Acute accent and grave accent
}

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Canonical comparison form: ASCII-folded, lowercase, punctuation stripped,
/// words joined by single `-`.
/// e.g., "Rick Astley - Never Gonna Give You Up!" → "rick-astley-never-gonna-give-you-up"
pub fn slugify(value: &str) -> String {
    let folded = fold_to_ascii(&normalize_quotes(value));
    let without_apostrophes = APOSTROPHES.replace_all(&folded, "");
    NON_ALNUM
        .replace_all(&without_apostrophes, "-")
        .trim_matches('-')
        .to_string()
}

/// Words of an already slugified string.
pub fn slug_words(slug: &str) -> impl Iterator<Item = &str> {
    slug.split(|c: char| c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
}

/// Partial similarity percentage (0.0 to 100.0) between two slugified strings.
///
/// The shorter string is compared against every window of the same length in
/// the longer one and the best normalized Levenshtein similarity wins, so a
/// short artist name fully contained in a long title scores 100.
pub fn match_percentage(a: &str, b: &str) -> f64 {
    if a == b {
        return 100.0;
    }

    let a_len = a.chars().count();
    let b_len = b.chars().count();
    let (short, long, short_len) = if a_len <= b_len { (a, b, a_len) } else { (b, a, b_len) };

    if short_len == 0 {
        return 0.0;
    }

    let long_chars: Vec<char> = long.chars().collect();
    let mut best: f64 = 0.0;
    for window in long_chars.windows(short_len) {
        let window: String = window.iter().collect();
        let similarity = normalized_levenshtein(short, &window);
        if similarity > best {
            best = similarity;
            if best >= 1.0 {
                break;
            }
        }
    }

    best * 100.0
}

// ============================================================================
// TESTS
// ============================================================================
