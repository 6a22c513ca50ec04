//! Voice-friendly text helpers
//!
//! Titles and bodies written for the page read badly when spoken:
//! `(II)` should be "parte due", `S.Pietro` should be "San Pietro".
//! These helpers rewrite text for narration without touching the source.

use once_cell::sync::Lazy;
use regex::Regex;

static PARENTHETICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^)]+)\)").expect("PARENTHETICAL should compile - this is a bug"));

static PARENTHETICAL_WITH_SPACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*\(([^)]+)\)\s*").expect("PARENTHETICAL_WITH_SPACE should compile - this is a bug")
});

static SAINT_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\bSS\.?\s*([A-Z][a-zÀ-ÖØ-öø-ÿ]+)\b", "Santi ${1}"),
        (r"\bS\.?ta\s*([A-Z][a-zÀ-ÖØ-öø-ÿ]+)\b", "Santa ${1}"),
        (r"\bS\.?to\s*([A-Z][a-zÀ-ÖØ-öø-ÿ]+)\b", "Santo ${1}"),
        (r"\bS\.?\s*([A-Z][a-zÀ-ÖØ-öø-ÿ]+)\b", "San ${1}"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("saint pattern should compile - this is a bug"),
            replacement,
        )
    })
    .collect()
});

static BIBLE_BOOKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(Mt|Mc|Lc|Gv|At)\.").expect("BIBLE_BOOKS should compile - this is a bug")
});

static PUNCTUATION_SPACING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*([,;:.!?])\s*").expect("PUNCTUATION_SPACING should compile - this is a bug")
});

static MULTI_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s{2,}").expect("MULTI_SPACE should compile - this is a bug"));

const NUMBER_WORDS: [&str; 10] = [
    "uno", "due", "tre", "quattro", "cinque", "sei", "sette", "otto", "nove", "dieci",
];

const ROMAN_NUMERALS: [&str; 10] = ["I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X"];

fn spell_number(n: usize) -> String {
    match n {
        1..=10 => NUMBER_WORDS[n - 1].to_string(),
        _ => n.to_string(),
    }
}

/// Read a parenthetical segment as a part marker, if it is one
fn part_marker(segment: &str) -> Option<String> {
    let upper = segment.to_uppercase();

    if let Some(pos) = NUMBER_WORDS.iter().position(|w| w.to_uppercase() == upper) {
        return Some(format!("parte {}", NUMBER_WORDS[pos]));
    }
    if let Some(pos) = ROMAN_NUMERALS.iter().position(|r| *r == upper) {
        return Some(format!("parte {}", spell_number(pos + 1)));
    }

    // "3" or the ordinal "3°" used in corpus titles
    let digits = segment.strip_suffix('°').unwrap_or(segment);
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(n) = digits.parse::<usize>() {
            return Some(format!("parte {}", spell_number(n)));
        }
    }

    None
}

fn expand_saints(text: &str) -> String {
    SAINT_PATTERNS
        .iter()
        .fold(text.to_string(), |acc, (re, replacement)| {
            re.replace_all(&acc, *replacement).into_owned()
        })
}

fn expand_bible_books(text: &str) -> String {
    BIBLE_BOOKS
        .replace_all(text, |caps: &regex::Captures| {
            match &caps[1] {
                "Mt" => "Matteo",
                "Mc" => "Marco",
                "Lc" => "Luca",
                "Gv" => "Giovanni",
                _ => "Atti",
            }
            .to_string()
        })
        .into_owned()
}

/// Rewrite a title for narration
///
/// Part markers in parentheses become "parte <n>", any other parenthetical
/// becomes a subtitle after a dash, and saint abbreviations are expanded.
pub fn format_title_for_voice(title: &str) -> String {
    if title.trim().is_empty() {
        return title.to_string();
    }

    let segments: Vec<&str> = PARENTHETICAL
        .captures_iter(title)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().trim()))
        .collect();

    let main = if segments.is_empty() {
        title.trim().to_string()
    } else {
        PARENTHETICAL_WITH_SPACE
            .replace_all(title, " ")
            .trim()
            .to_string()
    };

    let extras: Vec<String> = segments
        .iter()
        .map(|seg| part_marker(seg).unwrap_or_else(|| seg.to_string()))
        .collect();

    let spoken_main = expand_bible_books(&expand_saints(&main));
    if extras.is_empty() {
        spoken_main
    } else {
        format!("{} — {}", spoken_main, extras.join(", "))
    }
}

/// Rewrite body text for narration
pub fn normalize_text_for_voice(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let expanded = expand_bible_books(&expand_saints(text));
    let spaced = PUNCTUATION_SPACING.replace_all(&expanded, " ${1} ");
    MULTI_SPACE.replace_all(&spaced, " ").trim().to_string()
}
