//! Content sanitization
//!
//! Source bodies come out of an XML export and carry entity escapes,
//! stray markup, typographic quotes and irregular spacing. `sanitize_content`
//! flattens all of that into a single line of plain text.
//!
//! The result is a fixpoint: sanitizing already-sanitized text returns it
//! unchanged.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Punctuation that gets exactly one trailing space
const SPACED_PUNCTUATION: [char; 6] = ['.', '!', '?', ',', ';', ':'];

/// Upper bound on sanitization passes before giving up on convergence
const MAX_PASSES: usize = 8;

static TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]+>").expect("TAG_REGEX should compile - this is a bug"));

static ENTITY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]{1,6}|#[0-9]{1,7}|[a-zA-Z]{2,8});")
        .expect("ENTITY_REGEX should compile - this is a bug")
});

/// Sanitize a raw content body for publishing
pub fn sanitize_content(content: &str) -> String {
    let mut current = sanitize_pass(content);
    for _ in 0..MAX_PASSES {
        let next = sanitize_pass(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn sanitize_pass(input: &str) -> String {
    let decoded = decode_entities(input);
    let untagged = TAG_REGEX.replace_all(&decoded, "");
    let quoted = normalize_quotes(&untagged);
    let collapsed = quoted.split_whitespace().collect::<Vec<_>>().join(" ");
    normalize_punctuation_spacing(&collapsed)
}

/// Decode the HTML/XML entities that show up in the corpus
pub fn decode_entities(input: &str) -> String {
    ENTITY_REGEX
        .replace_all(input, |caps: &Captures| {
            let body = &caps[1];
            decode_entity(body).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn decode_entity(body: &str) -> Option<String> {
    if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
        return u32::from_str_radix(hex, 16)
            .ok()
            .and_then(char::from_u32)
            .map(String::from);
    }
    if let Some(dec) = body.strip_prefix('#') {
        return dec
            .parse::<u32>()
            .ok()
            .and_then(char::from_u32)
            .map(String::from);
    }

    let decoded = match body {
        "amp" => "&",
        "quot" => "\"",
        "apos" => "'",
        "lt" => "<",
        "gt" => ">",
        "nbsp" => " ",
        "laquo" | "raquo" | "ldquo" | "rdquo" => "\"",
        "lsquo" | "rsquo" => "'",
        "hellip" => "...",
        "agrave" => "à",
        "egrave" => "è",
        "eacute" => "é",
        "igrave" => "ì",
        "ograve" => "ò",
        "ugrave" => "ù",
        "Egrave" => "È",
        _ => return None,
    };
    Some(decoded.to_string())
}

fn normalize_quotes(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '«' | '»' | '“' | '”' | '„' => '"',
            '‘' | '’' => '\'',
            other => other,
        })
        .collect()
}

fn is_spaced_punctuation(c: char) -> bool {
    SPACED_PUNCTUATION.contains(&c)
}

/// Remove space before punctuation runs and leave exactly one after
///
/// Decimal separators and clock times (`3.14`, `12:30`, `1,5`) are left
/// untouched. No space is added before a closing bracket or at the end.
fn normalize_punctuation_spacing(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if !is_spaced_punctuation(c) {
            out.push(c);
            i += 1;
            continue;
        }

        let start = i;
        while i < chars.len() && is_spaced_punctuation(chars[i]) {
            i += 1;
        }

        let between_digits = i - start == 1
            && matches!(c, '.' | ',' | ':')
            && start > 0
            && chars[start - 1].is_ascii_digit()
            && i < chars.len()
            && chars[i].is_ascii_digit();
        if between_digits {
            out.push(c);
            continue;
        }

        while out.ends_with(' ') {
            out.pop();
        }
        out.extend(&chars[start..i]);

        while i < chars.len() && chars[i] == ' ' {
            i += 1;
        }
        if i < chars.len() && !matches!(chars[i], ')' | ']') {
            out.push(' ');
        }
    }

    out
}
