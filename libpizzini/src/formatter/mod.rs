//! Platform-aware content formatting
//!
//! Turns a pizzini (title + body) into text that a given platform will
//! accept: sanitized, truncated at a readable boundary where the platform
//! is tight on space, tagged with rotating hashtags and decorated in the
//! platform's house style.
//!
//! # Example
//!
//! ```
//! use libpizzini::formatter::ContentFormatter;
//!
//! let mut formatter = ContentFormatter::new();
//! let post = formatter.format_for_platform(
//!     "AIUTO (1°)",
//!     "La parola rapporto dice che una cosa c'entra con un'altra.",
//!     "twitter",
//!     "17.09.2012",
//!     true,
//! );
//! assert!(post.within_limits);
//! assert!(post.text.starts_with("AIUTO (1°)"));
//! ```

pub mod hashtags;
pub mod limits;
pub mod sanitize;
pub mod voice;

pub use hashtags::HashtagPool;
pub use limits::{optimal_posting_window, Platform, PlatformLimits};
pub use sanitize::sanitize_content;

use std::collections::HashSet;

use tracing::debug;

use crate::types::FormattedPost;
use hashtags::{append_hashtags, fitting_hashtag_count};

/// Characters kept free for hashtags when packing a microblog post
const MICROBLOG_HASHTAG_RESERVE: usize = 50;

/// Minimum room after the title before any body text is added
const MIN_BODY_ROOM: usize = 20;

/// Room kept free for the `(i/n)` counter on thread segments
const THREAD_COUNTER_RESERVE: usize = 20;

/// Share of the truncation window before which a boundary is ignored
const BOUNDARY_THRESHOLD: f64 = 0.8;

const ELLIPSIS: &str = "...";

/// Marker placed before the title on LinkedIn
const LINKEDIN_MARKER: &str = "💭";

/// Marker placed before the date line on Instagram
const INSTAGRAM_DATE_MARKER: &str = "📅";

/// Formats content for social platforms
///
/// Formatting is deterministic apart from hashtag rotation: the formatter
/// remembers every hashtag it has placed and avoids repeating it on later
/// posts. Use one formatter per publishing session.
#[derive(Debug, Clone, Default)]
pub struct ContentFormatter {
    hashtags: HashtagPool,
}

impl ContentFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Format with an empty date and hashtags enabled
    pub fn format(&mut self, title: &str, content: &str, platform: &str) -> FormattedPost {
        self.format_for_platform(title, content, platform, "", true)
    }

    /// Render one pizzini for one platform
    ///
    /// Unknown platform names are formatted as plain `title + body` and
    /// measured against the twitter limits. Never fails; empty input gives
    /// a degenerate but valid post.
    pub fn format_for_platform(
        &mut self,
        title: &str,
        content: &str,
        platform: &str,
        date: &str,
        include_hashtags: bool,
    ) -> FormattedPost {
        let platform_name = platform.trim().to_lowercase();
        let known = Platform::from_name(&platform_name);
        let limits = PlatformLimits::for_name(&platform_name);

        let base = create_base_post(title, content, known, limits);

        let selected = if include_hashtags {
            self.hashtags.select(content, known, limits.max_hashtags)
        } else {
            Vec::new()
        };

        // Hashtags are dropped, never text: shed tags until the decorated
        // post fits or none are left.
        let mut fitted = fitting_hashtag_count(&base, &selected, limits.max_text_length);
        let text = loop {
            let tagged = append_hashtags(&base, &selected[..fitted]);
            let decorated = decorate(&tagged, title, date, known);
            if fitted == 0 || decorated.chars().count() <= limits.max_text_length {
                break decorated;
            }
            fitted -= 1;
        };

        if fitted < selected.len() {
            debug!(
                platform = %platform_name,
                dropped = selected.len() - fitted,
                "Dropped hashtags that did not fit"
            );
        }

        FormattedPost::new(text, &platform_name, limits.max_text_length)
    }

    /// Split long content into a numbered thread
    ///
    /// Only twitter/x threads; every other platform gets a single formatted
    /// post. Segments carry an `(i/n)` suffix where `n` is the final segment
    /// count.
    pub fn create_thread(&mut self, title: &str, content: &str, platform: &str) -> Vec<String> {
        let known = Platform::from_name(platform);
        if !known.is_some_and(|p| p.is_microblog()) {
            return vec![self.format(title, content, platform).text];
        }

        let limit = PlatformLimits::for_name(platform).max_text_length - THREAD_COUNTER_RESERVE;
        let segments = split_into_segments(title, &sanitize_content(content), limit);
        let total = segments.len();

        segments
            .into_iter()
            .enumerate()
            .map(|(i, segment)| format!("{} ({}/{})", segment.trim_end(), i + 1, total))
            .collect()
    }

    /// Hashtags placed so far in this session
    pub fn used_hashtags(&self) -> &HashSet<String> {
        self.hashtags.used()
    }

    /// Forget hashtag usage, starting a fresh rotation
    pub fn reset_hashtags(&mut self) {
        self.hashtags.clear();
    }
}

fn create_base_post(
    title: &str,
    content: &str,
    platform: Option<Platform>,
    limits: PlatformLimits,
) -> String {
    let cleaned = sanitize_content(content);

    match platform {
        Some(p) if p.is_microblog() => {
            let available = limits
                .max_text_length
                .saturating_sub(MICROBLOG_HASHTAG_RESERVE);
            pack_microblog_post(title, &cleaned, available)
        }
        _ => format!("{}\n\n{}", title, cleaned),
    }
}

/// Title, then as much body as fits in `max_chars`
fn pack_microblog_post(title: &str, content: &str, max_chars: usize) -> String {
    let mut post = title.to_string();
    let remaining = max_chars.saturating_sub(title.chars().count());

    if remaining > MIN_BODY_ROOM {
        post.push_str("\n\n");
        post.push_str(&truncate_at_boundary(content, remaining - 2));
    }

    post
}

/// Fit `content` into `space` characters, preferring readable cut points
///
/// Within the last 20% of the window: cut after the last period; failing
/// that, at the last space with an ellipsis; failing that, hard cut with an
/// ellipsis.
pub fn truncate_at_boundary(content: &str, space: usize) -> String {
    if content.chars().count() <= space {
        return content.to_string();
    }

    let window_chars = space.saturating_sub(ELLIPSIS.len());
    let window = char_prefix(content, window_chars);
    let threshold = window_chars as f64 * BOUNDARY_THRESHOLD;
    let beyond_threshold = |byte_idx: usize| window[..byte_idx].chars().count() as f64 > threshold;

    if let Some(period) = window.rfind('.').filter(|&i| beyond_threshold(i)) {
        return window[..=period].to_string();
    }
    if let Some(space_idx) = window.rfind(' ').filter(|&i| beyond_threshold(i)) {
        return format!("{}{}", &window[..space_idx], ELLIPSIS);
    }
    format!("{}{}", window, ELLIPSIS)
}

/// Longest prefix of `s` holding at most `n` characters
fn char_prefix(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn decorate(post: &str, title: &str, date: &str, platform: Option<Platform>) -> String {
    match platform {
        Some(Platform::Instagram) => decorate_instagram(post, date),
        Some(Platform::LinkedIn) => decorate_linkedin(post, title),
        _ => post.to_string(),
    }
}

fn decorate_instagram(post: &str, date: &str) -> String {
    let mut decorated = post.to_string();
    if !date.trim().is_empty() {
        decorated.push_str(&format!("\n\n{} {}", INSTAGRAM_DATE_MARKER, date.trim()));
    }
    decorated.replace(". ", ".\n\n")
}

fn decorate_linkedin(post: &str, title: &str) -> String {
    let title = title.trim();
    if title.is_empty() {
        // Replacing an empty pattern would splice the marker everywhere
        return post.to_string();
    }
    post.replacen(title, &format!("{} {}", LINKEDIN_MARKER, title), 1)
}

/// Split text into sentences, keeping each sentence's own terminator
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            while let Some(&next) = chars.peek() {
                if !matches!(next, '.' | '!' | '?') {
                    break;
                }
                current.push(next);
                chars.next();
            }
            push_sentence(&mut sentences, &current);
            current.clear();
        }
    }
    push_sentence(&mut sentences, &current);

    sentences
}

fn push_sentence(sentences: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    let body = trimmed.trim_end_matches(['.', '!', '?']);
    if body.trim().is_empty() {
        return;
    }
    if body.len() == trimmed.len() {
        sentences.push(format!("{}.", trimmed));
    } else {
        sentences.push(trimmed.to_string());
    }
}

/// Break an over-long sentence into word-wrapped pieces of `max` chars
fn wrap_words(sentence: &str, max: usize) -> Vec<String> {
    if sentence.chars().count() <= max {
        return vec![sentence.to_string()];
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    for word in sentence.split(' ') {
        let candidate_len = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if candidate_len > max && !current.is_empty() {
            pieces.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
        while current.chars().count() > max {
            let head = char_prefix(&current, max).to_string();
            current = current[head.len()..].to_string();
            pieces.push(head);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Greedily pack sentences into segments of at most `limit` characters
fn split_into_segments(title: &str, content: &str, limit: usize) -> Vec<String> {
    let header = format!("{}\n\n", title);
    let mut segments = Vec::new();
    let mut current = header.clone();
    let mut has_body = false;

    let pieces = split_sentences(content)
        .into_iter()
        .flat_map(|s| wrap_words(&s, limit.saturating_sub(1)));

    for piece in pieces {
        let candidate = format!("{}{} ", current, piece);
        if candidate.chars().count() > limit && has_body {
            segments.push(std::mem::take(&mut current));
            current = format!("{} ", piece);
        } else {
            current = candidate;
        }
        has_body = true;
    }

    if !current.trim().is_empty() {
        segments.push(current);
    }
    segments
}
