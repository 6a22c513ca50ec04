//! Hashtag selection and rotation
//!
//! Every hashtag placed on a non-Instagram post is remembered for the
//! lifetime of the pool, so a run of consecutive posts cycles through the
//! themed vocabulary instead of repeating the same tags.

use std::collections::HashSet;

use super::limits::Platform;

/// Always leads non-Instagram selections while it is still unused
pub const ANCHOR_HASHTAG: &str = "#pizzini";

/// Content keyword to hashtag mapping, scanned in declared order
pub const KEYWORD_HASHTAGS: [(&str, &str); 8] = [
    ("rapporto", "#relazioni"),
    ("infinito", "#infinito"),
    ("libertà", "#libertà"),
    ("amico", "#amicizia"),
    ("fidarsi", "#fiducia"),
    ("pensiero", "#pensieri"),
    ("vita", "#vita"),
    ("aiuto", "#aiuto"),
];

/// General themed pool used to fill the remaining budget
pub const GENERAL_HASHTAGS: [&str; 16] = [
    "#saggezza",
    "#filosofia",
    "#riflessioni",
    "#pensieri",
    "#vita",
    "#crescita",
    "#ispirazione",
    "#meditazione",
    "#pizzini",
    "#italian",
    "#wisdom",
    "#philosophy",
    "#thoughts",
    "#life",
    "#inspiration",
    "#reflection",
];

/// Fixed Instagram set, truncated to the platform budget and never rotated
pub const INSTAGRAM_HASHTAGS: [&str; 20] = [
    "#pizzini",
    "#filosofia",
    "#saggezza",
    "#riflessioni",
    "#pensieri",
    "#ispirazione",
    "#meditazione",
    "#vita",
    "#crescita",
    "#italia",
    "#italianquotes",
    "#philosophy",
    "#wisdom",
    "#mindset",
    "#reflection",
    "#thoughts",
    "#innergrowth",
    "#dailywisdom",
    "#quoteoftheday",
    "#italianlife",
];

/// Hashtags already placed during this formatting session
#[derive(Debug, Clone, Default)]
pub struct HashtagPool {
    used: HashSet<String>,
}

impl HashtagPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick up to `max_count` hashtags for a post
    ///
    /// `raw_content` is the unsanitized body; keywords are matched
    /// case-insensitively. Instagram gets the fixed set and leaves the pool
    /// untouched.
    pub fn select(
        &mut self,
        raw_content: &str,
        platform: Option<Platform>,
        max_count: usize,
    ) -> Vec<String> {
        if platform == Some(Platform::Instagram) {
            return INSTAGRAM_HASHTAGS
                .iter()
                .take(max_count)
                .map(|h| h.to_string())
                .collect();
        }

        let mut selected = Vec::with_capacity(max_count);
        let content_lower = raw_content.to_lowercase();

        if selected.len() < max_count {
            self.take_if_unused(ANCHOR_HASHTAG, &mut selected);
        }

        for (keyword, hashtag) in KEYWORD_HASHTAGS {
            if selected.len() >= max_count {
                break;
            }
            if content_lower.contains(keyword) {
                self.take_if_unused(hashtag, &mut selected);
            }
        }

        for hashtag in GENERAL_HASHTAGS {
            if selected.len() >= max_count {
                break;
            }
            self.take_if_unused(hashtag, &mut selected);
        }

        selected
    }

    fn take_if_unused(&mut self, hashtag: &str, selected: &mut Vec<String>) {
        if self.used.insert(hashtag.to_string()) {
            selected.push(hashtag.to_string());
        }
    }

    pub fn is_used(&self, hashtag: &str) -> bool {
        self.used.contains(hashtag)
    }

    pub fn used(&self) -> &HashSet<String> {
        &self.used
    }

    pub fn clear(&mut self) {
        self.used.clear();
    }
}

/// Number of leading `hashtags` that fit after `post` within `char_limit`
///
/// All of them if the full string fits, otherwise greedily one at a time
/// in selection order.
pub fn fitting_hashtag_count(post: &str, hashtags: &[String], char_limit: usize) -> usize {
    let post_len = post.chars().count();
    let mut running = post_len;
    let mut count = 0;

    for hashtag in hashtags {
        let next = running + 1 + hashtag.chars().count();
        if next > char_limit {
            break;
        }
        running = next;
        count += 1;
    }

    count
}

/// Append hashtags separated by single spaces
pub fn append_hashtags(post: &str, hashtags: &[String]) -> String {
    if hashtags.is_empty() {
        return post.to_string();
    }
    format!("{} {}", post, hashtags.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instagram_fixed_and_not_recorded() {
        let mut pool = HashtagPool::new();
        let tags = pool.select("rapporto", Some(Platform::Instagram), 5);
        assert_eq!(
            tags,
            vec!["#pizzini", "#filosofia", "#saggezza", "#riflessioni", "#pensieri"]
        );
        assert!(pool.used().is_empty());

        let again = pool.select("altro", Some(Platform::Instagram), 5);
        assert_eq!(tags, again);
    }

    #[test]
    fn test_anchor_then_keywords() {
        let mut pool = HashtagPool::new();
        let tags = pool.select("La parola RAPPORTO e la Vita", Some(Platform::LinkedIn), 3);
        assert_eq!(tags, vec!["#pizzini", "#relazioni", "#vita"]);
    }

    #[test]
    fn test_general_pool_fills_remaining_budget() {
        let mut pool = HashtagPool::new();
        let tags = pool.select("nessuna parola chiave", Some(Platform::Facebook), 3);
        assert_eq!(tags, vec!["#pizzini", "#saggezza", "#filosofia"]);
    }

    #[test]
    fn test_rotation_across_calls() {
        let mut pool = HashtagPool::new();
        let first = pool.select("testo", Some(Platform::Twitter), 2);
        let second = pool.select("testo", Some(Platform::Twitter), 2);
        assert_eq!(first, vec!["#pizzini", "#saggezza"]);
        assert_eq!(second, vec!["#filosofia", "#riflessioni"]);
        assert!(first.iter().all(|t| !second.contains(t)));
    }

    #[test]
    fn test_keyword_hashtag_shared_with_general_pool_not_repeated() {
        let mut pool = HashtagPool::new();
        pool.select("un pensiero", Some(Platform::LinkedIn), 3);
        assert!(pool.is_used("#pensieri"));
        let tags = pool.select("un altro pensiero", Some(Platform::LinkedIn), 3);
        assert!(!tags.contains(&"#pensieri".to_string()));
    }

    #[test]
    fn test_pool_exhaustion_yields_no_tags() {
        let mut pool = HashtagPool::new();
        for _ in 0..20 {
            pool.select("vita aiuto", None, 3);
        }
        assert!(pool.select("vita", None, 3).is_empty());
        pool.clear();
        assert_eq!(pool.select("vita", None, 1), vec!["#pizzini"]);
    }

    #[test]
    fn test_budget_respected() {
        let mut pool = HashtagPool::new();
        let tags = pool.select("rapporto infinito libertà amico", Some(Platform::Twitter), 2);
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn test_fitting_hashtag_count() {
        let tags = vec!["#uno".to_string(), "#due".to_string()];
        // "ciao" (4) + " #uno" (5) + " #due" (5)
        assert_eq!(fitting_hashtag_count("ciao", &tags, 14), 2);
        assert_eq!(fitting_hashtag_count("ciao", &tags, 13), 1);
        assert_eq!(fitting_hashtag_count("ciao", &tags, 8), 0);
    }

    #[test]
    fn test_append_hashtags() {
        let tags = vec!["#uno".to_string(), "#due".to_string()];
        assert_eq!(append_hashtags("ciao", &tags), "ciao #uno #due");
        assert_eq!(append_hashtags("ciao", &[]), "ciao");
    }
}
