use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::Config;
use crate::models::{CleanedText, Post};

pub(crate) static TIMESTAMP_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}:\d{2}:\d{2} \d{2}:\d{2}:\d{2} ").expect("timestamp pattern is valid")
});

static SHARED: Lazy<TextNormalizer> = Lazy::new(TextNormalizer::new);

/// Normalizes `raw` with a process-wide [`TextNormalizer`].
pub fn normalize(raw: &str) -> CleanedText {
    SHARED.normalize(raw)
}

/// Deterministic post cleaner.
///
/// The passes run in a fixed order: URL, mention and hashtag stripping must
/// see the raw `://`, `@` and `#` markers, so they run before non-ASCII
/// characters and punctuation are dropped.
pub struct TextNormalizer {
    url_regex: Regex,
    mention_regex: Regex,
    hashtag_regex: Regex,
    line_break_regex: Regex,
    special_char_regex: Regex,
    whitespace_regex: Regex,
    max_text_length: usize,
}

impl TextNormalizer {
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    pub fn with_config(config: &Config) -> Self {
        Self {
            url_regex: Regex::new(r"https?://\S+").expect("url pattern is valid"),
            mention_regex: Regex::new(r"@\w+").expect("mention pattern is valid"),
            hashtag_regex: Regex::new(r"#\w+").expect("hashtag pattern is valid"),
            line_break_regex: Regex::new(r"<br\s*/?>").expect("line break pattern is valid"),
            special_char_regex: Regex::new(r"[^A-Za-z0-9\s]+").expect("special char pattern is valid"),
            whitespace_regex: Regex::new(r"\s+").expect("whitespace pattern is valid"),
            max_text_length: config.max_text_length,
        }
    }

    /// Never fails: anything that cannot be represented is dropped.
    pub fn normalize(&self, raw: &str) -> CleanedText {
        let raw = match raw.char_indices().nth(self.max_text_length) {
            Some((end, _)) => &raw[..end],
            None => raw,
        };

        let text = TIMESTAMP_PATTERN.replace(raw, "");
        // File/group/record/unit separators count as whitespace.
        let text: String = text
            .chars()
            .map(|c| if ('\x1c'..='\x1f').contains(&c) { ' ' } else { c })
            .collect();
        let text = self.url_regex.replace_all(&text, "");
        let text = self.mention_regex.replace_all(&text, "");
        let text = self.hashtag_regex.replace_all(&text, "");

        let ascii: String = text.chars().filter(char::is_ascii).collect();

        let text = self.line_break_regex.replace_all(&ascii, "");
        let text = self.special_char_regex.replace_all(&text, "");
        let lowered = text.to_lowercase();
        let collapsed = self.whitespace_regex.replace_all(&lowered, " ");

        CleanedText::new_unchecked(collapsed.trim().to_string())
    }

    pub fn normalize_post(&self, post: &Post) -> CleanedText {
        self.normalize(&post.text)
    }

    pub fn normalize_batch<S: AsRef<str>>(&self, texts: &[S]) -> Vec<CleanedText> {
        texts.iter().map(|text| self.normalize(text.as_ref())).collect()
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_post_cleaning() {
        let normalizer = TextNormalizer::new();
        let cleaned = normalizer
            .normalize("2024:01:01 10:00:00 I love this drone! https://x.co/abc #drone @seller");
        assert_eq!(cleaned.as_str(), "i love this drone");
    }

    #[test]
    fn test_long_posts_cut_at_max_length() {
        let normalizer = TextNormalizer::with_config(&Config { max_text_length: 12 });
        assert_eq!(normalizer.normalize("great phone, awful battery").as_str(), "great phone");
        assert_eq!(normalizer.normalize("éééé great phone").as_str(), "great p");
        assert_eq!(normalizer.normalize("short").as_str(), "short");
    }

    #[test]
    fn test_separator_controls_are_whitespace() {
        let normalizer = TextNormalizer::new();
        assert_eq!(normalizer.normalize("good\x1cphone").as_str(), "good phone");
        assert_eq!(normalizer.normalize("a\x1db\x1ec\x1fd").as_str(), "a b c d");
        assert_eq!(normalizer.normalize("bell\x07ring").as_str(), "bellring");
        assert_eq!(normalizer.normalize("see https://x.co/a\x1cgreat").as_str(), "see great");
    }

    #[test]
    fn test_timestamp_only_stripped_at_start() {
        let normalizer = TextNormalizer::new();
        assert_eq!(
            normalizer.normalize("bought on 2024:01:01 10:00:00 works").as_str(),
            "bought on 20240101 100000 works"
        );
        // Missing trailing space: not the timestamp prefix.
        assert_eq!(
            normalizer.normalize("2024:01:01 10:00:00").as_str(),
            "20240101 100000"
        );
    }

    #[test]
    fn test_urls_mentions_hashtags() {
        let normalizer = TextNormalizer::new();
        assert_eq!(
            normalizer.normalize("see http://a.b/c?d=1 and https://e.f").as_str(),
            "see and"
        );
        assert_eq!(normalizer.normalize("@alice @bob_2 hi").as_str(), "hi");
        assert_eq!(normalizer.normalize("#NewPhone rocks #5g").as_str(), "rocks");
    }

    #[test]
    fn test_non_ascii_dropped() {
        let normalizer = TextNormalizer::new();
        assert_eq!(normalizer.normalize("great 😀 café").as_str(), "great caf");
        assert_eq!(normalizer.normalize("日本語").as_str(), "");
    }

    #[test]
    fn test_line_breaks_and_punctuation() {
        let normalizer = TextNormalizer::new();
        assert_eq!(
            normalizer.normalize("Battery<br>dies<br/>fast<br />!!!").as_str(),
            "batterydiesfast"
        );
        assert_eq!(
            normalizer.normalize("Price: $45,000 -- WOW").as_str(),
            "price 45000 wow"
        );
    }

    #[test]
    fn test_whitespace_collapsed() {
        let normalizer = TextNormalizer::new();
        assert_eq!(
            normalizer.normalize("  This is\na test\twith\n\nspaces  ").as_str(),
            "this is a test with spaces"
        );
        assert_eq!(normalizer.normalize("").as_str(), "");
        assert_eq!(normalizer.normalize(" \t\n ").as_str(), "");
    }

    #[test]
    fn test_shared_normalizer_matches_instance() {
        let text = "Check @shop for #deals: https://shop.example/x NOW";
        assert_eq!(normalize(text), TextNormalizer::new().normalize(text));
    }

    #[test]
    fn test_normalize_post_and_batch() {
        let normalizer = TextNormalizer::new();
        let post = Post::new("2023:12:31 23:59:59 Happy new year!");
        assert_eq!(normalizer.normalize_post(&post).as_str(), "happy new year");

        let batch = normalizer.normalize_batch(&["A!", "b?", "@c"]);
        let cleaned: Vec<&str> = batch.iter().map(|c| c.as_str()).collect();
        assert_eq!(cleaned, vec!["a", "b", ""]);
    }
}
