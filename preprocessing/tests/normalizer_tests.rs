use prodswing_preprocessing::{normalize, Post, TextNormalizer};

fn sample_inputs() -> Vec<&'static str> {
    vec![
        "",
        "   ",
        "2024:01:01 10:00:00 I love this drone! https://x.co/abc #drone @seller",
        "2024:01:01 10:00:00 2024:01:01 10:00:00 nested timestamp",
        "Terrible battery life :( @maker_support fix it!!! #fail",
        "<br>Line one<br />line two<BR>",
        "Mixed 中文 and English, 100% sure 👍",
        "url without scheme www.example.com/path and ftp://files.example.com",
        "tabs\tand\nnewlines\r\nand\u{000b}vertical\u{000c}feeds",
        "\u{00a0}non breaking\u{2003}em space\u{0085}next line",
        "@@double ##double #",
        "https://only.a.link",
        "ALL CAPS SHOUTING!!!!",
        "numbers 123 456,789.00 and - dashes_underscores",
        "\u{0000}\u{001f}control\u{007f}chars",
    ]
}

#[test]
fn test_normalize_is_idempotent() {
    let normalizer = TextNormalizer::new();
    for input in sample_inputs() {
        let once = normalizer.normalize(input);
        let twice = normalizer.normalize(once.as_str());
        assert_eq!(once, twice, "normalization not idempotent for {:?}", input);
    }
}

#[test]
fn test_output_alphabet() {
    for input in sample_inputs() {
        let cleaned = normalize(input);
        let text = cleaned.as_str();

        assert!(
            text.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == ' '),
            "unexpected character in {:?}",
            text
        );
        assert!(!text.starts_with(' ') && !text.ends_with(' '));
        assert!(!text.contains("  "));
    }
}

#[test]
fn test_end_to_end_scenario() {
    let post = Post::new("2024:01:01 10:00:00 I love this drone! https://x.co/abc #drone @seller");
    let cleaned = TextNormalizer::new().normalize_post(&post);
    assert_eq!(cleaned.as_str(), "i love this drone");
    assert_eq!(cleaned.tokens().count(), 4);
}

#[test]
fn test_only_leading_timestamp_removed() {
    let cleaned = normalize("2024:01:01 10:00:00 2024:01:01 10:00:00 nested timestamp");
    assert_eq!(cleaned.as_str(), "20240101 100000 nested timestamp");
}
