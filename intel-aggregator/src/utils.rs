/// Text processing utilities
pub mod text {
    pub const ELLIPSIS: &str = "...";

    /// Keep the first `max_chars` characters, appending `...` when anything was cut.
    /// Counts characters, not bytes, so CJK text is cut on a char boundary.
    pub fn truncate_chars(text: &str, max_chars: usize) -> String {
        match text.char_indices().nth(max_chars) {
            Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], ELLIPSIS),
            None => text.to_string(),
        }
    }

    /// Like `truncate_chars` but without the marker.
    pub fn clip_chars(text: &str, max_chars: usize) -> &str {
        match text.char_indices().nth(max_chars) {
            Some((byte_idx, _)) => &text[..byte_idx],
            None => text,
        }
    }

    /// Collapse runs of whitespace into single spaces
    pub fn normalize_whitespace(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// HTML helpers for feed content
pub mod html {
    /// Extract clean text content from HTML
    pub fn extract_text(html: &str) -> String {
        let stripped = html
            .chars()
            .fold((String::new(), false), |(mut text, in_tag), c| match c {
                '<' => (text, true),
                '>' => {
                    text.push(' ');
                    (text, false)
                }
                _ if !in_tag => {
                    text.push(c);
                    (text, in_tag)
                }
                _ => (text, in_tag),
            })
            .0;

        let decoded = html_escape::decode_html_entities(&stripped);
        super::text::normalize_whitespace(&decoded)
    }
}

/// URL utilities
pub mod url {
    use url::Url;

    /// Extract domain from URL
    pub fn extract_domain(url_str: &str) -> Option<String> {
        Url::parse(url_str)
            .ok()
            .and_then(|url| url.domain().map(|d| d.trim_start_matches("www.").to_string()))
    }

    /// Only http(s) feeds are fetched
    pub fn is_valid_feed_url(url_str: &str) -> bool {
        match Url::parse(url_str) {
            Ok(url) => url.scheme() == "http" || url.scheme() == "https",
            Err(_) => false,
        }
    }
}
