//! Lenient HTML scan.
//!
//! Accepts any byte soup. Comments, CDATA sections and the bodies of
//! `<script>` and `<style>` are skipped so markup-looking text inside them is
//! never treated as an image element.

use std::ops::Range;
use std::sync::OnceLock;

use regex::bytes::Regex;

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?is-u)(?P<comment><!--.*?-->)|(?P<cdata><!\[CDATA\[.*?\]\]>)|(?P<raw><(?:script|style)(?:[\s/](?:[^>"']|"[^"]*"|'[^']*')*)?>.*?</(?:script|style)\s*>)|(?P<img><(?:x?html:)?img(?:[\s/](?:[^>"']|"[^"]*"|'[^']*')*)?>)"#,
        )
        .expect("html token pattern is valid")
    })
}

/// Byte ranges of every `<img>` start tag outside comments, CDATA and raw text.
pub fn image_tag_spans(body: &[u8]) -> Vec<Range<usize>> {
    token_pattern()
        .captures_iter(body)
        .filter_map(|caps| caps.name("img").map(|m| m.range()))
        .collect()
}
