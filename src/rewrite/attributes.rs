//! Attribute scanning inside a single start tag.
//!
//! The scanner reports byte ranges rather than owned values so the caller can
//! replace one attribute value and copy everything else verbatim.

use std::borrow::Cow;
use std::ops::Range;
use std::sync::OnceLock;

use regex::bytes::Regex;

fn attribute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?-u)(?P<name>[^\s"'>/=]+)(?:\s*=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'|(?P<uq>[^\s"'=<>`]+)))?"#,
        )
        .expect("attribute pattern is valid")
    })
}

/// One attribute of a start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Lowercased attribute name, namespace prefix included
    pub name: String,

    /// Byte range of the raw value inside the tag, quotes excluded
    pub value: Option<Range<usize>>,
}

impl Attribute {
    /// The raw value bytes, if the attribute has a value.
    pub fn raw_value<'t>(&self, tag: &'t [u8]) -> Option<&'t [u8]> {
        self.value.clone().map(|range| &tag[range])
    }
}

/// Scan the attributes of a start tag such as `<img src="a.png" />`.
///
/// The element name is skipped. Attribute order is preserved.
pub fn scan_attributes(tag: &[u8]) -> Vec<Attribute> {
    let name_end = tag
        .iter()
        .position(|b| b.is_ascii_whitespace() || *b == b'>' || *b == b'/')
        .unwrap_or(tag.len());
    // Drop the closing `>` or `/>` so it is not read as an attribute name
    let body_end = tag
        .iter()
        .rposition(|b| *b == b'>')
        .filter(|idx| *idx >= name_end)
        .unwrap_or(tag.len());

    attribute_pattern()
        .captures_iter(&tag[name_end..body_end])
        .map(|caps| {
            let name = String::from_utf8_lossy(&caps["name"]).to_ascii_lowercase();
            let value = ["dq", "sq", "uq"]
                .iter()
                .find_map(|group| caps.name(group))
                .map(|m| (name_end + m.start())..(name_end + m.end()));
            Attribute { name, value }
        })
        .collect()
}

/// Find the first attribute with the given lowercase name.
pub fn find_attribute<'a>(attributes: &'a [Attribute], name: &str) -> Option<&'a Attribute> {
    // HTML keeps the first occurrence of a duplicated attribute
    attributes.iter().find(|attr| attr.name == name)
}

/// Decode the character references that can appear in a URL or a number.
///
/// Unknown named references are left as written.
pub fn decode_entities(value: &str) -> Cow<'_, str> {
    if !value.contains('&') {
        return Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match tail.find(';').and_then(|semi| {
            decode_reference(&tail[1..semi]).map(|decoded| (decoded, semi + 1))
        }) {
            Some((decoded, consumed)) => {
                out.push(decoded);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_reference(reference: &str) -> Option<char> {
    match reference {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = reference
                .strip_prefix("#x")
                .or_else(|| reference.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                reference.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}
