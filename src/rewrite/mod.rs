//! Rewriting of `<img>` elements in HTML and XHTML documents.
//!
//! For every qualifying image element the rewriter inserts a signed directive
//! segment into `src`, immediately before the file name:
//!
//! ```text
//! <img src="/static/photo.jpg" width="640" height="480">
//!                   ↓
//! <img src="/static/bitblt-640x480-<sig>/photo.jpg" width="640" height="480">
//! ```
//!
//! The document is never re-serialised. The scan yields the byte ranges of
//! image start tags, and the output is a sequence of literal fragments (copied
//! verbatim from the input) and rewritten tags, concatenated once. Anything
//! that is not a rewritten `src` value comes out byte-for-byte identical.
//!
//! # Parse Modes
//!
//! - [`ParseMode::Xml`]: strict scan for XHTML documents, only attempted when
//!   XHTML mode is enabled
//! - [`ParseMode::Html`]: lenient scan, used directly or as the fallback when
//!   the strict scan rejects the document

mod attributes;
mod html;
mod url;
mod xhtml;

use std::ops::Range;
use std::sync::OnceLock;

use bytes::Bytes;
use regex::Regex;
use tracing::debug;

use crate::directive::{Directive, Signer};

pub use attributes::{decode_entities, find_attribute, scan_attributes, Attribute};
pub use url::{AppScope, UrlParts};
pub use xhtml::{XmlScanError, XHTML_NAMESPACE};

// =============================================================================
// Types
// =============================================================================

/// How the document was scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Well-formed XML
    Xml,
    /// Lenient HTML
    Html,
}

/// Output of a rewrite pass.
#[derive(Debug, Clone)]
pub struct Rewritten {
    /// The rewritten document
    pub body: Bytes,

    /// Scan mode that produced the output; `None` when the input was empty
    pub mode: Option<ParseMode>,

    /// Number of image elements rewritten
    pub rewritten: usize,
}

/// A piece of output: either input bytes copied as-is or a rewritten tag.
enum Fragment<'a> {
    Literal(&'a [u8]),
    Rewritten(Vec<u8>),
}

impl Fragment<'_> {
    fn as_bytes(&self) -> &[u8] {
        match self {
            Fragment::Literal(bytes) => bytes,
            Fragment::Rewritten(bytes) => bytes,
        }
    }
}

fn existing_directive_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^bitblt-(?:[0-9]+|None)x(?:[0-9]+|None)-[a-z0-9]+$")
            .expect("directive segment pattern is valid")
    })
}

// =============================================================================
// Tag Rewriter
// =============================================================================

/// Rewrites qualifying image elements to carry a signed directive.
#[derive(Debug, Clone)]
pub struct TagRewriter {
    signer: Signer,
    xhtml: bool,
}

impl TagRewriter {
    /// Create a rewriter in lenient HTML mode.
    pub fn new(signer: Signer) -> Self {
        Self {
            signer,
            xhtml: false,
        }
    }

    /// Try a strict XHTML scan first, falling back to lenient HTML.
    pub fn with_xhtml(mut self, xhtml: bool) -> Self {
        self.xhtml = xhtml;
        self
    }

    /// Rewrite a document.
    ///
    /// When `app_url` is set, only `src` values without a network location or
    /// falling under `app_url` are rewritten. Scheme and host compare
    /// case-insensitively and default ports are ignored.
    pub fn rewrite(&self, body: &[u8], app_url: Option<&str>) -> Rewritten {
        if body.is_empty() {
            return Rewritten {
                body: Bytes::new(),
                mode: None,
                rewritten: 0,
            };
        }

        let (spans, mode) = self.scan(body);
        let scope = app_url.map(AppScope::new);

        let mut fragments = Vec::with_capacity(spans.len() * 2 + 1);
        let mut cursor = 0;
        let mut rewritten = 0;

        for span in spans {
            let tag = &body[span.clone()];
            if let Some(new_tag) = self.rewrite_tag(tag, scope.as_ref()) {
                fragments.push(Fragment::Literal(&body[cursor..span.start]));
                fragments.push(Fragment::Rewritten(new_tag));
                cursor = span.end;
                rewritten += 1;
            }
        }

        if rewritten == 0 {
            return Rewritten {
                body: Bytes::copy_from_slice(body),
                mode: Some(mode),
                rewritten,
            };
        }

        fragments.push(Fragment::Literal(&body[cursor..]));
        let total = fragments.iter().map(|f| f.as_bytes().len()).sum();
        let mut out = Vec::with_capacity(total);
        for fragment in &fragments {
            out.extend_from_slice(fragment.as_bytes());
        }

        debug!(images = rewritten, mode = ?mode, "Rewrote image tags");

        Rewritten {
            body: Bytes::from(out),
            mode: Some(mode),
            rewritten,
        }
    }

    fn scan(&self, body: &[u8]) -> (Vec<Range<usize>>, ParseMode) {
        if self.xhtml {
            match xhtml::image_tag_spans(body) {
                Ok(spans) => return (spans, ParseMode::Xml),
                Err(e) => {
                    debug!(error = %e, "Strict XHTML scan failed, falling back to HTML");
                }
            }
        }
        (html::image_tag_spans(body), ParseMode::Html)
    }

    /// Rewrite one start tag, or `None` if the element does not qualify.
    fn rewrite_tag(&self, tag: &[u8], scope: Option<&AppScope>) -> Option<Vec<u8>> {
        let attrs = scan_attributes(tag);

        let width = dimension_attribute(tag, &attrs, "width")?;
        let height = dimension_attribute(tag, &attrs, "height")?;
        if width.is_none() && height.is_none() {
            return None;
        }

        let src_range = find_attribute(&attrs, "src")?.value.clone()?;
        let raw_src = std::str::from_utf8(&tag[src_range.clone()]).ok()?;
        if raw_src.trim().is_empty() {
            return None;
        }

        if let Some(scope) = scope {
            let decoded = decode_entities(raw_src.trim());
            if UrlParts::split(&decoded).has_netloc() && !scope.contains(&decoded) {
                return None;
            }
        }

        let directive = Directive::new(&self.signer, width, height);
        let new_src = insert_directive(raw_src, &directive)?;

        let mut out = Vec::with_capacity(tag.len() + new_src.len());
        out.extend_from_slice(&tag[..src_range.start]);
        out.extend_from_slice(new_src.as_bytes());
        out.extend_from_slice(&tag[src_range.end..]);
        Some(out)
    }
}

/// Insert a directive segment into a raw `src` value.
///
/// An existing directive segment in front of the file name is replaced rather
/// than stacked. Returns `None` if the path has no file name.
pub fn insert_directive(raw_src: &str, directive: &Directive) -> Option<String> {
    let mut parts = UrlParts::split(raw_src);

    let (dir, filename) = match parts.path.rfind('/') {
        Some(idx) => parts.path.split_at(idx + 1),
        None => ("", parts.path.as_str()),
    };
    if filename.is_empty() {
        return None;
    }

    let new_path = format!(
        "{}{}/{}",
        strip_existing_directive(dir),
        directive.segment(),
        filename
    );
    parts.path = new_path;
    Some(parts.join())
}

/// Drop a trailing directive segment from a directory prefix ending in `/`.
fn strip_existing_directive(dir: &str) -> &str {
    let Some(trimmed) = dir.strip_suffix('/') else {
        return dir;
    };
    let start = trimmed.rfind('/').map(|idx| idx + 1).unwrap_or(0);
    if existing_directive_pattern().is_match(&trimmed[start..]) {
        &dir[..start]
    } else {
        dir
    }
}

/// Parse a width or height attribute.
///
/// Returns `Some(None)` when absent, `Some(Some(n))` for a pixel integer with
/// an optional `px` suffix, and `None` when the element must be skipped.
fn dimension_attribute(tag: &[u8], attrs: &[Attribute], name: &str) -> Option<Option<u32>> {
    let Some(attr) = find_attribute(attrs, name) else {
        return Some(None);
    };
    let raw = std::str::from_utf8(attr.raw_value(tag)?).ok()?;
    parse_pixels(&decode_entities(raw)).map(Some)
}

/// Parse a pixel dimension such as `640` or `640px`.
pub fn parse_pixels(value: &str) -> Option<u32> {
    let value = value.trim();
    let bytes = value.as_bytes();
    // An ASCII suffix leaves the cut on a char boundary
    let digits = if bytes.len() > 2 && bytes[bytes.len() - 2..].eq_ignore_ascii_case(b"px") {
        value[..value.len() - 2].trim_end()
    } else {
        value
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

// =============================================================================
// Tests
// =============================================================================
