//! Strict XHTML scan.
//!
//! The document must be well-formed XML. Image elements are recognised by
//! local name `img` in the XHTML namespace or in no namespace; elements of
//! other namespaces are left alone even when their local name is `img`.
//! Entity references and CDATA sections are never decoded, since the
//! rewriter copies everything outside image tags byte-for-byte.

use std::ops::Range;

use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;

/// The XHTML namespace.
pub const XHTML_NAMESPACE: &[u8] = b"http://www.w3.org/1999/xhtml";

/// Reasons a document was rejected by the strict scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlScanError {
    /// The XML reader rejected the document
    Malformed(String),

    /// The document ended with unclosed elements
    Unbalanced { open: usize },
}

impl std::fmt::Display for XmlScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            XmlScanError::Malformed(msg) => write!(f, "malformed XML: {}", msg),
            XmlScanError::Unbalanced { open } => {
                write!(f, "document ended with {} unclosed element(s)", open)
            }
        }
    }
}

fn is_xhtml_image(resolved: &ResolveResult<'_>, local_name: &[u8]) -> bool {
    if !local_name.eq_ignore_ascii_case(b"img") {
        return false;
    }
    match resolved {
        ResolveResult::Unbound => true,
        ResolveResult::Bound(Namespace(ns)) => *ns == XHTML_NAMESPACE,
        ResolveResult::Unknown(_) => false,
    }
}

fn position<R>(reader: &NsReader<R>) -> usize {
    usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX)
}

/// Byte ranges of every image start tag in a well-formed XHTML document.
pub fn image_tag_spans(body: &[u8]) -> Result<Vec<Range<usize>>, XmlScanError> {
    let mut reader = NsReader::from_reader(body);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut spans = Vec::new();
    let mut depth = 0usize;

    loop {
        // The resolved namespace borrows the reader, so finish with it first
        let is_image = {
            let (resolved, event) = reader
                .read_resolved_event_into(&mut buf)
                .map_err(|e| XmlScanError::Malformed(e.to_string()))?;

            match &event {
                Event::Start(e) => {
                    depth += 1;
                    is_xhtml_image(&resolved, e.local_name().as_ref())
                }
                Event::Empty(e) => is_xhtml_image(&resolved, e.local_name().as_ref()),
                Event::End(_) => {
                    depth = depth.checked_sub(1).ok_or_else(|| {
                        XmlScanError::Malformed("unexpected closing tag".to_string())
                    })?;
                    false
                }
                Event::Eof => break,
                _ => false,
            }
        };

        if is_image {
            let end = position(&reader).min(body.len());
            // `<` cannot occur inside a well-formed attribute value
            if let Some(start) = body[..end].iter().rposition(|b| *b == b'<') {
                spans.push(start..end);
            }
        }

        buf.clear();
    }

    if depth != 0 {
        return Err(XmlScanError::Unbalanced { open: depth });
    }

    Ok(spans)
}
