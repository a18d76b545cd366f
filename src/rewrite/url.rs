//! Component split and join for `src` references.
//!
//! Relative references have to round-trip byte-for-byte, which rules out a
//! full URL parser that resolves and normalises. The split follows the classic
//! six-part layout: `scheme://netloc/path;params?query#fragment`.
//!
//! [`AppScope`] is the one place a full parser is used: deciding whether an
//! absolute reference points into the application.

use ::url::Url;

/// The six components of a URL reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlParts {
    pub scheme: String,
    pub netloc: String,
    pub path: String,
    pub params: String,
    pub query: String,
    pub fragment: String,
}

fn is_scheme_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')
}

impl UrlParts {
    /// Split a reference into its components.
    pub fn split(url: &str) -> Self {
        let mut parts = UrlParts::default();
        let mut rest = url;

        if let Some(idx) = rest.find(':') {
            let candidate = &rest[..idx];
            if !candidate.is_empty()
                && candidate.starts_with(|c: char| c.is_ascii_alphabetic())
                && candidate.chars().all(is_scheme_char)
            {
                parts.scheme = candidate.to_string();
                rest = &rest[idx + 1..];
            }
        }

        if let Some(after) = rest.strip_prefix("//") {
            let end = after.find(&['/', '?', '#'][..]).unwrap_or(after.len());
            parts.netloc = after[..end].to_string();
            rest = &after[end..];
        }

        if let Some(idx) = rest.find('#') {
            parts.fragment = rest[idx + 1..].to_string();
            rest = &rest[..idx];
        }

        if let Some(idx) = rest.find('?') {
            parts.query = rest[idx + 1..].to_string();
            rest = &rest[..idx];
        }

        // Params only attach to the last path segment
        let last_slash = rest.rfind('/').map(|i| i + 1).unwrap_or(0);
        if let Some(idx) = rest[last_slash..].find(';') {
            let idx = last_slash + idx;
            parts.params = rest[idx + 1..].to_string();
            rest = &rest[..idx];
        }

        parts.path = rest.to_string();
        parts
    }

    /// Whether the reference names a network location.
    pub fn has_netloc(&self) -> bool {
        !self.netloc.is_empty()
    }

    /// Reassemble the reference.
    pub fn join(&self) -> String {
        let mut out = String::new();
        if !self.scheme.is_empty() {
            out.push_str(&self.scheme);
            out.push(':');
        }
        if !self.netloc.is_empty() || self.path.starts_with("//") {
            out.push_str("//");
            out.push_str(&self.netloc);
            if !self.path.is_empty() && !self.path.starts_with('/') {
                out.push('/');
            }
        }
        out.push_str(&self.path);
        if !self.params.is_empty() {
            out.push(';');
            out.push_str(&self.params);
        }
        if !self.query.is_empty() {
            out.push('?');
            out.push_str(&self.query);
        }
        if !self.fragment.is_empty() {
            out.push('#');
            out.push_str(&self.fragment);
        }
        out
    }
}

/// The application URL that absolute `src` references must fall under.
#[derive(Debug, Clone)]
pub enum AppScope {
    /// Normalised base: lowercase scheme and host, default port dropped
    Parsed(Url),
    /// Base that does not parse as a URL with a host; compared as a prefix
    Raw(String),
}

impl AppScope {
    pub fn new(app_url: &str) -> Self {
        match Url::parse(app_url.trim()) {
            Ok(url) if url.has_host() => AppScope::Parsed(url),
            _ => AppScope::Raw(app_url.to_string()),
        }
    }

    /// Whether `src` (entity-decoded) points under the application URL.
    pub fn contains(&self, src: &str) -> bool {
        match self {
            AppScope::Raw(base) => src.starts_with(base.as_str()),
            AppScope::Parsed(base) => {
                let Ok(target) = base.join(src) else {
                    return false;
                };
                target.scheme() == base.scheme()
                    && target.host_str() == base.host_str()
                    && target.port_or_known_default() == base.port_or_known_default()
                    && target.path().starts_with(base.path())
            }
        }
    }
}
