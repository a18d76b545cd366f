//! Recognition of directive segments in inbound request paths.
//!
//! A directive segment has the form `bitblt-<W>x<H>-<S>/` and may appear
//! anywhere in the path, since the rewriter inserts it just before the file
//! name. Matching runs over raw path bytes so that paths which are not valid
//! UTF-8 never cause a failure.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::bytes::Regex;
use tracing::debug;

use super::signer::{Signer, ABSENT_TOKEN};
use crate::error::BitbltError;
use crate::transform::TargetSize;

fn directive_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"bitblt-(?P<width>[0-9]+|None)x(?P<height>[0-9]+|None)-(?P<signature>[a-z0-9]+)/")
            .expect("directive pattern is valid")
    })
}

// =============================================================================
// Match Result
// =============================================================================

/// A directive segment found in a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedDirective {
    /// Width token as it appeared in the path (digits or `None`)
    pub width: String,

    /// Height token as it appeared in the path (digits or `None`)
    pub height: String,

    /// Signature token
    pub signature: String,

    /// Whether the signature matches the width and height tokens
    pub verified: bool,
}

impl MatchedDirective {
    /// Parse the width and height tokens into a target size.
    ///
    /// Fails with `InvalidDirective` when a token is not the absence token and
    /// does not fit a `u32`.
    pub fn size(&self) -> Result<TargetSize, BitbltError> {
        Ok(TargetSize::new(
            parse_dimension_token(&self.width)?,
            parse_dimension_token(&self.height)?,
        ))
    }

    /// Whether at least one dimension was specified.
    pub fn has_dimension(&self) -> bool {
        self.width != ABSENT_TOKEN || self.height != ABSENT_TOKEN
    }
}

/// Outcome of running the matcher over a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveMatch {
    /// The first directive found, if any
    pub directive: Option<MatchedDirective>,

    /// The path with every directive segment removed
    pub stripped_path: Vec<u8>,
}

impl DirectiveMatch {
    /// Whether a directive segment was present and its signature verified.
    pub fn verified(&self) -> bool {
        self.directive.as_ref().is_some_and(|d| d.verified)
    }

    /// Whether any directive segment was present.
    pub fn is_present(&self) -> bool {
        self.directive.is_some()
    }

    /// The stripped path as text, replacing invalid UTF-8 sequences.
    pub fn stripped_path_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stripped_path)
    }
}

/// Parse a single dimension token.
pub fn parse_dimension_token(token: &str) -> Result<Option<u32>, BitbltError> {
    if token == ABSENT_TOKEN {
        return Ok(None);
    }
    token
        .parse::<u32>()
        .map(Some)
        .map_err(|e| BitbltError::InvalidDirective {
            reason: format!("dimension '{}' is not a valid integer: {}", token, e),
        })
}

// =============================================================================
// Matcher
// =============================================================================

/// Finds, verifies and strips directive segments.
#[derive(Debug, Clone)]
pub struct DirectiveMatcher {
    signer: Signer,
}

impl DirectiveMatcher {
    /// Create a matcher verifying against the given signer.
    pub fn new(signer: Signer) -> Self {
        Self { signer }
    }

    /// Match a path.
    ///
    /// The first directive segment supplies width, height and signature. Every
    /// segment is removed from the stripped path whether or not it verified.
    pub fn match_path(&self, path: impl AsRef<[u8]>) -> DirectiveMatch {
        let path = path.as_ref();
        let pattern = directive_pattern();

        let Some(caps) = pattern.captures(path) else {
            return DirectiveMatch {
                directive: None,
                stripped_path: path.to_vec(),
            };
        };

        // Captures are ASCII by construction of the pattern
        let text = |name: &str| String::from_utf8_lossy(&caps[name]).into_owned();
        let width = text("width");
        let height = text("height");
        let signature = text("signature");

        let verified = self.signer.verify_tokens(&width, &height, &signature);
        if !verified {
            debug!(width = %width, height = %height, "Directive signature did not verify");
        }

        let stripped_path = pattern.replace_all(path, &b""[..]).into_owned();

        DirectiveMatch {
            directive: Some(MatchedDirective {
                width,
                height,
                signature,
                verified,
            }),
            stripped_path,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
