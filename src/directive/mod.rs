//! Signed resize directives.
//!
//! A directive is the `(width, height, signature)` triple carried in a URL
//! path segment:
//!
//! ```text
//! /images/bitblt-640x480-<hex hmac>/photo.jpg
//!         └────────── segment ──────┘
//! ```
//!
//! - [`Signer`] computes and verifies signatures
//! - [`DirectiveMatcher`] finds, verifies and strips segments from inbound paths
//! - [`Directive`] builds the segment the rewriter embeds in outbound HTML

mod matcher;
mod signer;

pub use matcher::{parse_dimension_token, DirectiveMatch, DirectiveMatcher, MatchedDirective};
pub use signer::{dimension_token, Signer, ABSENT_TOKEN, DIRECTIVE_PREFIX};

/// A signed directive ready to be embedded in a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Target width, `None` when omitted
    pub width: Option<u32>,

    /// Target height, `None` when omitted
    pub height: Option<u32>,

    /// Hex signature over width and height
    pub signature: String,
}

impl Directive {
    /// Sign a width/height pair.
    pub fn new(signer: &Signer, width: Option<u32>, height: Option<u32>) -> Self {
        Self {
            width,
            height,
            signature: signer.sign(width, height),
        }
    }

    /// Render the path segment, without a trailing slash.
    pub fn segment(&self) -> String {
        format!(
            "{}-{}x{}-{}",
            DIRECTIVE_PREFIX,
            dimension_token(self.width),
            dimension_token(self.height),
            self.signature
        )
    }
}
