//! HMAC-SHA256 signing of resize directives.
//!
//! # Signing Scheme
//!
//! A directive binds an optional width and an optional height to the shared
//! secret. Each side is rendered as its decimal value, or as the absence token
//! `None` when omitted, and the two are joined with `x`:
//!
//! ```text
//! signature = HMAC-SHA256(secret, "{width}x{height}")
//! ```
//!
//! The absence token is a literal string, so a width of `0` and an omitted
//! width never produce the same canonical string.
//!
//! # Example
//!
//! ```rust
//! use bitblt::directive::Signer;
//!
//! let signer = Signer::new("secret");
//! let sig = signer.sign(Some(640), None);
//!
//! assert!(signer.verify(Some(640), None, &sig));
//! assert!(!signer.verify(Some(640), Some(480), &sig));
//! ```

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// HMAC-SHA256 type alias
type HmacSha256 = Hmac<Sha256>;

/// Literal used in place of an omitted width or height.
pub const ABSENT_TOKEN: &str = "None";

/// Prefix of every directive path segment.
pub const DIRECTIVE_PREFIX: &str = "bitblt";

/// Render an optional dimension as it appears in the canonical string.
pub fn dimension_token(value: Option<u32>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => ABSENT_TOKEN.to_string(),
    }
}

/// Computes and verifies directive signatures.
///
/// Stateless apart from the secret; cheap to clone and share across requests.
#[derive(Clone)]
pub struct Signer {
    /// Secret key for HMAC computation
    secret: Vec<u8>,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer").finish_non_exhaustive()
    }
}

impl Signer {
    /// Create a signer with the given secret.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Sign a width/height pair.
    ///
    /// Returns the lowercase hex-encoded signature.
    pub fn sign(&self, width: Option<u32>, height: Option<u32>) -> String {
        self.sign_tokens(&dimension_token(width), &dimension_token(height))
    }

    /// Verify a signature for a width/height pair.
    pub fn verify(&self, width: Option<u32>, height: Option<u32>, signature: &str) -> bool {
        self.verify_tokens(&dimension_token(width), &dimension_token(height), signature)
    }

    /// Sign the textual width and height tokens exactly as they appear in a path.
    pub fn sign_tokens(&self, width: &str, height: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(canonical_string(width, height).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verify a signature against textual width and height tokens.
    ///
    /// Malformed signatures (not hex, wrong length) simply fail verification.
    pub fn verify_tokens(&self, width: &str, height: &str, signature: &str) -> bool {
        let Ok(provided) = hex::decode(signature) else {
            return false;
        };

        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(canonical_string(width, height).as_bytes());
        let expected = mac.finalize().into_bytes();

        // ct_eq on slices of different length is false
        provided.as_slice().ct_eq(expected.as_slice()).into()
    }
}

fn canonical_string(width: &str, height: &str) -> String {
    format!("{}x{}", width, height)
}

// =============================================================================
// Tests
// =============================================================================
