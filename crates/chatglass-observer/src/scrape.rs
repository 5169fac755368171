//! On-demand extraction of the most recent incoming message.
//!
//! Results are ephemeral and handed straight back to the caller; nothing is
//! cached. Direction inference is best-effort per platform; where no signal
//! exists the extraction carries an explicit low-confidence flag instead of
//! failing.

use thiserror::Error;

use crate::dom::PageSnapshot;
use crate::platform::Platform;

/// Extracted text snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    /// Set when the platform offered no usable direction signal and the
    /// most recent candidate was returned instead.
    pub low_confidence: bool,
}

impl Extraction {
    pub fn confident(text: String) -> Self {
        Self {
            text,
            low_confidence: false,
        }
    }

    pub fn fallback(text: String) -> Self {
        Self {
            text,
            low_confidence: true,
        }
    }
}

/// Typed extraction failure, for caller-visible diagnostics. Never escalated
/// to a panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// The current page is not a platform this engine can scrape.
    #[error("unsupported platform")]
    UnsupportedPlatform,
    /// No message candidates exist in the page at all.
    #[error("no message candidates found")]
    NotFound,
    /// Candidates exist but none yielded usable text.
    #[error("message candidates present but none usable")]
    Ambiguous,
}

/// Extract the latest incoming message for `platform` from `page`.
pub fn scrape_last_incoming(
    platform: Platform,
    page: &PageSnapshot,
) -> Result<Extraction, ExtractError> {
    platform.strategy().scrape_last_incoming(page)
}
