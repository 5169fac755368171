//! Platform resolution and per-platform extraction/injection strategies.

mod selectors;
mod strategies;

use std::fmt;

use url::Url;

use crate::dom::{NodeId, PageSnapshot};
use crate::scrape::{ExtractError, Extraction};

pub use selectors::{ComposeMatcher, SelectorTable};

/// Closed set of page variants the engine understands. Resolved from the
/// address, held until the address changes, replaced wholesale on
/// navigation. `Unknown` disables scraping and injection but not the
/// generic sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    WhatsApp,
    Instagram,
    Messenger,
    #[default]
    Unknown,
}

impl Platform {
    /// Classify an address. Pure and deterministic; hostname checks run in
    /// a fixed priority order, each qualified by a thread-view path
    /// fragment where the bare domain is ambiguous. Callers re-run this on
    /// every address change, including soft (single-page-app) navigations.
    pub fn resolve(url: &Url) -> Platform {
        for strategy in strategies::ALL.iter() {
            if strategy.matches(url) {
                return strategy.platform();
            }
        }
        Platform::Unknown
    }

    /// The strategy implementing this platform's scraping and injection.
    pub fn strategy(self) -> &'static dyn PlatformStrategy {
        strategies::for_platform(self)
    }

    /// Whether scraping and injection are available at all.
    pub fn supports_messaging(self) -> bool {
        self != Platform::Unknown
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::WhatsApp => "whatsapp",
            Platform::Instagram => "instagram",
            Platform::Messenger => "messenger",
            Platform::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One platform's extraction and injection behavior. Keeping this a trait
/// (rather than branching on the variant) lets each platform be tested in
/// isolation and keeps the selector table swappable under the control
/// logic.
pub trait PlatformStrategy: Send + Sync {
    fn platform(&self) -> Platform;

    /// Whether this strategy claims the given address.
    fn matches(&self, url: &Url) -> bool;

    /// Extract the most recent incoming message.
    fn scrape_last_incoming(&self, page: &PageSnapshot) -> Result<Extraction, ExtractError>;

    /// Find the compose surface, if present.
    fn locate_compose(&self, page: &PageSnapshot) -> Option<NodeId>;
}

#[cfg(test)]
#[path = "platform_tests.rs"]
mod tests;
