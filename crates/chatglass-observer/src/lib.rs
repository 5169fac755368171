//! Live page observation and content extraction for third-party chat pages.
//!
//! Watches an uncontrolled chat page over the Chrome DevTools Protocol,
//! heuristically identifies incoming-message bubbles, extracts the latest
//! incoming text on demand, and writes replies back into the compose field
//! through the page's own input pipeline. Pure Rust, no in-page script
//! component.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐    WebSocket     ┌──────────────────┐
//! │ ObserverController│ ◄──────────────► │  Chrome/Chromium │
//! │  (this crate)    │       CDP        │  (user's browser)│
//! └──────────────────┘                  └──────────────────┘
//! ```
//!
//! The engine core is written against the [`driver::PageDriver`] seam and
//! works on immutable [`dom::PageSnapshot`]s, so every heuristic is
//! testable without a browser. The production driver attaches to the
//! user's existing chat tab; it never opens or navigates pages.
//!
//! ## Flow
//!
//! - [`driver`] surfaces structure mutations and navigations.
//! - [`observer::ObserverController`] debounces bursts, rescans added
//!   subtrees, and feeds accepted elements to the [`overlay`] manager.
//! - On demand, [`platform`] picks a strategy and [`scrape`] pulls the
//!   latest incoming message; [`analysis`] carries it out to the external
//!   analyzer; [`inject`] writes the reply back.
//! - [`privacy`] holds the kill switch: engaged means fully detached.
//!
//! Detection is an explicit ordered heuristic against unstable third-party
//! markup. Misses are expected, tolerated, and reported as values.

pub mod analysis;
pub mod classify;
pub mod config;
pub mod dom;
pub mod driver;
mod error;
pub mod inject;
pub mod observer;
pub mod overlay;
pub mod platform;
pub mod privacy;
pub mod scrape;
pub mod watch;

pub use analysis::{AnalysisChannel, AnalyzeRequest, AnalyzeResponse, HttpAnalysisChannel};
pub use classify::{classify, BubbleCandidate, RejectReason};
pub use config::ObserverConfig;
pub use driver::cdp::{CdpClient, CdpConfig, CdpError, CdpPage};
pub use driver::{DriverError, MutationBatch, PageDriver, PageEvent};
pub use error::ObserverError;
pub use observer::{ObserverController, ObserverStatus};
pub use overlay::{OverlayAnchor, OverlayManager};
pub use platform::{Platform, PlatformStrategy};
pub use privacy::{PrivacyError, PrivacyStore};
pub use scrape::{scrape_last_incoming, ExtractError, Extraction};
