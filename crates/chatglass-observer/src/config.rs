//! Engine configuration.

use std::time::Duration;

/// Tuning knobs for the observer controller.
#[derive(Debug, Clone)]
pub struct ObserverConfig {
    /// Quiet period before a mutation burst collapses into one rescan.
    pub debounce: Duration,
    /// Whether the chat-detection watcher mounts the persistent sidebar.
    pub mount_sidebar: bool,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            mount_sidebar: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ObserverConfig::default();
        assert_eq!(config.debounce, Duration::from_millis(500));
        assert!(config.mount_sidebar);
    }
}
