//! Journal configuration.

use crate::error::{JournalError, JournalResult};

/// Configuration for opening a journal.
#[derive(Debug, Clone)]
pub struct JournalConfig {
    /// Label used in diagnostics and the writer thread name.
    pub name: String,

    /// Maximum size in bytes of a default segment file.
    ///
    /// Oversize records get a dedicated overflow segment sized exactly for
    /// them; batch segments are sized exactly for their batch. Neither is
    /// bounded by this value.
    pub max_segment_size: u32,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            name: "journal".to_string(),
            max_segment_size: 4 * 1024 * 1024, // 4 MB
        }
    }
}

impl JournalConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the diagnostic name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the maximum default segment size.
    #[must_use]
    pub const fn max_segment_size(mut self, size: u32) -> Self {
        self.max_segment_size = size;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Configuration`] if `max_segment_size` is
    /// zero.
    pub fn validate(&self) -> JournalResult<()> {
        if self.max_segment_size == 0 {
            return Err(JournalError::configuration(
                "max_segment_size must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = JournalConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.name, "journal");
    }

    #[test]
    fn builder_pattern() {
        let config = JournalConfig::new().name("orders").max_segment_size(1024);

        assert_eq!(config.name, "orders");
        assert_eq!(config.max_segment_size, 1024);
    }

    #[test]
    fn zero_segment_size_rejected() {
        let config = JournalConfig::new().max_segment_size(0);
        assert!(matches!(
            config.validate(),
            Err(JournalError::Configuration { .. })
        ));
    }
}
