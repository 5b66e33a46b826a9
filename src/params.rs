//! Connection and scan parameters, in HCI units.

use crate::constants::{
    DEFAULT_CONN_INTERVAL_MAX, DEFAULT_CONN_INTERVAL_MIN, DEFAULT_CONN_LATENCY,
    DEFAULT_SCAN_INTERVAL, DEFAULT_SCAN_WINDOW, DEFAULT_SUPERVISION_TIMEOUT,
};

/// Requested connection parameters, used when creating or updating a link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnSpec {
    /// Minimum connection interval in 1.25 ms units
    pub interval_min: u16,
    /// Maximum connection interval in 1.25 ms units
    pub interval_max: u16,
    /// Peripheral latency in connection events
    pub max_latency: u16,
    /// Supervision timeout in 10 ms units
    pub supervision_timeout: u16,
    /// Minimum connection event length in 0.625 ms units
    pub min_ce_length: u16,
    /// Maximum connection event length in 0.625 ms units
    pub max_ce_length: u16,
}

impl ConnSpec {
    /// Check the parameter ranges allowed by the LE Create Connection command
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (0x0006..=0x0C80).contains(&self.interval_min)
            && (0x0006..=0x0C80).contains(&self.interval_max)
            && self.interval_min <= self.interval_max
            && self.max_latency <= 0x01F3
            && (0x000A..=0x0C80).contains(&self.supervision_timeout)
            && self.min_ce_length <= self.max_ce_length
    }
}

impl Default for ConnSpec {
    fn default() -> Self {
        Self {
            interval_min: DEFAULT_CONN_INTERVAL_MIN,
            interval_max: DEFAULT_CONN_INTERVAL_MAX,
            max_latency: DEFAULT_CONN_LATENCY,
            supervision_timeout: DEFAULT_SUPERVISION_TIMEOUT,
            min_ce_length: 0,
            max_ce_length: 0,
        }
    }
}

/// Connection parameters reported by the controller for an established link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnParams {
    /// Connection interval in 1.25 ms units
    pub interval: u16,
    /// Peripheral latency in connection events
    pub latency: u16,
    /// Supervision timeout in 10 ms units
    pub supervision_timeout: u16,
}

/// Scan parameters used while initiating a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanParams {
    /// Scan interval in 0.625 ms units
    pub interval: u16,
    /// Scan window in 0.625 ms units
    pub window: u16,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SCAN_INTERVAL,
            window: DEFAULT_SCAN_WINDOW,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_conn_spec_is_valid() {
        assert!(ConnSpec::default().is_valid());
    }

    #[test]
    fn test_conn_spec_rejects_inverted_interval() {
        let spec = ConnSpec {
            interval_min: 0x0040,
            interval_max: 0x0020,
            ..ConnSpec::default()
        };
        assert!(!spec.is_valid());
    }

    #[test]
    fn test_conn_spec_rejects_out_of_range_values() {
        let too_fast = ConnSpec {
            interval_min: 0x0004,
            ..ConnSpec::default()
        };
        let short_timeout = ConnSpec {
            supervision_timeout: 0x0005,
            ..ConnSpec::default()
        };
        let high_latency = ConnSpec {
            max_latency: 0x0200,
            ..ConnSpec::default()
        };

        assert!(!too_fast.is_valid());
        assert!(!short_timeout.is_valid());
        assert!(!high_latency.is_valid());
    }
}
