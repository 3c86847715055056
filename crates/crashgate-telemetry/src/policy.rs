//! Severity gate
//!
//! Decides whether an event is worth a round trip to the collector.
//!
//! ```text
//!                 debug  info  warning  fatal
//! unrecognized      n     n       n       n
//! nightly/beta      n     n       n       y
//! release           n     n       n       y
//! ```
//!
//! Events that do not qualify are retained as breadcrumbs instead.

use crashgate_core::domain::{BuildChannel, Severity};

/// Lowest severity that is ever transmitted.
pub const TRANSMIT_THRESHOLD: Severity = Severity::Fatal;

/// Pure channel/severity policy.
pub fn should_report(channel: BuildChannel, severity: Severity) -> bool {
    match channel {
        BuildChannel::Unrecognized => false,
        BuildChannel::Nightly | BuildChannel::Beta | BuildChannel::Release => {
            severity.is_at_least(TRANSMIT_THRESHOLD)
        }
    }
}

/// What the gateway does with an event once reporting is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Hand to the transport together with the breadcrumb snapshot
    Transmit,
    /// Keep as context for a later transmitted event
    Retain,
}

/// Channel policy layered with the user's crash-report consent.
///
/// Consent is informational unless `respect_opt_out` is set, in which case
/// a declined consent suppresses all transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingPolicy {
    respect_opt_out: bool,
    consent: bool,
}

impl ReportingPolicy {
    pub fn new(respect_opt_out: bool, consent: bool) -> Self {
        Self {
            respect_opt_out,
            consent,
        }
    }

    pub fn decide(&self, channel: BuildChannel, severity: Severity) -> Decision {
        if self.respect_opt_out && !self.consent {
            return Decision::Retain;
        }
        if should_report(channel, severity) {
            Decision::Transmit
        } else {
            Decision::Retain
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_table() {
        let expected = [
            (BuildChannel::Unrecognized, [false, false, false, false]),
            (BuildChannel::Nightly, [false, false, false, true]),
            (BuildChannel::Beta, [false, false, false, true]),
            (BuildChannel::Release, [false, false, false, true]),
        ];

        for (channel, row) in expected {
            for (severity, want) in Severity::ALL.iter().zip(row) {
                assert_eq!(
                    should_report(channel, *severity),
                    want,
                    "channel={channel} severity={severity}"
                );
            }
        }
    }

    #[test]
    fn test_policy_examples() {
        assert!(should_report(BuildChannel::Release, Severity::Fatal));
        assert!(!should_report(BuildChannel::Release, Severity::Warning));
        assert!(should_report(BuildChannel::Beta, Severity::Fatal));
        assert!(!should_report(BuildChannel::Unrecognized, Severity::Fatal));
    }

    #[test]
    fn test_consent_is_informational_by_default() {
        let policy = ReportingPolicy::new(false, false);
        assert_eq!(
            policy.decide(BuildChannel::Release, Severity::Fatal),
            Decision::Transmit
        );
    }

    #[test]
    fn test_respected_opt_out_suppresses_transmission() {
        let policy = ReportingPolicy::new(true, false);
        assert_eq!(
            policy.decide(BuildChannel::Release, Severity::Fatal),
            Decision::Retain
        );

        let consenting = ReportingPolicy::new(true, true);
        assert_eq!(
            consenting.decide(BuildChannel::Release, Severity::Fatal),
            Decision::Transmit
        );
    }

    #[test]
    fn test_low_severity_is_retained() {
        let policy = ReportingPolicy::new(false, true);
        assert_eq!(
            policy.decide(BuildChannel::Beta, Severity::Info),
            Decision::Retain
        );
    }
}
