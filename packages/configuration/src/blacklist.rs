use serde::{Deserialize, Serialize};

use crate::validator::Validator;
use crate::Error;

/// Tracker blacklist configuration.
///
/// A tracker is quarantined when it accumulates `max_errors` recent failures
/// and is only let back in when its recent failures drop below `min_errors`
/// AND its exponential backoff has expired. The band between `min_errors`
/// and `max_errors` is a hysteresis zone where nothing changes, so a
/// borderline tracker does not flap in and out of the blacklist.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct Blacklist {
    /// Number of recent failures at which a tracker is blacklisted.
    #[serde(default = "Blacklist::default_max_errors")]
    pub max_errors: usize,

    /// Recent failure count a blacklisted tracker must fall below before it
    /// can be removed from the blacklist.
    #[serde(default = "Blacklist::default_min_errors")]
    pub min_errors: usize,

    /// Retention window in seconds for tracker failure timestamps.
    #[serde(default = "Blacklist::default_error_age")]
    pub error_age: u64,

    /// Retention window in seconds for blacklist events, which drive the
    /// exponential backoff.
    #[serde(default = "Blacklist::default_event_age")]
    pub event_age: u64,

    /// Interval in seconds between blacklist manager cycles. Runs on its own
    /// timer, independent of the scheduler tick.
    #[serde(default = "Blacklist::default_run_interval")]
    pub run_interval: u64,
}

impl Default for Blacklist {
    fn default() -> Self {
        Self {
            max_errors: Self::default_max_errors(),
            min_errors: Self::default_min_errors(),
            error_age: Self::default_error_age(),
            event_age: Self::default_event_age(),
            run_interval: Self::default_run_interval(),
        }
    }
}

impl Blacklist {
    fn default_max_errors() -> usize {
        5
    }

    fn default_min_errors() -> usize {
        2
    }

    fn default_error_age() -> u64 {
        86_400
    }

    fn default_event_age() -> u64 {
        604_800
    }

    fn default_run_interval() -> u64 {
        180
    }
}

impl Validator for Blacklist {
    fn validate(&self) -> Result<(), Error> {
        if self.max_errors == 0 {
            return Err(Error::SemanticValidation {
                message: "blacklist.max_errors must be greater than zero".to_string(),
            });
        }

        if self.min_errors > self.max_errors {
            return Err(Error::SemanticValidation {
                message: format!(
                    "blacklist.min_errors ({}) must not exceed blacklist.max_errors ({})",
                    self.min_errors, self.max_errors
                ),
            });
        }

        if self.run_interval == 0 {
            return Err(Error::SemanticValidation {
                message: "blacklist.run_interval must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::validator::Validator;
    use crate::Blacklist;

    #[test]
    fn it_should_reject_a_hysteresis_band_with_min_above_max() {
        let blacklist = Blacklist {
            max_errors: 2,
            min_errors: 5,
            ..Blacklist::default()
        };

        assert!(blacklist.validate().is_err());
    }

    #[test]
    fn it_should_accept_the_default_hysteresis_band() {
        assert!(Blacklist::default().validate().is_ok());
    }
}
