use serde::{Deserialize, Serialize};

use crate::validator::Validator;
use crate::Error;

/// Core rescrape scheduler configuration.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct Core {
    /// Maximum age in seconds of a scrape result before the swarm data is
    /// considered stale and eligible for rescraping.
    #[serde(default = "Core::default_max_age")]
    pub max_age: u64,

    /// Interval in seconds between scheduler ticks. Each tick rescrapes at
    /// most one stale swarm.
    #[serde(default = "Core::default_run_interval")]
    pub run_interval: u64,

    /// Optional run budget in seconds. When set, the process shuts down
    /// cleanly after this time so a supervisor can recycle it.
    #[serde(default = "Core::default_max_runtime")]
    pub max_runtime: Option<u64>,
}

impl Default for Core {
    fn default() -> Self {
        Self {
            max_age: Self::default_max_age(),
            run_interval: Self::default_run_interval(),
            max_runtime: Self::default_max_runtime(),
        }
    }
}

impl Core {
    fn default_max_age() -> u64 {
        3600
    }

    fn default_run_interval() -> u64 {
        30
    }

    fn default_max_runtime() -> Option<u64> {
        None
    }
}

impl Validator for Core {
    fn validate(&self) -> Result<(), Error> {
        if self.run_interval == 0 {
            return Err(Error::SemanticValidation {
                message: "core.run_interval must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}
