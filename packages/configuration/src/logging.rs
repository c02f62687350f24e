use serde::{Deserialize, Serialize};

/// Logging configuration.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct Logging {
    /// Logging level. Possible values are: `off`, `error`, `warn`, `info`,
    /// `debug` and `trace`. Default is `info`.
    #[serde(default = "Logging::default_threshold")]
    pub threshold: Threshold,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            threshold: Self::default_threshold(),
        }
    }
}

impl Logging {
    fn default_threshold() -> Threshold {
        Threshold::Info
    }
}

/// Logging threshold.
#[derive(Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Debug, Hash, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Threshold {
    /// A threshold lower than all levels.
    Off,
    /// Corresponds to the `Error` level.
    Error,
    /// Corresponds to the `Warn` level.
    Warn,
    /// Corresponds to the `Info` level.
    Info,
    /// Corresponds to the `Debug` level.
    Debug,
    /// Corresponds to the `Trace` level.
    Trace,
}
