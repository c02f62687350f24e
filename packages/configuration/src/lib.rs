//! Configuration data structures for the Swarmwatch monitor.
//!
//! The configuration is loaded from a TOML file and can be overridden field
//! by field with environment variables prefixed with `SWARMWATCH_`, using
//! `__` as the section separator. For example:
//!
//! ```text
//! SWARMWATCH_CORE__MAX_AGE=7200
//! SWARMWATCH_BLACKLIST__MAX_ERRORS=10
//! ```
//!
//! The whole TOML document can also be injected through the
//! `SWARMWATCH_CONFIG_TOML` environment variable, which has priority over the
//! config file, even when the file exists on the default path.
pub mod blacklist;
pub mod core;
pub mod logging;
pub mod network;
pub mod store;
pub mod validator;

use std::env;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::blacklist::Blacklist;
pub use crate::core::Core;
pub use crate::logging::{Logging, Threshold};
pub use crate::network::Network;
pub use crate::store::{Driver, Store};
pub use crate::validator::Validator;

// Environment variables

/// The whole `swarmwatch.toml` file content. It has priority over the config
/// file, even if the file is not on the default path.
const ENV_VAR_CONFIG_TOML: &str = "SWARMWATCH_CONFIG_TOML";

/// The `swarmwatch.toml` file location.
pub const ENV_VAR_CONFIG_TOML_PATH: &str = "SWARMWATCH_CONFIG_TOML_PATH";

/// Prefix for the field-level environment overrides.
const ENV_VAR_PREFIX: &str = "SWARMWATCH_";

/// Information required for loading the configuration.
#[derive(Debug, Default, Clone)]
pub struct Info {
    config_toml: Option<String>,
    config_toml_path: String,
}

impl Info {
    /// Builds the configuration `Info` from the environment.
    #[must_use]
    pub fn new(default_config_toml_path: String) -> Self {
        let config_toml = if let Ok(config_toml) = env::var(ENV_VAR_CONFIG_TOML) {
            println!("Loading configuration from environment variable {ENV_VAR_CONFIG_TOML} ...");
            Some(config_toml)
        } else {
            None
        };

        let config_toml_path = if let Ok(config_toml_path) = env::var(ENV_VAR_CONFIG_TOML_PATH) {
            println!("Loading configuration from file: `{config_toml_path}` ...");
            config_toml_path
        } else {
            default_config_toml_path
        };

        Self {
            config_toml,
            config_toml_path,
        }
    }
}

/// Errors that can occur when loading or validating the configuration.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unable to process the configuration: {source}")]
    Figment {
        #[from]
        source: figment::Error,
    },

    #[error("invalid configuration: {message}")]
    SemanticValidation { message: String },
}

/// The whole configuration for the monitor.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Default)]
pub struct Configuration {
    /// Logging configuration.
    #[serde(default)]
    pub logging: Logging,

    /// Core rescrape scheduler configuration.
    #[serde(default)]
    pub core: Core,

    /// Tracker blacklist configuration.
    #[serde(default)]
    pub blacklist: Blacklist,

    /// Network (scrape and DHT) configuration.
    #[serde(default)]
    pub network: Network,

    /// Record store configuration.
    #[serde(default)]
    pub store: Store,
}

impl Configuration {
    /// Loads the configuration from the `Info` struct, applying environment
    /// overrides on top of the TOML document.
    ///
    /// # Errors
    ///
    /// Will return an error if the TOML or the environment overrides cannot
    /// be parsed into a valid configuration.
    pub fn load(info: &Info) -> Result<Configuration, Error> {
        let figment = if let Some(config_toml) = &info.config_toml {
            Figment::new()
                .merge(Toml::string(config_toml))
                .merge(Env::prefixed(ENV_VAR_PREFIX).split("__"))
        } else {
            Figment::new()
                .merge(Toml::file(&info.config_toml_path))
                .merge(Env::prefixed(ENV_VAR_PREFIX).split("__"))
        };

        let config: Configuration = figment.extract()?;

        Ok(config)
    }

    /// Encodes the configuration to TOML.
    ///
    /// # Panics
    ///
    /// Will panic if the configuration cannot be encoded, which cannot happen
    /// for a value that was deserialized from TOML in the first place.
    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string(self).expect("the configuration should be TOML serializable")
    }
}

impl Validator for Configuration {
    fn validate(&self) -> Result<(), Error> {
        self.core.validate()?;
        self.blacklist.validate()?;
        self.network.validate()
    }
}

#[cfg(test)]
mod tests {
    use crate::{Configuration, Info};

    #[test]
    fn configuration_should_have_default_values() {
        let configuration = Configuration::default();

        assert_eq!(configuration.core.max_age, 3600);
        assert_eq!(configuration.blacklist.max_errors, 5);
    }

    #[test]
    fn configuration_should_be_loadable_from_an_empty_source() {
        figment::Jail::expect_with(|_jail| {
            let configuration = Configuration::load(&Info::default()).expect("it should load from empty sources");

            assert_eq!(configuration, Configuration::default());

            Ok(())
        });
    }

    #[test]
    fn configuration_should_be_loadable_from_a_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "swarmwatch.toml",
                r#"
                [core]
                max_age = 7200

                [blacklist]
                max_errors = 10
                "#,
            )?;

            let info = Info {
                config_toml: None,
                config_toml_path: "swarmwatch.toml".to_string(),
            };

            let configuration = Configuration::load(&info).expect("it should load from the toml file");

            assert_eq!(configuration.core.max_age, 7200);
            assert_eq!(configuration.blacklist.max_errors, 10);
            assert_eq!(configuration.blacklist.min_errors, 2);

            Ok(())
        });
    }

    #[test]
    fn environment_variables_should_override_the_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "swarmwatch.toml",
                r#"
                [core]
                max_age = 7200
                "#,
            )?;
            jail.set_env("SWARMWATCH_CORE__MAX_AGE", "60");

            let info = Info {
                config_toml: None,
                config_toml_path: "swarmwatch.toml".to_string(),
            };

            let configuration = Configuration::load(&info).expect("it should load with overrides");

            assert_eq!(configuration.core.max_age, 60);

            Ok(())
        });
    }

    #[test]
    fn the_toml_encoding_should_round_trip() {
        let configuration = Configuration::default();

        let parsed: Configuration = toml::from_str(&configuration.to_toml()).expect("it should parse its own output");

        assert_eq!(parsed, configuration);
    }
}
