//! Initialize configuration from file or environment variables.
//!
//! The whole TOML document can be injected with `SWARMWATCH_CONFIG_TOML`,
//! the file location overridden with `SWARMWATCH_CONFIG_TOML_PATH`, and
//! individual fields overridden with `SWARMWATCH_<SECTION>__<FIELD>`
//! variables. Refer to the [`swarmwatch-configuration`
//! documentation](swarmwatch_configuration) for the whole surface.
use swarmwatch_configuration::{Configuration, Info, Validator};

// Default values
pub const DEFAULT_PATH_CONFIG: &str = "./swarmwatch.toml";

/// It loads the application configuration from the environment.
///
/// # Panics
///
/// Will panic if the configuration cannot be loaded or is semantically
/// invalid: there is nothing sensible to monitor with a broken
/// configuration.
#[must_use]
pub fn initialize_configuration() -> Configuration {
    let info = Info::new(DEFAULT_PATH_CONFIG.to_string());

    let configuration = Configuration::load(&info).expect("the configuration should be loadable");

    configuration.validate().expect("the configuration should be valid");

    configuration
}
