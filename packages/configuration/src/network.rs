use serde::{Deserialize, Serialize};

use crate::validator::Validator;
use crate::Error;

/// Network configuration for the tracker scrape and DHT lookup calls.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct Network {
    /// Timeout in seconds for a single tracker scrape or DHT lookup call.
    /// A timed-out call counts as a failure like any other.
    #[serde(default = "Network::default_scrape_timeout")]
    pub scrape_timeout: u64,

    /// Local UDP port to bind for outgoing tracker and DHT traffic.
    /// Port `0` lets the OS choose an unused port.
    #[serde(default = "Network::default_bind_port")]
    pub bind_port: u16,

    /// Bootstrap routers used to seed DHT peer lookups, as `host:port` pairs.
    #[serde(default = "Network::default_dht_routers")]
    pub dht_routers: Vec<String>,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            scrape_timeout: Self::default_scrape_timeout(),
            bind_port: Self::default_bind_port(),
            dht_routers: Self::default_dht_routers(),
        }
    }
}

impl Network {
    fn default_scrape_timeout() -> u64 {
        5
    }

    fn default_bind_port() -> u16 {
        0
    }

    fn default_dht_routers() -> Vec<String> {
        vec![
            "router.bittorrent.com:6881".to_string(),
            "dht.transmissionbt.com:6881".to_string(),
            "router.utorrent.com:6881".to_string(),
        ]
    }
}

impl Validator for Network {
    fn validate(&self) -> Result<(), Error> {
        if self.scrape_timeout == 0 {
            return Err(Error::SemanticValidation {
                message: "network.scrape_timeout must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}
