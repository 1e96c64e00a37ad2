use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct DhtSeed {
    pub addr: String,
    /// 64-hex ed25519 public key of the seed node.
    pub public_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PeerClientConfig {
    #[serde(default)]
    pub dht_seeds: Vec<DhtSeed>,
    /// Budget for a single DHT lookup.
    #[serde(default = "default_dht_timeout_secs")]
    pub dht_timeout_secs: u64,
    /// Budget for a provider-daemon query (rates probe, storage proof).
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

fn default_dht_timeout_secs() -> u64 {
    14
}

fn default_query_timeout_secs() -> u64 {
    14
}

impl Default for PeerClientConfig {
    fn default() -> Self {
        Self {
            dht_seeds: Vec::new(),
            dht_timeout_secs: default_dht_timeout_secs(),
            query_timeout_secs: default_query_timeout_secs(),
        }
    }
}
