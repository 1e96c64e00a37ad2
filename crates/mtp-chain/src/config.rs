use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ChainClientConfig {
    /// Base URL of the lite-server gateway.
    pub gateway_url: String,
    /// Page size used when walking an account's transaction chain backwards.
    #[serde(default = "default_tx_page_size")]
    pub tx_page_size: u32,
    /// Per-request timeout. The caller wraps whole operations in its own
    /// deadline on top of this.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Retries for a single gateway request before giving up.
    #[serde(default = "default_request_retries")]
    pub request_retries: u32,
    /// Concurrent contract-state queries in `get_providers_info`.
    #[serde(default = "default_max_parallel_requests")]
    pub max_parallel_requests: usize,
}

fn default_tx_page_size() -> u32 {
    100
}

fn default_request_timeout_secs() -> u64 {
    5
}

fn default_request_retries() -> u32 {
    5
}

fn default_max_parallel_requests() -> usize {
    30
}

impl Default for ChainClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: "http://127.0.0.1:8091".to_string(),
            tx_page_size: default_tx_page_size(),
            request_timeout_secs: default_request_timeout_secs(),
            request_retries: default_request_retries(),
            max_parallel_requests: default_max_parallel_requests(),
        }
    }
}
