use std::{sync::Arc, time::Duration};

use crate::{
    config::{DhtSeed, PeerClientConfig},
    error::{PeerError, Result},
    gateway::Gateway,
    proto::{AddressList, Request, Response},
};

/// Typed DHT key: hash of the owner key plus a record name and index.
#[derive(Debug, Clone)]
pub struct DhtKey {
    pub id: [u8; 32],
    pub name: Vec<u8>,
    pub index: u32,
}

struct Seed {
    addr: String,
    public_key: [u8; 32],
}

/// Resolves network addresses through the DHT seed set. Seeds are tried in
/// order; the first one that answers wins.
pub struct DhtClient {
    gateway: Arc<Gateway>,
    seeds: Vec<Seed>,
    timeout: Duration,
}

impl DhtClient {
    pub fn new(gateway: Arc<Gateway>, config: &PeerClientConfig) -> Result<Self> {
        let seeds = config
            .dht_seeds
            .iter()
            .map(parse_seed)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            gateway,
            seeds,
            timeout: Duration::from_secs(config.dht_timeout_secs),
        })
    }

    /// Looks up the address list stored under `key` (an opaque lookup token,
    /// e.g. the proof returned by a provider daemon). Also returns the
    /// public key of the node the record points at.
    pub async fn find_addresses(&self, key: &[u8]) -> Result<(AddressList, [u8; 32])> {
        let request = Request::DhtFindAddresses { key: key.to_vec() };

        self.first_answer(&request, |response| match response {
            Response::DhtAddresses { list, public_key } => Some((list, public_key)),
            _ => None,
        })
        .await
    }

    /// Fetches the raw value stored under a typed DHT key.
    pub async fn find_value(&self, key: &DhtKey) -> Result<Vec<u8>> {
        let request = Request::DhtFindValue {
            key_id: key.id,
            name: key.name.clone(),
            index: key.index,
        };

        self.first_answer(&request, |response| match response {
            Response::DhtValue { data } => Some(data),
            _ => None,
        })
        .await
    }

    async fn first_answer<T>(
        &self,
        request: &Request,
        extract: impl Fn(Response) -> Option<T>,
    ) -> Result<T> {
        if self.seeds.is_empty() {
            return Err(PeerError::Dht("no dht seeds configured".to_string()));
        }

        let mut last_err = None;
        for seed in &self.seeds {
            let answer = async {
                let mut conn = self.gateway.connect(&seed.addr, seed.public_key).await?;
                conn.query("dht", request, self.timeout).await
            }
            .await;

            match answer {
                Ok(response) => match extract(response) {
                    Some(value) => return Ok(value),
                    None => last_err = Some(PeerError::UnexpectedResponse),
                },
                Err(err) => {
                    tracing::debug!(seed = %seed.addr, error = %err, "dht seed query failed");
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| PeerError::Dht("lookup exhausted all seeds".to_string())))
    }
}

fn parse_seed(seed: &DhtSeed) -> Result<Seed> {
    let raw = hex::decode(&seed.public_key)
        .map_err(|e| PeerError::Dht(format!("bad seed key for {}: {e}", seed.addr)))?;
    let public_key: [u8; 32] = raw
        .try_into()
        .map_err(|_| PeerError::Dht(format!("seed key for {} is not 32 bytes", seed.addr)))?;

    Ok(Seed {
        addr: seed.addr.clone(),
        public_key,
    })
}
