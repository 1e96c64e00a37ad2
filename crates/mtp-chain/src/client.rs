use std::{sync::Arc, time::{Duration, Instant}};

use futures::future::join_all;
use mtp_observability::record_chain_request;
use tokio::sync::Semaphore;

use crate::{
    config::ChainClientConfig,
    error::{ChainError, Result},
    types::{
        AccountState, ContractProviders, ContractProvidersResponse, StorageContractInfo,
        Transaction, TransactionPage,
    },
};

pub struct ChainClient {
    http: reqwest::Client,
    gateway_url: String,
    tx_page_size: u32,
    request_retries: u32,
    providers_semaphore: Arc<Semaphore>,
}

impl ChainClient {
    pub fn new(config: &ChainClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            gateway_url: config.gateway_url.trim_end_matches('/').to_string(),
            tx_page_size: config.tx_page_size,
            request_retries: config.request_retries.max(1),
            providers_semaphore: Arc::new(Semaphore::new(config.max_parallel_requests.max(1))),
        })
    }

    /// Returns every transaction of `addr` between `last_processed_lt` and
    /// the newest one, boundary included. The account chain is walked
    /// backwards page by page, so the result is not ordered by LT; callers
    /// filter out the `lt <= last_processed_lt` tail themselves.
    ///
    /// A timed-out page request ends the walk instead of failing it when
    /// something was already collected: the missing tail is picked up by the
    /// next tick.
    pub async fn get_transactions(
        &self,
        addr: &str,
        last_processed_lt: u64,
    ) -> Result<Vec<Transaction>> {
        let account = self.get_account(addr).await?;

        let mut transactions = Vec::new();
        let mut page_lt = account.last_tx_lt;
        let mut page_hash = account.last_tx_hash;

        if page_lt == 0 {
            return Ok(transactions);
        }

        'walk: loop {
            let page = match self.get_transaction_page(addr, page_lt, &page_hash).await {
                Ok(page) => page,
                Err(err) if is_timeout(&err) && !transactions.is_empty() => {
                    tracing::info!(
                        addr,
                        collected = transactions.len(),
                        last_lt = page_lt,
                        "deadline exceeded, stopping transaction collection"
                    );
                    break;
                }
                Err(err) => return Err(err),
            };

            if page.transactions.is_empty() {
                break;
            }

            for tx in page.transactions.iter().rev() {
                if tx.lt <= last_processed_lt {
                    // The cursor falls inside this page; everything newer in
                    // the page is still wanted, then the walk is done.
                    let cutoff = tx.lt;
                    transactions.extend(
                        page.transactions
                            .iter()
                            .filter(|t| t.lt >= cutoff)
                            .cloned(),
                    );
                    break 'walk;
                }
            }

            let (Some(prev_lt), Some(prev_hash)) = (page.prev_lt, page.prev_hash.clone()) else {
                transactions.extend(page.transactions);
                break;
            };

            transactions.extend(page.transactions);
            page_lt = prev_lt;
            page_hash = prev_hash;
        }

        Ok(transactions)
    }

    /// Resolves bag metadata for each storage contract address. Addresses the
    /// gateway cannot answer for are skipped, not failed: a missing contract
    /// must not sink the whole enrichment pass.
    pub async fn get_storage_contracts_info(
        &self,
        addrs: &[String],
    ) -> Result<Vec<StorageContractInfo>> {
        let mut contracts = Vec::with_capacity(addrs.len());

        for addr in addrs {
            let url = format!("{}/api/v1/storage-contract/{}", self.gateway_url, addr);
            match self
                .get_json_with_retry::<StorageContractInfo>("storage_contract_info", &url)
                .await
            {
                Ok(info) => contracts.push(info),
                Err(err) => {
                    tracing::error!(address = %addr, error = %err, "get storage contract info");
                }
            }
        }

        Ok(contracts)
    }

    /// Loads the on-chain provider list and balance for each contract,
    /// bounded by the client's own request semaphore.
    pub async fn get_providers_info(&self, addrs: &[String]) -> Result<Vec<ContractProviders>> {
        let tasks = addrs.iter().map(|addr| {
            let semaphore = Arc::clone(&self.providers_semaphore);
            async move {
                let _permit = semaphore.acquire().await.ok()?;

                let url = format!(
                    "{}/api/v1/storage-contract/{}/providers",
                    self.gateway_url, addr
                );
                match self
                    .get_json_with_retry::<ContractProvidersResponse>("providers_info", &url)
                    .await
                {
                    Ok(response) => Some(ContractProviders {
                        address: addr.clone(),
                        balance: response.balance,
                        providers: response.providers,
                        lite_server_error: false,
                    }),
                    Err(err) => {
                        tracing::error!(address = %addr, error = %err, "get providers info");
                        Some(ContractProviders {
                            address: addr.clone(),
                            balance: 0,
                            providers: Vec::new(),
                            lite_server_error: true,
                        })
                    }
                }
            }
        });

        Ok(join_all(tasks).await.into_iter().flatten().collect())
    }

    async fn get_account(&self, addr: &str) -> Result<AccountState> {
        let url = format!("{}/api/v1/account/{}", self.gateway_url, addr);
        self.get_json_with_retry("account", &url).await
    }

    async fn get_transaction_page(
        &self,
        addr: &str,
        lt: u64,
        hash: &str,
    ) -> Result<TransactionPage> {
        let url = format!(
            "{}/api/v1/account/{}/transactions?lt={}&hash={}&limit={}",
            self.gateway_url, addr, lt, hash, self.tx_page_size
        );
        self.get_json_with_retry("transactions", &url).await
    }

    async fn get_json_with_retry<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        url: &str,
    ) -> Result<T> {
        let mut last_err = None;

        for attempt in 0..self.request_retries {
            let started = Instant::now();
            match self.get_json(url).await {
                Ok(value) => {
                    record_chain_request(method, "ok", started.elapsed());
                    return Ok(value);
                }
                Err(err) => {
                    record_chain_request(method, "error", started.elapsed());
                    tracing::debug!(method, attempt, error = %err, "gateway request failed");
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| ChainError::Gateway("no attempts made".to_string())))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.http.get(url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ChainError::Gateway("account not found".to_string()));
        }
        if !status.is_success() {
            return Err(ChainError::Status(status));
        }

        Ok(response.json::<T>().await?)
    }
}

fn is_timeout(err: &ChainError) -> bool {
    matches!(err, ChainError::Http(e) if e.is_timeout())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn transaction_page_parses_gateway_payload() {
        let raw = r#"{
            "transactions": [
                {
                    "hash": "ab01",
                    "lt": 12,
                    "op": 2837360470,
                    "from": "EQA-sender",
                    "to": "EQA-wallet",
                    "message": "tsp-0000000000000000000000000000000000000000000000000000000000000000",
                    "created_at": "2025-05-01T12:00:00Z"
                }
            ],
            "prev_lt": 7,
            "prev_hash": "cd02"
        }"#;

        let page: TransactionPage = serde_json::from_str(raw).unwrap();
        assert_eq!(page.transactions.len(), 1);
        assert_eq!(page.transactions[0].lt, 12);
        assert_eq!(page.transactions[0].op, 0xA91B_AF56);
        assert_eq!(page.prev_lt, Some(7));
    }

    #[test]
    fn transaction_defaults_apply_for_bare_transfers() {
        let raw = r#"{"hash": "ff", "lt": 3, "created_at": "2025-05-01T12:00:00Z"}"#;
        let tx: Transaction = serde_json::from_str(raw).unwrap();
        assert_eq!(tx.op, 0);
        assert!(tx.message.is_empty());
    }
}
