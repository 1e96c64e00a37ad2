//! Stage A: drop (contract, provider) relations the chain no longer backs.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use mtp_chain::ProviderOnContract;
use mtp_repository::ContractRelation;

use crate::{
    error::NodeError,
    periodic::deps::{ChainApi, ProviderStore},
};

/// Flat fee added on top of every bounty, in nanotons (0.05 TON).
const STORAGE_FEE_NANO: u128 = 50_000_000;

const SECONDS_PER_DAY: u128 = 24 * 60 * 60;
const BYTES_PER_MB: u128 = 1024 * 1024;
/// Grace period after a provider's span before an underfunded contract is
/// considered abandoned.
const LOW_BALANCE_GRACE_SECS: i64 = 3600;

/// A provider is dropped from a contract when the contract can no longer
/// cover one full-span bounty AND the provider has not proven within its
/// span plus the grace period. A provider that never proved yet is spared:
/// it may still be downloading the bag.
pub(super) fn is_removed_by_low_balance(
    bag_size: u64,
    provider: &ProviderOnContract,
    balance: u64,
    now_unix: i64,
) -> bool {
    let reward = u128::from(provider.rate_per_mb_day)
        * u128::from(bag_size)
        * u128::from(provider.max_span);
    let bounty = reward / (SECONDS_PER_DAY * BYTES_PER_MB) + STORAGE_FEE_NANO;

    if u128::from(balance) >= bounty {
        return false;
    }

    if provider.last_proof_time <= 0 {
        return false;
    }

    let deadline = provider.last_proof_time + i64::from(provider.max_span) + LOW_BALANCE_GRACE_SECS;
    now_unix > deadline
}

/// Queries the on-chain provider list of every contract and partitions the
/// relations into active and rejected. Rejected relations are deleted in
/// bulk; the active set feeds the following stages.
pub(super) async fn prune_rejected(
    chain: &dyn ChainApi,
    providers: &dyn ProviderStore,
    relations: Vec<ContractRelation>,
) -> Result<Vec<ContractRelation>, NodeError> {
    if relations.is_empty() {
        tracing::debug!("no storage contracts to process");
        return Ok(relations);
    }

    let mut contract_sizes: HashMap<String, u64> = HashMap::with_capacity(relations.len());
    for relation in &relations {
        contract_sizes.insert(relation.contract_address.clone(), relation.size as u64);
    }

    let addresses: Vec<String> = contract_sizes.keys().cloned().collect();
    let contracts = chain.get_providers_info(&addresses).await?;

    let now = Utc::now().timestamp();

    // Contract address -> pubkeys still funded on-chain. Contracts the
    // gateway could not answer for are left out entirely and treated as
    // still active below: an unreachable lite server must not evict anyone.
    let mut active_sets: HashMap<String, HashSet<String>> = HashMap::new();
    let mut unknown: HashSet<String> = HashSet::new();

    for contract in contracts {
        if contract.lite_server_error {
            unknown.insert(contract.address.clone());
            continue;
        }

        let bag_size = contract_sizes
            .get(&contract.address)
            .copied()
            .unwrap_or_default();

        let mut keep: HashSet<String> = HashSet::with_capacity(contract.providers.len());
        for provider in &contract.providers {
            let pubkey = provider.key.to_lowercase();
            if is_removed_by_low_balance(bag_size, provider, contract.balance, now) {
                tracing::warn!(
                    provider = %pubkey,
                    address = %contract.address,
                    balance = contract.balance,
                    "storage contract underfunded for too long, dropping provider"
                );
                continue;
            }
            keep.insert(pubkey);
        }

        if !keep.is_empty() {
            active_sets.insert(contract.address.clone(), keep);
        }
    }

    let mut active = Vec::with_capacity(relations.len());
    let mut closed = Vec::new();

    for relation in relations {
        if unknown.contains(&relation.contract_address) {
            active.push(relation);
            continue;
        }

        let keep = active_sets
            .get(&relation.contract_address)
            .is_some_and(|set| set.contains(&relation.provider_public_key.to_lowercase()));

        if keep {
            active.push(relation);
        } else {
            closed.push(relation);
        }
    }

    let removed = providers.delete_rejected(&closed).await?;

    tracing::info!(
        closed = removed,
        active = active.len(),
        "updated rejected storage contracts"
    );

    Ok(active)
}
