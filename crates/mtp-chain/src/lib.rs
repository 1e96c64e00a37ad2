//! Client for the lite-server HTTP gateway.
//!
//! The node never talks to lite servers directly; a gateway exposes the
//! account/transaction/contract surface over JSON and this crate wraps it in
//! typed calls. Pagination, retries and request fan-out live here so the
//! workers only see complete answers.

mod client;
mod config;
mod error;
mod types;

pub use client::ChainClient;
pub use config::ChainClientConfig;
pub use error::ChainError;
pub use types::{ContractProviders, ProviderOnContract, StorageContractInfo, Transaction};
