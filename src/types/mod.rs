mod provider_key;
mod reason;

pub(crate) use provider_key::{ProviderKey, parse_registration_memo};
pub(crate) use reason::ReasonCode;

/// ASCII prefix of a registration memo; the rest is the provider's pubkey.
pub(crate) const REGISTRATION_PREFIX: &str = "tsp-";

/// Opcode of a storage-reward withdrawal message. A wallet transaction
/// carrying it identifies its sender as a storage contract.
pub(crate) const STORAGE_REWARD_WITHDRAWAL_OP: u32 = 0xA91B_AF56;

/// System-table key holding the master-wallet transaction cursor.
pub(crate) const LAST_LT_KEY: &str = "masterWalletLastLT";
