use anchor_lang::prelude::*;

use crate::encrypted::{RequestId, SymbolicOp};

// ============================================
// REGISTRY
// ============================================

#[event]
pub struct RegistryInitialized {
    pub owner: Pubkey,
    pub oracle: Pubkey,
    pub cooldown_seconds: u64,
}

#[event]
pub struct OwnershipTransferred {
    pub previous_owner: Pubkey,
    pub new_owner: Pubkey,
}

#[event]
pub struct ProviderAdded {
    pub provider: Pubkey,
}

#[event]
pub struct ProviderRemoved {
    pub provider: Pubkey,
}

#[event]
pub struct CooldownUpdated {
    pub previous_seconds: u64,
    pub new_seconds: u64,
}

#[event]
pub struct OracleUpdated {
    pub previous_oracle: Pubkey,
    pub new_oracle: Pubkey,
}

#[event]
pub struct Paused {
    pub by: Pubkey,
}

#[event]
pub struct Unpaused {
    pub by: Pubkey,
}

// ============================================
// BATCH LIFECYCLE
// ============================================

#[event]
pub struct BatchOpened {
    pub batch_id: u64,
    pub timestamp: i64,
}

#[event]
pub struct TransactionAnalyzed {
    pub batch_id: u64,
    pub provider: Pubkey,
    pub tx_count: u64,
}

#[event]
pub struct BatchClosed {
    pub batch_id: u64,
    pub tx_count: u64,
    pub timestamp: i64,
}

// ============================================
// DECRYPTION
// ============================================

#[event]
pub struct DecryptionRequested {
    pub request_id: RequestId,
    pub batch_id: u64,
    pub commitment: [u8; 32],
}

#[event]
pub struct DecryptionCompleted {
    pub request_id: RequestId,
    pub batch_id: u64,
    pub total: u64,
    pub max: u64,
    pub min: u64,
    pub suspicious_count: u64,
}

/// Symbolic operations the off-chain coprocessor must evaluate, in order.
#[event]
pub struct CoprocessorOps {
    pub ops: Vec<SymbolicOp>,
}
