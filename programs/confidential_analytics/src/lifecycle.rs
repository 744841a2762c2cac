//! Batch and decryption state machine.
//!
//! Each function validates everything first and only then mutates, so a
//! rejected call leaves registry, provider and batch exactly as they were.
//! Instruction handlers in `lib.rs` are thin wrappers around these.

use anchor_lang::prelude::*;

use crate::commitment::aggregate_commitment;
use crate::encrypted::{DecryptionOracle, EncryptedArithmetic, ProofVerifier, RequestId};
use crate::error::AnalyticsError;
use crate::state::{
    Batch, DecryptionContext, ProviderRecord, Registry, RevealedAggregates, TransactionInput,
};

/// Owner-only. Opens batch `batch_id`, which must be the next id in sequence.
#[allow(clippy::too_many_arguments)]
pub fn open_batch<F: EncryptedArithmetic>(
    registry: &mut Registry,
    registry_key: Pubkey,
    batch: &mut Batch,
    caller: &Pubkey,
    batch_id: u64,
    now: i64,
    fhe: &mut F,
    bump: u8,
) -> Result<()> {
    registry.require_owner(caller)?;
    registry.require_not_paused()?;
    require!(!registry.batch_open, AnalyticsError::BatchAlreadyOpen);
    let expected = registry.next_batch_id()?;
    require_eq!(batch_id, expected, AnalyticsError::UnexpectedBatchId);

    batch.open(fhe, registry_key, batch_id, now, bump)?;
    registry.batch_count = batch_id;
    registry.batch_open = true;
    Ok(())
}

/// Provider-only. Folds one encrypted transaction into the active batch and
/// returns the batch's new transaction count.
///
/// `provider` is `None` when the caller has no membership record at all.
pub fn analyze_transaction<F: EncryptedArithmetic>(
    registry: &Registry,
    provider: Option<&mut ProviderRecord>,
    batch: &mut Batch,
    caller: &Pubkey,
    input: &TransactionInput,
    now: i64,
    fhe: &mut F,
) -> Result<u64> {
    registry.require_not_paused()?;
    let provider = provider.ok_or(AnalyticsError::NotProvider)?;
    provider.check_admission(caller, now, registry.cooldown_seconds)?;
    require!(
        batch.active && registry.active_batch_id() == Some(batch.id),
        AnalyticsError::NoActiveBatch
    );

    let tx_count = batch.fold(fhe, input)?;
    provider.record_submission(now)?;
    Ok(tx_count)
}

/// Owner-only. Closes the active batch; when it holds contributions, commits
/// to its aggregates and requests their decryption.
///
/// Returns the new pending context, or `None` for an empty batch.
pub fn close_batch<O: DecryptionOracle>(
    registry: &mut Registry,
    registry_key: Pubkey,
    batch: &mut Batch,
    caller: &Pubkey,
    now: i64,
    oracle: &mut O,
) -> Result<Option<DecryptionContext>> {
    registry.require_owner(caller)?;
    registry.require_not_paused()?;
    require!(
        batch.active && registry.active_batch_id() == Some(batch.id),
        AnalyticsError::NoActiveBatch
    );

    let context = if batch.tx_count > 0 {
        let aggregates = batch.aggregates();
        let commitment = aggregate_commitment(&registry_key, &aggregates)?;
        let request_id = oracle.request_decryption(&aggregates)?;
        Some(DecryptionContext::pending(request_id, batch.id, commitment))
    } else {
        None
    };

    batch.close(now)?;
    batch.decryption = context;
    registry.batch_open = false;
    Ok(context)
}

/// Oracle callback. Runs the lookup, replay, batch-state, commitment and proof
/// checks in that order; only when all pass is the context completed.
pub fn fulfill_decryption<V: ProofVerifier>(
    registry_key: Pubkey,
    batch: &mut Batch,
    request_id: &RequestId,
    cleartexts: &[u8],
    proof: &[u8],
    verifier: &V,
) -> Result<RevealedAggregates> {
    let context = batch
        .decryption
        .filter(|context| context.request_id == *request_id)
        .ok_or(AnalyticsError::UnknownRequest)?;
    require!(context.is_pending(), AnalyticsError::ReplayDetected);
    require!(
        !batch.active && context.batch_id == batch.id,
        AnalyticsError::InvalidBatchState
    );

    let current = aggregate_commitment(&registry_key, &batch.aggregates())?;
    require!(current == context.commitment, AnalyticsError::StateMismatch);
    require!(
        verifier.verify(request_id, cleartexts, proof),
        AnalyticsError::InvalidProof
    );

    let revealed = RevealedAggregates::decode(cleartexts)?;
    let stored = batch
        .decryption
        .as_mut()
        .ok_or(AnalyticsError::UnknownRequest)?;
    stored.complete(revealed)?;
    Ok(revealed)
}
