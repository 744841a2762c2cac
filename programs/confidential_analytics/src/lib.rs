//! Confidential Analytics Program
//!
//! Aggregates encrypted transaction attributes into per-batch running totals
//! and reveals only the aggregates through an oracle decryption round-trip.
//! Individual submissions stay opaque to everyone, including this program.

pub mod attestation;
pub mod commitment;
pub mod constants;
pub mod encrypted;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod state;

#[cfg(test)]
mod testing;

use anchor_lang::prelude::*;
use anchor_lang::solana_program::sysvar::instructions as sysvar_instructions;

use crate::attestation::Ed25519Attestation;
use crate::constants::{BATCH_SEED, PROVIDER_SEED, REGISTRY_SEED};
use crate::encrypted::{Ciphertext, RequestId, SymbolicCoprocessor, SymbolicOp};
use crate::events::*;
pub use crate::error::AnalyticsError;
pub use crate::state::*;

declare_id!("CNxQv6YqKonmsic45zo3ij3kEBgsa3BXvhipXmUXpfXd");

#[program]
pub mod confidential_analytics {
    use super::*;

    /// Create the registry. The signer becomes the owner.
    pub fn initialize(
        ctx: Context<Initialize>,
        oracle: Pubkey,
        cooldown_seconds: u64,
    ) -> Result<()> {
        let owner = ctx.accounts.owner.key();
        ctx.accounts
            .registry
            .initialize(owner, oracle, cooldown_seconds, ctx.bumps.registry);

        msg!("Registry initialized: cooldown={}s", cooldown_seconds);
        emit!(RegistryInitialized {
            owner,
            oracle,
            cooldown_seconds,
        });
        Ok(())
    }

    // ---------------------------------------------
    // Access control
    // ---------------------------------------------

    pub fn transfer_ownership(ctx: Context<RegistryAdmin>, new_owner: Pubkey) -> Result<()> {
        let caller = ctx.accounts.authority.key();
        let previous_owner = ctx.accounts.registry.transfer_ownership(&caller, new_owner)?;

        emit!(OwnershipTransferred {
            previous_owner,
            new_owner,
        });
        Ok(())
    }

    pub fn add_provider(ctx: Context<AddProvider>, provider: Pubkey) -> Result<()> {
        let caller = ctx.accounts.authority.key();
        let registry_key = ctx.accounts.registry.key();
        let added = ctx.accounts.registry.add_provider(
            &caller,
            registry_key,
            &mut ctx.accounts.provider_record,
            provider,
            ctx.bumps.provider_record,
        )?;

        if added {
            emit!(ProviderAdded { provider });
        }
        Ok(())
    }

    pub fn remove_provider(ctx: Context<RemoveProvider>, provider: Pubkey) -> Result<()> {
        let caller = ctx.accounts.authority.key();
        let removed = ctx
            .accounts
            .registry
            .remove_provider(&caller, &mut ctx.accounts.provider_record)?;

        if removed {
            emit!(ProviderRemoved { provider });
        }
        Ok(())
    }

    pub fn set_cooldown(ctx: Context<RegistryAdmin>, seconds: u64) -> Result<()> {
        let caller = ctx.accounts.authority.key();
        let previous_seconds = ctx.accounts.registry.set_cooldown(&caller, seconds)?;

        emit!(CooldownUpdated {
            previous_seconds,
            new_seconds: seconds,
        });
        Ok(())
    }

    /// Rotate the key whose signatures authenticate decryption responses.
    pub fn set_oracle(ctx: Context<RegistryAdmin>, new_oracle: Pubkey) -> Result<()> {
        let caller = ctx.accounts.authority.key();
        let previous_oracle = ctx.accounts.registry.set_oracle(&caller, new_oracle)?;

        emit!(OracleUpdated {
            previous_oracle,
            new_oracle,
        });
        Ok(())
    }

    pub fn pause(ctx: Context<RegistryAdmin>) -> Result<()> {
        let caller = ctx.accounts.authority.key();
        ctx.accounts.registry.pause(&caller)?;

        msg!("System paused");
        emit!(Paused { by: caller });
        Ok(())
    }

    pub fn unpause(ctx: Context<RegistryAdmin>) -> Result<()> {
        let caller = ctx.accounts.authority.key();
        ctx.accounts.registry.unpause(&caller)?;

        msg!("System unpaused");
        emit!(Unpaused { by: caller });
        Ok(())
    }

    // ---------------------------------------------
    // Batch lifecycle
    // ---------------------------------------------

    /// Open the next batch. `batch_id` must equal `registry.batch_count + 1`.
    pub fn open_batch(ctx: Context<OpenBatch>, batch_id: u64) -> Result<()> {
        let now = Clock::get()?.unix_timestamp;
        let caller = ctx.accounts.authority.key();
        let registry_key = ctx.accounts.registry.key();
        let accounts = &mut *ctx.accounts;

        let mut fhe = SymbolicCoprocessor::new(registry_key, accounts.registry.handle_nonce);
        lifecycle::open_batch(
            &mut accounts.registry,
            registry_key,
            &mut accounts.batch,
            &caller,
            batch_id,
            now,
            &mut fhe,
            ctx.bumps.batch,
        )?;
        let (nonce, ops) = fhe.finish();
        accounts.registry.handle_nonce = nonce;

        msg!("Batch {} opened", batch_id);
        emit!(BatchOpened {
            batch_id,
            timestamp: now,
        });
        emit_ops(ops);
        Ok(())
    }

    /// Fold one provider's encrypted transaction into the active batch.
    pub fn analyze_transaction(
        ctx: Context<AnalyzeTransaction>,
        value: Ciphertext,
        recipient_score: Ciphertext,
        threshold: Ciphertext,
    ) -> Result<()> {
        let now = Clock::get()?.unix_timestamp;
        let provider = ctx.accounts.provider.key();
        let registry_key = ctx.accounts.registry.key();
        let accounts = &mut *ctx.accounts;

        let mut fhe = SymbolicCoprocessor::new(registry_key, accounts.registry.handle_nonce);
        let input = TransactionInput::from_handles(value, recipient_score, threshold);
        let tx_count = lifecycle::analyze_transaction(
            &accounts.registry,
            accounts.provider_record.as_deref_mut(),
            &mut accounts.batch,
            &provider,
            &input,
            now,
            &mut fhe,
        )?;
        let (nonce, ops) = fhe.finish();
        accounts.registry.handle_nonce = nonce;

        emit!(TransactionAnalyzed {
            batch_id: accounts.batch.id,
            provider,
            tx_count,
        });
        emit_ops(ops);
        Ok(())
    }

    /// Close the active batch and, if it is non-empty, request decryption of
    /// its aggregates.
    pub fn close_batch(ctx: Context<CloseBatch>) -> Result<()> {
        let now = Clock::get()?.unix_timestamp;
        let caller = ctx.accounts.authority.key();
        let registry_key = ctx.accounts.registry.key();
        let accounts = &mut *ctx.accounts;

        let mut oracle = SymbolicCoprocessor::new(registry_key, accounts.registry.handle_nonce);
        let context = lifecycle::close_batch(
            &mut accounts.registry,
            registry_key,
            &mut accounts.batch,
            &caller,
            now,
            &mut oracle,
        )?;
        let (nonce, ops) = oracle.finish();
        accounts.registry.handle_nonce = nonce;

        let batch = &accounts.batch;
        msg!("Batch {} closed with {} transactions", batch.id, batch.tx_count);
        emit!(BatchClosed {
            batch_id: batch.id,
            tx_count: batch.tx_count,
            timestamp: now,
        });

        match context {
            Some(context) => {
                emit!(DecryptionRequested {
                    request_id: context.request_id,
                    batch_id: context.batch_id,
                    commitment: context.commitment,
                });
                emit_ops(ops);
            }
            None => msg!("Batch {} is empty, nothing to reveal", batch.id),
        }
        Ok(())
    }

    /// Oracle callback. Permitted while paused so pending requests can always
    /// complete.
    pub fn fulfill_decryption(
        ctx: Context<FulfillDecryption>,
        request_id: RequestId,
        cleartexts: Vec<u8>,
        proof: Vec<u8>,
    ) -> Result<()> {
        let registry_key = ctx.accounts.registry.key();
        let instructions = ctx.accounts.instructions.to_account_info();
        let verifier = Ed25519Attestation::new(&instructions, ctx.accounts.registry.oracle);

        let revealed = lifecycle::fulfill_decryption(
            registry_key,
            &mut ctx.accounts.batch,
            &request_id,
            &cleartexts,
            &proof,
            &verifier,
        )?;

        msg!("Batch {} aggregates revealed", ctx.accounts.batch.id);
        emit!(DecryptionCompleted {
            request_id,
            batch_id: ctx.accounts.batch.id,
            total: revealed.total,
            max: revealed.max,
            min: revealed.min,
            suspicious_count: revealed.suspicious_count,
        });
        Ok(())
    }
}

fn emit_ops(ops: Vec<SymbolicOp>) {
    if !ops.is_empty() {
        emit!(CoprocessorOps { ops });
    }
}

// ============================================
// ACCOUNTS
// ============================================

#[derive(Accounts)]
pub struct Initialize<'info> {
    #[account(
        init,
        payer = owner,
        space = Registry::LEN,
        seeds = [REGISTRY_SEED],
        bump
    )]
    pub registry: Account<'info, Registry>,

    #[account(mut)]
    pub owner: Signer<'info>,

    pub system_program: Program<'info, System>,
}

/// Owner-only registry mutations; ownership is checked in the handler so a
/// stranger gets `Unauthorized`.
#[derive(Accounts)]
pub struct RegistryAdmin<'info> {
    #[account(mut, seeds = [REGISTRY_SEED], bump = registry.bump)]
    pub registry: Account<'info, Registry>,

    pub authority: Signer<'info>,
}

#[derive(Accounts)]
#[instruction(provider: Pubkey)]
pub struct AddProvider<'info> {
    #[account(seeds = [REGISTRY_SEED], bump = registry.bump)]
    pub registry: Account<'info, Registry>,

    #[account(
        init_if_needed,
        payer = authority,
        space = ProviderRecord::LEN,
        seeds = [PROVIDER_SEED, registry.key().as_ref(), provider.as_ref()],
        bump
    )]
    pub provider_record: Account<'info, ProviderRecord>,

    #[account(mut)]
    pub authority: Signer<'info>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
#[instruction(provider: Pubkey)]
pub struct RemoveProvider<'info> {
    #[account(seeds = [REGISTRY_SEED], bump = registry.bump)]
    pub registry: Account<'info, Registry>,

    #[account(
        mut,
        seeds = [PROVIDER_SEED, registry.key().as_ref(), provider.as_ref()],
        bump = provider_record.bump
    )]
    pub provider_record: Account<'info, ProviderRecord>,

    pub authority: Signer<'info>,
}

#[derive(Accounts)]
#[instruction(batch_id: u64)]
pub struct OpenBatch<'info> {
    #[account(mut, seeds = [REGISTRY_SEED], bump = registry.bump)]
    pub registry: Account<'info, Registry>,

    #[account(
        init,
        payer = authority,
        space = Batch::LEN,
        seeds = [BATCH_SEED, registry.key().as_ref(), &batch_id.to_le_bytes()],
        bump
    )]
    pub batch: Account<'info, Batch>,

    #[account(mut)]
    pub authority: Signer<'info>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct AnalyzeTransaction<'info> {
    #[account(mut, seeds = [REGISTRY_SEED], bump = registry.bump)]
    pub registry: Account<'info, Registry>,

    /// Absent for identities that were never added as providers.
    #[account(
        mut,
        seeds = [PROVIDER_SEED, registry.key().as_ref(), provider.key().as_ref()],
        bump = provider_record.bump
    )]
    pub provider_record: Option<Account<'info, ProviderRecord>>,

    #[account(mut, has_one = registry)]
    pub batch: Account<'info, Batch>,

    pub provider: Signer<'info>,
}

#[derive(Accounts)]
pub struct CloseBatch<'info> {
    #[account(mut, seeds = [REGISTRY_SEED], bump = registry.bump)]
    pub registry: Account<'info, Registry>,

    #[account(mut, has_one = registry)]
    pub batch: Account<'info, Batch>,

    pub authority: Signer<'info>,
}

/// No signer constraint: anyone may relay the oracle's response, its
/// authenticity comes from the ed25519 attestation.
#[derive(Accounts)]
pub struct FulfillDecryption<'info> {
    #[account(seeds = [REGISTRY_SEED], bump = registry.bump)]
    pub registry: Account<'info, Registry>,

    #[account(mut, has_one = registry)]
    pub batch: Account<'info, Batch>,

    /// CHECK: address-constrained to the instructions sysvar
    #[account(address = sysvar_instructions::ID)]
    pub instructions: UncheckedAccount<'info>,
}
