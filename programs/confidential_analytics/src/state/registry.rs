use anchor_lang::prelude::*;

use crate::constants::FIRST_BATCH_ID;
use crate::error::AnalyticsError;
use crate::state::ProviderRecord;

/// Registry PDA - owner, oracle key, pause flag and cooldown.
///
/// Seeds: `[b"registry"]`
#[account]
pub struct Registry {
    /// Sole identity allowed to manage providers, pause, and run batches
    pub owner: Pubkey,

    /// Key whose ed25519 signatures authenticate decryption responses
    pub oracle: Pubkey,

    pub paused: bool,

    /// Minimum spacing between two submissions of the same provider
    pub cooldown_seconds: u64,

    /// Id of the most recently opened batch (0 = none yet)
    pub batch_count: u64,

    /// Mirrors `active` of batch `batch_count`
    pub batch_open: bool,

    /// Advances on every symbolic handle derivation
    pub handle_nonce: u64,

    pub bump: u8,
}

impl Registry {
    pub const LEN: usize = 8  // discriminator
        + 32  // owner
        + 32  // oracle
        + 1   // paused
        + 8   // cooldown_seconds
        + 8   // batch_count
        + 1   // batch_open
        + 8   // handle_nonce
        + 1; // bump

    pub fn initialize(&mut self, owner: Pubkey, oracle: Pubkey, cooldown_seconds: u64, bump: u8) {
        self.owner = owner;
        self.oracle = oracle;
        self.paused = false;
        self.cooldown_seconds = cooldown_seconds;
        self.batch_count = 0;
        self.batch_open = false;
        self.handle_nonce = 0;
        self.bump = bump;
    }

    pub fn require_owner(&self, caller: &Pubkey) -> Result<()> {
        require_keys_eq!(*caller, self.owner, AnalyticsError::Unauthorized);
        Ok(())
    }

    pub fn require_not_paused(&self) -> Result<()> {
        require!(!self.paused, AnalyticsError::SystemPaused);
        Ok(())
    }

    /// Id of the batch currently accepting contributions, if any.
    pub fn active_batch_id(&self) -> Option<u64> {
        self.batch_open.then_some(self.batch_count)
    }

    /// Id the next opened batch must carry.
    pub fn next_batch_id(&self) -> Result<u64> {
        if self.batch_count == 0 {
            return Ok(FIRST_BATCH_ID);
        }
        self.batch_count
            .checked_add(1)
            .ok_or_else(|| error!(AnalyticsError::ArithmeticOverflow))
    }

    /// Returns the previous owner.
    pub fn transfer_ownership(&mut self, caller: &Pubkey, new_owner: Pubkey) -> Result<Pubkey> {
        self.require_owner(caller)?;
        Ok(std::mem::replace(&mut self.owner, new_owner))
    }

    /// Returns the previous cooldown.
    pub fn set_cooldown(&mut self, caller: &Pubkey, seconds: u64) -> Result<u64> {
        self.require_owner(caller)?;
        Ok(std::mem::replace(&mut self.cooldown_seconds, seconds))
    }

    /// Returns the previous oracle key.
    pub fn set_oracle(&mut self, caller: &Pubkey, oracle: Pubkey) -> Result<Pubkey> {
        self.require_owner(caller)?;
        Ok(std::mem::replace(&mut self.oracle, oracle))
    }

    pub fn pause(&mut self, caller: &Pubkey) -> Result<()> {
        self.require_owner(caller)?;
        require!(!self.paused, AnalyticsError::AlreadyPaused);
        self.paused = true;
        Ok(())
    }

    pub fn unpause(&mut self, caller: &Pubkey) -> Result<()> {
        self.require_owner(caller)?;
        require!(self.paused, AnalyticsError::NotPaused);
        self.paused = false;
        Ok(())
    }

    /// Grants provider rights. Idempotent; returns `true` if the provider was
    /// not already enabled.
    pub fn add_provider(
        &self,
        caller: &Pubkey,
        registry_key: Pubkey,
        record: &mut ProviderRecord,
        provider: Pubkey,
        bump: u8,
    ) -> Result<bool> {
        self.require_owner(caller)?;
        Ok(record.enable(registry_key, provider, bump))
    }

    /// Revokes provider rights. Idempotent; returns `true` if the provider was
    /// enabled before the call.
    pub fn remove_provider(&self, caller: &Pubkey, record: &mut ProviderRecord) -> Result<bool> {
        self.require_owner(caller)?;
        Ok(record.disable())
    }
}
