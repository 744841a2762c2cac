use anchor_lang::prelude::*;

use crate::error::AnalyticsError;

/// Provider PDA - membership flag and cooldown bookkeeping.
///
/// Seeds: `[b"provider", registry, provider]`
///
/// Removing a provider only clears `enabled`; the record keeps its
/// submission history.
#[account]
pub struct ProviderRecord {
    pub registry: Pubkey,
    pub provider: Pubkey,
    pub enabled: bool,
    /// Unix timestamp of the last accepted submission
    pub last_submission: Option<i64>,
    /// Accepted submissions across all batches
    pub submissions: u64,
    pub bump: u8,
}

impl ProviderRecord {
    pub const LEN: usize = 8  // discriminator
        + 32  // registry
        + 32  // provider
        + 1   // enabled
        + 1 + 8 // last_submission
        + 8   // submissions
        + 1; // bump

    /// Returns `true` if the record was not enabled before.
    pub fn enable(&mut self, registry: Pubkey, provider: Pubkey, bump: u8) -> bool {
        let newly_enabled = !self.enabled;
        self.registry = registry;
        self.provider = provider;
        self.enabled = true;
        self.bump = bump;
        newly_enabled
    }

    /// Returns `true` if the record was enabled before.
    pub fn disable(&mut self) -> bool {
        std::mem::replace(&mut self.enabled, false)
    }

    /// Checks membership and cooldown without mutating anything.
    pub fn check_admission(&self, caller: &Pubkey, now: i64, cooldown_seconds: u64) -> Result<()> {
        require!(
            self.enabled && self.provider == *caller,
            AnalyticsError::NotProvider
        );
        if let Some(last) = self.last_submission {
            let elapsed = now.saturating_sub(last).max(0) as u64;
            require!(elapsed >= cooldown_seconds, AnalyticsError::CooldownActive);
        }
        Ok(())
    }

    pub fn record_submission(&mut self, now: i64) -> Result<()> {
        self.last_submission = Some(now);
        self.submissions = self
            .submissions
            .checked_add(1)
            .ok_or(AnalyticsError::ArithmeticOverflow)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::assert_rejected;

    fn record() -> ProviderRecord {
        ProviderRecord {
            registry: Pubkey::default(),
            provider: Pubkey::default(),
            enabled: false,
            last_submission: None,
            submissions: 0,
            bump: 0,
        }
    }

    #[test]
    fn test_provider_record_size() {
        assert_eq!(ProviderRecord::LEN, 91);
    }

    #[test]
    fn test_enable_disable_idempotent() {
        let mut record = record();
        let provider = Pubkey::new_unique();

        assert!(record.enable(Pubkey::new_unique(), provider, 254));
        assert!(!record.enable(record.registry, provider, 254));
        assert!(record.enabled);

        assert!(record.disable());
        assert!(!record.disable());
        assert!(!record.enabled);
    }

    #[test]
    fn test_disabled_provider_rejected() {
        let mut record = record();
        let provider = Pubkey::new_unique();
        record.enable(Pubkey::new_unique(), provider, 1);
        record.disable();

        assert_rejected(record.check_admission(&provider, 100, 0), AnalyticsError::NotProvider);
    }

    #[test]
    fn test_record_of_another_provider_rejected() {
        let mut record = record();
        record.enable(Pubkey::new_unique(), Pubkey::new_unique(), 1);

        assert_rejected(
            record.check_admission(&Pubkey::new_unique(), 100, 0),
            AnalyticsError::NotProvider,
        );
    }

    #[test]
    fn test_cooldown_window() {
        let mut record = record();
        let provider = Pubkey::new_unique();
        record.enable(Pubkey::new_unique(), provider, 1);

        // first submission is never rate limited
        record.check_admission(&provider, 1_000, 60).unwrap();
        record.record_submission(1_000).unwrap();

        assert_rejected(
            record.check_admission(&provider, 1_059, 60),
            AnalyticsError::CooldownActive,
        );
        record.check_admission(&provider, 1_060, 60).unwrap();
        assert_eq!(record.submissions, 1);
        assert_eq!(record.last_submission, Some(1_000));
    }

    #[test]
    fn test_clock_going_backwards_counts_as_no_time_elapsed() {
        let mut record = record();
        let provider = Pubkey::new_unique();
        record.enable(Pubkey::new_unique(), provider, 1);
        record.record_submission(5_000).unwrap();

        assert!(record.check_admission(&provider, 4_000, 1).is_err());
        assert!(record.check_admission(&provider, 4_000, 0).is_ok());
    }
}
