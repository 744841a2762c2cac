use anchor_lang::prelude::*;

use crate::constants::{
    AGGREGATE_COUNT, MAX_IDENTITY, MIN_IDENTITY, SUM_IDENTITY, SUSPICIOUS_IDENTITY,
};
use crate::encrypted::{Ciphertext, EncSlot, EncryptedArithmetic};
use crate::error::AnalyticsError;
use crate::state::DecryptionContext;

/// Encrypted attributes of one transaction, as submitted by a provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransactionInput {
    pub value: EncSlot,
    pub recipient_score: EncSlot,
    pub threshold: EncSlot,
}

impl TransactionInput {
    /// Null handles are treated as "not supplied".
    pub fn from_handles(
        value: Ciphertext,
        recipient_score: Ciphertext,
        threshold: Ciphertext,
    ) -> Self {
        Self {
            value: EncSlot::from_handle(value),
            recipient_score: EncSlot::from_handle(recipient_score),
            threshold: EncSlot::from_handle(threshold),
        }
    }
}

/// Batch PDA - running encrypted aggregates for one window of contributions.
///
/// Seeds: `[b"batch", registry, id.to_le_bytes()]`
#[account]
pub struct Batch {
    pub registry: Pubkey,
    pub id: u64,
    pub active: bool,
    pub tx_count: u64,
    pub sum: EncSlot,
    pub max: EncSlot,
    pub min: EncSlot,
    pub suspicious_count: EncSlot,
    pub opened_at: i64,
    pub closed_at: Option<i64>,
    /// Set on close when the batch had at least one contribution
    pub decryption: Option<DecryptionContext>,
    pub bump: u8,
}

impl Batch {
    pub const LEN: usize = 8  // discriminator
        + 32  // registry
        + 8   // id
        + 1   // active
        + 8   // tx_count
        + EncSlot::SIZE * AGGREGATE_COUNT // sum, max, min, suspicious_count
        + 8   // opened_at
        + 1 + 8 // closed_at
        + 1 + DecryptionContext::SIZE // decryption
        + 1; // bump

    /// Seeds the accumulators with their identity values and activates the
    /// batch.
    pub fn open<F: EncryptedArithmetic>(
        &mut self,
        fhe: &mut F,
        registry: Pubkey,
        id: u64,
        now: i64,
        bump: u8,
    ) -> Result<()> {
        let sum = fhe.trivial(SUM_IDENTITY)?;
        let max = fhe.trivial(MAX_IDENTITY)?;
        let min = fhe.trivial(MIN_IDENTITY)?;
        let suspicious_count = fhe.trivial(SUSPICIOUS_IDENTITY)?;

        self.registry = registry;
        self.id = id;
        self.active = true;
        self.tx_count = 0;
        self.sum = EncSlot::Set(sum);
        self.max = EncSlot::Set(max);
        self.min = EncSlot::Set(min);
        self.suspicious_count = EncSlot::Set(suspicious_count);
        self.opened_at = now;
        self.closed_at = None;
        self.decryption = None;
        self.bump = bump;
        Ok(())
    }

    /// Folds one transaction into the aggregates and returns the new count.
    ///
    /// Every handle is computed before any field is written, so a failing
    /// capability call leaves the batch untouched.
    pub fn fold<F: EncryptedArithmetic>(
        &mut self,
        fhe: &mut F,
        input: &TransactionInput,
    ) -> Result<u64> {
        require!(self.active, AnalyticsError::NoActiveBatch);
        let tx_count = self
            .tx_count
            .checked_add(1)
            .ok_or(AnalyticsError::ArithmeticOverflow)?;

        let value = input.value.materialize_or_identity(fhe, 0)?;
        let score = input.recipient_score.materialize_or_identity(fhe, 0)?;
        let threshold = input.threshold.materialize_or_identity(fhe, 0)?;

        let sum = self.sum.materialize_or_identity(fhe, SUM_IDENTITY)?;
        let max = self.max.materialize_or_identity(fhe, MAX_IDENTITY)?;
        let min = self.min.materialize_or_identity(fhe, MIN_IDENTITY)?;
        let suspicious_count = self
            .suspicious_count
            .materialize_or_identity(fhe, SUSPICIOUS_IDENTITY)?;

        let sum = fhe.add(sum, value)?;
        let max = fhe.max(max, value)?;
        let min = fhe.min(min, value)?;

        let suspicious = fhe.ge(score, threshold)?;
        let one = fhe.trivial(1)?;
        let zero = fhe.trivial(0)?;
        let increment = fhe.select(suspicious, one, zero)?;
        let suspicious_count = fhe.add(suspicious_count, increment)?;

        self.sum = EncSlot::Set(sum);
        self.max = EncSlot::Set(max);
        self.min = EncSlot::Set(min);
        self.suspicious_count = EncSlot::Set(suspicious_count);
        self.tx_count = tx_count;
        Ok(tx_count)
    }

    pub fn close(&mut self, now: i64) -> Result<()> {
        require!(self.active, AnalyticsError::NoActiveBatch);
        self.active = false;
        self.closed_at = Some(now);
        Ok(())
    }

    /// Handles in reveal order: sum, max, min, suspicious count.
    pub fn aggregates(&self) -> [Ciphertext; AGGREGATE_COUNT] {
        [
            self.sum.handle(),
            self.max.handle(),
            self.min.handle(),
            self.suspicious_count.handle(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encrypted::{Opcode, SymbolicCoprocessor};
    use crate::testing::{assert_rejected, blank_batch, ClearArithmetic};

    #[test]
    fn test_batch_size() {
        assert_eq!(Batch::LEN, 313);
    }

    #[test]
    fn test_open_seeds_identities() {
        let mut fhe = ClearArithmetic::default();
        let mut batch = blank_batch();
        batch.open(&mut fhe, Pubkey::new_unique(), 1, 50, 253).unwrap();

        assert!(batch.active);
        assert_eq!(batch.tx_count, 0);
        let [sum, max, min, suspicious] = batch.aggregates();
        assert_eq!(fhe.reveal(sum), 0);
        assert_eq!(fhe.reveal(max), 0);
        assert_eq!(fhe.reveal(min), u64::MAX);
        assert_eq!(fhe.reveal(suspicious), 0);
    }

    #[test]
    fn test_fold_updates_every_aggregate() {
        let mut fhe = ClearArithmetic::default();
        let mut batch = blank_batch();
        batch.open(&mut fhe, Pubkey::new_unique(), 1, 0, 0).unwrap();

        let input = fhe.input(10, 5, 5);
        assert_eq!(batch.fold(&mut fhe, &input).unwrap(), 1);
        let input = fhe.input(4, 1, 5);
        assert_eq!(batch.fold(&mut fhe, &input).unwrap(), 2);

        let [sum, max, min, suspicious] = batch.aggregates();
        assert_eq!(fhe.reveal(sum), 14);
        assert_eq!(fhe.reveal(max), 10);
        assert_eq!(fhe.reveal(min), 4);
        assert_eq!(fhe.reveal(suspicious), 1);
    }

    #[test]
    fn test_fold_materializes_unset_accumulators() {
        let mut fhe = ClearArithmetic::default();
        let mut batch = blank_batch();
        batch.active = true;

        let input = fhe.input(7, 0, 1);
        batch.fold(&mut fhe, &input).unwrap();

        let [sum, max, min, suspicious] = batch.aggregates();
        assert_eq!(fhe.reveal(sum), 7);
        assert_eq!(fhe.reveal(max), 7);
        assert_eq!(fhe.reveal(min), 7);
        assert_eq!(fhe.reveal(suspicious), 0);
    }

    #[test]
    fn test_fold_treats_missing_operands_as_zero() {
        let mut fhe = ClearArithmetic::default();
        let mut batch = blank_batch();
        batch.open(&mut fhe, Pubkey::new_unique(), 1, 0, 0).unwrap();

        let value = fhe.encrypt(9);
        let input = TransactionInput::from_handles(value, Ciphertext::NULL, Ciphertext::NULL);
        batch.fold(&mut fhe, &input).unwrap();

        let [sum, _, min, suspicious] = batch.aggregates();
        assert_eq!(fhe.reveal(sum), 9);
        assert_eq!(fhe.reveal(min), 9);
        // 0 >= 0
        assert_eq!(fhe.reveal(suspicious), 1);
    }

    #[test]
    fn test_fold_on_closed_batch_leaves_state_untouched() {
        let mut fhe = ClearArithmetic::default();
        let mut batch = blank_batch();
        batch.open(&mut fhe, Pubkey::new_unique(), 1, 0, 0).unwrap();
        batch.close(10).unwrap();
        let before = batch.aggregates();

        let input = fhe.input(1, 1, 1);
        assert_rejected(batch.fold(&mut fhe, &input), AnalyticsError::NoActiveBatch);
        assert_eq!(batch.aggregates(), before);
        assert_eq!(batch.tx_count, 0);
    }

    #[test]
    fn test_close_twice_fails() {
        let mut fhe = ClearArithmetic::default();
        let mut batch = blank_batch();
        batch.open(&mut fhe, Pubkey::new_unique(), 1, 0, 0).unwrap();

        batch.close(10).unwrap();
        assert_eq!(batch.closed_at, Some(10));
        assert_rejected(batch.close(11), AnalyticsError::NoActiveBatch);
        assert_eq!(batch.closed_at, Some(10));
    }

    #[test]
    fn test_symbolic_fold_emits_expected_ops() {
        let mut fhe = SymbolicCoprocessor::new(Pubkey::new_unique(), 0);
        let mut batch = blank_batch();
        batch.open(&mut fhe, Pubkey::new_unique(), 1, 0, 0).unwrap();
        let before = batch.aggregates();

        let input = TransactionInput::from_handles(
            Ciphertext([1u8; 32]),
            Ciphertext([2u8; 32]),
            Ciphertext([3u8; 32]),
        );
        batch.fold(&mut fhe, &input).unwrap();

        let (nonce, ops) = fhe.finish();
        let opcodes: Vec<Opcode> = ops.iter().skip(4).map(|op| op.opcode).collect();
        assert_eq!(
            opcodes,
            vec![
                Opcode::Add,
                Opcode::Max,
                Opcode::Min,
                Opcode::Ge,
                Opcode::Trivial,
                Opcode::Trivial,
                Opcode::Select,
                Opcode::Add,
            ]
        );
        assert_eq!(nonce, 12);
        assert_eq!(ops[4].operands, vec![before[0].0, [1u8; 32]]);
        assert_eq!(ops[7].operands, vec![[2u8; 32], [3u8; 32]]);
    }
}
