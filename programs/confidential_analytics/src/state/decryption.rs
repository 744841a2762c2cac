use anchor_lang::prelude::*;

use crate::constants::{AGGREGATE_WIDTH, CLEARTEXT_LEN};
use crate::encrypted::RequestId;
use crate::error::AnalyticsError;

/// Aggregates revealed by the oracle for one batch.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RevealedAggregates {
    pub total: u64,
    pub max: u64,
    pub min: u64,
    pub suspicious_count: u64,
}

impl RevealedAggregates {
    pub const SIZE: usize = 4 * 8;

    /// Decodes `total || max || min || suspicious_count`, each a little-endian
    /// u64.
    pub fn decode(cleartexts: &[u8]) -> Result<Self> {
        require!(
            cleartexts.len() == CLEARTEXT_LEN,
            AnalyticsError::MalformedCleartexts
        );
        let mut words = cleartexts
            .chunks_exact(AGGREGATE_WIDTH)
            .map(|chunk| {
                let mut word = [0u8; AGGREGATE_WIDTH];
                word.copy_from_slice(chunk);
                u64::from_le_bytes(word)
            });
        let mut next = || words.next().ok_or(AnalyticsError::MalformedCleartexts);

        Ok(Self {
            total: next()?,
            max: next()?,
            min: next()?,
            suspicious_count: next()?,
        })
    }

    /// Oracle-side encoding, inverse of [`RevealedAggregates::decode`].
    #[cfg(test)]
    pub fn encode(&self) -> [u8; CLEARTEXT_LEN] {
        let mut out = [0u8; CLEARTEXT_LEN];
        for (slot, value) in out
            .chunks_exact_mut(AGGREGATE_WIDTH)
            .zip([self.total, self.max, self.min, self.suspicious_count])
        {
            slot.copy_from_slice(&value.to_le_bytes());
        }
        out
    }
}

/// `Pending` until the matching callback passes every check, then
/// `Completed` forever.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Completed(RevealedAggregates),
}

/// Entry of the decryption context table. Lives inside the batch it was
/// issued for and is never removed.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecryptionContext {
    pub request_id: RequestId,
    pub batch_id: u64,
    /// Poseidon commitment over the batch aggregates at request time
    pub commitment: [u8; 32],
    pub status: RequestStatus,
}

impl DecryptionContext {
    pub const SIZE: usize = 32 // request_id
        + 8  // batch_id
        + 32 // commitment
        + 1 + RevealedAggregates::SIZE; // status

    pub fn pending(request_id: RequestId, batch_id: u64, commitment: [u8; 32]) -> Self {
        Self {
            request_id,
            batch_id,
            commitment,
            status: RequestStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, RequestStatus::Pending)
    }

    #[cfg(test)]
    pub fn revealed(&self) -> Option<RevealedAggregates> {
        match self.status {
            RequestStatus::Completed(revealed) => Some(revealed),
            RequestStatus::Pending => None,
        }
    }

    /// The only transition: `Pending -> Completed`.
    pub fn complete(&mut self, revealed: RevealedAggregates) -> Result<()> {
        match self.status {
            RequestStatus::Pending => {
                self.status = RequestStatus::Completed(revealed);
                Ok(())
            }
            RequestStatus::Completed(_) => err!(AnalyticsError::ReplayDetected),
        }
    }
}
