//! Cleartext doubles for the encrypted capabilities, used by unit tests.

use anchor_lang::error::Error;
use anchor_lang::prelude::*;
use solana_sha256_hasher::hashv;

use crate::encrypted::{
    Ciphertext, DecryptionOracle, EncSlot, EncryptedArithmetic, EncryptedBool, ProofVerifier,
    RequestId,
};
use crate::error::AnalyticsError;
use crate::state::{Batch, ProviderRecord, RevealedAggregates, TransactionInput};

const CLEAR_TAG: u8 = 0xc1;

/// "Encrypts" by embedding the value in the handle: byte 0 is a tag, bytes
/// 1..9 the little-endian value, bytes 9..17 a serial so equal values still
/// get distinct handles.
#[derive(Default)]
pub struct ClearArithmetic {
    serial: u64,
    pub requests: Vec<(RequestId, Vec<Ciphertext>)>,
}

impl ClearArithmetic {
    pub fn encrypt(&mut self, value: u64) -> Ciphertext {
        self.serial += 1;
        let mut handle = [0u8; 32];
        handle[0] = CLEAR_TAG;
        handle[1..9].copy_from_slice(&value.to_le_bytes());
        handle[9..17].copy_from_slice(&self.serial.to_le_bytes());
        Ciphertext(handle)
    }

    pub fn reveal(&self, handle: Ciphertext) -> u64 {
        assert_eq!(handle.0[0], CLEAR_TAG, "not a cleartext handle");
        let mut value = [0u8; 8];
        value.copy_from_slice(&handle.0[1..9]);
        u64::from_le_bytes(value)
    }

    pub fn input(&mut self, value: u64, recipient_score: u64, threshold: u64) -> TransactionInput {
        TransactionInput {
            value: EncSlot::Set(self.encrypt(value)),
            recipient_score: EncSlot::Set(self.encrypt(recipient_score)),
            threshold: EncSlot::Set(self.encrypt(threshold)),
        }
    }

    /// What an honest oracle would reveal for `request_id`.
    pub fn decrypt_request(&self, request_id: &RequestId) -> Option<RevealedAggregates> {
        let (_, handles) = self.requests.iter().find(|(id, _)| id == request_id)?;
        Some(RevealedAggregates {
            total: self.reveal(handles[0]),
            max: self.reveal(handles[1]),
            min: self.reveal(handles[2]),
            suspicious_count: self.reveal(handles[3]),
        })
    }
}

impl EncryptedArithmetic for ClearArithmetic {
    fn trivial(&mut self, value: u64) -> Result<Ciphertext> {
        Ok(self.encrypt(value))
    }

    fn add(&mut self, lhs: Ciphertext, rhs: Ciphertext) -> Result<Ciphertext> {
        let sum = self.reveal(lhs).wrapping_add(self.reveal(rhs));
        Ok(self.encrypt(sum))
    }

    fn max(&mut self, lhs: Ciphertext, rhs: Ciphertext) -> Result<Ciphertext> {
        let max = self.reveal(lhs).max(self.reveal(rhs));
        Ok(self.encrypt(max))
    }

    fn min(&mut self, lhs: Ciphertext, rhs: Ciphertext) -> Result<Ciphertext> {
        let min = self.reveal(lhs).min(self.reveal(rhs));
        Ok(self.encrypt(min))
    }

    fn ge(&mut self, lhs: Ciphertext, rhs: Ciphertext) -> Result<EncryptedBool> {
        let flag = self.reveal(lhs) >= self.reveal(rhs);
        Ok(EncryptedBool(self.encrypt(flag as u64).0))
    }

    fn select(
        &mut self,
        cond: EncryptedBool,
        if_true: Ciphertext,
        if_false: Ciphertext,
    ) -> Result<Ciphertext> {
        let picked = if self.reveal(Ciphertext(cond.0)) != 0 {
            if_true
        } else {
            if_false
        };
        Ok(self.encrypt(self.reveal(picked)))
    }
}

impl DecryptionOracle for ClearArithmetic {
    fn request_decryption(&mut self, handles: &[Ciphertext]) -> Result<RequestId> {
        let serial = (self.requests.len() as u64).to_le_bytes();
        let request_id = RequestId(hashv(&[b"clear-request", &serial]).to_bytes());
        self.requests.push((request_id, handles.to_vec()));
        Ok(request_id)
    }
}

/// Verifier accepting `sha256(secret || request_id || cleartexts)`.
pub struct KeyedVerifier {
    secret: [u8; 32],
}

impl KeyedVerifier {
    pub fn new(secret: [u8; 32]) -> Self {
        Self { secret }
    }

    pub fn sign(&self, request_id: &RequestId, cleartexts: &[u8]) -> Vec<u8> {
        hashv(&[&self.secret, &request_id.0, cleartexts])
            .to_bytes()
            .to_vec()
    }
}

impl ProofVerifier for KeyedVerifier {
    fn verify(&self, request_id: &RequestId, cleartexts: &[u8], proof: &[u8]) -> bool {
        self.sign(request_id, cleartexts) == proof
    }
}

pub fn blank_batch() -> Batch {
    Batch {
        registry: Pubkey::default(),
        id: 0,
        active: false,
        tx_count: 0,
        sum: EncSlot::Unset,
        max: EncSlot::Unset,
        min: EncSlot::Unset,
        suspicious_count: EncSlot::Unset,
        opened_at: 0,
        closed_at: None,
        decryption: None,
        bump: 0,
    }
}

pub fn blank_record() -> ProviderRecord {
    ProviderRecord {
        registry: Pubkey::default(),
        provider: Pubkey::default(),
        enabled: false,
        last_submission: None,
        submissions: 0,
        bump: 0,
    }
}

/// Asserts `result` failed with exactly `expected`, ignoring source location.
#[track_caller]
pub fn assert_rejected<T: std::fmt::Debug>(result: Result<T>, expected: AnalyticsError) {
    let actual = result.expect_err("operation should have been rejected");
    let expected: Error = expected.into();
    match (&actual, &expected) {
        (Error::AnchorError(actual), Error::AnchorError(expected)) => {
            assert_eq!(actual.error_name, expected.error_name)
        }
        _ => panic!("expected {expected:?}, got {actual:?}"),
    }
}
