//! Opaque encrypted values and the capabilities that operate on them.
//!
//! The program never sees plaintext. Every arithmetic step goes through an
//! [`EncryptedArithmetic`] implementation, decryption is requested through a
//! [`DecryptionOracle`], and oracle responses are authenticated by a
//! [`ProofVerifier`]. On-chain these are served by [`SymbolicCoprocessor`]
//! (see `attestation.rs` for the verifier); tests plug in cleartext doubles.

use anchor_lang::prelude::*;
use solana_sha256_hasher::hashv;

use crate::constants::{HANDLE_TAG, REQUEST_TAG};

/// Handle to an encrypted unsigned 64-bit integer.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Ciphertext(pub [u8; 32]);

/// Handle to an encrypted boolean, produced by comparisons.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncryptedBool(pub [u8; 32]);

/// Oracle-assigned handle for one decryption request.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequestId(pub [u8; 32]);

impl Ciphertext {
    pub const NULL: Ciphertext = Ciphertext([0u8; 32]);

    /// The all-zero handle is never produced by the capability; clients use it
    /// to mean "no value supplied".
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

/// An accumulator or operand that may not have been assigned yet.
///
/// "Never assigned" and "an encryption of zero" are different states; the
/// first must be materialized to the operand's identity before use.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EncSlot {
    #[default]
    Unset,
    Set(Ciphertext),
}

impl EncSlot {
    /// Borsh size: tag + handle.
    pub const SIZE: usize = 1 + 32;

    /// Interprets a client-supplied handle, mapping the null handle to `Unset`.
    pub fn from_handle(handle: Ciphertext) -> Self {
        if handle.is_null() {
            EncSlot::Unset
        } else {
            EncSlot::Set(handle)
        }
    }

    /// Raw handle bytes; an unset slot reads as the null handle.
    pub fn handle(&self) -> Ciphertext {
        match self {
            EncSlot::Set(handle) => *handle,
            EncSlot::Unset => Ciphertext::NULL,
        }
    }

    /// Returns the assigned handle, or a fresh encryption of `identity`.
    pub fn materialize_or_identity<F: EncryptedArithmetic + ?Sized>(
        self,
        fhe: &mut F,
        identity: u64,
    ) -> Result<Ciphertext> {
        match self {
            EncSlot::Set(handle) => Ok(handle),
            EncSlot::Unset => fhe.trivial(identity),
        }
    }
}

/// Homomorphic operations over [`Ciphertext`] handles.
pub trait EncryptedArithmetic {
    /// Encrypts a public constant.
    fn trivial(&mut self, value: u64) -> Result<Ciphertext>;
    fn add(&mut self, lhs: Ciphertext, rhs: Ciphertext) -> Result<Ciphertext>;
    fn max(&mut self, lhs: Ciphertext, rhs: Ciphertext) -> Result<Ciphertext>;
    fn min(&mut self, lhs: Ciphertext, rhs: Ciphertext) -> Result<Ciphertext>;
    /// Encrypted `lhs >= rhs`.
    fn ge(&mut self, lhs: Ciphertext, rhs: Ciphertext) -> Result<EncryptedBool>;
    /// Encrypted `if cond { if_true } else { if_false }`.
    fn select(
        &mut self,
        cond: EncryptedBool,
        if_true: Ciphertext,
        if_false: Ciphertext,
    ) -> Result<Ciphertext>;
}

/// Asynchronous decryption: the response arrives later through the
/// `fulfill_decryption` instruction.
pub trait DecryptionOracle {
    fn request_decryption(&mut self, handles: &[Ciphertext]) -> Result<RequestId>;
}

/// Authenticates an oracle response for a given request.
pub trait ProofVerifier {
    fn verify(&self, request_id: &RequestId, cleartexts: &[u8], proof: &[u8]) -> bool;
}

// ============================================
// SYMBOLIC COPROCESSOR
// ============================================

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    Trivial,
    Add,
    Max,
    Min,
    Ge,
    Select,
    Decrypt,
}

/// One deferred operation for the off-chain coprocessor.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct SymbolicOp {
    pub opcode: Opcode,
    pub operands: Vec<[u8; 32]>,
    pub scalar: u64,
    pub result: [u8; 32],
}

/// On-chain capability: results are symbolic handles derived from the
/// operation and its inputs; the real evaluation happens off-chain by replaying
/// the emitted [`SymbolicOp`] log.
///
/// Handles are unique per deployment because the registry nonce advances on
/// every derivation. Call [`SymbolicCoprocessor::finish`] to write the nonce
/// back and collect the log.
pub struct SymbolicCoprocessor {
    domain: Pubkey,
    nonce: u64,
    ops: Vec<SymbolicOp>,
}

impl SymbolicCoprocessor {
    pub fn new(domain: Pubkey, nonce: u64) -> Self {
        Self {
            domain,
            nonce,
            ops: Vec::new(),
        }
    }

    /// Returns the advanced nonce and the recorded operations.
    pub fn finish(self) -> (u64, Vec<SymbolicOp>) {
        (self.nonce, self.ops)
    }

    fn derive(
        &mut self,
        tag: &[u8],
        opcode: Opcode,
        operands: &[[u8; 32]],
        scalar: u64,
    ) -> Result<[u8; 32]> {
        let nonce = self.nonce.to_le_bytes();
        let opcode_byte = [opcode as u8];
        let scalar_bytes = scalar.to_le_bytes();

        let mut parts: Vec<&[u8]> = Vec::with_capacity(5 + operands.len());
        parts.push(tag);
        parts.push(self.domain.as_ref());
        parts.push(&nonce);
        parts.push(&opcode_byte);
        parts.push(&scalar_bytes);
        for operand in operands {
            parts.push(operand);
        }
        let result = hashv(&parts).to_bytes();

        self.nonce = self
            .nonce
            .checked_add(1)
            .ok_or(crate::error::AnalyticsError::ArithmeticOverflow)?;
        self.ops.push(SymbolicOp {
            opcode,
            operands: operands.to_vec(),
            scalar,
            result,
        });
        Ok(result)
    }

    fn binary(&mut self, opcode: Opcode, lhs: Ciphertext, rhs: Ciphertext) -> Result<[u8; 32]> {
        self.derive(HANDLE_TAG, opcode, &[lhs.0, rhs.0], 0)
    }
}

impl EncryptedArithmetic for SymbolicCoprocessor {
    fn trivial(&mut self, value: u64) -> Result<Ciphertext> {
        self.derive(HANDLE_TAG, Opcode::Trivial, &[], value)
            .map(Ciphertext)
    }

    fn add(&mut self, lhs: Ciphertext, rhs: Ciphertext) -> Result<Ciphertext> {
        self.binary(Opcode::Add, lhs, rhs).map(Ciphertext)
    }

    fn max(&mut self, lhs: Ciphertext, rhs: Ciphertext) -> Result<Ciphertext> {
        self.binary(Opcode::Max, lhs, rhs).map(Ciphertext)
    }

    fn min(&mut self, lhs: Ciphertext, rhs: Ciphertext) -> Result<Ciphertext> {
        self.binary(Opcode::Min, lhs, rhs).map(Ciphertext)
    }

    fn ge(&mut self, lhs: Ciphertext, rhs: Ciphertext) -> Result<EncryptedBool> {
        self.binary(Opcode::Ge, lhs, rhs).map(EncryptedBool)
    }

    fn select(
        &mut self,
        cond: EncryptedBool,
        if_true: Ciphertext,
        if_false: Ciphertext,
    ) -> Result<Ciphertext> {
        self.derive(
            HANDLE_TAG,
            Opcode::Select,
            &[cond.0, if_true.0, if_false.0],
            0,
        )
        .map(Ciphertext)
    }
}

impl DecryptionOracle for SymbolicCoprocessor {
    fn request_decryption(&mut self, handles: &[Ciphertext]) -> Result<RequestId> {
        let operands: Vec<[u8; 32]> = handles.iter().map(|h| h.0).collect();
        self.derive(REQUEST_TAG, Opcode::Decrypt, &operands, 0)
            .map(RequestId)
    }
}
